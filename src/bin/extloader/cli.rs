//! CLI definitions using clap.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use extloader::util::shell::{ColorChoice, Shell};

/// extloader - Generate C extension loaders from capability descriptors
#[derive(Parser)]
#[command(name = "extloader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn shell(&self) -> Arc<Shell> {
        Arc::new(Shell::from_flags(
            self.quiet,
            self.verbose,
            self.color,
            self.message_format == MessageFormat::Json,
        ))
    }

    /// Whether error output on stderr should be colored.
    pub fn color_enabled(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate loader headers and sources for every descriptor family
    Generate(GenerateArgs),

    /// Show how a capability resolves its entry points
    Explain(ExplainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Project root (defaults to current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Descriptor directory, relative to the root
    #[arg(long)]
    pub descriptors: Option<PathBuf>,

    /// Number of families generated in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Dry run - show what would be written
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Capability to explain (e.g. GL_ARB_multitexture)
    pub capability: String,

    /// Project root (defaults to current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
