//! extloader CLI - Extension loader generator for graphics APIs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};
use extloader::core::{DescriptorError, DescriptorSyntaxError};
use extloader::ops::{DiscoverError, UnknownCapability};
use extloader::util::diagnostic::emit;

fn main() {
    let cli = Cli::parse();
    let color = cli.color_enabled();

    if let Err(e) = run(cli) {
        report_error(e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("extloader=debug")
    } else if cli.quiet || cli.message_format == MessageFormat::Json {
        EnvFilter::new("extloader=warn")
    } else {
        EnvFilter::new("extloader=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = cli.shell();

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &shell),
        Commands::Explain(args) => commands::explain::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error, preferring the richest rendering available.
fn report_error(e: anyhow::Error, color: bool) {
    let e = match e.downcast::<DescriptorSyntaxError>() {
        Ok(syntax) => {
            eprintln!("{:?}", miette::Report::new(syntax));
            return;
        }
        Err(e) => e,
    };

    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<DescriptorError>() {
            return emit(&err.to_diagnostic(), color);
        }
        if let Some(err) = cause.downcast_ref::<DiscoverError>() {
            return emit(&err.to_diagnostic(), color);
        }
        if let Some(err) = cause.downcast_ref::<UnknownCapability>() {
            return emit(&err.to_diagnostic(), color);
        }
    }

    eprintln!("error: {:#}", e);
}
