//! Descriptor error types and diagnostics.

use std::path::PathBuf;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// A descriptor violates the model's construction contract.
///
/// These are build-time defects in the input: generation stops at the first
/// one and nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("{kind} must not be empty")]
    EmptyField { kind: &'static str },

    #[error("{kind} `{value}` is not a valid C identifier")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("`one_of` group in `{capability}` has no members")]
    EmptyGroup { capability: String },

    #[error("capability `{name}` is declared more than once in family `{family}`")]
    DuplicateCapability { family: String, name: String },

    #[error("in {}: {inner}", path.display())]
    InFile {
        path: PathBuf,
        inner: Box<DescriptorError>,
    },
}

impl DescriptorError {
    /// Attach the descriptor file this error came from.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ DescriptorError::InFile { .. } => already,
            inner => DescriptorError::InFile {
                path: path.into(),
                inner: Box::new(inner),
            },
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            DescriptorError::EmptyField { kind } => {
                Diagnostic::error(format!("{} must not be empty", kind))
                    .with_suggestion(format!("Give every {} a value in the descriptor", kind))
            }

            DescriptorError::InvalidIdentifier { kind, value } => Diagnostic::error(format!(
                "{} `{}` is not a valid C identifier",
                kind, value
            ))
            .with_context("identifiers must match [A-Za-z_][A-Za-z0-9_]*")
            .with_suggestion(format!("Rename the {} in the descriptor", kind)),

            DescriptorError::EmptyGroup { capability } => Diagnostic::error(format!(
                "empty `one_of` group in `{}`",
                capability
            ))
            .with_suggestion("Remove the group or list at least one alternative".to_string()),

            DescriptorError::DuplicateCapability { family, name } => Diagnostic::error(format!(
                "`{}` is declared twice in family `{}`",
                name, family
            ))
            .with_suggestion("Delete one of the two descriptor files".to_string()),

            DescriptorError::InFile { path, inner } => inner.to_diagnostic().with_location(path),
        }
    }
}

/// TOML syntax or schema error in a descriptor file.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to parse descriptor `{file}`")]
#[diagnostic(
    code(extloader::descriptor::syntax),
    help("Descriptors are TOML; see the schema of `name`, `functions` and `additionals`")
)]
pub struct DescriptorSyntaxError {
    pub file: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("{message}")]
    pub span: Option<SourceSpan>,
    pub message: String,
}

impl DescriptorSyntaxError {
    /// Build from a `toml` deserialization error over `contents`.
    pub fn from_toml(file: impl Into<String>, contents: String, err: &toml::de::Error) -> Self {
        let file = file.into();
        DescriptorSyntaxError {
            span: err.span().map(SourceSpan::from),
            src: NamedSource::new(file.clone(), contents),
            message: err.message().to_string(),
            file,
        }
    }
}
