use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or parsing an ontology document.
///
/// Loading is all-or-nothing: any of these means no fact base was produced.
/// Query-time policy denials are ordinary result values in the policy crate
/// and never surface here.
#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("ontology not found: {0}")]
    NotFound(PathBuf),

    #[error("malformed ontology at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OntologyError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        OntologyError::Malformed {
            line,
            message: message.into(),
        }
    }
}

pub type OntologyResult<T> = Result<T, OntologyError>;
