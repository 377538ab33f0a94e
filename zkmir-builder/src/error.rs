//! Error types for schema construction and JSON import.

use thiserror::Error;
use zkmir_spec::SpecError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuilderError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("unknown expression form: {0}")]
    UnknownExpression(String),

    #[error("unknown constraint form: {0}")]
    UnknownConstraint(String),

    #[error("malformed column handle: {0}")]
    MalformedColumnHandle(String),

    #[error("malformed JSON document: {0}")]
    MalformedDocument(String),
}

pub type Result<T> = std::result::Result<T, BuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_spec_error() {
        let e: BuilderError = SpecError::DuplicateModule("m".into()).into();
        assert!(matches!(e, BuilderError::Spec(SpecError::DuplicateModule(_))));
    }
}
