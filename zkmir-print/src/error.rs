//! Errors for s-expression printing and the binary schema codec.

use thiserror::Error;
use zkmir_spec::SpecError;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("truncated binary schema: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("bad magic bytes: {0:?}")]
    BadMagic(Vec<u8>),

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("bincode encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, PrintError>;
