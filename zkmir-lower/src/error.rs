//! Error types for the lowering pipeline and trace evaluator.

use thiserror::Error;
use zkmir_spec::SpecError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LowerError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("constraint '{name}' failed: expected zero, got nonzero value at row {row}")]
    VanishingFailed { name: String, row: i64 },

    #[error("constraint '{name}' failed: value at row {row} is outside [0, {bound})")]
    RangeFailed { name: String, row: i64, bound: u128 },

    #[error("constraint '{name}' failed: lookup miss for row {row}")]
    LookupFailed { name: String, row: i64 },

    #[error("constraint '{name}' failed: permutation mismatch")]
    PermutationFailed { name: String },
}

pub type Result<T> = std::result::Result<T, LowerError>;
