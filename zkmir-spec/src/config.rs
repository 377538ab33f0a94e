//! Evaluation and simplification configuration.

use std::fmt;

/// Controls how the evaluator treats out-of-range reads and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvalConfig {
    /// When true, reads outside `[0, height)` return the register's padding value.
    /// When false, they raise `OutOfRange`.
    pub allow_padding_reads: bool,
    /// Row-block granularity at which evaluation loops poll their cancellation token.
    pub row_block_size: usize,
}

impl EvalConfig {
    pub const DEFAULT: Self = Self {
        allow_padding_reads: true,
        row_block_size: 256,
    };

    pub const fn new(allow_padding_reads: bool, row_block_size: usize) -> Result<Self, ConfigError> {
        if row_block_size == 0 {
            return Err(ConfigError::ZeroRowBlockSize);
        }
        Ok(Self { allow_padding_reads, row_block_size })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_block_size == 0 {
            return Err(ConfigError::ZeroRowBlockSize);
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for EvalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EvalConfig {{ padding_reads: {}, row_block_size: {} }}",
            self.allow_padding_reads, self.row_block_size
        )
    }
}

/// Controls simplifier behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimplifyConfig {
    /// When false, casts that cannot fail statically are elided during simplification.
    /// When true, casts are retained so a later lowering stage can emit range constraints.
    pub keep_casts: bool,
}

impl SimplifyConfig {
    pub const DEFAULT: Self = Self { keep_casts: true };
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroRowBlockSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRowBlockSize => write!(f, "row_block_size must be nonzero"),
        }
    }
}

impl std::error::Error for ConfigError {}
