//! The read-only trace interface terms evaluate against.

use crate::field::Field;
use crate::register::{ModuleId, RegisterId};

/// Row-indexed, read-only access to a module's witness columns.
///
/// Implementations provide raw in-range cell values only; padding and
/// out-of-range behavior is applied by the term evaluator per `EvalConfig`,
/// not by the trace itself.
pub trait Trace<F: Field>: Sync {
    /// Number of rows actually populated for `module` (its used height,
    /// always a multiple of the module's length multiplier).
    fn height(&self, module: ModuleId) -> usize;

    /// The value at `(module, register, row)`, or `None` if `row` is within
    /// `[0, height)` but the cell was never written.
    fn get(&self, module: ModuleId, register: RegisterId, row: i64) -> Option<F>;
}

/// A dense, in-memory trace: one column vector per register, per module.
#[derive(Debug, Clone, Default)]
pub struct DenseTrace<F: Field> {
    columns: std::collections::HashMap<(ModuleId, RegisterId), Vec<F>>,
    heights: std::collections::HashMap<ModuleId, usize>,
}

impl<F: Field> DenseTrace<F> {
    pub fn new() -> Self {
        Self { columns: Default::default(), heights: Default::default() }
    }

    pub fn set_height(&mut self, module: ModuleId, height: usize) {
        self.heights.insert(module, height);
    }

    pub fn set_column(&mut self, module: ModuleId, register: RegisterId, values: Vec<F>) {
        let height = self.heights.entry(module).or_insert(0);
        *height = (*height).max(values.len());
        self.columns.insert((module, register), values);
    }
}

impl<F: Field> Trace<F> for DenseTrace<F> {
    fn height(&self, module: ModuleId) -> usize {
        self.heights.get(&module).copied().unwrap_or(0)
    }

    fn get(&self, module: ModuleId, register: RegisterId, row: i64) -> Option<F> {
        if row < 0 {
            return None;
        }
        self.columns
            .get(&(module, register))
            .and_then(|col| col.get(row as usize))
            .copied()
    }
}
