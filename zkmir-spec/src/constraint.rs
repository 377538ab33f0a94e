//! Constraint kinds attached to a module.

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::register::{ModuleId, RegisterId};
use crate::term::ArithTerm;

/// Which rows a vanishing constraint must hold on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSet {
    All,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub enum Constraint<F: Field> {
    /// `term` must evaluate to zero on every row in `rows`.
    Vanishing { name: String, rows: RowSet, term: ArithTerm<F> },
    /// `term`'s value must lie in `[0, bound)` on every row.
    Range { name: String, term: ArithTerm<F>, bound: u128 },
    /// Every row's tuple of `source` evaluations must appear among the rows
    /// of `target` evaluated against `target_module`.
    Lookup {
        name: String,
        source_module: ModuleId,
        source: Vec<ArithTerm<F>>,
        target_module: ModuleId,
        target: Vec<ArithTerm<F>>,
    },
    /// `target` registers must be a permutation of `source` registers.
    Permutation {
        name: String,
        source_module: ModuleId,
        sources: Vec<RegisterId>,
        target_module: ModuleId,
        targets: Vec<RegisterId>,
    },
}

impl<F: Field> Constraint<F> {
    pub fn name(&self) -> &str {
        match self {
            Constraint::Vanishing { name, .. }
            | Constraint::Range { name, .. }
            | Constraint::Lookup { name, .. }
            | Constraint::Permutation { name, .. } => name,
        }
    }
}
