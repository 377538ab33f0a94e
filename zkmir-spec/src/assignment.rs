//! Assignments: computations that populate a module's computed registers.

use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::register::RegisterId;
use crate::term::ArithTerm;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub enum Assignment<F: Field> {
    /// `targets` receive the row-wise evaluation of `term`. Used directly by
    /// user schemas and by most auxiliary witnesses introduced by lowering.
    Compute { name: String, targets: Vec<RegisterId>, term: ArithTerm<F> },
    /// `targets` receive the rows of `sources`, sorted lexicographically
    /// according to `signs` (`true` = ascending on that column).
    SortedPermutation {
        name: String,
        sources: Vec<RegisterId>,
        targets: Vec<RegisterId>,
        signs: Vec<bool>,
    },
    /// The indicator/inverse pair introduced when `Norm` is lowered away.
    /// `indicator` is 0 when `source` evaluates to 0, else 1; `inverse` is
    /// `source`'s field inverse, or 0 when `source` is 0. Kept distinct from
    /// `Compute` because this witness isn't expressible as a single term
    /// evaluation (it needs the field inversion capability directly).
    NormWitness { name: String, source: ArithTerm<F>, indicator: RegisterId, inverse: RegisterId },
}

impl<F: Field> Assignment<F> {
    pub fn name(&self) -> &str {
        match self {
            Assignment::Compute { name, .. } => name,
            Assignment::SortedPermutation { name, .. } => name,
            Assignment::NormWitness { name, .. } => name,
        }
    }

    pub fn targets(&self) -> Vec<RegisterId> {
        match self {
            Assignment::Compute { targets, .. } => targets.clone(),
            Assignment::SortedPermutation { targets, .. } => targets.clone(),
            Assignment::NormWitness { indicator, inverse, .. } => vec![*indicator, *inverse],
        }
    }
}
