//! Populate a trace's computed registers by evaluating a schema's assignments.

use std::cmp::Ordering;

use zkmir_spec::{Assignment, DenseTrace, EvalConfig, Field, ModuleId, RegisterAccess, Schema, SpecError};

use crate::error::{LowerError, Result};

/// Evaluate every assignment of every internal module in `schema`, writing
/// the resulting computed-register columns into `trace`. Assignments within
/// a module run in declaration order; later assignments may read registers
/// an earlier one in the same module just populated.
pub fn populate_trace<F: Field>(schema: &Schema<F>, trace: &mut DenseTrace<F>, cfg: &EvalConfig) -> Result<()> {
    for (i, module) in schema.modules().iter().enumerate() {
        if module.is_extern() {
            continue;
        }
        let mid = ModuleId(i as u32);
        let height = trace.height(mid);
        for assignment in module.assignments() {
            apply_assignment(mid, height, assignment, schema, trace, cfg)?;
        }
    }
    Ok(())
}

fn apply_assignment<F: Field>(
    mid: ModuleId,
    height: usize,
    assignment: &Assignment<F>,
    schema: &Schema<F>,
    trace: &mut DenseTrace<F>,
    cfg: &EvalConfig,
) -> Result<()> {
    match assignment {
        Assignment::Compute { targets, term, .. } => {
            let mut values = Vec::with_capacity(height);
            for row in 0..height as i64 {
                values.push(term.eval_at(row, schema, trace, cfg)?);
            }
            for target in targets {
                trace.set_column(mid, *target, values.clone());
            }
            Ok(())
        }
        Assignment::NormWitness { source, indicator, inverse, .. } => {
            let mut ind_values = Vec::with_capacity(height);
            let mut inv_values = Vec::with_capacity(height);
            for row in 0..height as i64 {
                let x = source.eval_at(row, schema, trace, cfg)?;
                if x.is_zero() {
                    ind_values.push(F::ZERO);
                    inv_values.push(F::ZERO);
                } else {
                    ind_values.push(F::ONE);
                    inv_values.push(x.inverse().unwrap_or(F::ZERO));
                }
            }
            trace.set_column(mid, *indicator, ind_values);
            trace.set_column(mid, *inverse, inv_values);
            Ok(())
        }
        Assignment::SortedPermutation { sources, targets, signs, name } => {
            if sources.len() != targets.len() || sources.len() != signs.len() {
                return Err(LowerError::Spec(SpecError::InvalidConfig(format!(
                    "sorted permutation '{name}' has mismatched source/target/sign arity"
                ))));
            }
            let mut rows: Vec<Vec<F>> = Vec::with_capacity(height);
            for row in 0..height as i64 {
                let mut tuple = Vec::with_capacity(sources.len());
                for src in sources {
                    let access = RegisterAccess::new(mid, *src, 0);
                    tuple.push(zkmir_spec::ArithTerm::RegisterAccess(access).eval_at(row, schema, trace, cfg)?);
                }
                rows.push(tuple);
            }
            rows.sort_by(|a, b| {
                for (i, ascending) in signs.iter().enumerate() {
                    let ord = a[i].to_canonical_u128().cmp(&b[i].to_canonical_u128());
                    let ord = if *ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            for (i, target) in targets.iter().enumerate() {
                let column: Vec<F> = rows.iter().map(|r| r[i]).collect();
                trace.set_column(mid, *target, column);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{ArithTerm, BabyBear, Module, Register, RegisterId, RegisterKind};

    #[test]
    fn norm_witness_populates_indicator_and_inverse() {
        let mut m: Module<BabyBear> = Module::new("main", 1, false);
        let x = m.try_add_register(Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        let n = m.try_add_register(Register::new("n", 1, 0, RegisterKind::Computed).unwrap()).unwrap();
        let inv = m.try_add_register(Register::new("inv", 64, 0, RegisterKind::Computed).unwrap()).unwrap();
        m.try_add_assignment(Assignment::NormWitness {
            name: "w".into(),
            source: ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), x, 0)),
            indicator: n,
            inverse: inv,
        })
        .unwrap();
        let schema = Schema::new(vec![m]).unwrap();

        let mut trace = DenseTrace::new();
        trace.set_height(ModuleId(0), 2);
        trace.set_column(ModuleId(0), x, vec![BabyBear(0), BabyBear(5)]);

        populate_trace(&schema, &mut trace, &EvalConfig::DEFAULT).unwrap();

        assert_eq!(trace.get(ModuleId(0), n, 0), Some(BabyBear(0)));
        assert_eq!(trace.get(ModuleId(0), n, 1), Some(BabyBear(1)));
        let inv5 = trace.get(ModuleId(0), inv, 1).unwrap();
        assert_eq!(BabyBear(5).mul(inv5), BabyBear(1));
    }

    #[test]
    fn sorted_permutation_orders_rows_by_signed_columns() {
        let mut m: Module<BabyBear> = Module::new("main", 1, false);
        let a = m.try_add_register(Register::new("a", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        let b = m.try_add_register(Register::new("b", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        let a_sorted = m.try_add_register(Register::new("a_sorted", 8, 0, RegisterKind::Computed).unwrap()).unwrap();
        let b_sorted = m.try_add_register(Register::new("b_sorted", 8, 0, RegisterKind::Computed).unwrap()).unwrap();
        m.try_add_assignment(Assignment::SortedPermutation {
            name: "perm".into(),
            sources: vec![a, b],
            targets: vec![a_sorted, b_sorted],
            signs: vec![true, false],
        })
        .unwrap();
        let schema = Schema::new(vec![m]).unwrap();

        let mut trace = DenseTrace::new();
        trace.set_height(ModuleId(0), 3);
        trace.set_column(ModuleId(0), a, vec![BabyBear(2), BabyBear(1), BabyBear(2)]);
        trace.set_column(ModuleId(0), b, vec![BabyBear(5), BabyBear(5), BabyBear(3)]);

        populate_trace(&schema, &mut trace, &EvalConfig::DEFAULT).unwrap();

        let a_out: Vec<_> = (0..3).map(|r| trace.get(ModuleId(0), a_sorted, r).unwrap()).collect();
        let b_out: Vec<_> = (0..3).map(|r| trace.get(ModuleId(0), b_sorted, r).unwrap()).collect();
        assert_eq!(a_out, vec![BabyBear(1), BabyBear(2), BabyBear(2)]);
        assert_eq!(b_out, vec![BabyBear(5), BabyBear(5), BabyBear(3)]);
    }
}
