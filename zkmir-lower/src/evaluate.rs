//! Batch constraint evaluation against a concrete trace.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use zkmir_spec::{Constraint, EvalConfig, Field, ModuleId, RowSet, Schema, SpecError, Trace};

use crate::error::{LowerError, Result};

/// Cooperative cancellation handle. Cloning shares the same flag, so a
/// caller on another thread can request that an in-flight evaluation stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Evaluate every constraint of every internal module in `schema` against
/// `trace`, returning the first failure encountered. Extern modules carry no
/// constraints of their own and are skipped.
pub fn evaluate_schema<F: Field + Sync, T: Trace<F> + Sync>(
    schema: &Schema<F>,
    trace: &T,
    cfg: &EvalConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    for (i, module) in schema.modules().iter().enumerate() {
        if module.is_extern() {
            continue;
        }
        let mid = ModuleId(i as u32);
        for constraint in module.constraints() {
            evaluate_constraint(mid, constraint, schema, trace, cfg, cancel)?;
        }
    }
    Ok(())
}

fn evaluate_constraint<F: Field + Sync, T: Trace<F> + Sync>(
    module: ModuleId,
    constraint: &Constraint<F>,
    schema: &Schema<F>,
    trace: &T,
    cfg: &EvalConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    match constraint {
        Constraint::Vanishing { name, rows, term } => {
            let height = trace.height(module) as i64;
            let row_list = rows_for(*rows, height);
            row_list.par_chunks(cfg.row_block_size.max(1)).try_for_each(|chunk| {
                if cancel.is_cancelled() {
                    return Err(LowerError::Spec(SpecError::Cancelled));
                }
                for &row in chunk {
                    let v = term.eval_at(row, schema, trace, cfg)?;
                    if !v.is_zero() {
                        return Err(LowerError::VanishingFailed { name: name.clone(), row });
                    }
                }
                Ok(())
            })
        }
        Constraint::Range { name, term, bound } => {
            let height = trace.height(module) as i64;
            let row_list: Vec<i64> = (0..height).collect();
            row_list.par_chunks(cfg.row_block_size.max(1)).try_for_each(|chunk| {
                if cancel.is_cancelled() {
                    return Err(LowerError::Spec(SpecError::Cancelled));
                }
                for &row in chunk {
                    let v = term.eval_at(row, schema, trace, cfg)?;
                    if v.to_canonical_u128() >= *bound {
                        return Err(LowerError::RangeFailed { name: name.clone(), row, bound: *bound });
                    }
                }
                Ok(())
            })
        }
        Constraint::Lookup { name, source_module, source, target_module, target } => {
            let target_height = trace.height(*target_module) as i64;
            let mut allowed: HashSet<Vec<u128>> = HashSet::with_capacity(target_height.max(0) as usize);
            for row in 0..target_height {
                let tuple = eval_tuple(target, row, schema, trace, cfg)?;
                allowed.insert(tuple);
            }
            let source_height = trace.height(*source_module) as i64;
            for row in 0..source_height {
                if row % cfg.row_block_size.max(1) as i64 == 0 && cancel.is_cancelled() {
                    return Err(LowerError::Spec(SpecError::Cancelled));
                }
                let tuple = eval_tuple(source, row, schema, trace, cfg)?;
                if !allowed.contains(&tuple) {
                    return Err(LowerError::LookupFailed { name: name.clone(), row });
                }
            }
            Ok(())
        }
        Constraint::Permutation { name, source_module, sources, target_module, targets } => {
            let source_height = trace.height(*source_module) as i64;
            let target_height = trace.height(*target_module) as i64;
            if source_height != target_height {
                return Err(LowerError::PermutationFailed { name: name.clone() });
            }
            let mut source_rows = read_columns(*source_module, sources, source_height, trace)?;
            let mut target_rows = read_columns(*target_module, targets, target_height, trace)?;
            source_rows.sort();
            target_rows.sort();
            if source_rows != target_rows {
                return Err(LowerError::PermutationFailed { name: name.clone() });
            }
            Ok(())
        }
    }
}

fn eval_tuple<F: Field, T: Trace<F>>(
    terms: &[zkmir_spec::ArithTerm<F>],
    row: i64,
    schema: &Schema<F>,
    trace: &T,
    cfg: &EvalConfig,
) -> Result<Vec<u128>> {
    terms.iter().map(|t| Ok(t.eval_at(row, schema, trace, cfg)?.to_canonical_u128())).collect()
}

fn read_columns<F: Field, T: Trace<F>>(
    module: ModuleId,
    registers: &[zkmir_spec::RegisterId],
    height: i64,
    trace: &T,
) -> Result<Vec<Vec<u128>>> {
    let mut out = Vec::with_capacity(height.max(0) as usize);
    for row in 0..height {
        let tuple: Result<Vec<u128>> = registers
            .iter()
            .map(|r| {
                trace
                    .get(module, *r, row)
                    .map(|v| v.to_canonical_u128())
                    .ok_or(LowerError::Spec(SpecError::OutOfRange { row }))
            })
            .collect();
        out.push(tuple?);
    }
    Ok(out)
}

fn rows_for(rows: RowSet, height: i64) -> Vec<i64> {
    match rows {
        RowSet::All => (0..height).collect(),
        RowSet::First => {
            if height > 0 {
                vec![0]
            } else {
                vec![]
            }
        }
        RowSet::Last => {
            if height > 0 {
                vec![height - 1]
            } else {
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{ArithTerm, BabyBear, DenseTrace, Module, Register, RegisterAccess, RegisterId, RegisterKind};

    fn schema_and_trace(values: Vec<BabyBear>) -> (Schema<BabyBear>, DenseTrace<BabyBear>) {
        let mut m: Module<BabyBear> = Module::new("main", 1, false);
        m.try_add_register(Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        let height = values.len();
        m.try_add_constraint(Constraint::Vanishing {
            name: "x_is_zero".into(),
            rows: RowSet::All,
            term: ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 0)),
        })
        .unwrap();
        let schema = Schema::new(vec![m]).unwrap();
        let mut trace = DenseTrace::new();
        trace.set_height(ModuleId(0), height);
        trace.set_column(ModuleId(0), RegisterId(0), values);
        (schema, trace)
    }

    #[test]
    fn vanishing_constraint_passes_when_all_zero() {
        let (schema, trace) = schema_and_trace(vec![BabyBear(0); 10]);
        let cfg = EvalConfig::DEFAULT;
        assert!(evaluate_schema(&schema, &trace, &cfg, &CancellationToken::new()).is_ok());
    }

    #[test]
    fn vanishing_constraint_fails_on_nonzero_row() {
        let mut values = vec![BabyBear(0); 10];
        values[4] = BabyBear(7);
        let (schema, trace) = schema_and_trace(values);
        let cfg = EvalConfig::DEFAULT;
        let err = evaluate_schema(&schema, &trace, &cfg, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, LowerError::VanishingFailed { .. }));
    }

    #[test]
    fn cancellation_short_circuits_evaluation() {
        let (schema, trace) = schema_and_trace(vec![BabyBear(0); 1000]);
        let cfg = EvalConfig::new(true, 4).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = evaluate_schema(&schema, &trace, &cfg, &cancel).unwrap_err();
        assert!(matches!(err, LowerError::Spec(SpecError::Cancelled)));
    }
}
