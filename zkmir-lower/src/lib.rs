//! # zkmir-lower
//!
//! The lowering pipeline that turns a user-authored HIR schema into an AIR
//! schema ready for constraint evaluation, plus the evaluator that checks a
//! concrete trace against it.
//!
//! ## Pipeline
//!
//! 1. [`simplify`] rewrites terms to a canonical, minimal form.
//! 2. [`hir_to_mir`] expands list-valued constraints and `IfZero` branches
//!    into their cross-product of plain MIR terms.
//! 3. [`consistency`] checks that every term's register reads stay within
//!    its owning module.
//! 4. [`mir_to_air`] eliminates `Norm`, `Cast`, `Exp` and the logical
//!    combinators, leaving only the fixed AIR vocabulary.
//! 5. [`evaluate`] checks a trace against the resulting AIR schema.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zkmir_lower::{lower_schema, CancellationToken};
//! use zkmir_spec::{DenseTrace, EvalConfig, Schema};
//!
//! # fn build_hir_schema() -> Schema<zkmir_spec::BabyBear> { unimplemented!() }
//! let hir: Schema<zkmir_spec::BabyBear> = build_hir_schema();
//! let air = lower_schema(&hir, &zkmir_spec::SimplifyConfig::DEFAULT).unwrap();
//! let trace = DenseTrace::new();
//! zkmir_lower::evaluate_schema(&air, &trace, &EvalConfig::DEFAULT, &CancellationToken::new()).unwrap();
//! ```

pub mod consistency;
pub mod error;
pub mod evaluate;
pub mod hir_to_mir;
pub mod mir_to_air;
pub mod simplify;
pub mod witness;

pub use error::{LowerError, Result};
pub use evaluate::{evaluate_schema, CancellationToken};
pub use witness::populate_trace;

use zkmir_spec::{Field, Module, Schema, SimplifyConfig};

/// Run the full HIR -> AIR pipeline: simplify every constraint term, expand
/// list-valued constraints and `IfZero` branches, check register-access
/// consistency, then eliminate the remaining non-AIR constructs.
pub fn lower_schema<F: Field>(schema: &Schema<F>, cfg: &SimplifyConfig) -> Result<Schema<F>> {
    let mut modules = Vec::with_capacity(schema.modules().len());
    for module in schema.modules() {
        if module.is_extern() {
            modules.push(module.clone());
            continue;
        }
        modules.push(simplify_and_expand_module(module, cfg)?);
    }
    let mir = Schema::new(modules)?;
    consistency::check_schema(&mir)?;
    mir_to_air::lower_schema(&mir)
}

fn simplify_and_expand_module<F: Field>(module: &Module<F>, cfg: &SimplifyConfig) -> Result<Module<F>> {
    let mut out = Module::new(module.name(), module.multiplier(), module.allow_padding());
    for register in module.registers() {
        out.try_add_register(register.clone())?;
    }
    for constraint in module.constraints() {
        match constraint {
            zkmir_spec::Constraint::Vanishing { name, rows, term } => {
                let simplified = simplify::simplify_arith(term, cfg)?;
                for (i, expanded) in hir_to_mir::lower_term(&simplified).into_iter().enumerate() {
                    out.try_add_constraint(zkmir_spec::Constraint::Vanishing {
                        name: format!("{name}#{i}"),
                        rows: *rows,
                        term: expanded,
                    })?;
                }
            }
            other => out.try_add_constraint(other.clone())?,
        }
    }
    for assignment in module.assignments() {
        out.try_add_assignment(assignment.clone())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{ArithTerm, BabyBear, DenseTrace, EvalConfig, ModuleId, Register, RegisterAccess, RegisterId, RegisterKind, RowSet};

    #[test]
    fn end_to_end_lowering_and_evaluation_of_a_single_if_zero() {
        let mut m: Module<BabyBear> = Module::new("main", 1, false);
        let cond = m.try_add_register(Register::new("cond", 1, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        let out = m.try_add_register(Register::new("out", 8, 0, RegisterKind::Computed).unwrap()).unwrap();

        let cond_term = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), cond, 0));
        let out_term = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), out, 0));
        // out must vanish when cond == 0, and (out - 1) must vanish otherwise:
        // out tracks whether cond was nonzero on that row.
        let term = ArithTerm::IfZero {
            cond: Box::new(cond_term),
            tt: Some(Box::new(out_term.clone())),
            ff: Some(Box::new(ArithTerm::Sub(vec![out_term, ArithTerm::Constant(BabyBear(1))]))),
        };
        m.try_add_constraint(zkmir_spec::Constraint::Vanishing {
            name: "out_tracks_cond_nonzero".into(),
            rows: RowSet::All,
            term,
        })
        .unwrap();

        let hir = Schema::new(vec![m]).unwrap();
        let air = lower_schema(&hir, &SimplifyConfig::DEFAULT).unwrap();

        let mut trace = DenseTrace::new();
        trace.set_height(ModuleId(0), 2);
        trace.set_column(ModuleId(0), cond, vec![BabyBear(0), BabyBear(1)]);
        trace.set_column(ModuleId(0), out, vec![BabyBear(0), BabyBear(1)]);

        let cfg = EvalConfig::DEFAULT;
        // The AIR lowering introduced fresh indicator/inverse registers for
        // the Norm it generated; populate them before checking constraints.
        populate_trace(&air, &mut trace, &cfg).unwrap();
        evaluate_schema(&air, &trace, &cfg, &CancellationToken::new()).unwrap();
    }
}
