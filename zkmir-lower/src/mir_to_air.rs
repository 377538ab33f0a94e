//! MIR -> AIR lowering: eliminates `Norm`, `Cast`, `Exp`, `Equal`/`NotEqual`/
//! `Inequality` and logical combinators, leaving only the fixed AIR
//! vocabulary (add/sub/mul/const/shifted register access).

use zkmir_spec::{ArithTerm, Constraint, Field, LogicalTerm, Module, ModuleId, Register, RegisterAccess, RegisterId, RegisterKind, RowSet, Schema};

use crate::error::Result;

struct AirLowering<'a, F: Field> {
    module: &'a mut Module<F>,
    mid: ModuleId,
    counter: usize,
}

impl<'a, F: Field> AirLowering<'a, F> {
    fn fresh(&mut self, hint: &str) -> String {
        self.counter += 1;
        format!("__{}_{}", hint, self.counter)
    }

    fn lower_arith(&mut self, t: &ArithTerm<F>) -> Result<ArithTerm<F>> {
        Ok(match t {
            ArithTerm::Constant(c) => ArithTerm::Constant(*c),
            ArithTerm::LabelledConst(l, c) => ArithTerm::LabelledConst(l.clone(), *c),
            ArithTerm::RegisterAccess(ra) => ArithTerm::RegisterAccess(ra.clone()),
            ArithTerm::VectorAccess(v) => ArithTerm::VectorAccess(v.clone()),
            ArithTerm::Add(xs) => ArithTerm::Add(self.lower_all(xs)?),
            ArithTerm::Sub(xs) => ArithTerm::Sub(self.lower_all(xs)?),
            ArithTerm::Mul(xs) => ArithTerm::Mul(self.lower_all(xs)?),
            ArithTerm::Exp(base, k) => {
                let b = self.lower_arith(base)?;
                if *k == 0 {
                    ArithTerm::Constant(F::ONE)
                } else {
                    ArithTerm::Mul(vec![b; *k as usize])
                }
            }
            ArithTerm::Cast(inner, width) => {
                let x = self.lower_arith(inner)?;
                let name = self.fresh("cast_range");
                self.module.constraints_mut().push(Constraint::Range {
                    name,
                    term: x.clone(),
                    bound: 1u128 << width,
                });
                x
            }
            ArithTerm::Norm(inner) => {
                let x = self.lower_arith(inner)?;
                self.lower_norm(x)?
            }
            ArithTerm::IfZero { cond, tt, ff } => {
                // Should already be eliminated by HIR->MIR, but tolerate
                // direct MIR authorship by applying the same rewrite.
                let c = self.lower_arith(cond)?;
                let n = self.lower_norm(c.clone())?;
                let one_minus_n = ArithTerm::Sub(vec![ArithTerm::Constant(F::ONE), n]);
                match (tt, ff) {
                    (Some(t), Some(f)) => {
                        let t = self.lower_arith(t)?;
                        let f = self.lower_arith(f)?;
                        ArithTerm::Add(vec![
                            ArithTerm::Mul(vec![one_minus_n.clone(), t]),
                            ArithTerm::Mul(vec![c, f]),
                        ])
                    }
                    (Some(t), None) => ArithTerm::Mul(vec![one_minus_n, self.lower_arith(t)?]),
                    (None, Some(f)) => ArithTerm::Mul(vec![c, self.lower_arith(f)?]),
                    (None, None) => ArithTerm::Constant(F::ZERO),
                }
            }
        })
    }

    fn lower_all(&mut self, xs: &[ArithTerm<F>]) -> Result<Vec<ArithTerm<F>>> {
        xs.iter().map(|x| self.lower_arith(x)).collect()
    }

    /// Introduce the indicator/inverse pair and the three vanishing
    /// constraints that pin them to `x`, returning the indicator access.
    fn lower_norm(&mut self, x: ArithTerm<F>) -> Result<ArithTerm<F>> {
        let n_name = self.fresh("norm_ind");
        let inv_name = self.fresh("norm_inv");
        let n_id = self.module.try_add_register(Register::new(n_name, 1, 0, RegisterKind::Computed)?)?;
        let inv_id = self.module.try_add_register(Register::new(inv_name, 64, 0, RegisterKind::Computed)?)?;

        let witness_name = self.fresh("norm_witness");
        self.module.assignments_mut().push(zkmir_spec::Assignment::NormWitness {
            name: witness_name,
            source: x.clone(),
            indicator: n_id,
            inverse: inv_id,
        });

        let n = ArithTerm::RegisterAccess(RegisterAccess::new(self.mid, n_id, 0));
        let inv = ArithTerm::RegisterAccess(RegisterAccess::new(self.mid, inv_id, 0));

        let idem_name = self.fresh("norm_idempotent");
        self.module.constraints_mut().push(Constraint::Vanishing {
            name: idem_name,
            rows: RowSet::All,
            term: ArithTerm::Mul(vec![n.clone(), ArithTerm::Sub(vec![n.clone(), ArithTerm::Constant(F::ONE)])]),
        });

        let inv_name2 = self.fresh("norm_inverse_consistent");
        self.module.constraints_mut().push(Constraint::Vanishing {
            name: inv_name2,
            rows: RowSet::All,
            term: ArithTerm::Mul(vec![
                n.clone(),
                ArithTerm::Sub(vec![ArithTerm::Constant(F::ONE), ArithTerm::Mul(vec![x.clone(), inv])]),
            ]),
        });

        let zero_name = self.fresh("norm_zero_forces_indicator");
        self.module.constraints_mut().push(Constraint::Vanishing {
            name: zero_name,
            rows: RowSet::All,
            term: ArithTerm::Mul(vec![x, ArithTerm::Sub(vec![ArithTerm::Constant(F::ONE), n.clone()])]),
        });

        Ok(n)
    }

    /// Rewrite a logical term into an arithmetic term whose vanishing
    /// encodes that the logical term holds. May push auxiliary constraints
    /// directly into the module (e.g. for `Conjunct`, `Disjunct`).
    fn lower_logical(&mut self, t: &LogicalTerm<F>) -> Result<ArithTerm<F>> {
        Ok(match t {
            LogicalTerm::Equal(l, r) => {
                let l = self.lower_arith(l)?;
                let r = self.lower_arith(r)?;
                ArithTerm::Sub(vec![l, r])
            }
            LogicalTerm::NotEqual(l, r) => {
                let l = self.lower_arith(l)?;
                let r = self.lower_arith(r)?;
                let diff = ArithTerm::Sub(vec![l, r]);
                let n = self.lower_norm(diff)?;
                ArithTerm::Sub(vec![n, ArithTerm::Constant(F::ONE)])
            }
            LogicalTerm::Inequality { strict, lhs, rhs } => {
                let l = self.lower_arith(lhs)?;
                let r = self.lower_arith(rhs)?;
                let diff = if *strict {
                    ArithTerm::Sub(vec![r, l, ArithTerm::Constant(F::ONE)])
                } else {
                    ArithTerm::Sub(vec![r, l])
                };
                let name = self.fresh("inequality_range");
                self.module.constraints_mut().push(Constraint::Range { name, term: diff, bound: 1u128 << 64 });
                ArithTerm::Constant(F::ZERO)
            }
            LogicalTerm::Conjunct(xs) => {
                // Each conjunct is independently enforceable; split into
                // separate vanishing constraints rather than one compound
                // polynomial. The wrapper itself trivially vanishes.
                for x in xs {
                    let term = self.lower_logical(x)?;
                    let name = self.fresh("conjunct_member");
                    self.module.constraints_mut().push(Constraint::Vanishing { name, rows: RowSet::All, term });
                }
                ArithTerm::Constant(F::ZERO)
            }
            LogicalTerm::Disjunct(xs) => {
                // At least one member vanishes iff their product vanishes
                // (the field has no zero divisors).
                let terms: Result<Vec<_>> = xs.iter().map(|x| self.lower_logical(x)).collect();
                ArithTerm::Mul(terms?)
            }
            LogicalTerm::Negate(x) => self.lower_logical(&push_negation(x))?,
            LogicalTerm::Ite { cond, tt, ff } => {
                let true_term = LogicalTerm::Conjunct(vec![]);
                let false_term = LogicalTerm::Disjunct(vec![]);
                let tt = tt.clone().map(|b| *b).unwrap_or_else(|| true_term.clone());
                let ff = ff.clone().map(|b| *b).unwrap_or_else(|| false_term);
                // ite(c, a, b) == (not c or a) and (c or b)
                let rewritten = LogicalTerm::Conjunct(vec![
                    LogicalTerm::Disjunct(vec![push_negation(cond), tt]),
                    LogicalTerm::Disjunct(vec![(**cond).clone(), ff]),
                ]);
                self.lower_logical(&rewritten)?
            }
        })
    }
}

/// Push negation inward via De Morgan's laws until only `Equal`/`NotEqual`/
/// `Inequality` leaves carry it, where it specializes directly.
fn push_negation<F: Field>(t: &LogicalTerm<F>) -> LogicalTerm<F> {
    match t {
        LogicalTerm::Equal(l, r) => LogicalTerm::NotEqual(l.clone(), r.clone()),
        LogicalTerm::NotEqual(l, r) => LogicalTerm::Equal(l.clone(), r.clone()),
        LogicalTerm::Inequality { strict, lhs, rhs } => {
            LogicalTerm::Inequality { strict: !*strict, lhs: rhs.clone(), rhs: lhs.clone() }
        }
        LogicalTerm::Negate(x) => (**x).clone(),
        LogicalTerm::Conjunct(xs) => LogicalTerm::Disjunct(xs.iter().map(push_negation).collect()),
        LogicalTerm::Disjunct(xs) => LogicalTerm::Conjunct(xs.iter().map(push_negation).collect()),
        LogicalTerm::Ite { cond, tt, ff } => LogicalTerm::Ite {
            cond: cond.clone(),
            tt: tt.as_ref().map(|t| Box::new(push_negation(t))),
            ff: ff.as_ref().map(|t| Box::new(push_negation(t))),
        },
    }
}

/// Lower every internal module's constraints/assignments from MIR to AIR.
/// Extern modules are assumed already lowered and are left untouched.
pub fn lower_schema<F: Field>(schema: &Schema<F>) -> Result<Schema<F>> {
    let mut modules: Vec<Module<F>> = schema.modules().to_vec();
    for (i, module) in modules.iter_mut().enumerate() {
        if module.is_extern() {
            continue;
        }
        let mid = ModuleId(i as u32);
        // Empty the module's constraint list first: lowering a single entry
        // (e.g. `Norm`) may push auxiliary constraints as a side effect, and
        // those must interleave with the lowered originals in push order
        // rather than be clobbered by a final bulk replace.
        let old_constraints = std::mem::take(module.constraints_mut());
        let mut ctx = AirLowering { module, mid, counter: 0 };
        for c in old_constraints {
            let lowered = lower_constraint(&mut ctx, c)?;
            ctx.module.constraints_mut().push(lowered);
        }
    }
    Ok(Schema::new(modules)?)
}

fn lower_constraint<F: Field>(ctx: &mut AirLowering<F>, c: Constraint<F>) -> Result<Constraint<F>> {
    Ok(match c {
        Constraint::Vanishing { name, rows, term } => {
            Constraint::Vanishing { name, rows, term: ctx.lower_arith(&term)? }
        }
        Constraint::Range { name, term, bound } => Constraint::Range { name, term: ctx.lower_arith(&term)?, bound },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{BabyBear, Module as SpecModule, RegisterId as Rid};

    fn base_module() -> SpecModule<BabyBear> {
        let mut m: SpecModule<BabyBear> = SpecModule::new("main", 1, false);
        m.try_add_register(Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        m
    }

    #[test]
    fn norm_lowering_adds_indicator_and_inverse_registers() {
        let mut m = base_module();
        let before = m.registers().len();
        let mut ctx = AirLowering { module: &mut m, mid: ModuleId(0), counter: 0 };
        let x = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), Rid(0), 0));
        let _ = ctx.lower_norm(x).unwrap();
        assert_eq!(m.registers().len(), before + 2);
        assert_eq!(m.constraints().len(), 3);
        assert_eq!(m.assignments().len(), 1);
    }

    #[test]
    fn cast_emits_range_constraint_and_passes_through_value() {
        let mut m = base_module();
        let mut ctx = AirLowering { module: &mut m, mid: ModuleId(0), counter: 0 };
        let x = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), Rid(0), 0));
        let lowered = ctx.lower_arith(&ArithTerm::Cast(Box::new(x.clone()), 8)).unwrap();
        assert_eq!(lowered, x);
        assert_eq!(m.constraints().len(), 1);
        match &m.constraints()[0] {
            Constraint::Range { bound, .. } => assert_eq!(*bound, 256),
            _ => panic!("expected range constraint"),
        }
    }

    #[test]
    fn exp_folds_into_repeated_multiplication() {
        let mut m = base_module();
        let mut ctx = AirLowering { module: &mut m, mid: ModuleId(0), counter: 0 };
        let x = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), Rid(0), 0));
        let lowered = ctx.lower_arith(&ArithTerm::Exp(Box::new(x.clone()), 3)).unwrap();
        match lowered {
            ArithTerm::Mul(xs) => assert_eq!(xs.len(), 3),
            _ => panic!("expected Mul"),
        }
    }

    #[test]
    fn not_equal_lowers_via_norm_and_equals_one() {
        let mut m = base_module();
        let mut ctx = AirLowering { module: &mut m, mid: ModuleId(0), counter: 0 };
        let x = ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), Rid(0), 0));
        let lt = LogicalTerm::NotEqual(Box::new(x), Box::new(ArithTerm::Constant(BabyBear(0))));
        let term = ctx.lower_logical(&lt).unwrap();
        match term {
            ArithTerm::Sub(xs) => assert_eq!(xs.len(), 2),
            _ => panic!("expected Sub"),
        }
        // one Norm lowering => 3 constraints pushed directly
        assert_eq!(m.constraints().len(), 3);
    }

    #[test]
    fn double_negation_is_identity() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Equal(
            Box::new(ArithTerm::Constant(BabyBear(1))),
            Box::new(ArithTerm::Constant(BabyBear(2))),
        );
        let negated_twice = push_negation(&push_negation(&t));
        assert_eq!(negated_twice, t);
    }
}
