//! Logical terms: boolean-valued predicates over arithmetic terms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::field::Field;
use crate::register::{ModuleId, RegisterId};
use crate::schema::Schema;
use crate::term::arith::ArithTerm;
use crate::trace::Trace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub enum LogicalTerm<F: Field> {
    Conjunct(Vec<LogicalTerm<F>>),
    Disjunct(Vec<LogicalTerm<F>>),
    Negate(Box<LogicalTerm<F>>),
    Equal(Box<ArithTerm<F>>, Box<ArithTerm<F>>),
    NotEqual(Box<ArithTerm<F>>, Box<ArithTerm<F>>),
    Inequality {
        strict: bool,
        lhs: Box<ArithTerm<F>>,
        rhs: Box<ArithTerm<F>>,
    },
    Ite {
        cond: Box<LogicalTerm<F>>,
        tt: Option<Box<LogicalTerm<F>>>,
        ff: Option<Box<LogicalTerm<F>>>,
    },
}

impl<F: Field> LogicalTerm<F> {
    /// Evaluate to a boolean plus an opaque branch witness identifying which
    /// disjunct (if any) succeeded; `0` otherwise.
    pub fn test_at<T: Trace<F>>(
        &self,
        row: i64,
        schema: &Schema<F>,
        trace: &T,
        cfg: &crate::config::EvalConfig,
    ) -> Result<(bool, u32)> {
        match self {
            LogicalTerm::Conjunct(xs) => {
                for x in xs {
                    let (b, _) = x.test_at(row, schema, trace, cfg)?;
                    if !b {
                        return Ok((false, 0));
                    }
                }
                Ok((true, 0))
            }
            LogicalTerm::Disjunct(xs) => {
                for (i, x) in xs.iter().enumerate() {
                    let (b, _) = x.test_at(row, schema, trace, cfg)?;
                    if b {
                        return Ok((true, i as u32 + 1));
                    }
                }
                Ok((false, 0))
            }
            LogicalTerm::Negate(x) => {
                let (b, w) = x.test_at(row, schema, trace, cfg)?;
                Ok((!b, w))
            }
            LogicalTerm::Equal(l, r) => {
                let lv = l.eval_at(row, schema, trace, cfg)?;
                let rv = r.eval_at(row, schema, trace, cfg)?;
                Ok((lv == rv, 0))
            }
            LogicalTerm::NotEqual(l, r) => {
                let lv = l.eval_at(row, schema, trace, cfg)?;
                let rv = r.eval_at(row, schema, trace, cfg)?;
                Ok((lv != rv, 0))
            }
            LogicalTerm::Inequality { strict, lhs, rhs } => {
                let lv = lhs.eval_at(row, schema, trace, cfg)?.to_canonical_u128();
                let rv = rhs.eval_at(row, schema, trace, cfg)?.to_canonical_u128();
                Ok((if *strict { lv < rv } else { lv <= rv }, 0))
            }
            LogicalTerm::Ite { cond, tt, ff } => {
                let (c, _) = cond.test_at(row, schema, trace, cfg)?;
                if c {
                    match tt {
                        Some(t) => t.test_at(row, schema, trace, cfg),
                        None => Ok((true, 0)),
                    }
                } else {
                    match ff {
                        Some(t) => t.test_at(row, schema, trace, cfg),
                        None => Ok((false, 0)),
                    }
                }
            }
        }
    }

    pub fn shift_range(&self) -> (i64, i64) {
        match self {
            LogicalTerm::Conjunct(xs) | LogicalTerm::Disjunct(xs) => {
                xs.iter().map(|x| x.shift_range()).reduce(merge).unwrap_or((0, 0))
            }
            LogicalTerm::Negate(x) => x.shift_range(),
            LogicalTerm::Equal(l, r) | LogicalTerm::NotEqual(l, r) => {
                merge(l.shift_range(), r.shift_range())
            }
            LogicalTerm::Inequality { lhs, rhs, .. } => merge(lhs.shift_range(), rhs.shift_range()),
            LogicalTerm::Ite { cond, tt, ff } => {
                let mut r = cond.shift_range();
                if let Some(t) = tt {
                    r = merge(r, t.shift_range());
                }
                if let Some(t) = ff {
                    r = merge(r, t.shift_range());
                }
                r
            }
        }
    }

    pub fn apply_shift(&self, k: i64) -> Self {
        match self {
            LogicalTerm::Conjunct(xs) => {
                LogicalTerm::Conjunct(xs.iter().map(|x| x.apply_shift(k)).collect())
            }
            LogicalTerm::Disjunct(xs) => {
                LogicalTerm::Disjunct(xs.iter().map(|x| x.apply_shift(k)).collect())
            }
            LogicalTerm::Negate(x) => LogicalTerm::Negate(Box::new(x.apply_shift(k))),
            LogicalTerm::Equal(l, r) => {
                LogicalTerm::Equal(Box::new(l.apply_shift(k)), Box::new(r.apply_shift(k)))
            }
            LogicalTerm::NotEqual(l, r) => {
                LogicalTerm::NotEqual(Box::new(l.apply_shift(k)), Box::new(r.apply_shift(k)))
            }
            LogicalTerm::Inequality { strict, lhs, rhs } => LogicalTerm::Inequality {
                strict: *strict,
                lhs: Box::new(lhs.apply_shift(k)),
                rhs: Box::new(rhs.apply_shift(k)),
            },
            LogicalTerm::Ite { cond, tt, ff } => LogicalTerm::Ite {
                cond: Box::new(cond.apply_shift(k)),
                tt: tt.as_ref().map(|t| Box::new(t.apply_shift(k))),
                ff: ff.as_ref().map(|t| Box::new(t.apply_shift(k))),
            },
        }
    }

    pub fn required_registers(&self) -> BTreeSet<(ModuleId, RegisterId)> {
        let mut acc = BTreeSet::new();
        self.collect_registers(&mut acc);
        acc
    }

    pub(crate) fn collect_registers(&self, acc: &mut BTreeSet<(ModuleId, RegisterId)>) {
        match self {
            LogicalTerm::Conjunct(xs) | LogicalTerm::Disjunct(xs) => {
                for x in xs {
                    x.collect_registers(acc);
                }
            }
            LogicalTerm::Negate(x) => x.collect_registers(acc),
            LogicalTerm::Equal(l, r) | LogicalTerm::NotEqual(l, r) => {
                l.collect_registers(acc);
                r.collect_registers(acc);
            }
            LogicalTerm::Inequality { lhs, rhs, .. } => {
                lhs.collect_registers(acc);
                rhs.collect_registers(acc);
            }
            LogicalTerm::Ite { cond, tt, ff } => {
                cond.collect_registers(acc);
                if let Some(t) = tt {
                    t.collect_registers(acc);
                }
                if let Some(t) = ff {
                    t.collect_registers(acc);
                }
            }
        }
    }

    /// Every absolute `(module, register, row)` cell this term reads when
    /// evaluated at `row` inside `module`; see [`ArithTerm::required_cells`].
    pub fn required_cells(&self, row: i64, module: ModuleId) -> BTreeSet<(ModuleId, RegisterId, i64)> {
        let mut acc = BTreeSet::new();
        self.collect_cells(row, module, &mut acc);
        acc
    }

    pub(crate) fn collect_cells(&self, row: i64, module: ModuleId, acc: &mut BTreeSet<(ModuleId, RegisterId, i64)>) {
        match self {
            LogicalTerm::Conjunct(xs) | LogicalTerm::Disjunct(xs) => {
                for x in xs {
                    x.collect_cells(row, module, acc);
                }
            }
            LogicalTerm::Negate(x) => x.collect_cells(row, module, acc),
            LogicalTerm::Equal(l, r) | LogicalTerm::NotEqual(l, r) => {
                l.collect_cells(row, module, acc);
                r.collect_cells(row, module, acc);
            }
            LogicalTerm::Inequality { lhs, rhs, .. } => {
                lhs.collect_cells(row, module, acc);
                rhs.collect_cells(row, module, acc);
            }
            LogicalTerm::Ite { cond, tt, ff } => {
                cond.collect_cells(row, module, acc);
                if let Some(t) = tt {
                    t.collect_cells(row, module, acc);
                }
                if let Some(t) = ff {
                    t.collect_cells(row, module, acc);
                }
            }
        }
    }

    pub fn substitute_labels(&self, bindings: &std::collections::HashMap<String, F>) -> Self {
        match self {
            LogicalTerm::Conjunct(xs) => {
                LogicalTerm::Conjunct(xs.iter().map(|x| x.substitute_labels(bindings)).collect())
            }
            LogicalTerm::Disjunct(xs) => {
                LogicalTerm::Disjunct(xs.iter().map(|x| x.substitute_labels(bindings)).collect())
            }
            LogicalTerm::Negate(x) => LogicalTerm::Negate(Box::new(x.substitute_labels(bindings))),
            LogicalTerm::Equal(l, r) => LogicalTerm::Equal(
                Box::new(l.substitute_labels(bindings)),
                Box::new(r.substitute_labels(bindings)),
            ),
            LogicalTerm::NotEqual(l, r) => LogicalTerm::NotEqual(
                Box::new(l.substitute_labels(bindings)),
                Box::new(r.substitute_labels(bindings)),
            ),
            LogicalTerm::Inequality { strict, lhs, rhs } => LogicalTerm::Inequality {
                strict: *strict,
                lhs: Box::new(lhs.substitute_labels(bindings)),
                rhs: Box::new(rhs.substitute_labels(bindings)),
            },
            LogicalTerm::Ite { cond, tt, ff } => LogicalTerm::Ite {
                cond: Box::new(cond.substitute_labels(bindings)),
                tt: tt.as_ref().map(|t| Box::new(t.substitute_labels(bindings))),
                ff: ff.as_ref().map(|t| Box::new(t.substitute_labels(bindings))),
            },
        }
    }

    pub fn to_sexpr(&self) -> String {
        match self {
            LogicalTerm::Conjunct(xs) => sexpr_list("and", xs),
            LogicalTerm::Disjunct(xs) => sexpr_list("or", xs),
            LogicalTerm::Negate(x) => format!("(not {})", x.to_sexpr()),
            LogicalTerm::Equal(l, r) => format!("(= {} {})", l.to_sexpr(), r.to_sexpr()),
            LogicalTerm::NotEqual(l, r) => format!("(!= {} {})", l.to_sexpr(), r.to_sexpr()),
            LogicalTerm::Inequality { strict, lhs, rhs } => format!(
                "({} {} {})",
                if *strict { "<" } else { "<=" },
                lhs.to_sexpr(),
                rhs.to_sexpr()
            ),
            LogicalTerm::Ite { cond, tt, ff } => format!(
                "(ite {} {} {})",
                cond.to_sexpr(),
                tt.as_ref().map(|t| t.to_sexpr()).unwrap_or_else(|| "_".into()),
                ff.as_ref().map(|t| t.to_sexpr()).unwrap_or_else(|| "_".into()),
            ),
        }
    }
}

/// Canonical tag mirroring `LogicalTerm`'s variant order 1:1; see
/// [`crate::term::arith::ArithTermTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicalTermTag {
    Conjunct = 0,
    Disjunct = 1,
    Negate = 2,
    Equal = 3,
    NotEqual = 4,
    Inequality = 5,
    Ite = 6,
}

impl<F: Field> LogicalTerm<F> {
    pub fn tag(&self) -> LogicalTermTag {
        match self {
            LogicalTerm::Conjunct(_) => LogicalTermTag::Conjunct,
            LogicalTerm::Disjunct(_) => LogicalTermTag::Disjunct,
            LogicalTerm::Negate(_) => LogicalTermTag::Negate,
            LogicalTerm::Equal(..) => LogicalTermTag::Equal,
            LogicalTerm::NotEqual(..) => LogicalTermTag::NotEqual,
            LogicalTerm::Inequality { .. } => LogicalTermTag::Inequality,
            LogicalTerm::Ite { .. } => LogicalTermTag::Ite,
        }
    }
}

fn sexpr_list<F: Field>(op: &str, xs: &[LogicalTerm<F>]) -> String {
    let inner: Vec<String> = xs.iter().map(|x| x.to_sexpr()).collect();
    format!("({} {})", op, inner.join(" "))
}

fn merge(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    (a.0.min(b.0), a.1.max(b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BabyBear;
    use crate::term::arith::RegisterAccess;

    #[test]
    fn negate_flips_result() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Negate(Box::new(LogicalTerm::Equal(
            Box::new(ArithTerm::Constant(BabyBear(1))),
            Box::new(ArithTerm::Constant(BabyBear(1))),
        )));
        assert_eq!(t.shift_range(), (0, 0));
    }

    #[test]
    fn conjunct_of_empty_is_identity_shift() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Conjunct(vec![]);
        assert_eq!(t.shift_range(), (0, 0));
    }

    #[test]
    fn conjunct_shift_range_does_not_force_zero_into_all_positive_shifts() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Conjunct(vec![
            LogicalTerm::Equal(
                Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 3))),
                Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 5))),
            ),
        ]);
        assert_eq!(t.shift_range(), (3, 5));
    }

    #[test]
    fn disjunct_shift_range_does_not_force_zero_into_all_negative_shifts() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Disjunct(vec![
            LogicalTerm::Equal(
                Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -5))),
                Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), -3))),
            ),
        ]);
        assert_eq!(t.shift_range(), (-5, -3));
    }

    #[test]
    fn required_cells_are_a_subset_of_required_registers() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Equal(
            Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -1))),
            Box::new(ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 2))),
        );
        let registers = t.required_registers();
        let cells = t.required_cells(5, ModuleId(0));
        let projected: BTreeSet<(ModuleId, RegisterId)> = cells.iter().map(|(m, r, _)| (*m, *r)).collect();
        assert!(projected.is_subset(&registers));
        assert_eq!(cells, BTreeSet::from([(ModuleId(0), RegisterId(0), 4), (ModuleId(0), RegisterId(1), 7)]));
    }

    #[test]
    fn to_sexpr_equal() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Equal(
            Box::new(ArithTerm::Constant(BabyBear(1))),
            Box::new(ArithTerm::Constant(BabyBear(2))),
        );
        assert_eq!(t.to_sexpr(), "(= 1 2)");
    }
}
