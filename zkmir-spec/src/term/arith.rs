//! Arithmetic terms: the expression language shared by HIR, MIR and AIR.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, SpecError};
use crate::field::Field;
use crate::module::Module;
use crate::register::{ModuleId, RegisterId};
use crate::schema::Schema;
use crate::term::logical::LogicalTerm;
use crate::trace::Trace;

/// A single column read, relative to the row under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAccess {
    pub module: ModuleId,
    pub register: RegisterId,
    pub shift: i64,
}

impl RegisterAccess {
    pub fn new(module: ModuleId, register: RegisterId, shift: i64) -> Self {
        Self { module, register, shift }
    }
}

/// Arithmetic expression tree, generic over the field it evaluates into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub enum ArithTerm<F: Field> {
    Constant(F),
    LabelledConst(String, F),
    RegisterAccess(RegisterAccess),
    VectorAccess(Vec<RegisterAccess>),
    Add(Vec<ArithTerm<F>>),
    Sub(Vec<ArithTerm<F>>),
    Mul(Vec<ArithTerm<F>>),
    Exp(Box<ArithTerm<F>>, u64),
    Cast(Box<ArithTerm<F>>, u32),
    Norm(Box<ArithTerm<F>>),
    /// Branches on whether `cond` evaluates to zero. `cond` is an arithmetic
    /// term (not a `LogicalTerm`): the zero-test is the only predicate this
    /// constructor needs, and keeping it arithmetic is what lets HIR-to-MIR
    /// lowering rewrite it as `Mul[Sub[1, Norm[cond]], tt]` directly.
    IfZero {
        cond: Box<ArithTerm<F>>,
        tt: Option<Box<ArithTerm<F>>>,
        ff: Option<Box<ArithTerm<F>>>,
    },
}

impl<F: Field> ArithTerm<F> {
    /// Evaluate this term at `row` within `module`, resolving register reads
    /// against `trace`. Out-of-range reads use the register's padding value
    /// unless `cfg.allow_padding_reads` is false.
    pub fn eval_at<T: Trace<F>>(
        &self,
        row: i64,
        schema: &Schema<F>,
        trace: &T,
        cfg: &crate::config::EvalConfig,
    ) -> Result<F> {
        match self {
            ArithTerm::Constant(c) => Ok(*c),
            ArithTerm::LabelledConst(_, c) => Ok(*c),
            ArithTerm::RegisterAccess(ra) => read_register(ra, row, schema, trace, cfg),
            ArithTerm::VectorAccess(parts) => {
                let mut acc = F::ZERO;
                let mut shift_bits = 0u32;
                for ra in parts {
                    let module = schema.module(ra.module)?;
                    let width = module.register(ra.register)?.width();
                    let v = read_register(ra, row, schema, trace, cfg)?;
                    let scale = F::from_u128(1u128 << shift_bits);
                    acc = acc.add(v.mul(scale));
                    shift_bits += width;
                }
                Ok(acc)
            }
            ArithTerm::Add(xs) => {
                let mut acc = F::ZERO;
                for x in xs {
                    acc = acc.add(x.eval_at(row, schema, trace, cfg)?);
                }
                Ok(acc)
            }
            ArithTerm::Sub(xs) => {
                if xs.is_empty() {
                    return Ok(F::ZERO);
                }
                let mut iter = xs.iter();
                let mut acc = iter.next().unwrap().eval_at(row, schema, trace, cfg)?;
                for x in iter {
                    acc = acc.sub(x.eval_at(row, schema, trace, cfg)?);
                }
                Ok(acc)
            }
            ArithTerm::Mul(xs) => {
                let mut acc = F::ONE;
                for x in xs {
                    let v = x.eval_at(row, schema, trace, cfg)?;
                    if v.is_zero() {
                        return Ok(F::ZERO);
                    }
                    acc = acc.mul(v);
                }
                Ok(acc)
            }
            ArithTerm::Exp(base, k) => Ok(base.eval_at(row, schema, trace, cfg)?.pow(*k)),
            ArithTerm::Cast(t, width) => {
                let v = t.eval_at(row, schema, trace, cfg)?;
                let bound = 1u128 << width;
                if v.to_canonical_u128() >= bound {
                    Err(SpecError::CastFailure { value: v.to_canonical_u128(), width: *width })
                } else {
                    Ok(v)
                }
            }
            ArithTerm::Norm(t) => {
                let v = t.eval_at(row, schema, trace, cfg)?;
                Ok(if v.is_zero() { F::ZERO } else { F::ONE })
            }
            ArithTerm::IfZero { cond, tt, ff } => {
                let is_zero = cond.eval_at(row, schema, trace, cfg)?.is_zero();
                if is_zero {
                    match tt {
                        Some(t) => t.eval_at(row, schema, trace, cfg),
                        None => Ok(F::ZERO),
                    }
                } else {
                    match ff {
                        Some(t) => t.eval_at(row, schema, trace, cfg),
                        None => Ok(F::ZERO),
                    }
                }
            }
        }
    }

    /// Minimum and maximum row shift reachable from this term.
    pub fn shift_range(&self) -> (i64, i64) {
        match self {
            ArithTerm::Constant(_) | ArithTerm::LabelledConst(..) => (0, 0),
            ArithTerm::RegisterAccess(ra) => (ra.shift, ra.shift),
            ArithTerm::VectorAccess(parts) => fold_range(parts.iter().map(|p| (p.shift, p.shift))),
            ArithTerm::Add(xs) | ArithTerm::Sub(xs) | ArithTerm::Mul(xs) => {
                fold_range(xs.iter().map(|x| x.shift_range()))
            }
            ArithTerm::Exp(t, _) | ArithTerm::Cast(t, _) | ArithTerm::Norm(t) => t.shift_range(),
            ArithTerm::IfZero { cond, tt, ff } => {
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

    /// Push `k` into every register access, shifting the whole term forward.
    pub fn apply_shift(&self, k: i64) -> Self {
        match self {
            ArithTerm::Constant(c) => ArithTerm::Constant(*c),
            ArithTerm::LabelledConst(l, c) => ArithTerm::LabelledConst(l.clone(), *c),
            ArithTerm::RegisterAccess(ra) => ArithTerm::RegisterAccess(RegisterAccess {
                shift: ra.shift + k,
                ..*ra
            }),
            ArithTerm::VectorAccess(parts) => ArithTerm::VectorAccess(
                parts.iter().map(|p| RegisterAccess { shift: p.shift + k, ..*p }).collect(),
            ),
            ArithTerm::Add(xs) => ArithTerm::Add(xs.iter().map(|x| x.apply_shift(k)).collect()),
            ArithTerm::Sub(xs) => ArithTerm::Sub(xs.iter().map(|x| x.apply_shift(k)).collect()),
            ArithTerm::Mul(xs) => ArithTerm::Mul(xs.iter().map(|x| x.apply_shift(k)).collect()),
            ArithTerm::Exp(t, e) => ArithTerm::Exp(Box::new(t.apply_shift(k)), *e),
            ArithTerm::Cast(t, w) => ArithTerm::Cast(Box::new(t.apply_shift(k)), *w),
            ArithTerm::Norm(t) => ArithTerm::Norm(Box::new(t.apply_shift(k))),
            ArithTerm::IfZero { cond, tt, ff } => ArithTerm::IfZero {
                cond: Box::new(cond.apply_shift(k)),
                tt: tt.as_ref().map(|t| Box::new(t.apply_shift(k))),
                ff: ff.as_ref().map(|t| Box::new(t.apply_shift(k))),
            },
        }
    }

    /// All `(module, register)` pairs this term reads, regardless of row shift.
    pub fn required_registers(&self) -> BTreeSet<(ModuleId, RegisterId)> {
        let mut acc = BTreeSet::new();
        self.collect_registers(&mut acc);
        acc
    }

    pub(crate) fn collect_registers(&self, acc: &mut BTreeSet<(ModuleId, RegisterId)>) {
        match self {
            ArithTerm::Constant(_) | ArithTerm::LabelledConst(..) => {}
            ArithTerm::RegisterAccess(ra) => {
                acc.insert((ra.module, ra.register));
            }
            ArithTerm::VectorAccess(parts) => {
                for p in parts {
                    acc.insert((p.module, p.register));
                }
            }
            ArithTerm::Add(xs) | ArithTerm::Sub(xs) | ArithTerm::Mul(xs) => {
                for x in xs {
                    x.collect_registers(acc);
                }
            }
            ArithTerm::Exp(t, _) | ArithTerm::Cast(t, _) | ArithTerm::Norm(t) => t.collect_registers(acc),
            ArithTerm::IfZero { cond, tt, ff } => {
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
    /// evaluated at `row` inside `module`, each access's shift folded into
    /// the row. Used by the evaluator to bound row access and by the
    /// consistency checker to infer a constraint's enclosing module.
    pub fn required_cells(&self, row: i64, module: ModuleId) -> BTreeSet<(ModuleId, RegisterId, i64)> {
        let mut acc = BTreeSet::new();
        self.collect_cells(row, module, &mut acc);
        acc
    }

    pub(crate) fn collect_cells(&self, row: i64, module: ModuleId, acc: &mut BTreeSet<(ModuleId, RegisterId, i64)>) {
        match self {
            ArithTerm::Constant(_) | ArithTerm::LabelledConst(..) => {}
            ArithTerm::RegisterAccess(ra) => {
                acc.insert((module, ra.register, row + ra.shift));
            }
            ArithTerm::VectorAccess(parts) => {
                for p in parts {
                    acc.insert((module, p.register, row + p.shift));
                }
            }
            ArithTerm::Add(xs) | ArithTerm::Sub(xs) | ArithTerm::Mul(xs) => {
                for x in xs {
                    x.collect_cells(row, module, acc);
                }
            }
            ArithTerm::Exp(t, _) | ArithTerm::Cast(t, _) | ArithTerm::Norm(t) => t.collect_cells(row, module, acc),
            ArithTerm::IfZero { cond, tt, ff } => {
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

    /// Replace every `LabelledConst` whose label is bound in `bindings` with
    /// its new value. Terms are logically immutable, so this produces a fresh
    /// tree rather than mutating in place.
    pub fn substitute_labels(&self, bindings: &std::collections::HashMap<String, F>) -> Self {
        match self {
            ArithTerm::LabelledConst(label, c) => match bindings.get(label) {
                Some(v) => ArithTerm::LabelledConst(label.clone(), *v),
                None => ArithTerm::LabelledConst(label.clone(), *c),
            },
            ArithTerm::Constant(c) => ArithTerm::Constant(*c),
            ArithTerm::RegisterAccess(ra) => ArithTerm::RegisterAccess(ra.clone()),
            ArithTerm::VectorAccess(v) => ArithTerm::VectorAccess(v.clone()),
            ArithTerm::Add(xs) => ArithTerm::Add(xs.iter().map(|x| x.substitute_labels(bindings)).collect()),
            ArithTerm::Sub(xs) => ArithTerm::Sub(xs.iter().map(|x| x.substitute_labels(bindings)).collect()),
            ArithTerm::Mul(xs) => ArithTerm::Mul(xs.iter().map(|x| x.substitute_labels(bindings)).collect()),
            ArithTerm::Exp(t, e) => ArithTerm::Exp(Box::new(t.substitute_labels(bindings)), *e),
            ArithTerm::Cast(t, w) => ArithTerm::Cast(Box::new(t.substitute_labels(bindings)), *w),
            ArithTerm::Norm(t) => ArithTerm::Norm(Box::new(t.substitute_labels(bindings))),
            ArithTerm::IfZero { cond, tt, ff } => ArithTerm::IfZero {
                cond: Box::new(cond.substitute_labels(bindings)),
                tt: tt.as_ref().map(|t| Box::new(t.substitute_labels(bindings))),
                ff: ff.as_ref().map(|t| Box::new(t.substitute_labels(bindings))),
            },
        }
    }

    /// S-expression rendering, used by `zkmir-print` and for debug output.
    pub fn to_sexpr(&self) -> String {
        match self {
            ArithTerm::Constant(c) => format!("{}", c),
            ArithTerm::LabelledConst(l, c) => format!("(label {} {})", l, c),
            ArithTerm::RegisterAccess(ra) => format!("(reg {} {} {})", ra.module, ra.register, ra.shift),
            ArithTerm::VectorAccess(parts) => {
                let inner: Vec<String> = parts
                    .iter()
                    .map(|p| format!("(reg {} {} {})", p.module, p.register, p.shift))
                    .collect();
                format!("(vector {})", inner.join(" "))
            }
            ArithTerm::Add(xs) => sexpr_list("add", xs),
            ArithTerm::Sub(xs) => sexpr_list("sub", xs),
            ArithTerm::Mul(xs) => sexpr_list("mul", xs),
            ArithTerm::Exp(t, e) => format!("(exp {} {})", t.to_sexpr(), e),
            ArithTerm::Cast(t, w) => format!("(cast {} {})", t.to_sexpr(), w),
            ArithTerm::Norm(t) => format!("(norm {})", t.to_sexpr()),
            ArithTerm::IfZero { cond, tt, ff } => format!(
                "(if-zero {} {} {})",
                cond.to_sexpr(),
                tt.as_ref().map(|t| t.to_sexpr()).unwrap_or_else(|| "_".into()),
                ff.as_ref().map(|t| t.to_sexpr()).unwrap_or_else(|| "_".into()),
            ),
        }
    }
}

fn sexpr_list<F: Field>(op: &str, xs: &[ArithTerm<F>]) -> String {
    let inner: Vec<String> = xs.iter().map(|x| x.to_sexpr()).collect();
    format!("({} {})", op, inner.join(" "))
}

/// Canonical tag mirroring `ArithTerm`'s variant order 1:1, so `zkmir-print`
/// can assert its binary codec's `bincode` discriminants haven't drifted
/// from this registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArithTermTag {
    Constant = 0,
    LabelledConst = 1,
    RegisterAccess = 2,
    VectorAccess = 3,
    Add = 4,
    Sub = 5,
    Mul = 6,
    Exp = 7,
    Cast = 8,
    Norm = 9,
    IfZero = 10,
}

impl<F: Field> ArithTerm<F> {
    pub fn tag(&self) -> ArithTermTag {
        match self {
            ArithTerm::Constant(_) => ArithTermTag::Constant,
            ArithTerm::LabelledConst(..) => ArithTermTag::LabelledConst,
            ArithTerm::RegisterAccess(_) => ArithTermTag::RegisterAccess,
            ArithTerm::VectorAccess(_) => ArithTermTag::VectorAccess,
            ArithTerm::Add(_) => ArithTermTag::Add,
            ArithTerm::Sub(_) => ArithTermTag::Sub,
            ArithTerm::Mul(_) => ArithTermTag::Mul,
            ArithTerm::Exp(..) => ArithTermTag::Exp,
            ArithTerm::Cast(..) => ArithTermTag::Cast,
            ArithTerm::Norm(_) => ArithTermTag::Norm,
            ArithTerm::IfZero { .. } => ArithTermTag::IfZero,
        }
    }
}

fn read_register<F: Field, T: Trace<F>>(
    ra: &RegisterAccess,
    row: i64,
    schema: &Schema<F>,
    trace: &T,
    cfg: &crate::config::EvalConfig,
) -> Result<F> {
    let target_row = row + ra.shift;
    let module: &Module<F> = schema.module(ra.module)?;
    let height = trace.height(ra.module) as i64;
    if target_row < 0 || target_row >= height {
        return if cfg.allow_padding_reads {
            let reg = module.register(ra.register)?;
            Ok(F::from_u128(reg.padding()))
        } else {
            Err(SpecError::OutOfRange { row: target_row })
        };
    }
    match trace.get(ra.module, ra.register, target_row) {
        Some(v) => Ok(v),
        None if cfg.allow_padding_reads => {
            let reg = module.register(ra.register)?;
            Ok(F::from_u128(reg.padding()))
        }
        None => Err(SpecError::OutOfRange { row: target_row }),
    }
}

fn fold_range(iter: impl Iterator<Item = (i64, i64)>) -> (i64, i64) {
    iter.reduce(merge).unwrap_or((0, 0))
}

fn merge(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    (a.0.min(b.0), a.1.max(b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BabyBear;

    #[test]
    fn shift_range_of_register_access() {
        let t: ArithTerm<BabyBear> =
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -1));
        assert_eq!(t.shift_range(), (-1, -1));
    }

    #[test]
    fn apply_shift_is_additive() {
        let t: ArithTerm<BabyBear> =
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 2));
        let shifted = t.apply_shift(3).apply_shift(4);
        let once = t.apply_shift(7);
        assert_eq!(shifted, once);
    }

    #[test]
    fn mul_short_circuits_on_zero_shift_range() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -2)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 5)),
        ];
        let t = ArithTerm::Mul(xs);
        assert_eq!(t.shift_range(), (-2, 5));
    }

    #[test]
    fn shift_range_does_not_force_zero_into_all_positive_shifts() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 3)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 5)),
        ];
        let t = ArithTerm::Add(xs);
        assert_eq!(t.shift_range(), (3, 5));
    }

    #[test]
    fn shift_range_does_not_force_zero_into_all_negative_shifts() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -5)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), -3)),
        ];
        let t = ArithTerm::Sub(xs);
        assert_eq!(t.shift_range(), (-5, -3));
    }

    #[test]
    fn shift_range_commutes_with_apply_shift() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 3)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 5)),
        ];
        let t = ArithTerm::Add(xs);
        let (lo, hi) = t.shift_range();
        let (shifted_lo, shifted_hi) = t.apply_shift(2).shift_range();
        assert_eq!((shifted_lo, shifted_hi), (lo + 2, hi + 2));
    }

    #[test]
    fn required_registers_collects_all_accesses() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), 0)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 0)),
        ];
        let t = ArithTerm::Add(xs);
        let regs = t.required_registers();
        assert_eq!(regs.len(), 2);
    }

    #[test]
    fn required_cells_offsets_row_by_shift() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -1)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 2)),
        ];
        let t = ArithTerm::Add(xs);
        let cells = t.required_cells(10, ModuleId(0));
        assert_eq!(cells, BTreeSet::from([(ModuleId(0), RegisterId(0), 9), (ModuleId(0), RegisterId(1), 12)]));
    }

    #[test]
    fn required_cells_are_a_subset_of_required_registers() {
        let xs: Vec<ArithTerm<BabyBear>> = vec![
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(0), -1)),
            ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(1), 2)),
        ];
        let t = ArithTerm::Mul(xs);
        let registers = t.required_registers();
        let cells = t.required_cells(5, ModuleId(0));
        let projected: BTreeSet<(ModuleId, RegisterId)> = cells.iter().map(|(m, r, _)| (*m, *r)).collect();
        assert!(projected.is_subset(&registers));
    }

    #[test]
    fn substitute_labels_rebinds_matching_label() {
        let t: ArithTerm<BabyBear> = ArithTerm::LabelledConst("k".into(), BabyBear(1));
        let mut bindings = std::collections::HashMap::new();
        bindings.insert("k".to_string(), BabyBear(9));
        let rebound = t.substitute_labels(&bindings);
        assert_eq!(rebound, ArithTerm::LabelledConst("k".into(), BabyBear(9)));
    }

    #[test]
    fn sexpr_rendering_is_parenthesized() {
        let t: ArithTerm<BabyBear> = ArithTerm::Add(vec![
            ArithTerm::Constant(BabyBear(1)),
            ArithTerm::Constant(BabyBear(2)),
        ]);
        assert_eq!(t.to_sexpr(), "(add 1 2)");
    }
}
