//! Pure, idempotent rewrite rules on terms.

use zkmir_spec::{ArithTerm, Field, LogicalTerm, SimplifyConfig};

use crate::error::{LowerError, Result};

fn as_constant<F: Field>(t: &ArithTerm<F>) -> Option<F> {
    match t {
        ArithTerm::Constant(c) => Some(*c),
        ArithTerm::LabelledConst(_, c) => Some(*c),
        _ => None,
    }
}

fn is_true<F: Field>(t: &LogicalTerm<F>) -> bool {
    matches!(t, LogicalTerm::Conjunct(v) if v.is_empty())
}

fn is_false<F: Field>(t: &LogicalTerm<F>) -> bool {
    matches!(t, LogicalTerm::Disjunct(v) if v.is_empty())
}

fn truth<F: Field>(b: bool) -> LogicalTerm<F> {
    if b { LogicalTerm::Conjunct(vec![]) } else { LogicalTerm::Disjunct(vec![]) }
}

/// Simplify an arithmetic term. `Cast` over a non-constant argument is kept
/// when `cfg.keep_casts` is set (so AIR lowering can still emit a range
/// constraint for it) and elided otherwise.
pub fn simplify_arith<F: Field>(t: &ArithTerm<F>, cfg: &SimplifyConfig) -> Result<ArithTerm<F>> {
    let out = match t {
        ArithTerm::Constant(c) => ArithTerm::Constant(*c),
        ArithTerm::LabelledConst(l, c) => ArithTerm::LabelledConst(l.clone(), *c),
        ArithTerm::RegisterAccess(ra) => ArithTerm::RegisterAccess(ra.clone()),
        ArithTerm::VectorAccess(v) => ArithTerm::VectorAccess(v.clone()),
        ArithTerm::Add(xs) => simplify_nary(xs, cfg, F::ZERO, true, ArithTerm::Add, F::add)?,
        ArithTerm::Mul(xs) => {
            let simplified = simplify_children(xs, cfg)?;
            if simplified.iter().any(|x| as_constant(x) == Some(F::ZERO)) {
                ArithTerm::Constant(F::ZERO)
            } else {
                let flat = flatten(simplified, |x| matches!(x, ArithTerm::Mul(_)), |x| match x {
                    ArithTerm::Mul(xs) => xs,
                    other => vec![other],
                });
                let kept: Vec<_> = flat.into_iter().filter(|x| as_constant(x) != Some(F::ONE)).collect();
                fold_degenerate(kept, F::ONE, ArithTerm::Mul, F::mul)
            }
        }
        ArithTerm::Sub(xs) => {
            let simplified = simplify_children(xs, cfg)?;
            if simplified.is_empty() {
                ArithTerm::Constant(F::ZERO)
            } else if simplified.len() == 1 {
                simplified.into_iter().next().unwrap()
            } else if simplified.iter().all(|x| as_constant(x).is_some()) {
                let mut iter = simplified.iter().map(|x| as_constant(x).unwrap());
                let mut acc = iter.next().unwrap();
                for v in iter {
                    acc = acc.sub(v);
                }
                ArithTerm::Constant(acc)
            } else {
                let head = simplified[0].clone();
                let mut rest: Vec<_> = simplified[1..]
                    .iter()
                    .filter(|x| as_constant(x) != Some(F::ZERO))
                    .cloned()
                    .collect();
                if rest.is_empty() {
                    head
                } else {
                    rest.insert(0, head);
                    ArithTerm::Sub(rest)
                }
            }
        }
        ArithTerm::Exp(base, k) => {
            let b = simplify_arith(base, cfg)?;
            if *k == 0 {
                ArithTerm::Constant(F::ONE)
            } else if let Some(c) = as_constant(&b) {
                ArithTerm::Constant(c.pow(*k))
            } else {
                ArithTerm::Exp(Box::new(b), *k)
            }
        }
        ArithTerm::Cast(inner, width) => {
            let i = simplify_arith(inner, cfg)?;
            if let Some(c) = as_constant(&i) {
                let bound = 1u128 << width;
                if c.to_canonical_u128() < bound {
                    ArithTerm::Constant(c)
                } else {
                    return Err(LowerError::Spec(zkmir_spec::SpecError::TypeCastFailure {
                        value: c.to_canonical_u128(),
                        width: *width,
                    }));
                }
            } else if cfg.keep_casts {
                ArithTerm::Cast(Box::new(i), *width)
            } else {
                i
            }
        }
        ArithTerm::Norm(inner) => {
            let i = simplify_arith(inner, cfg)?;
            if let Some(c) = as_constant(&i) {
                ArithTerm::Constant(if c.is_zero() { F::ZERO } else { F::ONE })
            } else {
                ArithTerm::Norm(Box::new(i))
            }
        }
        ArithTerm::IfZero { cond, tt, ff } => {
            let c = simplify_logical(cond, cfg)?;
            let tt = tt.as_ref().map(|t| simplify_arith(t, cfg)).transpose()?;
            let ff = ff.as_ref().map(|t| simplify_arith(t, cfg)).transpose()?;
            if is_true(&c) {
                tt.unwrap_or(ArithTerm::Constant(F::ZERO))
            } else if is_false(&c) {
                ff.unwrap_or(ArithTerm::Constant(F::ZERO))
            } else {
                ArithTerm::IfZero { cond: Box::new(c), tt: tt.map(Box::new), ff: ff.map(Box::new) }
            }
        }
    };
    Ok(out)
}

fn simplify_children<F: Field>(xs: &[ArithTerm<F>], cfg: &SimplifyConfig) -> Result<Vec<ArithTerm<F>>> {
    xs.iter().map(|x| simplify_arith(x, cfg)).collect()
}

fn flatten<F: Field>(
    xs: Vec<ArithTerm<F>>,
    is_same: impl Fn(&ArithTerm<F>) -> bool,
    into_children: impl Fn(ArithTerm<F>) -> Vec<ArithTerm<F>>,
) -> Vec<ArithTerm<F>> {
    let mut out = Vec::new();
    for x in xs {
        if is_same(&x) {
            out.extend(into_children(x));
        } else {
            out.push(x);
        }
    }
    out
}

fn fold_degenerate<F: Field>(
    xs: Vec<ArithTerm<F>>,
    identity: F,
    wrap: impl Fn(Vec<ArithTerm<F>>) -> ArithTerm<F>,
    combine: impl Fn(F, F) -> F,
) -> ArithTerm<F> {
    if xs.iter().all(|x| as_constant(x).is_some()) {
        let acc = xs.iter().fold(identity, |acc, x| combine(acc, as_constant(x).unwrap()));
        return ArithTerm::Constant(acc);
    }
    match xs.len() {
        0 => ArithTerm::Constant(identity),
        1 => xs.into_iter().next().unwrap(),
        _ => wrap(xs),
    }
}

fn simplify_nary<F: Field>(
    xs: &[ArithTerm<F>],
    cfg: &SimplifyConfig,
    identity: F,
    flatten_add: bool,
    wrap: impl Fn(Vec<ArithTerm<F>>) -> ArithTerm<F>,
    combine: impl Fn(F, F) -> F,
) -> Result<ArithTerm<F>> {
    let simplified = simplify_children(xs, cfg)?;
    let flat = if flatten_add {
        flatten(simplified, |x| matches!(x, ArithTerm::Add(_)), |x| match x {
            ArithTerm::Add(xs) => xs,
            other => vec![other],
        })
    } else {
        simplified
    };
    let kept: Vec<_> = flat.into_iter().filter(|x| as_constant(x) != Some(identity)).collect();
    Ok(fold_degenerate(kept, identity, wrap, combine))
}

/// Simplify a logical term.
pub fn simplify_logical<F: Field>(t: &LogicalTerm<F>, cfg: &SimplifyConfig) -> Result<LogicalTerm<F>> {
    let out = match t {
        LogicalTerm::Conjunct(xs) => simplify_junction(xs, cfg, true)?,
        LogicalTerm::Disjunct(xs) => simplify_junction(xs, cfg, false)?,
        LogicalTerm::Negate(x) => {
            let s = simplify_logical(x, cfg)?;
            if is_true(&s) {
                truth(false)
            } else if is_false(&s) {
                truth(true)
            } else {
                LogicalTerm::Negate(Box::new(s))
            }
        }
        LogicalTerm::Equal(l, r) => {
            let l = simplify_arith(l, cfg)?;
            let r = simplify_arith(r, cfg)?;
            match (as_constant(&l), as_constant(&r)) {
                (Some(a), Some(b)) => truth(a == b),
                _ => LogicalTerm::Equal(Box::new(l), Box::new(r)),
            }
        }
        LogicalTerm::NotEqual(l, r) => {
            let l = simplify_arith(l, cfg)?;
            let r = simplify_arith(r, cfg)?;
            match (as_constant(&l), as_constant(&r)) {
                (Some(a), Some(b)) => truth(a != b),
                _ => LogicalTerm::NotEqual(Box::new(l), Box::new(r)),
            }
        }
        LogicalTerm::Inequality { strict, lhs, rhs } => {
            let l = simplify_arith(lhs, cfg)?;
            let r = simplify_arith(rhs, cfg)?;
            match (as_constant(&l), as_constant(&r)) {
                (Some(a), Some(b)) => {
                    let (av, bv) = (a.to_canonical_u128(), b.to_canonical_u128());
                    truth(if *strict { av < bv } else { av <= bv })
                }
                _ => LogicalTerm::Inequality { strict: *strict, lhs: Box::new(l), rhs: Box::new(r) },
            }
        }
        LogicalTerm::Ite { cond, tt, ff } => {
            let c = simplify_logical(cond, cfg)?;
            let tt = tt.as_ref().map(|t| simplify_logical(t, cfg)).transpose()?;
            let ff = ff.as_ref().map(|t| simplify_logical(t, cfg)).transpose()?;
            if is_true(&c) {
                tt.unwrap_or(truth(true))
            } else if is_false(&c) {
                ff.unwrap_or(truth(false))
            } else if tt.is_none() && ff.is_none() {
                truth(true)
            } else {
                LogicalTerm::Ite { cond: Box::new(c), tt: tt.map(Box::new), ff: ff.map(Box::new) }
            }
        }
    };
    Ok(out)
}

fn simplify_junction<F: Field>(
    xs: &[LogicalTerm<F>],
    cfg: &SimplifyConfig,
    is_conjunct: bool,
) -> Result<LogicalTerm<F>> {
    let simplified: Vec<_> = xs.iter().map(|x| simplify_logical(x, cfg)).collect::<Result<_>>()?;
    let absorbing = if is_conjunct { is_false::<F> } else { is_true::<F> };
    let identity = if is_conjunct { is_true::<F> } else { is_false::<F> };
    if simplified.iter().any(|x| absorbing(x)) {
        return Ok(truth(!is_conjunct));
    }
    let is_same = |x: &LogicalTerm<F>| {
        if is_conjunct { matches!(x, LogicalTerm::Conjunct(_)) } else { matches!(x, LogicalTerm::Disjunct(_)) }
    };
    let mut flat = Vec::new();
    for x in simplified {
        if is_same(&x) {
            let children = match x {
                LogicalTerm::Conjunct(v) | LogicalTerm::Disjunct(v) => v,
                _ => unreachable!(),
            };
            flat.extend(children);
        } else {
            flat.push(x);
        }
    }
    let kept: Vec<_> = flat.into_iter().filter(|x| !identity(x)).collect();
    Ok(match kept.len() {
        0 => truth(is_conjunct),
        1 => kept.into_iter().next().unwrap(),
        _ => if is_conjunct { LogicalTerm::Conjunct(kept) } else { LogicalTerm::Disjunct(kept) },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::BabyBear;

    fn cfg() -> SimplifyConfig {
        SimplifyConfig::DEFAULT
    }

    #[test]
    fn folds_constant_addition() {
        let t: ArithTerm<BabyBear> = ArithTerm::Add(vec![
            ArithTerm::Constant(BabyBear(3)),
            ArithTerm::Mul(vec![ArithTerm::Constant(BabyBear(0)), ArithTerm::Constant(BabyBear(9))]),
            ArithTerm::Constant(BabyBear(2)),
        ]);
        let s = simplify_arith(&t, &cfg()).unwrap();
        assert_eq!(s, ArithTerm::Constant(BabyBear(5)));
    }

    #[test]
    fn mul_with_zero_child_collapses() {
        let t: ArithTerm<BabyBear> = ArithTerm::Mul(vec![
            ArithTerm::RegisterAccess(zkmir_spec::RegisterAccess::new(
                zkmir_spec::ModuleId(0),
                zkmir_spec::RegisterId(0),
                0,
            )),
            ArithTerm::Constant(BabyBear(0)),
        ]);
        assert_eq!(simplify_arith(&t, &cfg()).unwrap(), ArithTerm::Constant(BabyBear(0)));
    }

    #[test]
    fn simplify_is_idempotent() {
        let t: ArithTerm<BabyBear> = ArithTerm::Add(vec![
            ArithTerm::Add(vec![ArithTerm::Constant(BabyBear(1)), ArithTerm::Constant(BabyBear(0))]),
            ArithTerm::Sub(vec![ArithTerm::Constant(BabyBear(5))]),
        ]);
        let once = simplify_arith(&t, &cfg()).unwrap();
        let twice = simplify_arith(&once, &cfg()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn conjunct_with_false_child_collapses() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Conjunct(vec![
            LogicalTerm::Disjunct(vec![]),
            LogicalTerm::Equal(Box::new(ArithTerm::Constant(BabyBear(1))), Box::new(ArithTerm::Constant(BabyBear(1)))),
        ]);
        let s = simplify_logical(&t, &cfg()).unwrap();
        assert!(is_false(&s));
    }

    #[test]
    fn ite_folds_on_constant_condition() {
        let t: LogicalTerm<BabyBear> = LogicalTerm::Ite {
            cond: Box::new(LogicalTerm::Conjunct(vec![])),
            tt: Some(Box::new(LogicalTerm::Disjunct(vec![]))),
            ff: None,
        };
        let s = simplify_logical(&t, &cfg()).unwrap();
        assert!(is_false(&s));
    }

    #[test]
    fn keep_casts_false_elides_nonconstant_cast() {
        let mut c = cfg();
        c.keep_casts = false;
        let ra = ArithTerm::RegisterAccess(zkmir_spec::RegisterAccess::new(
            zkmir_spec::ModuleId(0),
            zkmir_spec::RegisterId(0),
            0,
        ));
        let t = ArithTerm::Cast(Box::new(ra.clone()), 8);
        assert_eq!(simplify_arith(&t, &c).unwrap(), ra);
    }

    #[test]
    fn cast_of_oversized_constant_is_fatal() {
        let t: ArithTerm<BabyBear> = ArithTerm::Cast(Box::new(ArithTerm::Constant(BabyBear(300))), 8);
        assert!(simplify_arith(&t, &cfg()).is_err());
    }
}
