//! HIR -> MIR lowering: cross-product expansion of list-valued constraints
//! and of `IfZero` branches.

use zkmir_spec::{ArithTerm, Field};

/// Lower a single HIR term into the (possibly several) MIR terms it expands
/// to. `IfZero` branches: for each lowering `x` of `cond` and `y` of `tt`,
/// emit `Mul[Sub[1, Norm[x]], y]`; for each lowering `x` of `cond` and `z` of
/// `ff`, emit `Mul[x, z]`. A missing branch contributes nothing.
pub fn lower_term<F: Field>(t: &ArithTerm<F>) -> Vec<ArithTerm<F>> {
    match t {
        ArithTerm::Constant(c) => vec![ArithTerm::Constant(*c)],
        ArithTerm::LabelledConst(l, c) => vec![ArithTerm::LabelledConst(l.clone(), *c)],
        ArithTerm::RegisterAccess(ra) => vec![ArithTerm::RegisterAccess(ra.clone())],
        ArithTerm::VectorAccess(v) => vec![ArithTerm::VectorAccess(v.clone())],
        ArithTerm::Add(xs) => cross_product(xs, ArithTerm::Add),
        ArithTerm::Sub(xs) => cross_product(xs, ArithTerm::Sub),
        ArithTerm::Mul(xs) => cross_product(xs, ArithTerm::Mul),
        ArithTerm::Exp(inner, k) => lower_term(inner).into_iter().map(|x| ArithTerm::Exp(Box::new(x), *k)).collect(),
        ArithTerm::Cast(inner, w) => lower_term(inner).into_iter().map(|x| ArithTerm::Cast(Box::new(x), *w)).collect(),
        ArithTerm::Norm(inner) => lower_term(inner).into_iter().map(|x| ArithTerm::Norm(Box::new(x))).collect(),
        ArithTerm::IfZero { cond, tt, ff } => {
            let conds = lower_term(cond);
            let mut out = Vec::new();
            for c in &conds {
                if let Some(tt) = tt {
                    for y in lower_term(tt) {
                        out.push(ArithTerm::Mul(vec![
                            ArithTerm::Sub(vec![ArithTerm::Constant(F::ONE), ArithTerm::Norm(Box::new(c.clone()))]),
                            y,
                        ]));
                    }
                }
                if let Some(ff) = ff {
                    for z in lower_term(ff) {
                        out.push(ArithTerm::Mul(vec![c.clone(), z]));
                    }
                }
            }
            out
        }
    }
}

/// Lower every term in a HIR list-valued constraint, concatenating each
/// element's expansion (`List[t1,...,tn] => concat(lower(t1), ..., lower(tn))`).
pub fn lower_constraint_list<F: Field>(terms: &[ArithTerm<F>]) -> Vec<ArithTerm<F>> {
    terms.iter().flat_map(lower_term).collect()
}

fn cross_product<F: Field>(xs: &[ArithTerm<F>], wrap: impl Fn(Vec<ArithTerm<F>>) -> ArithTerm<F>) -> Vec<ArithTerm<F>> {
    let lowered: Vec<Vec<ArithTerm<F>>> = xs.iter().map(lower_term).collect();
    let mut combos: Vec<Vec<ArithTerm<F>>> = vec![vec![]];
    for options in lowered {
        let mut next = Vec::with_capacity(combos.len() * options.len().max(1));
        for combo in &combos {
            for opt in &options {
                let mut c = combo.clone();
                c.push(opt.clone());
                next.push(c);
            }
        }
        combos = next;
    }
    combos.into_iter().map(wrap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{BabyBear, ModuleId, RegisterAccess, RegisterId};

    fn reg(id: u32) -> ArithTerm<BabyBear> {
        ArithTerm::RegisterAccess(RegisterAccess::new(ModuleId(0), RegisterId(id), 0))
    }

    #[test]
    fn plain_terms_lower_to_singletons() {
        let t = reg(0);
        assert_eq!(lower_term(&t), vec![t]);
    }

    #[test]
    fn if_zero_with_both_branches_emits_two_constraints() {
        let t = ArithTerm::IfZero {
            cond: Box::new(reg(0)),
            tt: Some(Box::new(reg(1))),
            ff: Some(Box::new(reg(2))),
        };
        let lowered = lower_term(&t);
        assert_eq!(lowered.len(), 2);
        match &lowered[0] {
            ArithTerm::Mul(xs) => assert_eq!(xs.len(), 2),
            _ => panic!("expected Mul"),
        }
    }

    #[test]
    fn if_zero_with_missing_branch_only_emits_the_present_one() {
        let t = ArithTerm::IfZero { cond: Box::new(reg(0)), tt: Some(Box::new(reg(1))), ff: None };
        assert_eq!(lower_term(&t).len(), 1);
    }

    #[test]
    fn nested_if_zero_cross_products() {
        let inner = ArithTerm::IfZero { cond: Box::new(reg(0)), tt: Some(Box::new(reg(1))), ff: Some(Box::new(reg(2))) };
        let outer = ArithTerm::Add(vec![inner, reg(3)]);
        // 2 options for the IfZero times 1 for reg(3) = 2 Add terms.
        assert_eq!(lower_term(&outer).len(), 2);
    }

    #[test]
    fn list_lowering_concatenates() {
        let terms = vec![reg(0), reg(1)];
        assert_eq!(lower_constraint_list(&terms).len(), 2);
    }
}
