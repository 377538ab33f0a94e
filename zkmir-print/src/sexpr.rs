//! S-expression pretty-printing for a whole schema, built on the per-term
//! `to_sexpr` rendering `zkmir-spec` already provides.

use zkmir_spec::{Constraint, Field, Module, RowSet, Schema};

/// Render every module of `schema` as a `(module ...)` s-expression block,
/// in declaration order.
pub fn schema_to_sexpr<F: Field>(schema: &Schema<F>) -> String {
    schema.modules().iter().map(module_to_sexpr).collect::<Vec<_>>().join("\n")
}

fn module_to_sexpr<F: Field>(module: &Module<F>) -> String {
    let registers: Vec<String> = module
        .registers()
        .iter()
        .map(|r| format!("(register {} {} {:?})", r.name(), r.width(), r.kind()))
        .collect();
    let constraints: Vec<String> = module.constraints().iter().map(constraint_to_sexpr).collect();
    format!(
        "(module {}{}\n  {}\n  {})",
        module.name(),
        if module.is_extern() { " extern" } else { "" },
        registers.join("\n  "),
        constraints.join("\n  "),
    )
}

fn constraint_to_sexpr<F: Field>(c: &Constraint<F>) -> String {
    match c {
        Constraint::Vanishing { name, rows, term } => {
            format!("(vanishing {} {} {})", name, rows_to_sexpr(*rows), term.to_sexpr())
        }
        Constraint::Range { name, term, bound } => {
            format!("(range {} {} {})", name, term.to_sexpr(), bound)
        }
        Constraint::Lookup { name, source, target, .. } => {
            let source: Vec<String> = source.iter().map(|t| t.to_sexpr()).collect();
            let target: Vec<String> = target.iter().map(|t| t.to_sexpr()).collect();
            format!("(lookup {} ({}) ({}))", name, source.join(" "), target.join(" "))
        }
        Constraint::Permutation { name, sources, targets, .. } => {
            let sources: Vec<String> = sources.iter().map(|r| r.to_string()).collect();
            let targets: Vec<String> = targets.iter().map(|r| r.to_string()).collect();
            format!("(permutation {} ({}) ({}))", name, sources.join(" "), targets.join(" "))
        }
    }
}

fn rows_to_sexpr(rows: RowSet) -> &'static str {
    match rows {
        RowSet::All => "all",
        RowSet::First => "first",
        RowSet::Last => "last",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkmir_spec::{ArithTerm, BabyBear, RegisterAccess, RegisterKind, Register};

    #[test]
    fn prints_a_single_module_with_a_vanishing_constraint() {
        let mut m: Module<BabyBear> = Module::new("main", 1, false);
        let x = m.try_add_register(Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
        m.try_add_constraint(Constraint::Vanishing {
            name: "x_is_zero".into(),
            rows: RowSet::All,
            term: ArithTerm::RegisterAccess(RegisterAccess::new(zkmir_spec::ModuleId(0), x, 0)),
        })
        .unwrap();
        let schema = Schema::new(vec![m]).unwrap();

        let rendered = schema_to_sexpr(&schema);
        assert!(rendered.contains("(module main"));
        assert!(rendered.contains("(vanishing x_is_zero all"));
    }
}
