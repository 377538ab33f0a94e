//! End-to-end scenarios from the specification's testable-properties table:
//! build a small HIR schema, lower it, populate a trace, and check that
//! evaluation accepts or rejects it as expected.

use zkmir_builder::SchemaBuilder;
use zkmir_lower::{evaluate_schema, lower_schema, populate_trace, CancellationToken};
use zkmir_spec::{
    ArithTerm, BabyBear, Constraint, DenseTrace, EvalConfig, Field, RegisterKind, RowSet, SimplifyConfig, Trace,
};

fn eval(schema: &zkmir_spec::Schema<BabyBear>, trace: &mut DenseTrace<BabyBear>) -> zkmir_lower::Result<()> {
    let air = lower_schema(schema, &SimplifyConfig::DEFAULT)?;
    populate_trace(&air, trace, &EvalConfig::DEFAULT)?;
    evaluate_schema(&air, trace, &EvalConfig::DEFAULT, &CancellationToken::new())
}

/// S1/S2-style scenario, corrected to the conditional-vanishing semantics
/// `hir_to_mir`/`mir_to_air` actually implement (see DESIGN.md): when `X`
/// is zero, `Y` must vanish; otherwise the `0` branch trivially holds.
#[test]
fn if_zero_requires_y_to_vanish_only_when_x_is_zero() {
    let mut b: SchemaBuilder<BabyBear> = SchemaBuilder::new();
    let m = b.new_module("main", 1, false).unwrap();
    let x = b.new_register(m, zkmir_spec::Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let y = b.new_register(m, zkmir_spec::Register::new("y", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let x_term = ArithTerm::RegisterAccess(b.register_access(m, "x", 0).unwrap());
    let y_term = ArithTerm::RegisterAccess(b.register_access(m, "y", 0).unwrap());
    b.add_constraint(
        m,
        Constraint::Vanishing {
            name: "y_vanishes_when_x_zero".into(),
            rows: RowSet::All,
            term: ArithTerm::IfZero { cond: Box::new(x_term), tt: Some(Box::new(y_term)), ff: None },
        },
    )
    .unwrap();
    let schema = b.build().unwrap();

    let mut passing = DenseTrace::new();
    passing.set_height(zkmir_spec::ModuleId(0), 3);
    passing.set_column(zkmir_spec::ModuleId(0), x, vec![BabyBear(0), BabyBear(1), BabyBear(1)]);
    passing.set_column(zkmir_spec::ModuleId(0), y, vec![BabyBear(0), BabyBear(7), BabyBear(9)]);
    eval(&schema, &mut passing).unwrap();

    let mut failing = DenseTrace::new();
    failing.set_height(zkmir_spec::ModuleId(0), 1);
    failing.set_column(zkmir_spec::ModuleId(0), x, vec![BabyBear(0)]);
    failing.set_column(zkmir_spec::ModuleId(0), y, vec![BabyBear(2)]);
    assert!(eval(&schema, &mut failing).is_err());
}

/// S3: a running counter that either repeats or increments by one each row.
#[test]
fn counter_constraint_accepts_repeat_or_increment() {
    let mut b: SchemaBuilder<BabyBear> = SchemaBuilder::new();
    let m = b.new_module("main", 1, true).unwrap();
    let x = b.new_register(m, zkmir_spec::Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let cur = ArithTerm::RegisterAccess(b.register_access(m, "x", 0).unwrap());
    let prev = ArithTerm::RegisterAccess(b.register_access(m, "x", -1).unwrap());
    let diff = ArithTerm::Sub(vec![cur.clone(), prev.clone()]);
    let diff_minus_one = ArithTerm::Sub(vec![diff.clone(), ArithTerm::Constant(BabyBear(1))]);
    b.add_constraint(
        m,
        Constraint::Vanishing { name: "counter".into(), rows: RowSet::All, term: ArithTerm::Mul(vec![diff, diff_minus_one]) },
    )
    .unwrap();
    let schema = b.build().unwrap();

    let mut trace = DenseTrace::new();
    trace.set_height(zkmir_spec::ModuleId(0), 4);
    trace.set_column(zkmir_spec::ModuleId(0), x, vec![BabyBear(0), BabyBear(1), BabyBear(2), BabyBear(3)]);
    eval(&schema, &mut trace).unwrap();
}

/// S4: a range constraint on a u8-ish register rejects an out-of-bound row.
#[test]
fn range_constraint_rejects_value_outside_bound() {
    let mut b: SchemaBuilder<BabyBear> = SchemaBuilder::new();
    let m = b.new_module("main", 1, false).unwrap();
    let x = b.new_register(m, zkmir_spec::Register::new("x", 16, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let term = ArithTerm::RegisterAccess(b.register_access(m, "x", 0).unwrap());
    b.add_constraint(m, Constraint::Range { name: "x_is_byte".into(), term, bound: 256 }).unwrap();
    let schema = b.build().unwrap();

    let mut trace = DenseTrace::new();
    trace.set_height(zkmir_spec::ModuleId(0), 4);
    trace.set_column(zkmir_spec::ModuleId(0), x, vec![BabyBear(0), BabyBear(255), BabyBear(256), BabyBear(100)]);
    assert!(eval(&schema, &mut trace).is_err());
}

/// S5: sorted-permutation assignment orders rows by ascending A, then
/// descending B.
#[test]
fn sorted_permutation_orders_by_signed_columns() {
    let mut b: SchemaBuilder<BabyBear> = SchemaBuilder::new();
    let m = b.new_module("main", 1, false).unwrap();
    let a = b.new_register(m, zkmir_spec::Register::new("a", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let bb = b.new_register(m, zkmir_spec::Register::new("b", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
    let a_sorted = b.new_register(m, zkmir_spec::Register::new("a_sorted", 8, 0, RegisterKind::Computed).unwrap()).unwrap();
    let b_sorted = b.new_register(m, zkmir_spec::Register::new("b_sorted", 8, 0, RegisterKind::Computed).unwrap()).unwrap();
    b.add_assignment(
        m,
        zkmir_spec::Assignment::SortedPermutation {
            name: "perm".into(),
            sources: vec![a, bb],
            targets: vec![a_sorted, b_sorted],
            signs: vec![true, false],
        },
    )
    .unwrap();
    let schema = b.build().unwrap();

    let mut trace = DenseTrace::new();
    trace.set_height(zkmir_spec::ModuleId(0), 3);
    trace.set_column(zkmir_spec::ModuleId(0), a, vec![BabyBear(2), BabyBear(1), BabyBear(2)]);
    trace.set_column(zkmir_spec::ModuleId(0), bb, vec![BabyBear(5), BabyBear(5), BabyBear(3)]);
    populate_trace(&schema, &mut trace, &EvalConfig::DEFAULT).unwrap();

    let a_out: Vec<_> = (0..3).map(|r| trace.get(zkmir_spec::ModuleId(0), a_sorted, r).unwrap()).collect();
    let b_out: Vec<_> = (0..3).map(|r| trace.get(zkmir_spec::ModuleId(0), b_sorted, r).unwrap()).collect();
    assert_eq!(a_out, vec![BabyBear(1), BabyBear(2), BabyBear(2)]);
    assert_eq!(b_out, vec![BabyBear(5), BabyBear(5), BabyBear(3)]);
}

/// S6: constant folding collapses a dead multiply-by-zero term.
#[test]
fn simplification_folds_constants() {
    use zkmir_lower::simplify::simplify_arith;

    let t: ArithTerm<BabyBear> = ArithTerm::Add(vec![
        ArithTerm::Constant(BabyBear(3)),
        ArithTerm::Mul(vec![ArithTerm::Constant(BabyBear(0)), ArithTerm::RegisterAccess(zkmir_spec::RegisterAccess::new(zkmir_spec::ModuleId(0), zkmir_spec::RegisterId(0), 0))]),
        ArithTerm::Constant(BabyBear(2)),
    ]);
    let simplified = simplify_arith(&t, &SimplifyConfig::DEFAULT).unwrap();
    assert_eq!(simplified, ArithTerm::Constant(BabyBear(5)));
}
