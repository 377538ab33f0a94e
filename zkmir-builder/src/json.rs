//! JSON constraint-set import (§6.2): parses an externally authored
//! constraint document into a `Schema`, driving the same builder
//! primitives the programmatic API uses so both front-ends produce
//! identical internal representations.

use serde::Deserialize;
use serde_json::Value;

use zkmir_spec::{Assignment, ArithTerm, Constraint, Field, ModuleId, Register, RegisterId, RegisterKind, RowSet, Schema};

use crate::error::{BuilderError, Result};
use crate::schema_builder::SchemaBuilder;

#[derive(Debug, Deserialize, Default)]
struct Document {
    #[serde(default)]
    columns: Vec<ColumnDecl>,
    #[serde(default)]
    constraints: Vec<Value>,
    #[serde(default)]
    computations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ColumnDecl {
    handle: String,
    #[serde(default = "default_width")]
    width: u32,
}

fn default_width() -> u32 {
    64
}

/// Parse `text` and build a schema from it. Modules are created lazily as
/// column handles or constraint expressions reference them.
pub fn import_json<F: Field>(text: &str) -> Result<Schema<F>> {
    let doc: Document = serde_json::from_str(text).map_err(|e| BuilderError::MalformedDocument(e.to_string()))?;

    let mut builder: SchemaBuilder<F> = SchemaBuilder::new();

    for col in &doc.columns {
        let (module_name, reg_name) = split_handle(&col.handle)?;
        let module = ensure_module(&mut builder, &module_name)?;
        if !builder.has_register(module, &reg_name)? {
            builder.new_register(module, Register::new(reg_name, col.width, 0, RegisterKind::InputOutput)?)?;
        }
    }

    for c in &doc.constraints {
        import_constraint(&mut builder, c)?;
    }
    for c in &doc.computations {
        import_computation(&mut builder, c)?;
    }

    builder.build()
}

fn ensure_module<F: Field>(builder: &mut SchemaBuilder<F>, name: &str) -> Result<ModuleId> {
    if builder.has_module(name) {
        builder.module_id(name)
    } else {
        builder.new_module(name, 1, true)
    }
}

/// `"<module>:<name>#<register>"` or `"<module>.<name>"`. The `#<register>`
/// suffix, when present, is ignored: names alone identify the register.
fn split_handle(handle: &str) -> Result<(String, String)> {
    if let Some((module, rest)) = handle.split_once(':') {
        let name = rest.split('#').next().unwrap_or(rest);
        Ok((module.to_string(), name.to_string()))
    } else if let Some((module, name)) = handle.split_once('.') {
        Ok((module.to_string(), name.to_string()))
    } else {
        Err(BuilderError::MalformedColumnHandle(handle.to_string()))
    }
}

fn obj(v: &Value) -> Result<&serde_json::Map<String, Value>> {
    v.as_object().ok_or_else(|| BuilderError::MalformedDocument(format!("expected object, got {v}")))
}

fn get<'a>(v: &'a Value, key: &str) -> Result<&'a Value> {
    obj(v)?.get(key).ok_or_else(|| BuilderError::MalformedDocument(format!("missing key '{key}' in {v}")))
}

/// Resolve a handle from a JSON document into a builder module id, creating
/// the module lazily if this is the first time it's mentioned.
fn ensure_handle_module<F: Field>(builder: &mut SchemaBuilder<F>, handle: &str) -> Result<ModuleId> {
    let (module_name, _) = split_handle(handle)?;
    ensure_module(builder, &module_name)
}

/// Parse a single (non-list) expression form into a bound `ArithTerm`. `List`
/// forms are only legal at the top level of a `Vanishes` entry.
fn parse_expr<F: Field>(builder: &mut SchemaBuilder<F>, module: ModuleId, v: &Value) -> Result<ArithTerm<F>> {
    let tag = get(v, "_e")?.as_str().ok_or_else(|| BuilderError::MalformedDocument("_e is not a string".into()))?;
    match tag {
        "Column" => {
            let handle = get(v, "handle")?.as_str().ok_or_else(|| BuilderError::MalformedColumnHandle(v.to_string()))?;
            let (_, reg_name) = split_handle(handle)?;
            let shift = v.get("shift").and_then(Value::as_i64).unwrap_or(0);
            if !builder.has_register(module, &reg_name)? {
                builder.new_register(module, Register::new(reg_name.clone(), 64, 0, RegisterKind::InputOutput)?)?;
            }
            Ok(ArithTerm::RegisterAccess(builder.register_access(module, &reg_name, shift)?))
        }
        "Const" => {
            let bigint = get(v, "BigInt")?;
            let arr = bigint.as_array().ok_or_else(|| BuilderError::MalformedDocument("BigInt is not an array".into()))?;
            let sign = arr.first().and_then(Value::as_i64).unwrap_or(1);
            let words = arr
                .get(1)
                .and_then(Value::as_array)
                .ok_or_else(|| BuilderError::MalformedDocument("BigInt missing word array".into()))?;
            let mut acc = F::ZERO;
            let mut mult = F::ONE;
            let base = F::from_u64(1u64 << 32);
            for w in words {
                let w = w.as_u64().ok_or_else(|| BuilderError::MalformedDocument("BigInt word is not an integer".into()))?;
                acc = acc.add(F::from_u64(w).mul(mult));
                mult = mult.mul(base);
            }
            if sign < 0 {
                acc = acc.neg();
            }
            Ok(ArithTerm::Constant(acc))
        }
        "Funcall" => {
            let func = get(v, "func")?.as_str().ok_or_else(|| BuilderError::UnknownExpression(v.to_string()))?;
            let args = get(v, "args")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("args is not an array".into()))?;
            let parsed: Result<Vec<ArithTerm<F>>> = args.iter().map(|a| parse_expr(builder, module, a)).collect();
            let parsed = parsed?;
            match func {
                "Add" | "VectorAdd" => Ok(ArithTerm::Add(parsed)),
                "Sub" | "VectorSub" => Ok(ArithTerm::Sub(parsed)),
                "Mul" | "VectorMul" => Ok(ArithTerm::Mul(parsed)),
                "Normalize" => {
                    let mut it = parsed.into_iter();
                    let x = it.next().ok_or_else(|| BuilderError::UnknownExpression("Normalize takes one argument".into()))?;
                    Ok(ArithTerm::Norm(Box::new(x)))
                }
                "IfZero" | "IfNotZero" => {
                    if parsed.len() != 3 {
                        return Err(BuilderError::UnknownExpression(format!("{func} expects 3 arguments")));
                    }
                    let mut it = parsed.into_iter();
                    let cond = it.next().unwrap();
                    let first = it.next().unwrap();
                    let second = it.next().unwrap();
                    let (tt, ff) = if func == "IfZero" { (first, second) } else { (second, first) };
                    Ok(ArithTerm::IfZero { cond: Box::new(cond), tt: Some(Box::new(tt)), ff: Some(Box::new(ff)) })
                }
                other => Err(BuilderError::UnknownExpression(other.to_string())),
            }
        }
        other => Err(BuilderError::UnknownExpression(other.to_string())),
    }
}

/// Find the module implied by the first `Column` leaf reachable from `v`,
/// used to place a constraint whose top-level form doesn't carry a module.
fn infer_module<F: Field>(builder: &mut SchemaBuilder<F>, v: &Value) -> Result<ModuleId> {
    let tag = get(v, "_e")?.as_str().unwrap_or("");
    match tag {
        "Column" => {
            let handle = get(v, "handle")?.as_str().ok_or_else(|| BuilderError::MalformedColumnHandle(v.to_string()))?;
            ensure_handle_module(builder, handle)
        }
        "Funcall" => {
            let args = get(v, "args")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("args is not an array".into()))?;
            for a in args {
                if let Ok(m) = infer_module(builder, a) {
                    return Ok(m);
                }
            }
            Err(BuilderError::UnknownExpression("expression has no Column leaf; module is ambiguous".into()))
        }
        "Const" => Err(BuilderError::UnknownExpression("expression has no Column leaf; module is ambiguous".into())),
        "List" => {
            let items = get(v, "List")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("List is not an array".into()))?;
            for a in items {
                if let Ok(m) = infer_module(builder, a) {
                    return Ok(m);
                }
            }
            Err(BuilderError::UnknownExpression("List has no Column leaf; module is ambiguous".into()))
        }
        other => Err(BuilderError::UnknownExpression(other.to_string())),
    }
}

/// `Vanishes.expr` may itself be a top-level `List`, matching the HIR
/// `List`-as-independent-constraints semantics: each element becomes its
/// own `Vanishing` constraint sharing the entry's name, disambiguated by
/// index.
fn expand_top_level_list<F: Field>(builder: &mut SchemaBuilder<F>, v: &Value) -> Result<Vec<ArithTerm<F>>> {
    let tag = get(v, "_e")?.as_str().unwrap_or("");
    if tag == "List" {
        let items = get(v, "List")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("List is not an array".into()))?;
        let module = infer_module(builder, v)?;
        items.iter().map(|item| parse_expr(builder, module, item)).collect()
    } else {
        let module = infer_module(builder, v)?;
        Ok(vec![parse_expr(builder, module, v)?])
    }
}

fn import_constraint<F: Field>(builder: &mut SchemaBuilder<F>, c: &Value) -> Result<()> {
    let map = obj(c)?;
    if let Some(v) = map.get("Vanishes") {
        let name = v.get("handle").and_then(Value::as_str).unwrap_or("vanishes").to_string();
        let expr = get(v, "expr")?;
        let module = infer_module(builder, expr)?;
        let terms = expand_top_level_list(builder, expr)?;
        for (i, term) in terms.into_iter().enumerate() {
            builder.add_constraint(module, Constraint::Vanishing { name: format!("{name}#{i}"), rows: RowSet::All, term })?;
        }
        Ok(())
    } else if let Some(v) = map.get("InRange") {
        let name = v.get("handle").and_then(Value::as_str).unwrap_or("in_range").to_string();
        let expr = get(v, "expr")?;
        let module = infer_module(builder, expr)?;
        let term = parse_expr(builder, module, expr)?;
        let bound = get(v, "bound")?.as_u64().ok_or_else(|| BuilderError::MalformedDocument("bound is not an integer".into()))? as u128;
        builder.add_constraint(module, Constraint::Range { name, term, bound })
    } else if let Some(v) = map.get("Permutation") {
        import_permutation(builder, v)
    } else if let Some(v) = map.get("Lookup") {
        import_lookup(builder, v)
    } else {
        Err(BuilderError::UnknownConstraint(c.to_string()))
    }
}

fn handles_to_registers<F: Field>(builder: &mut SchemaBuilder<F>, v: &Value, key: &str) -> Result<(ModuleId, Vec<RegisterId>)> {
    let handles = get(v, key)?.as_array().ok_or_else(|| BuilderError::MalformedDocument(format!("{key} is not an array")))?;
    let mut module = None;
    let mut ids = Vec::with_capacity(handles.len());
    for h in handles {
        let handle = h.as_str().ok_or_else(|| BuilderError::MalformedColumnHandle(h.to_string()))?;
        let (module_name, reg_name) = split_handle(handle)?;
        let m = ensure_module(builder, &module_name)?;
        let m = *module.get_or_insert(m);
        let id = builder
            .module(m)?
            .register_id(&reg_name)
            .ok_or_else(|| BuilderError::Spec(zkmir_spec::SpecError::UnknownRegister { module: module_name, register: reg_name }))?;
        ids.push(id);
    }
    let module = module.ok_or_else(|| BuilderError::MalformedDocument(format!("{key} is empty")))?;
    Ok((module, ids))
}

fn import_permutation<F: Field>(builder: &mut SchemaBuilder<F>, v: &Value) -> Result<()> {
    let name = v.get("handle").and_then(Value::as_str).unwrap_or("permutation").to_string();
    let (source_module, sources) = handles_to_registers(builder, v, "sources")?;
    let (target_module, targets) = handles_to_registers(builder, v, "targets")?;
    builder.add_constraint(
        source_module,
        Constraint::Permutation { name, source_module, sources, target_module, targets },
    )
}

fn import_lookup<F: Field>(builder: &mut SchemaBuilder<F>, v: &Value) -> Result<()> {
    let name = v.get("handle").and_then(Value::as_str).unwrap_or("lookup").to_string();
    let source_exprs = get(v, "source")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("source is not an array".into()))?;
    let target_exprs = get(v, "target")?.as_array().ok_or_else(|| BuilderError::MalformedDocument("target is not an array".into()))?;
    let source_module = infer_module(builder, source_exprs.first().ok_or_else(|| BuilderError::MalformedDocument("source is empty".into()))?)?;
    let target_module = infer_module(builder, target_exprs.first().ok_or_else(|| BuilderError::MalformedDocument("target is empty".into()))?)?;
    let source: Result<Vec<ArithTerm<F>>> = source_exprs.iter().map(|e| parse_expr(builder, source_module, e)).collect();
    let target: Result<Vec<ArithTerm<F>>> = target_exprs.iter().map(|e| parse_expr(builder, target_module, e)).collect();
    builder.add_constraint(
        source_module,
        Constraint::Lookup { name, source_module, source: source?, target_module, target: target? },
    )
}

fn import_computation<F: Field>(builder: &mut SchemaBuilder<F>, c: &Value) -> Result<()> {
    let map = obj(c)?;
    let v = map.get("Sorted").ok_or_else(|| BuilderError::UnknownConstraint(c.to_string()))?;
    let name = v.get("handle").and_then(Value::as_str).unwrap_or("sorted").to_string();
    let (module, sources) = handles_to_registers(builder, v, "froms")?;
    let (_, targets) = handles_to_registers(builder, v, "tos")?;
    let signs = get(v, "signs")?
        .as_array()
        .ok_or_else(|| BuilderError::MalformedDocument("signs is not an array".into()))?
        .iter()
        .map(|b| b.as_bool().ok_or_else(|| BuilderError::MalformedDocument("signs entry is not a bool".into())))
        .collect::<Result<Vec<bool>>>()?;
    builder.add_assignment(module, Assignment::SortedPermutation { name, sources, targets, signs })
}
