//! Context inference: every term attached to a module must only read
//! registers from that module (or from declared cross-module constraint
//! endpoints, which are checked separately). A term reading zero registers
//! is a pure constant and almost certainly a mistake; a term reading
//! registers from more than one module is definitely one.

use std::collections::BTreeSet;

use zkmir_spec::{Constraint, Field, ModuleId, RegisterId, Schema, SpecError};

use crate::error::Result;

/// Check that every `Vanishing`/`Range` constraint term in every internal
/// module of `schema` reads registers from that module alone, and reads at
/// least one register. `Lookup`/`Permutation` endpoints are allowed to name
/// a different `target_module`/`source_module` explicitly and are exempt.
pub fn check_schema<F: Field>(schema: &Schema<F>) -> Result<()> {
    for (i, module) in schema.modules().iter().enumerate() {
        let owner = ModuleId(i as u32);
        for constraint in module.constraints() {
            match constraint {
                Constraint::Vanishing { name, term, .. } => check_term_context(name, owner, term.required_registers())?,
                Constraint::Range { name, term, .. } => check_term_context(name, owner, term.required_registers())?,
                Constraint::Lookup { .. } | Constraint::Permutation { .. } => {}
            }
        }
    }
    Ok(())
}

fn check_term_context(_name: &str, owner: ModuleId, registers: BTreeSet<(ModuleId, RegisterId)>) -> Result<()> {
    if registers.is_empty() {
        return Err(SpecError::ContextVoid.into());
    }
    let mut distinct: Vec<ModuleId> = registers.iter().map(|(m, _)| *m).collect();
    distinct.dedup();
    let foreign = distinct.iter().find(|m| **m != owner);
    if let Some(foreign) = foreign {
        return Err(SpecError::ContextConflict { a: owner.to_string(), b: foreign.to_string() }.into());
    }
    Ok(())
}
