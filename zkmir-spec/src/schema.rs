//! Schema: the ordered collection of modules that forms a complete IR unit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SpecError};
use crate::field::Field;
use crate::module::Module;
use crate::register::{ModuleId, RegisterId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub struct Schema<F: Field> {
    modules: Vec<Module<F>>,
    name_to_index: HashMap<String, ModuleId>,
    extern_count: usize,
}

impl<F: Field> Schema<F> {
    /// Freeze `modules` into a schema snapshot. Extern modules must occupy a
    /// contiguous prefix so their ids remain stable across revisions.
    pub fn new(modules: Vec<Module<F>>) -> Result<Self> {
        let mut name_to_index = HashMap::new();
        let mut extern_count = 0;
        let mut seen_internal = false;
        for (i, m) in modules.iter().enumerate() {
            if name_to_index
                .insert(m.name().to_string(), ModuleId(i as u32))
                .is_some()
            {
                return Err(SpecError::DuplicateModule(m.name().to_string()));
            }
            if m.is_extern() {
                if seen_internal {
                    return Err(SpecError::InvalidConfig(format!(
                        "extern module {} does not precede all internal modules",
                        m.name()
                    )));
                }
                extern_count += 1;
            } else {
                seen_internal = true;
            }
        }
        Ok(Self { modules, name_to_index, extern_count })
    }

    pub fn modules(&self) -> &[Module<F>] {
        &self.modules
    }

    pub fn extern_count(&self) -> usize {
        self.extern_count
    }

    pub fn module(&self, id: ModuleId) -> Result<&Module<F>> {
        self.modules
            .get(id.index())
            .ok_or_else(|| SpecError::UnknownModule(id.to_string()))
    }

    pub fn module_by_name(&self, name: &str) -> Result<(ModuleId, &Module<F>)> {
        let id = *self
            .name_to_index
            .get(name)
            .ok_or_else(|| SpecError::UnknownModule(name.to_string()))?;
        Ok((id, self.module(id)?))
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn resolve_register(&self, module: &str, register: &str) -> Result<(ModuleId, RegisterId)> {
        let (mid, m) = self.module_by_name(module)?;
        let rid = m
            .register_id(register)
            .ok_or_else(|| SpecError::UnknownRegister { module: module.to_string(), register: register.to_string() })?;
        Ok((mid, rid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BabyBear;

    #[test]
    fn rejects_duplicate_module_names() {
        let modules: Vec<Module<BabyBear>> =
            vec![Module::new("a", 1, false), Module::new("a", 1, false)];
        let err = Schema::new(modules).unwrap_err();
        assert!(matches!(err, SpecError::DuplicateModule(_)));
    }

    #[test]
    fn extern_modules_keep_low_stable_ids() {
        let modules: Vec<Module<BabyBear>> = vec![
            Module::new_extern("ext", 1, false, vec![]),
            Module::new("main", 1, false),
        ];
        let schema = Schema::new(modules).unwrap();
        assert_eq!(schema.extern_count(), 1);
        let (id, _) = schema.module_by_name("ext").unwrap();
        assert_eq!(id, ModuleId(0));
    }

    #[test]
    fn extern_after_internal_is_rejected() {
        let modules: Vec<Module<BabyBear>> = vec![
            Module::new("main", 1, false),
            Module::new_extern("ext", 1, false, vec![]),
        ];
        assert!(Schema::new(modules).is_err());
    }
}
