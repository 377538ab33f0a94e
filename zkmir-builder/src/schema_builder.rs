//! Programmatic schema construction: allocate modules and registers, attach
//! constraints and assignments, then freeze the result into a `Schema`.

use std::collections::HashMap;

use zkmir_spec::{
    Assignment, Constraint, Field, Module, ModuleId, Register, RegisterAccess, RegisterId, RegisterKind, Schema, SpecError,
};

use crate::error::Result;

/// Builds a schema one module at a time. Extern modules are admitted
/// up front (via [`SchemaBuilder::add_extern_module`]) and are never
/// mutated afterwards; internal modules accept registers, constraints and
/// assignments until [`SchemaBuilder::build`] freezes the whole schema.
#[derive(Debug)]
pub struct SchemaBuilder<F: Field> {
    modules: Vec<Module<F>>,
    name_to_index: HashMap<String, ModuleId>,
    /// Pooled constant registers, keyed by (module, value, width) so the
    /// same literal requested twice from the same module reuses one column.
    const_registers: HashMap<(ModuleId, u128, u32), RegisterId>,
}

impl<F: Field> Default for SchemaBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Field> SchemaBuilder<F> {
    pub fn new() -> Self {
        Self { modules: Vec::new(), name_to_index: HashMap::new(), const_registers: HashMap::new() }
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn module_id(&self, name: &str) -> Result<ModuleId> {
        self.name_to_index.get(name).copied().ok_or_else(|| SpecError::UnknownModule(name.to_string()).into())
    }

    pub fn module(&self, id: ModuleId) -> Result<&Module<F>> {
        self.modules.get(id.index()).ok_or_else(|| SpecError::UnknownModule(id.to_string()).into())
    }

    fn module_mut(&mut self, id: ModuleId) -> Result<&mut Module<F>> {
        self.modules.get_mut(id.index()).ok_or_else(|| SpecError::UnknownModule(id.to_string()).into())
    }

    /// Allocate a fresh internal module. Rejects a name already in use by
    /// any module, internal or extern.
    pub fn new_module(&mut self, name: impl Into<String>, multiplier: u32, allow_padding: bool) -> Result<ModuleId> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) {
            return Err(SpecError::DuplicateModule(name).into());
        }
        let id = ModuleId(self.modules.len() as u32);
        self.name_to_index.insert(name.clone(), id);
        self.modules.push(Module::new(name, multiplier, allow_padding));
        Ok(id)
    }

    /// Admit a pre-built, read-only module. Extern modules must all be
    /// added before the first internal module so `build()` can keep them at
    /// the low, stable ids `Schema::new` requires.
    pub fn add_extern_module(
        &mut self,
        name: impl Into<String>,
        multiplier: u32,
        allow_padding: bool,
        registers: Vec<Register>,
    ) -> Result<ModuleId> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) {
            return Err(SpecError::DuplicateModule(name).into());
        }
        let id = ModuleId(self.modules.len() as u32);
        self.name_to_index.insert(name.clone(), id);
        self.modules.push(Module::new_extern(name, multiplier, allow_padding, registers));
        Ok(id)
    }

    pub fn has_register(&self, module: ModuleId, name: &str) -> Result<bool> {
        Ok(self.module(module)?.has_register(name))
    }

    pub fn new_register(&mut self, module: ModuleId, register: Register) -> Result<RegisterId> {
        self.module_mut(module)?.try_add_register(register).map_err(Into::into)
    }

    pub fn register_access(&self, module: ModuleId, name: &str, shift: i64) -> Result<RegisterAccess> {
        let m = self.module(module)?;
        let register = m
            .register_id(name)
            .ok_or_else(|| SpecError::UnknownRegister { module: m.name().to_string(), register: name.to_string() })?;
        Ok(RegisterAccess::new(module, register, shift))
    }

    /// Find or create a `Constant` register holding `value` (as its padding,
    /// which doubles as its fixed value since the register is never
    /// assigned), pooling by `(module, value, width)`.
    pub fn const_register(&mut self, module: ModuleId, value: u128, width: u32) -> Result<RegisterId> {
        let key = (module, value, width);
        if let Some(id) = self.const_registers.get(&key) {
            return Ok(*id);
        }
        let name = format!("__const_{value}_{width}");
        let register = Register::new(name, width, value, RegisterKind::Constant)?;
        let id = self.new_register(module, register)?;
        self.const_registers.insert(key, id);
        Ok(id)
    }

    pub fn add_constraint(&mut self, module: ModuleId, constraint: Constraint<F>) -> Result<()> {
        self.module_mut(module)?.try_add_constraint(constraint).map_err(Into::into)
    }

    pub fn add_assignment(&mut self, module: ModuleId, assignment: Assignment<F>) -> Result<()> {
        self.module_mut(module)?.try_add_assignment(assignment).map_err(Into::into)
    }

    /// Freeze the builder into an immutable schema. Extern modules (added
    /// first, by construction) keep their original ids.
    pub fn build(self) -> Result<Schema<F>> {
        Schema::new(self.modules).map_err(Into::into)
    }
}
