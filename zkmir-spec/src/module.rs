//! Modules: named groupings of registers, constraints and assignments that
//! share a row index space.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::assignment::Assignment;
use crate::constraint::Constraint;
use crate::error::{Result, SpecError};
use crate::field::Field;
use crate::register::{Register, RegisterId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "F: Field")]
pub struct Module<F: Field> {
    name: String,
    /// The module's height must be a positive multiple of this value.
    multiplier: u32,
    allow_padding: bool,
    registers: Vec<Register>,
    name_to_register: HashMap<String, RegisterId>,
    constraints: Vec<Constraint<F>>,
    assignments: Vec<Assignment<F>>,
    extern_module: bool,
}

impl<F: Field> Module<F> {
    pub fn new(name: impl Into<String>, multiplier: u32, allow_padding: bool) -> Self {
        Self {
            name: name.into(),
            multiplier: multiplier.max(1),
            allow_padding,
            registers: Vec::new(),
            name_to_register: HashMap::new(),
            constraints: Vec::new(),
            assignments: Vec::new(),
            extern_module: false,
        }
    }

    pub fn new_extern(name: impl Into<String>, multiplier: u32, allow_padding: bool, registers: Vec<Register>) -> Self {
        let mut name_to_register = HashMap::new();
        for (i, r) in registers.iter().enumerate() {
            name_to_register.insert(r.name().to_string(), RegisterId(i as u32));
        }
        Self {
            name: name.into(),
            multiplier: multiplier.max(1),
            allow_padding,
            registers,
            name_to_register,
            constraints: Vec::new(),
            assignments: Vec::new(),
            extern_module: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn allow_padding(&self) -> bool {
        self.allow_padding
    }

    pub fn is_extern(&self) -> bool {
        self.extern_module
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    pub fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }

    pub fn assignments(&self) -> &[Assignment<F>] {
        &self.assignments
    }

    /// Direct mutable access for lowering passes that rewrite a module's
    /// constraint/assignment lists wholesale. Callers are responsible for
    /// the extern-module invariant; ordinary schema construction should go
    /// through `try_add_constraint`/`try_add_assignment` instead.
    pub fn constraints_mut(&mut self) -> &mut Vec<Constraint<F>> {
        &mut self.constraints
    }

    pub fn assignments_mut(&mut self) -> &mut Vec<Assignment<F>> {
        &mut self.assignments
    }

    pub fn has_register(&self, name: &str) -> bool {
        self.name_to_register.contains_key(name)
    }

    pub fn register_id(&self, name: &str) -> Option<RegisterId> {
        self.name_to_register.get(name).copied()
    }

    pub fn register(&self, id: RegisterId) -> Result<&Register> {
        self.registers
            .get(id.index())
            .ok_or_else(|| SpecError::UnknownRegister { module: self.name.clone(), register: id.to_string() })
    }

    pub fn try_add_register(&mut self, register: Register) -> Result<RegisterId> {
        if self.extern_module {
            return Err(SpecError::CannotModifyExtern(self.name.clone()));
        }
        if self.name_to_register.contains_key(register.name()) {
            return Err(SpecError::DuplicateRegister {
                module: self.name.clone(),
                register: register.name().to_string(),
            });
        }
        let id = RegisterId(self.registers.len() as u32);
        self.name_to_register.insert(register.name().to_string(), id);
        self.registers.push(register);
        Ok(id)
    }

    pub fn try_add_constraint(&mut self, constraint: Constraint<F>) -> Result<()> {
        if self.extern_module {
            return Err(SpecError::CannotModifyExtern(self.name.clone()));
        }
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn try_add_assignment(&mut self, assignment: Assignment<F>) -> Result<()> {
        if self.extern_module {
            return Err(SpecError::CannotModifyExtern(self.name.clone()));
        }
        self.assignments.push(assignment);
        Ok(())
    }
}
