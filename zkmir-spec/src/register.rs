//! Register declarations: named, fixed-width columns owned by a module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SpecError};

/// Module-local dense index into a module's register vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegisterId(pub u32);

impl RegisterId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Dense index into a schema's module vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Whether a register is supplied by the witness, derived by an assignment,
/// or constant on every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterKind {
    InputOutput,
    Computed,
    Constant,
}

/// A named, fixed-width column declaration within a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    name: String,
    width: u32,
    padding: u128,
    kind: RegisterKind,
}

impl Register {
    pub fn new(name: impl Into<String>, width: u32, padding: u128, kind: RegisterKind) -> Result<Self> {
        let name = name.into();
        if width < 128 && padding >= (1u128 << width) {
            return Err(SpecError::CastFailure { value: padding, width });
        }
        Ok(Self { name, width, padding, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn padding(&self) -> u128 {
        self.padding
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({:?})", self.name, self.width, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_padding() {
        let err = Register::new("x", 4, 16, RegisterKind::InputOutput).unwrap_err();
        assert!(matches!(err, SpecError::CastFailure { .. }));
    }

    #[test]
    fn accepts_boundary_padding() {
        assert!(Register::new("x", 4, 15, RegisterKind::InputOutput).is_ok());
    }

    #[test]
    fn display_includes_kind() {
        let r = Register::new("acc", 8, 0, RegisterKind::Computed).unwrap();
        assert_eq!(r.to_string(), "acc:8 (Computed)");
    }
}
