//! Core types for the arithmetic intermediate representation: fields,
//! registers, modules, schemas, and the HIR/MIR/AIR term algebras.
//!
//! This crate defines the data model and the pure, single-threaded
//! operations on it (term evaluation, shift/context analysis). Lowering
//! (HIR -> MIR -> AIR) and batch trace evaluation live in `zkmir-lower`;
//! schema construction from external representations lives in
//! `zkmir-builder`; serialization lives in `zkmir-print`.

pub mod assignment;
pub mod config;
pub mod constraint;
pub mod error;
pub mod field;
pub mod module;
pub mod register;
pub mod schema;
pub mod term;
pub mod trace;

pub use assignment::Assignment;
pub use config::{EvalConfig, SimplifyConfig};
pub use constraint::{Constraint, RowSet};
pub use error::{Result, SpecError};
pub use field::{BabyBear, Field, BABYBEAR_PRIME};
pub use module::Module;
pub use register::{ModuleId, Register, RegisterId, RegisterKind};
pub use schema::Schema;
pub use term::{ArithTerm, ArithTermTag, LogicalTerm, LogicalTermTag, RegisterAccess};
pub use trace::{DenseTrace, Trace};

/// Current binary schema format version (see `zkmir-print`).
pub const FORMAT_MAGIC: &[u8; 8] = b"zkbinary";
pub const FORMAT_MAJOR: u16 = 3;
pub const FORMAT_MINOR: u16 = 4;
