//! The mutually-recursive arithmetic/logical term algebras.

pub mod arith;
pub mod logical;

pub use arith::{ArithTerm, ArithTermTag, RegisterAccess};
pub use logical::{LogicalTerm, LogicalTermTag};
