//! # zkmir-builder
//!
//! Schema construction front-ends: a stateful, programmatic builder for
//! assembling a `Schema` module by module, and a JSON importer that parses
//! an externally authored constraint document through the same builder.
//!
//! ## Example
//!
//! ```rust
//! use zkmir_builder::SchemaBuilder;
//! use zkmir_spec::{BabyBear, Constraint, ArithTerm, Register, RegisterKind, RowSet};
//!
//! let mut b: SchemaBuilder<BabyBear> = SchemaBuilder::new();
//! let main = b.new_module("main", 1, false).unwrap();
//! let x = b.new_register(main, Register::new("x", 8, 0, RegisterKind::InputOutput).unwrap()).unwrap();
//! let term = ArithTerm::RegisterAccess(b.register_access(main, "x", 0).unwrap());
//! b.add_constraint(main, Constraint::Vanishing { name: "x_is_zero".into(), rows: RowSet::All, term }).unwrap();
//! let schema = b.build().unwrap();
//! assert_eq!(schema.modules().len(), 1);
//! # let _ = x;
//! ```

pub mod error;
pub mod json;
pub mod schema_builder;

pub use error::{BuilderError, Result};
pub use json::import_json;
pub use schema_builder::SchemaBuilder;
