//! # zkmir-print
//!
//! Serialization egress for a lowered (or un-lowered) schema: an
//! s-expression pretty-printer for diagnostics, and a binary codec for the
//! round-trip file format described in §6.1 of the specification.
//!
//! ## Example
//!
//! ```rust
//! use zkmir_print::{encode_schema, decode_schema, Attributes};
//! use zkmir_spec::{BabyBear, Module, Schema};
//!
//! let schema: Schema<BabyBear> = Schema::new(vec![Module::new("main", 1, false)]).unwrap();
//! let bytes = encode_schema(&Attributes::default(), &schema).unwrap();
//! let (_, decoded): (Attributes, Schema<BabyBear>) = decode_schema(&bytes).unwrap();
//! assert_eq!(decoded.modules().len(), 1);
//! ```

pub mod codec;
pub mod error;
pub mod sexpr;

pub use codec::{decode_schema, encode_schema, Attributes};
pub use error::{PrintError, Result};
pub use sexpr::schema_to_sexpr;
