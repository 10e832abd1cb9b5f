#![deny(missing_docs)]

//! A type system for Tessera.
//!
//! Each primitive scalar kind is represented by a single process-wide,
//! immutable [`DataType`] instance, resolved through [`primitive_type`].
//! The [`NativeType`] family of traits links Rust scalar types to those
//! singletons for use by the generic array implementations.

pub use dtype::*;
pub use native::*;

mod dtype;
mod native;
