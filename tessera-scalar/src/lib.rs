#![deny(missing_docs)]

//! Scalar values exchanged across the array element access boundary.
//!
//! [`Scalar`] is the dynamically typed value returned by element getters and
//! accepted by element setters. Typed arrays convert to and from their native
//! element type through [`NativeScalar`].

pub use scalar::*;

mod scalar;
