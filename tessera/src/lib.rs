//! Tessera: an in-memory, typed, nullable columnar array library.
//!
//! The array implementations are re-exported at the crate root; the
//! supporting layers are available as submodules.
//!
//! ```
//! use tessera::{Array, ArrayAdd, IntegerArray};
//!
//! let a = IntegerArray::from_option_slice(&[Some(1i64), None, Some(3)]).unwrap();
//! let b = IntegerArray::from_slice(&[10i64, 20, 30]).unwrap();
//! let sum = a.add(&b).unwrap();
//! assert_eq!(sum.values()[0], 11);
//! assert_eq!(sum.null_count(), 1);
//! ```

pub use tessera_array::*;
pub use {
    tessera_buffer as buffer, tessera_dtype as dtype, tessera_error as error,
    tessera_scalar as scalar,
};
