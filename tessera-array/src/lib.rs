//! Tessera's in-memory array implementations.
//!
//! Arrays are typed, nullable, fixed-length sequences over shared
//! [`tessera_buffer::Buffer`] storage. Mutation follows a copy-on-write
//! discipline: writing to shared storage fails until the owner detaches
//! with an explicit `ensure_mutable` call, and the in-place operators
//! detach automatically.

pub use array::*;
pub use boolean::*;
pub use category::*;
pub use floating::*;
pub use integer::*;
pub use numeric::*;
pub use ops::*;
pub use validity::*;
pub use view::*;

mod array;
mod boolean;
mod category;
mod floating;
mod integer;
mod numeric;
mod ops;
mod validity;
mod view;
