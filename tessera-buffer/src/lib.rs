#![deny(missing_docs)]

//! Shared byte buffers for Tessera arrays.
//!
//! A [`Buffer`] is a fixed-length region of raw memory with shared ownership:
//! several arrays may reference the same buffer, and the reference count
//! drives copy-on-write decisions higher up the stack. Owned buffers come
//! from the global [`MemoryPool`] and are mutable while uniquely held;
//! externally owned memory is wrapped zero-copy via [`bytes::Bytes`] and is
//! always immutable.

pub mod bit;
mod buffer;
mod pool;

pub use buffer::Buffer;
pub use pool::{MemoryPool, memory_pool};
