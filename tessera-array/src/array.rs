use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use tessera_dtype::{DataTypeRef, TypeId};
use tessera_error::{TesseraResult, tessera_err};
use tessera_scalar::Scalar;

/// The contract shared by all array implementations.
///
/// Indices are relative to the array's visible window; implementations that
/// view a larger buffer apply their element offset internally.
pub trait Array: Debug + Send + Sync {
    /// Number of visible elements.
    fn len(&self) -> usize;

    /// Whether the array has no visible elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The array's logical element type.
    fn dtype(&self) -> &DataTypeRef;

    /// The kind identifier of the element type.
    fn type_id(&self) -> TypeId {
        self.dtype().id()
    }

    /// Number of null elements in the visible window.
    fn null_count(&self) -> usize;

    /// Read element `index`, returning [`Scalar::Null`] for nulls.
    fn get(&self, index: usize) -> TesseraResult<Scalar>;

    /// Write element `index`. [`Scalar::Null`] marks the element null.
    ///
    /// Fails with `InvalidArgument` when the backing storage is shared or
    /// immutable.
    fn set(&mut self, index: usize, value: Scalar) -> TesseraResult<()>;

    /// Deep-copy `length` elements starting at `offset` into a new array
    /// backed by fresh storage.
    fn copy(&self, offset: usize, length: usize) -> TesseraResult<ArrayRef>;

    /// Deep-copy the entire visible window.
    fn copy_all(&self) -> TesseraResult<ArrayRef> {
        self.copy(0, self.len())
    }

    /// Whether this array is the sole owner of all its storage.
    fn owns_data(&self) -> bool;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// A shared handle to an array.
pub type ArrayRef = Arc<dyn Array>;

pub(crate) fn check_index(index: usize, length: usize) -> TesseraResult<()> {
    if index >= length {
        return Err(tessera_err!(OutOfBounds: index, 0, length));
    }
    Ok(())
}

pub(crate) fn check_window(offset: usize, length: usize, available: usize) -> TesseraResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(()),
        _ => Err(tessera_err!(
            "window [{}, {}) exceeds {} elements",
            offset,
            offset.wrapping_add(length),
            available
        )),
    }
}
