use std::marker::PhantomData;

use tessera_buffer::Buffer;
use tessera_dtype::{DataTypeRef, NativeType};
use tessera_error::{TesseraResult, tessera_bail};

use crate::check_window;

/// Typed storage shared by the numeric array families.
///
/// A `NumericArray` exposes a window of `length` elements starting `offset`
/// elements into a [`Buffer`] of native values. It carries no null
/// representation of its own; [`crate::IntegerArray`] layers a validity
/// bitmap on top and [`crate::FloatingArray`] encodes nulls as NaN.
#[derive(Clone, Debug)]
pub struct NumericArray<T> {
    dtype: DataTypeRef,
    data: Buffer,
    offset: usize,
    length: usize,
    _marker: PhantomData<T>,
}

impl<T: NativeType> NumericArray<T> {
    /// View a window of `data` as `length` elements of `T` starting at
    /// element `offset`.
    pub fn new(data: Buffer, offset: usize, length: usize) -> TesseraResult<Self> {
        Self::new_with_dtype(T::dtype(), data, offset, length)
    }

    /// Like [`NumericArray::new`] but with an explicit logical type whose
    /// physical layout is `T`.
    pub(crate) fn new_with_dtype(
        dtype: DataTypeRef,
        data: Buffer,
        offset: usize,
        length: usize,
    ) -> TesseraResult<Self> {
        let nbytes = offset
            .checked_add(length)
            .and_then(|end| end.checked_mul(size_of::<T>()));
        match nbytes {
            Some(nbytes) if nbytes <= data.len() => {}
            _ => tessera_bail!(
                "{} elements at offset {} exceed a {}-byte buffer",
                length,
                offset,
                data.len()
            ),
        }
        if data.as_slice().as_ptr().addr() % align_of::<T>() != 0 {
            tessera_bail!("buffer is not aligned for {}-byte elements", size_of::<T>());
        }
        Ok(Self {
            dtype,
            data,
            offset,
            length,
            _marker: PhantomData,
        })
    }

    /// Number of visible elements.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Element offset of the window into the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The logical element type.
    pub fn dtype(&self) -> &DataTypeRef {
        &self.dtype
    }

    /// The backing buffer, including elements outside the window.
    pub fn data(&self) -> &Buffer {
        &self.data
    }

    /// The visible elements.
    pub fn values(&self) -> &[T] {
        let start = self.offset * size_of::<T>();
        let bytes = &self.data.as_slice()[start..start + self.length * size_of::<T>()];
        // SAFETY: construction verified that the buffer covers the window
        // and is aligned for T, and native types have no invalid bit
        // patterns.
        unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<T>(), self.length) }
    }

    /// Writable access to the visible elements. Fails when the buffer is
    /// shared or immutable.
    pub fn values_mut(&mut self) -> TesseraResult<&mut [T]> {
        let start = self.offset * size_of::<T>();
        let length = self.length;
        let bytes = &mut self.data.as_mut_slice()?[start..start + length * size_of::<T>()];
        // SAFETY: as for `values`, with exclusive access established by
        // `as_mut_slice`.
        Ok(unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<T>(), length) })
    }

    /// Fail unless the buffer could be written through this handle.
    pub(crate) fn check_writable(&self) -> TesseraResult<()> {
        if !self.data.is_mutable() {
            tessera_bail!("array storage is immutable");
        }
        if !self.data.is_unique() {
            tessera_bail!(
                "array storage is shared by {} handles; copy it first",
                self.data.share_count()
            );
        }
        Ok(())
    }

    /// Detach from shared or immutable storage by copying the visible
    /// window into a fresh buffer, rebasing the offset to zero.
    ///
    /// Returns whether a copy took place.
    pub fn ensure_mutable_and_check_change(&mut self) -> TesseraResult<bool> {
        if self.data.is_mutable() && self.data.is_unique() {
            return Ok(false);
        }
        log::trace!(
            "detaching {} shared elements of {}",
            self.length,
            self.dtype
        );
        self.data = self
            .data
            .copy(self.offset * size_of::<T>(), self.length * size_of::<T>())?;
        self.offset = 0;
        Ok(true)
    }

    /// Deep-copy a sub-window into a new array backed by fresh storage.
    pub fn copy_section(&self, offset: usize, length: usize) -> TesseraResult<Self> {
        check_window(offset, length, self.length)?;
        let data = self.data.copy(
            (self.offset + offset) * size_of::<T>(),
            length * size_of::<T>(),
        )?;
        Self::new_with_dtype(self.dtype.clone(), data, 0, length)
    }
}

/// The raw bytes of a native value slice.
pub(crate) fn bytes_of<T: NativeType>(values: &[T]) -> &[u8] {
    // SAFETY: native types are plain scalar data with no padding.
    unsafe { std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), size_of_val(values)) }
}

#[cfg(test)]
mod test {
    use tessera_dtype::TypeId;
    use tessera_error::TesseraError;

    use super::*;

    fn array_of(values: &[i32]) -> NumericArray<i32> {
        let data = Buffer::copy_from(bytes_of(values)).unwrap();
        NumericArray::new(data, 0, values.len()).unwrap()
    }

    #[test]
    fn window_over_buffer() {
        let data = Buffer::copy_from(bytes_of(&[1i32, 2, 3, 4, 5])).unwrap();
        let array = NumericArray::<i32>::new(data, 1, 3).unwrap();
        assert_eq!(array.values(), &[2, 3, 4]);
        assert_eq!(array.dtype().id(), TypeId::Int32);
    }

    #[test]
    fn window_must_fit() {
        let data = Buffer::allocate(8).unwrap();
        assert!(NumericArray::<i32>::new(data.clone(), 0, 2).is_ok());
        assert!(matches!(
            NumericArray::<i32>::new(data, 1, 2),
            Err(TesseraError::InvalidArgument(..))
        ));
    }

    #[test]
    fn detach_rebases_offset() {
        let data = Buffer::copy_from(bytes_of(&[10i32, 20, 30, 40])).unwrap();
        let mut array = NumericArray::<i32>::new(data.clone(), 2, 2).unwrap();
        assert!(array.values_mut().is_err());
        assert!(array.ensure_mutable_and_check_change().unwrap());
        assert_eq!(array.offset(), 0);
        assert_eq!(array.values(), &[30, 40]);
        array.values_mut().unwrap()[0] = 99;
        // The original buffer is untouched.
        assert_eq!(data.as_slice()[8..12], 30i32.to_le_bytes());
    }

    #[test]
    fn unique_detach_is_noop() {
        let mut array = array_of(&[1, 2, 3]);
        assert!(!array.ensure_mutable_and_check_change().unwrap());
    }

    #[test]
    fn copy_section_is_fresh() {
        let array = array_of(&[1, 2, 3, 4]);
        let section = array.copy_section(1, 2).unwrap();
        assert_eq!(section.values(), &[2, 3]);
        assert_eq!(section.offset(), 0);
        assert!(section.data().is_unique());
        assert!(array.copy_section(3, 2).is_err());
    }
}
