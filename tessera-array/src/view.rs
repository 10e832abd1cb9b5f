use std::sync::Arc;

use tessera_error::{TesseraResult, tessera_bail, tessera_panic};
use tessera_scalar::Scalar;

use crate::{ArrayRef, check_index};

/// A windowed, reference-counted handle to an array.
///
/// Cloning a view shares the underlying array; slicing narrows the window
/// without copying, accumulating offsets. Writes through a shared view fail
/// until [`ArrayView::ensure_mutable`] detaches it onto a private deep copy.
#[derive(Clone, Debug)]
pub struct ArrayView {
    data: ArrayRef,
    offset: usize,
    length: usize,
}

impl ArrayView {
    /// View the whole of `data`.
    pub fn new(data: ArrayRef) -> Self {
        let length = data.len();
        Self {
            data,
            offset: 0,
            length,
        }
    }

    /// View `data` from element `offset` to its end.
    ///
    /// Panics if `offset` is past the end of the array.
    pub fn with_offset(data: ArrayRef, offset: usize) -> Self {
        if offset > data.len() {
            tessera_panic!(
                "view offset {} exceeds array length {}",
                offset,
                data.len()
            );
        }
        let length = data.len() - offset;
        Self {
            data,
            offset,
            length,
        }
    }

    /// View `length` elements of `data` starting at `offset`.
    ///
    /// Panics if the window does not fit within the array.
    pub fn with_window(data: ArrayRef, offset: usize, length: usize) -> Self {
        match offset.checked_add(length) {
            Some(end) if end <= data.len() => {}
            _ => tessera_panic!(
                "view window [{}, {}) exceeds array length {}",
                offset,
                offset.wrapping_add(length),
                data.len()
            ),
        }
        Self {
            data,
            offset,
            length,
        }
    }

    /// The underlying array, including elements outside the window.
    pub fn array(&self) -> &ArrayRef {
        &self.data
    }

    /// Element offset of the window into the underlying array.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of visible elements.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// How many views currently share the underlying array.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Number of null elements in the window.
    pub fn null_count(&self) -> usize {
        (0..self.length)
            .filter(|i| matches!(self.data.get(self.offset + i), Ok(Scalar::Null)))
            .count()
    }

    /// A view of this window from `start` to its end, sharing the array.
    ///
    /// Panics if `start` is past the end of the window.
    pub fn slice(&self, start: usize) -> Self {
        if start > self.length {
            tessera_panic!("slice start {} exceeds view length {}", start, self.length);
        }
        Self {
            data: self.data.clone(),
            offset: self.offset + start,
            length: self.length - start,
        }
    }

    /// A view of `length` elements of this window starting at `start`,
    /// sharing the array.
    ///
    /// Panics if the sub-window does not fit.
    pub fn slice_len(&self, start: usize, length: usize) -> Self {
        match start.checked_add(length) {
            Some(end) if end <= self.length => {}
            _ => tessera_panic!(
                "slice [{}, {}) exceeds view length {}",
                start,
                start.wrapping_add(length),
                self.length
            ),
        }
        Self {
            data: self.data.clone(),
            offset: self.offset + start,
            length,
        }
    }

    /// Detach from a shared array by deep-copying it. The window is
    /// preserved. After this call, [`ArrayView::set`] succeeds.
    pub fn ensure_mutable(&mut self) -> TesseraResult<()> {
        if self.ref_count() > 1 {
            log::trace!("detaching view shared by {} handles", self.ref_count());
            self.data = self.data.copy_all()?;
        }
        Ok(())
    }

    /// Read element `index` of the window.
    pub fn get(&self, index: usize) -> TesseraResult<Scalar> {
        check_index(index, self.length)?;
        self.data.get(self.offset + index)
    }

    /// Write element `index` of the window. Fails while the array is
    /// shared with other views.
    pub fn set(&mut self, index: usize, value: Scalar) -> TesseraResult<()> {
        check_index(index, self.length)?;
        let refs = self.ref_count();
        let offset = self.offset;
        match Arc::get_mut(&mut self.data) {
            Some(array) => array.set(offset + index, value),
            None => tessera_bail!("array is shared by {} views; detach it first", refs),
        }
    }
}

#[cfg(test)]
mod test {
    use tessera_error::TesseraError;

    use super::*;
    use crate::IntegerArray;

    fn base_view() -> ArrayView {
        // Eight elements with nulls at positions 2 and 5.
        let array = IntegerArray::from_option_slice(&[
            Some(0i64),
            Some(1),
            None,
            Some(3),
            Some(4),
            None,
            Some(6),
            Some(7),
        ])
        .unwrap();
        ArrayView::new(Arc::new(array))
    }

    #[test]
    fn constructors() {
        let view = base_view();
        assert_eq!(view.len(), 8);
        assert_eq!(view.offset(), 0);
        assert_eq!(view.null_count(), 2);
        assert_eq!(view.ref_count(), 1);

        let offset = ArrayView::with_offset(view.array().clone(), 6);
        assert_eq!(offset.offset(), 6);
        assert_eq!(offset.len(), 2);

        let window = ArrayView::with_window(view.array().clone(), 2, 3);
        assert_eq!(window.offset(), 2);
        assert_eq!(window.len(), 3);
        assert_eq!(view.ref_count(), 3);
    }

    #[test]
    fn clone_shares_the_array() {
        let view = base_view();
        let clone = view.clone();
        assert_eq!(view.ref_count(), 2);
        assert_eq!(clone.ref_count(), 2);
        drop(clone);
        assert_eq!(view.ref_count(), 1);
    }

    #[test]
    fn slicing_accumulates_offsets() {
        let view = base_view();

        let s1 = view.slice(3);
        assert_eq!(s1.offset(), 3);
        assert_eq!(s1.len(), 5);
        assert_eq!(s1.null_count(), 1);
        assert_eq!(s1.get(0).unwrap(), Scalar::I64(3));

        let s2 = view.slice_len(2, 4);
        assert_eq!(s2.offset(), 2);
        assert_eq!(s2.len(), 4);
        assert_eq!(s2.null_count(), 2);

        let s3 = s1.slice_len(1, 2);
        assert_eq!(s3.offset(), 4);
        assert_eq!(s3.len(), 2);
        assert_eq!(s3.get(0).unwrap(), Scalar::I64(4));
        assert_eq!(s3.get(1).unwrap(), Scalar::Null);

        assert_eq!(view.ref_count(), 4);
    }

    #[test]
    #[should_panic(expected = "exceeds view length")]
    fn slice_past_end_panics() {
        let _ = base_view().slice(9);
    }

    #[test]
    fn set_fails_while_shared_then_succeeds() {
        let mut view = base_view();
        let other = view.clone();
        assert!(matches!(
            view.set(0, Scalar::I64(99)),
            Err(TesseraError::InvalidArgument(..))
        ));
        view.ensure_mutable().unwrap();
        assert_eq!(view.ref_count(), 1);
        view.set(0, Scalar::I64(99)).unwrap();
        assert_eq!(view.get(0).unwrap(), Scalar::I64(99));
        // The detached copy left the original untouched.
        assert_eq!(other.get(0).unwrap(), Scalar::I64(0));
    }

    #[test]
    fn ensure_mutable_on_unique_view_keeps_the_array() {
        let mut view = base_view();
        let before = Arc::as_ptr(view.array());
        view.ensure_mutable().unwrap();
        assert_eq!(Arc::as_ptr(view.array()), before);
    }

    #[test]
    fn detached_slice_keeps_its_window() {
        let view = base_view();
        let mut sliced = view.slice(3);
        sliced.ensure_mutable().unwrap();
        assert_eq!(sliced.offset(), 3);
        assert_eq!(sliced.len(), 5);
        assert_eq!(sliced.get(0).unwrap(), Scalar::I64(3));
        assert_eq!(sliced.null_count(), 1);
    }

    #[test]
    fn windowed_get_is_bounds_checked() {
        let view = base_view().slice_len(2, 3);
        assert!(matches!(
            view.get(3),
            Err(TesseraError::OutOfBounds(3, 0, 3, _))
        ));
    }
}
