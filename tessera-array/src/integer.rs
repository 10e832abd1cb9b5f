use std::any::Any;
use std::sync::Arc;

use num_traits::AsPrimitive;
use tessera_buffer::Buffer;
use tessera_buffer::bit::{bit_not_set, clear_bit, copy_bitmap, count_unset_bits, get_bit, set_bit};
use tessera_dtype::{DataTypeRef, NativeFloat, NativeInt};
use tessera_error::{TesseraExpect, TesseraResult, tessera_bail};
use tessera_scalar::{NativeScalar, Scalar};

use crate::numeric::bytes_of;
use crate::{
    Array, ArrayAdd, ArrayRef, FloatingArray, NumericArray, RhsNulls, allocate_validity_bitmap,
    check_index, check_window,
};

/// A fixed-width integer array with an optional validity bitmap.
///
/// A missing bitmap means every element is valid. When present, the bitmap
/// is indexed with the same element offset as the value buffer: element `i`
/// of the window is null iff bit `offset + i` is unset.
#[derive(Clone, Debug)]
pub struct IntegerArray<T> {
    values: NumericArray<T>,
    validity: Option<Buffer>,
}

impl<T: NativeInt> IntegerArray<T> {
    /// View a window of `data`, with nulls described by `validity`.
    pub fn new(
        data: Buffer,
        offset: usize,
        length: usize,
        validity: Option<Buffer>,
    ) -> TesseraResult<Self> {
        Self::new_with_dtype(T::dtype(), data, offset, length, validity)
    }

    pub(crate) fn new_with_dtype(
        dtype: DataTypeRef,
        data: Buffer,
        offset: usize,
        length: usize,
        validity: Option<Buffer>,
    ) -> TesseraResult<Self> {
        if let Some(bitmap) = &validity {
            if bitmap.len() * 8 < offset + length {
                tessera_bail!(
                    "validity bitmap of {} bytes cannot cover {} elements at offset {}",
                    bitmap.len(),
                    length,
                    offset
                );
            }
        }
        Ok(Self {
            values: NumericArray::new_with_dtype(dtype, data, offset, length)?,
            validity,
        })
    }

    /// Copy a slice into a fresh array with no nulls.
    pub fn from_slice(values: &[T]) -> TesseraResult<Self> {
        let data = Buffer::copy_from(bytes_of(values))?;
        Self::new(data, 0, values.len(), None)
    }

    /// Copy a slice of optional values into a fresh array, with a validity
    /// bitmap marking the `None` entries null.
    pub fn from_option_slice(values: &[Option<T>]) -> TesseraResult<Self> {
        let raw: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
        let data = Buffer::copy_from(bytes_of(&raw))?;
        let mut validity = allocate_validity_bitmap(values.len())?;
        let bits = validity
            .as_mut_slice()
            .tessera_expect("freshly allocated bitmap is unique and mutable");
        for (i, value) in values.iter().enumerate() {
            if value.is_none() {
                clear_bit(bits, i);
            }
        }
        Self::new(data, 0, values.len(), Some(validity))
    }

    /// The visible elements. Values at null positions are unspecified.
    pub fn values(&self) -> &[T] {
        self.values.values()
    }

    /// The validity bitmap, if any nulls have ever been recorded.
    pub fn validity(&self) -> Option<&Buffer> {
        self.validity.as_ref()
    }

    /// Whether any visible element is null. Scans the bitmap with early
    /// exit.
    pub fn has_nulls(&self) -> bool {
        match &self.validity {
            None => false,
            Some(bitmap) => {
                let offset = self.values.offset();
                (offset..offset + self.values.len())
                    .any(|i| bit_not_set(bitmap.as_slice(), i))
            }
        }
    }

    /// Whether element `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        match &self.validity {
            None => false,
            Some(bitmap) => bit_not_set(bitmap.as_slice(), self.values.offset() + index),
        }
    }

    /// Mark element `index` null, allocating the validity bitmap on first
    /// use. Fails when the array's storage is shared.
    pub fn set_null(&mut self, index: usize) -> TesseraResult<()> {
        check_index(index, self.values.len())?;
        self.values.check_writable()?;
        let offset = self.values.offset();
        clear_bit(self.validity_mut()?, offset + index);
        Ok(())
    }

    /// Mark element `index` valid. A missing bitmap already means valid.
    pub fn set_valid(&mut self, index: usize) -> TesseraResult<()> {
        check_index(index, self.values.len())?;
        let offset = self.values.offset();
        if self.validity.is_some() {
            set_bit(self.validity_mut()?, offset + index);
        }
        Ok(())
    }

    fn validity_mut(&mut self) -> TesseraResult<&mut [u8]> {
        if self.validity.is_none() {
            let bits = self.values.offset() + self.values.len();
            self.validity = Some(allocate_validity_bitmap(bits)?);
        }
        self.validity
            .as_mut()
            .tessera_expect("validity bitmap was just allocated")
            .as_mut_slice()
    }

    /// Detach from shared storage: copy the visible value window and, if
    /// present, rebase the validity bitmap alongside it. After this call,
    /// element writes through this handle succeed.
    pub fn ensure_mutable(&mut self) -> TesseraResult<()> {
        let old_offset = self.values.offset();
        let length = self.values.len();
        let changed = self.values.ensure_mutable_and_check_change()?;
        let detached = match &self.validity {
            Some(bitmap) if changed => Some(copy_bitmap(bitmap, old_offset, length)?),
            Some(bitmap) if !(bitmap.is_mutable() && bitmap.is_unique()) => {
                Some(bitmap.copy(0, bitmap.len())?)
            }
            _ => None,
        };
        if detached.is_some() {
            self.validity = detached;
        }
        Ok(())
    }

    /// Copy the validity bits for a sub-window into a fresh bitmap rebased
    /// to bit zero, or `None` when the array carries no bitmap.
    pub fn copy_nulls(&self, offset: usize, length: usize) -> TesseraResult<Option<Buffer>> {
        match &self.validity {
            Some(bitmap) => Ok(Some(copy_bitmap(
                bitmap,
                self.values.offset() + offset,
                length,
            )?)),
            None => Ok(None),
        }
    }

    /// Deep-copy a sub-window, values and nulls, into fresh storage.
    pub fn copy_section(&self, offset: usize, length: usize) -> TesseraResult<Self> {
        let values = self.values.copy_section(offset, length)?;
        let validity = self.copy_nulls(offset, length)?;
        Ok(Self { values, validity })
    }

    pub(crate) fn null_source(&self) -> RhsNulls<'_> {
        match &self.validity {
            None => RhsNulls::None,
            Some(bitmap) => RhsNulls::Bitmap {
                bits: bitmap.as_slice(),
                offset: self.values.offset(),
            },
        }
    }

    /// Element-wise division over the overlap of the two arrays, promoting
    /// to floating point. The result has `min` of the two lengths.
    ///
    /// The result is single precision only when every value of both operand
    /// types is exactly representable in an `f32`; any 32- or 64-bit
    /// operand promotes to double precision. Nulls propagate, and division
    /// by zero follows IEEE semantics.
    pub fn divide<U: NativeInt>(&self, rhs: &IntegerArray<U>) -> TesseraResult<Quotient> {
        if T::MAX_F64.max(U::MAX_F64) > MAX_EXACT_SINGLE {
            Ok(Quotient::Double(self.divide_into::<U, f64>(rhs)?))
        } else {
            Ok(Quotient::Single(self.divide_into::<U, f32>(rhs)?))
        }
    }

    fn divide_into<U, F>(&self, rhs: &IntegerArray<U>) -> TesseraResult<FloatingArray<F>>
    where
        U: NativeInt,
        F: NativeFloat,
        T: AsPrimitive<F>,
        U: AsPrimitive<F>,
    {
        let length = self.values.len().min(rhs.values.len());
        let data = Buffer::allocate(length * size_of::<F>())?;
        let mut out = FloatingArray::<F>::new(data, 0, length)?;
        let slots = out
            .values_mut()
            .tessera_expect("freshly allocated buffer is unique and mutable");
        let lhs_values = self.values();
        let rhs_values = rhs.values();
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = if self.is_null(i) || rhs.is_null(i) {
                F::nan()
            } else {
                let n: F = lhs_values[i].as_();
                let d: F = rhs_values[i].as_();
                n / d
            };
        }
        Ok(out)
    }
}

/// Largest integer magnitude exactly representable in an `f32`.
#[allow(clippy::cast_precision_loss)]
const MAX_EXACT_SINGLE: f64 = (1u64 << f32::MANTISSA_DIGITS) as f64;

/// The result of integer division: promoted to the narrowest float type
/// that can hold both operand types exactly.
#[derive(Debug)]
pub enum Quotient {
    /// Both operand types fit an `f32` exactly.
    Single(FloatingArray<f32>),
    /// At least one operand type requires an `f64`.
    Double(FloatingArray<f64>),
}

impl<T, U> ArrayAdd<IntegerArray<U>> for IntegerArray<T>
where
    T: NativeInt,
    U: NativeInt + AsPrimitive<T>,
{
    /// Element-wise wrapping addition over the overlap of the two arrays
    /// (`min` of the lengths). Nulls propagate: an element null on either
    /// side is null in the result, and values under null positions are
    /// left untouched.
    fn add_assign(&mut self, rhs: &IntegerArray<U>) -> TesseraResult<()> {
        let length = self.values.len().min(rhs.values.len());
        self.ensure_mutable()?;
        if rhs.has_nulls() {
            for i in 0..length {
                if rhs.is_null(i) {
                    self.set_null(i)?;
                }
            }
        }
        let offset = self.values.offset();
        let rhs_values = rhs.values();
        let Self { values, validity } = self;
        let out = values.values_mut()?;
        match validity {
            Some(bitmap) => {
                let bits = bitmap.as_slice();
                for (i, slot) in out.iter_mut().enumerate().take(length) {
                    if get_bit(bits, offset + i) {
                        let addend: T = rhs_values[i].as_();
                        *slot = slot.wrapping_add(&addend);
                    }
                }
            }
            None => {
                for (slot, value) in out.iter_mut().zip(rhs_values) {
                    let addend: T = value.as_();
                    *slot = slot.wrapping_add(&addend);
                }
            }
        }
        Ok(())
    }
}

impl<T: NativeInt + NativeScalar> Array for IntegerArray<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn dtype(&self) -> &DataTypeRef {
        self.values.dtype()
    }

    fn null_count(&self) -> usize {
        match &self.validity {
            None => 0,
            Some(bitmap) => count_unset_bits(
                bitmap.as_slice(),
                self.values.offset(),
                self.values.len(),
            ),
        }
    }

    fn get(&self, index: usize) -> TesseraResult<Scalar> {
        check_index(index, self.values.len())?;
        if self.is_null(index) {
            return Ok(Scalar::Null);
        }
        Ok(self.values.values()[index].to_scalar())
    }

    fn set(&mut self, index: usize, value: Scalar) -> TesseraResult<()> {
        check_index(index, self.values.len())?;
        if value.is_null() {
            return self.set_null(index);
        }
        let native = T::from_scalar(value)?;
        self.values.values_mut()?[index] = native;
        self.set_valid(index)
    }

    fn copy(&self, offset: usize, length: usize) -> TesseraResult<ArrayRef> {
        check_window(offset, length, self.values.len())?;
        Ok(Arc::new(self.copy_section(offset, length)?))
    }

    fn owns_data(&self) -> bool {
        self.values.data().is_unique() && self.validity.as_ref().is_none_or(Buffer::is_unique)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use tessera_dtype::{Int64Type, TypeId};
    use tessera_error::TesseraError;

    use super::*;

    #[test]
    fn slice_construction() {
        let array = IntegerArray::from_slice(&[1i64, 2, 3]).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(Array::type_id(&array), TypeId::Int64);
        assert!(array.dtype().equals(&*Int64Type::get()));
        assert_eq!(array.null_count(), 0);
        assert_eq!(array.get(1).unwrap(), Scalar::I64(2));
    }

    #[test]
    fn zero_copy_external_memory() {
        let data = Buffer::from_bytes(bytes::Bytes::from_static(&[7, 8, 9]));
        let mut array = IntegerArray::<u8>::new(data, 0, 3, None).unwrap();
        assert_eq!(array.get(1).unwrap(), Scalar::U8(8));
        assert!(matches!(
            array.set(0, Scalar::U8(1)),
            Err(TesseraError::InvalidArgument(..))
        ));
        // Detaching copies the window into owned memory.
        array.ensure_mutable().unwrap();
        array.set(0, Scalar::U8(1)).unwrap();
        assert_eq!(array.get(0).unwrap(), Scalar::U8(1));
    }

    #[test]
    fn option_slice_records_nulls() {
        let array = IntegerArray::from_option_slice(&[Some(1i32), None, Some(3)]).unwrap();
        assert_eq!(array.null_count(), 1);
        assert!(array.is_null(1));
        assert_eq!(array.get(0).unwrap(), Scalar::I32(1));
        assert_eq!(array.get(1).unwrap(), Scalar::Null);
    }

    #[test]
    fn bitmap_must_cover_window() {
        let data = Buffer::allocate(16).unwrap();
        let bitmap = Buffer::allocate(1).unwrap();
        assert!(IntegerArray::<i32>::new(data.clone(), 0, 4, Some(bitmap.clone())).is_ok());
        assert!(matches!(
            IntegerArray::<i32>::new(data, 2, 4, Some(bitmap)),
            Err(TesseraError::InvalidArgument(..))
        ));
    }

    #[test]
    fn get_out_of_bounds() {
        let array = IntegerArray::from_slice(&[1u8, 2]).unwrap();
        assert!(matches!(
            array.get(2),
            Err(TesseraError::OutOfBounds(2, 0, 2, _))
        ));
    }

    #[test]
    fn set_null_allocates_bitmap() {
        let mut array = IntegerArray::from_slice(&[5i16, 6, 7]).unwrap();
        assert!(array.validity().is_none());
        array.set_null(1).unwrap();
        assert!(array.validity().is_some());
        assert_eq!(array.null_count(), 1);
        array.set(1, Scalar::I16(8)).unwrap();
        assert_eq!(array.null_count(), 0);
        assert_eq!(array.get(1).unwrap(), Scalar::I16(8));
    }

    #[test]
    fn set_coerces_across_kinds() {
        let mut array = IntegerArray::from_slice(&[0u8, 0]).unwrap();
        array.set(0, Scalar::I32(300)).unwrap();
        assert_eq!(array.get(0).unwrap(), Scalar::U8(44));
    }

    #[test]
    fn shared_set_fails_until_detached() {
        let mut array = IntegerArray::from_option_slice(&[Some(1i32), None]).unwrap();
        let other = array.clone();
        assert!(matches!(
            array.set(0, Scalar::I32(9)),
            Err(TesseraError::InvalidArgument(..))
        ));
        assert!(matches!(
            array.set_null(0),
            Err(TesseraError::InvalidArgument(..))
        ));
        array.ensure_mutable().unwrap();
        array.set(0, Scalar::I32(9)).unwrap();
        assert_eq!(array.get(0).unwrap(), Scalar::I32(9));
        // The other handle still sees the original values and nulls.
        assert_eq!(other.get(0).unwrap(), Scalar::I32(1));
        assert!(other.is_null(1));
    }

    #[test]
    fn detach_rebases_bitmap_with_values() {
        let data = Buffer::copy_from(bytes_of(&[10i32, 20, 30, 40])).unwrap();
        let mut bitmap = allocate_validity_bitmap(4).unwrap();
        clear_bit(bitmap.as_mut_slice().unwrap(), 2);
        let mut array = IntegerArray::<i32>::new(data.clone(), 1, 3, Some(bitmap)).unwrap();
        assert!(array.is_null(1));
        array.ensure_mutable().unwrap();
        assert_eq!(array.values(), &[20, 30, 40]);
        assert!(!array.is_null(0));
        assert!(array.is_null(1));
        assert!(!array.is_null(2));
    }

    #[test]
    fn copy_section_preserves_nulls() {
        let array =
            IntegerArray::from_option_slice(&[Some(1i32), None, Some(3), None, Some(5)]).unwrap();
        let section = array.copy(1, 3).unwrap();
        assert_eq!(section.len(), 3);
        assert_eq!(section.null_count(), 2);
        assert_eq!(section.get(1).unwrap(), Scalar::I32(3));
        assert_eq!(section.get(2).unwrap(), Scalar::Null);
    }

    #[test]
    fn add_assign_no_nulls() {
        let mut lhs = IntegerArray::from_slice(&[1i64, 2, 3]).unwrap();
        let rhs = IntegerArray::from_slice(&[10i64, 20, 30]).unwrap();
        lhs.add_assign(&rhs).unwrap();
        assert_eq!(lhs.values(), &[11, 22, 33]);
    }

    #[test]
    fn add_assign_unions_nulls() {
        let mut lhs = IntegerArray::from_option_slice(&[Some(1i32), None, Some(3), Some(4)]).unwrap();
        let rhs = IntegerArray::from_option_slice(&[Some(10i32), Some(20), None, Some(40)]).unwrap();
        lhs.add_assign(&rhs).unwrap();
        assert_eq!(lhs.null_count(), 2);
        assert!(lhs.is_null(1));
        assert!(lhs.is_null(2));
        assert_eq!(lhs.get(0).unwrap(), Scalar::I32(11));
        assert_eq!(lhs.get(3).unwrap(), Scalar::I32(44));
    }

    #[test]
    fn add_assign_mixed_widths() {
        let mut lhs = IntegerArray::from_slice(&[100i64, 200]).unwrap();
        let rhs = IntegerArray::from_slice(&[1u8, 2]).unwrap();
        lhs.add_assign(&rhs).unwrap();
        assert_eq!(lhs.values(), &[101, 202]);
    }

    #[test]
    fn add_assign_detaches_shared_storage() {
        let mut lhs = IntegerArray::from_slice(&[1i32, 2]).unwrap();
        let before = lhs.clone();
        let rhs = IntegerArray::from_slice(&[1i32, 1]).unwrap();
        lhs.add_assign(&rhs).unwrap();
        assert_eq!(lhs.values(), &[2, 3]);
        assert_eq!(before.values(), &[1, 2]);
    }

    #[test]
    fn add_builds_detached_result() {
        let lhs = IntegerArray::from_slice(&[1i32, 2]).unwrap();
        let rhs = IntegerArray::from_slice(&[3i32, 4]).unwrap();
        let sum = lhs.add(&rhs).unwrap();
        assert_eq!(sum.values(), &[4, 6]);
        assert_eq!(lhs.values(), &[1, 2]);
    }

    #[test]
    fn add_assign_operates_over_the_overlap() {
        let mut lhs = IntegerArray::from_slice(&[1i32, 2, 3]).unwrap();
        let rhs = IntegerArray::from_slice(&[10i32, 20]).unwrap();
        lhs.add_assign(&rhs).unwrap();
        assert_eq!(lhs.values(), &[11, 22, 3]);

        let mut short = IntegerArray::from_slice(&[1i32]).unwrap();
        short.add_assign(&rhs).unwrap();
        assert_eq!(short.values(), &[11]);
    }

    #[rstest]
    #[case(6, 2, 3.0)]
    #[case(7, 2, 3.5)]
    #[case(8, 0, f32::INFINITY)]
    fn divide_small_types_stay_single(#[case] n: u8, #[case] d: u8, #[case] expected: f32) {
        let lhs = IntegerArray::from_slice(&[n]).unwrap();
        let rhs = IntegerArray::from_slice(&[d]).unwrap();
        let Quotient::Single(quotient) = lhs.divide(&rhs).unwrap() else {
            panic!("expected single precision");
        };
        assert_eq!(quotient.values(), &[expected]);
    }

    #[test]
    fn divide_result_has_the_overlap_length() {
        let lhs = IntegerArray::from_slice(&[6u8, 9, 12]).unwrap();
        let rhs = IntegerArray::from_slice(&[2u8, 3]).unwrap();
        let Quotient::Single(quotient) = lhs.divide(&rhs).unwrap() else {
            panic!("expected single precision");
        };
        assert_eq!(quotient.values(), &[3.0, 3.0]);

        let Quotient::Single(quotient) = rhs.divide(&lhs).unwrap() else {
            panic!("expected single precision");
        };
        assert_eq!(quotient.values().len(), 2);
    }

    #[test]
    fn divide_wide_types_promote_to_double() {
        let lhs = IntegerArray::from_slice(&[10i64, 9]).unwrap();
        let rhs = IntegerArray::from_slice(&[4i64, 3]).unwrap();
        let Quotient::Double(quotient) = lhs.divide(&rhs).unwrap() else {
            panic!("expected double precision");
        };
        assert_eq!(quotient.values(), &[2.5, 3.0]);
    }

    #[test]
    fn divide_mixed_width_promotes_on_either_side() {
        let lhs = IntegerArray::from_slice(&[1u8, 2]).unwrap();
        let rhs = IntegerArray::from_slice(&[1i32, 2]).unwrap();
        assert!(matches!(
            lhs.divide(&rhs).unwrap(),
            Quotient::Double(_)
        ));
    }

    #[test]
    fn divide_propagates_nulls_as_nan() {
        let lhs = IntegerArray::from_option_slice(&[Some(4u8), None, Some(9)]).unwrap();
        let rhs = IntegerArray::from_option_slice(&[Some(2u8), Some(2), None]).unwrap();
        let Quotient::Single(quotient) = lhs.divide(&rhs).unwrap() else {
            panic!("expected single precision");
        };
        assert_eq!(quotient.values()[0], 2.0);
        assert!(quotient.values()[1].is_nan());
        assert!(quotient.values()[2].is_nan());
    }
}
