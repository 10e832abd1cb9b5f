use std::any::Any;
use std::sync::Arc;

use num_traits::AsPrimitive;
use tessera_buffer::Buffer;
use tessera_buffer::bit::bit_not_set;
use tessera_dtype::{DataTypeRef, NativeFloat, NativeInt};
use tessera_error::TesseraResult;
use tessera_scalar::{NativeScalar, Scalar};

use crate::numeric::bytes_of;
use crate::{
    Array, ArrayAdd, ArrayDiv, ArrayRef, IntegerArray, NumericArray, check_index, check_window,
};

/// Where an operand's nulls come from, resolved once per operation.
#[derive(Clone, Copy)]
pub(crate) enum RhsNulls<'a> {
    /// The operand has no nulls.
    None,
    /// Bitmap validity: element `i` is null iff bit `offset + i` is unset.
    Bitmap { bits: &'a [u8], offset: usize },
    /// The operand encodes nulls as NaN values.
    Nan,
}

/// A floating point array. Nulls are encoded in-band as NaN, so no validity
/// bitmap is carried and any NaN reads back as null.
#[derive(Clone, Debug)]
pub struct FloatingArray<T> {
    values: NumericArray<T>,
}

impl<T: NativeFloat> FloatingArray<T> {
    /// View a window of `data` as floating point elements.
    pub fn new(data: Buffer, offset: usize, length: usize) -> TesseraResult<Self> {
        Ok(Self {
            values: NumericArray::new(data, offset, length)?,
        })
    }

    /// Copy a slice into a fresh array.
    pub fn from_slice(values: &[T]) -> TesseraResult<Self> {
        let data = Buffer::copy_from(bytes_of(values))?;
        Self::new(data, 0, values.len())
    }

    /// Copy a slice of optional values, storing NaN for each `None`.
    pub fn from_option_slice(values: &[Option<T>]) -> TesseraResult<Self> {
        let raw: Vec<T> = values.iter().map(|v| v.unwrap_or_else(T::nan)).collect();
        Self::from_slice(&raw)
    }

    /// The visible elements. NaN entries are null.
    pub fn values(&self) -> &[T] {
        self.values.values()
    }

    /// Writable access to the visible elements. Fails when the buffer is
    /// shared or immutable.
    pub fn values_mut(&mut self) -> TesseraResult<&mut [T]> {
        self.values.values_mut()
    }

    /// Whether element `index` is null, i.e. NaN.
    pub fn is_null(&self, index: usize) -> bool {
        self.values.values()[index].is_nan()
    }

    /// Detach from shared storage so element writes succeed.
    pub fn ensure_mutable(&mut self) -> TesseraResult<()> {
        self.values.ensure_mutable_and_check_change()?;
        Ok(())
    }

    /// Deep-copy a sub-window into fresh storage.
    pub fn copy_section(&self, offset: usize, length: usize) -> TesseraResult<Self> {
        Ok(Self {
            values: self.values.copy_section(offset, length)?,
        })
    }

    pub(crate) fn null_source(&self) -> RhsNulls<'_> {
        RhsNulls::Nan
    }

    /// Apply `op` element-wise against `rhs` over the overlap of the two
    /// arrays, in place.
    ///
    /// A null on either side makes the element null: existing NaN slots are
    /// left alone, and slots whose rhs element is null are set to NaN.
    /// Detaches from shared storage first.
    pub(crate) fn evaluate_binary<U, F>(
        &mut self,
        rhs: &[U],
        rhs_nulls: RhsNulls<'_>,
        op: F,
    ) -> TesseraResult<()>
    where
        U: Copy + AsPrimitive<T>,
        F: Fn(T, T) -> T,
    {
        let length = self.values.len().min(rhs.len());
        self.values.ensure_mutable_and_check_change()?;
        let out = self.values.values_mut()?;
        for (i, slot) in out.iter_mut().enumerate().take(length) {
            if slot.is_nan() {
                continue;
            }
            let value: T = rhs[i].as_();
            let null = match rhs_nulls {
                RhsNulls::None => false,
                RhsNulls::Nan => value.is_nan(),
                RhsNulls::Bitmap { bits, offset } => bit_not_set(bits, offset + i),
            };
            *slot = if null { T::nan() } else { op(*slot, value) };
        }
        Ok(())
    }
}

impl<T, U> ArrayAdd<FloatingArray<U>> for FloatingArray<T>
where
    T: NativeFloat,
    U: NativeFloat + AsPrimitive<T>,
{
    fn add_assign(&mut self, rhs: &FloatingArray<U>) -> TesseraResult<()> {
        self.evaluate_binary(rhs.values(), rhs.null_source(), |a, b| a + b)
    }
}

impl<T, U> ArrayAdd<IntegerArray<U>> for FloatingArray<T>
where
    T: NativeFloat,
    U: NativeInt + AsPrimitive<T>,
{
    fn add_assign(&mut self, rhs: &IntegerArray<U>) -> TesseraResult<()> {
        self.evaluate_binary(rhs.values(), rhs.null_source(), |a, b| a + b)
    }
}

impl<T, U> ArrayDiv<FloatingArray<U>> for FloatingArray<T>
where
    T: NativeFloat,
    U: NativeFloat + AsPrimitive<T>,
{
    fn div_assign(&mut self, rhs: &FloatingArray<U>) -> TesseraResult<()> {
        self.evaluate_binary(rhs.values(), rhs.null_source(), |a, b| a / b)
    }
}

impl<T, U> ArrayDiv<IntegerArray<U>> for FloatingArray<T>
where
    T: NativeFloat,
    U: NativeInt + AsPrimitive<T>,
{
    fn div_assign(&mut self, rhs: &IntegerArray<U>) -> TesseraResult<()> {
        self.evaluate_binary(rhs.values(), rhs.null_source(), |a, b| a / b)
    }
}

impl<T: NativeFloat + NativeScalar> Array for FloatingArray<T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn dtype(&self) -> &DataTypeRef {
        self.values.dtype()
    }

    fn null_count(&self) -> usize {
        self.values.values().iter().filter(|v| v.is_nan()).count()
    }

    fn get(&self, index: usize) -> TesseraResult<Scalar> {
        check_index(index, self.values.len())?;
        let value = self.values.values()[index];
        if value.is_nan() {
            return Ok(Scalar::Null);
        }
        Ok(value.to_scalar())
    }

    fn set(&mut self, index: usize, value: Scalar) -> TesseraResult<()> {
        check_index(index, self.values.len())?;
        let native = if value.is_null() {
            T::nan()
        } else {
            T::from_scalar(value)?
        };
        self.values.values_mut()?[index] = native;
        Ok(())
    }

    fn copy(&self, offset: usize, length: usize) -> TesseraResult<ArrayRef> {
        check_window(offset, length, self.values.len())?;
        Ok(Arc::new(self.copy_section(offset, length)?))
    }

    fn owns_data(&self) -> bool {
        self.values.data().is_unique()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
