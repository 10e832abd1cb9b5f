use std::any::Any;
use std::sync::Arc;

use tessera_buffer::Buffer;
use tessera_buffer::bit::clear_bit;
use tessera_dtype::{BooleanType, DataTypeRef};
use tessera_error::{TesseraExpect, TesseraResult};
use tessera_scalar::{NativeScalar, Scalar};

use crate::{Array, ArrayRef, IntegerArray, allocate_validity_bitmap, check_window};

/// A boolean array stored as one byte per element, reusing the integer
/// machinery for windows, validity, and copy-on-write.
#[derive(Clone, Debug)]
pub struct BooleanArray {
    values: IntegerArray<u8>,
}

impl BooleanArray {
    /// View a window of byte-per-element `data`, with nulls described by
    /// `validity`.
    pub fn new(
        data: Buffer,
        offset: usize,
        length: usize,
        validity: Option<Buffer>,
    ) -> TesseraResult<Self> {
        Ok(Self {
            values: IntegerArray::new_with_dtype(
                BooleanType::get(),
                data,
                offset,
                length,
                validity,
            )?,
        })
    }

    /// Copy a slice into a fresh array with no nulls.
    pub fn from_slice(values: &[bool]) -> TesseraResult<Self> {
        let raw: Vec<u8> = values.iter().map(|v| u8::from(*v)).collect();
        let data = Buffer::copy_from(&raw)?;
        Self::new(data, 0, values.len(), None)
    }

    /// Copy a slice of optional values into a fresh array, marking the
    /// `None` entries null.
    pub fn from_option_slice(values: &[Option<bool>]) -> TesseraResult<Self> {
        let raw: Vec<u8> = values
            .iter()
            .map(|v| u8::from(v.unwrap_or_default()))
            .collect();
        let data = Buffer::copy_from(&raw)?;
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

    /// Whether element `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        self.values.is_null(index)
    }

    /// Detach from shared storage so element writes succeed.
    pub fn ensure_mutable(&mut self) -> TesseraResult<()> {
        self.values.ensure_mutable()
    }

    /// Deep-copy a sub-window into fresh storage.
    pub fn copy_section(&self, offset: usize, length: usize) -> TesseraResult<Self> {
        Ok(Self {
            values: self.values.copy_section(offset, length)?,
        })
    }
}

impl Array for BooleanArray {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn dtype(&self) -> &DataTypeRef {
        self.values.dtype()
    }

    fn null_count(&self) -> usize {
        self.values.null_count()
    }

    fn get(&self, index: usize) -> TesseraResult<Scalar> {
        match self.values.get(index)? {
            Scalar::Null => Ok(Scalar::Null),
            value => Ok(Scalar::Bool(u8::from_scalar(value)? != 0)),
        }
    }

    fn set(&mut self, index: usize, value: Scalar) -> TesseraResult<()> {
        let stored = match value {
            Scalar::Null => Scalar::Null,
            Scalar::Bool(b) => Scalar::U8(u8::from(b)),
            // Any numeric scalar is accepted by truthiness.
            other => Scalar::U8(u8::from(f64::from_scalar(other)? != 0.0)),
        };
        self.values.set(index, stored)
    }

    fn copy(&self, offset: usize, length: usize) -> TesseraResult<ArrayRef> {
        check_window(offset, length, self.values.len())?;
        Ok(Arc::new(self.copy_section(offset, length)?))
    }

    fn owns_data(&self) -> bool {
        self.values.owns_data()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
