use tessera_dtype::TypeId;
use tessera_error::{TesseraResult, tessera_bail};

/// A single dynamically typed value.
///
/// `Null` represents a missing value regardless of the array's element type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    /// A missing value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An unsigned 8-bit integer.
    U8(u8),
    /// A signed 8-bit integer.
    I8(i8),
    /// An unsigned 16-bit integer.
    U16(u16),
    /// A signed 16-bit integer.
    I16(i16),
    /// An unsigned 32-bit integer.
    U32(u32),
    /// A signed 32-bit integer.
    I32(i32),
    /// An unsigned 64-bit integer.
    U64(u64),
    /// A signed 64-bit integer.
    I64(i64),
    /// A 4-byte float.
    F32(f32),
    /// An 8-byte float.
    F64(f64),
}

impl Scalar {
    /// Whether this scalar is the missing value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind of this scalar's value, if it has one.
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Null => TypeId::Na,
            Self::Bool(_) => TypeId::Bool,
            Self::U8(_) => TypeId::UInt8,
            Self::I8(_) => TypeId::Int8,
            Self::U16(_) => TypeId::UInt16,
            Self::I16(_) => TypeId::Int16,
            Self::U32(_) => TypeId::UInt32,
            Self::I32(_) => TypeId::Int32,
            Self::U64(_) => TypeId::UInt64,
            Self::I64(_) => TypeId::Int64,
            Self::F32(_) => TypeId::Float32,
            Self::F64(_) => TypeId::Float64,
        }
    }

    /// Interpret an integer scalar as an index.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_usize(&self) -> TesseraResult<usize> {
        Ok(match *self {
            Self::U8(v) => v as usize,
            Self::U16(v) => v as usize,
            Self::U32(v) => v as usize,
            Self::U64(v) => v as usize,
            Self::I8(v) => v as usize,
            Self::I16(v) => v as usize,
            Self::I32(v) => v as usize,
            Self::I64(v) => v as usize,
            _ => tessera_bail!("a {} scalar is not an integer", self.type_id()),
        })
    }
}

/// A native element type that converts to and from [`Scalar`].
///
/// `from_scalar` coerces across numeric kinds with `as` semantics: values
/// outside the target's range truncate or wrap silently, matching element-wise
/// stores into a narrower array. `Null` never converts.
pub trait NativeScalar: Sized {
    /// Wrap a native value in its scalar variant.
    fn to_scalar(self) -> Scalar;

    /// Coerce a scalar to this native type.
    fn from_scalar(scalar: Scalar) -> TesseraResult<Self>;
}

macro_rules! native_scalar {
    ($(($t:ty, $variant:ident)),+ $(,)?) => {
        $(
            impl NativeScalar for $t {
                fn to_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_possible_wrap,
                    clippy::cast_precision_loss,
                    clippy::cast_lossless,
                    clippy::unnecessary_cast
                )]
                fn from_scalar(scalar: Scalar) -> TesseraResult<Self> {
                    Ok(match scalar {
                        Scalar::Null => tessera_bail!("null scalar has no value"),
                        Scalar::Bool(v) => (v as u8) as $t,
                        Scalar::U8(v) => v as $t,
                        Scalar::I8(v) => v as $t,
                        Scalar::U16(v) => v as $t,
                        Scalar::I16(v) => v as $t,
                        Scalar::U32(v) => v as $t,
                        Scalar::I32(v) => v as $t,
                        Scalar::U64(v) => v as $t,
                        Scalar::I64(v) => v as $t,
                        Scalar::F32(v) => v as $t,
                        Scalar::F64(v) => v as $t,
                    })
                }
            }

            impl From<$t> for Scalar {
                fn from(value: $t) -> Self {
                    Scalar::$variant(value)
                }
            }
        )+
    };
}

native_scalar!(
    (u8, U8),
    (i8, I8),
    (u16, U16),
    (i16, I16),
    (u32, U32),
    (i32, I32),
    (u64, U64),
    (i64, I64),
    (f32, F32),
    (f64, F64),
);

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}
