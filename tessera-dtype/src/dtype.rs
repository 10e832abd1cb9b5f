use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, LazyLock};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use tessera_error::{TesseraResult, tessera_bail};

/// Identifies a logical element kind.
///
/// The discriminants are stable and form part of the interchange surface
/// with binding layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeId {
    /// The degenerate null type.
    Na = 0,
    /// Unsigned 8-bit integer.
    UInt8 = 1,
    /// Signed 8-bit integer.
    Int8 = 2,
    /// Unsigned 16-bit integer.
    UInt16 = 3,
    /// Signed 16-bit integer.
    Int16 = 4,
    /// Unsigned 32-bit integer.
    UInt32 = 5,
    /// Signed 32-bit integer.
    Int32 = 6,
    /// Unsigned 64-bit integer.
    UInt64 = 7,
    /// Signed 64-bit integer.
    Int64 = 8,
    /// A boolean stored as one byte.
    Bool = 9,
    /// 4-byte floating point.
    Float32 = 10,
    /// 8-byte floating point.
    Float64 = 11,
    /// An opaque, externally-typed scalar.
    Object = 12,
    /// Timestamp placeholder.
    Timestamp = 13,
    /// Timezone-aware timestamp placeholder.
    TimestampTz = 14,
    /// UTF-8 string placeholder.
    Utf8 = 15,
    /// Dictionary-encoded categorical.
    Category = 16,
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Na => "null",
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Bool => "bool",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Object => "object",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamp_tz",
            Self::Utf8 => "utf8",
            Self::Category => "category",
        })
    }
}

/// A logical element type.
///
/// Primitive kinds are process-wide singletons; composite kinds (category)
/// are constructed per use. Equality is structural via [`DataType::equals`].
pub trait DataType: Debug + Display + Send + Sync {
    /// The kind identifier for this type.
    fn id(&self) -> TypeId;

    /// The type's canonical name.
    fn name(&self) -> &str;

    /// Downcast support for structural equality of composite types.
    fn as_any(&self) -> &dyn Any;

    /// Structural equality: same kind, and for composite types, equal
    /// parameters.
    fn equals(&self, other: &dyn DataType) -> bool {
        self.id() == other.id()
    }
}

/// A shared handle to an immutable [`DataType`].
pub type DataTypeRef = Arc<dyn DataType>;

macro_rules! primitive_types {
    ($(($struct:ident, $variant:ident, $name:literal)),+ $(,)?) => {
        $(
            #[doc = concat!("The `", $name, "` data type.")]
            #[derive(Debug, Default)]
            pub struct $struct;

            impl $struct {
                /// The process-wide singleton instance of this type.
                pub fn get() -> DataTypeRef {
                    static INSTANCE: LazyLock<DataTypeRef> =
                        LazyLock::new(|| Arc::new($struct));
                    INSTANCE.clone()
                }
            }

            impl DataType for $struct {
                fn id(&self) -> TypeId {
                    TypeId::$variant
                }

                fn name(&self) -> &str {
                    $name
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }

            impl Display for $struct {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str($name)
                }
            }
        )+
    };
}

primitive_types!(
    (NullType, Na, "null"),
    (UInt8Type, UInt8, "uint8"),
    (Int8Type, Int8, "int8"),
    (UInt16Type, UInt16, "uint16"),
    (Int16Type, Int16, "int16"),
    (UInt32Type, UInt32, "uint32"),
    (Int32Type, Int32, "int32"),
    (UInt64Type, UInt64, "uint64"),
    (Int64Type, Int64, "int64"),
    (BooleanType, Bool, "bool"),
    (FloatType, Float32, "float32"),
    (DoubleType, Float64, "float64"),
    (ObjectType, Object, "object"),
);

/// Granularity of a timestamp value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    /// Seconds.
    Second,
    /// Milliseconds.
    Millisecond,
    /// Microseconds.
    Microsecond,
    /// Nanoseconds.
    Nanosecond,
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Microsecond => "us",
            Self::Nanosecond => "ns",
        })
    }
}

/// A timestamp type, parameterized by its unit. Treated as an opaque
/// placeholder by the array layer.
#[derive(Debug)]
pub struct TimestampType {
    unit: TimeUnit,
}

impl TimestampType {
    /// Create a timestamp type with the given unit.
    pub fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }

    /// The timestamp's granularity.
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }
}

impl Default for TimestampType {
    fn default() -> Self {
        Self::new(TimeUnit::Microsecond)
    }
}

impl DataType for TimestampType {
    fn id(&self) -> TypeId {
        TypeId::Timestamp
    }

    fn name(&self) -> &str {
        "timestamp"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &dyn DataType) -> bool {
        other
            .as_any()
            .downcast_ref::<TimestampType>()
            .is_some_and(|ts| ts.unit == self.unit)
    }
}

impl Display for TimestampType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "timestamp[{}]", self.unit)
    }
}

/// Resolve a primitive kind to its process-wide singleton.
///
/// Fails with `NotImplemented` for kinds that are not primitive scalars
/// (null, timestamps, strings, category).
pub fn primitive_type(id: TypeId) -> TesseraResult<DataTypeRef> {
    Ok(match id {
        TypeId::UInt8 => UInt8Type::get(),
        TypeId::Int8 => Int8Type::get(),
        TypeId::UInt16 => UInt16Type::get(),
        TypeId::Int16 => Int16Type::get(),
        TypeId::UInt32 => UInt32Type::get(),
        TypeId::Int32 => Int32Type::get(),
        TypeId::UInt64 => UInt64Type::get(),
        TypeId::Int64 => Int64Type::get(),
        TypeId::Bool => BooleanType::get(),
        TypeId::Float32 => FloatType::get(),
        TypeId::Float64 => DoubleType::get(),
        TypeId::Object => ObjectType::get(),
        _ => tessera_bail!(NotImplemented: "{} is not a primitive type", id),
    })
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use tessera_error::TesseraError;

    use super::*;

    #[rstest]
    #[case(TypeId::UInt8, "uint8")]
    #[case(TypeId::Int8, "int8")]
    #[case(TypeId::UInt16, "uint16")]
    #[case(TypeId::Int16, "int16")]
    #[case(TypeId::UInt32, "uint32")]
    #[case(TypeId::Int32, "int32")]
    #[case(TypeId::UInt64, "uint64")]
    #[case(TypeId::Int64, "int64")]
    #[case(TypeId::Bool, "bool")]
    #[case(TypeId::Float32, "float32")]
    #[case(TypeId::Float64, "float64")]
    #[case(TypeId::Object, "object")]
    fn primitive_names(#[case] id: TypeId, #[case] name: &str) {
        let dtype = primitive_type(id).unwrap();
        assert_eq!(dtype.id(), id);
        assert_eq!(dtype.name(), name);
        assert_eq!(dtype.to_string(), name);
    }

    #[test]
    fn singletons_are_shared() {
        let a = primitive_type(TypeId::Int32).unwrap();
        let b = primitive_type(TypeId::Int32).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &Int32Type::get()));
    }

    #[test]
    fn structural_equality() {
        assert!(Int64Type::get().equals(&*Int64Type::get()));
        assert!(!Int64Type::get().equals(&*UInt64Type::get()));
    }

    #[test]
    fn non_primitive_kinds_fail() {
        for id in [TypeId::Na, TypeId::Timestamp, TypeId::Utf8, TypeId::Category] {
            assert!(matches!(
                primitive_type(id),
                Err(TesseraError::NotImplemented(..))
            ));
        }
    }

    #[test]
    fn timestamp_equality_and_display() {
        let us = TimestampType::default();
        let ns = TimestampType::new(TimeUnit::Nanosecond);
        assert_eq!(us.to_string(), "timestamp[us]");
        assert_eq!(ns.to_string(), "timestamp[ns]");
        assert!(us.equals(&TimestampType::new(TimeUnit::Microsecond)));
        assert!(!us.equals(&ns));
        assert!(!us.equals(&*Int64Type::get()));
    }

    #[test]
    fn type_id_roundtrip() {
        assert_eq!(TypeId::try_from(9u8).unwrap(), TypeId::Bool);
        assert_eq!(u8::from(TypeId::Category), 16);
        assert!(TypeId::try_from(17u8).is_err());
    }
}
