use num_traits::{AsPrimitive, Float, PrimInt, WrappingAdd};

use crate::{
    BooleanType, DataTypeRef, DoubleType, FloatType, Int8Type, Int16Type, Int32Type, Int64Type,
    TypeId, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};

mod sealed {
    pub trait Sealed {}
}

/// A Rust scalar type with a corresponding primitive [`crate::DataType`].
///
/// Sealed: the set of native types is closed.
pub trait NativeType:
    sealed::Sealed + Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static
{
    /// The kind identifier for this native type.
    const TYPE_ID: TypeId;

    /// The singleton data type for this native type.
    fn dtype() -> DataTypeRef;
}

/// A native fixed-width integer.
pub trait NativeInt:
    NativeType + PrimInt + WrappingAdd + AsPrimitive<f32> + AsPrimitive<f64>
{
    /// This type's maximum value, widened to `f64`.
    const MAX_F64: f64;
}

/// A native IEEE-754 float.
pub trait NativeFloat: NativeType + Float + AsPrimitive<f64> {}

macro_rules! native_int {
    ($(($t:ty, $dtype:ident, $variant:ident)),+ $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl NativeType for $t {
                const TYPE_ID: TypeId = TypeId::$variant;

                fn dtype() -> DataTypeRef {
                    $dtype::get()
                }
            }

            impl NativeInt for $t {
                #[allow(clippy::cast_precision_loss)]
                const MAX_F64: f64 = <$t>::MAX as f64;
            }
        )+
    };
}

macro_rules! native_float {
    ($(($t:ty, $dtype:ident, $variant:ident)),+ $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl NativeType for $t {
                const TYPE_ID: TypeId = TypeId::$variant;

                fn dtype() -> DataTypeRef {
                    $dtype::get()
                }
            }

            impl NativeFloat for $t {}
        )+
    };
}

native_int!(
    (u8, UInt8Type, UInt8),
    (i8, Int8Type, Int8),
    (u16, UInt16Type, UInt16),
    (i16, Int16Type, Int16),
    (u32, UInt32Type, UInt32),
    (i32, Int32Type, Int32),
    (u64, UInt64Type, UInt64),
    (i64, Int64Type, Int64),
);

native_float!((f32, FloatType, Float32), (f64, DoubleType, Float64));

impl sealed::Sealed for bool {}

impl NativeType for bool {
    const TYPE_ID: TypeId = TypeId::Bool;

    fn dtype() -> DataTypeRef {
        BooleanType::get()
    }
}

/// Expand a block of code once per native type, binding the type to `$T`.
#[macro_export]
macro_rules! match_each_native_type {
    ($self:expr, | $_:tt $T:ident | $($body:tt)*) => {{
        macro_rules! __with__ {( $_ $T:ident ) => ( $($body)* )}
        match $self {
            $crate::TypeId::UInt8 => __with__! { u8 },
            $crate::TypeId::Int8 => __with__! { i8 },
            $crate::TypeId::UInt16 => __with__! { u16 },
            $crate::TypeId::Int16 => __with__! { i16 },
            $crate::TypeId::UInt32 => __with__! { u32 },
            $crate::TypeId::Int32 => __with__! { i32 },
            $crate::TypeId::UInt64 => __with__! { u64 },
            $crate::TypeId::Int64 => __with__! { i64 },
            $crate::TypeId::Float32 => __with__! { f32 },
            $crate::TypeId::Float64 => __with__! { f64 },
            other => panic!("not a numeric type: {other}"),
        }
    }};
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn native_type_ids() {
        assert_eq!(u8::TYPE_ID, TypeId::UInt8);
        assert_eq!(i64::TYPE_ID, TypeId::Int64);
        assert_eq!(f32::TYPE_ID, TypeId::Float32);
        assert_eq!(bool::TYPE_ID, TypeId::Bool);
    }

    #[test]
    fn native_dtypes_are_singletons() {
        assert!(std::sync::Arc::ptr_eq(&i32::dtype(), &Int32Type::get()));
        assert!(std::sync::Arc::ptr_eq(&f64::dtype(), &DoubleType::get()));
    }

    #[test]
    fn max_widening() {
        assert_eq!(u8::MAX_F64, 255.0);
        assert!(i64::MAX_F64 > u32::MAX_F64);
    }

    #[test]
    fn match_macro_dispatch() {
        fn width(id: TypeId) -> usize {
            match_each_native_type!(id, |$T| size_of::<$T>())
        }
        assert_eq!(width(TypeId::UInt8), 1);
        assert_eq!(width(TypeId::Int64), 8);
        assert_eq!(width(TypeId::Float32), 4);
    }
}
