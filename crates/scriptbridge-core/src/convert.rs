//! Conversion traits between Rust types and [`NativeValue`]s.
//!
//! - [`FromNative`]: extract a Rust value from a `NativeValue`
//! - [`IntoNative`]: wrap a Rust value as a `NativeValue`
//!
//! Native function bodies use these through
//! [`CallFrame::arg`](crate::CallFrame::arg) and
//! [`CallFrame::set_return`](crate::CallFrame::set_return).

use crate::{ConversionError, Name, NativeValue, ObjectHandle, Text};

/// Extract a value from a native value.
pub trait FromNative: Sized {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError>;
}

/// Convert a value into a native value.
pub trait IntoNative {
    fn into_native(self) -> NativeValue;
}

fn mismatch(value: &NativeValue, to: &str) -> ConversionError {
    ConversionError::TypeMismatch {
        operation: "read",
        from: value.type_name().to_string(),
        to: to.to_string(),
    }
}

// ============================================================================
// Numeric implementations
// ============================================================================

macro_rules! impl_native_numeric {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromNative for $ty {
                fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
                    match value {
                        NativeValue::$variant(v) => Ok(*v),
                        other => Err(mismatch(other, stringify!($ty))),
                    }
                }
            }

            impl IntoNative for $ty {
                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }
            }
        )*
    };
}

impl_native_numeric!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
);

// ============================================================================
// String-like implementations
// ============================================================================

impl FromNative for String {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Str(s) => Ok(s.clone()),
            other => Err(mismatch(other, "string")),
        }
    }
}

impl IntoNative for String {
    fn into_native(self) -> NativeValue {
        NativeValue::Str(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> NativeValue {
        NativeValue::Str(self.to_string())
    }
}

impl FromNative for Name {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Name(n) => Ok(n.clone()),
            other => Err(mismatch(other, "name")),
        }
    }
}

impl IntoNative for Name {
    fn into_native(self) -> NativeValue {
        NativeValue::Name(self)
    }
}

impl FromNative for Text {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Text(t) => Ok(t.clone()),
            other => Err(mismatch(other, "text")),
        }
    }
}

impl IntoNative for Text {
    fn into_native(self) -> NativeValue {
        NativeValue::Text(self)
    }
}

// ============================================================================
// References
// ============================================================================

impl FromNative for Option<ObjectHandle> {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Object(h) => Ok(*h),
            other => Err(mismatch(other, "object")),
        }
    }
}

impl IntoNative for Option<ObjectHandle> {
    fn into_native(self) -> NativeValue {
        NativeValue::Object(self)
    }
}

impl IntoNative for NativeValue {
    fn into_native(self) -> NativeValue {
        self
    }
}
