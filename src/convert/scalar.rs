//! Scalar conversions between script values and native values.
//!
//! - [`FromScript`]: read a Rust scalar out of a script value
//! - [`IntoScript`]: produce the script value of a Rust scalar
//!
//! The kind-driven entry points [`nativize_scalar`] and [`scriptize_scalar`]
//! cover every scalar [`PropertyKind`] except enums, which need the
//! reflection registry and are handled by the bridge.

use scriptbridge_core::{ConversionError, Name, NativeValue, NumericKind, PropertyKind, Text};

use crate::script::ScriptValue;
use crate::wrapper::Wrapper;

/// Read a scalar from a script value.
pub trait FromScript: Sized {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;
}

/// Produce the script value of a scalar.
pub trait IntoScript {
    fn into_script(self) -> ScriptValue;
}

fn mismatch(value: &ScriptValue, to: &str) -> ConversionError {
    ConversionError::nativize(value.type_name(), to)
}

/// Integer payload of an int or float (floats truncate toward zero).
fn integer_of(value: &ScriptValue) -> Option<i64> {
    match *value {
        ScriptValue::Int(i) => Some(i),
        ScriptValue::Float(f) => Some(f.trunc() as i64),
        _ => None,
    }
}

fn float_of(value: &ScriptValue) -> Option<f64> {
    match *value {
        ScriptValue::Float(f) => Some(f),
        ScriptValue::Int(i) => Some(i as f64),
        _ => None,
    }
}

/// String form used when identifiers and texts coerce other values.
fn coerce_str(value: &ScriptValue) -> Option<String> {
    match value {
        ScriptValue::Str(s) => Some(s.clone()),
        ScriptValue::Int(i) => Some(i.to_string()),
        ScriptValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{f:.1}")),
        ScriptValue::Float(f) => Some(f.to_string()),
        ScriptValue::Bool(true) => Some("True".to_string()),
        ScriptValue::Bool(false) => Some("False".to_string()),
        ScriptValue::None => Some(Name::NONE.to_string()),
        ScriptValue::Wrapper(w) => w
            .name_value()
            .map(|n| n.as_str().to_string())
            .or_else(|| w.text_value().map(|t| t.source)),
        _ => None,
    }
}

// ============================================================================
// Numeric implementations
// ============================================================================

macro_rules! impl_script_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    integer_of(value)
                        .map(|i| i as $ty)
                        .ok_or_else(|| mismatch(value, stringify!($ty)))
                }
            }

            impl IntoScript for $ty {
                fn into_script(self) -> ScriptValue {
                    ScriptValue::Int(self as i64)
                }
            }
        )*
    };
}

impl_script_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_script_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    float_of(value)
                        .map(|f| f as $ty)
                        .ok_or_else(|| mismatch(value, stringify!($ty)))
                }
            }

            impl IntoScript for $ty {
                fn into_script(self) -> ScriptValue {
                    ScriptValue::Float(f64::from(self))
                }
            }
        )*
    };
}

impl_script_float!(f32, f64);

impl FromScript for bool {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match *value {
            ScriptValue::Bool(b) => Ok(b),
            ScriptValue::None => Ok(false),
            ScriptValue::Int(i) => Ok(i != 0),
            _ => Err(mismatch(value, "bool")),
        }
    }
}

impl IntoScript for bool {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Bool(self)
    }
}

// ============================================================================
// String-like implementations
// ============================================================================

impl FromScript for String {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Str(s) => Ok(s.clone()),
            ScriptValue::Wrapper(w) => w
                .name_value()
                .map(|n| n.as_str().to_string())
                .or_else(|| w.text_value().map(|t| t.source))
                .ok_or_else(|| mismatch(value, "string")),
            _ => Err(mismatch(value, "string")),
        }
    }
}

impl IntoScript for String {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Str(self)
    }
}

impl FromScript for Name {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        if let Some(name) = value.as_wrapper().and_then(Wrapper::name_value) {
            return Ok(name);
        }
        coerce_str(value).map(Name::new).ok_or_else(|| mismatch(value, "name"))
    }
}

impl IntoScript for Name {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Wrapper(Wrapper::name(self))
    }
}

impl FromScript for Text {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        if let Some(text) = value.as_wrapper().and_then(Wrapper::text_value) {
            return Ok(text);
        }
        coerce_str(value).map(Text::invariant).ok_or_else(|| mismatch(value, "text"))
    }
}

impl IntoScript for Text {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Wrapper(Wrapper::text(self))
    }
}

// ============================================================================
// Kind-driven conversion
// ============================================================================

/// Nativize a script value into a numeric slot of `kind`.
///
/// Integer targets truncate floats and wrap out-of-range values.
pub fn nativize_numeric(value: &ScriptValue, kind: NumericKind) -> Option<NativeValue> {
    if kind.is_float() {
        float_of(value).map(|f| NativeValue::from_f64(kind, f))
    } else {
        integer_of(value).map(|i| NativeValue::from_i64(kind, i))
    }
}

/// Nativize a script value into a scalar slot of `kind`.
pub fn nativize_scalar(value: &ScriptValue, kind: &PropertyKind) -> Result<NativeValue, ConversionError> {
    let fail = || ConversionError::nativize(value.type_name(), kind.kind_name());
    match kind {
        PropertyKind::Bool => bool::from_script(value).map(NativeValue::Bool).map_err(|_| fail()),
        PropertyKind::Numeric(n) => nativize_numeric(value, *n).ok_or_else(fail),
        PropertyKind::Str => String::from_script(value).map(NativeValue::Str).map_err(|_| fail()),
        PropertyKind::Name => Name::from_script(value).map(NativeValue::Name).map_err(|_| fail()),
        PropertyKind::Text => Text::from_script(value).map(NativeValue::Text).map_err(|_| fail()),
        _ => Err(fail()),
    }
}

/// Scriptize a scalar native value of `kind`.
pub fn scriptize_scalar(value: &NativeValue, kind: &PropertyKind) -> Result<ScriptValue, ConversionError> {
    let converted = match (kind, value) {
        (PropertyKind::Bool, NativeValue::Bool(b)) => Some(ScriptValue::Bool(*b)),
        (PropertyKind::Numeric(n), v) if n.is_float() => v.as_f64().map(ScriptValue::Float),
        (PropertyKind::Numeric(_), v) => v.as_i64().map(ScriptValue::Int),
        (PropertyKind::Str, NativeValue::Str(s)) => Some(ScriptValue::Str(s.clone())),
        (PropertyKind::Name, NativeValue::Name(n)) => Some(n.clone().into_script()),
        (PropertyKind::Text, NativeValue::Text(t)) => Some(t.clone().into_script()),
        _ => None,
    };
    converted.ok_or_else(|| ConversionError::scriptize(value.type_name(), kind.kind_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_truncates_into_int() {
        assert_eq!(
            nativize_scalar(&ScriptValue::Float(3.0), &PropertyKind::I32),
            Ok(NativeValue::I32(3))
        );
        assert_eq!(
            nativize_scalar(&ScriptValue::Float(-2.9), &PropertyKind::I64),
            Ok(NativeValue::I64(-2))
        );
    }

    #[test]
    fn unsigned_wraps() {
        assert_eq!(nativize_scalar(&ScriptValue::Int(-1), &PropertyKind::U8), Ok(NativeValue::U8(255)));
        assert_eq!(nativize_scalar(&ScriptValue::Int(256), &PropertyKind::U8), Ok(NativeValue::U8(0)));
        assert_eq!(
            nativize_scalar(&ScriptValue::Int(-1), &PropertyKind::U64),
            Ok(NativeValue::U64(u64::MAX))
        );
    }

    #[test]
    fn bool_accepts_none_and_ints() {
        assert_eq!(nativize_scalar(&ScriptValue::None, &PropertyKind::Bool), Ok(NativeValue::Bool(false)));
        assert_eq!(nativize_scalar(&ScriptValue::Int(2), &PropertyKind::Bool), Ok(NativeValue::Bool(true)));
        assert!(nativize_scalar(&ScriptValue::Str("x".into()), &PropertyKind::Bool).is_err());
    }

    #[test]
    fn mismatch_names_both_types() {
        let err = nativize_scalar(&ScriptValue::Str("fast".into()), &PropertyKind::I32).unwrap_err();
        assert_eq!(err.to_string(), "Cannot nativize 'str' as 'IntProperty'");
    }

    #[test]
    fn string_accepts_name_wrapper() {
        let name = ScriptValue::Wrapper(Wrapper::name(Name::new("Hero")));
        assert_eq!(nativize_scalar(&name, &PropertyKind::Str), Ok(NativeValue::Str("Hero".into())));
        assert!(nativize_scalar(&ScriptValue::Int(1), &PropertyKind::Str).is_err());
    }

    #[test]
    fn name_and_text_coerce() {
        assert_eq!(
            nativize_scalar(&ScriptValue::Int(7), &PropertyKind::Name),
            Ok(NativeValue::Name(Name::new("7")))
        );
        assert_eq!(
            nativize_scalar(&ScriptValue::Str("Hello".into()), &PropertyKind::Text),
            Ok(NativeValue::Text(Text::invariant("Hello")))
        );
        let localized = ScriptValue::Wrapper(Wrapper::text(Text::localized("Hi")));
        assert_eq!(
            nativize_scalar(&localized, &PropertyKind::Text),
            Ok(NativeValue::Text(Text::localized("Hi")))
        );
    }

    #[test]
    fn scriptize_widens() {
        assert_eq!(scriptize_scalar(&NativeValue::U16(7), &PropertyKind::U16), Ok(ScriptValue::Int(7)));
        assert_eq!(scriptize_scalar(&NativeValue::F32(0.5), &PropertyKind::F32), Ok(ScriptValue::Float(0.5)));
        assert_eq!(
            scriptize_scalar(&NativeValue::U64(u64::MAX), &PropertyKind::U64),
            Ok(ScriptValue::Int(-1))
        );
        assert!(scriptize_scalar(&NativeValue::Bool(true), &PropertyKind::I32).is_err());
    }

    #[test]
    fn typed_traits() {
        assert_eq!(u8::from_script(&ScriptValue::Int(300)), Ok(44));
        assert_eq!(f32::from_script(&ScriptValue::Int(2)), Ok(2.0));
        assert_eq!(7u32.into_script(), ScriptValue::Int(7));
        assert_eq!(Name::from_script(&ScriptValue::Bool(true)), Ok(Name::new("True")));
    }
}
