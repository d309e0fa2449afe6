//! Native value model.
//!
//! [`NativeValue`] is the in-memory form of any reflected value: scalars,
//! identifiers, localizable text, object and class references, inline
//! structs, delegates and the three container kinds. Objects live in the
//! [`ObjectHeap`](crate::ObjectHeap) and are referenced by handle; every
//! other value is stored inline.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::storage::PathSegment;
use crate::{AccessError, NumericKind, ObjectHandle, TypeHash};

/// Case-insensitive identifier.
///
/// Compares and hashes ignoring ASCII case but keeps the spelling it was
/// created with.
#[derive(Clone, Default)]
pub struct Name(String);

impl Name {
    /// The empty name.
    pub const NONE: &'static str = "None";

    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the empty name.
    pub fn is_none(&self) -> bool {
        self.0.is_empty() || self.0.eq_ignore_ascii_case(Self::NONE)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Localizable display text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Text {
    pub source: String,
    /// Not subject to localization.
    pub culture_invariant: bool,
}

impl Text {
    /// Text that will be gathered for localization.
    pub fn localized(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            culture_invariant: false,
        }
    }

    /// Text that is never localized.
    pub fn invariant(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            culture_invariant: true,
        }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Inline struct value, fields in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub struct_type: TypeHash,
    pub fields: Vec<NativeValue>,
}

/// A single-cast delegate binding: an object plus the name of a function on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DelegateValue {
    pub object: Option<ObjectHandle>,
    pub function: Option<Name>,
}

impl DelegateValue {
    pub fn bound(object: ObjectHandle, function: impl Into<String>) -> Self {
        Self {
            object: Some(object),
            function: Some(Name::new(function)),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.object.is_some() && self.function.is_some()
    }
}

/// A reflected value held in native storage.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Name(Name),
    Text(Text),
    /// Object or interface reference.
    Object(Option<ObjectHandle>),
    /// Class reference.
    Class(Option<TypeHash>),
    Struct(StructValue),
    Delegate(DelegateValue),
    Multicast(Vec<DelegateValue>),
    Array(Vec<NativeValue>),
    /// Storage of a property whose array dimension is greater than one.
    Fixed(Vec<NativeValue>),
    /// Unique elements in insertion order.
    Set(Vec<NativeValue>),
    /// Unique keys in insertion order.
    Map(Vec<(NativeValue, NativeValue)>),
}

impl NativeValue {
    /// Short name of the stored variant for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Bool(_) => "bool",
            NativeValue::I8(_) => "int8",
            NativeValue::I16(_) => "int16",
            NativeValue::I32(_) => "int32",
            NativeValue::I64(_) => "int64",
            NativeValue::U8(_) => "uint8",
            NativeValue::U16(_) => "uint16",
            NativeValue::U32(_) => "uint32",
            NativeValue::U64(_) => "uint64",
            NativeValue::F32(_) => "float",
            NativeValue::F64(_) => "double",
            NativeValue::Str(_) => "string",
            NativeValue::Name(_) => "name",
            NativeValue::Text(_) => "text",
            NativeValue::Object(_) => "object",
            NativeValue::Class(_) => "class",
            NativeValue::Struct(_) => "struct",
            NativeValue::Delegate(_) => "delegate",
            NativeValue::Multicast(_) => "multicast delegate",
            NativeValue::Array(_) => "array",
            NativeValue::Fixed(_) => "fixed array",
            NativeValue::Set(_) => "set",
            NativeValue::Map(_) => "map",
        }
    }

    /// Build a numeric value of `kind` from an integer, wrapping on overflow.
    pub fn from_i64(kind: NumericKind, v: i64) -> Self {
        match kind {
            NumericKind::I8 => NativeValue::I8(v as i8),
            NumericKind::I16 => NativeValue::I16(v as i16),
            NumericKind::I32 => NativeValue::I32(v as i32),
            NumericKind::I64 => NativeValue::I64(v),
            NumericKind::U8 => NativeValue::U8(v as u8),
            NumericKind::U16 => NativeValue::U16(v as u16),
            NumericKind::U32 => NativeValue::U32(v as u32),
            NumericKind::U64 => NativeValue::U64(v as u64),
            NumericKind::F32 => NativeValue::F32(v as f32),
            NumericKind::F64 => NativeValue::F64(v as f64),
        }
    }

    /// Build a numeric value of `kind` from a float.
    ///
    /// Integer kinds truncate toward zero, then wrap like [`from_i64`](Self::from_i64).
    pub fn from_f64(kind: NumericKind, v: f64) -> Self {
        match kind {
            NumericKind::F32 => NativeValue::F32(v as f32),
            NumericKind::F64 => NativeValue::F64(v),
            int_kind => NativeValue::from_i64(int_kind, v.trunc() as i64),
        }
    }

    /// Integer payload, with unsigned values reinterpreted as two's-complement.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            NativeValue::I8(v) => Some(i64::from(v)),
            NativeValue::I16(v) => Some(i64::from(v)),
            NativeValue::I32(v) => Some(i64::from(v)),
            NativeValue::I64(v) => Some(v),
            NativeValue::U8(v) => Some(i64::from(v)),
            NativeValue::U16(v) => Some(i64::from(v)),
            NativeValue::U32(v) => Some(i64::from(v)),
            NativeValue::U64(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Floating point payload.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            NativeValue::F32(v) => Some(f64::from(v)),
            NativeValue::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of an array, fixed array or set.
    pub fn elements(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::Array(v) | NativeValue::Fixed(v) | NativeValue::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Native identity comparison.
    ///
    /// Sets and maps compare as unordered collections; everything else
    /// compares structurally.
    pub fn identical(&self, other: &NativeValue) -> bool {
        match (self, other) {
            (NativeValue::Set(a), NativeValue::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.identical(y)))
            }
            (NativeValue::Map(a), NativeValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .find(|(k2, _)| k.identical(k2))
                            .is_some_and(|(_, v2)| v.identical(v2))
                    })
            }
            (NativeValue::Array(a), NativeValue::Array(b))
            | (NativeValue::Fixed(a), NativeValue::Fixed(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (NativeValue::Struct(a), NativeValue::Struct(b)) => {
                a.struct_type == b.struct_type
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(&b.fields).all(|(x, y)| x.identical(y))
            }
            _ => self == other,
        }
    }

    /// Resolve a storage path inside this value.
    pub fn at_path(&self, path: &[PathSegment]) -> Result<&NativeValue, AccessError> {
        let mut current = self;
        for segment in path {
            current = current.child(*segment)?;
        }
        Ok(current)
    }

    /// Resolve a storage path inside this value for mutation.
    pub fn at_path_mut(&mut self, path: &[PathSegment]) -> Result<&mut NativeValue, AccessError> {
        let mut current = self;
        for segment in path {
            current = current.child_mut(*segment)?;
        }
        Ok(current)
    }

    fn child(&self, segment: PathSegment) -> Result<&NativeValue, AccessError> {
        let found = match (self, segment) {
            (NativeValue::Struct(s), PathSegment::Field(i)) => s.fields.get(i as usize),
            (
                NativeValue::Array(v) | NativeValue::Fixed(v) | NativeValue::Set(v),
                PathSegment::Element(i),
            ) => v.get(i as usize),
            (NativeValue::Map(m), PathSegment::MapKey(i)) => m.get(i as usize).map(|(k, _)| k),
            (NativeValue::Map(m), PathSegment::MapValue(i)) => m.get(i as usize).map(|(_, v)| v),
            _ => None,
        };
        found.ok_or_else(|| AccessError::InvalidPath {
            segment: segment.to_string(),
            found: self.type_name(),
        })
    }

    fn child_mut(&mut self, segment: PathSegment) -> Result<&mut NativeValue, AccessError> {
        let found = self.type_name();
        let child = match (self, segment) {
            (NativeValue::Struct(s), PathSegment::Field(i)) => s.fields.get_mut(i as usize),
            (
                NativeValue::Array(v) | NativeValue::Fixed(v) | NativeValue::Set(v),
                PathSegment::Element(i),
            ) => v.get_mut(i as usize),
            (NativeValue::Map(m), PathSegment::MapKey(i)) => m.get_mut(i as usize).map(|(k, _)| k),
            (NativeValue::Map(m), PathSegment::MapValue(i)) => {
                m.get_mut(i as usize).map(|(_, v)| v)
            }
            _ => None,
        };
        child.ok_or_else(|| AccessError::InvalidPath {
            segment: segment.to_string(),
            found,
        })
    }
}
