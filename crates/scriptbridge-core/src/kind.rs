//! Reflected property kinds.
//!
//! A [`PropertyKind`] is the immutable type descriptor of one reflected
//! value slot: a scalar tag, a reference to another reflected type, or a
//! container carrying the descriptors of its elements.

use std::fmt;

use crate::TypeHash;

/// Numeric storage kinds, shared by numeric properties and enum underlying types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericKind {
    /// Native type name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            NumericKind::I8 => "int8",
            NumericKind::I16 => "int16",
            NumericKind::I32 => "int32",
            NumericKind::I64 => "int64",
            NumericKind::U8 => "uint8",
            NumericKind::U16 => "uint16",
            NumericKind::U32 => "uint32",
            NumericKind::U64 => "uint64",
            NumericKind::F32 => "float",
            NumericKind::F64 => "double",
        }
    }

    /// Check if this is a floating point kind.
    pub fn is_float(self) -> bool {
        matches!(self, NumericKind::F32 | NumericKind::F64)
    }

    /// Check if this is an unsigned integer kind.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            NumericKind::U8 | NumericKind::U16 | NumericKind::U32 | NumericKind::U64
        )
    }
}

/// Kind tag of a reflected property, with nested descriptors for references
/// and containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Numeric(NumericKind),
    Str,
    Name,
    Text,
    /// Reference to an object of `class` (or a subclass).
    Object { class: TypeHash },
    /// Reference to a class whose identity is-a `meta_class`.
    Class { meta_class: TypeHash },
    /// Reference to an object implementing `interface`.
    Interface { interface: TypeHash },
    /// Inline struct value of exactly `struct_type`.
    Struct { struct_type: TypeHash },
    Enum {
        enum_type: TypeHash,
        underlying: NumericKind,
    },
    Delegate { signature: TypeHash },
    MulticastDelegate { signature: TypeHash },
    Array { inner: Box<PropertyKind> },
    Set { element: Box<PropertyKind> },
    Map {
        key: Box<PropertyKind>,
        value: Box<PropertyKind>,
    },
}

impl PropertyKind {
    pub const I8: PropertyKind = PropertyKind::Numeric(NumericKind::I8);
    pub const I16: PropertyKind = PropertyKind::Numeric(NumericKind::I16);
    pub const I32: PropertyKind = PropertyKind::Numeric(NumericKind::I32);
    pub const I64: PropertyKind = PropertyKind::Numeric(NumericKind::I64);
    pub const U8: PropertyKind = PropertyKind::Numeric(NumericKind::U8);
    pub const U16: PropertyKind = PropertyKind::Numeric(NumericKind::U16);
    pub const U32: PropertyKind = PropertyKind::Numeric(NumericKind::U32);
    pub const U64: PropertyKind = PropertyKind::Numeric(NumericKind::U64);
    pub const F32: PropertyKind = PropertyKind::Numeric(NumericKind::F32);
    pub const F64: PropertyKind = PropertyKind::Numeric(NumericKind::F64);

    /// Array of `inner`.
    pub fn array(inner: PropertyKind) -> Self {
        PropertyKind::Array {
            inner: Box::new(inner),
        }
    }

    /// Set of `element`.
    pub fn set(element: PropertyKind) -> Self {
        PropertyKind::Set {
            element: Box::new(element),
        }
    }

    /// Map from `key` to `value`.
    pub fn map(key: PropertyKind, value: PropertyKind) -> Self {
        PropertyKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Reflection-style kind name used in diagnostics (e.g. `IntProperty`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyKind::Bool => "BoolProperty",
            PropertyKind::Numeric(NumericKind::I8) => "Int8Property",
            PropertyKind::Numeric(NumericKind::I16) => "Int16Property",
            PropertyKind::Numeric(NumericKind::I32) => "IntProperty",
            PropertyKind::Numeric(NumericKind::I64) => "Int64Property",
            PropertyKind::Numeric(NumericKind::U8) => "ByteProperty",
            PropertyKind::Numeric(NumericKind::U16) => "UInt16Property",
            PropertyKind::Numeric(NumericKind::U32) => "UInt32Property",
            PropertyKind::Numeric(NumericKind::U64) => "UInt64Property",
            PropertyKind::Numeric(NumericKind::F32) => "FloatProperty",
            PropertyKind::Numeric(NumericKind::F64) => "DoubleProperty",
            PropertyKind::Str => "StrProperty",
            PropertyKind::Name => "NameProperty",
            PropertyKind::Text => "TextProperty",
            PropertyKind::Object { .. } => "ObjectProperty",
            PropertyKind::Class { .. } => "ClassProperty",
            PropertyKind::Interface { .. } => "InterfaceProperty",
            PropertyKind::Struct { .. } => "StructProperty",
            PropertyKind::Enum { .. } => "EnumProperty",
            PropertyKind::Delegate { .. } => "DelegateProperty",
            PropertyKind::MulticastDelegate { .. } => "MulticastDelegateProperty",
            PropertyKind::Array { .. } => "ArrayProperty",
            PropertyKind::Set { .. } => "SetProperty",
            PropertyKind::Map { .. } => "MapProperty",
        }
    }

    /// Check if values of this kind are plain scalars (no nested storage).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            PropertyKind::Bool
                | PropertyKind::Numeric(_)
                | PropertyKind::Str
                | PropertyKind::Name
                | PropertyKind::Text
                | PropertyKind::Enum { .. }
        )
    }

    /// Check if this is an object, class or interface reference.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            PropertyKind::Object { .. } | PropertyKind::Class { .. } | PropertyKind::Interface { .. }
        )
    }

    /// The reflected type this kind refers to, if any.
    ///
    /// Used to collect the types a wrapper type depends on.
    pub fn referenced_types(&self, out: &mut Vec<TypeHash>) {
        match self {
            PropertyKind::Object { class } => out.push(*class),
            PropertyKind::Class { meta_class } => out.push(*meta_class),
            PropertyKind::Interface { interface } => out.push(*interface),
            PropertyKind::Struct { struct_type } => out.push(*struct_type),
            PropertyKind::Enum { enum_type, .. } => out.push(*enum_type),
            PropertyKind::Delegate { signature }
            | PropertyKind::MulticastDelegate { signature } => out.push(*signature),
            PropertyKind::Array { inner } => inner.referenced_types(out),
            PropertyKind::Set { element } => element.referenced_types(out),
            PropertyKind::Map { key, value } => {
                key.referenced_types(out);
                value.referenced_types(out);
            }
            _ => {}
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Numeric(n) => f.write_str(n.name()),
            PropertyKind::Bool => f.write_str("bool"),
            PropertyKind::Str => f.write_str("string"),
            PropertyKind::Name => f.write_str("name"),
            PropertyKind::Text => f.write_str("text"),
            PropertyKind::Array { inner } => write!(f, "array<{inner}>"),
            PropertyKind::Set { element } => write!(f, "set<{element}>"),
            PropertyKind::Map { key, value } => write!(f, "map<{key}, {value}>"),
            other => f.write_str(other.kind_name()),
        }
    }
}
