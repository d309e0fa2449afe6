//! Layout queries and default construction of native values.

use crate::{
    DelegateValue, EnumEntry, Name, NativeValue, PropertyDescriptor, PropertyKind, StructValue, Text,
    TypeHash,
};

/// Source of struct and enum layouts.
///
/// Implemented by the reflection registry; kept as a trait so value-level
/// helpers do not depend on registry storage.
pub trait TypeLayout {
    /// Flattened field list of a struct or class, inherited fields first.
    fn fields_of(&self, type_hash: TypeHash) -> Option<Vec<PropertyDescriptor>>;

    /// Enum entry by identity.
    fn enum_of(&self, type_hash: TypeHash) -> Option<&EnumEntry>;
}

/// Default value of a single slot of `kind`.
///
/// Structs are default-constructed field by field; an unknown struct type
/// yields an empty field list.
pub fn default_value(kind: &PropertyKind, layout: &dyn TypeLayout) -> NativeValue {
    match kind {
        PropertyKind::Bool => NativeValue::Bool(false),
        PropertyKind::Numeric(n) | PropertyKind::Enum { underlying: n, .. } => NativeValue::from_i64(*n, 0),
        PropertyKind::Str => NativeValue::Str(String::new()),
        PropertyKind::Name => NativeValue::Name(Name::default()),
        PropertyKind::Text => NativeValue::Text(Text::default()),
        PropertyKind::Object { .. } | PropertyKind::Interface { .. } => NativeValue::Object(None),
        PropertyKind::Class { .. } => NativeValue::Class(None),
        PropertyKind::Struct { struct_type } => NativeValue::Struct(default_struct(*struct_type, layout)),
        PropertyKind::Delegate { .. } => NativeValue::Delegate(DelegateValue::default()),
        PropertyKind::MulticastDelegate { .. } => NativeValue::Multicast(Vec::new()),
        PropertyKind::Array { .. } => NativeValue::Array(Vec::new()),
        PropertyKind::Set { .. } => NativeValue::Set(Vec::new()),
        PropertyKind::Map { .. } => NativeValue::Map(Vec::new()),
    }
}

/// Default storage of a property, honoring its array dimension.
pub fn default_property_value(property: &PropertyDescriptor, layout: &dyn TypeLayout) -> NativeValue {
    if property.is_fixed_array() {
        NativeValue::Fixed(
            (0..property.array_dim)
                .map(|_| default_value(&property.kind, layout))
                .collect(),
        )
    } else {
        default_value(&property.kind, layout)
    }
}

/// Default-constructed struct or object field block.
pub fn default_struct(type_hash: TypeHash, layout: &dyn TypeLayout) -> StructValue {
    let fields = layout
        .fields_of(type_hash)
        .unwrap_or_default()
        .iter()
        .map(|p| default_property_value(p, layout))
        .collect();
    StructValue {
        struct_type: type_hash,
        fields,
    }
}
