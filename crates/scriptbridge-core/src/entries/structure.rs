//! Struct type entry.

use crate::{PropertyDescriptor, TypeFlags, TypeHash};

use super::Metadata;

/// Registry entry for a reflected struct (an inline value type).
#[derive(Debug, Clone)]
pub struct StructEntry {
    pub name: String,
    pub type_hash: TypeHash,
    pub module: String,
    pub super_struct: Option<TypeHash>,
    pub flags: TypeFlags,
    /// Own properties in layout order.
    pub properties: Vec<PropertyDescriptor>,
    pub metadata: Metadata,
}

impl StructEntry {
    /// Create a native, exported struct.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            module: module.into(),
            super_struct: None,
            flags: TypeFlags::NATIVE | TypeFlags::EXPORTED,
            properties: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_super(mut self, super_struct: TypeHash) -> Self {
        self.super_struct = Some(super_struct);
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}
