//! Class type entry.

use crate::{FunctionEntry, PropertyDescriptor, TypeFlags, TypeHash};

use super::Metadata;

/// Registry entry for a reflected class.
///
/// Holds only the class's own members; inherited members are resolved
/// through the registry by walking `super_class`.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub name: String,
    pub type_hash: TypeHash,
    /// Declaring module.
    pub module: String,
    pub super_class: Option<TypeHash>,
    pub flags: TypeFlags,
    /// Own properties in layout order.
    pub properties: Vec<PropertyDescriptor>,
    /// Own functions.
    pub functions: Vec<FunctionEntry>,
    pub metadata: Metadata,
}

impl ClassEntry {
    /// Create a native, exported class.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            module: module.into(),
            super_class: None,
            flags: TypeFlags::NATIVE | TypeFlags::EXPORTED,
            properties: Vec::new(),
            functions: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_super(mut self, super_class: TypeHash) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a function, re-keying it to this class.
    pub fn with_function(mut self, mut function: FunctionEntry) -> Self {
        function.owner = self.type_hash;
        function.type_hash = TypeHash::from_function(self.type_hash, &function.name);
        self.functions.push(function);
        self
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_flags(mut self, flags: TypeFlags) -> Self {
        self.flags.remove(flags);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Find an own property by name.
    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Find an own function by name.
    pub fn find_function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn is_native(&self) -> bool {
        self.flags.contains(TypeFlags::NATIVE)
    }
}
