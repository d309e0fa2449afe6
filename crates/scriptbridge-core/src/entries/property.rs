//! Property descriptors.

use rustc_hash::FxHashMap;

use crate::{PropertyFlags, PropertyKind};

/// Free-form string metadata attached to reflected entries.
pub type Metadata = FxHashMap<String, String>;

/// Descriptor of one reflected property or function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    /// Number of inline slots; greater than one for fixed-size arrays.
    pub array_dim: u32,
    pub flags: PropertyFlags,
    pub metadata: Metadata,
}

impl PropertyDescriptor {
    /// Create a property with no flags and a single slot.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_dim: 1,
            flags: PropertyFlags::empty(),
            metadata: Metadata::default(),
        }
    }

    /// Create a script-editable property.
    pub fn editable(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self::new(name, kind).with_flags(PropertyFlags::EDIT | PropertyFlags::SCRIPT_VISIBLE)
    }

    /// Create an input parameter.
    pub fn param(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self::new(name, kind).with_flags(PropertyFlags::PARM)
    }

    /// Create an output parameter.
    pub fn out_param(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self::new(name, kind).with_flags(PropertyFlags::PARM | PropertyFlags::OUT_PARM)
    }

    /// Create the return value slot.
    pub fn return_param(kind: PropertyKind) -> Self {
        Self::new("ReturnValue", kind)
            .with_flags(PropertyFlags::PARM | PropertyFlags::OUT_PARM | PropertyFlags::RETURN_PARM)
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_array_dim(mut self, array_dim: u32) -> Self {
        self.array_dim = array_dim.max(1);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Check if this property is a fixed-size array.
    pub fn is_fixed_array(&self) -> bool {
        self.array_dim > 1
    }

    /// Descriptor of one slot of a fixed-size array.
    pub fn element_descriptor(&self) -> PropertyDescriptor {
        let mut element = self.clone();
        element.array_dim = 1;
        element
    }

    /// Check if this parameter is the return slot.
    pub fn is_return(&self) -> bool {
        self.flags.contains(PropertyFlags::RETURN_PARM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_constructors() {
        assert!(PropertyDescriptor::param("A", PropertyKind::I32).flags.is_input_param());
        assert!(PropertyDescriptor::out_param("B", PropertyKind::I32).flags.is_output_param());
        let ret = PropertyDescriptor::return_param(PropertyKind::Bool);
        assert!(ret.is_return());
        assert!(!ret.flags.is_input_param());
        assert!(!ret.flags.is_output_param());
    }

    #[test]
    fn fixed_array_element() {
        let prop = PropertyDescriptor::editable("Slots", PropertyKind::I32).with_array_dim(4);
        assert!(prop.is_fixed_array());
        let element = prop.element_descriptor();
        assert!(!element.is_fixed_array());
        assert_eq!(element.kind, PropertyKind::I32);
    }

    #[test]
    fn array_dim_never_zero() {
        assert_eq!(PropertyDescriptor::new("X", PropertyKind::Bool).with_array_dim(0).array_dim, 1);
    }

    #[test]
    fn metadata_lookup() {
        let prop = PropertyDescriptor::new("X", PropertyKind::Bool).with_metadata("ScriptName", "x");
        assert_eq!(prop.metadata("ScriptName"), Some("x"));
        assert_eq!(prop.metadata("Other"), None);
    }
}
