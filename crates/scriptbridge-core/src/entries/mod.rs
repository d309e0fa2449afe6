//! Registry entries for reflected types.
//!
//! - [`ClassEntry`]: classes (heap objects with functions)
//! - [`StructEntry`]: inline value types
//! - [`EnumEntry`]: enums over a numeric storage kind
//! - [`FunctionEntry`]: member functions and delegate signatures
//! - [`PropertyDescriptor`]: properties and parameters

mod class;
mod enum_entry;
mod function;
mod property;
mod structure;

pub use class::ClassEntry;
pub use enum_entry::EnumEntry;
pub use function::{FunctionEntry, FunctionImpl};
pub use property::{Metadata, PropertyDescriptor};
pub use structure::StructEntry;

use crate::{TypeFlags, TypeHash};

/// A registered reflected type.
#[derive(Debug, Clone)]
pub enum TypeEntry {
    Class(ClassEntry),
    Struct(StructEntry),
    Enum(EnumEntry),
    /// Delegate signature.
    Signature(FunctionEntry),
}

impl TypeEntry {
    pub fn type_hash(&self) -> TypeHash {
        match self {
            TypeEntry::Class(c) => c.type_hash,
            TypeEntry::Struct(s) => s.type_hash,
            TypeEntry::Enum(e) => e.type_hash,
            TypeEntry::Signature(f) => f.type_hash,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeEntry::Class(c) => &c.name,
            TypeEntry::Struct(s) => &s.name,
            TypeEntry::Enum(e) => &e.name,
            TypeEntry::Signature(f) => &f.name,
        }
    }

    /// Declaring module; signatures belong to no module.
    pub fn module(&self) -> Option<&str> {
        match self {
            TypeEntry::Class(c) => Some(&c.module),
            TypeEntry::Struct(s) => Some(&s.module),
            TypeEntry::Enum(e) => Some(&e.module),
            TypeEntry::Signature(_) => None,
        }
    }

    pub fn flags(&self) -> TypeFlags {
        match self {
            TypeEntry::Class(c) => c.flags,
            TypeEntry::Struct(s) => s.flags,
            TypeEntry::Enum(e) => e.flags,
            TypeEntry::Signature(_) => TypeFlags::NATIVE,
        }
    }

    /// Parent type, for classes and structs.
    pub fn super_type(&self) -> Option<TypeHash> {
        match self {
            TypeEntry::Class(c) => c.super_class,
            TypeEntry::Struct(s) => s.super_struct,
            _ => None,
        }
    }

    /// Own properties, for classes and structs.
    pub fn properties(&self) -> &[crate::PropertyDescriptor] {
        match self {
            TypeEntry::Class(c) => &c.properties,
            TypeEntry::Struct(s) => &s.properties,
            _ => &[],
        }
    }

    pub fn as_class(&self) -> Option<&ClassEntry> {
        match self {
            TypeEntry::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructEntry> {
        match self {
            TypeEntry::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumEntry> {
        match self {
            TypeEntry::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&FunctionEntry> {
        match self {
            TypeEntry::Signature(f) => Some(f),
            _ => None,
        }
    }

    /// Replace the name, keeping the identity.
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            TypeEntry::Class(c) => c.name = name,
            TypeEntry::Struct(s) => s.name = name,
            TypeEntry::Enum(e) => e.name = name,
            TypeEntry::Signature(f) => f.name = name,
        }
    }

    /// Set or clear flags on classes and structs.
    pub fn set_flags(&mut self, flags: TypeFlags, value: bool) {
        match self {
            TypeEntry::Class(c) => c.flags.set(flags, value),
            TypeEntry::Struct(s) => s.flags.set(flags, value),
            TypeEntry::Enum(e) => e.flags.set(flags, value),
            TypeEntry::Signature(_) => {}
        }
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        let metadata = match self {
            TypeEntry::Class(c) => &c.metadata,
            TypeEntry::Struct(s) => &s.metadata,
            TypeEntry::Signature(f) => &f.metadata,
            TypeEntry::Enum(_) => return None,
        };
        metadata.get(key).map(String::as_str)
    }
}
