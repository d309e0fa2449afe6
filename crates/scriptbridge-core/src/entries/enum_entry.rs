//! Enum type entry.

use crate::{NumericKind, TypeFlags, TypeHash};

/// Registry entry for a reflected enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    pub type_hash: TypeHash,
    pub module: String,
    /// Storage kind of the enum's values.
    pub underlying: NumericKind,
    pub flags: TypeFlags,
    /// Enumerator names and values.
    pub values: Vec<(String, i64)>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, module: impl Into<String>, underlying: NumericKind) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            module: module.into(),
            underlying,
            flags: TypeFlags::NATIVE | TypeFlags::EXPORTED,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Look up an enumerator's value by name.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Look up an enumerator's name by value.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values.iter().find(|(_, v)| *v == value).map(|(n, _)| n.as_str())
    }
}
