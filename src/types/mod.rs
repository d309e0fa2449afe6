//! Script wrapper types.
//!
//! Every reflected native type exposed to scripts gets exactly one wrapper
//! type: the script-visible face of the type, listing its accessors
//! (getsets) and callable methods under script names. Wrapper types are
//! produced lazily by the [`TypeRegistry`].

mod naming;
mod registry;

pub use naming::{SCRIPT_NAME_KEY, function_script_name, script_name_of, script_type_name, to_snake_case};
pub use registry::{RegistrationState, TypeRegistry};

use std::fmt;

use scriptbridge_core::{PropertyDescriptor, TypeHash};

/// Metadata key naming the function that reads a property.
pub const SCRIPT_GETTER_KEY: &str = "ScriptGetter";
/// Metadata key naming the function that writes a property.
pub const SCRIPT_SETTER_KEY: &str = "ScriptSetter";
/// Metadata key listing the struct operators a static function implements.
pub const SCRIPT_OPERATOR_KEY: &str = "ScriptOperator";

/// Index of a wrapper type in the [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperTypeId(pub(crate) u32);

impl WrapperTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WrapperTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Category of the reflected type behind a wrapper type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperTypeKind {
    Class,
    Struct,
    Enum,
    Delegate,
}

/// A script accessor for one reflected property.
#[derive(Debug, Clone)]
pub struct GetSet {
    pub script_name: String,
    /// The property, under its native name.
    pub property: PropertyDescriptor,
    /// Function called instead of reading storage.
    pub getter: Option<String>,
    /// Function called instead of writing storage.
    pub setter: Option<String>,
    pub doc: String,
}

impl GetSet {
    pub fn native_name(&self) -> &str {
        &self.property.name
    }
}

/// A script-callable method.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub script_name: String,
    pub native_name: String,
    pub function: TypeHash,
    pub is_static: bool,
    /// Per input parameter, the native text of its default value.
    pub defaults: Vec<Option<String>>,
    pub doc: String,
}

/// The script-visible type of a reflected native type.
#[derive(Debug, Clone)]
pub struct WrapperType {
    pub id: WrapperTypeId,
    pub name: String,
    pub reflected: TypeHash,
    pub kind: WrapperTypeKind,
    pub base: Option<WrapperTypeId>,
    pub module: String,
    /// Own accessors; inherited ones live on the base types.
    pub getsets: Vec<GetSet>,
    pub methods: Vec<MethodDef>,
    /// Enum labels and values.
    pub enum_values: Vec<(String, i64)>,
    pub doc: String,
    /// Unloaded with its module; kept for scripts still holding it.
    pub orphaned: bool,
}

impl WrapperType {
    pub fn find_getset(&self, script_name: &str) -> Option<&GetSet> {
        self.getsets.iter().find(|g| g.script_name == script_name)
    }

    pub fn find_method(&self, script_name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.script_name == script_name)
    }
}
