//! Script-side type definitions handed to the generator.

use bitflags::bitflags;
use scriptbridge_core::PropertyKind;

use crate::script::{ScriptCallable, ScriptValue};

bitflags! {
    /// Flags a script method declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Callable without an instance.
        const STATIC = 1 << 0;
        /// Does not mutate its owner.
        const PURE = 1 << 1;
        /// Explicitly mutating; exclusive with `PURE`.
        const IMPURE = 1 << 2;
        /// Reads a field in place of its storage.
        const GETTER = 1 << 3;
        /// Writes a field in place of its storage.
        const SETTER = 1 << 4;
        /// Implements a script event of the parent class.
        const OVERRIDE = 1 << 5;
    }
}

/// A field of a script-defined type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: PropertyKind,
    /// Fixed array dimension; 1 for a plain field.
    pub array_dim: u32,
    /// Name of the method reading this field.
    pub getter: Option<String>,
    /// Name of the method writing this field.
    pub setter: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_dim: 1,
            getter: None,
            setter: None,
        }
    }

    pub fn with_array_dim(mut self, array_dim: u32) -> Self {
        self.array_dim = array_dim;
        self
    }

    pub fn with_getter(mut self, method: impl Into<String>) -> Self {
        self.getter = Some(method.into());
        self
    }

    pub fn with_setter(mut self, method: impl Into<String>) -> Self {
        self.setter = Some(method.into());
        self
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDefinition {
    pub name: String,
    pub kind: PropertyKind,
}

/// What a script method returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReturnDefinition {
    #[default]
    None,
    Single(PropertyKind),
    /// Several values, or `None` when there is nothing to return.
    Tuple(Vec<PropertyKind>),
}

/// A method of a script-defined class.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    pub name: String,
    pub callable: ScriptCallable,
    pub flags: MethodFlags,
    /// Parameters after the implicit instance.
    pub params: Vec<ParamDefinition>,
    pub returns: ReturnDefinition,
    /// Defaults of the trailing parameters.
    pub defaults: Vec<ScriptValue>,
}

impl MethodDefinition {
    pub fn new(name: impl Into<String>, callable: ScriptCallable) -> Self {
        Self {
            name: name.into(),
            callable,
            flags: MethodFlags::empty(),
            params: Vec::new(),
            returns: ReturnDefinition::None,
            defaults: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.params.push(ParamDefinition { name: name.into(), kind });
        self
    }

    pub fn with_return(mut self, kind: PropertyKind) -> Self {
        self.returns = ReturnDefinition::Single(kind);
        self
    }

    pub fn with_returns(mut self, kinds: Vec<PropertyKind>) -> Self {
        self.returns = ReturnDefinition::Tuple(kinds);
        self
    }

    pub fn with_default(mut self, value: impl Into<ScriptValue>) -> Self {
        self.defaults.push(value.into());
        self
    }

    /// Check if the method spells out parameters or a return type.
    pub fn declares_signature(&self) -> bool {
        !self.params.is_empty() || self.returns != ReturnDefinition::None
    }

    pub fn is_accessor(&self) -> bool {
        self.flags.intersects(MethodFlags::GETTER | MethodFlags::SETTER)
    }
}

/// A script-defined class.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub name: String,
    pub parent: Option<String>,
    /// Declaring module; the configured generated module when unset.
    pub module: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub methods: Vec<MethodDefinition>,
    /// Called with every freshly constructed instance.
    pub post_init: Option<ScriptCallable>,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            module: None,
            fields: Vec::new(),
            methods: Vec::new(),
            post_init: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_post_init(mut self, hook: ScriptCallable) -> Self {
        self.post_init = Some(hook);
        self
    }
}

/// A script-defined struct: fields only.
#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub name: String,
    pub parent: Option<String>,
    pub module: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

impl StructDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            module: None,
            fields: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

/// Any script type definition.
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Class(ClassDefinition),
    Struct(StructDefinition),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Class(c) => &c.name,
            TypeDefinition::Struct(s) => &s.name,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            TypeDefinition::Class(c) => c.parent.as_deref(),
            TypeDefinition::Struct(s) => s.parent.as_deref(),
        }
    }

    pub fn module(&self) -> Option<&str> {
        match self {
            TypeDefinition::Class(c) => c.module.as_deref(),
            TypeDefinition::Struct(s) => s.module.as_deref(),
        }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        match self {
            TypeDefinition::Class(c) => &c.fields,
            TypeDefinition::Struct(s) => &s.fields,
        }
    }

    pub fn methods(&self) -> &[MethodDefinition] {
        match self {
            TypeDefinition::Class(c) => &c.methods,
            TypeDefinition::Struct(_) => &[],
        }
    }
}
