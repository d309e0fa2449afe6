//! Error types for the bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (top-level wrapper)
//! ├── ConversionError   - a value cannot be converted to the requested kind
//! ├── ValidationError   - a script type definition is rejected
//! ├── RegistrationError - reflected type registration and lookup
//! ├── NativeError       - native function bodies and call frames
//! └── AccessError       - a storage address no longer resolves
//! ```
//!
//! Failures gain context as they propagate: each layer wraps the error it
//! received with [`BridgeError::context`], and the same layer reports the
//! message to the script runtime's error slot when the caller asked for it
//! (see [`ErrorMode`](crate::ErrorMode)).

use scriptbridge_core::{AccessError, ConversionError, NativeError, RegistrationError};
use thiserror::Error;

use crate::script::ScriptErrorKind;

/// Result alias used throughout the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

// ============================================================================
// Bridge Errors
// ============================================================================

/// Errors raised by conversion, wrapper and generator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Incompatible value for the requested kind.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The property kind has no conversion in this position.
    #[error("{kind} conversion not implemented for property '{property}'")]
    UnimplementedConversion { kind: &'static str, property: String },

    /// A script type definition was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal bookkeeping is inconsistent (uninitialized wrapper, missing type).
    #[error("internal error: {detail}")]
    InternalState { detail: String },

    /// Container index out of range.
    #[error("Index {index} is out-of-bounds (len: {len}) for property '{property}' ({type_name})")]
    Index {
        index: i64,
        len: usize,
        property: String,
        type_name: String,
    },

    /// Map or set lookup failed.
    #[error("key {key} not found in property '{property}'")]
    Key { key: String, property: String },

    /// Attribute lookup failed.
    #[error("'{type_name}' has no attribute '{name}'")]
    NoAttribute { type_name: String, name: String },

    /// Attribute exists but the access is not permitted.
    #[error("attribute '{name}' on '{type_name}' {reason}")]
    AttributeAccess {
        type_name: String,
        name: String,
        reason: &'static str,
    },

    /// An operation was called in a state that does not allow it.
    #[error("{detail}")]
    Precondition { detail: String },

    /// Argument binding for a call failed.
    #[error("{function}: {detail}")]
    Call { function: String, detail: String },

    /// Failure raised by a script callable.
    #[error("{0}")]
    Script(String),

    /// Registration or lookup failure.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Native function failure.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Storage access failure.
    #[error(transparent)]
    Storage(#[from] AccessError),

    /// An error with an outer layer of context.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Wrap this error with an outer layer of context.
    pub fn context(self, context: impl Into<String>) -> Self {
        BridgeError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        BridgeError::InternalState { detail: detail.into() }
    }

    pub fn precondition(detail: impl Into<String>) -> Self {
        BridgeError::Precondition { detail: detail.into() }
    }

    /// The innermost error below every context layer.
    pub fn root_cause(&self) -> &BridgeError {
        let mut current = self;
        while let BridgeError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Check if the root cause reports inconsistent internal state.
    pub fn is_internal_state(&self) -> bool {
        matches!(
            self.root_cause(),
            BridgeError::InternalState { .. } | BridgeError::Storage(_)
        )
    }

    /// Script-visible error category.
    pub fn script_kind(&self) -> ScriptErrorKind {
        match self.root_cause() {
            BridgeError::Conversion(_)
            | BridgeError::UnimplementedConversion { .. }
            | BridgeError::Call { .. } => ScriptErrorKind::TypeError,
            BridgeError::Validation(_) | BridgeError::Precondition { .. } => ScriptErrorKind::ValueError,
            BridgeError::Index { .. } => ScriptErrorKind::IndexError,
            BridgeError::Key { .. } => ScriptErrorKind::KeyError,
            BridgeError::NoAttribute { .. } | BridgeError::AttributeAccess { .. } => {
                ScriptErrorKind::AttributeError
            }
            _ => ScriptErrorKind::RuntimeError,
        }
    }

    /// Message of this layer alone, without nested context.
    pub fn layer_message(&self) -> String {
        match self {
            BridgeError::Context { context, .. } => context.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Reasons a script class or struct definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Types, fields and methods must be named.
    #[error("definitions and their members require a name")]
    EmptyName,

    /// The named parent is not a registered class or struct.
    #[error("parent type '{parent}' of '{type_name}' is not registered")]
    UnknownParent { type_name: String, parent: String },

    /// A method was declared as both override and static, getter or setter.
    #[error("method '{method}' on '{type_name}' cannot be an override and static, getter or setter")]
    OverrideWithModifiers { type_name: String, method: String },

    /// Overrides take their signature from the parent.
    #[error("method '{method}' on '{type_name}' is an override and cannot declare a signature")]
    OverrideWithSignature { type_name: String, method: String },

    /// Static methods cannot be property accessors.
    #[error("method '{method}' on '{type_name}' cannot be both static and a getter or setter")]
    StaticAccessor { type_name: String, method: String },

    /// A method cannot be both getter and setter.
    #[error("method '{method}' on '{type_name}' cannot be both a getter and a setter")]
    GetterAndSetter { type_name: String, method: String },

    /// Getters must be declared pure.
    #[error("getter '{method}' on '{type_name}' must be pure")]
    GetterNotPure { type_name: String, method: String },

    /// Pure and impure are exclusive.
    #[error("method '{method}' on '{type_name}' cannot be both pure and impure")]
    PureAndImpure { type_name: String, method: String },

    /// A method shadows a parent method without declaring the override.
    #[error("method '{method}' on '{type_name}' hides a method of '{parent}' and must be marked as an override")]
    MissingOverride {
        type_name: String,
        method: String,
        parent: String,
    },

    /// An override has no parent method to override.
    #[error("method '{method}' on '{type_name}' is marked as an override but no parent declares it")]
    NothingToOverride { type_name: String, method: String },

    /// Only script events can be overridden.
    #[error("method '{method}' of '{parent}' is not overridable from script (in '{type_name}')")]
    NotScriptEvent {
        type_name: String,
        method: String,
        parent: String,
    },

    /// A field collides with an inherited property.
    #[error("field '{field}' on '{type_name}' collides with a property of '{parent}'")]
    FieldCollision {
        type_name: String,
        field: String,
        parent: String,
    },

    /// Two members of a definition share a name.
    #[error("'{name}' is declared more than once on '{type_name}'")]
    DuplicateMember { type_name: String, name: String },

    /// More defaults than parameters.
    #[error("method '{method}' on '{type_name}' has {defaults} defaults but only {params} parameters")]
    TooManyDefaults {
        type_name: String,
        method: String,
        defaults: usize,
        params: usize,
    },

    /// A field accessor names a method the definition does not declare.
    #[error("field '{field}' on '{type_name}' uses unknown accessor '{accessor}'")]
    UnknownAccessor {
        type_name: String,
        field: String,
        accessor: String,
    },
}
