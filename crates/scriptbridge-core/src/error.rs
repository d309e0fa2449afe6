//! Error types for the native side of the bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ConversionError   - a value does not match the expected native kind
//! AccessError       - a storage address no longer resolves
//! RegistrationError - reflected type registration and lookup
//! NativeError       - native function argument/return handling
//! ```

use thiserror::Error;

use crate::TypeHash;

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors raised when a value cannot be converted to the requested kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value's type has no mapping to the requested type.
    #[error("Cannot {operation} '{from}' as '{to}'")]
    TypeMismatch {
        operation: &'static str,
        from: String,
        to: String,
    },

    /// Text could not be parsed into a value of the requested kind.
    #[error("cannot import '{text}' as '{kind}'")]
    InvalidText { text: String, kind: String },

    /// A reflected type was referenced but is not registered.
    #[error("unknown reflected type {0}")]
    UnknownType(TypeHash),
}

impl ConversionError {
    /// Build a mismatch error for the nativize direction.
    pub fn nativize(from: impl Into<String>, to: impl Into<String>) -> Self {
        ConversionError::TypeMismatch {
            operation: "nativize",
            from: from.into(),
            to: to.into(),
        }
    }

    /// Build a mismatch error for the scriptize direction.
    pub fn scriptize(from: impl Into<String>, to: impl Into<String>) -> Self {
        ConversionError::TypeMismatch {
            operation: "scriptize",
            from: from.into(),
            to: to.into(),
        }
    }
}

// ============================================================================
// Storage Access Errors
// ============================================================================

/// Errors raised when a native storage address cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The object behind the address was destroyed.
    #[error("native object {index}:{generation} is no longer alive")]
    StaleHandle { index: u32, generation: u32 },

    /// A path segment does not match the shape of the stored value.
    #[error("storage path segment {segment} does not resolve in a '{found}' value")]
    InvalidPath { segment: String, found: &'static str },

    /// The buffer is already borrowed by an enclosing access.
    #[error("native buffer {0} is already in use")]
    BufferBusy(u64),
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while registering or looking up reflected types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// Type not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this identity is already registered.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A member with this name already exists on the type.
    #[error("duplicate {kind} '{name}' on '{owner}'")]
    DuplicateMember {
        owner: String,
        name: String,
        kind: &'static str,
    },

    /// Function not found.
    #[error("function '{name}' not found on '{owner}'")]
    FunctionNotFound { owner: String, name: String },

    /// The entry exists but is not of the expected category.
    #[error("'{name}' is not a {expected}")]
    WrongCategory { name: String, expected: &'static str },
}

// ============================================================================
// Native Call Errors
// ============================================================================

/// Errors raised by native function bodies and call frames.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Argument index out of bounds.
    #[error("argument index {index} out of bounds (count: {count})")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// An argument has the wrong kind.
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: ConversionError,
    },

    /// The function requires an instance but none was supplied.
    #[error("function '{function}' requires an instance")]
    MissingThis { function: String },

    /// Storage access failed during the call.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Free-form failure raised by a native body.
    #[error("{0}")]
    Other(String),
}

impl NativeError {
    /// Create a free-form native error.
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other(message.into())
    }
}
