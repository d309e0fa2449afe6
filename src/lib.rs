//! scriptbridge
//!
//! A bidirectional bridge between a dynamically typed scripting runtime and
//! a reflected native object model.
//!
//! ## Architecture
//!
//! - **Value engine**: scalar, reference, struct, delegate and container
//!   conversion in both directions, driven by a [`PropertyKind`](scriptbridge_core::PropertyKind)
//! - **Property layer**: reads and writes of one reflected property in place,
//!   with change detection and notification
//! - **Wrappers**: script values aliasing or owning native storage, deduplicated
//!   per address
//! - **Type registry**: lazily generated script wrapper types for reflected types
//! - **Type generator**: native types synthesized from script definitions, with
//!   redefinition and instance migration
//!
//! ## Modules
//!
//! - [`bridge`]: the [`Bridge`] facade owning every registry and cache
//! - [`convert`]: the value engine and property layer
//! - [`wrapper`]: wrappers, factories and the per-kind wrapper protocols
//! - [`owner`]: ownership contexts and change notification
//! - [`types`]: script wrapper types and their registry
//! - [`generator`]: the dynamic type generator
//! - [`script`]: script values, errors and runtime state
//!
//! The native side (type identity, entries, values, storage, object heap) lives
//! in `scriptbridge-core`; the reflection registry in `scriptbridge-registry`.

pub mod bridge;
pub mod config;
pub mod convert;
pub mod error;
pub mod generator;
pub mod owner;
pub mod script;
pub mod types;
pub mod wrapper;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use convert::{ErrorMode, FromScript, IntoScript};
pub use error::{BridgeError, BridgeResult, ValidationError};
pub use generator::{
    ClassDefinition, FieldDefinition, GeneratedType, MethodDefinition, MethodFlags, PendingReinstance,
    ReturnDefinition, StructDefinition, TypeDefinition, TypeGenerator,
};
pub use owner::{ChangeEvent, ChangeObserver, OwnerContext, PropertyChain, PropertyRef};
pub use script::{ScriptCallable, ScriptError, ScriptErrorKind, ScriptRuntime, ScriptValue};
pub use types::{TypeRegistry, WrapperType, WrapperTypeId, WrapperTypeKind};
pub use wrapper::{ConversionMode, NativeSource, ScriptOperator, Wrapper, WrapperFactories, WrapperKind, WrapperPayload};
