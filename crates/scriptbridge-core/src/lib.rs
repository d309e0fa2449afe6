//! Core types for scriptbridge.
//!
//! This crate holds the native side of the bridge: reflected type identity,
//! property kinds and descriptors, registry entries, the native value model,
//! storage addressing and the object heap that native storage lives in.
//!
//! # Key Types
//!
//! - [`TypeHash`]: deterministic identity of reflected types and members
//! - [`PropertyKind`] / [`PropertyDescriptor`]: what a value slot holds
//! - [`ClassEntry`], [`StructEntry`], [`EnumEntry`], [`FunctionEntry`]: reflected types
//! - [`NativeValue`]: a reflected value
//! - [`NativeAddr`]: the address of one value slot
//! - [`ObjectHeap`]: generational storage of native objects

pub mod convert;
mod entries;
mod error;
mod flags;
mod kind;
pub mod layout;
pub mod runtime;
mod storage;
pub mod text;
mod type_hash;
mod value;

pub use convert::{FromNative, IntoNative};
pub use entries::{
    ClassEntry, EnumEntry, FunctionEntry, FunctionImpl, Metadata, PropertyDescriptor, StructEntry, TypeEntry,
};
pub use error::{AccessError, ConversionError, NativeError, RegistrationError};
pub use flags::{FunctionFlags, PropertyFlags, TypeFlags};
pub use kind::{NumericKind, PropertyKind};
pub use layout::TypeLayout;
pub use runtime::{CallFrame, NativeCallable, NativeFn, NativeObject, ObjectHandle, ObjectHeap};
pub use storage::{NativeAddr, NativeBuffer, PathSegment, StorageRoot};
pub use type_hash::{TypeHash, hash_constants};
pub use value::{DelegateValue, Name, NativeValue, StructValue, Text};
