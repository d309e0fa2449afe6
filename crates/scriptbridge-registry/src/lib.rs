//! Reflection registry for scriptbridge.
//!
//! [`ReflectionRegistry`] stores the reflected native types the bridge
//! converts to and from: classes, structs, enums and delegate signatures.
//! It answers the layout and hierarchy queries the conversion layers need
//! and supports the supersede operations used when a generated type is
//! redefined.

mod registry;

pub use registry::ReflectionRegistry;
