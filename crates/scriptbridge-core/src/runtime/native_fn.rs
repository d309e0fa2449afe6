//! Native function storage and callable trait.

use std::fmt;
use std::rc::Rc;

use crate::{NativeError, TypeHash};

use super::CallFrame;

/// Type-erased native function.
///
/// Wraps any callable that implements [`NativeCallable`], so functions with
/// different bodies can be stored uniformly in reflected function entries.
/// Clones share the same callable.
#[derive(Clone)]
pub struct NativeFn {
    /// Identity of the reflected function this body implements.
    pub id: TypeHash,
    inner: Rc<dyn NativeCallable>,
}

impl NativeFn {
    /// Create a new NativeFn from a callable.
    pub fn new<F>(id: TypeHash, f: F) -> Self
    where
        F: NativeCallable + 'static,
    {
        Self {
            id,
            inner: Rc::new(f),
        }
    }

    /// Call this native function with the given frame.
    pub fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError> {
        self.inner.call(frame)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Trait for callable native functions.
pub trait NativeCallable {
    /// Call this function with the given frame.
    fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallFrame<'_>) -> Result<(), NativeError>,
{
    fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError> {
        (self)(frame)
    }
}
