//! Call frame passed to native function bodies.

use std::fmt;

use crate::convert::{FromNative, IntoNative};
use crate::{NativeError, NativeObject, NativeValue, ObjectHandle};

use super::ObjectHeap;

/// Parameter block for one native call.
///
/// Holds one slot per declared parameter in signature order, including the
/// return slot and output parameters. Input slots are filled by the caller
/// before the call; the body writes outputs and the return value, which the
/// caller reads back after the call.
///
/// ```ignore
/// let x: i32 = frame.arg(0)?;
/// frame.set_return(x * 2)?;
/// ```
pub struct CallFrame<'heap> {
    params: Vec<NativeValue>,
    return_index: Option<usize>,
    this: Option<ObjectHandle>,
    heap: &'heap mut ObjectHeap,
}

impl<'heap> CallFrame<'heap> {
    /// Create a call frame.
    ///
    /// * `params` - one slot per parameter, defaulted for outputs
    /// * `return_index` - index of the return slot within `params`
    /// * `this` - the instance for member functions
    pub fn new(
        params: Vec<NativeValue>,
        return_index: Option<usize>,
        this: Option<ObjectHandle>,
        heap: &'heap mut ObjectHeap,
    ) -> Self {
        Self {
            params,
            return_index,
            this,
            heap,
        }
    }

    /// Number of parameter slots (return slot included).
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Raw access to a parameter slot.
    pub fn param(&self, index: usize) -> Result<&NativeValue, NativeError> {
        self.params.get(index).ok_or(NativeError::ArgumentIndexOutOfBounds {
            index,
            count: self.params.len(),
        })
    }

    /// Typed access to a parameter slot.
    pub fn arg<T: FromNative>(&self, index: usize) -> Result<T, NativeError> {
        T::from_native(self.param(index)?).map_err(|source| NativeError::Argument { index, source })
    }

    /// Overwrite a parameter slot (used for output parameters).
    pub fn set_param(&mut self, index: usize, value: impl IntoNative) -> Result<(), NativeError> {
        let count = self.params.len();
        let slot = self
            .params
            .get_mut(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds { index, count })?;
        *slot = value.into_native();
        Ok(())
    }

    /// Write the return slot.
    pub fn set_return(&mut self, value: impl IntoNative) -> Result<(), NativeError> {
        let index = self
            .return_index
            .ok_or_else(|| NativeError::other("function has no return value"))?;
        self.set_param(index, value)
    }

    /// The instance of a member call.
    pub fn this(&self) -> Option<ObjectHandle> {
        self.this
    }

    /// The instance of a member call, resolved in the heap.
    pub fn this_object(&self) -> Result<&NativeObject, NativeError> {
        let handle = self.this.ok_or_else(|| NativeError::other("call has no instance"))?;
        self.heap.get(handle).ok_or(NativeError::Access(crate::AccessError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        }))
    }

    pub fn heap(&self) -> &ObjectHeap {
        &*self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        &mut *self.heap
    }

    /// Consume the frame, returning the parameter slots.
    pub fn into_params(self) -> Vec<NativeValue> {
        self.params
    }
}

impl fmt::Debug for CallFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("param_count", &self.params.len())
            .field("return_index", &self.return_index)
            .field("this", &self.this)
            .finish()
    }
}
