//! Native objects and native function execution.
//!
//! ## Key Types
//!
//! - [`ObjectHeap`]: generational arena of native objects
//! - [`NativeFn`]: type-erased native function body
//! - [`CallFrame`]: parameter block handed to a native body

mod call_frame;
mod native_fn;
mod object_heap;

pub use call_frame::CallFrame;
pub use native_fn::{NativeCallable, NativeFn};
pub use object_heap::{NativeObject, ObjectHandle, ObjectHeap};
