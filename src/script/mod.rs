//! The script side of the bridge: values, errors and runtime state.

mod error;
mod runtime;
mod value;

pub use error::{ScriptError, ScriptErrorKind};
pub use runtime::{ScriptModule, ScriptRuntime};
pub use value::{ScriptCallable, ScriptValue};
