//! Delegate and multicast delegate wrappers.
//!
//! A delegate binds an object and the name of one of its functions. The
//! function must match the delegate's signature parameter for parameter
//! (kind and direction). Execution goes through the regular call path, so
//! inputs pack and results unpack exactly as for a method call.

use scriptbridge_core::{DelegateValue, FunctionEntry, NativeAddr, NativeValue, ObjectHandle, TypeHash};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

use super::{Wrapper, WrapperPayload};

/// Check if `function` can be bound to a delegate of `signature`.
fn matches_signature(signature: &FunctionEntry, function: &FunctionEntry) -> bool {
    signature.params.len() == function.params.len()
        && signature.params.iter().zip(&function.params).all(|(a, b)| {
            a.kind == b.kind && a.is_return() == b.is_return() && a.flags.is_output_param() == b.flags.is_output_param()
        })
}

impl Bridge {
    fn delegate_target(&mut self, target: &ScriptValue, op: &str, multicast: bool) -> BridgeResult<(Wrapper, TypeHash, NativeAddr)> {
        let signature = target.as_wrapper().and_then(|w| match *w.payload_ref() {
            WrapperPayload::Delegate { signature } if !multicast => Some(signature),
            WrapperPayload::Multicast { signature } if multicast => Some(signature),
            _ => None,
        });
        let (Some(wrapper), Some(signature)) = (target.as_wrapper().cloned(), signature) else {
            return Err(self.report(BridgeError::NoAttribute {
                type_name: target.type_name(),
                name: op.to_string(),
            }));
        };
        let addr = wrapper.storage()?;
        Ok((wrapper, signature, addr))
    }

    /// Resolve `object.function` into a binding compatible with `signature`.
    ///
    /// `function` may be a native name or a script method name.
    fn resolve_binding(&mut self, signature: TypeHash, object: &ScriptValue, function: &str) -> BridgeResult<DelegateValue> {
        let Some(handle) = object.as_wrapper().and_then(Wrapper::object_handle) else {
            return Err(self.report(BridgeError::Call {
                function: "bind".to_string(),
                detail: format!("expected an object, got '{}'", object.type_name()),
            }));
        };
        let class = self.heap.get(handle).map(|o| o.class).ok_or(scriptbridge_core::AccessError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })?;
        let native_name = match self.reflection.find_function(class, function) {
            Some(_) => function.to_string(),
            None => {
                let id = self.wrapper_type(class);
                let method = id.and_then(|id| self.types.find_method(id, function));
                match method.map(|m| m.native_name.clone()) {
                    Some(native_name) => native_name,
                    None => {
                        return Err(self.report(BridgeError::NoAttribute {
                            type_name: self.reflection.type_name(class),
                            name: function.to_string(),
                        }));
                    }
                }
            }
        };
        let (Some(sig), Some(entry)) = (
            self.reflection.signature(signature),
            self.reflection.find_function(class, &native_name),
        ) else {
            return Err(BridgeError::internal(format!("unknown delegate signature {signature}")));
        };
        if !matches_signature(sig, entry) {
            let detail = format!("function '{native_name}' does not match signature '{}'", sig.name);
            return Err(self.report(BridgeError::Call {
                function: "bind".to_string(),
                detail,
            }));
        }
        Ok(DelegateValue::bound(handle, native_name))
    }

    /// Overwrite delegate storage inside one change notification, unless identical.
    fn write_delegate(&mut self, wrapper: &Wrapper, addr: &NativeAddr, value: NativeValue) -> BridgeResult<()> {
        if addr.read(&self.heap, |current| current.identical(&value))? {
            return Ok(());
        }
        let addr = addr.clone();
        self.apply_change(&wrapper.owner(), move |bridge| Ok(addr.set(&mut bridge.heap, value)?))
    }

    /// Call a bound delegate value. Returns `None` when the binding is
    /// empty or its object is gone.
    fn execute_binding(&mut self, binding: &DelegateValue, args: &[ScriptValue]) -> BridgeResult<Option<ScriptValue>> {
        let (Some(handle), Some(function)) = (binding.object, &binding.function) else {
            return Ok(None);
        };
        let Some(class) = self.heap.get(handle).map(|o| o.class) else {
            return Ok(None);
        };
        let Some(entry) = self.reflection.find_function(class, function.as_str()).cloned() else {
            return Err(BridgeError::internal(format!(
                "bound function '{function}' not found on '{}'",
                self.reflection.type_name(class)
            )));
        };
        let this = self.wrap_object(handle)?;
        self.call_function(Some(&this), &entry, args).map(Some)
    }

    fn read_binding(&self, addr: &NativeAddr) -> BridgeResult<DelegateValue> {
        match addr.get(&self.heap)? {
            NativeValue::Delegate(binding) => Ok(binding),
            other => Err(BridgeError::internal(format!("expected delegate storage, found {}", other.type_name()))),
        }
    }

    fn read_bindings(&self, addr: &NativeAddr) -> BridgeResult<Vec<DelegateValue>> {
        match addr.get(&self.heap)? {
            NativeValue::Multicast(bindings) => Ok(bindings),
            other => Err(BridgeError::internal(format!(
                "expected multicast delegate storage, found {}",
                other.type_name()
            ))),
        }
    }

    fn binding_is_live(&self, binding: &DelegateValue) -> bool {
        binding.is_bound() && binding.object.is_some_and(|h: ObjectHandle| self.heap.is_alive(h))
    }

    // ==========================================================================
    // Delegates
    // ==========================================================================

    /// Bind a delegate to `object.function`.
    pub fn delegate_bind(&mut self, target: &ScriptValue, object: &ScriptValue, function: &str) -> BridgeResult<()> {
        let (wrapper, signature, addr) = self.delegate_target(target, "bind", false)?;
        let binding = self.resolve_binding(signature, object, function)?;
        self.write_delegate(&wrapper, &addr, NativeValue::Delegate(binding))
    }

    pub fn delegate_unbind(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let (wrapper, _, addr) = self.delegate_target(target, "unbind", false)?;
        self.write_delegate(&wrapper, &addr, NativeValue::Delegate(DelegateValue::default()))
    }

    /// Check if the delegate is bound to a live object.
    pub fn delegate_is_bound(&mut self, target: &ScriptValue) -> BridgeResult<bool> {
        let (_, _, addr) = self.delegate_target(target, "is_bound", false)?;
        let binding = self.read_binding(&addr)?;
        Ok(self.binding_is_live(&binding))
    }

    /// Call the bound function; an unbound delegate is an error.
    pub fn delegate_execute(&mut self, target: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let (_, _, addr) = self.delegate_target(target, "execute", false)?;
        let binding = self.read_binding(&addr)?;
        match self.execute_binding(&binding, args)? {
            Some(result) => Ok(result),
            None => Err(self.report(BridgeError::precondition("delegate is not bound"))),
        }
    }

    /// Call the bound function if there is one.
    pub fn delegate_execute_if_bound(&mut self, target: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let (_, _, addr) = self.delegate_target(target, "execute_if_bound", false)?;
        let binding = self.read_binding(&addr)?;
        Ok(self.execute_binding(&binding, args)?.unwrap_or_default())
    }

    // ==========================================================================
    // Multicast delegates
    // ==========================================================================

    /// Add `object.function` to the invocation list; adding it twice changes nothing.
    pub fn multicast_add(&mut self, target: &ScriptValue, object: &ScriptValue, function: &str) -> BridgeResult<()> {
        let (wrapper, signature, addr) = self.delegate_target(target, "add", true)?;
        let binding = self.resolve_binding(signature, object, function)?;
        let mut bindings = self.read_bindings(&addr)?;
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
        self.write_delegate(&wrapper, &addr, NativeValue::Multicast(bindings))
    }

    /// Remove `object.function` from the invocation list if present.
    pub fn multicast_remove(&mut self, target: &ScriptValue, object: &ScriptValue, function: &str) -> BridgeResult<()> {
        let (wrapper, signature, addr) = self.delegate_target(target, "remove", true)?;
        let binding = self.resolve_binding(signature, object, function)?;
        let mut bindings = self.read_bindings(&addr)?;
        bindings.retain(|b| *b != binding);
        self.write_delegate(&wrapper, &addr, NativeValue::Multicast(bindings))
    }

    pub fn multicast_contains(&mut self, target: &ScriptValue, object: &ScriptValue, function: &str) -> BridgeResult<bool> {
        let (_, signature, addr) = self.delegate_target(target, "contains", true)?;
        let binding = self.resolve_binding(signature, object, function)?;
        Ok(self.read_bindings(&addr)?.contains(&binding))
    }

    pub fn multicast_clear(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let (wrapper, _, addr) = self.delegate_target(target, "clear", true)?;
        self.write_delegate(&wrapper, &addr, NativeValue::Multicast(Vec::new()))
    }

    /// Number of bindings whose object is still alive.
    pub fn multicast_len(&mut self, target: &ScriptValue) -> BridgeResult<usize> {
        let (_, _, addr) = self.delegate_target(target, "__len__", true)?;
        let bindings = self.read_bindings(&addr)?;
        Ok(bindings.iter().filter(|b| self.binding_is_live(b)).count())
    }

    /// Call every live binding in order. Results are discarded; the first
    /// failure stops the broadcast.
    pub fn multicast_broadcast(&mut self, target: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<()> {
        let (_, _, addr) = self.delegate_target(target, "broadcast", true)?;
        for binding in self.read_bindings(&addr)? {
            self.execute_binding(&binding, args)?;
        }
        Ok(())
    }
}
