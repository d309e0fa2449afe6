//! Set wrappers.
//!
//! Native sets keep unique elements in insertion order. Membership uses
//! native identity after converting the candidate to the element kind; a
//! candidate that does not convert is simply not a member.

use scriptbridge_core::{NativeAddr, NativeValue, PropertyDescriptor};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

use super::{Wrapper, WrapperPayload};

impl Bridge {
    fn set_target(&mut self, target: &ScriptValue, op: &str) -> BridgeResult<(Wrapper, PropertyDescriptor, NativeAddr)> {
        let element = target.as_wrapper().and_then(|w| match &*w.payload_ref() {
            WrapperPayload::Set { element } => Some(element.clone()),
            _ => None,
        });
        let (Some(wrapper), Some(element)) = (target.as_wrapper().cloned(), element) else {
            return Err(self.report(BridgeError::NoAttribute {
                type_name: target.type_name(),
                name: op.to_string(),
            }));
        };
        let addr = wrapper.storage()?;
        Ok((wrapper, element, addr))
    }

    fn set_elements(&self, addr: &NativeAddr) -> BridgeResult<Vec<NativeValue>> {
        match addr.get(&self.heap)? {
            NativeValue::Set(items) => Ok(items),
            other => Err(BridgeError::internal(format!("expected set storage, found {}", other.type_name()))),
        }
    }

    fn set_write<R>(
        &mut self,
        wrapper: &Wrapper,
        addr: &NativeAddr,
        f: impl FnOnce(&mut Vec<NativeValue>) -> R,
    ) -> BridgeResult<R> {
        let addr = addr.clone();
        self.apply_change(&wrapper.owner(), move |bridge| {
            addr.write(&mut bridge.heap, |value| match value {
                NativeValue::Set(items) => Ok(f(items)),
                other => Err(BridgeError::internal(format!("expected set storage, found {}", other.type_name()))),
            })?
        })
    }

    fn set_position(&mut self, element: &PropertyDescriptor, addr: &NativeAddr, value: &ScriptValue) -> BridgeResult<Option<usize>> {
        let Ok(needle) = self.nativize(value, &element.kind, ErrorMode::Silent) else {
            return Ok(None);
        };
        Ok(self.set_elements(addr)?.iter().position(|v| v.identical(&needle)))
    }

    pub fn set_len(&mut self, target: &ScriptValue) -> BridgeResult<usize> {
        let (_, _, addr) = self.set_target(target, "__len__")?;
        Ok(self.set_elements(&addr)?.len())
    }

    pub fn set_contains(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<bool> {
        let (_, element, addr) = self.set_target(target, "__contains__")?;
        Ok(self.set_position(&element, &addr, value)?.is_some())
    }

    /// Add an element; adding a member again changes nothing.
    pub fn set_add(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        let (wrapper, element, addr) = self.set_target(target, "add")?;
        let native = self.nativize(value, &element.kind, ErrorMode::Set)?;
        if self.set_elements(&addr)?.iter().any(|v| v.identical(&native)) {
            return Ok(());
        }
        self.set_write(&wrapper, &addr, |items| items.push(native))
    }

    /// Remove an element if present. Returns whether it was a member.
    pub fn set_discard(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<bool> {
        let (wrapper, element, addr) = self.set_target(target, "discard")?;
        match self.set_position(&element, &addr, value)? {
            Some(at) => self.set_write(&wrapper, &addr, |items| {
                items.remove(at);
                true
            }),
            None => Ok(false),
        }
    }

    /// Remove a member; a missing element is a key error.
    pub fn set_remove(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        if self.set_discard(target, value)? {
            return Ok(());
        }
        let (_, element, _) = self.set_target(target, "remove")?;
        Err(self.report(BridgeError::Key {
            key: value.to_string(),
            property: element.name,
        }))
    }

    /// Remove and return an arbitrary member (the oldest).
    pub fn set_pop(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        let (wrapper, element, addr) = self.set_target(target, "pop")?;
        if self.set_elements(&addr)?.is_empty() {
            return Err(self.report(BridgeError::Key {
                key: "pop from an empty set".to_string(),
                property: element.name,
            }));
        }
        let removed = self.set_write(&wrapper, &addr, |items| items.remove(0))?;
        self.scriptize_owned(removed, &element.kind, ErrorMode::Set)
    }

    pub fn set_clear(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let (wrapper, _, addr) = self.set_target(target, "clear")?;
        if self.set_elements(&addr)?.is_empty() {
            return Ok(());
        }
        self.set_write(&wrapper, &addr, Vec::clear)
    }

    /// Members as a script list, in insertion order.
    pub fn set_to_list(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        let (_, element, addr) = self.set_target(target, "to_list")?;
        let items = self.set_elements(&addr)?;
        let mut list = Vec::with_capacity(items.len());
        for item in items {
            list.push(self.scriptize_owned(item, &element.kind, ErrorMode::Set)?);
        }
        Ok(ScriptValue::List(list))
    }
}
