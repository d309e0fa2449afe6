//! Array and fixed-array wrappers, plus the generic item protocol.
//!
//! Elements are read through the container's address on every access.
//! Element reads of compound kinds alias the container's storage; every
//! mutation notifies through the container wrapper's own owner context.

use scriptbridge_core::layout::default_property_value;
use scriptbridge_core::{NativeAddr, NativeValue, PropertyDescriptor, PropertyKind};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

use super::{ConversionMode, Wrapper, WrapperKind, WrapperPayload};

/// An array wrapper resolved for one operation.
struct Sequence {
    wrapper: Wrapper,
    element: PropertyDescriptor,
    addr: NativeAddr,
}

impl Sequence {
    fn index_error(&self, index: i64, len: usize) -> BridgeError {
        BridgeError::Index {
            index,
            len,
            property: self.element.name.clone(),
            type_name: self.wrapper.type_name(),
        }
    }
}

/// Resolve a possibly negative index counting from the end, for `pop` and `insert`.
fn from_end(index: i64, len: usize) -> i64 {
    if index < 0 { index + len as i64 } else { index }
}

impl Bridge {
    /// Resolve `target` as an array wrapper for operation `op`.
    ///
    /// Fixed arrays are accepted only when `allow_fixed` is set.
    fn sequence(&mut self, target: &ScriptValue, op: &str, allow_fixed: bool) -> BridgeResult<Sequence> {
        let resolved = target.as_wrapper().and_then(|w| match &*w.payload_ref() {
            WrapperPayload::Array { element } => Some(element.clone()),
            WrapperPayload::FixedArray { element, .. } if allow_fixed => Some(element.clone()),
            _ => None,
        });
        let (Some(wrapper), Some(element)) = (target.as_wrapper().cloned(), resolved) else {
            return Err(self.report(BridgeError::NoAttribute {
                type_name: target.type_name(),
                name: op.to_string(),
            }));
        };
        let addr = wrapper.storage()?;
        Ok(Sequence { wrapper, element, addr })
    }

    fn read_items<R>(&self, seq: &Sequence, f: impl FnOnce(&[NativeValue]) -> R) -> BridgeResult<R> {
        let result = seq.addr.read(&self.heap, |value| value.elements().map(f))?;
        result.ok_or_else(|| BridgeError::internal(format!("'{}' storage is not a sequence", seq.element.name)))
    }

    /// Mutate the element vector of `seq` inside one change notification.
    fn mutate_items<R>(&mut self, seq: &Sequence, f: impl FnOnce(&mut Vec<NativeValue>) -> R) -> BridgeResult<R> {
        let addr = seq.addr.clone();
        let owner = seq.wrapper.owner();
        self.apply_change(&owner, move |bridge| {
            addr.write(&mut bridge.heap, |value| match value {
                NativeValue::Array(items) | NativeValue::Fixed(items) | NativeValue::Set(items) => Ok(f(items)),
                other => Err(BridgeError::internal(format!(
                    "expected sequence storage, found {}",
                    other.type_name()
                ))),
            })?
        })
    }

    fn convert_element(&mut self, seq: &Sequence, value: &ScriptValue, mode: ErrorMode) -> BridgeResult<NativeValue> {
        self.nativize(value, &seq.element.kind, mode)
    }

    /// Position of the first element identical to `value`, if it converts at all.
    fn position_of(&mut self, seq: &Sequence, value: &ScriptValue) -> BridgeResult<Option<usize>> {
        let Ok(needle) = self.convert_element(seq, value, ErrorMode::Silent) else {
            return Ok(None);
        };
        self.read_items(seq, |items| items.iter().position(|v| v.identical(&needle)))
    }

    fn checked_index(&mut self, seq: &Sequence, index: i64) -> BridgeResult<usize> {
        let len = self.read_items(seq, <[NativeValue]>::len)?;
        if index < 0 || index as usize >= len {
            return Err(self.report(seq.index_error(index, len)));
        }
        Ok(index as usize)
    }

    // ==========================================================================
    // Generic item protocol
    // ==========================================================================

    /// Number of elements of an array, fixed array, set or map wrapper.
    pub fn len(&mut self, target: &ScriptValue) -> BridgeResult<usize> {
        let kind = target.as_wrapper().map(Wrapper::kind);
        match kind {
            Some(WrapperKind::Set) => self.set_len(target),
            Some(WrapperKind::Map) => self.map_len(target),
            _ => {
                let seq = self.sequence(target, "__len__", true)?;
                self.read_items(&seq, <[NativeValue]>::len)
            }
        }
    }

    /// `target[key]`: an index into an array or a key into a map.
    pub fn get_item(&mut self, target: &ScriptValue, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        if target.as_wrapper().map(Wrapper::kind) == Some(WrapperKind::Map) {
            return self.map_get(target, key);
        }
        let seq = self.sequence(target, "__getitem__", true)?;
        let index = self.index_arg(&seq, key)?;
        self.element_at(&seq, index)
    }

    /// `target[key] = value`.
    pub fn set_item(&mut self, target: &ScriptValue, key: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        if target.as_wrapper().map(Wrapper::kind) == Some(WrapperKind::Map) {
            return self.map_set(target, key, value);
        }
        let seq = self.sequence(target, "__setitem__", true)?;
        let index = self.index_arg(&seq, key)?;
        let index = self.checked_index(&seq, index)?;
        let owner = seq.wrapper.owner();
        self.nativize_property(value, &seq.element, &seq.addr.element(index), &owner)
    }

    fn index_arg(&mut self, seq: &Sequence, key: &ScriptValue) -> BridgeResult<i64> {
        match key {
            ScriptValue::Int(i) => Ok(*i),
            other => Err(self.report(BridgeError::Call {
                function: format!("{}.__getitem__", seq.wrapper.type_name()),
                detail: format!("indices must be integers, not '{}'", other.type_name()),
            })),
        }
    }

    fn element_at(&mut self, seq: &Sequence, index: i64) -> BridgeResult<ScriptValue> {
        let index = self.checked_index(seq, index)?;
        let container = ScriptValue::Wrapper(seq.wrapper.clone());
        self.scriptize_property(&seq.element, &seq.addr.element(index), ConversionMode::Reference, Some(&container))
    }

    // ==========================================================================
    // Array operations
    // ==========================================================================

    pub fn append(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        let seq = self.sequence(target, "append", false)?;
        let native = self.convert_element(&seq, value, ErrorMode::Set)?;
        self.mutate_items(&seq, |items| items.push(native))
    }

    /// Insert before `index`; negative indices count from the end and
    /// out-of-range ones clamp to the ends.
    pub fn insert(&mut self, target: &ScriptValue, index: i64, value: &ScriptValue) -> BridgeResult<()> {
        let seq = self.sequence(target, "insert", false)?;
        let native = self.convert_element(&seq, value, ErrorMode::Set)?;
        self.mutate_items(&seq, |items| {
            let at = from_end(index, items.len()).clamp(0, items.len() as i64) as usize;
            items.insert(at, native);
        })
    }

    /// Remove and return the element at `index` (the last one by default).
    pub fn pop(&mut self, target: &ScriptValue, index: Option<i64>) -> BridgeResult<ScriptValue> {
        let seq = self.sequence(target, "pop", false)?;
        let len = self.read_items(&seq, <[NativeValue]>::len)?;
        let requested = index.unwrap_or(-1);
        let at = from_end(requested, len);
        if at < 0 || at as usize >= len {
            return Err(self.report(seq.index_error(requested, len)));
        }
        let removed = self.mutate_items(&seq, |items| items.remove(at as usize))?;
        self.scriptize_owned(removed, &seq.element.kind, ErrorMode::Set)
    }

    /// Remove the first element equal to `value`.
    pub fn remove(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        let seq = self.sequence(target, "remove", false)?;
        let Some(at) = self.position_of(&seq, value)? else {
            return Err(self.report(BridgeError::precondition(format!(
                "value not found in property '{}'",
                seq.element.name
            ))));
        };
        self.mutate_items(&seq, |items| {
            items.remove(at);
        })
    }

    pub fn index_of(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<usize> {
        let seq = self.sequence(target, "index", false)?;
        match self.position_of(&seq, value)? {
            Some(at) => Ok(at),
            None => Err(self.report(BridgeError::precondition(format!(
                "value not found in property '{}'",
                seq.element.name
            )))),
        }
    }

    pub fn count(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<usize> {
        let seq = self.sequence(target, "count", true)?;
        let Ok(needle) = self.convert_element(&seq, value, ErrorMode::Silent) else {
            return Ok(0);
        };
        self.read_items(&seq, |items| items.iter().filter(|v| v.identical(&needle)).count())
    }

    pub fn contains(&mut self, target: &ScriptValue, value: &ScriptValue) -> BridgeResult<bool> {
        if target.as_wrapper().map(Wrapper::kind) == Some(WrapperKind::Set) {
            return self.set_contains(target, value);
        }
        if target.as_wrapper().map(Wrapper::kind) == Some(WrapperKind::Map) {
            return self.map_contains_key(target, value);
        }
        let seq = self.sequence(target, "__contains__", true)?;
        Ok(self.position_of(&seq, value)?.is_some())
    }

    pub fn reverse(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let seq = self.sequence(target, "reverse", false)?;
        self.mutate_items(&seq, |items| items.reverse())
    }

    pub fn clear(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let kind = target.as_wrapper().map(Wrapper::kind);
        match kind {
            Some(WrapperKind::Set) => self.set_clear(target),
            Some(WrapperKind::Map) => self.map_clear(target),
            _ => {
                let seq = self.sequence(target, "clear", false)?;
                self.mutate_items(&seq, Vec::clear)
            }
        }
    }

    /// Grow with default elements or truncate to `len`.
    pub fn resize(&mut self, target: &ScriptValue, len: usize) -> BridgeResult<()> {
        let seq = self.sequence(target, "resize", false)?;
        let filler = default_property_value(&seq.element, &self.reflection);
        self.mutate_items(&seq, |items| items.resize(len, filler))
    }

    /// Append every element of a script sequence. Nothing is appended if
    /// any element fails to convert.
    pub fn extend(&mut self, target: &ScriptValue, values: &ScriptValue) -> BridgeResult<()> {
        let seq = self.sequence(target, "extend", false)?;
        let kind = PropertyKind::array(seq.element.kind.clone());
        let NativeValue::Array(converted) = self.nativize(values, &kind, ErrorMode::Set)? else {
            return Err(BridgeError::internal("array conversion produced a non-array value"));
        };
        self.mutate_items(&seq, |items| items.extend(converted))
    }

    /// Script list holding a copy of every element.
    pub fn to_list(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        if target.as_wrapper().map(Wrapper::kind) == Some(WrapperKind::Set) {
            return self.set_to_list(target);
        }
        let seq = self.sequence(target, "to_list", true)?;
        let items = self.read_items(&seq, <[NativeValue]>::to_vec)?;
        let mut list = Vec::with_capacity(items.len());
        for item in items {
            list.push(self.scriptize_owned(item, &seq.element.kind, ErrorMode::Set)?);
        }
        Ok(ScriptValue::List(list))
    }
}
