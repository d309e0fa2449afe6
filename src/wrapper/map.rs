//! Map wrappers.
//!
//! Keys are matched by native identity after conversion to the key kind.
//! Values read through `map_get` alias the map's storage, so struct and
//! container values can be modified in place.

use scriptbridge_core::{NativeAddr, NativeValue, PathSegment, PropertyDescriptor};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

use super::{ConversionMode, Wrapper, WrapperPayload};

/// A map wrapper resolved for one operation.
struct MapTarget {
    wrapper: Wrapper,
    key: PropertyDescriptor,
    value: PropertyDescriptor,
    addr: NativeAddr,
}

impl Bridge {
    fn map_target(&mut self, target: &ScriptValue, op: &str) -> BridgeResult<MapTarget> {
        let descriptors = target.as_wrapper().and_then(|w| match &*w.payload_ref() {
            WrapperPayload::Map { key, value } => Some((key.clone(), value.clone())),
            _ => None,
        });
        let (Some(wrapper), Some((key, value))) = (target.as_wrapper().cloned(), descriptors) else {
            return Err(self.report(BridgeError::NoAttribute {
                type_name: target.type_name(),
                name: op.to_string(),
            }));
        };
        let addr = wrapper.storage()?;
        Ok(MapTarget {
            wrapper,
            key,
            value,
            addr,
        })
    }

    fn map_entries(&self, map: &MapTarget) -> BridgeResult<Vec<(NativeValue, NativeValue)>> {
        match map.addr.get(&self.heap)? {
            NativeValue::Map(entries) => Ok(entries),
            other => Err(BridgeError::internal(format!("expected map storage, found {}", other.type_name()))),
        }
    }

    fn map_write<R>(&mut self, map: &MapTarget, f: impl FnOnce(&mut Vec<(NativeValue, NativeValue)>) -> R) -> BridgeResult<R> {
        let addr = map.addr.clone();
        self.apply_change(&map.wrapper.owner(), move |bridge| {
            addr.write(&mut bridge.heap, |value| match value {
                NativeValue::Map(entries) => Ok(f(entries)),
                other => Err(BridgeError::internal(format!("expected map storage, found {}", other.type_name()))),
            })?
        })
    }

    /// Index of the entry whose key is identical to `key`.
    fn map_position(&mut self, map: &MapTarget, key: &ScriptValue) -> BridgeResult<Option<usize>> {
        let Ok(needle) = self.nativize(key, &map.key.kind, ErrorMode::Silent) else {
            return Ok(None);
        };
        Ok(self.map_entries(map)?.iter().position(|(k, _)| k.identical(&needle)))
    }

    fn missing_key(&mut self, map: &MapTarget, key: &ScriptValue) -> BridgeError {
        self.report(BridgeError::Key {
            key: key.to_string(),
            property: map.key.name.clone(),
        })
    }

    fn map_value_at(&mut self, map: &MapTarget, index: usize) -> BridgeResult<ScriptValue> {
        let container = ScriptValue::Wrapper(map.wrapper.clone());
        let addr = map.addr.join(PathSegment::MapValue(index as u32));
        self.scriptize_property(&map.value, &addr, ConversionMode::Reference, Some(&container))
    }

    pub fn map_len(&mut self, target: &ScriptValue) -> BridgeResult<usize> {
        let map = self.map_target(target, "__len__")?;
        Ok(self.map_entries(&map)?.len())
    }

    /// The value stored under `key`; a missing key is a key error.
    pub fn map_get(&mut self, target: &ScriptValue, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "__getitem__")?;
        match self.map_position(&map, key)? {
            Some(index) => self.map_value_at(&map, index),
            None => Err(self.missing_key(&map, key)),
        }
    }

    /// The value stored under `key`, or `default` when there is none.
    pub fn map_get_or(&mut self, target: &ScriptValue, key: &ScriptValue, default: ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "get")?;
        match self.map_position(&map, key)? {
            Some(index) => self.map_value_at(&map, index),
            None => Ok(default),
        }
    }

    /// Insert or replace the value under `key`. Storing an identical value
    /// changes nothing.
    pub fn map_set(&mut self, target: &ScriptValue, key: &ScriptValue, value: &ScriptValue) -> BridgeResult<()> {
        let map = self.map_target(target, "__setitem__")?;
        let native_key = self.nativize(key, &map.key.kind, ErrorMode::Set)?;
        let native_value = self.nativize(value, &map.value.kind, ErrorMode::Set)?;
        let entries = self.map_entries(&map)?;
        let position = entries.iter().position(|(k, _)| k.identical(&native_key));
        if let Some(index) = position {
            if entries[index].1.identical(&native_value) {
                return Ok(());
            }
        }
        self.map_write(&map, |entries| match position {
            Some(index) => entries[index].1 = native_value,
            None => entries.push((native_key, native_value)),
        })
    }

    pub fn map_contains_key(&mut self, target: &ScriptValue, key: &ScriptValue) -> BridgeResult<bool> {
        let map = self.map_target(target, "__contains__")?;
        Ok(self.map_position(&map, key)?.is_some())
    }

    /// Remove the entry under `key` and return its value.
    pub fn map_remove(&mut self, target: &ScriptValue, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "pop")?;
        let Some(index) = self.map_position(&map, key)? else {
            return Err(self.missing_key(&map, key));
        };
        let (_, removed) = self.map_write(&map, |entries| entries.remove(index))?;
        self.scriptize_owned(removed, &map.value.kind, ErrorMode::Set)
    }

    pub fn map_clear(&mut self, target: &ScriptValue) -> BridgeResult<()> {
        let map = self.map_target(target, "clear")?;
        if self.map_entries(&map)?.is_empty() {
            return Ok(());
        }
        self.map_write(&map, Vec::clear)
    }

    /// Copies of every key, in insertion order.
    pub fn map_keys(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "keys")?;
        let mut keys = Vec::new();
        for (key, _) in self.map_entries(&map)? {
            keys.push(self.scriptize_owned(key, &map.key.kind, ErrorMode::Set)?);
        }
        Ok(ScriptValue::List(keys))
    }

    /// Copies of every value, in insertion order.
    pub fn map_values(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "values")?;
        let mut values = Vec::new();
        for (_, value) in self.map_entries(&map)? {
            values.push(self.scriptize_owned(value, &map.value.kind, ErrorMode::Set)?);
        }
        Ok(ScriptValue::List(values))
    }

    /// `(key, value)` tuples, in insertion order.
    pub fn map_items(&mut self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = self.map_target(target, "items")?;
        let mut items = Vec::new();
        for (key, value) in self.map_entries(&map)? {
            let key = self.scriptize_owned(key, &map.key.kind, ErrorMode::Set)?;
            let value = self.scriptize_owned(value, &map.value.kind, ErrorMode::Set)?;
            items.push(ScriptValue::Tuple(vec![key, value]));
        }
        Ok(ScriptValue::List(items))
    }
}
