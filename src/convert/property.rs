//! Property conversion layer.
//!
//! Converts the storage of one reflected property. Writes compare the new
//! value against the stored one and only apply (and notify) on change;
//! reads of compound properties produce wrappers through the factories.

use scriptbridge_core::{NativeAddr, PropertyDescriptor, PropertyKind};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::BridgeResult;
use crate::owner::{OwnerContext, resolve_change};
use crate::script::ScriptValue;
use crate::wrapper::{ConversionMode, NativeSource, WrapperPayload};

/// Descriptor of the elements of a container property.
pub(crate) fn inner_descriptor(property: &PropertyDescriptor, kind: &PropertyKind) -> PropertyDescriptor {
    PropertyDescriptor::new(property.name.clone(), kind.clone()).with_flags(property.flags)
}

impl Bridge {
    /// Run `apply` between pre and post change notifications for `owner`.
    ///
    /// Without an owner, observers or a resolvable chain, `apply` simply runs.
    pub(crate) fn apply_change<R>(
        &mut self,
        owner: &OwnerContext,
        apply: impl FnOnce(&mut Bridge) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        if !self.config.notifications || !owner.is_set() || self.observers.is_empty() {
            return apply(self);
        }
        let Some(event) = resolve_change(owner, &self.reflection, &self.heap) else {
            return apply(self);
        };
        for observer in &mut self.observers {
            observer.pre_change(&event);
        }
        let result = apply(self);
        for observer in &mut self.observers {
            observer.post_change(&event);
        }
        result
    }

    /// Write a script value into the storage of `property` at `addr`.
    ///
    /// The value is converted completely before anything is written. An
    /// identical value leaves storage untouched and fires no notification.
    /// Fixed-size arrays are copied in bulk without notification.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn nativize_property(
        &mut self,
        value: &ScriptValue,
        property: &PropertyDescriptor,
        addr: &NativeAddr,
        owner: &OwnerContext,
    ) -> BridgeResult<()> {
        let converted = if property.is_fixed_array() {
            self.nativize_fixed(value, property, ErrorMode::Set)
        } else {
            self.nativize(value, &property.kind, ErrorMode::Set)
        };
        let new_value = converted.map_err(|e| {
            self.raise_layer(
                ErrorMode::Set,
                "NativizeProperty",
                format!("Failed to convert property '{}' ({})", property.name, property.kind.kind_name()),
                e,
            )
        })?;

        if property.is_fixed_array() {
            addr.set(&mut self.heap, new_value)?;
            return Ok(());
        }
        if addr.read(&self.heap, |current| current.identical(&new_value))? {
            return Ok(());
        }
        self.apply_change(owner, |bridge| Ok(addr.set(&mut bridge.heap, new_value)?))
    }

    /// Read the storage of `property` at `addr` as a script value.
    ///
    /// Scalars and references are converted by value. Compound values are
    /// wrapped with `mode`; when `owner` is a wrapper the new wrapper records
    /// it (with the property name) as its owner context, which `Reference`
    /// mode requires.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn scriptize_property(
        &mut self,
        property: &PropertyDescriptor,
        addr: &NativeAddr,
        mode: ConversionMode,
        owner: Option<&ScriptValue>,
    ) -> BridgeResult<ScriptValue> {
        self.scriptize_property_inner(property, addr, mode, owner).map_err(|e| {
            self.raise_layer(
                ErrorMode::Set,
                "ScriptizeProperty",
                format!("Failed to convert property '{}' ({})", property.name, property.kind.kind_name()),
                e,
            )
        })
    }

    fn scriptize_property_inner(
        &mut self,
        property: &PropertyDescriptor,
        addr: &NativeAddr,
        mode: ConversionMode,
        owner: Option<&ScriptValue>,
    ) -> BridgeResult<ScriptValue> {
        let owner = match owner {
            Some(ScriptValue::Wrapper(w)) => OwnerContext::new(w, property.name.clone()),
            _ => OwnerContext::None,
        };
        let (payload, type_name) = if property.is_fixed_array() {
            (
                WrapperPayload::FixedArray {
                    element: property.element_descriptor(),
                    dim: property.array_dim as usize,
                },
                "FixedArray".to_string(),
            )
        } else {
            match &property.kind {
                PropertyKind::Struct { struct_type } => (
                    WrapperPayload::Struct {
                        struct_type: *struct_type,
                    },
                    self.reflection.type_name(*struct_type),
                ),
                PropertyKind::Array { inner } => (
                    WrapperPayload::Array {
                        element: inner_descriptor(property, inner),
                    },
                    "Array".to_string(),
                ),
                PropertyKind::Set { element } => (
                    WrapperPayload::Set {
                        element: inner_descriptor(property, element),
                    },
                    "Set".to_string(),
                ),
                PropertyKind::Map { key, value } => (
                    WrapperPayload::Map {
                        key: inner_descriptor(property, key),
                        value: inner_descriptor(property, value),
                    },
                    "Map".to_string(),
                ),
                PropertyKind::Delegate { signature } => (
                    WrapperPayload::Delegate {
                        signature: *signature,
                    },
                    "Delegate".to_string(),
                ),
                PropertyKind::MulticastDelegate { signature } => (
                    WrapperPayload::Multicast {
                        signature: *signature,
                    },
                    "MulticastDelegate".to_string(),
                ),
                kind => {
                    let value = addr.get(&self.heap)?;
                    return self.scriptize_owned(value, kind, ErrorMode::Set);
                }
            }
        };
        let wrapper = self.make_wrapper(payload, type_name, NativeSource::Addr(addr.clone()), mode, owner)?;
        Ok(ScriptValue::Wrapper(wrapper))
    }
}
