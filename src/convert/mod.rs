//! Value conversion engine.
//!
//! [`Bridge::nativize`] converts a script value into a native value of a
//! given [`PropertyKind`]; [`Bridge::scriptize`] goes the other way.
//! Dispatch is an ordered chain over the kind tag: scalars first, then enums
//! through their underlying numeric kind, then references, structs,
//! delegates and containers.
//!
//! Compound values produced by `scriptize` are `Copy` wrappers; the property
//! layer ([`property`]) produces aliasing wrappers for values that live in
//! native storage.

pub mod property;
pub mod scalar;

use scriptbridge_core::{
    DelegateValue, NativeValue, PropertyDescriptor, PropertyKind, StructValue, TypeHash,
};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;
use crate::wrapper::{ConversionMode, NativeSource, WrapperPayload};

pub use scalar::{FromScript, IntoScript};

/// Whether a failed conversion records an error in the script runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// Record the failure in the runtime's error slot.
    Set,
    /// Fail without touching the error slot (speculative conversion).
    Silent,
}

impl Bridge {
    /// Record a failure under `context` and wrap the error with it.
    pub(crate) fn raise(&mut self, mode: ErrorMode, context: &str, err: BridgeError) -> BridgeError {
        if mode == ErrorMode::Set {
            self.runtime
                .set_error(err.script_kind(), format!("{context}: {err}"));
        }
        err.context(context)
    }

    /// Record an outer layer of context for an already reported failure.
    pub(crate) fn raise_layer(
        &mut self,
        mode: ErrorMode,
        context: &str,
        message: String,
        err: BridgeError,
    ) -> BridgeError {
        let layer = format!("{context}: {message}");
        if mode == ErrorMode::Set {
            self.runtime.set_error(err.script_kind(), layer.clone());
        }
        err.context(layer)
    }

    fn mismatch(&mut self, mode: ErrorMode, value: &ScriptValue, target: impl Into<String>) -> BridgeError {
        let err = scriptbridge_core::ConversionError::nativize(value.type_name(), target);
        self.raise(mode, "Nativize", err.into())
    }

    // ==========================================================================
    // Nativize
    // ==========================================================================

    /// Convert a script value into a native value of `kind`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn nativize(&mut self, value: &ScriptValue, kind: &PropertyKind, mode: ErrorMode) -> BridgeResult<NativeValue> {
        match kind {
            PropertyKind::Bool
            | PropertyKind::Numeric(_)
            | PropertyKind::Str
            | PropertyKind::Name
            | PropertyKind::Text => {
                scalar::nativize_scalar(value, kind).map_err(|e| self.raise(mode, "Nativize", e.into()))
            }
            PropertyKind::Enum { enum_type, underlying } => {
                if let ScriptValue::Str(label) = value {
                    let found = self.reflection.enum_entry(*enum_type).and_then(|e| e.value_of(label));
                    return match found {
                        Some(v) => Ok(NativeValue::from_i64(*underlying, v)),
                        None => {
                            let name = self.reflection.type_name(*enum_type);
                            Err(self.mismatch(mode, value, name))
                        }
                    };
                }
                match scalar::nativize_numeric(value, *underlying) {
                    Some(v) => Ok(v),
                    None => {
                        let name = self.reflection.type_name(*enum_type);
                        Err(self.mismatch(mode, value, name))
                    }
                }
            }
            PropertyKind::Object { class } => self.nativize_object(value, *class, mode),
            PropertyKind::Interface { interface } => self.nativize_object(value, *interface, mode),
            PropertyKind::Class { meta_class } => self.nativize_class(value, *meta_class, mode),
            PropertyKind::Struct { struct_type } => self.nativize_struct(value, *struct_type, mode),
            PropertyKind::Delegate { signature } => match value {
                ScriptValue::None => Ok(NativeValue::Delegate(DelegateValue::default())),
                ScriptValue::Wrapper(w) if w.payload() == (WrapperPayload::Delegate { signature: *signature }) => {
                    let addr = w.storage()?;
                    Ok(addr.get(&self.heap)?)
                }
                _ => {
                    let name = self.reflection.type_name(*signature);
                    Err(self.mismatch(mode, value, name))
                }
            },
            PropertyKind::MulticastDelegate { signature } => match value {
                ScriptValue::None => Ok(NativeValue::Multicast(Vec::new())),
                ScriptValue::Wrapper(w) if w.payload() == (WrapperPayload::Multicast { signature: *signature }) => {
                    let addr = w.storage()?;
                    Ok(addr.get(&self.heap)?)
                }
                ScriptValue::List(items) | ScriptValue::Tuple(items) => {
                    let single = PropertyKind::Delegate { signature: *signature };
                    let mut bindings = Vec::with_capacity(items.len());
                    for item in items {
                        if let NativeValue::Delegate(d) = self.nativize(item, &single, mode)? {
                            bindings.push(d);
                        }
                    }
                    Ok(NativeValue::Multicast(bindings))
                }
                _ => {
                    let name = self.reflection.type_name(*signature);
                    Err(self.mismatch(mode, value, name))
                }
            },
            PropertyKind::Array { inner } => {
                let items = self.nativize_elements(value, kind, inner, mode)?;
                Ok(NativeValue::Array(items))
            }
            PropertyKind::Set { element } => {
                check_hashable(kind, element).map_err(|e| self.raise(mode, "Nativize", e))?;
                let mut unique: Vec<NativeValue> = Vec::new();
                for item in self.nativize_elements(value, kind, element, mode)? {
                    if !unique.iter().any(|u| u.identical(&item)) {
                        unique.push(item);
                    }
                }
                Ok(NativeValue::Set(unique))
            }
            PropertyKind::Map { key, value: value_kind } => {
                check_hashable(kind, key).map_err(|e| self.raise(mode, "Nativize", e))?;
                self.nativize_map(value, kind, key, value_kind, mode)
            }
        }
    }

    fn nativize_object(&mut self, value: &ScriptValue, class: TypeHash, mode: ErrorMode) -> BridgeResult<NativeValue> {
        match value {
            ScriptValue::None => Ok(NativeValue::Object(None)),
            ScriptValue::Wrapper(w) => {
                let actual = w.object_handle().and_then(|h| self.heap.get(h).map(|o| (h, o.class)));
                match actual {
                    Some((handle, actual)) if self.reflection.is_a(actual, class) => {
                        Ok(NativeValue::Object(Some(handle)))
                    }
                    _ => {
                        let name = self.reflection.type_name(class);
                        Err(self.mismatch(mode, value, name))
                    }
                }
            }
            _ => {
                let name = self.reflection.type_name(class);
                Err(self.mismatch(mode, value, name))
            }
        }
    }

    fn nativize_class(&mut self, value: &ScriptValue, meta_class: TypeHash, mode: ErrorMode) -> BridgeResult<NativeValue> {
        match value {
            ScriptValue::None => Ok(NativeValue::Class(None)),
            ScriptValue::Type(id) => {
                let reflected = self.types.get(*id).map(|t| t.reflected);
                match reflected {
                    Some(hash) if self.reflection.is_a(hash, meta_class) => Ok(NativeValue::Class(Some(hash))),
                    _ => {
                        let name = format!("class<{}>", self.reflection.type_name(meta_class));
                        Err(self.mismatch(mode, value, name))
                    }
                }
            }
            _ => {
                let name = format!("class<{}>", self.reflection.type_name(meta_class));
                Err(self.mismatch(mode, value, name))
            }
        }
    }

    /// Struct values: a wrapper of exactly `struct_type`, a positional
    /// sequence or a dict keyed by field name. The value is built completely
    /// before it is returned, so a failing field leaves no partial result.
    fn nativize_struct(&mut self, value: &ScriptValue, struct_type: TypeHash, mode: ErrorMode) -> BridgeResult<NativeValue> {
        match value {
            ScriptValue::Wrapper(w) if w.struct_type() == Some(struct_type) => {
                let addr = w.storage()?;
                Ok(addr.get(&self.heap)?)
            }
            ScriptValue::Tuple(items) | ScriptValue::List(items) => {
                let fields = self.reflection.layout(struct_type);
                if items.len() > fields.len() {
                    let name = self.reflection.type_name(struct_type);
                    return Err(self.mismatch(mode, value, name));
                }
                let mut result = self.default_struct_value(struct_type);
                for (index, item) in items.iter().enumerate() {
                    result.fields[index] = self.nativize_field(item, &fields[index], mode)?;
                }
                Ok(NativeValue::Struct(result))
            }
            ScriptValue::Dict(entries) => {
                let fields = self.reflection.layout(struct_type);
                let mut result = self.default_struct_value(struct_type);
                for (key, item) in entries {
                    let index = key.as_str().and_then(|k| {
                        fields
                            .iter()
                            .position(|f| f.name.eq_ignore_ascii_case(k) || crate::types::script_name_of(f) == k)
                    });
                    let Some(index) = index else {
                        let name = self.reflection.type_name(struct_type);
                        return Err(self.mismatch(mode, value, name));
                    };
                    result.fields[index] = self.nativize_field(item, &fields[index], mode)?;
                }
                Ok(NativeValue::Struct(result))
            }
            _ => {
                let name = self.reflection.type_name(struct_type);
                Err(self.mismatch(mode, value, name))
            }
        }
    }

    fn default_struct_value(&self, struct_type: TypeHash) -> StructValue {
        scriptbridge_core::layout::default_struct(struct_type, &self.reflection)
    }

    /// Nativize a whole field, honoring fixed array dimensions.
    pub(crate) fn nativize_field(
        &mut self,
        value: &ScriptValue,
        field: &PropertyDescriptor,
        mode: ErrorMode,
    ) -> BridgeResult<NativeValue> {
        let result = if field.is_fixed_array() {
            self.nativize_fixed(value, field, mode)
        } else {
            self.nativize(value, &field.kind, mode)
        };
        result.map_err(|e| {
            self.raise_layer(
                mode,
                "Nativize",
                format!("Failed to convert field '{}' ({})", field.name, field.kind.kind_name()),
                e,
            )
        })
    }

    /// Nativize all slots of a fixed-size array property.
    pub(crate) fn nativize_fixed(
        &mut self,
        value: &ScriptValue,
        field: &PropertyDescriptor,
        mode: ErrorMode,
    ) -> BridgeResult<NativeValue> {
        let dim = field.array_dim as usize;
        if let ScriptValue::Wrapper(w) = value {
            let compatible = matches!(
                &*w.payload_ref(),
                WrapperPayload::FixedArray { element, dim: d } if element.kind == field.kind && *d == dim
            );
            if compatible {
                let addr = w.storage()?;
                return Ok(addr.get(&self.heap)?);
            }
        }
        match value.as_sequence() {
            Some(items) if items.len() == dim => {
                let mut slots = Vec::with_capacity(dim);
                for item in items {
                    slots.push(self.nativize(item, &field.kind, mode)?);
                }
                Ok(NativeValue::Fixed(slots))
            }
            _ => Err(self.mismatch(mode, value, format!("{}[{dim}]", field.kind))),
        }
    }

    /// Elements of a list, tuple or compatible container wrapper.
    fn nativize_elements(
        &mut self,
        value: &ScriptValue,
        kind: &PropertyKind,
        element: &PropertyKind,
        mode: ErrorMode,
    ) -> BridgeResult<Vec<NativeValue>> {
        if let ScriptValue::Wrapper(w) = value {
            let same_element = match &*w.payload_ref() {
                WrapperPayload::Array { element: e }
                | WrapperPayload::Set { element: e }
                | WrapperPayload::FixedArray { element: e, .. } => e.kind == *element,
                _ => false,
            };
            if same_element {
                let addr = w.storage()?;
                let stored = addr.get(&self.heap)?;
                return Ok(stored.elements().map(<[NativeValue]>::to_vec).unwrap_or_default());
            }
        }
        let Some(items) = value.as_sequence() else {
            return Err(self.mismatch(mode, value, kind.to_string()));
        };
        let mut converted = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let native = self.nativize(item, element, mode).map_err(|e| {
                self.raise_layer(mode, "Nativize", format!("Failed to convert element {index} of '{kind}'"), e)
            })?;
            converted.push(native);
        }
        Ok(converted)
    }

    fn nativize_map(
        &mut self,
        value: &ScriptValue,
        kind: &PropertyKind,
        key_kind: &PropertyKind,
        value_kind: &PropertyKind,
        mode: ErrorMode,
    ) -> BridgeResult<NativeValue> {
        if let ScriptValue::Wrapper(w) = value {
            let same = matches!(
                &*w.payload_ref(),
                WrapperPayload::Map { key, value } if key.kind == *key_kind && value.kind == *value_kind
            );
            if same {
                let addr = w.storage()?;
                return Ok(addr.get(&self.heap)?);
            }
        }
        let ScriptValue::Dict(entries) = value else {
            return Err(self.mismatch(mode, value, kind.to_string()));
        };
        let mut pairs: Vec<(NativeValue, NativeValue)> = Vec::with_capacity(entries.len());
        for (index, (k, v)) in entries.iter().enumerate() {
            let native_key = self.nativize(k, key_kind, mode).map_err(|e| {
                self.raise_layer(mode, "Nativize", format!("Failed to convert key {index} of '{kind}'"), e)
            })?;
            let native_value = self.nativize(v, value_kind, mode).map_err(|e| {
                self.raise_layer(mode, "Nativize", format!("Failed to convert value {index} of '{kind}'"), e)
            })?;
            match pairs.iter_mut().find(|(existing, _)| existing.identical(&native_key)) {
                Some(slot) => slot.1 = native_value,
                None => pairs.push((native_key, native_value)),
            }
        }
        Ok(NativeValue::Map(pairs))
    }

    // ==========================================================================
    // Scriptize
    // ==========================================================================

    /// Convert a native value of `kind` into a script value.
    ///
    /// Compound values are copied into new wrappers.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn scriptize(&mut self, value: &NativeValue, kind: &PropertyKind, mode: ErrorMode) -> BridgeResult<ScriptValue> {
        self.scriptize_value(value.clone(), kind, ConversionMode::Copy)
            .map_err(|e| self.raise(mode, "Scriptize", e))
    }

    /// Scriptize a value the caller no longer needs; compound values are
    /// adopted by their wrapper (`Steal`) instead of copied.
    pub(crate) fn scriptize_owned(&mut self, value: NativeValue, kind: &PropertyKind, mode: ErrorMode) -> BridgeResult<ScriptValue> {
        self.scriptize_value(value, kind, ConversionMode::Steal)
            .map_err(|e| self.raise(mode, "Scriptize", e))
    }

    fn scriptize_value(&mut self, value: NativeValue, kind: &PropertyKind, wrap: ConversionMode) -> BridgeResult<ScriptValue> {
        let mismatch = |value: &NativeValue| -> BridgeError {
            scriptbridge_core::ConversionError::scriptize(value.type_name(), kind.kind_name()).into()
        };
        match kind {
            PropertyKind::Bool
            | PropertyKind::Numeric(_)
            | PropertyKind::Str
            | PropertyKind::Name
            | PropertyKind::Text => Ok(scalar::scriptize_scalar(&value, kind)?),
            PropertyKind::Enum { .. } => value.as_i64().map(ScriptValue::Int).ok_or_else(|| mismatch(&value)),
            PropertyKind::Object { .. } | PropertyKind::Interface { .. } => match value {
                NativeValue::Object(Some(handle)) if self.heap.is_alive(handle) => {
                    Ok(ScriptValue::Wrapper(self.object_wrapper(handle)?))
                }
                NativeValue::Object(_) => Ok(ScriptValue::None),
                other => Err(mismatch(&other)),
            },
            PropertyKind::Class { .. } => match value {
                NativeValue::Class(None) => Ok(ScriptValue::None),
                NativeValue::Class(Some(hash)) => {
                    let id = self
                        .wrapper_type(hash)
                        .or_else(|| self.types.nearest_wrapper_type(&self.reflection, hash));
                    id.map(ScriptValue::Type).ok_or_else(|| mismatch(&NativeValue::Class(Some(hash))))
                }
                other => Err(mismatch(&other)),
            },
            PropertyKind::Struct { struct_type } => {
                if !matches!(&value, NativeValue::Struct(s) if s.struct_type == *struct_type) {
                    return Err(mismatch(&value));
                }
                let name = self.reflection.type_name(*struct_type);
                let payload = WrapperPayload::Struct { struct_type: *struct_type };
                let w = self.make_wrapper(payload, name, NativeSource::Value(value), wrap, Default::default())?;
                Ok(ScriptValue::Wrapper(w))
            }
            PropertyKind::Delegate { signature } => match value {
                NativeValue::Delegate(_) => {
                    let payload = WrapperPayload::Delegate { signature: *signature };
                    let w = self.make_wrapper(payload, "Delegate", NativeSource::Value(value), wrap, Default::default())?;
                    Ok(ScriptValue::Wrapper(w))
                }
                other => Err(mismatch(&other)),
            },
            PropertyKind::MulticastDelegate { signature } => match value {
                NativeValue::Multicast(_) => {
                    let payload = WrapperPayload::Multicast { signature: *signature };
                    let w = self.make_wrapper(
                        payload,
                        "MulticastDelegate",
                        NativeSource::Value(value),
                        wrap,
                        Default::default(),
                    )?;
                    Ok(ScriptValue::Wrapper(w))
                }
                other => Err(mismatch(&other)),
            },
            PropertyKind::Array { inner } => match value {
                NativeValue::Array(_) => {
                    let payload = WrapperPayload::Array {
                        element: PropertyDescriptor::new(kind.to_string(), (**inner).clone()),
                    };
                    let w = self.make_wrapper(payload, "Array", NativeSource::Value(value), wrap, Default::default())?;
                    Ok(ScriptValue::Wrapper(w))
                }
                other => Err(mismatch(&other)),
            },
            PropertyKind::Set { element } => match value {
                NativeValue::Set(_) => {
                    let payload = WrapperPayload::Set {
                        element: PropertyDescriptor::new(kind.to_string(), (**element).clone()),
                    };
                    let w = self.make_wrapper(payload, "Set", NativeSource::Value(value), wrap, Default::default())?;
                    Ok(ScriptValue::Wrapper(w))
                }
                other => Err(mismatch(&other)),
            },
            PropertyKind::Map { key, value: value_kind } => match value {
                NativeValue::Map(_) => {
                    let payload = WrapperPayload::Map {
                        key: PropertyDescriptor::new(kind.to_string(), (**key).clone()),
                        value: PropertyDescriptor::new(kind.to_string(), (**value_kind).clone()),
                    };
                    let w = self.make_wrapper(payload, "Map", NativeSource::Value(value), wrap, Default::default())?;
                    Ok(ScriptValue::Wrapper(w))
                }
                other => Err(mismatch(&other)),
            },
        }
    }
}

/// Set elements and map keys must be comparable scalar-like values.
fn check_hashable(container: &PropertyKind, element: &PropertyKind) -> BridgeResult<()> {
    match element {
        PropertyKind::Array { .. }
        | PropertyKind::Set { .. }
        | PropertyKind::Map { .. }
        | PropertyKind::Delegate { .. }
        | PropertyKind::MulticastDelegate { .. } => Err(BridgeError::UnimplementedConversion {
            kind: element.kind_name(),
            property: container.to_string(),
        }),
        _ => Ok(()),
    }
}
