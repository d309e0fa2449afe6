//! Struct wrappers built from the script side.

use scriptbridge_core::{NativeValue, TypeHash};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::{BridgeError, BridgeResult};
use crate::owner::OwnerContext;
use crate::script::ScriptValue;
use crate::types::{WrapperTypeKind, script_name_of};

use super::{ConversionMode, NativeSource, WrapperPayload};

impl Bridge {
    /// Construct a new struct value owned by its wrapper.
    ///
    /// Positional arguments fill fields in layout order; keywords match a
    /// field's script name or native name. The value is built completely
    /// before the wrapper is created.
    pub fn new_struct(
        &mut self,
        struct_type: TypeHash,
        args: &[ScriptValue],
        kwargs: &[(&str, ScriptValue)],
    ) -> BridgeResult<ScriptValue> {
        let name = self.reflection.type_name(struct_type);
        if self.reflection.struct_entry(struct_type).is_none() {
            return Err(self.report(BridgeError::internal(format!("'{name}' is not a struct"))));
        }
        let fields = self.reflection.layout(struct_type);
        if args.len() > fields.len() {
            return Err(self.report(BridgeError::Call {
                function: name,
                detail: format!("takes at most {} arguments but {} were given", fields.len(), args.len()),
            }));
        }

        let NativeValue::Struct(mut value) = self.reflection.default_fields(struct_type) else {
            return Err(BridgeError::internal(format!("'{name}' has no field layout")));
        };
        for (index, arg) in args.iter().enumerate() {
            value.fields[index] = self.nativize_field(arg, &fields[index], ErrorMode::Set)?;
        }
        for (key, arg) in kwargs {
            let index = fields
                .iter()
                .position(|f| script_name_of(f) == *key || f.name == *key);
            let Some(index) = index else {
                return Err(self.report(BridgeError::NoAttribute {
                    type_name: name,
                    name: key.to_string(),
                }));
            };
            value.fields[index] = self.nativize_field(arg, &fields[index], ErrorMode::Set)?;
        }

        let payload = WrapperPayload::Struct { struct_type };
        let wrapper = self.make_wrapper(
            payload,
            name,
            NativeSource::Value(NativeValue::Struct(value)),
            ConversionMode::Copy,
            OwnerContext::None,
        )?;
        Ok(ScriptValue::Wrapper(wrapper))
    }

    /// Call a wrapper type: construct an object of a class or a struct value.
    pub fn construct(
        &mut self,
        ty: &ScriptValue,
        args: &[ScriptValue],
        kwargs: &[(&str, ScriptValue)],
    ) -> BridgeResult<ScriptValue> {
        let info = match ty {
            ScriptValue::Type(id) => self.types.get(*id).map(|t| (t.kind, t.reflected, t.name.clone())),
            _ => None,
        };
        match info {
            Some((WrapperTypeKind::Struct, reflected, _)) => self.new_struct(reflected, args, kwargs),
            Some((WrapperTypeKind::Class, reflected, _)) => {
                let object = self.new_object(reflected)?;
                for (key, value) in kwargs {
                    self.set_attr(&object, key, value)?;
                }
                Ok(object)
            }
            Some((_, _, name)) => Err(self.report(BridgeError::Call {
                function: name,
                detail: "type cannot be instantiated".to_string(),
            })),
            None => Err(self.report(BridgeError::Call {
                function: ty.type_name(),
                detail: "object is not callable".to_string(),
            })),
        }
    }

    /// Readable fields of a struct or object wrapper as script name and value.
    pub fn fields_of(&mut self, value: &ScriptValue) -> BridgeResult<Vec<(String, ScriptValue)>> {
        let names: Vec<String> = match value.as_wrapper().map(|w| w.kind()) {
            Some(super::WrapperKind::Struct | super::WrapperKind::Object) => {
                let prefix = self.config.internal_accessor_prefix.clone();
                self.attribute_names(value)?
                    .into_iter()
                    .filter(|n| prefix.is_empty() || !n.starts_with(&prefix))
                    .collect()
            }
            _ => return Ok(Vec::new()),
        };
        let mut fields = Vec::new();
        for name in names {
            match self.get_attr(value, &name) {
                Ok(ScriptValue::Callable(_)) => {}
                Ok(field) => fields.push((name, field)),
                Err(BridgeError::AttributeAccess { .. }) => self.runtime.clear_error(),
                Err(e) => return Err(e),
            }
        }
        Ok(fields)
    }

    /// Native identity comparison of two wrapped values of the same kind.
    ///
    /// Non-wrapper values compare by script equality.
    pub fn values_identical(&self, a: &ScriptValue, b: &ScriptValue) -> BridgeResult<bool> {
        match (a, b) {
            (ScriptValue::Wrapper(x), ScriptValue::Wrapper(y)) => {
                if x.ptr_eq(y) {
                    return Ok(true);
                }
                if x.kind() != y.kind() {
                    return Ok(false);
                }
                let (Some(left), Some(right)) = (x.storage_addr(), y.storage_addr()) else {
                    return Ok(x.is_initialized() && y.is_initialized() && x.payload() == y.payload());
                };
                let left = left.get(&self.heap)?;
                let right = right.get(&self.heap)?;
                Ok(left.identical(&right))
            }
            _ => Ok(a == b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeConfig;
    use scriptbridge_core::{PropertyDescriptor, PropertyKind, StructEntry};

    fn bridge() -> (Bridge, TypeHash) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let vector = bridge
            .reflection_mut()
            .register_struct(
                StructEntry::new("Vector", "Core")
                    .with_property(PropertyDescriptor::editable("X", PropertyKind::F32))
                    .with_property(PropertyDescriptor::editable("Y", PropertyKind::F32)),
            )
            .unwrap();
        (bridge, vector)
    }

    #[test]
    fn positional_and_keyword_fields() {
        let (mut bridge, vector) = bridge();
        let v = bridge.new_struct(vector, &[1.0.into()], &[("y", 2.0.into())]).unwrap();
        assert_eq!(v.as_wrapper().unwrap().mode(), ConversionMode::Copy);
        assert_eq!(bridge.get_attr(&v, "x"), Ok(ScriptValue::Float(1.0)));
        assert_eq!(bridge.get_attr(&v, "y"), Ok(ScriptValue::Float(2.0)));
        assert_eq!(
            bridge.fields_of(&v).unwrap(),
            vec![("x".to_string(), ScriptValue::Float(1.0)), ("y".to_string(), ScriptValue::Float(2.0))]
        );
    }

    #[test]
    fn failed_field_builds_nothing() {
        let (mut bridge, vector) = bridge();
        assert!(bridge.new_struct(vector, &[1.0.into()], &[("y", "up".into())]).is_err());
        assert!(bridge.new_struct(vector, &[], &[("z", 1.0.into())]).is_err());
        assert!(bridge.new_struct(vector, &[1.0.into(), 2.0.into(), 3.0.into()], &[]).is_err());
    }

    #[test]
    fn construct_through_the_type() {
        let (mut bridge, vector) = bridge();
        let ty = ScriptValue::Type(bridge.wrapper_type(vector).unwrap());
        let a = bridge.construct(&ty, &[3.0.into(), 4.0.into()], &[]).unwrap();
        let b = bridge.new_struct(vector, &[3.0.into(), 4.0.into()], &[]).unwrap();
        assert_ne!(a, b);
        assert_eq!(bridge.values_identical(&a, &b), Ok(true));
        assert!(bridge.construct(&ScriptValue::Int(1), &[], &[]).is_err());
    }
}
