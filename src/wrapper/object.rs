//! Attribute protocol of object and struct wrappers.
//!
//! Attribute names are script names. They resolve through the wrapper
//! type's accessors first (walking base types), then its methods. Reads of
//! struct and container properties alias the owner's storage, so writes
//! through the result land in place and notify through the owner chain.

use scriptbridge_core::{AccessError, TypeHash};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::owner::OwnerContext;
use crate::script::{ScriptCallable, ScriptValue};
use crate::types::{GetSet, MethodDef, WrapperTypeId, script_name_of};

use super::{ConversionMode, Wrapper, WrapperPayload};

impl Bridge {
    /// Reflected type and wrapper type that attributes of `wrapper` resolve against.
    ///
    /// Objects use their current class, so a reinstanced object resolves
    /// against its new type.
    fn attribute_owner(&mut self, wrapper: &Wrapper) -> BridgeResult<Option<(TypeHash, WrapperTypeId)>> {
        let reflected = match *wrapper.payload_ref() {
            WrapperPayload::Object => {
                let handle = wrapper.object_handle().ok_or_else(|| {
                    BridgeError::internal(format!("'{}' wrapper is not initialized", wrapper.type_name()))
                })?;
                let object = self.heap.get(handle).ok_or(AccessError::StaleHandle {
                    index: handle.index,
                    generation: handle.generation,
                })?;
                object.class
            }
            WrapperPayload::Struct { struct_type } => struct_type,
            _ => return Ok(None),
        };
        let id = self
            .wrapper_type(reflected)
            .or_else(|| self.types.nearest_wrapper_type(&self.reflection, reflected));
        Ok(id.map(|id| (reflected, id)))
    }

    fn no_attribute(&mut self, target: &ScriptValue, name: &str) -> BridgeError {
        self.report(BridgeError::NoAttribute {
            type_name: target.type_name(),
            name: name.to_string(),
        })
    }

    fn attribute_denied(&mut self, target: &ScriptValue, name: &str, reason: &'static str) -> BridgeError {
        self.report(BridgeError::AttributeAccess {
            type_name: target.type_name(),
            name: name.to_string(),
            reason,
        })
    }

    /// Resolve the accessor and method tables for an attribute of `target`.
    fn resolve_attribute(
        &mut self,
        target: &ScriptValue,
        name: &str,
    ) -> BridgeResult<(Wrapper, TypeHash, Option<GetSet>, Option<MethodDef>)> {
        let Some(wrapper) = target.as_wrapper().cloned() else {
            return Err(self.no_attribute(target, name));
        };
        let Some((reflected, id)) = self.attribute_owner(&wrapper)? else {
            return Err(self.no_attribute(target, name));
        };
        let getset = self.types.find_getset(id, name).cloned();
        let method = match getset {
            Some(_) => None,
            None => self.types.find_method(id, name).cloned(),
        };
        Ok((wrapper, reflected, getset, method))
    }

    // ==========================================================================
    // Attributes
    // ==========================================================================

    /// Read attribute `name` of a wrapper or wrapper type.
    pub fn get_attr(&mut self, target: &ScriptValue, name: &str) -> BridgeResult<ScriptValue> {
        if let ScriptValue::Type(id) = target {
            return self.type_attr(*id, target, name);
        }
        let (wrapper, reflected, getset, method) = self.resolve_attribute(target, name)?;
        if let Some(getset) = getset {
            if let Some(getter) = &getset.getter {
                let function = self.member_function(reflected, getter)?;
                return self.call_function(Some(target), &function, &[]);
            }
            let (index, property) = self.field_of(reflected, getset.native_name())?;
            let addr = wrapper.storage()?.field(index);
            return self.scriptize_property(&property, &addr, ConversionMode::Reference, Some(target));
        }
        if let Some(method) = method {
            return Ok(bound_method(target.clone(), method));
        }
        if self.is_hidden_field(reflected, name) {
            return Err(self.attribute_denied(target, name, "is protected and cannot be read"));
        }
        Err(self.no_attribute(target, name))
    }

    /// Write attribute `name` of a wrapper.
    pub fn set_attr(&mut self, target: &ScriptValue, name: &str, value: &ScriptValue) -> BridgeResult<()> {
        let (wrapper, reflected, getset, method) = self.resolve_attribute(target, name)?;
        let Some(getset) = getset else {
            if method.is_some() {
                return Err(self.attribute_denied(target, name, "is a method and cannot be set"));
            }
            if self.is_hidden_field(reflected, name) {
                return Err(self.attribute_denied(target, name, "is protected and cannot be set"));
            }
            return Err(self.no_attribute(target, name));
        };
        if !getset.property.flags.is_script_writable() {
            return Err(self.attribute_denied(target, name, "is read-only and cannot be set"));
        }
        if let Some(setter) = &getset.setter {
            let function = self.member_function(reflected, setter)?;
            self.call_function(Some(target), &function, std::slice::from_ref(value))?;
            return Ok(());
        }
        let (index, property) = self.field_of(reflected, getset.native_name())?;
        let addr = wrapper.storage()?.field(index);
        let owner = OwnerContext::new(&wrapper, property.name.clone());
        self.nativize_property(value, &property, &addr, &owner)
    }

    /// Attributes cannot be deleted.
    pub fn del_attr(&mut self, target: &ScriptValue, name: &str) -> BridgeResult<()> {
        let (_, _, getset, method) = self.resolve_attribute(target, name)?;
        if getset.is_none() && method.is_none() {
            return Err(self.no_attribute(target, name));
        }
        Err(self.attribute_denied(target, name, "cannot be deleted"))
    }

    /// Script names of every accessor and method visible on `target`.
    pub fn attribute_names(&mut self, target: &ScriptValue) -> BridgeResult<Vec<String>> {
        let id = match target {
            ScriptValue::Type(id) => Some(*id),
            ScriptValue::Wrapper(w) => self.attribute_owner(w)?.map(|(_, id)| id),
            _ => None,
        };
        let mut names = Vec::new();
        for id in id.map(|id| self.types.base_chain(id)).unwrap_or_default() {
            if let Some(ty) = self.types.get(id) {
                names.extend(ty.getsets.iter().map(|g| g.script_name.clone()));
                names.extend(ty.methods.iter().map(|m| m.script_name.clone()));
                names.extend(ty.enum_values.iter().map(|(label, _)| label.clone()));
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Call method `name` of a wrapper or wrapper type.
    pub fn call_method(&mut self, target: &ScriptValue, name: &str, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let method = if let ScriptValue::Type(id) = target {
            self.types.find_method(*id, name).filter(|m| m.is_static).cloned()
        } else {
            self.resolve_attribute(target, name)?.3
        };
        match method {
            Some(method) => self.invoke_method(target, &method, args),
            None => Err(self.no_attribute(target, name)),
        }
    }

    fn invoke_method(&mut self, target: &ScriptValue, method: &MethodDef, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        let class = match target {
            ScriptValue::Type(id) => self.types.get(*id).map(|t| t.reflected),
            ScriptValue::Wrapper(w) => self.attribute_owner(w)?.map(|(class, _)| class),
            _ => None,
        };
        let Some(class) = class else {
            return Err(self.no_attribute(target, &method.script_name));
        };
        let function = self.member_function(class, &method.native_name)?;
        let this = (!method.is_static).then_some(target);
        self.call_function(this, &function, args)
    }

    /// Attributes of a wrapper type: enum values and static methods.
    fn type_attr(&mut self, id: WrapperTypeId, target: &ScriptValue, name: &str) -> BridgeResult<ScriptValue> {
        let Some(ty) = self.types.get(id) else {
            return Err(BridgeError::internal(format!("unknown wrapper type {id}")));
        };
        if let Some((_, value)) = ty.enum_values.iter().find(|(label, _)| label == name) {
            return Ok(ScriptValue::Int(*value));
        }
        match self.types.find_method(id, name).filter(|m| m.is_static).cloned() {
            Some(method) => Ok(bound_method(target.clone(), method)),
            None => Err(self.no_attribute(target, name)),
        }
    }

    fn member_function(&self, class: TypeHash, name: &str) -> BridgeResult<scriptbridge_core::FunctionEntry> {
        self.reflection.find_function(class, name).cloned().ok_or_else(|| {
            BridgeError::internal(format!(
                "function '{name}' not found on '{}'",
                self.reflection.type_name(class)
            ))
        })
    }

    /// Check if `name` is a field of `reflected` that scripts cannot see.
    ///
    /// Hidden fields get no accessor, so this is only consulted on a miss.
    fn is_hidden_field(&self, reflected: TypeHash, name: &str) -> bool {
        self.reflection
            .layout(reflected)
            .iter()
            .any(|field| !field.flags.is_script_readable() && script_name_of(field) == name)
    }

    fn field_of(&self, reflected: TypeHash, native_name: &str) -> BridgeResult<(usize, scriptbridge_core::PropertyDescriptor)> {
        self.reflection.field_index(reflected, native_name).ok_or_else(|| {
            BridgeError::internal(format!(
                "property '{native_name}' not found on '{}'",
                self.reflection.type_name(reflected)
            ))
        })
    }
}

/// A method value bound to its receiver.
fn bound_method(target: ScriptValue, method: MethodDef) -> ScriptValue {
    let name = method.script_name.clone();
    ScriptValue::Callable(ScriptCallable::new(&name, move |bridge, args| {
        bridge.invoke_method(&target, &method, args)
    }))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::BridgeConfig;
    use crate::owner::{ChangeEvent, ChangeObserver};
    use crate::script::ScriptErrorKind;
    use scriptbridge_core::{
        CallFrame, ClassEntry, EnumEntry, FunctionEntry, FunctionFlags, NativeFn, NumericKind, PropertyDescriptor,
        PropertyFlags, PropertyKind, StructEntry,
    };

    struct Chains(Rc<RefCell<Vec<String>>>);

    impl ChangeObserver for Chains {
        fn pre_change(&mut self, event: &ChangeEvent) {
            self.0.borrow_mut().push(event.chain.to_string());
        }

        fn post_change(&mut self, _: &ChangeEvent) {}
    }

    fn car_bridge() -> (Bridge, ScriptValue) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let engine = bridge
            .reflection_mut()
            .register_struct(StructEntry::new("Engine", "Game").with_property(PropertyDescriptor::editable("Power", PropertyKind::I32)))
            .unwrap();
        bridge
            .reflection_mut()
            .register_enum(EnumEntry::new("Gear", "Game", NumericKind::U8).with_value("Low", 0).with_value("High", 1))
            .unwrap();
        let class = bridge
            .reflection_mut()
            .register_class(
                ClassEntry::new("Car", "Game")
                    .with_property(PropertyDescriptor::editable("Speed", PropertyKind::I32))
                    .with_property(PropertyDescriptor::new("Secret", PropertyKind::I32))
                    .with_property(PropertyDescriptor::editable("Vin", PropertyKind::Str).with_flags(PropertyFlags::READ_ONLY))
                    .with_property(PropertyDescriptor::editable("Engine", PropertyKind::Struct { struct_type: engine }))
                    .with_function(
                        FunctionEntry::new(TypeHash::EMPTY, "DoubleSpeed")
                            .with_flags(FunctionFlags::SCRIPT_CALLABLE)
                            .with_return(PropertyKind::I32)
                            .with_native(NativeFn::new(TypeHash::from_name("DoubleSpeed"), |frame: &mut CallFrame<'_>| {
                                let speed = frame.this_object()?.value.at_path(&[scriptbridge_core::PathSegment::Field(0)])?.as_i64().unwrap_or(0);
                                frame.set_return((speed * 2) as i32)
                            })),
                    )
                    .with_function(
                        FunctionEntry::new(TypeHash::EMPTY, "MakeDefault")
                            .with_flags(FunctionFlags::SCRIPT_CALLABLE | FunctionFlags::STATIC)
                            .with_return(PropertyKind::Str)
                            .with_native(NativeFn::new(TypeHash::from_name("MakeDefault"), |frame: &mut CallFrame<'_>| {
                                frame.set_return("default")
                            })),
                    ),
            )
            .unwrap();
        let car = bridge.new_object(class).unwrap();
        (bridge, car)
    }

    #[test]
    fn properties_round_trip() {
        let (mut bridge, car) = car_bridge();
        bridge.set_attr(&car, "speed", &ScriptValue::Int(42)).unwrap();
        assert_eq!(bridge.get_attr(&car, "speed"), Ok(ScriptValue::Int(42)));
    }

    #[test]
    fn access_rules() {
        let (mut bridge, car) = car_bridge();
        let err = bridge.get_attr(&car, "secret").unwrap_err();
        assert_eq!(err.to_string(), "attribute 'secret' on 'Car' is protected and cannot be read");

        assert_eq!(bridge.get_attr(&car, "vin"), Ok(ScriptValue::from("")));
        let err = bridge.set_attr(&car, "vin", &"X".into()).unwrap_err();
        assert_eq!(err.script_kind(), ScriptErrorKind::AttributeError);

        let err = bridge.get_attr(&car, "wings").unwrap_err();
        assert!(matches!(err, BridgeError::NoAttribute { .. }));
        assert_eq!(bridge.runtime().error().unwrap().kind, ScriptErrorKind::AttributeError);

        assert!(bridge.del_attr(&car, "speed").is_err());
    }

    #[test]
    fn hidden_fields_stay_protected() {
        let (mut bridge, car) = car_bridge();
        let err = bridge.set_attr(&car, "secret", &ScriptValue::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "attribute 'secret' on 'Car' is protected and cannot be set");
        let names = bridge.attribute_names(&car).unwrap();
        assert!(names.contains(&"speed".to_string()));
        assert!(!names.contains(&"secret".to_string()));
    }

    #[test]
    fn nested_struct_writes_land_in_place() {
        let (mut bridge, car) = car_bridge();
        let chains = Rc::new(RefCell::new(Vec::new()));
        bridge.add_observer(Box::new(Chains(chains.clone())));

        let engine = bridge.get_attr(&car, "engine").unwrap();
        assert_eq!(engine.as_wrapper().unwrap().mode(), ConversionMode::Reference);
        bridge.set_attr(&engine, "power", &ScriptValue::Int(300)).unwrap();

        let again = bridge.get_attr(&car, "engine").unwrap();
        assert_eq!(again, engine);
        assert_eq!(bridge.get_attr(&again, "power"), Ok(ScriptValue::Int(300)));
        assert_eq!(*chains.borrow(), vec!["Engine.Power".to_string()]);
    }

    #[test]
    fn methods_bind_their_receiver() {
        let (mut bridge, car) = car_bridge();
        bridge.set_attr(&car, "speed", &ScriptValue::Int(21)).unwrap();
        let ScriptValue::Callable(method) = bridge.get_attr(&car, "double_speed").unwrap() else {
            panic!("expected a bound method");
        };
        assert_eq!(method.call(&mut bridge, &[]), Ok(ScriptValue::Int(42)));
        assert_eq!(bridge.call_method(&car, "double_speed", &[]), Ok(ScriptValue::Int(42)));
        assert!(bridge.set_attr(&car, "double_speed", &ScriptValue::None).is_err());
    }

    #[test]
    fn type_attributes() {
        let (mut bridge, _) = car_bridge();
        let gear = bridge.wrapper_type(TypeHash::from_name("Gear")).unwrap();
        assert_eq!(bridge.get_attr(&ScriptValue::Type(gear), "High"), Ok(ScriptValue::Int(1)));

        let car = bridge.wrapper_type(TypeHash::from_name("Car")).unwrap();
        assert_eq!(
            bridge.call_method(&ScriptValue::Type(car), "make_default", &[]),
            Ok(ScriptValue::from("default"))
        );
        assert!(bridge.get_attr(&ScriptValue::Type(car), "speed").is_err());
    }
}
