//! Synthesis - build the native entry of a validated definition.
//!
//! Nothing here touches the reflection registry; the entry and the script
//! callables it forwards to are handed back for the generator to install.

use scriptbridge_core::text::export_text;
use scriptbridge_core::{
    ClassEntry, FunctionEntry, FunctionFlags, FunctionImpl, PropertyDescriptor, PropertyKind, StructEntry, TypeEntry,
    TypeFlags, TypeHash,
};

use crate::bridge::Bridge;
use crate::convert::ErrorMode;
use crate::error::BridgeResult;
use crate::script::ScriptCallable;
use crate::types::{SCRIPT_GETTER_KEY, SCRIPT_NAME_KEY, SCRIPT_SETTER_KEY};

use super::definition::{FieldDefinition, MethodDefinition, MethodFlags, ReturnDefinition, TypeDefinition};
use super::validate::ValidationOutput;

/// A synthesized type, ready to be installed.
#[derive(Debug)]
pub(crate) struct Synthesis {
    pub entry: TypeEntry,
    /// Callables for slots `first_slot..`, in order.
    pub callables: Vec<ScriptCallable>,
}

/// Native property of a script field.
fn field_property(field: &FieldDefinition) -> PropertyDescriptor {
    let mut property = PropertyDescriptor::editable(field.name.clone(), field.kind.clone())
        .with_array_dim(field.array_dim.max(1))
        .with_metadata(SCRIPT_NAME_KEY, field.name.clone());
    if let Some(getter) = &field.getter {
        property = property.with_metadata(SCRIPT_GETTER_KEY, getter.clone());
    }
    if let Some(setter) = &field.setter {
        property = property.with_metadata(SCRIPT_SETTER_KEY, setter.clone());
    }
    property
}

impl Bridge {
    /// Build the entry of `definition` under identity `hash`.
    ///
    /// Script callables are numbered from `first_slot`.
    pub(crate) fn synthesize_type(
        &mut self,
        definition: &TypeDefinition,
        validated: &ValidationOutput,
        hash: TypeHash,
        first_slot: u32,
    ) -> BridgeResult<Synthesis> {
        let module = definition
            .module()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.generated_module.clone());
        let flags = TypeFlags::SCRIPT_GENERATED | TypeFlags::EXPORTED;

        let mut entry = match definition {
            TypeDefinition::Struct(def) => {
                let mut entry = StructEntry::new(def.name.clone(), module);
                entry.type_hash = hash;
                entry.flags = flags;
                entry.super_struct = validated.parent;
                entry.properties = def.fields.iter().map(field_property).collect();
                return Ok(Synthesis {
                    entry: TypeEntry::Struct(entry),
                    callables: Vec::new(),
                });
            }
            TypeDefinition::Class(def) => {
                let mut entry = ClassEntry::new(def.name.clone(), module);
                entry.type_hash = hash;
                entry.flags = flags;
                entry.super_class = validated.parent;
                entry.properties = def.fields.iter().map(field_property).collect();
                entry
            }
        };

        let mut callables = Vec::new();
        for (index, method) in definition.methods().iter().enumerate() {
            let slot = first_slot + callables.len() as u32;
            callables.push(method.callable.clone());
            let parent = validated.overrides.get(index).and_then(Option::as_ref);
            let function = match parent {
                Some(parent) => {
                    let mut function = parent.clone();
                    function.flags.remove(FunctionFlags::NATIVE);
                    function
                }
                None => self.synthesize_function(hash, method)?,
            };
            entry = entry.with_function(FunctionEntry {
                implementation: FunctionImpl::Script { slot },
                ..function
            });
        }
        Ok(Synthesis {
            entry: TypeEntry::Class(entry),
            callables,
        })
    }

    /// A fresh native function for a non-override method.
    fn synthesize_function(&mut self, owner: TypeHash, method: &MethodDefinition) -> BridgeResult<FunctionEntry> {
        let mut function = FunctionEntry::new(owner, method.name.clone())
            .with_flags(FunctionFlags::SCRIPT_CALLABLE)
            .with_metadata(SCRIPT_NAME_KEY, method.name.clone());
        if method.flags.contains(MethodFlags::STATIC) {
            function = function.with_flags(FunctionFlags::STATIC);
        }
        if method.flags.contains(MethodFlags::PURE) {
            function = function.with_flags(FunctionFlags::PURE);
        }
        for param in &method.params {
            function = function.with_param(PropertyDescriptor::param(param.name.clone(), param.kind.clone()));
        }
        match &method.returns {
            ReturnDefinition::None => {}
            ReturnDefinition::Single(kind) => function = function.with_return(kind.clone()),
            ReturnDefinition::Tuple(kinds) => {
                function = function.with_return(PropertyKind::Bool);
                for (n, kind) in kinds.iter().enumerate() {
                    function = function.with_param(PropertyDescriptor::out_param(format!("OutValue{n}"), kind.clone()));
                }
            }
        }

        let first_default = method.params.len().saturating_sub(method.defaults.len());
        for (param, value) in method.params[first_default..].iter().zip(&method.defaults) {
            let native = self.nativize(value, &param.kind, ErrorMode::Set).map_err(|e| {
                self.raise_layer(
                    ErrorMode::Set,
                    "Generate",
                    format!("Failed to convert default of parameter '{}' on '{}'", param.name, method.name),
                    e,
                )
            })?;
            let text = export_text(&native, &param.kind, &self.reflection).map_err(|e| self.report(e.into()))?;
            function = function
                .with_flags(FunctionFlags::HAS_DEFAULTS)
                .with_metadata(self.config.default_key(&param.name), text);
        }
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeConfig;
    use crate::generator::{ClassDefinition, StructDefinition, ValidationPass};
    use crate::script::ScriptValue;

    fn noop() -> ScriptCallable {
        ScriptCallable::new("noop", |_, _| Ok(ScriptValue::None))
    }

    fn synthesize(bridge: &mut Bridge, definition: TypeDefinition) -> Synthesis {
        let validated = ValidationPass::new(&bridge.reflection, &definition).run();
        assert!(validated.is_ok(), "{:?}", validated.errors);
        let hash = TypeHash::from_generation(definition.name(), 1);
        bridge.synthesize_type(&definition, &validated, hash, 0).unwrap()
    }

    #[test]
    fn fields_become_editable_properties() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let definition = TypeDefinition::Struct(
            StructDefinition::new("Stats")
                .with_field(FieldDefinition::new("Level", PropertyKind::I32))
                .with_field(FieldDefinition::new("Slots", PropertyKind::U8).with_array_dim(4)),
        );
        let synthesis = synthesize(&mut bridge, definition);
        let TypeEntry::Struct(entry) = synthesis.entry else {
            panic!("expected a struct");
        };
        assert_eq!(entry.module, "ScriptGenerated");
        assert_eq!(entry.type_hash, TypeHash::from_generation("Stats", 1));
        assert!(entry.flags.contains(TypeFlags::SCRIPT_GENERATED));
        assert!(!entry.flags.contains(TypeFlags::NATIVE));
        assert!(entry.properties[0].flags.is_script_writable());
        assert_eq!(entry.properties[0].metadata(SCRIPT_NAME_KEY), Some("Level"));
        assert_eq!(entry.properties[1].array_dim, 4);
    }

    #[test]
    fn tuple_returns_and_defaults() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let definition = TypeDefinition::Class(
            ClassDefinition::new("Finder").with_method(
                MethodDefinition::new("Find", noop())
                    .with_param("Key", PropertyKind::Str)
                    .with_param("Limit", PropertyKind::I32)
                    .with_default(10)
                    .with_returns(vec![PropertyKind::I32, PropertyKind::Str]),
            ),
        );
        let synthesis = synthesize(&mut bridge, definition);
        assert_eq!(synthesis.callables.len(), 1);
        let TypeEntry::Class(entry) = synthesis.entry else {
            panic!("expected a class");
        };
        let function = &entry.functions[0];
        assert_eq!(function.owner, entry.type_hash);
        assert!(matches!(function.implementation, FunctionImpl::Script { slot: 0 }));
        assert_eq!(function.input_params().count(), 2);
        let results: Vec<_> = function.result_params().iter().map(|(_, p)| p.name.clone()).collect();
        assert_eq!(results, vec!["ReturnValue", "OutValue0", "OutValue1"]);
        assert_eq!(function.metadata("CPP_Default_Limit"), Some("10"));
        assert!(function.metadata("CPP_Default_Key").is_none());
        assert!(function.flags.contains(FunctionFlags::HAS_DEFAULTS));
    }

    #[test]
    fn overrides_copy_the_parent_signature() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let actor = TypeHash::from_name("Actor");
        bridge
            .reflection_mut()
            .register_class(
                ClassEntry::new("Actor", "Engine").with_function(
                    FunctionEntry::new(actor, "Tick")
                        .with_flags(FunctionFlags::SCRIPT_EVENT)
                        .with_param(PropertyDescriptor::param("Delta", PropertyKind::F32))
                        .with_metadata("ToolTip", "Called every frame"),
                ),
            )
            .unwrap();
        let definition = TypeDefinition::Class(
            ClassDefinition::new("Hero")
                .with_parent("Actor")
                .with_method(MethodDefinition::new("Tick", noop()).with_flags(MethodFlags::OVERRIDE)),
        );
        let synthesis = synthesize(&mut bridge, definition);
        let TypeEntry::Class(entry) = synthesis.entry else {
            panic!("expected a class");
        };
        assert_eq!(entry.super_class, Some(actor));
        let tick = &entry.functions[0];
        assert_eq!(tick.owner, entry.type_hash);
        assert_eq!(tick.params.len(), 1);
        assert_eq!(tick.metadata("ToolTip"), Some("Called every frame"));
        assert!(tick.flags.contains(FunctionFlags::SCRIPT_EVENT));
    }

    #[test]
    fn unconvertible_default_fails() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let definition = TypeDefinition::Class(
            ClassDefinition::new("Bad").with_method(
                MethodDefinition::new("Go", noop())
                    .with_param("Speed", PropertyKind::I32)
                    .with_default("fast"),
            ),
        );
        let validated = ValidationPass::new(&bridge.reflection, &definition).run();
        let err = bridge
            .synthesize_type(&definition, &validated, TypeHash::from_generation("Bad", 1), 0)
            .unwrap_err();
        assert!(err.to_string().starts_with("Generate: Failed to convert default of parameter 'Speed' on 'Go'"));
    }
}
