//! Validation pass - check a definition against itself and its parent.
//!
//! Runs before anything is synthesized, so a rejected definition never
//! touches the reflection registry. Every violation is collected; the
//! generator reports the first one.
//!
//! ## Responsibilities
//!
//! - Resolve the parent type by name
//! - Reject contradictory method flags
//! - Decide, per method, between a genuine override and a new method
//! - Reject fields that collide with inherited properties
//! - Check accessor and default-argument declarations

use rustc_hash::FxHashSet;
use scriptbridge_core::{FunctionEntry, FunctionFlags, TypeEntry, TypeHash};
use scriptbridge_registry::ReflectionRegistry;

use crate::error::ValidationError;
use crate::types::{function_script_name, script_name_of};

use super::definition::{MethodDefinition, MethodFlags, TypeDefinition};

/// Output of the validation pass.
#[derive(Debug, Default)]
pub struct ValidationOutput {
    /// Resolved parent type.
    pub parent: Option<TypeHash>,
    /// Parent function overridden by each method, by method index.
    pub overrides: Vec<Option<FunctionEntry>>,
    /// Collected violations, in declaration order.
    pub errors: Vec<ValidationError>,
}

impl ValidationOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates one type definition.
pub struct ValidationPass<'a> {
    reflection: &'a ReflectionRegistry,
    definition: &'a TypeDefinition,
    output: ValidationOutput,
}

impl<'a> ValidationPass<'a> {
    pub fn new(reflection: &'a ReflectionRegistry, definition: &'a TypeDefinition) -> Self {
        Self {
            reflection,
            definition,
            output: ValidationOutput::default(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> ValidationOutput {
        if self.definition.name().is_empty() {
            self.output.errors.push(ValidationError::EmptyName);
            return self.output;
        }
        let definition = self.definition;
        self.resolve_parent();
        self.check_duplicates();
        for method in definition.methods() {
            let parent_function = self.check_method(method);
            self.output.overrides.push(parent_function);
        }
        for field in definition.fields() {
            self.check_field(&field.name, field.getter.as_deref(), field.setter.as_deref());
        }
        self.output
    }

    fn type_name(&self) -> String {
        self.definition.name().to_string()
    }

    fn resolve_parent(&mut self) {
        let definition = self.definition;
        let Some(parent) = definition.parent() else {
            return;
        };
        let resolved = match (definition, self.reflection.find_by_name(parent)) {
            (TypeDefinition::Class(_), Some(TypeEntry::Class(c))) => Some(c.type_hash),
            (TypeDefinition::Struct(_), Some(TypeEntry::Struct(s))) => Some(s.type_hash),
            _ => None,
        };
        match resolved {
            Some(hash) => self.output.parent = Some(hash),
            None => self.output.errors.push(ValidationError::UnknownParent {
                type_name: self.type_name(),
                parent: parent.to_string(),
            }),
        }
    }

    fn check_duplicates(&mut self) {
        let mut seen = FxHashSet::default();
        let definition = self.definition;
        let names = definition
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .chain(definition.methods().iter().map(|m| m.name.as_str()));
        for name in names {
            if name.is_empty() {
                self.output.errors.push(ValidationError::EmptyName);
            } else if !seen.insert(name) {
                self.output.errors.push(ValidationError::DuplicateMember {
                    type_name: self.type_name(),
                    name: name.to_string(),
                });
            }
        }
    }

    /// A parent method matching `name` by native or script name.
    fn parent_function(&self, name: &str) -> Option<&'a FunctionEntry> {
        let parent = self.output.parent?;
        let reflection = self.reflection;
        reflection.super_chain(parent).into_iter().find_map(|hash| {
            reflection
                .class(hash)?
                .functions
                .iter()
                .find(|f| f.name == name || function_script_name(f) == name)
        })
    }

    fn check_method(&mut self, method: &MethodDefinition) -> Option<FunctionEntry> {
        let type_name = self.type_name();
        let flags = method.flags;
        let name = || method.name.clone();
        let is_override = flags.contains(MethodFlags::OVERRIDE);
        let mut flag_errors = Vec::new();

        if is_override && flags.intersects(MethodFlags::STATIC | MethodFlags::GETTER | MethodFlags::SETTER) {
            flag_errors.push(ValidationError::OverrideWithModifiers {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if is_override && method.declares_signature() {
            flag_errors.push(ValidationError::OverrideWithSignature {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if flags.contains(MethodFlags::STATIC) && method.is_accessor() {
            flag_errors.push(ValidationError::StaticAccessor {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if flags.contains(MethodFlags::GETTER | MethodFlags::SETTER) {
            flag_errors.push(ValidationError::GetterAndSetter {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if flags.contains(MethodFlags::PURE | MethodFlags::IMPURE) {
            flag_errors.push(ValidationError::PureAndImpure {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if flags.contains(MethodFlags::GETTER) && !flags.contains(MethodFlags::PURE) {
            flag_errors.push(ValidationError::GetterNotPure {
                type_name: type_name.clone(),
                method: name(),
            });
        }
        if method.defaults.len() > method.params.len() {
            flag_errors.push(ValidationError::TooManyDefaults {
                type_name: type_name.clone(),
                method: name(),
                defaults: method.defaults.len(),
                params: method.params.len(),
            });
        }
        let flags_ok = flag_errors.is_empty();
        self.output.errors.extend(flag_errors);
        if method.name.is_empty() || !flags_ok {
            return None;
        }

        let reflection = self.reflection;
        let parent_name = |function: &FunctionEntry| reflection.type_name(function.owner);
        match (self.parent_function(&method.name), is_override) {
            (Some(function), false) => {
                let parent = parent_name(function);
                self.output.errors.push(ValidationError::MissingOverride {
                    type_name,
                    method: name(),
                    parent,
                });
                None
            }
            (None, true) => {
                self.output.errors.push(ValidationError::NothingToOverride { type_name, method: name() });
                None
            }
            (Some(function), true) if !function.flags.contains(FunctionFlags::SCRIPT_EVENT) => {
                let parent = parent_name(function);
                self.output.errors.push(ValidationError::NotScriptEvent {
                    type_name,
                    method: name(),
                    parent,
                });
                None
            }
            (Some(function), true) => Some(function.clone()),
            (None, false) => None,
        }
    }

    fn check_field(&mut self, name: &str, getter: Option<&str>, setter: Option<&str>) {
        if name.is_empty() {
            return;
        }
        if let Some(parent) = self.output.parent {
            let collision = self
                .reflection
                .super_chain(parent)
                .into_iter()
                .find(|hash| {
                    self.reflection
                        .get(*hash)
                        .is_some_and(|e| e.properties().iter().any(|p| p.name == name || script_name_of(p) == name))
                });
            if let Some(declaring) = collision {
                self.output.errors.push(ValidationError::FieldCollision {
                    type_name: self.type_name(),
                    field: name.to_string(),
                    parent: self.reflection.type_name(declaring),
                });
            }
        }

        let accessors = [(getter, MethodFlags::GETTER), (setter, MethodFlags::SETTER)];
        for (accessor, flag) in accessors {
            let Some(accessor) = accessor else { continue };
            let declared = self
                .definition
                .methods()
                .iter()
                .any(|m| m.name == accessor && m.flags.contains(flag));
            if !declared {
                self.output.errors.push(ValidationError::UnknownAccessor {
                    type_name: self.type_name(),
                    field: name.to_string(),
                    accessor: accessor.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{ClassDefinition, FieldDefinition, StructDefinition};
    use crate::script::{ScriptCallable, ScriptValue};
    use scriptbridge_core::{ClassEntry, PropertyDescriptor, PropertyKind};

    fn noop() -> ScriptCallable {
        ScriptCallable::new("noop", |_, _| Ok(ScriptValue::None))
    }

    fn method(name: &str, flags: MethodFlags) -> MethodDefinition {
        MethodDefinition::new(name, noop()).with_flags(flags)
    }

    fn registry() -> ReflectionRegistry {
        let mut reflection = ReflectionRegistry::new();
        let actor = TypeHash::from_name("Actor");
        reflection
            .register_class(
                ClassEntry::new("Actor", "Engine")
                    .with_property(PropertyDescriptor::editable("Health", PropertyKind::F32))
                    .with_function(FunctionEntry::new(actor, "BeginPlay").with_flags(FunctionFlags::SCRIPT_EVENT))
                    .with_function(FunctionEntry::new(actor, "Destroy").with_flags(FunctionFlags::SCRIPT_CALLABLE)),
            )
            .unwrap();
        reflection
    }

    fn errors(reflection: &ReflectionRegistry, definition: ClassDefinition) -> Vec<ValidationError> {
        let definition = TypeDefinition::Class(definition);
        ValidationPass::new(reflection, &definition).run().errors
    }

    #[test]
    fn valid_override_resolves_parent_function() {
        let reflection = registry();
        let definition = TypeDefinition::Class(
            ClassDefinition::new("Hero")
                .with_parent("Actor")
                .with_method(method("begin_play", MethodFlags::OVERRIDE))
                .with_method(method("Jump", MethodFlags::empty())),
        );
        let output = ValidationPass::new(&reflection, &definition).run();
        assert!(output.is_ok(), "{:?}", output.errors);
        assert_eq!(output.parent, Some(TypeHash::from_name("Actor")));
        assert_eq!(output.overrides[0].as_ref().map(|f| f.name.as_str()), Some("BeginPlay"));
        assert!(output.overrides[1].is_none());
    }

    #[test]
    fn contradictory_flags() {
        let reflection = registry();
        let errs = errors(
            &reflection,
            ClassDefinition::new("Hero")
                .with_method(method("A", MethodFlags::GETTER | MethodFlags::SETTER | MethodFlags::PURE))
                .with_method(method("B", MethodFlags::STATIC | MethodFlags::GETTER | MethodFlags::PURE))
                .with_method(method("C", MethodFlags::GETTER))
                .with_method(method("D", MethodFlags::PURE | MethodFlags::IMPURE)),
        );
        assert!(matches!(errs[0], ValidationError::GetterAndSetter { .. }));
        assert!(matches!(errs[1], ValidationError::StaticAccessor { .. }));
        assert!(matches!(errs[2], ValidationError::GetterNotPure { .. }));
        assert!(matches!(errs[3], ValidationError::PureAndImpure { .. }));
        assert_eq!(errs.len(), 4);
    }

    #[test]
    fn override_rules() {
        let reflection = registry();
        let errs = errors(
            &reflection,
            ClassDefinition::new("Hero")
                .with_parent("Actor")
                .with_method(method("BeginPlay", MethodFlags::empty()))
                .with_method(method("Fly", MethodFlags::OVERRIDE))
                .with_method(method("Destroy", MethodFlags::OVERRIDE))
                .with_method(method("Tick", MethodFlags::OVERRIDE | MethodFlags::STATIC)),
        );
        assert_eq!(
            errs[0],
            ValidationError::MissingOverride {
                type_name: "Hero".into(),
                method: "BeginPlay".into(),
                parent: "Actor".into(),
            }
        );
        assert!(matches!(errs[1], ValidationError::NothingToOverride { .. }));
        assert!(matches!(errs[2], ValidationError::NotScriptEvent { .. }));
        assert!(matches!(errs[3], ValidationError::OverrideWithModifiers { .. }));
    }

    #[test]
    fn override_cannot_redeclare_signature() {
        let reflection = registry();
        let errs = errors(
            &reflection,
            ClassDefinition::new("Hero")
                .with_parent("Actor")
                .with_method(method("BeginPlay", MethodFlags::OVERRIDE).with_param("Delay", PropertyKind::F32)),
        );
        assert!(matches!(errs[0], ValidationError::OverrideWithSignature { .. }));
    }

    #[test]
    fn field_rules() {
        let reflection = registry();
        let errs = errors(
            &reflection,
            ClassDefinition::new("Hero")
                .with_parent("Actor")
                .with_field(FieldDefinition::new("health", PropertyKind::I32))
                .with_field(FieldDefinition::new("Mana", PropertyKind::I32).with_getter("GetMana"))
                .with_field(FieldDefinition::new("Mana", PropertyKind::I32)),
        );
        assert!(matches!(errs[0], ValidationError::DuplicateMember { .. }));
        assert!(matches!(
            &errs[1],
            ValidationError::FieldCollision { parent, .. } if parent == "Actor"
        ));
        assert!(matches!(&errs[2], ValidationError::UnknownAccessor { accessor, .. } if accessor == "GetMana"));
    }

    #[test]
    fn defaults_and_names() {
        let reflection = registry();
        let errs = errors(
            &reflection,
            ClassDefinition::new("Hero")
                .with_method(
                    method("Heal", MethodFlags::empty())
                        .with_param("Amount", PropertyKind::F32)
                        .with_default(1.0)
                        .with_default(2.0),
                )
                .with_field(FieldDefinition::new("", PropertyKind::I32)),
        );
        assert_eq!(errs[0], ValidationError::EmptyName);
        assert!(matches!(errs[1], ValidationError::TooManyDefaults { defaults: 2, params: 1, .. }));
        assert_eq!(errors(&reflection, ClassDefinition::new("")), vec![ValidationError::EmptyName]);
    }

    #[test]
    fn parent_category_must_match() {
        let reflection = registry();
        let definition = TypeDefinition::Struct(StructDefinition::new("Stats").with_parent("Actor"));
        let errs = ValidationPass::new(&reflection, &definition).run().errors;
        assert!(matches!(errs[0], ValidationError::UnknownParent { .. }));
    }
}
