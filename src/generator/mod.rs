//! Dynamic type generator.
//!
//! Turns script class and struct definitions into native reflected types
//! with script wrapper types on top.
//!
//! ## Pipeline
//!
//! ```text
//! define ──► validate ──► synthesize ──► finalize ──► (superseded)
//!              │              │              │
//!              ▼              ▼              ▼
//!        ValidationPass   Synthesis    registry + wrapper type
//! ```
//!
//! A definition that fails validation or synthesis leaves the registry
//! untouched, so a previous generation of the same name stays live.
//! Redefining a name supersedes the live generation: the old type is
//! renamed aside, its instances are queued for migration and every
//! script-defined subclass is regenerated against the new parent. The
//! subclasses are checked before any of this happens; one that fails
//! rejects the whole redefinition.

mod definition;
mod reinstance;
mod synthesize;
mod validate;

pub use definition::{
    ClassDefinition, FieldDefinition, MethodDefinition, MethodFlags, ParamDefinition, ReturnDefinition,
    StructDefinition, TypeDefinition,
};
pub use reinstance::PendingReinstance;
pub use validate::{ValidationOutput, ValidationPass};

use rustc_hash::FxHashMap;
use scriptbridge_core::{RegistrationError, TypeFlags, TypeHash};
use scriptbridge_registry::ReflectionRegistry;
use tracing::{debug, warn};

use crate::bridge::Bridge;
use crate::error::BridgeResult;
use crate::script::ScriptCallable;

use synthesize::Synthesis;

/// Generation history of one script-defined type name.
#[derive(Debug, Clone)]
pub struct GeneratedType {
    pub name: String,
    /// Generation of the live type, starting at 1.
    pub generation: u32,
    /// The live type.
    pub current: TypeHash,
    /// Superseded types, oldest first.
    pub history: Vec<TypeHash>,
    /// Definition the live type was generated from.
    pub definition: TypeDefinition,
}

/// Bookkeeping of script-defined types.
///
/// # Storage Model
///
/// - **Types**: one [`GeneratedType`] per defined name.
/// - **Callables**: an arena of script callables. Generated functions refer
///   to them by slot; slots are never reused, so functions of superseded
///   types keep calling their own callables.
/// - **Post-init hooks**: per generated class identity.
/// - **Pending**: migrations queued by redefinitions.
#[derive(Debug, Default)]
pub struct TypeGenerator {
    types: FxHashMap<String, GeneratedType>,
    callables: Vec<ScriptCallable>,
    post_init: FxHashMap<TypeHash, ScriptCallable>,
    pending: Vec<PendingReinstance>,
}

impl TypeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation history of a defined name.
    pub fn get(&self, name: &str) -> Option<&GeneratedType> {
        self.types.get(name)
    }

    /// The generated type whose live identity is `hash`.
    pub fn generated(&self, hash: TypeHash) -> Option<&GeneratedType> {
        self.types.values().find(|t| t.current == hash)
    }

    /// Check if `hash` is an older generation of some name.
    pub fn is_superseded(&self, hash: TypeHash) -> bool {
        self.types.values().any(|t| t.history.contains(&hash))
    }

    /// The script callable in `slot`.
    pub fn callable(&self, slot: u32) -> Option<ScriptCallable> {
        self.callables.get(slot as usize).cloned()
    }

    /// The post-init hook of a generated class.
    pub fn post_init_hook(&self, class: TypeHash) -> Option<ScriptCallable> {
        self.post_init.get(&class).cloned()
    }

    /// Number of defined names.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn record(&mut self, hash: TypeHash, generation: u32, definition: TypeDefinition) {
        let name = definition.name().to_string();
        match self.types.get_mut(&name) {
            Some(slot) => {
                slot.history.push(slot.current);
                slot.current = hash;
                slot.generation = generation;
                slot.definition = definition;
            }
            None => {
                self.types.insert(
                    name.clone(),
                    GeneratedType {
                        name,
                        generation,
                        current: hash,
                        history: Vec::new(),
                        definition,
                    },
                );
            }
        }
    }
}

impl Bridge {
    /// Generate a native class from a script definition.
    pub fn define_class(&mut self, definition: ClassDefinition) -> BridgeResult<TypeHash> {
        self.define_type(TypeDefinition::Class(definition))
    }

    /// Generate a native struct from a script definition.
    pub fn define_struct(&mut self, definition: StructDefinition) -> BridgeResult<TypeHash> {
        self.define_type(TypeDefinition::Struct(definition))
    }

    /// Generate a type, superseding any live generation of its name.
    ///
    /// Script-defined subclasses of a superseded class are regenerated
    /// through a worklist; native subclasses keep their old parent. The
    /// whole set is validated and synthesized on a scratch copy of the
    /// reflection registry first, so a subclass that no longer fits the new
    /// parent rejects the redefinition before anything live changes.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn define_type(&mut self, definition: TypeDefinition) -> BridgeResult<TypeHash> {
        let validated = ValidationPass::new(&self.reflection, &definition).run();
        let first_slot = self.generator.callables.len() as u32;
        let root = self.prepare_type(definition, validated, first_slot)?;
        let hash = root.hash;
        let superseded = root.previous.map(|(old, _)| old);
        let mut plan = vec![root];
        if let Some(old) = superseded {
            self.plan_subclasses(old, &mut plan)?;
        }
        for prepared in plan {
            self.install_type(prepared)?;
        }
        if self.config.auto_reinstance {
            self.process_pending_reinstancing()?;
        }
        Ok(hash)
    }

    /// Prepare the regeneration of every script subclass below `old`.
    fn plan_subclasses(&mut self, old: TypeHash, plan: &mut Vec<PreparedType>) -> BridgeResult<()> {
        let suffix = self.config.reinstance_suffix.clone();
        let mut scratch = self.reflection.clone();
        for prepared in plan.iter() {
            prepared.stage(&mut scratch, &suffix).map_err(|e| self.report(e.into()))?;
        }
        let mut worklist = vec![old];
        while let Some(old_parent) = worklist.pop() {
            for child in scratch.derived_classes(old_parent) {
                let Some(class) = scratch.class(child) else { continue };
                if class.flags.contains(TypeFlags::STALE) {
                    continue;
                }
                if class.is_native() {
                    debug!(class = %class.name, "native subclass keeps superseded parent");
                    continue;
                }
                let Some(definition) = self.generator.generated(child).map(|t| t.definition.clone()) else {
                    continue;
                };
                let validated = ValidationPass::new(&scratch, &definition).run();
                let first_slot = self.generator.callables.len() + plan.iter().map(|p| p.callable_count()).sum::<usize>();
                let prepared = self.prepare_type(definition, validated, first_slot as u32)?;
                prepared.stage(&mut scratch, &suffix).map_err(|e| self.report(e.into()))?;
                worklist.push(child);
                plan.push(prepared);
            }
        }
        Ok(())
    }

    /// Check and synthesize one definition without touching the registry.
    fn prepare_type(
        &mut self,
        definition: TypeDefinition,
        validated: ValidationOutput,
        first_slot: u32,
    ) -> BridgeResult<PreparedType> {
        if let Some(err) = validated.errors.first().cloned() {
            return Err(self.report(err.into()));
        }
        let name = definition.name().to_string();
        let previous = self.generator.get(&name).map(|t| (t.current, t.generation));
        let taken = self.reflection.find_by_name(&name).map(|e| e.type_hash());
        if taken.is_some() && taken != previous.map(|(hash, _)| hash) {
            return Err(self.report(RegistrationError::DuplicateType(name).into()));
        }

        let generation = previous.map_or(1, |(_, generation)| generation + 1);
        let hash = TypeHash::from_generation(&name, generation);
        if self.reflection.contains(hash) {
            return Err(self.report(RegistrationError::DuplicateType(name).into()));
        }
        let synthesis = self.synthesize_type(&definition, &validated, hash, first_slot)?;
        Ok(PreparedType {
            name,
            hash,
            generation,
            previous,
            definition,
            synthesis,
        })
    }

    /// Install a prepared type: rename the previous generation aside,
    /// register the new one and queue the migration.
    fn install_type(&mut self, prepared: PreparedType) -> BridgeResult<TypeHash> {
        let PreparedType {
            name,
            hash,
            generation,
            previous,
            definition,
            synthesis,
        } = prepared;
        let aside = previous.map(|(_, old_generation)| format!("{name}{}{old_generation}", self.config.reinstance_suffix));

        if let (Some((old, _)), Some(aside)) = (previous, &aside) {
            self.reflection.rename_aside(old, aside).map_err(|e| self.report(e.into()))?;
        }
        if let Err(err) = self.reflection.register(synthesis.entry) {
            if let Some((old, _)) = previous
                && let Err(undo) = self.reflection.reinstate(old, &name)
            {
                warn!(name = %name, error = %undo, "could not restore superseded type");
            }
            return Err(self.report(err.into()));
        }
        if let (Some((old, _)), Some(aside)) = (previous, aside) {
            if let Some(id) = self.types.lookup(old) {
                self.types.rename(id, aside.clone());
            }
            self.generator.pending.push(PendingReinstance { old, new: hash });
            debug!(name = %name, aside = %aside, generation, "superseded script type");
        }

        self.generator.callables.extend(synthesis.callables);
        if let TypeDefinition::Class(class) = &definition
            && let Some(hook) = &class.post_init
        {
            self.generator.post_init.insert(hash, hook.clone());
        }
        self.generator.record(hash, generation, definition);
        let wrapper = self.wrapper_type(hash);
        debug!(name = %name, generation, ?wrapper, "generated script type");
        Ok(hash)
    }
}

/// A validated and synthesized definition, not yet installed.
#[derive(Debug)]
struct PreparedType {
    name: String,
    hash: TypeHash,
    generation: u32,
    /// Live identity and generation this type supersedes.
    previous: Option<(TypeHash, u32)>,
    definition: TypeDefinition,
    synthesis: Synthesis,
}

impl PreparedType {
    fn callable_count(&self) -> usize {
        self.synthesis.callables.len()
    }

    /// Apply the rename and registration to a scratch registry.
    fn stage(&self, reflection: &mut ReflectionRegistry, suffix: &str) -> Result<(), RegistrationError> {
        if let Some((old, old_generation)) = self.previous {
            reflection.rename_aside(old, &format!("{}{suffix}{old_generation}", self.name))?;
        }
        reflection.register(self.synthesis.entry.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeConfig;
    use crate::error::{BridgeError, ValidationError};
    use crate::script::ScriptValue;
    use scriptbridge_core::{ClassEntry, PropertyKind};

    fn speed_car() -> ClassDefinition {
        ClassDefinition::new("Car").with_field(FieldDefinition::new("Speed", PropertyKind::I32))
    }

    #[test]
    fn generated_fields_round_trip() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let car = bridge.define_class(speed_car()).unwrap();
        assert_eq!(bridge.generator().get("Car").map(|t| t.generation), Some(1));

        let object = bridge.new_object(car).unwrap();
        bridge.set_attr(&object, "Speed", &ScriptValue::Int(88)).unwrap();
        assert_eq!(bridge.get_attr(&object, "Speed").unwrap(), ScriptValue::Int(88));
        assert!(bridge.runtime().attribute("ScriptGenerated", "Car").is_some());
    }

    #[test]
    fn redefinition_supersedes() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let first = bridge.define_class(speed_car()).unwrap();
        let object = bridge.new_object(first).unwrap();
        bridge.set_attr(&object, "Speed", &ScriptValue::Int(5)).unwrap();

        let second = bridge
            .define_class(speed_car().with_field(FieldDefinition::new("Gear", PropertyKind::U8)))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(bridge.reflection().type_name(first), "Car_REINST1");
        assert_eq!(bridge.reflection().find_by_name("Car").map(|e| e.type_hash()), Some(second));
        assert!(bridge.generator().is_superseded(first));
        assert!(bridge.pending_reinstance().is_empty());

        assert_eq!(bridge.get_attr(&object, "Speed").unwrap(), ScriptValue::Int(5));
        assert_eq!(bridge.get_attr(&object, "Gear").unwrap(), ScriptValue::Int(0));
    }

    #[test]
    fn rejected_redefinition_keeps_live_type() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let first = bridge.define_class(speed_car()).unwrap();
        let err = bridge
            .define_class(speed_car().with_parent("Missing"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(ValidationError::UnknownParent { .. })));
        assert!(bridge.runtime().has_error());
        assert_eq!(bridge.reflection().find_by_name("Car").map(|e| e.type_hash()), Some(first));
        assert_eq!(bridge.generator().get("Car").map(|t| t.generation), Some(1));
    }

    #[test]
    fn native_names_cannot_be_redefined() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        bridge.reflection_mut().register_class(ClassEntry::new("Car", "Game")).unwrap();
        let err = bridge.define_class(speed_car()).unwrap_err();
        assert!(matches!(err, BridgeError::Registration(RegistrationError::DuplicateType(_))));
    }

    #[test]
    fn subclasses_follow_their_parent() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        bridge.define_class(speed_car()).unwrap();
        let sports = bridge
            .define_class(
                ClassDefinition::new("SportsCar")
                    .with_parent("Car")
                    .with_field(FieldDefinition::new("Turbo", PropertyKind::Bool)),
            )
            .unwrap();
        let object = bridge.new_object(sports).unwrap();
        bridge.set_attr(&object, "Turbo", &ScriptValue::Bool(true)).unwrap();

        let car = bridge
            .define_class(speed_car().with_field(FieldDefinition::new("Gear", PropertyKind::U8)))
            .unwrap();
        let regenerated = bridge.generator().get("SportsCar").map(|t| t.current).unwrap();
        assert_ne!(regenerated, sports);
        assert_eq!(bridge.reflection().class(regenerated).unwrap().super_class, Some(car));
        assert_eq!(bridge.heap().get(object.as_wrapper().unwrap().object_handle().unwrap()).unwrap().class, regenerated);
        assert_eq!(bridge.get_attr(&object, "Turbo").unwrap(), ScriptValue::Bool(true));
        assert_eq!(bridge.get_attr(&object, "Gear").unwrap(), ScriptValue::Int(0));
    }

    #[test]
    fn failing_subclass_rejects_redefinition() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let car = bridge.define_class(speed_car()).unwrap();
        let sports = bridge
            .define_class(
                ClassDefinition::new("SportsCar")
                    .with_parent("Car")
                    .with_field(FieldDefinition::new("Gear", PropertyKind::U8)),
            )
            .unwrap();
        let object = bridge.new_object(car).unwrap();
        bridge.set_attr(&object, "Speed", &ScriptValue::Int(3)).unwrap();

        let err = bridge
            .define_class(speed_car().with_field(FieldDefinition::new("Gear", PropertyKind::U8)))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(ValidationError::FieldCollision { .. })));
        assert!(bridge.runtime().has_error());
        assert_eq!(bridge.reflection().find_by_name("Car").map(|e| e.type_hash()), Some(car));
        assert_eq!(bridge.reflection().type_name(car), "Car");
        assert_eq!(bridge.generator().get("Car").map(|t| t.generation), Some(1));
        assert_eq!(bridge.generator().get("SportsCar").map(|t| t.current), Some(sports));
        assert!(bridge.pending_reinstance().is_empty());
        assert_eq!(bridge.get_attr(&object, "Speed").unwrap(), ScriptValue::Int(3));
    }

    #[test]
    fn taken_identity_leaves_live_type_alone() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let car = bridge.define_class(speed_car()).unwrap();
        let mut squatter = ClassEntry::new("Squatter", "Game");
        squatter.type_hash = TypeHash::from_generation("Car", 2);
        bridge.reflection_mut().register_class(squatter).unwrap();

        let err = bridge.define_class(speed_car()).unwrap_err();
        assert!(matches!(err, BridgeError::Registration(RegistrationError::DuplicateType(_))));
        assert_eq!(bridge.reflection().find_by_name("Car").map(|e| e.type_hash()), Some(car));
        assert!(!bridge.generator().is_superseded(car));
        assert!(bridge.pending_reinstance().is_empty());
    }
}
