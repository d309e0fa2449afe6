//! TypeRegistry - lazy generation and caching of wrapper types.
//!
//! # Storage Model
//!
//! - **Types**: an arena of [`WrapperType`]s indexed by [`WrapperTypeId`].
//!   Entries are never removed, so an id stays valid for as long as scripts
//!   may hold it.
//! - **Live map**: reflected identity to wrapper type. At most one live
//!   wrapper type exists per reflected type.
//! - **Generating**: reflected types whose generation is in progress.
//! - **Orphans**: wrapper types whose module was unloaded. They keep
//!   working for existing script references but are never reused; loading
//!   the module again generates fresh entries.
//!
//! Generation of one type recursively ensures its ancestors (a chain, so
//! bounded), while every other referenced type goes through a worklist.
//! Cyclic references therefore terminate and never grow the stack.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use scriptbridge_core::{FunctionFlags, TypeEntry, TypeFlags, TypeHash};
use scriptbridge_registry::ReflectionRegistry;

use crate::config::BridgeConfig;
use crate::script::{ScriptRuntime, ScriptValue};

use super::naming::{SCRIPT_NAME_KEY, function_script_name, method_doc, property_doc, script_name_of};
use super::{GetSet, MethodDef, SCRIPT_GETTER_KEY, SCRIPT_SETTER_KEY, WrapperType, WrapperTypeId, WrapperTypeKind};

/// Where a reflected type stands in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Generating,
    Registered(WrapperTypeId),
}

/// Registry of script wrapper types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<WrapperType>,
    by_reflected: FxHashMap<TypeHash, WrapperTypeId>,
    generating: FxHashSet<TypeHash>,
    orphans: Vec<WrapperTypeId>,
}

/// Types scripts may see without being asked for explicitly.
fn is_exported(entry: &TypeEntry) -> bool {
    matches!(entry, TypeEntry::Signature(_))
        || entry
            .flags()
            .intersects(TypeFlags::EXPORTED | TypeFlags::SCRIPT_GENERATED)
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, id: WrapperTypeId) -> Option<&WrapperType> {
        self.types.get(id.index())
    }

    /// The live wrapper type of a reflected type, without generating it.
    pub fn lookup(&self, reflected: TypeHash) -> Option<WrapperTypeId> {
        self.by_reflected.get(&reflected).copied()
    }

    pub fn state(&self, reflected: TypeHash) -> RegistrationState {
        if let Some(id) = self.lookup(reflected) {
            RegistrationState::Registered(id)
        } else if self.generating.contains(&reflected) {
            RegistrationState::Generating
        } else {
            RegistrationState::Unregistered
        }
    }

    /// Number of wrapper types ever generated, orphans included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn orphans(&self) -> &[WrapperTypeId] {
        &self.orphans
    }

    /// The wrapper type of `class` or of its nearest ancestor that has one.
    pub fn nearest_wrapper_type(&self, reflection: &ReflectionRegistry, class: TypeHash) -> Option<WrapperTypeId> {
        reflection
            .super_chain(class)
            .into_iter()
            .find_map(|h| self.lookup(h))
    }

    /// Wrapper type `id` followed by each of its bases.
    pub fn base_chain(&self, id: WrapperTypeId) -> Vec<WrapperTypeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            if chain.contains(&id) {
                break;
            }
            let Some(ty) = self.get(id) else { break };
            chain.push(id);
            current = ty.base;
        }
        chain
    }

    /// Find an accessor on `id` or its bases.
    pub fn find_getset(&self, id: WrapperTypeId, script_name: &str) -> Option<&GetSet> {
        self.base_chain(id)
            .into_iter()
            .find_map(|id| self.get(id)?.find_getset(script_name))
    }

    /// Find a method on `id` or its bases.
    pub fn find_method(&self, id: WrapperTypeId, script_name: &str) -> Option<&MethodDef> {
        self.base_chain(id)
            .into_iter()
            .find_map(|id| self.get(id)?.find_method(script_name))
    }

    // ==========================================================================
    // Generation
    // ==========================================================================

    /// Return the wrapper type of `reflected`, generating it on first use.
    ///
    /// Returns `None` for unknown types and for types not exported to
    /// scripts. Every type referenced by the new wrapper type's accessors
    /// and methods is generated before returning.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_or_generate(
        &mut self,
        reflection: &ReflectionRegistry,
        runtime: &mut ScriptRuntime,
        config: &BridgeConfig,
        reflected: TypeHash,
    ) -> Option<WrapperTypeId> {
        if let Some(id) = self.lookup(reflected) {
            return Some(id);
        }
        let mut pending = Vec::new();
        let id = self.generate(reflection, runtime, config, reflected, false, &mut pending);
        while let Some(next) = pending.pop() {
            if self.state(next) != RegistrationState::Unregistered {
                continue;
            }
            self.generate(reflection, runtime, config, next, false, &mut pending);
        }
        id
    }

    /// Generate every exported type declared by `module`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generate_for_module(
        &mut self,
        reflection: &ReflectionRegistry,
        runtime: &mut ScriptRuntime,
        config: &BridgeConfig,
        module: &str,
    ) -> Vec<WrapperTypeId> {
        reflection
            .types_in_module(module)
            .into_iter()
            .filter_map(|hash| self.get_or_generate(reflection, runtime, config, hash))
            .collect()
    }

    fn generate(
        &mut self,
        reflection: &ReflectionRegistry,
        runtime: &mut ScriptRuntime,
        config: &BridgeConfig,
        reflected: TypeHash,
        force: bool,
        pending: &mut Vec<TypeHash>,
    ) -> Option<WrapperTypeId> {
        match self.state(reflected) {
            RegistrationState::Registered(id) => return Some(id),
            RegistrationState::Generating => return None,
            RegistrationState::Unregistered => {}
        }
        let entry = reflection.get(reflected)?;
        if !force && !is_exported(entry) {
            return None;
        }
        self.generating.insert(reflected);

        let base = entry
            .super_type()
            .and_then(|parent| self.generate(reflection, runtime, config, parent, true, pending));

        let id = WrapperTypeId(self.types.len() as u32);
        let name = entry
            .metadata(SCRIPT_NAME_KEY)
            .map(str::to_string)
            .unwrap_or_else(|| entry.name().to_string());
        let module = entry
            .module()
            .map(str::to_string)
            .unwrap_or_else(|| config.generated_module.clone());
        let mut ty = WrapperType {
            id,
            name,
            reflected,
            kind: WrapperTypeKind::Class,
            base,
            module,
            getsets: Vec::new(),
            methods: Vec::new(),
            enum_values: Vec::new(),
            doc: String::new(),
            orphaned: false,
        };

        let mut referenced = Vec::new();
        match entry {
            TypeEntry::Class(class) => {
                synthesize_getsets(&mut ty, &class.properties, reflection, config, &mut referenced);
                let hidden: Vec<&str> = ty
                    .getsets
                    .iter()
                    .flat_map(|g| g.getter.iter().chain(g.setter.iter()))
                    .map(String::as_str)
                    .collect();
                let methods: Vec<MethodDef> = class
                    .functions
                    .iter()
                    .filter(|f| f.flags.intersects(FunctionFlags::SCRIPT_CALLABLE | FunctionFlags::SCRIPT_EVENT))
                    .filter(|f| !hidden.contains(&f.name.as_str()))
                    .map(|f| {
                        for param in &f.params {
                            param.kind.referenced_types(&mut referenced);
                        }
                        let script_name = function_script_name(f);
                        MethodDef {
                            doc: method_doc(&script_name, f, reflection),
                            script_name,
                            native_name: f.name.clone(),
                            function: f.type_hash,
                            is_static: f.is_static(),
                            defaults: f
                                .input_params()
                                .map(|(_, p)| f.metadata(&config.default_key(&p.name)).map(str::to_string))
                                .collect(),
                        }
                    })
                    .collect();
                ty.methods = methods;
                ty.doc = class_doc(&ty, &class.name, entry, reflection, "class");
            }
            TypeEntry::Struct(structure) => {
                ty.kind = WrapperTypeKind::Struct;
                synthesize_getsets(&mut ty, &structure.properties, reflection, config, &mut referenced);
                ty.doc = class_doc(&ty, &structure.name, entry, reflection, "struct");
            }
            TypeEntry::Enum(enumeration) => {
                ty.kind = WrapperTypeKind::Enum;
                ty.enum_values = enumeration.values.clone();
                ty.doc = format!("enum {} ({} values)", enumeration.name, enumeration.values.len());
            }
            TypeEntry::Signature(signature) => {
                ty.kind = WrapperTypeKind::Delegate;
                for param in &signature.params {
                    param.kind.referenced_types(&mut referenced);
                }
                ty.doc = method_doc(&ty.name, signature, reflection);
            }
        }

        pending.extend(referenced.into_iter().filter(|h| *h != reflected));
        runtime.set_attribute(&ty.module, ty.name.clone(), ScriptValue::Type(id));
        debug!(
            name = %ty.name,
            module = %ty.module,
            getsets = ty.getsets.len(),
            methods = ty.methods.len(),
            "generated wrapper type"
        );
        self.types.push(ty);
        self.by_reflected.insert(reflected, id);
        self.generating.remove(&reflected);
        Some(id)
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// Move every live wrapper type of `module` to the orphan set.
    ///
    /// Returns the orphaned ids.
    pub fn orphan_module(&mut self, module: &str, runtime: &mut ScriptRuntime) -> Vec<WrapperTypeId> {
        let mut orphaned: Vec<WrapperTypeId> = self
            .by_reflected
            .values()
            .copied()
            .filter(|id| self.types[id.index()].module == module)
            .collect();
        orphaned.sort();
        for id in &orphaned {
            let ty = &mut self.types[id.index()];
            ty.orphaned = true;
            self.by_reflected.remove(&ty.reflected);
            if runtime.attribute(module, &ty.name) == Some(&ScriptValue::Type(*id)) {
                runtime.remove_attribute(module, &ty.name);
            }
        }
        debug!(module = %module, count = orphaned.len(), "orphaned wrapper types");
        self.orphans.extend(orphaned.iter().copied());
        orphaned
    }

    /// Rename a wrapper type whose reflected type was renamed aside.
    pub fn rename(&mut self, id: WrapperTypeId, name: impl Into<String>) {
        if let Some(ty) = self.types.get_mut(id.index()) {
            ty.name = name.into();
        }
    }
}

fn synthesize_getsets(
    ty: &mut WrapperType,
    properties: &[scriptbridge_core::PropertyDescriptor],
    reflection: &ReflectionRegistry,
    config: &BridgeConfig,
    referenced: &mut Vec<TypeHash>,
) {
    for property in properties.iter().filter(|p| p.flags.is_script_readable()) {
        property.kind.referenced_types(referenced);
        let script_name = script_name_of(property);
        let getter = property.metadata(SCRIPT_GETTER_KEY).map(str::to_string);
        let setter = property.metadata(SCRIPT_SETTER_KEY).map(str::to_string);
        let doc = property_doc(property, reflection);
        if getter.is_some() || setter.is_some() {
            ty.getsets.push(GetSet {
                script_name: format!("{}{}", config.internal_accessor_prefix, script_name),
                property: property.clone(),
                getter: None,
                setter: None,
                doc: doc.clone(),
            });
        }
        ty.getsets.push(GetSet {
            script_name,
            property: property.clone(),
            getter,
            setter,
            doc,
        });
    }
}

fn class_doc(ty: &WrapperType, native: &str, entry: &TypeEntry, reflection: &ReflectionRegistry, category: &str) -> String {
    let mut doc = match entry.super_type() {
        Some(parent) => format!("{category} {native}({})", reflection.type_name(parent)),
        None => format!("{category} {native}"),
    };
    if let Some(tooltip) = entry.metadata("ToolTip") {
        doc.push_str("\n\n");
        doc.push_str(tooltip);
    }
    for getset in &ty.getsets {
        doc.push_str(&format!("\n- {} {}", getset.script_name, getset.doc));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbridge_core::{ClassEntry, FunctionEntry, PropertyDescriptor, PropertyKind, StructEntry};

    fn fixture() -> (ReflectionRegistry, ScriptRuntime, BridgeConfig) {
        (ReflectionRegistry::new(), ScriptRuntime::default(), BridgeConfig::default())
    }

    #[test]
    fn registration_is_idempotent() {
        let (mut reflection, mut runtime, config) = fixture();
        let car = reflection
            .register_class(ClassEntry::new("Car", "Game").with_property(PropertyDescriptor::editable("MaxSpeed", PropertyKind::F32)))
            .unwrap();
        let mut types = TypeRegistry::new();
        let first = types.get_or_generate(&reflection, &mut runtime, &config, car).unwrap();
        let second = types.get_or_generate(&reflection, &mut runtime, &config, car).unwrap();
        assert_eq!(first, second);
        assert_eq!(types.len(), 1);
        assert_eq!(types.state(car), RegistrationState::Registered(first));
        assert!(types.get(first).unwrap().find_getset("max_speed").is_some());
        assert_eq!(runtime.attribute("Game", "Car"), Some(&ScriptValue::Type(first)));
    }

    #[test]
    fn unexported_types_stay_unregistered() {
        let (mut reflection, mut runtime, config) = fixture();
        let hidden = reflection
            .register_class(ClassEntry::new("Hidden", "Game").without_flags(TypeFlags::EXPORTED))
            .unwrap();
        let mut types = TypeRegistry::new();
        assert!(types.get_or_generate(&reflection, &mut runtime, &config, hidden).is_none());
        assert_eq!(types.state(hidden), RegistrationState::Unregistered);
    }

    #[test]
    fn unexported_parent_is_forced() {
        let (mut reflection, mut runtime, config) = fixture();
        let base = reflection
            .register_class(ClassEntry::new("Base", "Game").without_flags(TypeFlags::EXPORTED))
            .unwrap();
        let derived = reflection
            .register_class(ClassEntry::new("Derived", "Game").with_super(base))
            .unwrap();
        let mut types = TypeRegistry::new();
        let id = types.get_or_generate(&reflection, &mut runtime, &config, derived).unwrap();
        let base_id = types.lookup(base).unwrap();
        assert_eq!(types.get(id).unwrap().base, Some(base_id));
        assert_eq!(types.nearest_wrapper_type(&reflection, derived), Some(id));
    }

    #[test]
    fn cyclic_references_register_once() {
        let (mut reflection, mut runtime, config) = fixture();
        let a = TypeHash::from_name("Node");
        let b = TypeHash::from_name("Edge");
        reflection
            .register_class(ClassEntry::new("Node", "Graph").with_property(PropertyDescriptor::editable(
                "Edges",
                PropertyKind::array(PropertyKind::Object { class: b }),
            )))
            .unwrap();
        reflection
            .register_class(
                ClassEntry::new("Edge", "Graph").with_property(PropertyDescriptor::editable("From", PropertyKind::Object { class: a })),
            )
            .unwrap();
        let mut types = TypeRegistry::new();
        types.get_or_generate(&reflection, &mut runtime, &config, a).unwrap();
        assert_eq!(types.len(), 2);
        assert!(types.lookup(b).is_some());
        types.get_or_generate(&reflection, &mut runtime, &config, b).unwrap();
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn hidden_properties_are_not_mirrored() {
        let (mut reflection, mut runtime, config) = fixture();
        let engine = reflection
            .register_struct(StructEntry::new("Engine", "Game").with_property(PropertyDescriptor::editable("Power", PropertyKind::I32)))
            .unwrap();
        let car = reflection
            .register_class(
                ClassEntry::new("Car", "Game")
                    .with_property(PropertyDescriptor::editable("Speed", PropertyKind::I32))
                    .with_property(PropertyDescriptor::new("Engine", PropertyKind::Struct { struct_type: engine })),
            )
            .unwrap();
        let mut types = TypeRegistry::new();
        let id = types.get_or_generate(&reflection, &mut runtime, &config, car).unwrap();
        let ty = types.get(id).unwrap();
        assert!(ty.find_getset("speed").is_some());
        assert!(ty.find_getset("engine").is_none());
        assert!(!ty.doc.contains("engine"));
        assert!(types.lookup(engine).is_none());
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn accessors_and_methods() {
        let (mut reflection, mut runtime, config) = fixture();
        let class = ClassEntry::new("Door", "Game")
            .with_property(
                PropertyDescriptor::editable("bIsOpen", PropertyKind::Bool)
                    .with_metadata(SCRIPT_GETTER_KEY, "GetIsOpen"),
            )
            .with_function(FunctionEntry::new(TypeHash::EMPTY, "GetIsOpen").with_flags(FunctionFlags::SCRIPT_CALLABLE))
            .with_function(
                FunctionEntry::new(TypeHash::EMPTY, "OpenBy")
                    .with_flags(FunctionFlags::SCRIPT_CALLABLE)
                    .with_param(PropertyDescriptor::param("Amount", PropertyKind::F32))
                    .with_metadata("CPP_Default_Amount", "1.0"),
            )
            .with_function(FunctionEntry::new(TypeHash::EMPTY, "Internal"));
        let hash = reflection.register_class(class).unwrap();
        let mut types = TypeRegistry::new();
        let id = types.get_or_generate(&reflection, &mut runtime, &config, hash).unwrap();
        let ty = types.get(id).unwrap();

        assert_eq!(ty.find_getset("is_open").unwrap().getter.as_deref(), Some("GetIsOpen"));
        assert!(ty.find_getset("_is_open").unwrap().getter.is_none());
        let names: Vec<_> = ty.methods.iter().map(|m| m.script_name.as_str()).collect();
        assert_eq!(names, vec!["open_by"]);
        assert_eq!(ty.methods[0].defaults, vec![Some("1.0".to_string())]);
    }

    #[test]
    fn orphaned_types_are_not_reused() {
        let (mut reflection, mut runtime, config) = fixture();
        let vector = reflection
            .register_struct(StructEntry::new("Vector", "Math").with_property(PropertyDescriptor::editable("X", PropertyKind::F64)))
            .unwrap();
        let mut types = TypeRegistry::new();
        let ids = types.generate_for_module(&reflection, &mut runtime, &config, "Math");
        assert_eq!(ids.len(), 1);

        let orphaned = types.orphan_module("Math", &mut runtime);
        assert_eq!(orphaned, ids);
        assert!(types.get(ids[0]).unwrap().orphaned);
        assert!(runtime.attribute("Math", "Vector").is_none());
        assert_eq!(types.state(vector), RegistrationState::Unregistered);

        let fresh = types.get_or_generate(&reflection, &mut runtime, &config, vector).unwrap();
        assert_ne!(fresh, ids[0]);
        assert_eq!(types.orphans(), ids.as_slice());
    }
}
