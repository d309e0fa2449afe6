//! ReflectionRegistry - storage and queries for reflected native types.
//!
//! # Storage Model
//!
//! - **Types**: every entry (`TypeEntry`) stored in a single map by `TypeHash`.
//! - **Names**: a discoverable-name index. Superseded types are renamed aside
//!   and dropped from this index, but stay in the type map so existing
//!   instances keep working.
//! - **Modules**: declaring module to types, in registration order.
//!
//! Classes and structs store only their own members. Inherited members are
//! resolved by walking the parent chain, and the field layout of a type is
//! always its parent's layout followed by its own properties.
//!
//! # Thread Safety
//!
//! `ReflectionRegistry` is **not thread-safe**. It is owned by the bridge and
//! mutated only from the thread that holds the scripting runtime.

use rustc_hash::FxHashMap;
use tracing::debug;

use scriptbridge_core::layout::{TypeLayout, default_struct};
use scriptbridge_core::{
    ClassEntry, EnumEntry, FunctionEntry, NativeValue, ObjectHandle, ObjectHeap, PropertyDescriptor,
    RegistrationError, StructEntry, TypeEntry, TypeFlags, TypeHash,
};

/// Registry of reflected native types.
///
/// Cloning gives an independent scratch copy; the generator stages
/// redefinitions on one before touching the live registry.
#[derive(Debug, Default, Clone)]
pub struct ReflectionRegistry {
    /// All types by identity, including superseded ones.
    types: FxHashMap<TypeHash, TypeEntry>,
    /// Discoverable name -> identity.
    by_name: FxHashMap<String, TypeHash>,
    /// Module -> types, in registration order.
    by_module: FxHashMap<String, Vec<TypeHash>>,
}

impl ReflectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a type.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` if the identity or the discoverable name is taken.
    pub fn register(&mut self, entry: TypeEntry) -> Result<TypeHash, RegistrationError> {
        let hash = entry.type_hash();
        let name = entry.name().to_string();
        if self.types.contains_key(&hash) || self.by_name.contains_key(&name) {
            return Err(RegistrationError::DuplicateType(name));
        }
        if let Some(module) = entry.module() {
            self.by_module.entry(module.to_string()).or_default().push(hash);
        }
        debug!(name = %name, hash = %hash, "registered reflected type");
        self.by_name.insert(name, hash);
        self.types.insert(hash, entry);
        Ok(hash)
    }

    pub fn register_class(&mut self, class: ClassEntry) -> Result<TypeHash, RegistrationError> {
        self.register(TypeEntry::Class(class))
    }

    pub fn register_struct(&mut self, entry: StructEntry) -> Result<TypeHash, RegistrationError> {
        self.register(TypeEntry::Struct(entry))
    }

    pub fn register_enum(&mut self, entry: EnumEntry) -> Result<TypeHash, RegistrationError> {
        self.register(TypeEntry::Enum(entry))
    }

    /// Register a delegate signature.
    pub fn register_signature(&mut self, signature: FunctionEntry) -> Result<TypeHash, RegistrationError> {
        self.register(TypeEntry::Signature(signature))
    }

    /// Remove a type entirely. Used to discard a type that never became visible.
    pub fn remove(&mut self, hash: TypeHash) -> Option<TypeEntry> {
        let entry = self.types.remove(&hash)?;
        if self.by_name.get(entry.name()) == Some(&hash) {
            self.by_name.remove(entry.name());
        }
        if let Some(module) = entry.module()
            && let Some(list) = self.by_module.get_mut(module)
        {
            list.retain(|h| *h != hash);
        }
        Some(entry)
    }

    /// Rename a type out of the way and mark it superseded.
    ///
    /// The type keeps its identity and stays resolvable by hash, but is no
    /// longer discoverable by name.
    pub fn rename_aside(&mut self, hash: TypeHash, new_name: &str) -> Result<(), RegistrationError> {
        let entry = self
            .types
            .get_mut(&hash)
            .ok_or_else(|| RegistrationError::TypeNotFound(hash.to_string()))?;
        if self.by_name.get(entry.name()) == Some(&hash) {
            self.by_name.remove(entry.name());
        }
        debug!(old = %entry.name(), new = %new_name, "renamed superseded type");
        entry.rename(new_name);
        entry.set_flags(TypeFlags::STALE | TypeFlags::NEWER_VERSION_EXISTS, true);
        Ok(())
    }

    /// Undo [`rename_aside`](Self::rename_aside): restore `name` and clear
    /// the superseded flags.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateType` if another type took `name` meanwhile.
    pub fn reinstate(&mut self, hash: TypeHash, name: &str) -> Result<(), RegistrationError> {
        if self.by_name.get(name).is_some_and(|h| *h != hash) {
            return Err(RegistrationError::DuplicateType(name.to_string()));
        }
        let entry = self
            .types
            .get_mut(&hash)
            .ok_or_else(|| RegistrationError::TypeNotFound(hash.to_string()))?;
        entry.rename(name);
        entry.set_flags(TypeFlags::STALE | TypeFlags::NEWER_VERSION_EXISTS, false);
        self.by_name.insert(name.to_string(), hash);
        Ok(())
    }

    /// Point a class or struct at a new parent.
    pub fn set_super(&mut self, hash: TypeHash, parent: TypeHash) -> Result<(), RegistrationError> {
        match self.types.get_mut(&hash) {
            Some(TypeEntry::Class(c)) => c.super_class = Some(parent),
            Some(TypeEntry::Struct(s)) => s.super_struct = Some(parent),
            Some(other) => {
                return Err(RegistrationError::WrongCategory {
                    name: other.name().to_string(),
                    expected: "class or struct",
                });
            }
            None => return Err(RegistrationError::TypeNotFound(hash.to_string())),
        }
        Ok(())
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn get_mut(&mut self, hash: TypeHash) -> Option<&mut TypeEntry> {
        self.types.get_mut(&hash)
    }

    pub fn contains(&self, hash: TypeHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Find a discoverable type by name.
    pub fn find_by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).and_then(|h| self.types.get(h))
    }

    pub fn class(&self, hash: TypeHash) -> Option<&ClassEntry> {
        self.get(hash).and_then(TypeEntry::as_class)
    }

    pub fn struct_entry(&self, hash: TypeHash) -> Option<&StructEntry> {
        self.get(hash).and_then(TypeEntry::as_struct)
    }

    pub fn enum_entry(&self, hash: TypeHash) -> Option<&EnumEntry> {
        self.get(hash).and_then(TypeEntry::as_enum)
    }

    pub fn signature(&self, hash: TypeHash) -> Option<&FunctionEntry> {
        self.get(hash).and_then(TypeEntry::as_signature)
    }

    /// Display name of a type, falling back to its hash.
    pub fn type_name(&self, hash: TypeHash) -> String {
        self.get(hash)
            .map(|e| e.name().to_string())
            .unwrap_or_else(|| hash.to_string())
    }

    /// Types declared by a module, in registration order.
    pub fn types_in_module(&self, module: &str) -> Vec<TypeHash> {
        self.by_module.get(module).cloned().unwrap_or_default()
    }

    /// Every registered identity.
    pub fn all_types(&self) -> impl Iterator<Item = TypeHash> + '_ {
        self.types.keys().copied()
    }

    // ==========================================================================
    // Hierarchy
    // ==========================================================================

    /// The type followed by each of its ancestors.
    pub fn super_chain(&self, hash: TypeHash) -> Vec<TypeHash> {
        let mut chain = Vec::new();
        let mut current = Some(hash);
        while let Some(h) = current {
            if chain.contains(&h) {
                break;
            }
            let Some(entry) = self.get(h) else { break };
            chain.push(h);
            current = entry.super_type();
        }
        chain
    }

    /// Check if `hash` is `ancestor` or derives from it.
    pub fn is_a(&self, hash: TypeHash, ancestor: TypeHash) -> bool {
        self.super_chain(hash).contains(&ancestor)
    }

    /// Classes whose direct parent is `parent`.
    pub fn derived_classes(&self, parent: TypeHash) -> Vec<TypeHash> {
        let mut derived: Vec<_> = self
            .types
            .values()
            .filter_map(|e| match e {
                TypeEntry::Class(c) if c.super_class == Some(parent) => Some(c.type_hash),
                _ => None,
            })
            .collect();
        derived.sort();
        derived
    }

    /// Find a property by name on the type or its ancestors.
    ///
    /// Returns the declaring type alongside the descriptor.
    pub fn find_property(&self, hash: TypeHash, name: &str) -> Option<(TypeHash, &PropertyDescriptor)> {
        self.super_chain(hash).into_iter().find_map(|h| {
            self.get(h)?
                .properties()
                .iter()
                .find(|p| p.name == name)
                .map(|p| (h, p))
        })
    }

    /// Find a function by name on the class or its ancestors.
    pub fn find_function(&self, class: TypeHash, name: &str) -> Option<&FunctionEntry> {
        self.super_chain(class)
            .into_iter()
            .find_map(|h| self.class(h)?.find_function(name))
    }

    /// Flattened field layout, inherited fields first.
    pub fn layout(&self, hash: TypeHash) -> Vec<PropertyDescriptor> {
        let mut chain = self.super_chain(hash);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|h| self.get(h))
            .flat_map(|e| e.properties().iter().cloned())
            .collect()
    }

    /// Layout index and descriptor of a field.
    ///
    /// When a name is declared more than once along the chain, the most
    /// derived declaration wins.
    pub fn field_index(&self, hash: TypeHash, name: &str) -> Option<(usize, PropertyDescriptor)> {
        self.layout(hash)
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.name == name)
            .last()
    }

    // ==========================================================================
    // Instances
    // ==========================================================================

    /// Default field block of a class or struct.
    pub fn default_fields(&self, hash: TypeHash) -> NativeValue {
        NativeValue::Struct(default_struct(hash, self))
    }

    /// Allocate a default-initialized native object of `class`.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound` if `class` is not a registered class.
    pub fn instantiate(&self, heap: &mut ObjectHeap, class: TypeHash) -> Result<ObjectHandle, RegistrationError> {
        let entry = self
            .class(class)
            .ok_or_else(|| RegistrationError::TypeNotFound(class.to_string()))?;
        let name = format!("{}_{}", entry.name, heap.len());
        Ok(heap.allocate(class, name, self.default_fields(class)))
    }
}

impl TypeLayout for ReflectionRegistry {
    fn fields_of(&self, type_hash: TypeHash) -> Option<Vec<PropertyDescriptor>> {
        self.contains(type_hash).then(|| self.layout(type_hash))
    }

    fn enum_of(&self, type_hash: TypeHash) -> Option<&EnumEntry> {
        self.enum_entry(type_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbridge_core::{NumericKind, PropertyKind};

    fn vehicles() -> ReflectionRegistry {
        let mut registry = ReflectionRegistry::new();
        let vehicle = ClassEntry::new("Vehicle", "Game")
            .with_property(PropertyDescriptor::editable("Wheels", PropertyKind::I32))
            .with_function(FunctionEntry::new(TypeHash::EMPTY, "Honk"));
        let vehicle_hash = registry.register_class(vehicle).unwrap();
        let car = ClassEntry::new("Car", "Game")
            .with_super(vehicle_hash)
            .with_property(PropertyDescriptor::editable("Speed", PropertyKind::F32));
        registry.register_class(car).unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = vehicles();
        let result = registry.register_class(ClassEntry::new("Car", "Other"));
        assert!(matches!(result, Err(RegistrationError::DuplicateType(name)) if name == "Car"));
    }

    #[test]
    fn inherited_lookup() {
        let registry = vehicles();
        let car = TypeHash::from_name("Car");
        let vehicle = TypeHash::from_name("Vehicle");

        assert!(registry.is_a(car, vehicle));
        assert!(!registry.is_a(vehicle, car));
        assert_eq!(registry.find_property(car, "Wheels").map(|(owner, _)| owner), Some(vehicle));
        assert!(registry.find_function(car, "Honk").is_some());
        assert_eq!(registry.derived_classes(vehicle), vec![car]);
    }

    #[test]
    fn layout_puts_inherited_fields_first() {
        let registry = vehicles();
        let car = TypeHash::from_name("Car");
        let names: Vec<_> = registry.layout(car).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Wheels", "Speed"]);
        assert_eq!(registry.field_index(car, "Speed").map(|(i, _)| i), Some(1));
    }

    #[test]
    fn instantiate_uses_layout_defaults() {
        let registry = vehicles();
        let mut heap = ObjectHeap::new();
        let car = TypeHash::from_name("Car");
        let handle = registry.instantiate(&mut heap, car).unwrap();
        let object = heap.get(handle).unwrap();
        assert_eq!(object.name, "Car_0");
        let NativeValue::Struct(fields) = &object.value else { panic!("expected struct") };
        assert_eq!(fields.fields, vec![NativeValue::I32(0), NativeValue::F32(0.0)]);
    }

    #[test]
    fn rename_aside_hides_name_but_keeps_identity() {
        let mut registry = vehicles();
        let car = TypeHash::from_name("Car");
        registry.rename_aside(car, "Car_REINST1").unwrap();

        assert!(registry.find_by_name("Car").is_none());
        let entry = registry.get(car).unwrap();
        assert_eq!(entry.name(), "Car_REINST1");
        assert!(entry.flags().contains(TypeFlags::STALE));

        // The name can now be reused by a replacement.
        let mut replacement = ClassEntry::new("Car", "Game");
        replacement.type_hash = TypeHash::from_generation("Car", 2);
        registry.register_class(replacement).unwrap();
        assert_eq!(registry.find_by_name("Car").map(TypeEntry::type_hash), Some(TypeHash::from_generation("Car", 2)));
    }

    #[test]
    fn reinstate_undoes_rename() {
        let mut registry = vehicles();
        let car = TypeHash::from_name("Car");
        let scratch = registry.clone();
        registry.rename_aside(car, "Car_REINST1").unwrap();
        registry.reinstate(car, "Car").unwrap();

        assert_eq!(registry.find_by_name("Car").map(TypeEntry::type_hash), Some(car));
        assert!(!registry.get(car).unwrap().flags().contains(TypeFlags::STALE));
        assert_eq!(registry.reinstate(car, "Vehicle"), Err(RegistrationError::DuplicateType("Vehicle".into())));
        // clones are independent
        assert_eq!(scratch.find_by_name("Car").map(TypeEntry::type_hash), Some(car));
    }

    #[test]
    fn module_index() {
        let mut registry = vehicles();
        registry
            .register_enum(EnumEntry::new("Gear", "Other", NumericKind::U8))
            .unwrap();
        assert_eq!(registry.types_in_module("Game").len(), 2);
        assert_eq!(registry.types_in_module("Other"), vec![TypeHash::from_name("Gear")]);

        registry.remove(TypeHash::from_name("Gear"));
        assert!(registry.types_in_module("Other").is_empty());
        assert!(registry.find_by_name("Gear").is_none());
    }

    #[test]
    fn set_super_reparents() {
        let mut registry = vehicles();
        let truck = registry.register_class(ClassEntry::new("Truck", "Game")).unwrap();
        let car = TypeHash::from_name("Car");
        registry.set_super(car, truck).unwrap();
        assert!(registry.is_a(car, truck));
        assert!(!registry.is_a(car, TypeHash::from_name("Vehicle")));
    }
}
