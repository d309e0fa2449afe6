//! The bridge facade.
//!
//! [`Bridge`] owns everything the conversion layers need: the reflection
//! registry, the native object heap, the script runtime state, the wrapper
//! caches, the wrapper type registry and the type generator. All of it is
//! single-threaded; the bridge is driven from the thread that holds the
//! script runtime.

use scriptbridge_core::{ObjectHandle, ObjectHeap, TypeHash};
use scriptbridge_registry::ReflectionRegistry;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::generator::TypeGenerator;
use crate::owner::ChangeObserver;
use crate::script::{ScriptRuntime, ScriptValue};
use crate::types::{TypeRegistry, WrapperType, WrapperTypeId};
use crate::wrapper::WrapperFactories;

/// Bidirectional bridge between script values and reflected native values.
///
/// ```
/// use scriptbridge::{Bridge, BridgeConfig, ErrorMode, ScriptValue};
/// use scriptbridge_core::{NativeValue, PropertyKind};
///
/// let mut bridge = Bridge::new(BridgeConfig::default());
/// let native = bridge.nativize(&ScriptValue::Float(3.0), &PropertyKind::I32, ErrorMode::Set).unwrap();
/// assert_eq!(native, NativeValue::I32(3));
/// ```
pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) reflection: ReflectionRegistry,
    pub(crate) heap: ObjectHeap,
    pub(crate) runtime: ScriptRuntime,
    pub(crate) factories: WrapperFactories,
    pub(crate) types: TypeRegistry,
    pub(crate) generator: TypeGenerator,
    pub(crate) observers: Vec<Box<dyn ChangeObserver>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            runtime: ScriptRuntime::new(config.max_error_chain),
            config,
            reflection: ReflectionRegistry::new(),
            heap: ObjectHeap::new(),
            factories: WrapperFactories::new(),
            types: TypeRegistry::new(),
            generator: TypeGenerator::new(),
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn reflection(&self) -> &ReflectionRegistry {
        &self.reflection
    }

    pub fn reflection_mut(&mut self) -> &mut ReflectionRegistry {
        &mut self.reflection
    }

    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        &mut self.heap
    }

    pub fn runtime(&self) -> &ScriptRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut ScriptRuntime {
        &mut self.runtime
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn generator(&self) -> &TypeGenerator {
        &self.generator
    }

    pub fn wrapper_factories(&self) -> &WrapperFactories {
        &self.factories
    }

    /// Register a receiver of change notifications.
    pub fn add_observer(&mut self, observer: Box<dyn ChangeObserver>) {
        self.observers.push(observer);
    }

    /// Record `err` in the runtime's error slot and hand it back.
    pub(crate) fn report(&mut self, err: BridgeError) -> BridgeError {
        self.runtime.set_error(err.script_kind(), err.to_string());
        err
    }

    // ==========================================================================
    // Wrapper types
    // ==========================================================================

    /// The wrapper type of a reflected type, generated on first use.
    pub fn wrapper_type(&mut self, reflected: TypeHash) -> Option<WrapperTypeId> {
        self.types
            .get_or_generate(&self.reflection, &mut self.runtime, &self.config, reflected)
    }

    /// Wrapper type info by id.
    pub fn wrapper_type_info(&self, id: WrapperTypeId) -> Option<&WrapperType> {
        self.types.get(id)
    }

    /// Generate wrapper types for every exported type of `module`.
    pub fn load_module(&mut self, module: &str) -> Vec<WrapperTypeId> {
        self.types
            .generate_for_module(&self.reflection, &mut self.runtime, &self.config, module)
    }

    /// Orphan the wrapper types of `module`.
    pub fn unload_module(&mut self, module: &str) -> Vec<WrapperTypeId> {
        self.types.orphan_module(module, &mut self.runtime)
    }

    // ==========================================================================
    // Objects
    // ==========================================================================

    /// Allocate a default-initialized native object.
    pub fn instantiate(&mut self, class: TypeHash) -> BridgeResult<ObjectHandle> {
        Ok(self.reflection.instantiate(&mut self.heap, class)?)
    }

    /// Construct a native object and return its wrapper.
    ///
    /// The post-init hook of the nearest generated class in the hierarchy
    /// runs with the new wrapper.
    pub fn new_object(&mut self, class: TypeHash) -> BridgeResult<ScriptValue> {
        let handle = self.instantiate(class)?;
        let object = self.wrap_object(handle)?;
        let hook = self
            .reflection
            .super_chain(class)
            .into_iter()
            .find_map(|h| self.generator.post_init_hook(h));
        if let Some(hook) = hook {
            hook.call(self, std::slice::from_ref(&object))?;
        }
        Ok(object)
    }

    /// The script wrapper of a live native object.
    pub fn wrap_object(&mut self, handle: ObjectHandle) -> BridgeResult<ScriptValue> {
        Ok(ScriptValue::Wrapper(self.object_wrapper(handle)?))
    }

    /// Destroy a native object. Wrappers of it become invalid.
    pub fn destroy_object(&mut self, handle: ObjectHandle) {
        self.heap.free(handle);
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("objects", &self.heap.len())
            .field("wrapper_types", &self.types.len())
            .field("cached_wrappers", &self.factories.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbridge_core::ClassEntry;

    #[test]
    fn wrap_object_is_deduplicated() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let class = bridge.reflection_mut().register_class(ClassEntry::new("Lamp", "Game")).unwrap();
        let handle = bridge.instantiate(class).unwrap();
        let a = bridge.wrap_object(handle).unwrap();
        let b = bridge.wrap_object(handle).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.type_name(), "Lamp");
    }

    #[test]
    fn destroyed_objects_cannot_be_wrapped() {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let class = bridge.reflection_mut().register_class(ClassEntry::new("Lamp", "Game")).unwrap();
        let handle = bridge.instantiate(class).unwrap();
        let wrapper = bridge.wrap_object(handle).unwrap();
        bridge.destroy_object(handle);
        assert!(bridge.wrap_object(handle).unwrap_err().is_internal_state());
        assert!(bridge.wrapper_factories().is_empty());
        drop(wrapper);
    }
}
