//! Generational arena for native objects.

use std::fmt;

use crate::{NativeValue, TypeHash};

/// Handle to a native object.
///
/// This is a safe, copyable reference to an object in the `ObjectHeap`.
/// The generational index prevents use-after-free: once the object is
/// destroyed every existing handle stops resolving, even if the slot is
/// reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Index into ObjectHeap.slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// A live native object.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeObject {
    /// Current class; changes when the object is reinstanced.
    pub class: TypeHash,
    pub name: String,
    /// Field storage, always a `NativeValue::Struct` in class layout order.
    pub value: NativeValue,
}

/// Heap storage for native objects with generational indices.
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

struct HeapSlot {
    generation: u32,
    object: Option<NativeObject>,
}

impl ObjectHeap {
    /// Create a new empty object heap.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new object of `class` with initial field storage.
    pub fn allocate(&mut self, class: TypeHash, name: impl Into<String>, value: NativeValue) -> ObjectHandle {
        let object = NativeObject {
            class,
            name: name.into(),
            value,
        };

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            ObjectHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                object: Some(object),
            });
            ObjectHandle::new(index, 0)
        }
    }

    /// Get an object.
    ///
    /// Returns None if the handle is stale.
    pub fn get(&self, handle: ObjectHandle) -> Option<&NativeObject> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_ref()
    }

    /// Get an object for mutation.
    ///
    /// Returns None if the handle is stale.
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut NativeObject> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Check whether the handle still refers to a live object.
    pub fn is_alive(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Destroy an object. Stale handles are ignored.
    pub fn free(&mut self, handle: ObjectHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index as usize)
            && slot.generation == handle.generation
            && slot.object.is_some()
        {
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(handle.index);
        }
    }

    /// Handles of every live object whose class is `class`.
    pub fn instances_of(&self, class: TypeHash) -> Vec<ObjectHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.object {
                Some(object) if object.class == class => {
                    Some(ObjectHandle::new(index as u32, slot.generation))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
