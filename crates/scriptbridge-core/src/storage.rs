//! Addressing of native storage.
//!
//! A [`NativeAddr`] names one value slot: a root (a heap object, or a
//! standalone [`NativeBuffer`]) plus a path of field, element and map entry
//! steps below it. Addresses are re-resolved on every access, so a
//! destroyed object or a reshaped container surfaces as an
//! [`AccessError`] instead of a dangling read.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{AccessError, NativeValue, ObjectHandle, ObjectHeap};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// One step below a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Struct or object field by layout index.
    Field(u32),
    /// Array, fixed array or set element.
    Element(u32),
    /// Key of the n-th map entry.
    MapKey(u32),
    /// Value of the n-th map entry.
    MapValue(u32),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(i) => write!(f, ".{i}"),
            PathSegment::Element(i) => write!(f, "[{i}]"),
            PathSegment::MapKey(i) => write!(f, "{{key {i}}}"),
            PathSegment::MapValue(i) => write!(f, "{{value {i}}}"),
        }
    }
}

struct BufferCell {
    id: u64,
    value: RefCell<NativeValue>,
}

/// Shared standalone native storage (struct temporaries, copied containers).
///
/// Clones share the same storage; the buffer is freed when the last clone
/// is dropped.
#[derive(Clone)]
pub struct NativeBuffer(Rc<BufferCell>);

impl NativeBuffer {
    pub fn new(value: NativeValue) -> Self {
        NativeBuffer(Rc::new(BufferCell {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            value: RefCell::new(value),
        }))
    }

    /// Unique identity of this buffer.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Clone the stored value.
    pub fn snapshot(&self) -> Result<NativeValue, AccessError> {
        self.0
            .value
            .try_borrow()
            .map(|v| v.clone())
            .map_err(|_| AccessError::BufferBusy(self.0.id))
    }

    /// Take the stored value out, leaving `replacement` behind.
    pub fn replace(&self, replacement: NativeValue) -> Result<NativeValue, AccessError> {
        self.0
            .value
            .try_borrow_mut()
            .map(|mut v| std::mem::replace(&mut *v, replacement))
            .map_err(|_| AccessError::BufferBusy(self.0.id))
    }

    /// Number of live handles sharing this buffer.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for NativeBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for NativeBuffer {}

impl Hash for NativeBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeBuffer").field(&self.0.id).finish()
    }
}

/// Root of a storage address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageRoot {
    /// Fields of a heap object; stale generations fail to resolve.
    Object(ObjectHandle),
    Buffer(NativeBuffer),
}

/// Address of one native value slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeAddr {
    root: StorageRoot,
    path: Vec<PathSegment>,
}

impl NativeAddr {
    /// The whole value held by a heap object (its field struct).
    pub fn object(handle: ObjectHandle) -> Self {
        Self {
            root: StorageRoot::Object(handle),
            path: Vec::new(),
        }
    }

    /// The whole value held by a buffer.
    pub fn buffer(buffer: NativeBuffer) -> Self {
        Self {
            root: StorageRoot::Buffer(buffer),
            path: Vec::new(),
        }
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Address of a child slot.
    pub fn join(&self, segment: PathSegment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Self {
            root: self.root.clone(),
            path,
        }
    }

    pub fn field(&self, index: usize) -> Self {
        self.join(PathSegment::Field(index as u32))
    }

    pub fn element(&self, index: usize) -> Self {
        self.join(PathSegment::Element(index as u32))
    }

    /// The same slot with its first path step replaced.
    ///
    /// A root address is returned unchanged.
    pub fn with_first_step(&self, segment: PathSegment) -> Self {
        let mut path = self.path.clone();
        if let Some(first) = path.first_mut() {
            *first = segment;
        }
        Self {
            root: self.root.clone(),
            path,
        }
    }

    /// Check whether the root still exists.
    pub fn is_live(&self, heap: &ObjectHeap) -> bool {
        match &self.root {
            StorageRoot::Object(h) => heap.is_alive(*h),
            StorageRoot::Buffer(_) => true,
        }
    }

    /// Read the addressed value in place.
    pub fn read<R>(
        &self,
        heap: &ObjectHeap,
        f: impl FnOnce(&NativeValue) -> R,
    ) -> Result<R, AccessError> {
        match &self.root {
            StorageRoot::Object(handle) => {
                let object = heap.get(*handle).ok_or(AccessError::StaleHandle {
                    index: handle.index,
                    generation: handle.generation,
                })?;
                Ok(f(object.value.at_path(&self.path)?))
            }
            StorageRoot::Buffer(buffer) => {
                let value = buffer
                    .0
                    .value
                    .try_borrow()
                    .map_err(|_| AccessError::BufferBusy(buffer.id()))?;
                Ok(f(value.at_path(&self.path)?))
            }
        }
    }

    /// Mutate the addressed value in place.
    pub fn write<R>(
        &self,
        heap: &mut ObjectHeap,
        f: impl FnOnce(&mut NativeValue) -> R,
    ) -> Result<R, AccessError> {
        match &self.root {
            StorageRoot::Object(handle) => {
                let object = heap.get_mut(*handle).ok_or(AccessError::StaleHandle {
                    index: handle.index,
                    generation: handle.generation,
                })?;
                Ok(f(object.value.at_path_mut(&self.path)?))
            }
            StorageRoot::Buffer(buffer) => {
                let mut value = buffer
                    .0
                    .value
                    .try_borrow_mut()
                    .map_err(|_| AccessError::BufferBusy(buffer.id()))?;
                Ok(f(value.at_path_mut(&self.path)?))
            }
        }
    }

    /// Clone the addressed value.
    pub fn get(&self, heap: &ObjectHeap) -> Result<NativeValue, AccessError> {
        self.read(heap, NativeValue::clone)
    }

    /// Overwrite the addressed value.
    pub fn set(&self, heap: &mut ObjectHeap, value: NativeValue) -> Result<(), AccessError> {
        self.write(heap, |slot| *slot = value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StructValue, TypeHash};

    fn point(x: i32, y: i32) -> NativeValue {
        NativeValue::Struct(StructValue {
            struct_type: TypeHash::from_name("Point"),
            fields: vec![NativeValue::I32(x), NativeValue::I32(y)],
        })
    }

    #[test]
    fn buffer_addresses_share_storage() {
        let mut heap = ObjectHeap::new();
        let buffer = NativeBuffer::new(point(1, 2));
        let addr = NativeAddr::buffer(buffer.clone()).field(1);

        addr.set(&mut heap, NativeValue::I32(9)).unwrap();
        assert_eq!(buffer.snapshot().unwrap(), point(1, 9));
    }

    #[test]
    fn object_addresses_go_stale() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(TypeHash::from_name("Point"), "P", point(3, 4));
        let addr = NativeAddr::object(handle).field(0);
        assert_eq!(addr.get(&heap).unwrap(), NativeValue::I32(3));

        heap.free(handle);
        assert!(!addr.is_live(&heap));
        assert!(matches!(addr.get(&heap), Err(AccessError::StaleHandle { .. })));
    }

    #[test]
    fn address_identity() {
        let buffer = NativeBuffer::new(point(0, 0));
        let a = NativeAddr::buffer(buffer.clone()).field(0);
        let b = NativeAddr::buffer(buffer.clone()).field(0);
        let c = NativeAddr::buffer(NativeBuffer::new(point(0, 0))).field(0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, NativeAddr::buffer(buffer.clone()).field(1));
    }

    #[test]
    fn first_step_rewrite() {
        let buffer = NativeBuffer::new(point(0, 0));
        let root = NativeAddr::buffer(buffer.clone());
        let nested = root.field(0).element(2);
        assert_eq!(nested.with_first_step(PathSegment::Field(1)), root.field(1).element(2));
        assert_eq!(root.with_first_step(PathSegment::Field(1)), root);
    }

    #[test]
    fn busy_buffer_is_reported() {
        let heap = ObjectHeap::new();
        let buffer = NativeBuffer::new(point(0, 0));
        let addr = NativeAddr::buffer(buffer.clone());
        let nested = addr.read(&heap, |_| addr.get(&heap)).unwrap();
        assert!(nested.is_ok());

        let mut heap = ObjectHeap::new();
        let outer = NativeAddr::buffer(buffer.clone());
        let inner = outer.clone();
        let result = outer.read(&ObjectHeap::new(), |_| inner.write(&mut heap, |_| ()));
        assert_eq!(result.unwrap(), Err(AccessError::BufferBusy(buffer.id())));
    }
}
