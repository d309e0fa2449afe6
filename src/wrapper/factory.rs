//! Wrapper construction and instance dedup.

use rustc_hash::FxHashMap;
use scriptbridge_core::{NativeAddr, NativeBuffer, NativeValue, ObjectHandle, ObjectHeap, PathSegment, StorageRoot};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::owner::OwnerContext;

use super::{ConversionMode, WeakWrapper, Wrapper, WrapperKind, WrapperPayload};

/// Where the value of a new wrapper comes from.
#[derive(Debug, Clone)]
pub enum NativeSource {
    /// A transient value owned by the caller.
    Value(NativeValue),
    /// Storage at an address.
    Addr(NativeAddr),
}

/// Entry count below which inserts never sweep the cache.
const SWEEP_THRESHOLD: usize = 64;

/// Weak instance caches, one per wrapper kind, keyed by native address.
///
/// # Storage Model
///
/// Only `Reference` wrappers are cached: copies own fresh storage that no
/// later lookup can name. Entries hold weak handles, so a cache never keeps
/// a wrapper alive. An entry is only returned while the wrapper is still
/// bound to the same address with the same payload and the address root
/// still resolves; anything else is evicted and treated as a miss. Object
/// roots carry a generation, so a reused heap slot never matches an entry
/// made for its previous occupant.
///
/// Dead entries are swept on insert once the cache doubles in size since
/// the last sweep.
#[derive(Debug)]
pub struct WrapperFactories {
    instances: FxHashMap<(WrapperKind, NativeAddr), WeakWrapper>,
    sweep_at: usize,
}

impl Default for WrapperFactories {
    fn default() -> Self {
        Self {
            instances: FxHashMap::default(),
            sweep_at: SWEEP_THRESHOLD,
        }
    }
}

impl WrapperFactories {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_bound(wrapper: &Wrapper, addr: &NativeAddr, heap: &ObjectHeap) -> bool {
        wrapper.storage_addr().as_ref() == Some(addr) && addr.is_live(heap)
    }

    /// Find the live wrapper with `payload` bound to `addr`.
    pub fn find(&mut self, payload: &WrapperPayload, addr: &NativeAddr, heap: &ObjectHeap) -> Option<Wrapper> {
        let kind = payload.kind();
        let key = (kind, addr.clone());
        let weak = self.instances.get(&key)?;
        match weak.upgrade() {
            Some(wrapper) if Self::is_bound(&wrapper, addr, heap) && *wrapper.payload_ref() == *payload => {
                tracing::trace!(?kind, "wrapper cache hit");
                Some(wrapper)
            }
            _ => {
                tracing::warn!(?kind, "evicting dangling wrapper cache entry");
                self.instances.remove(&key);
                None
            }
        }
    }

    /// Record a freshly initialized wrapper.
    pub fn register(&mut self, wrapper: &Wrapper, heap: &ObjectHeap) {
        if wrapper.mode() != ConversionMode::Reference {
            return;
        }
        let Some(addr) = wrapper.storage_addr() else {
            return;
        };
        if self.instances.len() >= self.sweep_at {
            self.purge(heap);
            self.sweep_at = (self.instances.len() * 2).max(SWEEP_THRESHOLD);
        }
        tracing::trace!(kind = ?wrapper.kind(), "wrapper cache insert");
        self.instances.insert((wrapper.kind(), addr), wrapper.downgrade());
    }

    /// Follow the fields of `handle` to their new layout positions.
    ///
    /// `moved[i]` is the new index of old field `i`, or `None` when the field
    /// did not survive. Wrappers below a moved field are rebound, wrappers
    /// below a dropped one are deinitialized.
    pub fn rebase_object(&mut self, handle: ObjectHandle, moved: &[Option<usize>]) {
        let root = StorageRoot::Object(handle);
        let keys: Vec<_> = self
            .instances
            .keys()
            .filter(|(_, addr)| *addr.root() == root && !addr.path().is_empty())
            .cloned()
            .collect();
        let mut rebased = Vec::new();
        for (kind, addr) in keys {
            let Some(wrapper) = self.instances.remove(&(kind, addr.clone())).and_then(|w| w.upgrade()) else {
                continue;
            };
            if wrapper.storage_addr().as_ref() != Some(&addr) {
                continue;
            }
            let target = match addr.path().first() {
                Some(PathSegment::Field(index)) => moved.get(*index as usize).copied().flatten(),
                _ => None,
            };
            match target {
                Some(index) => {
                    let addr = addr.with_first_step(PathSegment::Field(index as u32));
                    wrapper.rebind(addr.clone());
                    rebased.push(((kind, addr), wrapper.downgrade()));
                }
                None => {
                    tracing::debug!(?kind, "field dropped by migration, releasing wrapper");
                    wrapper.deinit();
                }
            }
        }
        self.instances.extend(rebased);
    }

    /// Drop every entry whose wrapper is gone, unbound or whose root no
    /// longer resolves. Returns the number of evicted entries.
    pub fn purge(&mut self, heap: &ObjectHeap) -> usize {
        let before = self.instances.len();
        self.instances
            .retain(|(_, addr), weak| weak.upgrade().is_some_and(|w| Self::is_bound(&w, addr, heap)));
        before - self.instances.len()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Resolve the storage of a new wrapper according to `mode`.
///
/// Returns the address to bind and the mode actually used.
pub(crate) fn resolve_storage(
    source: NativeSource,
    mode: ConversionMode,
    owner: &OwnerContext,
    heap: &ObjectHeap,
) -> BridgeResult<(NativeAddr, ConversionMode)> {
    match (mode, source) {
        (ConversionMode::Reference, NativeSource::Addr(addr)) => {
            if !owner.is_set() {
                return Err(BridgeError::precondition(
                    "Reference conversion requires an owner context",
                ));
            }
            Ok((addr, ConversionMode::Reference))
        }
        (ConversionMode::Reference, NativeSource::Value(_)) => Err(BridgeError::precondition(
            "Reference conversion requires native storage, not a temporary value",
        )),
        (ConversionMode::Steal, NativeSource::Value(value)) => {
            Ok((NativeAddr::buffer(NativeBuffer::new(value)), ConversionMode::Steal))
        }
        (ConversionMode::Copy, NativeSource::Value(value)) => {
            Ok((NativeAddr::buffer(NativeBuffer::new(value)), ConversionMode::Copy))
        }
        (ConversionMode::Copy | ConversionMode::Steal, NativeSource::Addr(addr)) => {
            let value = addr.get(heap)?;
            Ok((NativeAddr::buffer(NativeBuffer::new(value)), ConversionMode::Copy))
        }
    }
}

impl Bridge {
    /// Create (or reuse) a wrapper over `source`.
    ///
    /// Reference wraps of an address that already has a live wrapper with the
    /// same payload return that wrapper.
    pub(crate) fn make_wrapper(
        &mut self,
        payload: WrapperPayload,
        type_name: impl Into<String>,
        source: NativeSource,
        mode: ConversionMode,
        owner: OwnerContext,
    ) -> BridgeResult<Wrapper> {
        if let (ConversionMode::Reference, NativeSource::Addr(addr)) = (mode, &source) {
            if let Some(existing) = self.factories.find(&payload, addr, &self.heap) {
                return Ok(existing);
            }
        }
        let (addr, mode) = resolve_storage(source, mode, &owner, &self.heap)?;
        let wrapper = Wrapper::new(payload, type_name);
        wrapper.init(addr, mode, owner);
        self.factories.register(&wrapper, &self.heap);
        Ok(wrapper)
    }

    /// The wrapper of a native object, created on first use.
    pub(crate) fn object_wrapper(&mut self, handle: ObjectHandle) -> BridgeResult<Wrapper> {
        let addr = NativeAddr::object(handle);
        if let Some(existing) = self.factories.find(&WrapperPayload::Object, &addr, &self.heap) {
            return Ok(existing);
        }
        let class = self
            .heap
            .get(handle)
            .map(|o| o.class)
            .ok_or(scriptbridge_core::AccessError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            })?;
        let wrapper = Wrapper::new(WrapperPayload::Object, self.reflection.type_name(class));
        wrapper.init(addr, ConversionMode::Reference, OwnerContext::None);
        self.factories.register(&wrapper, &self.heap);
        Ok(wrapper)
    }

    /// Drop dead dedup cache entries.
    pub fn purge_wrappers(&mut self) -> usize {
        self.factories.purge(&self.heap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbridge_core::TypeHash;

    fn struct_payload() -> WrapperPayload {
        WrapperPayload::Struct {
            struct_type: TypeHash::from_name("Vector"),
        }
    }

    #[test]
    fn copy_detaches_from_source() {
        let heap = ObjectHeap::new();
        let source = NativeBuffer::new(NativeValue::I32(1));
        let (addr, mode) = resolve_storage(
            NativeSource::Addr(NativeAddr::buffer(source.clone())),
            ConversionMode::Copy,
            &OwnerContext::None,
            &heap,
        )
        .unwrap();
        assert_eq!(mode, ConversionMode::Copy);
        assert_ne!(addr, NativeAddr::buffer(source));
    }

    #[test]
    fn steal_falls_back_to_copy_for_addresses() {
        let heap = ObjectHeap::new();
        let source = NativeAddr::buffer(NativeBuffer::new(NativeValue::Bool(true)));
        let (_, mode) = resolve_storage(
            NativeSource::Addr(source),
            ConversionMode::Steal,
            &OwnerContext::None,
            &heap,
        )
        .unwrap();
        assert_eq!(mode, ConversionMode::Copy);

        let (_, mode) = resolve_storage(
            NativeSource::Value(NativeValue::Bool(true)),
            ConversionMode::Steal,
            &OwnerContext::None,
            &heap,
        )
        .unwrap();
        assert_eq!(mode, ConversionMode::Steal);
    }

    #[test]
    fn reference_requires_owner() {
        let heap = ObjectHeap::new();
        let addr = NativeAddr::buffer(NativeBuffer::new(NativeValue::Bool(true)));
        let err = resolve_storage(
            NativeSource::Addr(addr),
            ConversionMode::Reference,
            &OwnerContext::None,
            &heap,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Precondition { .. }));
    }

    #[test]
    fn cache_evicts_unbound_wrappers() {
        let heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        let addr = NativeAddr::buffer(NativeBuffer::new(NativeValue::I32(0)));
        let wrapper = Wrapper::new(struct_payload(), "Vector");
        wrapper.init(addr.clone(), ConversionMode::Reference, OwnerContext::None);
        factories.register(&wrapper, &heap);

        assert!(factories.find(&struct_payload(), &addr, &heap).is_some());
        assert!(factories.find(&WrapperPayload::Object, &addr, &heap).is_none());

        wrapper.deinit();
        assert!(factories.find(&struct_payload(), &addr, &heap).is_none());
        assert!(factories.is_empty());
    }

    #[test]
    fn payload_mismatch_is_a_miss() {
        let heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        let addr = NativeAddr::buffer(NativeBuffer::new(NativeValue::I32(0)));
        let wrapper = Wrapper::new(struct_payload(), "Vector");
        wrapper.init(addr.clone(), ConversionMode::Reference, OwnerContext::None);
        factories.register(&wrapper, &heap);

        let other = WrapperPayload::Struct {
            struct_type: TypeHash::from_name("Rotator"),
        };
        assert!(factories.find(&other, &addr, &heap).is_none());
        assert!(factories.is_empty());
        assert!(wrapper.is_initialized());
    }

    #[test]
    fn copies_are_not_cached() {
        let heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        let wrapper = Wrapper::new(struct_payload(), "Vector");
        wrapper.init(
            NativeAddr::buffer(NativeBuffer::new(NativeValue::I32(0))),
            ConversionMode::Copy,
            OwnerContext::None,
        );
        factories.register(&wrapper, &heap);
        assert!(factories.is_empty());
    }

    #[test]
    fn inserts_sweep_dead_entries() {
        let heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        for _ in 0..1000 {
            let wrapper = Wrapper::new(struct_payload(), "Vector");
            wrapper.init(
                NativeAddr::buffer(NativeBuffer::new(NativeValue::I32(0))),
                ConversionMode::Reference,
                OwnerContext::None,
            );
            factories.register(&wrapper, &heap);
        }
        assert!(factories.len() <= SWEEP_THRESHOLD);
    }

    #[test]
    fn rebase_follows_moved_fields() {
        let mut heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        let handle = heap.allocate(TypeHash::from_name("Car"), "Car_0", NativeValue::Bool(false));
        let object = NativeAddr::object(handle);
        let moved = Wrapper::new(struct_payload(), "Vector");
        moved.init(object.field(0), ConversionMode::Reference, OwnerContext::None);
        factories.register(&moved, &heap);
        let dropped = Wrapper::new(struct_payload(), "Vector");
        dropped.init(object.field(1), ConversionMode::Reference, OwnerContext::None);
        factories.register(&dropped, &heap);

        factories.rebase_object(handle, &[Some(1), None]);
        assert_eq!(moved.storage_addr(), Some(object.field(1)));
        assert!(!dropped.is_initialized());
        assert_eq!(factories.len(), 1);
        assert!(factories.find(&struct_payload(), &object.field(1), &heap).is_some());
        assert!(factories.find(&struct_payload(), &object.field(0), &heap).is_none());
    }

    #[test]
    fn purge_drops_dead_entries() {
        let mut heap = ObjectHeap::new();
        let mut factories = WrapperFactories::new();
        let handle = heap.allocate(TypeHash::from_name("Car"), "Car_0", NativeValue::Bool(false));
        let wrapper = Wrapper::new(WrapperPayload::Object, "Car");
        wrapper.init(NativeAddr::object(handle), ConversionMode::Reference, OwnerContext::None);
        factories.register(&wrapper, &heap);

        let transient = Wrapper::new(struct_payload(), "Vector");
        transient.init(
            NativeAddr::buffer(NativeBuffer::new(NativeValue::I32(0))),
            ConversionMode::Reference,
            OwnerContext::None,
        );
        factories.register(&transient, &heap);
        drop(transient);

        assert_eq!(factories.purge(&heap), 1);
        heap.free(handle);
        assert_eq!(factories.purge(&heap), 1);
        assert!(factories.is_empty());
    }
}
