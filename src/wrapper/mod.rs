//! Script-side wrappers around native storage.
//!
//! A [`Wrapper`] is the script value standing in for one native value. It
//! holds the address of the value, the [`ConversionMode`] it was created
//! with, an [`OwnerContext`] recording where the value lives, and a
//! [`WrapperPayload`] describing what it wraps. Every access re-reads the
//! native storage through the address; nothing is cached across calls.
//!
//! Wrapper operations live on [`Bridge`](crate::Bridge), grouped by kind in
//! the submodules.

mod array;
mod call;
mod delegate;
mod factory;
mod map;
mod object;
mod operator;
mod set;
mod structure;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use scriptbridge_core::{Name, NativeAddr, ObjectHandle, PropertyDescriptor, StorageRoot, Text, TypeHash};

use crate::error::{BridgeError, BridgeResult};
use crate::owner::OwnerContext;

pub use factory::{NativeSource, WrapperFactories};
pub use operator::ScriptOperator;

/// Ownership relationship between a wrapper and its native storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    /// Duplicate the value into storage owned by the wrapper.
    Copy,
    /// Take ownership of a transient value; falls back to `Copy`.
    Steal,
    /// Alias storage owned elsewhere; requires an owner context.
    Reference,
}

/// Discriminant of a wrapper, used to key the dedup caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    Object,
    Struct,
    Array,
    FixedArray,
    Set,
    Map,
    Delegate,
    MulticastDelegate,
    Name,
    Text,
}

/// What a wrapper wraps.
#[derive(Debug, Clone, PartialEq)]
pub enum WrapperPayload {
    /// A heap object; its class is read from the heap on each access.
    Object,
    Struct { struct_type: TypeHash },
    Array { element: PropertyDescriptor },
    FixedArray { element: PropertyDescriptor, dim: usize },
    Set { element: PropertyDescriptor },
    Map { key: PropertyDescriptor, value: PropertyDescriptor },
    Delegate { signature: TypeHash },
    Multicast { signature: TypeHash },
    /// Identifier value held inline.
    Name(Name),
    /// Text value held inline.
    Text(Text),
}

impl WrapperPayload {
    pub fn kind(&self) -> WrapperKind {
        match self {
            WrapperPayload::Object => WrapperKind::Object,
            WrapperPayload::Struct { .. } => WrapperKind::Struct,
            WrapperPayload::Array { .. } => WrapperKind::Array,
            WrapperPayload::FixedArray { .. } => WrapperKind::FixedArray,
            WrapperPayload::Set { .. } => WrapperKind::Set,
            WrapperPayload::Map { .. } => WrapperKind::Map,
            WrapperPayload::Delegate { .. } => WrapperKind::Delegate,
            WrapperPayload::Multicast { .. } => WrapperKind::MulticastDelegate,
            WrapperPayload::Name(_) => WrapperKind::Name,
            WrapperPayload::Text(_) => WrapperKind::Text,
        }
    }
}

/// State behind a [`Wrapper`].
#[derive(Debug)]
pub struct WrapperData {
    payload: WrapperPayload,
    type_name: String,
    storage: Option<NativeAddr>,
    mode: ConversionMode,
    owner: OwnerContext,
}

/// Shared handle to a wrapper instance.
///
/// Clones refer to the same instance; equality is identity.
#[derive(Clone)]
pub struct Wrapper(Rc<RefCell<WrapperData>>);

/// Non-owning handle used by the dedup caches.
#[derive(Clone, Debug)]
pub struct WeakWrapper(Weak<RefCell<WrapperData>>);

impl WeakWrapper {
    pub fn upgrade(&self) -> Option<Wrapper> {
        self.0.upgrade().map(Wrapper)
    }
}

impl Wrapper {
    /// Create an uninitialized wrapper.
    pub fn new(payload: WrapperPayload, type_name: impl Into<String>) -> Self {
        Wrapper(Rc::new(RefCell::new(WrapperData {
            payload,
            type_name: type_name.into(),
            storage: None,
            mode: ConversionMode::Copy,
            owner: OwnerContext::None,
        })))
    }

    /// Wrap an identifier value.
    pub fn name(value: Name) -> Self {
        Self::new(WrapperPayload::Name(value), "Name")
    }

    /// Wrap a text value.
    pub fn text(value: Text) -> Self {
        Self::new(WrapperPayload::Text(value), "Text")
    }

    /// Bind the wrapper to storage, releasing any previous binding first.
    pub(crate) fn init(&self, storage: NativeAddr, mode: ConversionMode, owner: OwnerContext) {
        self.deinit();
        let mut data = self.0.borrow_mut();
        data.storage = Some(storage);
        data.mode = mode;
        data.owner = owner;
    }

    /// Point an initialized wrapper at another slot, keeping mode and owner.
    pub(crate) fn rebind(&self, storage: NativeAddr) {
        let mut data = self.0.borrow_mut();
        if data.storage.is_some() {
            data.storage = Some(storage);
        }
    }

    /// Release storage and owner context. Safe to call repeatedly.
    ///
    /// Owned storage (`Copy`/`Steal`) is dropped with the last address
    /// referring to it; referenced storage is left alone.
    pub fn deinit(&self) {
        let mut data = self.0.borrow_mut();
        data.storage = None;
        data.owner = OwnerContext::None;
    }

    pub fn is_initialized(&self) -> bool {
        let data = self.0.borrow();
        data.storage.is_some() || matches!(data.payload, WrapperPayload::Name(_) | WrapperPayload::Text(_))
    }

    pub fn kind(&self) -> WrapperKind {
        self.0.borrow().payload.kind()
    }

    pub fn payload(&self) -> WrapperPayload {
        self.0.borrow().payload.clone()
    }

    pub(crate) fn payload_ref(&self) -> Ref<'_, WrapperPayload> {
        Ref::map(self.0.borrow(), |d| &d.payload)
    }

    pub fn type_name(&self) -> String {
        self.0.borrow().type_name.clone()
    }

    pub fn mode(&self) -> ConversionMode {
        self.0.borrow().mode
    }

    pub fn owner(&self) -> OwnerContext {
        self.0.borrow().owner.clone()
    }

    /// Storage address, if initialized.
    pub fn storage_addr(&self) -> Option<NativeAddr> {
        self.0.borrow().storage.clone()
    }

    /// Storage address, failing on an uninitialized wrapper.
    pub fn storage(&self) -> BridgeResult<NativeAddr> {
        self.storage_addr().ok_or_else(|| {
            BridgeError::internal(format!("'{}' wrapper is not initialized", self.type_name()))
        })
    }

    /// The object behind an object wrapper.
    pub fn object_handle(&self) -> Option<ObjectHandle> {
        let data = self.0.borrow();
        match (&data.payload, &data.storage) {
            (WrapperPayload::Object, Some(addr)) if addr.path().is_empty() => match addr.root() {
                StorageRoot::Object(handle) => Some(*handle),
                StorageRoot::Buffer(_) => None,
            },
            _ => None,
        }
    }

    /// Struct type of a struct wrapper.
    pub fn struct_type(&self) -> Option<TypeHash> {
        match *self.payload_ref() {
            WrapperPayload::Struct { struct_type } => Some(struct_type),
            _ => None,
        }
    }

    /// Value of a name wrapper.
    pub fn name_value(&self) -> Option<Name> {
        match &*self.payload_ref() {
            WrapperPayload::Name(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Value of a text wrapper.
    pub fn text_value(&self) -> Option<Text> {
        match &*self.payload_ref() {
            WrapperPayload::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn downgrade(&self) -> WeakWrapper {
        WeakWrapper(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Wrapper) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this instance.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for Wrapper {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Wrapper")
                .field("type_name", &data.type_name)
                .field("mode", &data.mode)
                .field("storage", &data.storage)
                .finish(),
            Err(_) => f.write_str("Wrapper(<busy>)"),
        }
    }
}
