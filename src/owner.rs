//! Ownership context and change notification.
//!
//! Every wrapped value that lives inside another wrapped value records the
//! owning wrapper and the property it lives in. Before a mutation the
//! bridge walks these records up to the native object that ultimately owns
//! the storage, building the chain of reflected properties from that object
//! down to the mutated one. Observers receive the chain before and after
//! the mutation.
//!
//! The walk is best-effort: a missing owner, a container owner or a
//! property that cannot be resolved ends it without an event, and the
//! mutation proceeds unobserved.

use std::collections::VecDeque;
use std::fmt;

use scriptbridge_core::{ObjectHandle, ObjectHeap, TypeHash};
use scriptbridge_registry::ReflectionRegistry;

use crate::wrapper::{Wrapper, WrapperKind};

/// Where a wrapped value lives.
#[derive(Debug, Clone, Default)]
pub enum OwnerContext {
    /// Not owned by another wrapper.
    #[default]
    None,
    /// A property of a native object.
    Object { owner: Wrapper, property: String },
    /// A field of a wrapped struct.
    Struct { owner: Wrapper, property: String },
    /// An element of a wrapped container.
    Container { owner: Wrapper, property: String },
}

impl OwnerContext {
    /// Context for a value stored in `property` of `owner`.
    pub fn new(owner: &Wrapper, property: impl Into<String>) -> Self {
        let owner = owner.clone();
        let property = property.into();
        match owner.kind() {
            WrapperKind::Object => OwnerContext::Object { owner, property },
            WrapperKind::Struct => OwnerContext::Struct { owner, property },
            _ => OwnerContext::Container { owner, property },
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, OwnerContext::None)
    }

    pub fn owner(&self) -> Option<&Wrapper> {
        match self {
            OwnerContext::None => None,
            OwnerContext::Object { owner, .. }
            | OwnerContext::Struct { owner, .. }
            | OwnerContext::Container { owner, .. } => Some(owner),
        }
    }

    pub fn property(&self) -> Option<&str> {
        match self {
            OwnerContext::None => None,
            OwnerContext::Object { property, .. }
            | OwnerContext::Struct { property, .. }
            | OwnerContext::Container { property, .. } => Some(property),
        }
    }
}

/// One step of a property chain: a property and the type declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    pub owner_type: TypeHash,
    pub name: String,
}

/// Reflected properties from a native object down to a mutated property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyChain(Vec<PropertyRef>);

impl PropertyChain {
    pub fn properties(&self) -> &[PropertyRef] {
        &self.0
    }

    /// Property names, outermost first.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PropertyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("."))
    }
}

/// A mutation about to happen, or that just happened, on `object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub object: ObjectHandle,
    pub chain: PropertyChain,
}

/// Receiver of change notifications.
pub trait ChangeObserver {
    fn pre_change(&mut self, event: &ChangeEvent);
    fn post_change(&mut self, event: &ChangeEvent);
}

/// Resolve the notification target of a mutation in `context`.
pub fn resolve_change(
    context: &OwnerContext,
    registry: &ReflectionRegistry,
    heap: &ObjectHeap,
) -> Option<ChangeEvent> {
    let mut chain = VecDeque::new();
    let mut current = context.clone();
    loop {
        match current {
            OwnerContext::None => {
                tracing::trace!(chain = ?chain, "notification chain has no native owner");
                return None;
            }
            OwnerContext::Container { property, .. } => {
                tracing::trace!(property = %property, "notification chain passes through a container");
                return None;
            }
            OwnerContext::Object { owner, property } => {
                let handle = owner.object_handle()?;
                let class = heap.get(handle)?.class;
                let Some((owner_type, _)) = registry.find_property(class, &property) else {
                    tracing::warn!(property = %property, "cannot resolve property for change notification");
                    return None;
                };
                chain.push_front(PropertyRef {
                    owner_type,
                    name: property,
                });
                let chain = PropertyChain(chain.into());
                tracing::trace!(chain = %chain, "resolved notification chain");
                return Some(ChangeEvent { object: handle, chain });
            }
            OwnerContext::Struct { owner, property } => {
                let struct_type = owner.struct_type()?;
                let Some((owner_type, _)) = registry.find_property(struct_type, &property) else {
                    tracing::warn!(property = %property, "cannot resolve property for change notification");
                    return None;
                };
                chain.push_front(PropertyRef {
                    owner_type,
                    name: property,
                });
                current = owner.owner();
            }
        }
    }
}
