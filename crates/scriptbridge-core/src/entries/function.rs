//! Function entries: member functions and delegate signatures.

use crate::{FunctionFlags, NativeFn, PropertyDescriptor, PropertyFlags, PropertyKind, TypeHash};

use super::Metadata;

/// How a reflected function is implemented.
#[derive(Debug, Clone)]
pub enum FunctionImpl {
    /// Native body.
    Native(NativeFn),
    /// Forwarded to a script callable held by the bridge.
    Script { slot: u32 },
    /// Signature only (delegate signatures, unimplemented events).
    Abstract,
}

/// Registry entry for a function.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    /// Owning class, or [`TypeHash::EMPTY`] for delegate signatures.
    pub owner: TypeHash,
    pub type_hash: TypeHash,
    pub flags: FunctionFlags,
    /// Parameters in signature order, the return slot included.
    pub params: Vec<PropertyDescriptor>,
    pub metadata: Metadata,
    pub implementation: FunctionImpl,
}

impl FunctionEntry {
    /// Create a member function with no parameters.
    pub fn new(owner: TypeHash, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_function(owner, &name),
            name,
            owner,
            flags: FunctionFlags::PUBLIC,
            params: Vec::new(),
            metadata: Metadata::default(),
            implementation: FunctionImpl::Abstract,
        }
    }

    /// Create a delegate signature; its identity is its type hash.
    pub fn signature(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut entry = Self::new(TypeHash::EMPTY, name.clone());
        entry.type_hash = TypeHash::from_name(&name);
        entry.flags |= FunctionFlags::DELEGATE;
        entry
    }

    pub fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_param(mut self, param: PropertyDescriptor) -> Self {
        if param.flags.is_output_param() {
            self.flags |= FunctionFlags::HAS_OUT_PARMS;
        }
        self.params.push(param.with_flags(PropertyFlags::PARM));
        self
    }

    pub fn with_return(self, kind: PropertyKind) -> Self {
        self.with_param(PropertyDescriptor::return_param(kind))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_native(mut self, native: NativeFn) -> Self {
        self.flags |= FunctionFlags::NATIVE;
        self.implementation = FunctionImpl::Native(native);
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(FunctionFlags::STATIC)
    }

    /// Index of the return slot.
    pub fn return_index(&self) -> Option<usize> {
        self.params.iter().position(PropertyDescriptor::is_return)
    }

    pub fn return_param(&self) -> Option<&PropertyDescriptor> {
        self.params.iter().find(|p| p.is_return())
    }

    /// Parameters the caller supplies, in order.
    pub fn input_params(&self) -> impl Iterator<Item = (usize, &PropertyDescriptor)> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.flags.is_input_param())
    }

    /// The return slot followed by every output parameter, in order.
    pub fn result_params(&self) -> Vec<(usize, &PropertyDescriptor)> {
        let mut results: Vec<_> = self.return_index().map(|i| (i, &self.params[i])).into_iter().collect();
        results.extend(
            self.params
                .iter()
                .enumerate()
                .filter(|(_, p)| p.flags.is_output_param()),
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optional_lookup() -> FunctionEntry {
        FunctionEntry::signature("OnLookup")
            .with_param(PropertyDescriptor::param("Key", PropertyKind::Str))
            .with_param(PropertyDescriptor::out_param("Found", PropertyKind::I32))
            .with_return(PropertyKind::Bool)
    }

    #[test]
    fn signature_identity() {
        let sig = optional_lookup();
        assert_eq!(sig.type_hash, TypeHash::from_name("OnLookup"));
        assert!(sig.flags.contains(FunctionFlags::DELEGATE | FunctionFlags::HAS_OUT_PARMS));
    }

    #[test]
    fn parameter_roles() {
        let sig = optional_lookup();
        let inputs: Vec<_> = sig.input_params().map(|(i, p)| (i, p.name.as_str())).collect();
        assert_eq!(inputs, vec![(0, "Key")]);

        let results: Vec<_> = sig.result_params().iter().map(|(i, p)| (*i, p.name.clone())).collect();
        assert_eq!(results, vec![(2, "ReturnValue".to_string()), (1, "Found".to_string())]);
    }

    #[test]
    fn member_hash_uses_owner() {
        let owner = TypeHash::from_name("Car");
        let f = FunctionEntry::new(owner, "Drive");
        assert_eq!(f.type_hash, TypeHash::from_function(owner, "Drive"));
        assert!(matches!(f.implementation, FunctionImpl::Abstract));
    }
}
