//! Deterministic hash-based identity for reflected types and functions.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's name, or from an
//! owner plus a member name for functions and properties. Because the hash
//! is derived from the name, a reflected type can be referenced before it is
//! registered, and the same name always refers to the same identity.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so a type and a
//! function with the same name never collide.
//!
//! # Examples
//!
//! ```
//! use scriptbridge_core::TypeHash;
//!
//! let actor = TypeHash::from_name("Actor");
//! assert_eq!(actor, TypeHash::from_name("Actor"));
//!
//! let tick = TypeHash::from_function(actor, "Tick");
//! assert_ne!(tick, TypeHash::from_function(TypeHash::from_name("Pawn"), "Tick"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for property hashes.
    pub const PROPERTY: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for generated type generations.
    pub const GENERATION: u64 = 0x9a7f3d5e2b8c4601;
}

/// A deterministic 64-bit hash identifying a reflected type or member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a function hash from its owner and name.
    ///
    /// Free functions (delegate signatures) use [`TypeHash::EMPTY`] as owner.
    #[inline]
    pub fn from_function(owner: TypeHash, name: &str) -> Self {
        let hash = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(hash.wrapping_mul(hash_constants::SEP).wrapping_add(owner.0))
    }

    /// Create a property hash from its owner and name.
    #[inline]
    pub fn from_property(owner: TypeHash, name: &str) -> Self {
        let hash = hash_constants::PROPERTY ^ xxh64(name.as_bytes(), 0);
        TypeHash(hash.wrapping_mul(hash_constants::SEP).wrapping_add(owner.0))
    }

    /// Create the identity of one generation of a generated type.
    ///
    /// Each redefinition of a generated type gets a fresh identity so the
    /// superseded type and its replacement can live side by side.
    #[inline]
    pub fn from_generation(name: &str, generation: u32) -> Self {
        let hash = hash_constants::GENERATION ^ xxh64(name.as_bytes(), 0);
        TypeHash(
            hash.wrapping_mul(hash_constants::SEP)
                .wrapping_add(u64::from(generation)),
        )
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("Actor"), TypeHash::from_name("Actor"));
        assert_ne!(TypeHash::from_name("Actor"), TypeHash::from_name("Pawn"));
    }

    #[test]
    fn domains_do_not_collide() {
        let name = "Speed";
        let owner = TypeHash::from_name("Car");
        let ty = TypeHash::from_name(name);
        let func = TypeHash::from_function(owner, name);
        let prop = TypeHash::from_property(owner, name);
        assert_ne!(ty, func);
        assert_ne!(ty, prop);
        assert_ne!(func, prop);
    }

    #[test]
    fn owner_participates_in_member_hash() {
        let a = TypeHash::from_function(TypeHash::from_name("A"), "Run");
        let b = TypeHash::from_function(TypeHash::from_name("B"), "Run");
        assert_ne!(a, b);
    }

    #[test]
    fn generations_are_distinct() {
        let g1 = TypeHash::from_generation("Car", 1);
        let g2 = TypeHash::from_generation("Car", 2);
        assert_ne!(g1, g2);
        assert_eq!(g1, TypeHash::from_generation("Car", 1));
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("x").is_empty());
        assert_eq!(TypeHash(7).as_u64(), 7);
    }

    #[test]
    fn debug_and_display() {
        let h = TypeHash(0x2a);
        assert_eq!(format!("{h:?}"), "TypeHash(0x000000000000002a)");
        assert_eq!(format!("{h}"), "0x000000000000002a");
    }
}
