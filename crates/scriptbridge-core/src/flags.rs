//! Reflection flags for properties, functions and types.

use bitflags::bitflags;

bitflags! {
    /// Flags describing how a reflected property may be accessed.
    ///
    /// Parameter flags share this set: a function parameter is a property with
    /// `PARM` set, and its role (input, output, return) is derived from the
    /// `OUT_PARM`, `RETURN_PARM` and `CONST_PARM` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// Editable from tooling and scripts.
        const EDIT = 1 << 0;
        /// Visible to scripts.
        const SCRIPT_VISIBLE = 1 << 1;
        /// Scripts may read but never write.
        const READ_ONLY = 1 << 2;
        /// Editable on defaults only; treated as read-only on instances.
        const EDIT_CONST = 1 << 3;
        /// Function parameter.
        const PARM = 1 << 4;
        /// Output (by reference) parameter.
        const OUT_PARM = 1 << 5;
        /// Return value slot.
        const RETURN_PARM = 1 << 6;
        /// Const parameter (a const reference is an input, not an output).
        const CONST_PARM = 1 << 7;
    }
}

impl PropertyFlags {
    /// Check if a parameter with these flags receives a value from the caller.
    pub fn is_input_param(self) -> bool {
        !(self.contains(PropertyFlags::RETURN_PARM)
            || (self.contains(PropertyFlags::OUT_PARM) && !self.contains(PropertyFlags::CONST_PARM)))
    }

    /// Check if a parameter with these flags produces a value besides the return slot.
    pub fn is_output_param(self) -> bool {
        !self.contains(PropertyFlags::RETURN_PARM)
            && self.contains(PropertyFlags::OUT_PARM)
            && !self.contains(PropertyFlags::CONST_PARM)
    }

    /// Check if scripts may read a property with these flags.
    pub fn is_script_readable(self) -> bool {
        self.intersects(PropertyFlags::EDIT | PropertyFlags::SCRIPT_VISIBLE)
    }

    /// Check if scripts may write a property with these flags.
    pub fn is_script_writable(self) -> bool {
        self.is_script_readable()
            && !self.intersects(PropertyFlags::READ_ONLY | PropertyFlags::EDIT_CONST)
    }
}

bitflags! {
    /// Flags describing a reflected function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        /// Callable without an instance.
        const STATIC = 1 << 0;
        /// Does not mutate its owner.
        const PURE = 1 << 1;
        /// Implemented natively.
        const NATIVE = 1 << 2;
        /// Event that can be implemented by subclasses.
        const EVENT = 1 << 3;
        /// Event that scripts may override.
        const SCRIPT_EVENT = 1 << 4;
        /// Callable from scripts.
        const SCRIPT_CALLABLE = 1 << 5;
        /// Signature of a delegate rather than a member function.
        const DELEGATE = 1 << 6;
        /// Has at least one output parameter.
        const HAS_OUT_PARMS = 1 << 7;
        /// Has default parameter metadata.
        const HAS_DEFAULTS = 1 << 8;
        /// Public visibility.
        const PUBLIC = 1 << 9;
    }
}

bitflags! {
    /// Flags describing a reflected class or struct.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Eligible for a script wrapper type.
        const EXPORTED = 1 << 0;
        /// Defined natively (never regenerated by scripts).
        const NATIVE = 1 << 1;
        /// Synthesized from a script definition.
        const SCRIPT_GENERATED = 1 << 2;
        /// Superseded by a newer generation; no longer discoverable by name.
        const STALE = 1 << 3;
        /// A newer generation of this type exists.
        const NEWER_VERSION_EXISTS = 1 << 4;
        /// Cannot be subclassed.
        const FINAL = 1 << 5;
    }
}
