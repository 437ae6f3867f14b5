//! Script-side value representation
//!
//! `ScriptValue` is what crosses the engine boundary. Primitives are carried
//! inline; objects are referenced through an opaque `ObjectHandle` that only
//! the owning engine can interpret.

use std::fmt;

/// Opaque handle to an object living on the engine heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// Create from a raw engine-specific id
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw engine-specific id
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Handle to a class definition registered with an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ClassHandle(u32);

impl ClassHandle {
    /// Create from a raw engine-specific id
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw engine-specific id
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier stored in the private slot of a proxy object.
///
/// The upper 32 bits hold a generation counter, the lower 32 bits a slot
/// index. A slot is only ever reused with a bumped generation, so an id
/// that outlives its entry never resolves to a different object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ReferenceId(u64);

impl ReferenceId {
    /// Create from slot index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Create from the packed 64-bit form
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the packed 64-bit form
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Slot index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Slot generation
    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceId({}@{})", self.index(), self.generation())
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index(), self.generation())
    }
}

/// A value as seen by the script engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE 754 double (the only script number type)
    Number(f64),
    /// UTF-8 string
    String(String),
    /// Reference to an engine object
    Object(ObjectHandle),
}

impl ScriptValue {
    /// Check for `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object handle if this is an object
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            ScriptValue::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    /// The `typeof`-style name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Object(_) => "object",
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<i32> for ScriptValue {
    fn from(n: i32) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(s)
    }
}

impl From<ObjectHandle> for ScriptValue {
    fn from(handle: ObjectHandle) -> Self {
        ScriptValue::Object(handle)
    }
}

/// Attributes applied when defining a property from the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyAttributes {
    /// Assignments from script are ignored
    pub read_only: bool,
    /// Not listed by enumeration
    pub dont_enum: bool,
    /// Cannot be deleted from script
    pub dont_delete: bool,
}

impl PropertyAttributes {
    /// Ordinary writable, enumerable property
    pub const NONE: Self = Self {
        read_only: false,
        dont_enum: false,
        dont_delete: false,
    };

    /// Read-only but visible
    pub const READ_ONLY: Self = Self {
        read_only: true,
        dont_enum: false,
        dont_delete: true,
    };

    /// Read-only, hidden from enumeration, undeletable
    pub const HIDDEN: Self = Self {
        read_only: true,
        dont_enum: true,
        dont_delete: true,
    };
}

/// Calendar fields used to build an engine date.
///
/// `month` is zero-based, matching script conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateFields {
    /// Full year
    pub year: f64,
    /// Month, 0-11
    pub month: f64,
    /// Day of month, 1-31
    pub day: f64,
    /// Hour, 0-23
    pub hour: f64,
    /// Minute, 0-59
    pub minute: f64,
    /// Second, 0-59
    pub second: f64,
}
