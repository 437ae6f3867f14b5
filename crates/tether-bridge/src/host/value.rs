//! Host-side value representation

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::object::HostObject;

/// Calendar value exchanged with script `Date` objects
pub type Calendar = NaiveDateTime;

/// A value on the host side of the bridge.
///
/// Script values convert into these and back. Objects the host has no
/// representation for become [`HostValue::Unmapped`], never `Null`.
#[derive(Debug, Clone, Default)]
pub enum HostValue {
    /// Script `null` or `undefined`
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Floating point number
    Number(f64),

    /// Integer produced by host code
    Int(i64),

    /// UTF-8 string
    String(String),

    /// Calendar date and time
    Date(Calendar),

    /// Ordered list of values
    Array(Vec<HostValue>),

    /// Shared host instance
    Object(HostObject),

    /// Script object without a host counterpart
    Unmapped,
}

impl HostValue {
    /// Wrap a host instance
    pub fn object<T: std::any::Any + Send + Sync>(value: T) -> Self {
        HostValue::Object(HostObject::new(value))
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Check if this value is the unmapped sentinel
    pub fn is_unmapped(&self) -> bool {
        matches!(self, HostValue::Unmapped)
    }

    /// Get the boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the numeric value of a `Number` or `Int`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Number(n) => Some(*n),
            HostValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the calendar value, if this is a date
    pub fn as_date(&self) -> Option<&Calendar> {
        match self {
            HostValue::Date(date) => Some(date),
            _ => None,
        }
    }

    /// Get the elements, if this is an array
    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the host instance, if this is an object
    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::Int(_) => "int",
            HostValue::String(_) => "string",
            HostValue::Date(_) => "date",
            HostValue::Array(_) => "array",
            HostValue::Object(object) => object.type_name(),
            HostValue::Unmapped => "unmapped",
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Unmapped, HostValue::Unmapped) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Date(a), HostValue::Date(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Number(n) => write!(f, "{}", n),
            HostValue::Int(i) => write!(f, "{}", i),
            HostValue::String(s) => write!(f, "\"{}\"", s),
            HostValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%dT%H:%M:%S")),
            HostValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            HostValue::Object(object) => write!(f, "[object {}]", object.type_name()),
            HostValue::Unmapped => write!(f, "<unmapped>"),
        }
    }
}

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        HostValue::Null
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Number(n)
    }
}

impl From<f32> for HostValue {
    fn from(n: f32) -> Self {
        HostValue::Number(n as f64)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Int(i)
    }
}

impl From<i32> for HostValue {
    fn from(i: i32) -> Self {
        HostValue::Int(i as i64)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<Calendar> for HostValue {
    fn from(date: Calendar) -> Self {
        HostValue::Date(date)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        HostValue::Array(items)
    }
}

impl From<HostObject> for HostValue {
    fn from(object: HostObject) -> Self {
        HostValue::Object(object)
    }
}

impl<T: std::any::Any + Send + Sync> From<Arc<T>> for HostValue {
    fn from(value: Arc<T>) -> Self {
        HostValue::Object(HostObject::from_arc(value))
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}
