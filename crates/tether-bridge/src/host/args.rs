//! Argument resolution for host constructors, methods and setters

use std::any::Any;
use std::sync::Arc;

use super::exception::HostFailure;
use super::object::{short_type_name, HostObject};
use super::value::{Calendar, HostValue};

/// Method name reported for constructor parameters
pub const CONSTRUCTOR_NAME: &str = "<constructor>";

/// Where a set of arguments is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite<'a> {
    /// `new Class(...)`
    Constructor {
        /// Class name
        class: &'a str,
    },
    /// `object.method(...)`
    Method {
        /// Class name
        class: &'a str,
        /// Method name
        method: &'a str,
    },
    /// `object.property = value`
    Setter {
        /// Class name
        class: &'a str,
        /// Property name
        property: &'a str,
    },
}

impl CallSite<'_> {
    fn missing(&self, param: &str) -> HostFailure {
        match *self {
            CallSite::Constructor { class } => HostFailure::ParamRequired {
                param: param.to_string(),
                method: CONSTRUCTOR_NAME.to_string(),
                class: class.to_string(),
            },
            CallSite::Method { class, method } => HostFailure::ParamRequired {
                param: param.to_string(),
                method: method.to_string(),
                class: class.to_string(),
            },
            CallSite::Setter { class, property } => HostFailure::PropertyRequired {
                property: property.to_string(),
                class: class.to_string(),
            },
        }
    }

    fn invalid(&self, param: &str, expected: &str) -> HostFailure {
        match *self {
            CallSite::Constructor { class } => HostFailure::ParamTypeInvalid {
                param: param.to_string(),
                method: CONSTRUCTOR_NAME.to_string(),
                class: class.to_string(),
                expected: expected.to_string(),
            },
            CallSite::Method { class, method } => HostFailure::ParamTypeInvalid {
                param: param.to_string(),
                method: method.to_string(),
                class: class.to_string(),
                expected: expected.to_string(),
            },
            CallSite::Setter { class, property } => HostFailure::PropertyTypeInvalid {
                property: property.to_string(),
                class: class.to_string(),
                expected: expected.to_string(),
            },
        }
    }
}

/// Arguments passed from script, already converted to host values
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [HostValue],
    site: CallSite<'a>,
}

impl<'a> Args<'a> {
    /// Create an argument view
    pub fn new(values: &'a [HostValue], site: CallSite<'a>) -> Self {
        Self { values, site }
    }

    /// Number of arguments passed
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were passed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw argument at `index`
    pub fn get(&self, index: usize) -> Option<&'a HostValue> {
        self.values.get(index)
    }

    /// All raw arguments
    pub fn values(&self) -> &'a [HostValue] {
        self.values
    }

    /// Where the arguments are being resolved
    pub fn site(&self) -> CallSite<'a> {
        self.site
    }

    /// Resolve a mandatory argument.
    ///
    /// Fails with `ParamRequired` when missing or null and with
    /// `ParamTypeInvalid` when of the wrong type (`PropertyRequired` and
    /// `PropertyTypeInvalid` for setters).
    pub fn required<T: FromHostValue>(&self, index: usize, name: &str) -> Result<T, HostFailure> {
        match self.values.get(index) {
            None | Some(HostValue::Null) => Err(self.site.missing(name)),
            Some(value) => T::from_host(value).ok_or_else(|| self.site.invalid(name, T::type_name())),
        }
    }

    /// Resolve an optional argument. Missing or null yields `None`.
    pub fn optional<T: FromHostValue>(&self, index: usize, name: &str) -> Result<Option<T>, HostFailure> {
        match self.values.get(index) {
            None | Some(HostValue::Null) => Ok(None),
            Some(value) => T::from_host(value)
                .map(Some)
                .ok_or_else(|| self.site.invalid(name, T::type_name())),
        }
    }
}

/// Conversion from a host value to a concrete parameter type
pub trait FromHostValue: Sized {
    /// Name reported when the conversion fails
    fn type_name() -> &'static str;

    /// Convert, or `None` when the value has another type
    fn from_host(value: &HostValue) -> Option<Self>;
}

macro_rules! impl_from_host_number {
    ($($ty:ty),*) => {
        $(
            impl FromHostValue for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn from_host(value: &HostValue) -> Option<Self> {
                    value.as_f64().map(|n| n as $ty)
                }
            }
        )*
    };
}

impl_from_host_number!(f64, f32, i64, i32, i16, u8);

impl FromHostValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromHostValue for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromHostValue for Calendar {
    fn type_name() -> &'static str {
        "Date"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_date().copied()
    }
}

impl FromHostValue for Vec<HostValue> {
    fn type_name() -> &'static str {
        "Array"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_array().map(<[HostValue]>::to_vec)
    }
}

impl FromHostValue for HostValue {
    fn type_name() -> &'static str {
        "Object"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromHostValue for HostObject {
    fn type_name() -> &'static str {
        "Object"
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl<T: Any + Send + Sync> FromHostValue for Arc<T> {
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<T>())
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_object().and_then(HostObject::downcast::<T>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point;

    fn method_site() -> CallSite<'static> {
        CallSite::Method {
            class: "Point",
            method: "move",
        }
    }

    #[test]
    fn test_required_numbers_are_narrowed() {
        let values = [HostValue::Number(2.9), HostValue::Int(-3)];
        let args = Args::new(&values, method_site());

        assert_eq!(args.required::<f64>(0, "dx").unwrap(), 2.9);
        assert_eq!(args.required::<i32>(0, "dx").unwrap(), 2);
        assert_eq!(args.required::<u8>(0, "dx").unwrap(), 2);
        assert_eq!(args.required::<i16>(1, "dy").unwrap(), -3);
        assert_eq!(args.required::<f32>(1, "dy").unwrap(), -3.0);
    }

    #[test]
    fn test_required_missing() {
        let values = [HostValue::Null];
        let args = Args::new(&values, method_site());

        let err = args.required::<f64>(0, "dx").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter 'dx' of method 'move' from 'Point' is required"
        );
        assert!(matches!(
            args.required::<f64>(1, "dy"),
            Err(HostFailure::ParamRequired { .. })
        ));
    }

    #[test]
    fn test_required_wrong_type() {
        let values = [HostValue::from("north")];
        let args = Args::new(&values, CallSite::Constructor { class: "Point" });

        let err = args.required::<f64>(0, "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter 'x' of method '<constructor>' from 'Point' is not instance of 'f64'"
        );
    }

    #[test]
    fn test_setter_site() {
        let values = [HostValue::Bool(true)];
        let setter = CallSite::Setter {
            class: "Point",
            property: "x",
        };
        let args = Args::new(&values, setter);
        assert_eq!(
            args.required::<f64>(0, "x").unwrap_err().to_string(),
            "Property 'x' of 'Point' is not instance of 'f64'"
        );

        let args = Args::new(&[], setter);
        assert_eq!(
            args.required::<f64>(0, "x").unwrap_err().to_string(),
            "Property 'x' of 'Point' is required"
        );
    }

    #[test]
    fn test_optional() {
        let values = [HostValue::Null, HostValue::from("a"), HostValue::Int(1)];
        let args = Args::new(&values, method_site());

        assert_eq!(args.optional::<String>(0, "a").unwrap(), None);
        assert_eq!(args.optional::<String>(1, "b").unwrap(), Some("a".to_string()));
        assert_eq!(args.optional::<String>(5, "c").unwrap(), None);
        assert!(args.optional::<String>(2, "d").is_err());
    }

    #[test]
    fn test_object_parameters() {
        let object = HostObject::new(Point);
        let values = [HostValue::Object(object.clone()), HostValue::object(1u8)];
        let args = Args::new(&values, method_site());

        let point = args.required::<Arc<Point>>(0, "p").unwrap();
        assert!(HostObject::from_arc(point).ptr_eq(&object));
        assert_eq!(
            args.required::<Arc<Point>>(1, "q").unwrap_err().to_string(),
            "Parameter 'q' of method 'move' from 'Point' is not instance of 'Point'"
        );
        assert!(args.required::<HostObject>(0, "p").is_ok());
        assert_eq!(args.len(), 2);
    }
}
