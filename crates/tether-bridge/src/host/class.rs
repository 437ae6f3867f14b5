//! Host class descriptors
//!
//! A [`ClassDescriptor`] lists what a host type exposes to scripts: an
//! optional constructor, named properties with a getter and an optional
//! setter, named methods and a dispose hook. Descriptors are built with the
//! typed [`ClassBuilder`], which erases the concrete type behind
//! [`HostObject`] downcasts.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use super::args::{Args, CallSite, FromHostValue};
use super::exception::{HostException, HostFailure, HostResult};
use super::object::{short_type_name, HostObject};
use super::value::HostValue;

type ConstructorFn = Box<dyn Fn(&Args<'_>) -> HostResult<HostObject> + Send + Sync>;
type GetterFn = Box<dyn Fn(&HostObject) -> HostResult<HostValue> + Send + Sync>;
type SetterFn = Box<dyn Fn(&HostObject, &Args<'_>) -> HostResult<()> + Send + Sync>;
type MethodFn = Box<dyn Fn(&HostObject, &Args<'_>) -> HostResult<HostValue> + Send + Sync>;
type DisposeFn = Box<dyn Fn(&HostObject) + Send + Sync>;

/// A property mapped to script
pub struct PropertyDescriptor {
    name: String,
    getter: GetterFn,
    setter: Option<SetterFn>,
}

impl PropertyDescriptor {
    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the property can be assigned
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

/// A method mapped to script
pub struct MethodDescriptor {
    name: String,
    call: MethodFn,
}

impl MethodDescriptor {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Metadata of a host class exposed to scripts
pub struct ClassDescriptor {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Option<ConstructorFn>,
    properties: Vec<PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
    dispose: Option<DisposeFn>,
}

impl ClassDescriptor {
    /// Class name as seen by scripts
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `TypeId` of the host type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Unqualified Rust type name of the host type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether scripts can construct instances
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Look up a property
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a method
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether the class maps a property named `name`
    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Whether the class maps a method named `name`
    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    /// Names of mapped properties, in declaration order
    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    /// Names of mapped methods, in declaration order
    pub fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name.clone()).collect()
    }

    /// Run the constructor
    pub fn construct(&self, args: &[HostValue]) -> HostResult<HostObject> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| HostFailure::NoConstructor(self.name.clone()))?;
        constructor(&Args::new(args, CallSite::Constructor { class: &self.name }))
    }

    /// Read a property of `object`
    pub fn get(&self, object: &HostObject, property: &str) -> HostResult<HostValue> {
        let descriptor = self.property(property).ok_or_else(|| HostFailure::UnknownProperty {
            property: property.to_string(),
            class: self.name.clone(),
        })?;
        (descriptor.getter)(object)
    }

    /// Assign a property of `object`
    pub fn set(&self, object: &HostObject, property: &str, value: HostValue) -> HostResult<()> {
        let descriptor = self.property(property).ok_or_else(|| HostFailure::UnknownProperty {
            property: property.to_string(),
            class: self.name.clone(),
        })?;
        let setter = descriptor.setter.as_ref().ok_or_else(|| HostFailure::PropertyReadOnly {
            property: property.to_string(),
            class: self.name.clone(),
        })?;
        let values = [value];
        setter(
            object,
            &Args::new(
                &values,
                CallSite::Setter {
                    class: &self.name,
                    property,
                },
            ),
        )
    }

    /// Invoke a method on `object`
    pub fn call(&self, object: &HostObject, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        let descriptor = self.method(method).ok_or_else(|| HostFailure::UnknownMethod {
            method: method.to_string(),
            class: self.name.clone(),
        })?;
        (descriptor.call)(
            object,
            &Args::new(
                args,
                CallSite::Method {
                    class: &self.name,
                    method,
                },
            ),
        )
    }

    /// Run the dispose hook, if any
    pub fn dispose(&self, object: &HostObject) {
        if let Some(dispose) = &self.dispose {
            dispose(object);
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructor", &self.constructor.is_some())
            .field("properties", &self.property_names())
            .field("methods", &self.method_names())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Typed builder for a [`ClassDescriptor`]
///
/// # Example
///
/// ```ignore
/// let descriptor = ClassBuilder::<Point>::new("Point")
///     .constructor(|args| Ok(Point::new(args.required(0, "x")?, args.required(1, "y")?)))
///     .property("x", |p| Ok(p.x()))
///     .method("length", |p, _args| Ok(p.length()))
///     .build();
/// ```
pub struct ClassBuilder<T> {
    descriptor: ClassDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Start describing `T` under the script name `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: ClassDescriptor {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                type_name: short_type_name(std::any::type_name::<T>()),
                constructor: None,
                properties: Vec::new(),
                methods: Vec::new(),
                dispose: None,
            },
            _marker: PhantomData,
        }
    }

    /// Allow scripts to construct instances with `new`
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&Args<'_>) -> HostResult<T> + Send + Sync + 'static,
    {
        self.descriptor.constructor = Some(Box::new(move |args: &Args<'_>| constructor(args).map(HostObject::new)));
        self
    }

    /// Map a read-only property
    pub fn property<V, G>(mut self, name: impl Into<String>, getter: G) -> Self
    where
        V: Into<HostValue>,
        G: Fn(&T) -> HostResult<V> + Send + Sync + 'static,
    {
        let name = name.into();
        self.descriptor.properties.push(PropertyDescriptor {
            getter: Self::getter(name.clone(), getter),
            setter: None,
            name,
        });
        self
    }

    /// Map a property scripts may assign. The assigned value is resolved
    /// to `S` before `setter` runs.
    pub fn property_with_setter<V, S, G, W>(mut self, name: impl Into<String>, getter: G, setter: W) -> Self
    where
        V: Into<HostValue>,
        S: FromHostValue,
        G: Fn(&T) -> HostResult<V> + Send + Sync + 'static,
        W: Fn(&T, S) -> HostResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let property = name.clone();
        let setter: SetterFn = Box::new(move |object: &HostObject, args: &Args<'_>| {
            let instance = receiver::<T>(object, &property)?;
            let value = args.required::<S>(0, &property)?;
            setter(instance, value)
        });
        self.descriptor.properties.push(PropertyDescriptor {
            getter: Self::getter(name.clone(), getter),
            setter: Some(setter),
            name,
        });
        self
    }

    /// Map a method
    pub fn method<V, M>(mut self, name: impl Into<String>, method: M) -> Self
    where
        V: Into<HostValue>,
        M: Fn(&T, &Args<'_>) -> HostResult<V> + Send + Sync + 'static,
    {
        let name = name.into();
        let selector = name.clone();
        self.descriptor.methods.push(MethodDescriptor {
            call: Box::new(move |object: &HostObject, args: &Args<'_>| {
                let instance = receiver::<T>(object, &selector)?;
                method(instance, args).map(Into::into)
            }),
            name,
        });
        self
    }

    /// Run `dispose` when the last script reference to an instance is
    /// released
    pub fn on_dispose<D>(mut self, dispose: D) -> Self
    where
        D: Fn(&T) + Send + Sync + 'static,
    {
        self.descriptor.dispose = Some(Box::new(move |object: &HostObject| {
            if let Some(instance) = object.downcast_ref::<T>() {
                dispose(instance);
            }
        }));
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }

    fn getter<V, G>(name: String, getter: G) -> GetterFn
    where
        V: Into<HostValue>,
        G: Fn(&T) -> HostResult<V> + Send + Sync + 'static,
    {
        Box::new(move |object: &HostObject| {
            let instance = receiver::<T>(object, &name)?;
            getter(instance).map(Into::into)
        })
    }
}

fn receiver<'a, T: Any>(object: &'a HostObject, member: &str) -> HostResult<&'a T> {
    object.downcast_ref::<T>().ok_or_else(|| {
        HostException::new(HostFailure::Message(format!(
            "'{}' cannot be used on an instance of '{}'",
            member,
            object.type_name()
        )))
    })
}
