//! Shared handle to a host instance

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Opaque, shared reference to a host instance.
///
/// Cloning only bumps the strong count. Two handles are the same object when
/// [`HostObject::ptr_eq`] holds.
#[derive(Clone)]
pub struct HostObject {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl HostObject {
    /// Wrap a value in a new shared instance
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Share an existing instance
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: short_type_name(std::any::type_name::<T>()),
        }
    }

    /// `TypeId` of the wrapped instance
    pub fn type_id(&self) -> TypeId {
        self.value.as_ref().type_id()
    }

    /// Unqualified Rust type name of the wrapped instance
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the instance as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Share the instance as `Arc<T>`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }

    /// Address of the instance, stable while any handle is alive
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.value) as *const () as usize
    }

    /// Number of strong handles to the instance
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.value)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({}@{:#x})", self.type_name, self.address())
    }
}

/// Strip the module path from a type name. Generic names are kept whole.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}
