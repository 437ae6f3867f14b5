//! Registry of host classes known to the bridge
//!
//! Classes are looked up by `TypeId` when a host object crosses into script,
//! and by script name when a constructor is invoked.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use tether_sdk::ClassHandle;

use crate::host::ClassDescriptor;

/// A class registered with both the bridge and the engine
#[derive(Debug, Clone)]
pub struct RegisteredClass {
    /// Host-side description
    pub descriptor: Arc<ClassDescriptor>,
    /// Engine-side class
    pub handle: ClassHandle,
}

/// Registry of host classes
#[derive(Debug, Default)]
pub struct ClassRegistry {
    by_type: DashMap<TypeId, RegisteredClass>,
    by_name: DashMap<String, TypeId>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a class
    pub fn insert(&self, descriptor: Arc<ClassDescriptor>, handle: ClassHandle) -> RegisteredClass {
        let class = RegisteredClass { descriptor, handle };
        self.by_name
            .insert(class.descriptor.name().to_string(), class.descriptor.type_id());
        self.by_type.insert(class.descriptor.type_id(), class.clone());
        class
    }

    /// Look up the class of a host type
    pub fn by_type(&self, type_id: TypeId) -> Option<RegisteredClass> {
        self.by_type.get(&type_id).map(|entry| entry.clone())
    }

    /// Look up a class by script name
    pub fn by_name(&self, name: &str) -> Option<RegisteredClass> {
        let type_id = *self.by_name.get(name)?;
        self.by_type(type_id)
    }

    /// Whether a host type is registered
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.by_type.contains_key(&type_id)
    }

    /// Whether a script name is taken
    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Whether no class is registered
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
