//! Object heap and mark-sweep collector
//!
//! Objects live in a map keyed by a monotonically increasing id, so a stale
//! `ObjectHandle` never aliases a newer object. Collection marks from the
//! supplied roots (objects and scopes), sweeps everything else, and hands
//! back the private slots of swept proxies so their finalizers can run.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use tether_sdk::{ClassHandle, ObjectHandle, PropertyAttributes, ReferenceId, ScriptResult, ScriptValue};

use crate::ast::FunctionDef;
use crate::engine::TestEngine;

/// Built-in function implementation
pub type NativeFn = fn(&TestEngine, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue>;

/// A built-in function, optionally usable with `new`
#[derive(Clone, Copy)]
pub struct NativeFunction {
    /// Function name
    pub name: &'static str,
    /// Behavior when called
    pub call: NativeFn,
    /// Behavior under `new` (receiver is `undefined`)
    pub construct: Option<NativeFn>,
}

/// A lexical scope
#[derive(Default)]
pub struct Scope {
    vars: RefCell<FxHashMap<String, ScriptValue>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// Create a child of `parent`
    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Declare `name` in this scope
    pub fn define(&self, name: &str, value: ScriptValue) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Resolve `name` through the scope chain
    pub fn lookup(&self, name: &str) -> Option<ScriptValue> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    /// Assign an existing binding. Returns false when `name` is undeclared.
    pub fn assign(&self, name: &str, value: ScriptValue) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

/// A script function closed over its defining scope
pub struct Closure {
    /// Parsed definition
    pub def: Rc<FunctionDef>,
    /// Captured scope
    pub scope: Rc<Scope>,
    /// Source the definition was parsed from
    pub source_id: u64,
}

/// Object representation
pub enum ObjectKind {
    /// Ordinary object
    Plain,
    /// Dense array
    Array(Vec<ScriptValue>),
    /// Date; `None` is an invalid date
    Date(Option<NaiveDateTime>),
    /// Error instance
    Error,
    /// Script function
    Closure(Rc<Closure>),
    /// Built-in function
    Native(NativeFunction),
    /// Host-backed instance with a private slot
    Proxy {
        class: ClassHandle,
        slot: Option<ReferenceId>,
    },
    /// Host-backed callable
    HostFunction { class: ClassHandle },
    /// Global constructor of a host-backed class
    HostConstructor { class: ClassHandle },
}

/// A property slot
#[derive(Clone)]
pub struct Property {
    pub value: ScriptValue,
    pub attributes: PropertyAttributes,
}

/// A heap object
pub struct HeapObject {
    pub kind: ObjectKind,
    pub prototype: Option<ObjectHandle>,
    /// Own properties in insertion order
    pub properties: Vec<(String, Property)>,
}

impl HeapObject {
    /// Create an object with no own properties
    pub fn new(kind: ObjectKind, prototype: Option<ObjectHandle>) -> Self {
        Self {
            kind,
            prototype,
            properties: Vec::new(),
        }
    }

    /// Look up an own property
    pub fn own(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, property)| property)
    }

    /// Define or overwrite an own property, ignoring read-only slots unless
    /// `force` is set
    pub fn put(&mut self, name: &str, value: ScriptValue, attributes: Option<PropertyAttributes>, force: bool) {
        match self.properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, property)) => {
                if property.attributes.read_only && !force {
                    return;
                }
                property.value = value;
                if let Some(attributes) = attributes {
                    property.attributes = attributes;
                }
            }
            None => self.properties.push((
                name.to_string(),
                Property {
                    value,
                    attributes: attributes.unwrap_or_default(),
                },
            )),
        }
    }

    /// Whether the object can be called
    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Closure(_)
                | ObjectKind::Native(_)
                | ObjectKind::HostFunction { .. }
                | ObjectKind::HostConstructor { .. }
        )
    }
}

/// Collector statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collections
    pub collections: u64,
    /// Objects freed by the last collection
    pub last_freed: usize,
    /// Objects freed over the heap lifetime
    pub total_freed: usize,
}

/// The object heap
#[derive(Default)]
pub struct Heap {
    objects: FxHashMap<u64, HeapObject>,
    next_id: u64,
    stats: GcStats,
}

impl Heap {
    /// Allocate an object
    pub fn alloc(&mut self, object: HeapObject) -> ObjectHandle {
        self.next_id += 1;
        self.objects.insert(self.next_id, object);
        ObjectHandle::from_raw(self.next_id)
    }

    /// Borrow an object
    pub fn get(&self, handle: ObjectHandle) -> Option<&HeapObject> {
        self.objects.get(&handle.as_u64())
    }

    /// Mutably borrow an object
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut HeapObject> {
        self.objects.get_mut(&handle.as_u64())
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Collector statistics
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Mark from `roots` and `scopes`, sweep the rest.
    ///
    /// Returns `(class, id)` for every swept proxy that still held its
    /// private slot.
    pub fn collect(&mut self, roots: &[ObjectHandle], scopes: &[Rc<Scope>]) -> Vec<(ClassHandle, ReferenceId)> {
        let mut marked: FxHashSet<u64> = FxHashSet::default();
        let mut seen_scopes: FxHashSet<*const Scope> = FxHashSet::default();
        let mut objects: Vec<ObjectHandle> = roots.to_vec();
        let mut pending_scopes: Vec<Rc<Scope>> = scopes.to_vec();

        loop {
            while let Some(scope) = pending_scopes.pop() {
                if !seen_scopes.insert(Rc::as_ptr(&scope)) {
                    continue;
                }
                objects.extend(scope.vars.borrow().values().filter_map(ScriptValue::as_object));
                if let Some(parent) = &scope.parent {
                    pending_scopes.push(Rc::clone(parent));
                }
            }

            let Some(handle) = objects.pop() else {
                break;
            };
            if !marked.insert(handle.as_u64()) {
                continue;
            }
            let Some(object) = self.objects.get(&handle.as_u64()) else {
                continue;
            };

            objects.extend(object.prototype);
            objects.extend(
                object
                    .properties
                    .iter()
                    .filter_map(|(_, property)| property.value.as_object()),
            );
            match &object.kind {
                ObjectKind::Array(items) => objects.extend(items.iter().filter_map(ScriptValue::as_object)),
                ObjectKind::Closure(closure) => pending_scopes.push(Rc::clone(&closure.scope)),
                _ => {}
            }
        }

        let before = self.objects.len();
        let mut finalizable = Vec::new();
        self.objects.retain(|id, object| {
            if marked.contains(id) {
                return true;
            }
            if let ObjectKind::Proxy { class, slot } = &mut object.kind {
                if let Some(slot) = slot.take() {
                    finalizable.push((*class, slot));
                }
            }
            false
        });

        let freed = before - self.objects.len();
        self.stats.collections += 1;
        self.stats.last_freed = freed;
        self.stats.total_freed += freed;
        finalizable
    }
}
