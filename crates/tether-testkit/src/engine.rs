//! `TestEngine` - a small single-context script engine.
//!
//! Implements [`ScriptEngine`] over a tree-walking interpreter so the bridge
//! can be exercised end to end. Host-backed classes are honored exactly as a
//! production engine would: property access on proxies goes through
//! `ObjectCallbacks` first, construction and calls are forwarded, and
//! finalizers of collected proxies run on a separate thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tether_sdk::{
    ClassDefinition, ClassHandle, DateFields, DebugCommand, DebuggerChannel, EngineError, EngineResult,
    ObjectCallbacks, ObjectHandle, PropertyAttributes, ReferenceId, ScriptEngine, ScriptResult, ScriptValue,
    SourcePosition,
};
use tracing::{debug, trace};

use crate::ast::FunctionDef;
use crate::builtins;
use crate::error::SyntaxError;
use crate::heap::{Closure, GcStats, Heap, HeapObject, NativeFunction, ObjectKind, Scope};
use crate::interpreter::Completion;
use crate::parser::parse_program;

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Nested script calls allowed before a `RangeError`
    pub max_call_depth: usize,
    /// Run finalizers on a separate thread (otherwise inline)
    pub finalize_on_thread: bool,
    /// Reject every host request to build an error object
    pub refuse_errors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            finalize_on_thread: true,
            refuse_errors: false,
        }
    }
}

/// Well-known prototypes
#[derive(Debug, Clone, Copy)]
pub(crate) struct Realm {
    pub object_prototype: ObjectHandle,
    pub function_prototype: ObjectHandle,
    pub array_prototype: ObjectHandle,
    pub date_prototype: ObjectHandle,
    pub error_prototype: ObjectHandle,
}

struct ClassEntry {
    name: String,
    callbacks: Arc<dyn ObjectCallbacks>,
    constructor: Option<ObjectHandle>,
}

/// An active script call
pub(crate) struct Frame {
    pub function: String,
    pub source_id: u64,
    pub line: u32,
    pub column: u32,
}

impl Frame {
    fn new(function: impl Into<String>, source_id: u64) -> Self {
        Self {
            function: function.into(),
            source_id,
            line: 0,
            column: 0,
        }
    }
}

/// Something that can be invoked
pub(crate) enum Callee {
    Closure(Rc<Closure>),
    Native(NativeFunction),
    Host(ClassHandle),
    Constructor(ClassHandle),
}

/// Scripted engine double
pub struct TestEngine {
    pub(crate) heap: RefCell<Heap>,
    pub(crate) realm: Realm,
    pub(crate) globals: Rc<Scope>,
    classes: RefCell<Vec<ClassEntry>>,
    frames: RefCell<Vec<Frame>>,
    sources: RefCell<FxHashMap<u64, Option<String>>>,
    next_source_id: Cell<u64>,
    debugger: RefCell<Option<Arc<dyn DebuggerChannel>>>,
    stepping: Cell<bool>,
    options: EngineOptions,
}

impl TestEngine {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine with explicit options
    pub fn with_options(options: EngineOptions) -> Self {
        let mut heap = Heap::default();
        let object_prototype = heap.alloc(HeapObject::new(ObjectKind::Plain, None));
        let mut derived = || heap.alloc(HeapObject::new(ObjectKind::Plain, Some(object_prototype)));
        let realm = Realm {
            object_prototype,
            function_prototype: derived(),
            array_prototype: derived(),
            date_prototype: derived(),
            error_prototype: derived(),
        };

        let engine = Self {
            heap: RefCell::new(heap),
            realm,
            globals: Rc::new(Scope::default()),
            classes: RefCell::new(Vec::new()),
            frames: RefCell::new(Vec::new()),
            sources: RefCell::new(FxHashMap::default()),
            next_source_id: Cell::new(1),
            debugger: RefCell::new(None),
            stepping: Cell::new(false),
            options,
        };
        builtins::install(&engine);
        engine
    }

    /// Read a global binding
    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        self.globals.lookup(name)
    }

    /// Number of objects currently on the heap
    pub fn live_objects(&self) -> usize {
        self.heap.borrow().len()
    }

    /// Collector statistics
    pub fn gc_stats(&self) -> GcStats {
        self.heap.borrow().stats()
    }

    // ========================================================================
    // Heap helpers
    // ========================================================================

    pub(crate) fn alloc(&self, kind: ObjectKind, prototype: ObjectHandle) -> ObjectHandle {
        self.heap.borrow_mut().alloc(HeapObject::new(kind, Some(prototype)))
    }

    /// Define an own property, bypassing callbacks and read-only checks
    pub(crate) fn define_own(&self, object: ObjectHandle, name: &str, value: ScriptValue, attributes: PropertyAttributes) {
        if let Some(target) = self.heap.borrow_mut().get_mut(object) {
            target.put(name, value, Some(attributes), true);
        }
    }

    pub(crate) fn alloc_native(&self, function: NativeFunction) -> ObjectHandle {
        let handle = self.alloc(ObjectKind::Native(function), self.realm.function_prototype);
        self.define_own(handle, "name", function.name.into(), PropertyAttributes::READ_ONLY);
        handle
    }

    pub(crate) fn make_closure(&self, def: Rc<FunctionDef>, scope: Rc<Scope>, source_id: u64) -> ObjectHandle {
        let name = def.name.clone().unwrap_or_default();
        let handle = self.alloc(
            ObjectKind::Closure(Rc::new(Closure { def, scope, source_id })),
            self.realm.function_prototype,
        );
        self.define_own(handle, "name", ScriptValue::String(name), PropertyAttributes::READ_ONLY);
        handle
    }

    pub(crate) fn is_callable(&self, object: ObjectHandle) -> bool {
        self.heap
            .borrow()
            .get(object)
            .is_some_and(HeapObject::is_callable)
    }

    pub(crate) fn callee(&self, object: ObjectHandle) -> Option<Callee> {
        let heap = self.heap.borrow();
        match &heap.get(object)?.kind {
            ObjectKind::Closure(closure) => Some(Callee::Closure(Rc::clone(closure))),
            ObjectKind::Native(native) => Some(Callee::Native(*native)),
            ObjectKind::HostFunction { class } => Some(Callee::Host(*class)),
            ObjectKind::HostConstructor { class } => Some(Callee::Constructor(*class)),
            _ => None,
        }
    }

    pub(crate) fn array_items(&self, object: ObjectHandle) -> Option<Vec<ScriptValue>> {
        match &self.heap.borrow().get(object)?.kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    fn proxy_class(&self, object: ObjectHandle) -> Option<ClassHandle> {
        match self.heap.borrow().get(object)?.kind {
            ObjectKind::Proxy { class, .. } => Some(class),
            _ => None,
        }
    }

    fn class_callbacks(&self, class: ClassHandle) -> Option<Arc<dyn ObjectCallbacks>> {
        self.classes
            .borrow()
            .get(class.as_u32() as usize)
            .map(|entry| Arc::clone(&entry.callbacks))
    }

    fn class_name(&self, class: ClassHandle) -> String {
        self.classes
            .borrow()
            .get(class.as_u32() as usize)
            .map(|entry| entry.name.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Allocate an error object of the given constructor name
    pub(crate) fn new_error(&self, name: &str, message: &str) -> ObjectHandle {
        let handle = self.alloc(ObjectKind::Error, self.realm.error_prototype);
        if name != "Error" {
            self.define_own(handle, "name", name.into(), PropertyAttributes::NONE);
        }
        self.define_own(handle, "message", message.into(), PropertyAttributes::NONE);
        let stack = self.stack_trace();
        self.define_own(handle, "stack", ScriptValue::String(stack), PropertyAttributes::NONE);
        handle
    }

    /// Build an error, report it to the debugger and return it for throwing
    pub(crate) fn throw_error(&self, name: &str, message: impl AsRef<str>) -> ScriptValue {
        let error = ScriptValue::Object(self.new_error(name, message.as_ref()));
        self.report_exception(&error);
        error
    }

    fn syntax_error(&self, error: &SyntaxError) -> ScriptValue {
        ScriptValue::Object(self.new_error("SyntaxError", &error.to_string()))
    }

    // ========================================================================
    // Property access
    // ========================================================================

    /// Read `name` from any value
    pub(crate) fn get_value(&self, base: &ScriptValue, name: &str) -> ScriptResult<ScriptValue> {
        match base {
            ScriptValue::Object(object) => self.get_member(*object, name),
            ScriptValue::String(s) => Ok(match name {
                "length" => ScriptValue::Number(s.chars().count() as f64),
                _ => name
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| ScriptValue::String(c.to_string()))
                    .unwrap_or_default(),
            }),
            ScriptValue::Undefined | ScriptValue::Null => Err(self.throw_error(
                "TypeError",
                format!("Cannot read property '{}' of {}", name, self.display(base)),
            )),
            _ => Ok(ScriptValue::Undefined),
        }
    }

    /// Read `name` from an object, consulting class callbacks first
    pub(crate) fn get_member(&self, object: ObjectHandle, name: &str) -> ScriptResult<ScriptValue> {
        if self.heap.borrow().get(object).is_none() {
            return Err(self.throw_error("TypeError", "Invalid object reference"));
        }
        if let Some(class) = self.proxy_class(object) {
            if let Some(callbacks) = self.class_callbacks(class) {
                let handled = callbacks.get_property(self, object, name).map_err(|e| {
                    self.report_exception(&e);
                    e
                })?;
                if let Some(value) = handled {
                    return Ok(value);
                }
            }
        }
        Ok(self.get_ordinary(object, name))
    }

    fn get_ordinary(&self, object: ObjectHandle, name: &str) -> ScriptValue {
        let heap = self.heap.borrow();
        let mut current = heap.get(object);
        while let Some(target) = current {
            if let ObjectKind::Array(items) = &target.kind {
                if name == "length" {
                    return ScriptValue::Number(items.len() as f64);
                }
                if let Ok(index) = name.parse::<usize>() {
                    return items.get(index).cloned().unwrap_or_default();
                }
            }
            if let Some(property) = target.own(name) {
                return property.value.clone();
            }
            current = target.prototype.and_then(|proto| heap.get(proto));
        }
        ScriptValue::Undefined
    }

    /// Assign `name` on any value
    pub(crate) fn put_value(&self, base: &ScriptValue, name: &str, value: ScriptValue) -> ScriptResult<()> {
        match base {
            ScriptValue::Object(object) => self.put_member(*object, name, value, None),
            ScriptValue::Undefined | ScriptValue::Null => Err(self.throw_error(
                "TypeError",
                format!("Cannot set property '{}' of {}", name, self.display(base)),
            )),
            _ => Ok(()),
        }
    }

    /// Assign `name` on an object, consulting class callbacks first
    pub(crate) fn put_member(
        &self,
        object: ObjectHandle,
        name: &str,
        value: ScriptValue,
        attributes: Option<PropertyAttributes>,
    ) -> ScriptResult<()> {
        if let Some(class) = self.proxy_class(object) {
            if let Some(callbacks) = self.class_callbacks(class) {
                let handled = callbacks.set_property(self, object, name, &value).map_err(|e| {
                    self.report_exception(&e);
                    e
                })?;
                if handled {
                    return Ok(());
                }
            }
        }

        let mut heap = self.heap.borrow_mut();
        let Some(target) = heap.get_mut(object) else {
            drop(heap);
            return Err(self.throw_error("TypeError", "Invalid object reference"));
        };
        if let ObjectKind::Array(items) = &mut target.kind {
            if name == "length" {
                let length = match value {
                    ScriptValue::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as usize,
                    _ => return Ok(()),
                };
                items.resize(length, ScriptValue::Undefined);
                return Ok(());
            }
            if let Ok(index) = name.parse::<usize>() {
                if index >= items.len() {
                    items.resize(index + 1, ScriptValue::Undefined);
                }
                items[index] = value;
                return Ok(());
            }
        }
        target.put(name, value, attributes, false);
        Ok(())
    }

    pub(crate) fn has_member(&self, object: ObjectHandle, name: &str) -> bool {
        if let Some(class) = self.proxy_class(object) {
            if let Some(callbacks) = self.class_callbacks(class) {
                if callbacks.has_property(self, object, name) {
                    return true;
                }
            }
        }
        let heap = self.heap.borrow();
        let mut current = heap.get(object);
        while let Some(target) = current {
            if let ObjectKind::Array(items) = &target.kind {
                if name == "length" || name.parse::<usize>().is_ok_and(|index| index < items.len()) {
                    return true;
                }
            }
            if target.own(name).is_some() {
                return true;
            }
            current = target.prototype.and_then(|proto| heap.get(proto));
        }
        false
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call any callable object
    pub(crate) fn call(&self, function: ObjectHandle, this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        match self.callee(function) {
            Some(Callee::Closure(closure)) => self.call_closure(&closure, this, args),
            Some(Callee::Native(native)) => (native.call)(self, this, args),
            Some(Callee::Host(class)) => {
                let callbacks = self
                    .class_callbacks(class)
                    .ok_or_else(|| self.throw_error("TypeError", "Unknown host class"))?;
                callbacks.call_as_function(self, function, this, args).map_err(|e| {
                    self.report_exception(&e);
                    e
                })
            }
            Some(Callee::Constructor(class)) => Err(self.throw_error(
                "TypeError",
                format!(
                    "Class constructor {} cannot be invoked without 'new'",
                    self.class_name(class)
                ),
            )),
            None => Err(self.throw_error("TypeError", "object is not a function")),
        }
    }

    fn call_closure(&self, closure: &Closure, this: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        if self.frames.borrow().len() >= self.options.max_call_depth {
            return Err(self.throw_error("RangeError", "Maximum call stack size exceeded"));
        }

        let scope = Scope::child(&closure.scope);
        for (index, param) in closure.def.params.iter().enumerate() {
            scope.define(param, args.get(index).cloned().unwrap_or_default());
        }

        let name = closure.def.name.as_deref().unwrap_or("anonymous");
        self.frames.borrow_mut().push(Frame::new(name, closure.source_id));
        let result = self.exec_block(&closure.def.body, &scope, this);
        self.frames.borrow_mut().pop();

        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal(_) => Ok(ScriptValue::Undefined),
        }
    }

    /// `new function(...args)`
    pub(crate) fn construct(&self, function: &ScriptValue, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        let not_constructor = || {
            self.throw_error(
                "TypeError",
                format!("{} is not a constructor", self.display(function)),
            )
        };
        let ScriptValue::Object(handle) = function else {
            return Err(not_constructor());
        };

        match self.callee(*handle) {
            Some(Callee::Constructor(class)) => {
                let callbacks = self
                    .class_callbacks(class)
                    .ok_or_else(|| self.throw_error("TypeError", "Unknown host class"))?;
                match callbacks.call_as_constructor(self, *handle, args) {
                    Ok(Some(object)) => Ok(ScriptValue::Object(object)),
                    Ok(None) => Err(self.throw_error(
                        "TypeError",
                        format!("Failed to construct '{}'", self.class_name(class)),
                    )),
                    Err(e) => {
                        self.report_exception(&e);
                        Err(e)
                    }
                }
            }
            Some(Callee::Native(native)) => match native.construct {
                Some(construct) => construct(self, &ScriptValue::Undefined, args),
                None => Err(not_constructor()),
            },
            Some(Callee::Closure(closure)) => {
                let instance = ScriptValue::Object(self.alloc(ObjectKind::Plain, self.realm.object_prototype));
                match self.call_closure(&closure, &instance, args)? {
                    result @ ScriptValue::Object(_) => Ok(result),
                    _ => Ok(instance),
                }
            }
            Some(Callee::Host(_)) | None => Err(not_constructor()),
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// `String(value)`
    pub(crate) fn display(&self, value: &ScriptValue) -> String {
        match value {
            ScriptValue::Undefined => "undefined".to_string(),
            ScriptValue::Null => "null".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Number(n) => builtins::number_to_string(*n),
            ScriptValue::String(s) => s.clone(),
            ScriptValue::Object(object) => {
                let fallback = "[object Object]".to_string();
                let Ok(ScriptValue::Object(to_string)) = self.get_member(*object, "toString") else {
                    return fallback;
                };
                if !self.is_callable(to_string) {
                    return fallback;
                }
                match self.call(to_string, value, &[]) {
                    Ok(ScriptValue::Object(_)) | Err(_) => fallback,
                    Ok(primitive) => self.display(&primitive),
                }
            }
        }
    }

    /// `Number(value)`
    pub(crate) fn to_number(&self, value: &ScriptValue) -> f64 {
        match value {
            ScriptValue::Undefined => f64::NAN,
            ScriptValue::Null => 0.0,
            ScriptValue::Bool(b) => *b as u8 as f64,
            ScriptValue::Number(n) => *n,
            ScriptValue::String(s) => builtins::string_to_number(s),
            ScriptValue::Object(_) => builtins::string_to_number(&self.display(value)),
        }
    }

    // ========================================================================
    // Debugging
    // ========================================================================

    fn channel(&self) -> Option<Arc<dyn DebuggerChannel>> {
        self.debugger.borrow().clone()
    }

    fn current_position(&self) -> Option<SourcePosition> {
        self.frames
            .borrow()
            .last()
            .map(|frame| SourcePosition::new(frame.source_id, frame.line, frame.column))
    }

    fn register_source(&self, source_url: Option<&str>) -> u64 {
        let source_id = self.next_source_id.get();
        self.next_source_id.set(source_id + 1);
        self.sources
            .borrow_mut()
            .insert(source_id, source_url.map(str::to_string));
        if let Some(channel) = self.channel() {
            channel.source_parsed(source_id, source_url);
        }
        source_id
    }

    pub(crate) fn source_id(&self) -> u64 {
        self.frames.borrow().last().map_or(0, |frame| frame.source_id)
    }

    /// Record the statement about to run and deliver pause events
    pub(crate) fn enter_statement(&self, line: u32, column: u32, explicit_break: bool) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.line = line;
            frame.column = column;
        }
        let (Some(channel), Some(position)) = (self.channel(), self.current_position()) else {
            return;
        };
        let command = if explicit_break || channel.is_breakpoint(&position) {
            channel.breakpoint_hit(position)
        } else if self.stepping.get() {
            channel.step_hit(position)
        } else {
            return;
        };
        self.stepping.set(command != DebugCommand::Continue);
    }

    /// Tell the debugger an exception is being thrown
    pub(crate) fn report_exception(&self, exception: &ScriptValue) {
        let (Some(channel), Some(position)) = (self.channel(), self.current_position()) else {
            return;
        };
        let command = channel.exception_hit(self, position, exception);
        self.stepping.set(command != DebugCommand::Continue);
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for TestEngine {
    fn define_class(
        &self,
        definition: &ClassDefinition,
        callbacks: Arc<dyn ObjectCallbacks>,
    ) -> EngineResult<ClassHandle> {
        if self
            .classes
            .borrow()
            .iter()
            .any(|entry| entry.name == definition.name)
        {
            return Err(EngineError::ClassExists(definition.name.clone()));
        }

        let class = ClassHandle::from_raw(self.classes.borrow().len() as u32);
        let constructor = definition.global_constructor.then(|| {
            let handle = self.alloc(ObjectKind::HostConstructor { class }, self.realm.function_prototype);
            self.define_own(
                handle,
                "name",
                definition.name.as_str().into(),
                PropertyAttributes::READ_ONLY,
            );
            self.globals.define(&definition.name, ScriptValue::Object(handle));
            handle
        });

        self.classes.borrow_mut().push(ClassEntry {
            name: definition.name.clone(),
            callbacks,
            constructor,
        });
        debug!(class = %definition.name, "defined host class");
        Ok(class)
    }

    fn make_proxy(&self, class: ClassHandle, id: ReferenceId) -> EngineResult<ObjectHandle> {
        if self.class_callbacks(class).is_none() {
            return Err(EngineError::UnknownClass(class));
        }
        Ok(self.alloc(
            ObjectKind::Proxy {
                class,
                slot: Some(id),
            },
            self.realm.object_prototype,
        ))
    }

    fn make_callable(&self, class: ClassHandle) -> EngineResult<ObjectHandle> {
        if self.class_callbacks(class).is_none() {
            return Err(EngineError::UnknownClass(class));
        }
        Ok(self.alloc(ObjectKind::HostFunction { class }, self.realm.function_prototype))
    }

    fn private_slot(&self, object: ObjectHandle) -> Option<ReferenceId> {
        match self.heap.borrow().get(object)?.kind {
            ObjectKind::Proxy { slot, .. } => slot,
            _ => None,
        }
    }

    fn make_array(&self, items: &[ScriptValue]) -> EngineResult<ObjectHandle> {
        Ok(self.alloc(ObjectKind::Array(items.to_vec()), self.realm.array_prototype))
    }

    fn make_date(&self, fields: DateFields) -> EngineResult<ObjectHandle> {
        Ok(self.alloc(
            ObjectKind::Date(builtins::date_from_fields(fields)),
            self.realm.date_prototype,
        ))
    }

    fn make_error(&self, message: &str) -> EngineResult<ObjectHandle> {
        if self.options.refuse_errors {
            return Err(EngineError::Unsupported("make_error".to_string()));
        }
        Ok(self.new_error("Error", message))
    }

    fn get_property(&self, object: ObjectHandle, name: &str) -> ScriptResult<ScriptValue> {
        self.get_member(object, name)
    }

    fn get_index(&self, object: ObjectHandle, index: u32) -> ScriptResult<ScriptValue> {
        self.get_member(object, &index.to_string())
    }

    fn set_property(
        &self,
        object: ObjectHandle,
        name: &str,
        value: ScriptValue,
        attributes: PropertyAttributes,
    ) -> ScriptResult<()> {
        self.put_member(object, name, value, Some(attributes))
    }

    fn has_property(&self, object: ObjectHandle, name: &str) -> bool {
        self.has_member(object, name)
    }

    fn prototype(&self, object: ObjectHandle) -> Option<ObjectHandle> {
        self.heap.borrow().get(object)?.prototype
    }

    fn set_global(&self, name: &str, value: ScriptValue) -> EngineResult<()> {
        self.globals.define(name, value);
        Ok(())
    }

    fn is_function(&self, object: ObjectHandle) -> bool {
        self.is_callable(object)
    }

    fn call_function(
        &self,
        function: ObjectHandle,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        self.call(function, this, args)
    }

    fn compile_function(&self, name: &str, params: &[String], body: &str) -> ScriptResult<ObjectHandle> {
        let program = parse_program(body).map_err(|e| self.syntax_error(&e))?;
        let source_id = self.register_source(None);
        let def = Rc::new(FunctionDef {
            name: Some(name.to_string()),
            params: params.to_vec(),
            body: program,
        });
        Ok(self.make_closure(def, Rc::clone(&self.globals), source_id))
    }

    fn check_syntax(&self, source: &str) -> ScriptResult<()> {
        parse_program(source)
            .map(|_| ())
            .map_err(|e| self.syntax_error(&e))
    }

    fn evaluate(&self, source: &str, source_url: Option<&str>) -> ScriptResult<ScriptValue> {
        let program = parse_program(source).map_err(|e| self.syntax_error(&e))?;
        let source_id = self.register_source(source_url);

        self.frames
            .borrow_mut()
            .push(Frame::new("global code", source_id));
        let globals = Rc::clone(&self.globals);
        let result = self.exec_block(&program, &globals, &ScriptValue::Undefined);
        self.frames.borrow_mut().pop();

        match result? {
            Completion::Normal(value) => Ok(value.unwrap_or_default()),
            Completion::Return(value) => Ok(value),
        }
    }

    fn to_display_string(&self, value: &ScriptValue) -> String {
        self.display(value)
    }

    fn collect_garbage(&self) {
        if !self.frames.borrow().is_empty() {
            debug!("collection requested during evaluation, skipped");
            return;
        }

        let mut roots = vec![
            self.realm.object_prototype,
            self.realm.function_prototype,
            self.realm.array_prototype,
            self.realm.date_prototype,
            self.realm.error_prototype,
        ];
        roots.extend(self.classes.borrow().iter().filter_map(|entry| entry.constructor));

        let swept = self
            .heap
            .borrow_mut()
            .collect(&roots, &[Rc::clone(&self.globals)]);
        let stats = self.gc_stats();
        trace!(
            freed = stats.last_freed,
            live = self.live_objects(),
            finalizers = swept.len(),
            "collection finished"
        );

        let jobs: Vec<(Arc<dyn ObjectCallbacks>, ReferenceId)> = swept
            .into_iter()
            .filter_map(|(class, id)| self.class_callbacks(class).map(|callbacks| (callbacks, id)))
            .collect();
        if jobs.is_empty() {
            return;
        }

        let run = move || {
            for (callbacks, id) in jobs {
                callbacks.finalize(id);
            }
        };
        if self.options.finalize_on_thread {
            std::thread::scope(|scope| {
                scope.spawn(run);
            });
        } else {
            run();
        }
    }

    fn stack_trace(&self) -> String {
        let sources = self.sources.borrow();
        self.frames
            .borrow()
            .iter()
            .rev()
            .map(|frame| {
                let url = sources
                    .get(&frame.source_id)
                    .and_then(|url| url.as_deref())
                    .unwrap_or("<anonymous>");
                format!("{}@{}:{}", frame.function, url, frame.line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn attach_debugger(&self, channel: Arc<dyn DebuggerChannel>) {
        *self.debugger.borrow_mut() = Some(channel);
    }
}
