//! State shared between the bridge and the engine callbacks

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tether_sdk::{ClassHandle, ScriptEngine, ScriptValue};
use tracing::{debug, error, trace};

use crate::debugger::DebuggerAdapter;
use crate::exception::ExceptionBridge;
use crate::host::{HostException, HostObject};
use crate::marshal::ValueBridge;
use crate::options::BridgeOptions;
use crate::reference::ReferenceTable;
use crate::registry::ClassRegistry;
use crate::release::ReleaseQueue;

/// Everything one bridge context owns.
///
/// Engine callbacks hold an `Arc` to it, so it must stay free of engine
/// references.
pub(crate) struct BridgeState {
    pub(crate) options: BridgeOptions,
    pub(crate) references: ReferenceTable,
    pub(crate) registry: Arc<ClassRegistry>,
    pub(crate) exceptions: Arc<ExceptionBridge>,
    pub(crate) releases: ReleaseQueue,
    /// Engine class of function proxies, defined on first method lookup
    pub(crate) function_class: OnceCell<ClassHandle>,
    pub(crate) debugger: RwLock<Option<Arc<DebuggerAdapter>>>,
}

impl BridgeState {
    pub(crate) fn new(options: BridgeOptions) -> Self {
        let registry = Arc::new(ClassRegistry::new());
        let classes = Arc::clone(&registry);
        let references = ReferenceTable::with_dispose(Arc::new(move |object: &HostObject| {
            if let Some(class) = classes.by_type(object.type_id()) {
                trace!(class = class.descriptor.name(), "disposing host object");
                class.descriptor.dispose(object);
            }
        }));

        Self {
            exceptions: Arc::new(ExceptionBridge::new(options.exception_property.clone())),
            options,
            references,
            registry,
            releases: ReleaseQueue::new(),
            function_class: OnceCell::new(),
            debugger: RwLock::new(None),
        }
    }

    /// Value converter over `engine`
    pub(crate) fn values<'a>(&'a self, engine: &'a dyn ScriptEngine) -> ValueBridge<'a> {
        ValueBridge::new(engine, &self.references, &self.registry, self.options.max_depth)
    }

    /// Report a host failure and turn it into a script value to throw
    pub(crate) fn raise(&self, engine: &dyn ScriptEngine, exception: HostException) -> ScriptValue {
        debug!(error = %exception, "host failure raised into script");
        let adapter = self.debugger.read().clone();
        if let Some(adapter) = adapter {
            adapter.report_host_failure(&exception);
        }
        self.exceptions.host_to_script(engine, exception)
    }

    /// Release the entries of every finalized proxy
    pub(crate) fn drain_releases(&self) -> usize {
        let ids = self.releases.drain();
        for &id in &ids {
            if let Err(err) = self.references.dealloc(id) {
                error!(error = %err, "finalized proxy had no live reference");
            }
        }
        if !ids.is_empty() {
            trace!(released = ids.len(), live = self.references.len(), "release queue drained");
        }
        ids.len()
    }
}
