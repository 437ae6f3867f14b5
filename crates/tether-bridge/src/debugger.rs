//! Debugger adapter
//!
//! [`DebuggerAdapter`] is the engine-facing [`DebuggerChannel`]. It keeps
//! track of parsed sources and breakpoints, and forwards pauses to a host
//! [`DebugListener`]. Thrown script values are translated through the
//! exception bridge first, so listeners see the host failure a script error
//! stands for.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tether_sdk::{Breakpoint, DebugCommand, DebuggerChannel, ScriptEngine, ScriptValue, SourcePosition};
use tracing::{debug, trace};

use crate::error::BridgeError;
use crate::exception::ExceptionBridge;
use crate::host::HostException;

/// Host-side receiver of debugging events. Every method defaults to
/// ignoring the event and continuing.
pub trait DebugListener: Send + Sync {
    /// A source was parsed
    fn source_parsed(&self, _source_id: u64, _source_url: Option<&str>) {}

    /// Execution paused on a breakpoint or `debugger` statement
    fn breakpoint_hit(&self, _position: SourcePosition) -> DebugCommand {
        DebugCommand::Continue
    }

    /// Execution paused after a step command
    fn step_hit(&self, _position: SourcePosition) -> DebugCommand {
        DebugCommand::Continue
    }

    /// An exception is being thrown. Host callback failures are reported
    /// without a position.
    fn exception_hit(&self, _position: Option<SourcePosition>, _error: &BridgeError) -> DebugCommand {
        DebugCommand::Continue
    }
}

/// Engine debugger channel forwarding to a [`DebugListener`]
pub struct DebuggerAdapter {
    exceptions: Arc<ExceptionBridge>,
    listener: Arc<dyn DebugListener>,
    sources: Mutex<FxHashMap<u64, Option<String>>>,
    breakpoints: Mutex<FxHashSet<Breakpoint>>,
    /// Line breakpoints on sources not parsed yet
    deferred: Mutex<FxHashSet<(String, u32)>>,
    /// Last host failure reported, so its script rethrow is not reported twice
    last_host_failure: Mutex<Option<HostException>>,
}

impl DebuggerAdapter {
    pub(crate) fn new(exceptions: Arc<ExceptionBridge>, listener: Arc<dyn DebugListener>) -> Self {
        Self {
            exceptions,
            listener,
            sources: Mutex::new(FxHashMap::default()),
            breakpoints: Mutex::new(FxHashSet::default()),
            deferred: Mutex::new(FxHashSet::default()),
            last_host_failure: Mutex::new(None),
        }
    }

    /// Add a breakpoint. Returns false if it was already set.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> bool {
        self.breakpoints.lock().insert(breakpoint)
    }

    /// Remove a breakpoint. Returns false if it was not set.
    pub fn remove_breakpoint(&self, breakpoint: &Breakpoint) -> bool {
        self.breakpoints.lock().remove(breakpoint)
    }

    /// Break at `line` of every source parsed from `url`, including sources
    /// parsed later
    pub fn break_at(&self, url: &str, line: u32) {
        let parsed: Vec<u64> = self
            .sources
            .lock()
            .iter()
            .filter(|(_, source_url)| source_url.as_deref() == Some(url))
            .map(|(&source_id, _)| source_id)
            .collect();

        let mut breakpoints = self.breakpoints.lock();
        for source_id in parsed {
            breakpoints.insert(Breakpoint::new(source_id, line));
        }
        self.deferred.lock().insert((url.to_string(), line));
    }

    /// Breakpoints currently set, ordered by source and line
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        let mut breakpoints: Vec<Breakpoint> = self.breakpoints.lock().iter().copied().collect();
        breakpoints.sort_by_key(|b| (b.source_id, b.line));
        breakpoints
    }

    /// URL a parsed source was loaded from
    pub fn source_url(&self, source_id: u64) -> Option<String> {
        self.sources.lock().get(&source_id).cloned().flatten()
    }

    /// Number of sources parsed since the adapter was attached
    pub fn source_count(&self) -> usize {
        self.sources.lock().len()
    }

    /// Forward a failure raised by a host callback
    pub(crate) fn report_host_failure(&self, exception: &HostException) {
        trace!(error = %exception, "host failure reported to debugger");
        *self.last_host_failure.lock() = Some(exception.clone());
        self.listener
            .exception_hit(None, &BridgeError::Host(exception.clone()));
    }

    fn already_reported(&self, error: &BridgeError) -> bool {
        let last = self.last_host_failure.lock().take();
        match (last, error.host_exception()) {
            (Some(last), Some(exception)) => last.ptr_eq(exception),
            _ => false,
        }
    }
}

impl DebuggerChannel for DebuggerAdapter {
    fn source_parsed(&self, source_id: u64, source_url: Option<&str>) {
        debug!(source_id, url = source_url.unwrap_or("<anonymous>"), "source parsed");
        self.sources
            .lock()
            .insert(source_id, source_url.map(str::to_string));

        if let Some(url) = source_url {
            let lines: Vec<u32> = self
                .deferred
                .lock()
                .iter()
                .filter(|(deferred_url, _)| deferred_url == url)
                .map(|&(_, line)| line)
                .collect();
            let mut breakpoints = self.breakpoints.lock();
            for line in lines {
                breakpoints.insert(Breakpoint::new(source_id, line));
            }
        }
        self.listener.source_parsed(source_id, source_url);
    }

    fn is_breakpoint(&self, position: &SourcePosition) -> bool {
        self.breakpoints
            .lock()
            .contains(&Breakpoint::new(position.source_id, position.line))
    }

    fn breakpoint_hit(&self, position: SourcePosition) -> DebugCommand {
        self.listener.breakpoint_hit(position)
    }

    fn exception_hit(
        &self,
        engine: &dyn ScriptEngine,
        position: SourcePosition,
        exception: &ScriptValue,
    ) -> DebugCommand {
        let error = self.exceptions.script_to_host(engine, exception);
        if self.already_reported(&error) {
            return DebugCommand::Continue;
        }
        self.listener.exception_hit(Some(position), &error)
    }

    fn step_hit(&self, position: SourcePosition) -> DebugCommand {
        self.listener.step_hit(position)
    }
}
