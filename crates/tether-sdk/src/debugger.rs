//! Debugger channel - engine to host notifications
//!
//! Engines that support debugging report parse and pause events through a
//! [`DebuggerChannel`]. The returned [`DebugCommand`] tells the engine how to
//! resume.

use crate::context::ScriptEngine;
use crate::value::ScriptValue;

/// Position inside a parsed source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Engine-assigned id of the parsed source
    pub source_id: u64,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl SourcePosition {
    /// Create a new position
    pub fn new(source_id: u64, line: u32, column: u32) -> Self {
        Self {
            source_id,
            line,
            column,
        }
    }
}

/// Line breakpoint inside a parsed source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// Engine-assigned id of the parsed source
    pub source_id: u64,
    /// 1-based line
    pub line: u32,
}

impl Breakpoint {
    /// Create a new breakpoint
    pub fn new(source_id: u64, line: u32) -> Self {
        Self { source_id, line }
    }

    /// Whether execution at `position` should stop here
    pub fn matches(&self, position: &SourcePosition) -> bool {
        self.source_id == position.source_id && self.line == position.line
    }
}

/// How the engine resumes after a pause notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugCommand {
    /// Run until the next breakpoint
    #[default]
    Continue,
    /// Pause at the next statement, entering calls
    StepIn,
    /// Pause at the next statement in the current frame
    StepOver,
    /// Pause once the current frame returns
    StepOut,
}

/// Receiver of engine debugging events.
///
/// Events are delivered on the evaluating thread.
pub trait DebuggerChannel: Send + Sync {
    /// A source was parsed and assigned `source_id`
    fn source_parsed(&self, source_id: u64, source_url: Option<&str>);

    /// Whether execution should pause before the statement at `position`
    fn is_breakpoint(&self, position: &SourcePosition) -> bool;

    /// Execution paused on a breakpoint or `debugger` statement
    fn breakpoint_hit(&self, position: SourcePosition) -> DebugCommand;

    /// A script exception is being thrown at `position`
    fn exception_hit(
        &self,
        engine: &dyn ScriptEngine,
        position: SourcePosition,
        exception: &ScriptValue,
    ) -> DebugCommand;

    /// Execution paused after a step command
    fn step_hit(&self, position: SourcePosition) -> DebugCommand;
}
