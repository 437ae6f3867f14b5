//! Tether testkit - a scripted engine double
//!
//! `TestEngine` implements `tether_sdk::ScriptEngine` for a small
//! JavaScript-like dialect so the bridge can be driven end to end without an
//! external engine. It supports `var`/`let`/`const`, functions and closures,
//! `new`, member and index access, `try`/`catch`/`finally`, `throw`,
//! `debugger`, array and object literals, and the `Date`, `Error` and
//! `String` globals.
//!
//! Memory is managed by a stop-the-world mark-sweep collector triggered by
//! `collect_garbage`. Finalizers of swept proxies run on a separate thread.

pub mod ast;
pub mod builtins;
pub mod engine;
pub mod error;
pub mod heap;
mod interpreter;
pub mod lexer;
pub mod parser;

pub use engine::{EngineOptions, TestEngine};
pub use error::SyntaxError;
pub use heap::GcStats;
pub use parser::parse_program;
