//! Host-side object model
//!
//! Values, shared instances, failures and class descriptors as seen by the
//! Rust code embedding the engine.

pub mod args;
pub mod class;
pub mod exception;
pub mod object;
pub mod value;

pub use args::{Args, CallSite, FromHostValue, CONSTRUCTOR_NAME};
pub use class::{ClassBuilder, ClassDescriptor, MethodDescriptor, PropertyDescriptor};
pub use exception::{HostException, HostFailure, HostResult};
pub use object::HostObject;
pub use value::{Calendar, HostValue};
