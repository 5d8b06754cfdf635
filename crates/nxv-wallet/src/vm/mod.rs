//! # Call Runtime
//!
//! Frames, messages and the context wallet code executes in.

mod context;
mod message;

pub use context::CallContext;
pub use message::{CallKind, Frame, Message};
