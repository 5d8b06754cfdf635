//! # Ports
//!
//! - `inbound`: the async API the service exposes
//! - `outbound`: what wallet code needs from its environment

pub mod inbound;
pub mod outbound;
