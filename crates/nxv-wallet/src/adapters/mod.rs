//! # Adapters Layer (Outer Hexagon)
//!
//! Implementations of the outbound ports.
//!
//! - `InMemoryHost`: journaled world state and call dispatch
//! - `EcrecoverVerifier`: secp256k1 recovery through `nxv-signature`

pub mod ecrecover;
pub mod in_memory_host;

pub use ecrecover::*;
pub use in_memory_host::*;
