//! # Domain Layer
//!
//! Pure wallet logic: value objects, encodings, hashing, the owner registry
//! and signature authorization. Nothing here knows about the host beyond the
//! `SlotStore` and `SignatureVerifier` ports.

pub mod abi;
pub mod authorization;
pub mod batch;
pub mod entities;
pub mod invariants;
pub mod layout;
pub mod owners;
pub mod services;
pub mod signatures;
pub mod typed_data;
pub mod value_objects;
