//! Domain layer: signature entities, errors and secp256k1 recovery.

pub mod ecdsa;
pub mod entities;
pub mod errors;
