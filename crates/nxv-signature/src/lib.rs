//! # NXV Signature Recovery
//!
//! secp256k1 signer recovery used by the wallet's authorization engine.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure cryptographic logic, no I/O
//! - **Testing** (`testing`): deterministic local signers, behind the
//!   `test-helpers` feature
//!
//! ## Signing modes
//!
//! | `v` | Digest recovered against |
//! |-----|--------------------------|
//! | 27, 28 | the 32-byte hash itself (EIP-712 typed data) |
//! | 31, 32 | `keccak256("\x19Ethereum Signed Message:\n32" ++ hash)` (EIP-191) |
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: signatures with high S values are rejected
//! - **Scalar Range Validation**: R and S must be in `[1, n-1]`
//! - **R Point Validation**: R must be an x-coordinate on the curve

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod domain;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use domain::ecdsa::{
    address_from_pubkey, eth_signed_message_hash, keccak256, recover_address, verify_ecdsa,
    verify_ecdsa_signer, EcdsaVerifier,
};
pub use domain::entities::{Address, EcdsaSignature, Hash, SigningMode, VerificationResult};
pub use domain::errors::SignatureError;
