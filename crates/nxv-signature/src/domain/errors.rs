//! # Signature Errors
//!
//! Error types for signer recovery.

use thiserror::Error;

/// Errors that can occur while recovering a signer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature bytes are not a valid encoding (wrong length, scalar out of range).
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Signature has high S value (EIP-2 malleability protection).
    #[error("Malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery byte for the signing mode.
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Failed to recover public key from signature.
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match expected signer.
    #[error("Signer mismatch: expected {expected:?}, got {actual:?}")]
    SignerMismatch {
        /// Address the caller expected.
        expected: [u8; 20],
        /// Address actually recovered.
        actual: [u8; 20],
    },
}
