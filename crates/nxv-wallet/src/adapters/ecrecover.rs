//! # Ecrecover Adapter
//!
//! Signer recovery backed by `nxv-signature`. Unlike a bare `ecrecover`,
//! out-of-range scalars and high-S signatures are refused before recovery.

use crate::domain::value_objects::{Address, Hash};
use crate::ports::outbound::SignatureVerifier;
use nxv_signature::{EcdsaSignature, EcdsaVerifier, SignatureError};

/// `SignatureVerifier` over secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcrecoverVerifier;

impl SignatureVerifier for EcrecoverVerifier {
    fn ecrecover(&self, hash: &Hash, signature: &EcdsaSignature) -> Result<Address, SignatureError> {
        EcdsaVerifier::new()
            .verify_ecdsa(hash.as_bytes(), signature)
            .into_result()
            .map(Address::from)
    }
}
