//! # Domain Entities
//!
//! Core data structures for signer recovery.

use super::errors::SignatureError;
use serde::{Deserialize, Serialize};

/// Ethereum-style address derived from public key (last 20 bytes of keccak256(pubkey)).
pub type Address = [u8; 20];

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Offset added to `v` for signatures over the EIP-191 prefixed digest.
pub const ETH_SIGN_V_OFFSET: u8 = 4;

// =============================================================================
// ECDSA Types (secp256k1)
// =============================================================================

/// ECDSA signature on the secp256k1 curve, in `{r, s, v}` wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes)
    pub s: [u8; 32],
    /// Recovery byte (0, 1, 27, 28, or 31, 32 for EIP-191 mode)
    pub v: u8,
}

impl EcdsaSignature {
    /// Encoded length of `r ++ s ++ v`.
    pub const LENGTH: usize = 65;

    /// Parses a 65-byte `r ++ s ++ v` record.
    ///
    /// # Errors
    /// Returns `SignatureError::InvalidFormat` if the slice is not 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != Self::LENGTH {
            return Err(SignatureError::InvalidFormat);
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    /// Serializes to the 65-byte `r ++ s ++ v` record.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Which digest this signature commits to, judged by `v`.
    #[must_use]
    pub fn mode(&self) -> SigningMode {
        if self.v > 30 {
            SigningMode::EthSign
        } else {
            SigningMode::TypedData
        }
    }

    /// Re-tags a typed-data signature as an EIP-191 one (`v + 4`).
    #[must_use]
    pub fn into_eth_sign(mut self) -> Self {
        if self.v < 27 {
            self.v += 27;
        }
        self.v += ETH_SIGN_V_OFFSET;
        self
    }
}

/// Digest a signature was produced over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningMode {
    /// Signed the 32-byte hash directly.
    TypedData,
    /// Signed the EIP-191 personal-message digest of the hash.
    EthSign,
}

// =============================================================================
// Verification Result
// =============================================================================

/// Result of signature verification.
#[derive(Clone, Debug)]
pub struct VerificationResult {
    /// Whether the signature is valid
    pub valid: bool,
    /// The recovered address (if verification succeeded)
    pub recovered_address: Option<Address>,
    /// Error details (if verification failed)
    pub error: Option<SignatureError>,
}

impl VerificationResult {
    /// Create a successful verification result.
    #[must_use]
    pub fn valid(recovered_address: Address) -> Self {
        Self {
            valid: true,
            recovered_address: Some(recovered_address),
            error: None,
        }
    }

    /// Create a failed verification result.
    #[must_use]
    pub fn invalid(error: SignatureError) -> Self {
        Self {
            valid: false,
            recovered_address: None,
            error: Some(error),
        }
    }

    /// Converts into a `Result` carrying the recovered address.
    ///
    /// # Errors
    /// Returns the recorded error for invalid results.
    pub fn into_result(self) -> Result<Address, SignatureError> {
        match (self.recovered_address, self.error) {
            (Some(address), None) => Ok(address),
            (_, Some(error)) => Err(error),
            (None, None) => Err(SignatureError::RecoveryFailed),
        }
    }
}
