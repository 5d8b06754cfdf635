//! # ECDSA Recovery (secp256k1)
//!
//! Pure domain logic for recovering the Ethereum address behind a signature.
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: S must be STRICTLY LESS THAN `SECP256K1_HALF_ORDER`
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - **R Point Validation**: R must be a valid x-coordinate on the secp256k1 curve
//! - **Constant-Time Operations**: Uses `subtle` for scalar comparisons

use super::entities::{Address, EcdsaSignature, Hash, SigningMode, VerificationResult, ETH_SIGN_V_OFFSET};
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::{AffinePoint, EncodedPoint};
use sha3::{Digest, Keccak256};
use subtle::{Choice, ConstantTimeEq};
use tracing::trace;

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Half of the secp256k1 curve order (for malleability check).
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Prefix of an EIP-191 personal message over a 32-byte digest.
const ETH_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

// =============================================================================
// ECDSA VERIFIER
// =============================================================================

/// Stateless ECDSA verifier, handy where a value is needed instead of free functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl EcdsaVerifier {
    /// Create a new ECDSA verifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a signature and recover the signer address.
    #[must_use]
    pub fn verify_ecdsa(&self, message_hash: &Hash, signature: &EcdsaSignature) -> VerificationResult {
        verify_ecdsa(message_hash, signature)
    }

    /// Validate a signature and check that the recovered signer matches `expected`.
    #[must_use]
    pub fn verify_ecdsa_signer(
        &self,
        message_hash: &Hash,
        signature: &EcdsaSignature,
        expected: Address,
    ) -> VerificationResult {
        verify_ecdsa_signer(message_hash, signature, expected)
    }

    /// Recover the signer's address without the range and malleability checks.
    ///
    /// # Errors
    /// See [`recover_address`].
    pub fn recover_address(
        &self,
        message_hash: &Hash,
        signature: &EcdsaSignature,
    ) -> Result<Address, SignatureError> {
        recover_address(message_hash, signature)
    }
}

// =============================================================================
// CORE VERIFICATION FUNCTIONS
// =============================================================================

/// Validate an ECDSA signature and recover the signer address.
///
/// Checks performed, in order:
/// 1. R is in range [1, n-1]
/// 2. R is a valid x-coordinate on the curve
/// 3. S is in range [1, n-1]
/// 4. S is in the lower half of the order (EIP-2)
/// 5. `v` is valid for its signing mode and public key recovery succeeds
#[must_use]
pub fn verify_ecdsa(message_hash: &Hash, signature: &EcdsaSignature) -> VerificationResult {
    if !is_valid_scalar(&signature.r) || !is_valid_r_coordinate(&signature.r) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !is_valid_scalar(&signature.s) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !is_low_s(&signature.s) {
        return VerificationResult::invalid(SignatureError::MalleableSignature);
    }

    match recover_address(message_hash, signature) {
        Ok(address) => VerificationResult::valid(address),
        Err(e) => VerificationResult::invalid(e),
    }
}

/// Validate an ECDSA signature and check that the recovered signer matches `expected`.
#[must_use]
pub fn verify_ecdsa_signer(
    message_hash: &Hash,
    signature: &EcdsaSignature,
    expected: Address,
) -> VerificationResult {
    let result = verify_ecdsa(message_hash, signature);

    match result.recovered_address {
        Some(recovered) if recovered != expected => {
            VerificationResult::invalid(SignatureError::SignerMismatch {
                expected,
                actual: recovered,
            })
        }
        _ => result,
    }
}

/// Recover the signer's Ethereum address from a signature.
///
/// For `v > 30` the signature is taken to be over the EIP-191 digest of
/// `message_hash` and `v - 4` is used as the recovery byte.
///
/// # Errors
/// - `InvalidRecoveryId` if `v` is not 0, 1, 27, 28, 31 or 32
/// - `InvalidFormat` if `r ++ s` is not a valid signature encoding
/// - `RecoveryFailed` if no public key matches
pub fn recover_address(
    message_hash: &Hash,
    signature: &EcdsaSignature,
) -> Result<Address, SignatureError> {
    use zeroize::Zeroize;

    let (digest, v) = match signature.mode() {
        SigningMode::TypedData => (*message_hash, signature.v),
        SigningMode::EthSign => (
            eth_signed_message_hash(message_hash),
            signature.v - ETH_SIGN_V_OFFSET,
        ),
    };
    let recovery_id = parse_recovery_id(v).map_err(|_| SignatureError::InvalidRecoveryId(signature.v))?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| SignatureError::InvalidFormat)?;

    let recovered_key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    let address = address_from_pubkey(&recovered_key);
    trace!(signer = ?address, v = signature.v, "recovered signer");
    Ok(address)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Keccak256 hash function.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// EIP-191 personal-message digest of a 32-byte hash.
#[must_use]
pub fn eth_signed_message_hash(hash: &Hash) -> Hash {
    let mut preimage = Vec::with_capacity(ETH_MESSAGE_PREFIX.len() + 32);
    preimage.extend_from_slice(ETH_MESSAGE_PREFIX);
    preimage.extend_from_slice(hash);
    keccak256(&preimage)
}

/// Derive Ethereum address from public key.
#[must_use]
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let pubkey_slice = pubkey_bytes.as_bytes();

    // Skip the 0x04 SEC1 tag
    let hash = keccak256(&pubkey_slice[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Constant-time `a < b` over big-endian 32-byte integers.
fn ct_less_than(a: &[u8; 32], b: &[u8; 32]) -> Choice {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for (&a_byte, &b_byte) in a.iter().zip(b.iter()) {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from(u8::from(a_byte < b_byte));
        greater |= not_decided & Choice::from(u8::from(a_byte > b_byte));
    }

    less
}

/// Check if S value is in lower half of curve order (EIP-2, strict).
pub(crate) fn is_low_s(s: &[u8; 32]) -> bool {
    ct_less_than(s, &SECP256K1_HALF_ORDER).into()
}

/// Check if a scalar value is in valid range [1, n-1].
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }

    (!is_zero & ct_less_than(scalar, &SECP256K1_ORDER)).into()
}

/// Validate that R is a valid x-coordinate on the secp256k1 curve.
fn is_valid_r_coordinate(r: &[u8; 32]) -> bool {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(r);

    let Ok(encoded) = EncodedPoint::from_bytes(compressed) else {
        return false;
    };

    AffinePoint::from_encoded_point(&encoded).is_some().into()
}

/// Parse recovery ID from v value (0, 1, 27, 28).
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };

    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// Invert S value: s' = n - s.
pub(crate) fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = i32::from(SECP256K1_ORDER[i]) - i32::from(s[i]) - borrow;
        if diff < 0 {
            result[i] = u8::try_from(diff + 256).unwrap_or_default();
            borrow = 1;
        } else {
            result[i] = u8::try_from(diff).unwrap_or_default();
            borrow = 0;
        }
    }

    result
}

// =============================================================================
// UNIT TESTS
// =============================================================================
