//! # Signature Codec
//!
//! Packs owner signatures into one blob and reads them back.
//!
//! ```text
//! static part:  n × {r: 32}{s: 32}{v: 1}      sorted ascending by signer
//! dynamic part: {len: 32}{proof bytes} ...    one entry per contract signature
//! ```
//!
//! | `v` | Meaning |
//! |-----|---------|
//! | 0 | contract signature: `r` = signer, `s` = offset of its dynamic entry |
//! | 27, 28 | ECDSA over the operation hash |
//! | 31, 32 | ECDSA over the EIP-191 digest of the operation hash |

use crate::domain::value_objects::{u256_to_word, Address, Bytes, U256};
use crate::errors::{AuthorizationError, ValidationError, WalletError};
use nxv_signature::EcdsaSignature;

/// Size of one static record.
pub const SIGNATURE_RECORD_LEN: usize = EcdsaSignature::LENGTH;

/// `v` byte marking a contract (delegated) signature.
pub const CONTRACT_SIGNATURE_V: u8 = 0;

/// Proof part of a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureProof {
    /// Recoverable key-pair signature.
    Ecdsa(EcdsaSignature),
    /// Opaque proof handed to the signer's `isValidSignature`.
    Contract(Bytes),
}

/// One owner's contribution to a signature blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureRecord {
    /// Owner the signature claims to come from. Used for sorting.
    pub signer: Address,
    /// The proof.
    pub proof: SignatureProof,
}

impl SignatureRecord {
    /// Key-pair signature by `signer`.
    #[must_use]
    pub fn ecdsa(signer: Address, signature: EcdsaSignature) -> Self {
        Self {
            signer,
            proof: SignatureProof::Ecdsa(signature),
        }
    }

    /// Delegated signature validated by calling `signer`.
    #[must_use]
    pub fn contract(signer: Address, proof: impl Into<Bytes>) -> Self {
        Self {
            signer,
            proof: SignatureProof::Contract(proof.into()),
        }
    }

    /// True for contract signatures.
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        matches!(self.proof, SignatureProof::Contract(_))
    }
}

/// Encodes records into one blob, sorted ascending by signer.
#[must_use]
pub fn encode_signatures(records: &[SignatureRecord]) -> Bytes {
    let mut sorted: Vec<&SignatureRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.signer);

    let static_len = sorted.len() * SIGNATURE_RECORD_LEN;
    let mut static_part = Vec::with_capacity(static_len);
    let mut dynamic_part = Vec::new();

    for record in sorted {
        match &record.proof {
            SignatureProof::Ecdsa(signature) => static_part.extend_from_slice(&signature.to_bytes()),
            SignatureProof::Contract(proof) => {
                let offset = static_len + dynamic_part.len();
                static_part.extend_from_slice(&record.signer.to_word());
                static_part.extend_from_slice(&u256_to_word(U256::from(offset)));
                static_part.push(CONTRACT_SIGNATURE_V);

                dynamic_part.extend_from_slice(&u256_to_word(U256::from(proof.len())));
                dynamic_part.extend_from_slice(proof.as_slice());
            }
        }
    }

    static_part.extend_from_slice(&dynamic_part);
    Bytes(static_part)
}

/// A record read back from a blob, before any verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedSignature {
    /// Key-pair signature; the signer is whatever recovery yields.
    Ecdsa {
        /// Position in the blob.
        index: usize,
        /// Raw signature.
        signature: EcdsaSignature,
    },
    /// Contract signature naming its signer explicitly.
    Contract {
        /// Position in the blob.
        index: usize,
        /// Claimed signer.
        signer: Address,
        /// Proof forwarded to the signer.
        proof: Vec<u8>,
    },
}

/// Reads the first `required` records of `blob`.
///
/// Records beyond `required` and unreferenced trailer bytes are ignored.
///
/// # Errors
/// - `SignaturesTooShort` if fewer than `required` static records are present
/// - `MalformedSignatures` for a dirty signer word, a dynamic offset pointing
///   into the static part or past the end, or an unsupported `v`
pub fn decode_signatures(blob: &[u8], required: usize) -> Result<Vec<DecodedSignature>, WalletError> {
    let static_len = required
        .checked_mul(SIGNATURE_RECORD_LEN)
        .ok_or(ValidationError::MalformedSignatures("threshold overflow"))?;
    if blob.len() < static_len {
        return Err(AuthorizationError::SignaturesTooShort {
            required,
            provided: blob.len() / SIGNATURE_RECORD_LEN,
        }
        .into());
    }

    (0..required)
        .map(|index| {
            let start = index * SIGNATURE_RECORD_LEN;
            let signature = EcdsaSignature::from_slice(&blob[start..start + SIGNATURE_RECORD_LEN])
                .map_err(|_| ValidationError::MalformedSignatures("truncated record"))?;

            match signature.v {
                CONTRACT_SIGNATURE_V => decode_contract_signature(blob, index, &signature, static_len),
                1..=26 => Err(ValidationError::MalformedSignatures("unsupported signature type").into()),
                _ => Ok(DecodedSignature::Ecdsa { index, signature }),
            }
        })
        .collect()
}

fn decode_contract_signature(
    blob: &[u8],
    index: usize,
    signature: &EcdsaSignature,
    static_len: usize,
) -> Result<DecodedSignature, WalletError> {
    let signer = Address::from_word(&signature.r)
        .ok_or(ValidationError::MalformedSignatures("contract signer is not an address"))?;

    let offset = U256::from_big_endian(&signature.s);
    if offset < U256::from(static_len) {
        return Err(ValidationError::MalformedSignatures("dynamic offset inside static part").into());
    }
    if offset > U256::from(blob.len()) {
        return Err(ValidationError::MalformedSignatures("dynamic offset out of bounds").into());
    }
    let offset = offset.as_usize();

    let len_word = blob
        .get(offset..offset + 32)
        .ok_or(ValidationError::MalformedSignatures("dynamic length out of bounds"))?;
    let len = U256::from_big_endian(len_word);
    let data_start = offset + 32;
    if len > U256::from(blob.len() - data_start) {
        return Err(ValidationError::MalformedSignatures("dynamic data out of bounds").into());
    }
    let proof = blob[data_start..data_start + len.as_usize()].to_vec();

    Ok(DecodedSignature::Contract { index, signer, proof })
}
