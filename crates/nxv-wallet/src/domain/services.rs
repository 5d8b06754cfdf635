//! # Domain Services
//!
//! Pure hashing and address derivation helpers.
//!
//! - NO I/O operations
//! - NO async code
//! - Pure functions only

use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash(Keccak256::digest(data).into())
}

/// Keccak-256 over the concatenation of `parts`.
#[must_use]
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

/// Computes the contract address for CREATE.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_create_address(sender: Address, nonce: u64) -> Address {
    // RLP: 0x94 ++ sender, then the nonce as a minimal big-endian string
    let bytes = nonce.to_be_bytes();
    let significant = &bytes[(nonce.leading_zeros() / 8) as usize..];
    let mut content = Vec::with_capacity(30);
    content.push(0x80 + 20);
    content.extend_from_slice(sender.as_bytes());
    match significant {
        [single] if *single < 0x80 => content.push(*single),
        _ => {
            content.push(0x80 + significant.len() as u8);
            content.extend_from_slice(significant);
        }
    }

    // payload is at most 30 bytes, so the short list header applies
    let header = [0xc0 + content.len() as u8];
    let hash = keccak256_concat(&[&header, &content]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.0[12..32]);
    Address::new(addr)
}

/// Computes the contract address for CREATE2.
///
/// Address = keccak256(0xff ++ sender ++ salt ++ `init_code_hash`)\[12:\]
///
/// Per EIP-1014.
#[must_use]
pub fn compute_create2_address(sender: Address, salt: Hash, init_code_hash: Hash) -> Address {
    let hash = keccak256_concat(&[&[0xff], sender.as_bytes(), salt.as_bytes(), init_code_hash.as_bytes()]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.0[12..32]);
    Address::new(addr)
}
