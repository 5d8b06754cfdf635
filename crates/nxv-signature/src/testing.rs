//! # Testing Fixtures
//!
//! Local secp256k1 signers producing wallet-compatible signatures.

use crate::domain::ecdsa::{address_from_pubkey, eth_signed_message_hash, invert_s, is_low_s};
use crate::domain::entities::{Address, EcdsaSignature, Hash};
use k256::ecdsa::SigningKey;

/// An in-process signing key, the off-chain half of an owner.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Fresh random key.
    #[must_use]
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Deterministic key from a 32-byte secret. `seed` must be a valid scalar.
    ///
    /// # Panics
    /// Panics if `seed` is zero or not below the curve order.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let key = SigningKey::from_slice(&seed).expect("seed must be a valid secp256k1 scalar");
        Self::from_key(key)
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_pubkey(key.verifying_key());
        Self { key, address }
    }

    /// Address controlled by this key.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest directly (`v` in {27, 28}, low S).
    ///
    /// # Panics
    /// Panics if k256 fails to sign, which does not happen for valid keys.
    #[must_use]
    pub fn sign_hash(&self, hash: &Hash) -> EcdsaSignature {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(hash)
            .expect("signing failed");

        let sig_bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        if is_low_s(&s) {
            EcdsaSignature { r, s, v: recid.to_byte() + 27 }
        } else {
            // Flipping S flips the parity of R's y-coordinate
            let v = if recid.to_byte() == 0 { 28 } else { 27 };
            EcdsaSignature { r, s: invert_s(&s), v }
        }
    }

    /// Sign the EIP-191 digest of `hash`, tagged with `v + 4`.
    #[must_use]
    pub fn sign_eth_message(&self, hash: &Hash) -> EcdsaSignature {
        self.sign_hash(&eth_signed_message_hash(hash)).into_eth_sign()
    }
}
