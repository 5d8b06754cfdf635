//! # Authorization Engine
//!
//! Threshold verification of a signature blob against an operation hash.
//!
//! For the first `required` records of the blob:
//!
//! 1. recover (ECDSA) or read (contract) the signer
//! 2. require it to be strictly greater than the previous signer
//! 3. require it to be a current owner
//! 4. for contract signers, require `isValidSignature` to answer the magic value
//!
//! Any failure rejects the whole blob; nothing is written either way.

use crate::domain::entities::SENTINEL_OWNERS;
use crate::domain::layout::owner_slot;
use crate::domain::signatures::{decode_signatures, DecodedSignature};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::{AuthorizationError, StateError, ValidationError, WalletError};
use crate::ports::outbound::{DelegatedValidator, SignatureVerifier, SlotStore};
use nxv_signature::EcdsaSignature;
use tracing::debug;

/// Checks signature blobs for one account.
#[derive(Debug, Clone, Copy)]
pub struct SignatureChecker<'v> {
    verifier: &'v dyn SignatureVerifier,
    max_validation_depth: u16,
}

impl<'v> SignatureChecker<'v> {
    /// Checker using `verifier` for ECDSA and refusing contract signers at
    /// frames deeper than `max_validation_depth`.
    #[must_use]
    pub fn new(verifier: &'v dyn SignatureVerifier, max_validation_depth: u16) -> Self {
        Self {
            verifier,
            max_validation_depth,
        }
    }

    /// Verifies that `blob` carries `required` valid owner signatures of `data_hash`.
    ///
    /// # Errors
    /// - `NotInitialized` if `required` is zero
    /// - `SignaturesTooShort`, `MalformedSignatures` from decoding
    /// - `InvalidSignature` if ECDSA recovery fails
    /// - `SignersNotAscending` for duplicates or wrong order
    /// - `NotOwner` for a signer outside the owner set
    /// - `ValidationDepthExceeded`, `ContractSignatureRejected` for contract signers
    pub fn check_signatures<C>(
        &self,
        ctx: &mut C,
        data_hash: Hash,
        blob: &[u8],
        required: U256,
    ) -> Result<(), WalletError>
    where
        C: SlotStore + DelegatedValidator + ?Sized,
    {
        if required.is_zero() {
            return Err(StateError::NotInitialized.into());
        }
        // Owner counts never get near usize::MAX; a larger value cannot be met.
        let required = usize::try_from(required)
            .map_err(|_| ValidationError::MalformedSignatures("threshold exceeds blob capacity"))?;

        let mut previous = Address::ZERO;
        for record in decode_signatures(blob, required)? {
            let signer = match record {
                DecodedSignature::Ecdsa { index, signature } => self.recover(index, data_hash, &signature)?,
                DecodedSignature::Contract { signer, .. } => signer,
            };

            if signer <= previous {
                return Err(AuthorizationError::SignersNotAscending { signer, previous }.into());
            }
            if !is_owner(ctx, signer) {
                return Err(AuthorizationError::NotOwner(signer).into());
            }

            if let DecodedSignature::Contract { proof, .. } = &record {
                self.check_contract_signer(ctx, signer, data_hash, proof)?;
            }
            previous = signer;
        }

        debug!(required, hash = %data_hash, "signatures verified");
        Ok(())
    }

    fn recover(&self, index: usize, hash: Hash, signature: &EcdsaSignature) -> Result<Address, WalletError> {
        self.verifier.ecrecover(&hash, signature).map_err(|e| {
            AuthorizationError::InvalidSignature {
                index,
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn check_contract_signer<C>(
        &self,
        ctx: &mut C,
        signer: Address,
        hash: Hash,
        proof: &[u8],
    ) -> Result<(), WalletError>
    where
        C: DelegatedValidator + ?Sized,
    {
        let depth = ctx.validation_depth();
        if depth >= self.max_validation_depth {
            return Err(AuthorizationError::ValidationDepthExceeded { depth }.into());
        }
        if !ctx.is_valid_signature(signer, hash, proof)? {
            return Err(AuthorizationError::ContractSignatureRejected(signer).into());
        }
        Ok(())
    }
}

fn is_owner<S: SlotStore + ?Sized>(store: &S, address: Address) -> bool {
    address != SENTINEL_OWNERS && !store.load(owner_slot(address)).to_address().is_zero()
}
