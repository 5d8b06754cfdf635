//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits that define what wallet code needs from the execution host.
//!
//! | Trait | Purpose | Adapter |
//! |-------|---------|---------|
//! | `ExecutionHost` | storage, balances, code, logs, call dispatch | `InMemoryHost` |
//! | `SlotStore` | one account's storage, as seen by domain logic | `CallContext` |
//! | `SignatureVerifier` | ecrecover | `EcrecoverVerifier` |
//! | `DelegatedValidator` | contract signers (EIP-1271) | `CallContext` |
//! | `Contract` | code installed at an address | `contracts::*` |

use crate::domain::entities::Log;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::WalletError;
use crate::vm::{CallContext, Message};
use nxv_signature::{EcdsaSignature, SignatureError};
use std::fmt;
use std::sync::Arc;

/// Persistent key-value storage of a single account.
pub trait SlotStore {
    /// Reads a slot; unset slots read as zero.
    fn load(&self, key: StorageKey) -> StorageValue;

    /// Writes a slot.
    ///
    /// # Errors
    /// `StateError::WriteInStaticContext` when writes are not allowed.
    fn store(&mut self, key: StorageKey, value: StorageValue) -> Result<(), WalletError>;
}

/// Address recovery for key-pair signatures.
pub trait SignatureVerifier: Send + Sync + fmt::Debug {
    /// Recovers the signer of `hash`. Honors the EIP-191 `v + 4` convention.
    ///
    /// # Errors
    /// Any recovery failure.
    fn ecrecover(&self, hash: &Hash, signature: &EcdsaSignature) -> Result<Address, SignatureError>;
}

/// Validation of proofs held by contract signers.
///
/// A contract signer approves `hash` by answering `isValidSignature` with the
/// EIP-1271 magic value.
pub trait DelegatedValidator {
    /// Depth of the frame asking; bounds nested validation.
    fn validation_depth(&self) -> u16;

    /// Asks `signer` whether `proof` approves `hash`.
    ///
    /// Returns `Ok(false)` when the signer reverts or replies with anything
    /// but the magic value.
    ///
    /// # Errors
    /// `ValidationDepthExceeded` raised anywhere below is propagated.
    fn is_valid_signature(&mut self, signer: Address, hash: Hash, proof: &[u8]) -> Result<bool, WalletError>;
}

/// Executable code installed at an address.
///
/// `execute` runs with the storage, balance and identity described by the
/// context; an `Err` makes the host roll back everything the frame wrote.
pub trait Contract: Send + Sync + fmt::Debug {
    /// Human-readable contract name, for logs.
    fn name(&self) -> &'static str;

    /// Runs `input` (ABI calldata) and returns the ABI-encoded output.
    ///
    /// # Errors
    /// Any `WalletError`; the frame is reverted.
    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError>;

    /// Runs once, right after the code is deployed, in the new account's context.
    ///
    /// # Errors
    /// Any `WalletError`; the deployment is reverted.
    fn construct(&self, _ctx: &mut CallContext<'_>) -> Result<(), WalletError> {
        Ok(())
    }
}

/// World state and call dispatch.
///
/// Implementations must give every `execute` frame all-or-nothing semantics:
/// a frame returning `Err` leaves no storage, balance, code or log change.
pub trait ExecutionHost {
    /// Network identity mixed into every EIP-712 domain.
    fn chain_id(&self) -> u64;

    /// Reads `address`'s slot.
    fn storage(&self, address: Address, key: StorageKey) -> StorageValue;

    /// Writes `address`'s slot.
    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue);

    /// Balance of `address`.
    fn balance(&self, address: Address) -> U256;

    /// True if code is installed at `address`.
    fn has_code(&self, address: Address) -> bool;

    /// Appends a log.
    fn emit_log(&mut self, log: Log);

    /// Runs one message as a new frame.
    ///
    /// # Errors
    /// Whatever the frame raised, after rolling it back.
    fn execute(&mut self, message: Message) -> Result<Bytes, WalletError>;

    /// Creation counter of `address` (the CREATE nonce).
    fn nonce(&self, address: Address) -> u64;

    /// Bumps `address`'s creation counter and returns the value before the bump.
    fn increment_nonce(&mut self, address: Address) -> u64;

    /// Program registered for `init_code`, if any.
    fn program(&self, init_code: &[u8]) -> Option<Arc<dyn Contract>>;

    /// Installs code at an empty address, moves `value` from `creator` to it,
    /// and runs its constructor in a frame entered by `creator` at `depth`.
    ///
    /// # Errors
    /// `StateError::AddressCollision` if code already exists there,
    /// `InsufficientBalance`, or whatever the constructor raised (after
    /// rolling the deployment back).
    fn deploy(
        &mut self,
        creator: Address,
        address: Address,
        code: Arc<dyn Contract>,
        value: U256,
        depth: u16,
    ) -> Result<(), WalletError>;
}
