//! # Domain Entities
//!
//! Operations, batch items, deployment and migration records, and logs.

use crate::domain::abi::{encode, Token};
use crate::domain::services::{compute_create2_address, keccak256};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::ValidationError;
use crate::events::WalletEvent;
use serde::{Deserialize, Serialize};

/// Head of the owner cycle. Never a real owner.
pub const SENTINEL_OWNERS: Address = Address::from_low_u64(1);

/// Value `isValidSignature(bytes32,bytes)` returns for an accepted proof.
pub const EIP1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Creation code of the forwarding proxy. CREATE2 addresses commit to
/// `keccak256(PROXY_CREATION_CODE ++ pad32(singleton))`.
pub const PROXY_CREATION_CODE: &[u8] = b"\x60\x80nxv-wallet-proxy/1.0.0";

// =============================================================================
// EXECUTION MODE
// =============================================================================

/// How the Execution Core performs the authorized call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExecutionMode {
    /// Isolated call with the wallet as caller.
    Call = 0,
    /// Target code runs against the wallet's own storage.
    DelegateCall = 1,
}

impl ExecutionMode {
    /// Wire byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ExecutionMode {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            other => Err(ValidationError::UnknownOperation(other)),
        }
    }
}

// =============================================================================
// OPERATION
// =============================================================================

/// A proposed call, hashed and signed by the owners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Call target (or code to run, in delegate mode).
    pub destination: Address,
    /// Value forwarded with a `Call`.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Call or delegate call.
    pub operation: ExecutionMode,
    /// Unique per wallet; any 256-bit value not used before.
    pub nonce: U256,
}

impl Operation {
    /// Plain call with value.
    #[must_use]
    pub fn call(destination: Address, value: U256, data: Bytes, nonce: U256) -> Self {
        Self {
            destination,
            value,
            data,
            operation: ExecutionMode::Call,
            nonce,
        }
    }

    /// Delegate call into library code.
    #[must_use]
    pub fn delegate_call(destination: Address, data: Bytes, nonce: U256) -> Self {
        Self {
            destination,
            value: U256::zero(),
            data,
            operation: ExecutionMode::DelegateCall,
            nonce,
        }
    }
}

/// One entry of a packed batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOperation {
    /// Call or delegate call.
    pub operation: ExecutionMode,
    /// Call target.
    pub destination: Address,
    /// Value forwarded with a `Call`.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
}

// =============================================================================
// DEPLOYMENT RECORD
// =============================================================================

/// Inputs that fully determine a wallet proxy's address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Factory performing CREATE2.
    pub factory: Address,
    /// Singleton the proxy forwards to.
    pub implementation: Address,
    /// Calldata run on the new proxy right after deployment.
    pub initializer: Bytes,
    /// Caller-chosen salt.
    pub salt_nonce: U256,
}

impl DeploymentRecord {
    /// `keccak256(abi.encode(keccak256(initializer), saltNonce))`
    #[must_use]
    pub fn salt(&self) -> Hash {
        keccak256(&encode(&[
            Token::FixedBytes(keccak256(self.initializer.as_slice())),
            Token::Uint(self.salt_nonce),
        ]))
    }

    /// Proxy creation code with the singleton appended as constructor argument.
    #[must_use]
    pub fn init_code(&self) -> Vec<u8> {
        let mut code = PROXY_CREATION_CODE.to_vec();
        code.extend_from_slice(&self.implementation.to_word());
        code
    }

    /// CREATE2 address of the proxy.
    #[must_use]
    pub fn address(&self) -> Address {
        compute_create2_address(self.factory, self.salt(), keccak256(&self.init_code()))
    }
}

// =============================================================================
// MIGRATION RECORD
// =============================================================================

/// One version-pair upgrade: which singleton to leave, which to adopt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Singleton the account must currently run.
    pub from_implementation: Address,
    /// Singleton written to slot 0.
    pub to_implementation: Address,
    /// Handler written by `migrateWithFallbackHandler`.
    pub fallback_handler: Option<Address>,
}

// =============================================================================
// LOG
// =============================================================================

/// An event emitted by code running in `address`'s context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Account that emitted the log.
    pub address: Address,
    /// Decoded event.
    pub event: WalletEvent,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, event: WalletEvent) -> Self {
        Self { address, event }
    }
}
