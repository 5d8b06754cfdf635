//! # Event Schema
//!
//! Notifications emitted by wallet code. Each event keeps its Solidity-style
//! signature so `topic()` matches what an indexer would compute.
//!
//! | Event | Emitted by |
//! |-------|-----------|
//! | `WalletSetup` | `initialize` |
//! | `AddedOwner`, `RemovedOwner`, `ChangedThreshold` | owner registry mutators |
//! | `ExecutionSuccess`, `ExecutionFailure` | `batchSignature` |
//! | `ChangedFallbackHandler` | `initialize`, `setFallbackHandler`, migration |
//! | `ChangedMasterCopy` | migration |
//! | `SignMsg` | sign-message library |
//! | `NewMultiSigWalletCreated` | factory |
//! | `ReceivedValue` | plain value transfers into a wallet |

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Hash, U256};
use serde::{Deserialize, Serialize};

/// Every event the wallet system emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
    /// Account initialized.
    WalletSetup {
        /// Caller of `initialize` (the factory when deployed through one).
        initiator: Address,
        /// Owners in list order.
        owners: Vec<Address>,
        /// Initial threshold.
        threshold: U256,
        /// Fallback handler (zero if none).
        fallback_handler: Address,
    },
    /// Owner inserted.
    AddedOwner {
        /// New owner.
        owner: Address,
    },
    /// Owner removed.
    RemovedOwner {
        /// Removed owner.
        owner: Address,
    },
    /// Threshold changed.
    ChangedThreshold {
        /// New threshold.
        threshold: U256,
    },
    /// Authorized call succeeded.
    ExecutionSuccess {
        /// Operation hash.
        tx_hash: Hash,
    },
    /// Authorized call failed, nonce kept consumed.
    ExecutionFailure {
        /// Operation hash.
        tx_hash: Hash,
        /// Inner error message.
        reason: String,
    },
    /// Fallback handler slot written.
    ChangedFallbackHandler {
        /// New handler.
        handler: Address,
    },
    /// Implementation pointer rewritten.
    ChangedMasterCopy {
        /// New singleton.
        singleton: Address,
    },
    /// Message hash approved for `isValidSignature`.
    SignMsg {
        /// Approved message hash.
        msg_hash: Hash,
    },
    /// Factory deployed a proxy.
    NewMultiSigWalletCreated {
        /// New proxy.
        proxy: Address,
        /// Singleton it forwards to.
        singleton: Address,
    },
    /// Contract deployed through `CreateCall`.
    ContractCreation {
        /// Address of the new contract.
        new_contract: Address,
    },
    /// Plain value received.
    ReceivedValue {
        /// Sender.
        sender: Address,
        /// Amount.
        value: U256,
    },
}

impl WalletEvent {
    /// Canonical event signature.
    #[must_use]
    pub fn signature(&self) -> &'static str {
        match self {
            Self::WalletSetup { .. } => "WalletSetup(address,address[],uint256,address)",
            Self::AddedOwner { .. } => "AddedOwner(address)",
            Self::RemovedOwner { .. } => "RemovedOwner(address)",
            Self::ChangedThreshold { .. } => "ChangedThreshold(uint256)",
            Self::ExecutionSuccess { .. } => "ExecutionSuccess(bytes32)",
            Self::ExecutionFailure { .. } => "ExecutionFailure(bytes32,string)",
            Self::ChangedFallbackHandler { .. } => "ChangedFallbackHandler(address)",
            Self::ChangedMasterCopy { .. } => "ChangedMasterCopy(address)",
            Self::SignMsg { .. } => "SignMsg(bytes32)",
            Self::NewMultiSigWalletCreated { .. } => "NewMultiSigWalletCreated(address,address)",
            Self::ContractCreation { .. } => "ContractCreation(address)",
            Self::ReceivedValue { .. } => "ReceivedValue(address,uint256)",
        }
    }

    /// First log topic: `keccak256(signature)`.
    #[must_use]
    pub fn topic(&self) -> Hash {
        keccak256(self.signature().as_bytes())
    }
}
