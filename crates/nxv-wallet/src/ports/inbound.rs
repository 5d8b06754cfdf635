//! # Driving Ports (API - Inbound)
//!
//! The async surface the wallet service exposes to embedders: deploy the
//! shared contracts, create wallets, submit signed operations, read state.
//!
//! Every mutating call is serialized by the service, so callers never observe
//! a half-applied operation.

use crate::domain::entities::Operation;
use crate::domain::invariants::InvariantCheckResult;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::WalletError;
use crate::events::WalletEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// REQUEST / RESPONSE TYPES
// =============================================================================

/// Addresses of the shared contracts every wallet relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Wallet singleton.
    pub singleton: Address,
    /// Proxy factory.
    pub factory: Address,
    /// `multiSend` library (calls and delegate calls).
    pub multi_send: Address,
    /// `multiSend` library restricted to calls.
    pub multi_send_call_only: Address,
    /// `signMessage` library.
    pub sign_message_lib: Address,
    /// `performCreate` / `performCreate2` library.
    pub create_call: Address,
    /// Default fallback handler.
    pub fallback_handler: Address,
}

/// Parameters of a new wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWalletRequest {
    /// Initial owners, in list order.
    pub owners: Vec<Address>,
    /// Initial threshold.
    pub threshold: U256,
    /// Fallback handler, `None` for none.
    pub fallback_handler: Option<Address>,
    /// CREATE2 salt nonce.
    pub salt_nonce: U256,
}

/// Outcome of one submitted operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// Identifier attached to the submission's log spans.
    pub correlation_id: Uuid,
    /// Executing wallet.
    pub wallet: Address,
    /// EIP-712 hash of the operation.
    pub tx_hash: Hash,
    /// Consumed nonce.
    pub nonce: U256,
    /// False only when the inner call failed under `ReplayPolicy::ConsumeNonce`.
    pub success: bool,
    /// Events emitted by the transaction, in order.
    pub events: Vec<WalletEvent>,
}

// =============================================================================
// MULTISIG WALLET API (Primary Driving Port)
// =============================================================================

/// Primary API for wallet management and execution.
///
/// ## Usage
///
/// ```ignore
/// let deployment = api.deploy(deployer).await?;
/// let wallet = api.create_wallet(deployer, request).await?;
/// let receipt = api.submit(relayer, wallet, op, signatures).await?;
/// ```
#[async_trait]
pub trait MultisigWalletApi: Send + Sync {
    /// Deploys the singleton, factory, libraries and fallback handler.
    ///
    /// Addresses are derived from `deployer`, so deploying twice from the same
    /// deployer fails with `AddressCollision`.
    async fn deploy(&self, deployer: Address) -> Result<Deployment, WalletError>;

    /// Deploys and initializes a wallet proxy through the factory.
    async fn create_wallet(
        &self,
        creator: Address,
        request: CreateWalletRequest,
    ) -> Result<Address, WalletError>;

    /// Address `create_wallet` would produce for `request`.
    async fn predict_wallet_address(&self, request: &CreateWalletRequest) -> Result<Address, WalletError>;

    /// Submits an operation with its packed signatures.
    async fn submit(
        &self,
        submitter: Address,
        wallet: Address,
        operation: Operation,
        signatures: Bytes,
    ) -> Result<OperationReceipt, WalletError>;

    /// EIP-712 hash owners must sign for `operation` on `wallet`.
    async fn transaction_hash(&self, wallet: Address, operation: &Operation) -> Result<Hash, WalletError>;

    /// Owners of `wallet` in list order.
    async fn owners(&self, wallet: Address) -> Result<Vec<Address>, WalletError>;

    /// Threshold of `wallet`.
    async fn threshold(&self, wallet: Address) -> Result<U256, WalletError>;

    /// True once `nonce` was consumed by `wallet`.
    async fn is_nonce_used(&self, wallet: Address, nonce: U256) -> Result<bool, WalletError>;

    /// Audits the owner structure stored in `wallet`.
    async fn verify_invariants(&self, wallet: Address) -> InvariantCheckResult;
}
