//! # Wallet Service
//!
//! Async front for the wallet system. Owns one `InMemoryHost` behind a
//! `tokio::sync::RwLock`: submissions and deployments take the write lock, so
//! every mutating request runs as one serialized transaction; state reads
//! share the read lock.
//!
//! ## Responsibilities
//!
//! - deploy the singleton, factory, libraries and fallback handler
//! - create wallets through the factory (CREATE2)
//! - relay signed operations to `batchSignature` and build receipts
//! - keep `ServiceStats`
//! - audit owner invariants (after every submission in debug builds)
//!
//! With `ServiceConfig::enable_tracing` off, every request runs under a
//! `NoSubscriber` dispatcher: no spans or events leave the service.

use crate::adapters::{EcrecoverVerifier, InMemoryHost};
use crate::config::{ServiceConfig, WalletConfig};
use crate::contracts::factory::encode_create_wallet;
use crate::contracts::wallet::{encode_batch_signature, encode_initialize};
use crate::contracts::{
    BatchExecutor, CompatibilityFallbackHandler, CreateCall, MultiSigWallet, SignMessageLib,
    WalletFactory,
};
use crate::domain::abi::AbiDecoder;
use crate::domain::entities::{DeploymentRecord, Operation};
use crate::domain::invariants::{check_owner_invariants, InvariantCheckResult};
use crate::domain::layout::nonce_slot;
use crate::domain::owners::OwnerRegistry;
use crate::domain::services::{compute_create2_address, keccak256};
use crate::domain::typed_data::TypedDataHasher;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{StateError, ValidationError, WalletError};
use crate::ports::inbound::{CreateWalletRequest, Deployment, MultisigWalletApi, OperationReceipt};
use crate::ports::outbound::{Contract, ExecutionHost, SignatureVerifier, SlotStore};

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Statistics for the wallet service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Operations submitted.
    pub operations_executed: u64,
    /// Operations whose inner call succeeded.
    pub operations_succeeded: u64,
    /// Authorized operations whose inner call failed.
    pub operations_failed: u64,
    /// Operations refused before execution (bad input, signatures, nonce).
    pub operations_rejected: u64,
    /// Wallets deployed through the factory.
    pub wallets_created: u64,
}

/// The wallet service.
pub struct WalletService {
    config: ServiceConfig,
    host: Arc<RwLock<InMemoryHost>>,
    verifier: Arc<dyn SignatureVerifier>,
    deployment: Arc<RwLock<Option<Deployment>>>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl WalletService {
    /// Creates a service over an empty host.
    #[must_use]
    pub fn new(config: ServiceConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        let host = InMemoryHost::new(config.host.clone());
        Self {
            config,
            host: Arc::new(RwLock::new(host)),
            verifier,
            deployment: Arc::new(RwLock::new(None)),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared handle to the host, for embedders that run their own contracts.
    #[must_use]
    pub fn host(&self) -> Arc<RwLock<InMemoryHost>> {
        Arc::clone(&self.host)
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Addresses from the last successful `deploy`.
    pub async fn deployment(&self) -> Option<Deployment> {
        *self.deployment.read().await
    }

    async fn require_deployment(&self) -> Result<Deployment, WalletError> {
        self.deployment
            .read()
            .await
            .ok_or_else(|| ValidationError::NotDeployed("Factory").into())
    }

    /// Runs `work` with tracing on, or silenced when `enable_tracing` is off.
    async fn traced<T>(&self, work: impl Future<Output = T>) -> T {
        if self.config.enable_tracing {
            work.await
        } else {
            work.with_subscriber(NoSubscriber::default()).await
        }
    }

    /// Submits an operation under a caller-chosen correlation id.
    ///
    /// # Errors
    /// Whatever `batchSignature` raised; the host is left unchanged.
    pub async fn submit_with_id(
        &self,
        correlation_id: Uuid,
        submitter: Address,
        wallet: Address,
        operation: Operation,
        signatures: Bytes,
    ) -> Result<OperationReceipt, WalletError> {
        self.traced(self.relay(correlation_id, submitter, wallet, operation, signatures))
            .await
    }

    #[instrument(skip(self, operation, signatures), fields(correlation_id = %correlation_id, %wallet, nonce = %operation.nonce))]
    async fn relay(
        &self,
        correlation_id: Uuid,
        submitter: Address,
        wallet: Address,
        operation: Operation,
        signatures: Bytes,
    ) -> Result<OperationReceipt, WalletError> {
        let mut host = self.host.write().await;
        let tx_hash = TypedDataHasher::new(host.config().chain_id, wallet).transaction_hash(&operation);
        let first_log = host.logs().len();

        let result = host.transact(
            submitter,
            wallet,
            U256::zero(),
            encode_batch_signature(&operation, signatures.as_slice()),
        );

        let receipt = result.and_then(|output| {
            let success = AbiDecoder::new(output.as_slice()).bool()?;
            let events = host.logs()[first_log..].iter().map(|log| log.event.clone()).collect();
            Ok(OperationReceipt {
                correlation_id,
                wallet,
                tx_hash,
                nonce: operation.nonce,
                success,
                events,
            })
        });

        if cfg!(debug_assertions) {
            if let InvariantCheckResult::Invalid(violations) = check_owner_invariants(&host.account_view(wallet)) {
                error!(?violations, "owner invariants broken after submission");
            }
        }
        drop(host);

        let mut stats = self.stats.write().await;
        stats.operations_executed += 1;
        match &receipt {
            Ok(r) if r.success => {
                stats.operations_succeeded += 1;
                info!(%tx_hash, "operation executed");
            }
            Ok(_) => {
                stats.operations_failed += 1;
                warn!(%tx_hash, "operation failed, nonce consumed");
            }
            Err(WalletError::Execution(e)) => {
                stats.operations_failed += 1;
                warn!(%tx_hash, error = %e, "operation reverted");
            }
            Err(e) => {
                stats.operations_rejected += 1;
                warn!(%tx_hash, category = e.category(), error = %e, "operation rejected");
            }
        }
        if let Ok(r) = &receipt {
            debug!(events = r.events.len(), success = r.success, "receipt built");
        }
        receipt
    }

    #[instrument(skip(self))]
    async fn install(&self, deployer: Address) -> Result<Deployment, WalletError> {
        let deployment = {
            let mut host = self.host.write().await;
            install_contracts(&mut host, deployer, &self.config.wallet, Arc::clone(&self.verifier))?
        };
        *self.deployment.write().await = Some(deployment);
        info!(singleton = %deployment.singleton, factory = %deployment.factory, "wallet contracts deployed");
        Ok(deployment)
    }

    #[instrument(skip(self, request), fields(owners = request.owners.len(), threshold = %request.threshold))]
    async fn create_through_factory(
        &self,
        creator: Address,
        request: CreateWalletRequest,
    ) -> Result<Address, WalletError> {
        let deployment = self.require_deployment().await?;
        let initializer = encode_initialize(
            &request.owners,
            request.threshold,
            request.fallback_handler.unwrap_or(Address::ZERO),
        );
        let calldata = encode_create_wallet(
            deployment.singleton,
            initializer.as_slice(),
            request.salt_nonce,
            false,
        );

        let output = self
            .host
            .write()
            .await
            .transact(creator, deployment.factory, U256::zero(), calldata)?;
        let wallet = AbiDecoder::new(output.as_slice()).address()?;

        self.stats.write().await.wallets_created += 1;
        info!(%wallet, "wallet created");
        Ok(wallet)
    }
}

/// Deterministic address of a shared contract deployed by `deployer`.
#[must_use]
pub fn infrastructure_address(deployer: Address, name: &str) -> Address {
    let tag = keccak256(name.as_bytes());
    compute_create2_address(deployer, tag, tag)
}

/// Installs the shared contracts at addresses derived from `deployer`, all
/// or none.
///
/// # Errors
/// `AddressCollision` naming the first address already taken, or whatever
/// a constructor raised.
pub fn install_contracts(
    host: &mut InMemoryHost,
    deployer: Address,
    wallet: &WalletConfig,
    verifier: Arc<dyn SignatureVerifier>,
) -> Result<Deployment, WalletError> {
    let deployment = Deployment {
        singleton: infrastructure_address(deployer, "singleton"),
        factory: infrastructure_address(deployer, "factory"),
        multi_send: infrastructure_address(deployer, "multi_send"),
        multi_send_call_only: infrastructure_address(deployer, "multi_send_call_only"),
        sign_message_lib: infrastructure_address(deployer, "sign_message_lib"),
        create_call: infrastructure_address(deployer, "create_call"),
        fallback_handler: infrastructure_address(deployer, "fallback_handler"),
    };

    let codes: [(Address, Arc<dyn Contract>); 7] = [
        (deployment.singleton, Arc::new(MultiSigWallet::new(wallet.clone(), verifier))),
        (deployment.factory, Arc::new(WalletFactory)),
        (deployment.multi_send, Arc::new(BatchExecutor::new())),
        (deployment.multi_send_call_only, Arc::new(BatchExecutor::call_only())),
        (deployment.sign_message_lib, Arc::new(SignMessageLib)),
        (deployment.create_call, Arc::new(CreateCall)),
        (deployment.fallback_handler, Arc::new(CompatibilityFallbackHandler)),
    ];
    if let Some((taken, _)) = codes.iter().find(|(address, _)| host.has_code(*address)) {
        return Err(StateError::AddressCollision(*taken).into());
    }
    host.create_all(deployer, codes)?;
    Ok(deployment)
}

/// Create a service with in-memory adapters and default configuration (for testing).
#[must_use]
pub fn create_test_service() -> WalletService {
    WalletService::new(ServiceConfig::default(), Arc::new(EcrecoverVerifier))
}

// =============================================================================
// MultisigWalletApi Implementation
// =============================================================================

#[async_trait]
impl MultisigWalletApi for WalletService {
    async fn deploy(&self, deployer: Address) -> Result<Deployment, WalletError> {
        self.traced(self.install(deployer)).await
    }

    async fn create_wallet(
        &self,
        creator: Address,
        request: CreateWalletRequest,
    ) -> Result<Address, WalletError> {
        self.traced(self.create_through_factory(creator, request)).await
    }

    async fn predict_wallet_address(&self, request: &CreateWalletRequest) -> Result<Address, WalletError> {
        let deployment = self.require_deployment().await?;
        let record = DeploymentRecord {
            factory: deployment.factory,
            implementation: deployment.singleton,
            initializer: encode_initialize(
                &request.owners,
                request.threshold,
                request.fallback_handler.unwrap_or(Address::ZERO),
            ),
            salt_nonce: request.salt_nonce,
        };
        Ok(record.address())
    }

    async fn submit(
        &self,
        submitter: Address,
        wallet: Address,
        operation: Operation,
        signatures: Bytes,
    ) -> Result<OperationReceipt, WalletError> {
        self.submit_with_id(Uuid::new_v4(), submitter, wallet, operation, signatures)
            .await
    }

    async fn transaction_hash(&self, wallet: Address, operation: &Operation) -> Result<Hash, WalletError> {
        let chain_id = self.host.read().await.config().chain_id;
        Ok(TypedDataHasher::new(chain_id, wallet).transaction_hash(operation))
    }

    async fn owners(&self, wallet: Address) -> Result<Vec<Address>, WalletError> {
        let host = self.host.read().await;
        let mut view = host.account_view(wallet);
        Ok(OwnerRegistry::new(&mut view, wallet).owners())
    }

    async fn threshold(&self, wallet: Address) -> Result<U256, WalletError> {
        let host = self.host.read().await;
        let mut view = host.account_view(wallet);
        Ok(OwnerRegistry::new(&mut view, wallet).threshold())
    }

    async fn is_nonce_used(&self, wallet: Address, nonce: U256) -> Result<bool, WalletError> {
        let host = self.host.read().await;
        Ok(!host.account_view(wallet).load(nonce_slot(nonce)).is_zero())
    }

    async fn verify_invariants(&self, wallet: Address) -> InvariantCheckResult {
        let host = self.host.read().await;
        check_owner_invariants(&host.account_view(wallet))
    }
}

// =============================================================================
// TESTS
// =============================================================================
