//! # NXV Wallet - Threshold-Authorized Programmable Accounts
//!
//! ## Purpose
//!
//! Accounts controlled by a set of owners: an operation runs only when at
//! least `threshold` distinct owners signed its EIP-712 hash. Each account is
//! a thin proxy that delegates to one shared wallet singleton, deployed at a
//! deterministic CREATE2 address by a factory.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Owner links form one cycle through the sentinel | `domain/owners.rs`, audited by `domain/invariants.rs` |
//! | `1 <= threshold <= ownerCount` after setup | `OwnerRegistry::check_threshold` |
//! | Each nonce executes at most once | `contracts/wallet.rs` (`batchSignature`) |
//! | Signers strictly ascending, all owners | `domain/authorization.rs` |
//! | Self-management only via the wallet itself | `contracts/wallet.rs` (`only_self`) |
//! | Failed frames leave no trace | `adapters/in_memory_host.rs` (journal) |
//!
//! ## Layout
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Domain | `domain/` | owner registry, hashing, signature codec, batch codec |
//! | Contracts | `contracts/` | wallet, proxy, factory, libraries, fallback handler |
//! | VM | `vm/` | call frames and the context contracts run against |
//! | Adapters | `adapters/` | in-memory host, ecrecover verifier |
//! | Ports | `ports/` | async API (inbound), host and verifier traits (outbound) |
//! | Service | `service.rs` | serialized async front with statistics |
//!
//! ## Usage Example
//!
//! ```ignore
//! use nxv_wallet::prelude::*;
//!
//! let service = create_test_service();
//! service.deploy(deployer).await?;
//! let wallet = service.create_wallet(deployer, request).await?;
//! let receipt = service.submit(relayer, wallet, op, signatures).await?;
//! assert!(receipt.success);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;
pub mod vm;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        DeploymentRecord, ExecutionMode, Log, MigrationRecord, Operation, SubOperation,
        EIP1271_MAGIC_VALUE, SENTINEL_OWNERS,
    };

    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};

    // Hashing and codecs
    pub use crate::domain::batch::{decode_batch, encode_batch};
    pub use crate::domain::invariants::{check_owner_invariants, InvariantCheckResult, InvariantViolation};
    pub use crate::domain::services::{compute_create2_address, keccak256};
    pub use crate::domain::signatures::{encode_signatures, SignatureRecord};
    pub use crate::domain::typed_data::TypedDataHasher;

    // Contracts
    pub use crate::contracts::{
        BatchExecutor, CompatibilityFallbackHandler, CreateCall, MultiSigWallet, SignMessageLib,
        WalletFactory, WalletMigration, WalletProxy,
    };

    // Host
    pub use crate::adapters::{EcrecoverVerifier, InMemoryHost};
    pub use crate::ports::outbound::{Contract, ExecutionHost, SignatureVerifier, SlotStore};
    pub use crate::vm::CallContext;

    // Configuration and errors
    pub use crate::config::{HostConfig, ReplayPolicy, ServiceConfig, WalletConfig};
    pub use crate::errors::{
        AuthorizationError, ExecutionError, StateError, ValidationError, WalletError,
    };
    pub use crate::events::WalletEvent;

    // Service
    pub use crate::ports::inbound::{
        CreateWalletRequest, Deployment, MultisigWalletApi, OperationReceipt,
    };
    pub use crate::service::{create_test_service, ServiceStats, WalletService};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
