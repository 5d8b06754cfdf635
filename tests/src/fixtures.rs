//! # Test Fixtures
//!
//! A `World` is an in-memory host with the shared contracts installed by
//! `DEPLOYER`, plus helpers to create wallets, sign operations and read
//! wallet state through the wallet's own getters.

use nxv_signature::testing::LocalSigner;
use nxv_wallet::adapters::{EcrecoverVerifier, InMemoryHost};
use nxv_wallet::config::{HostConfig, WalletConfig};
use nxv_wallet::contracts::factory::encode_create_wallet;
use nxv_wallet::contracts::wallet::{encode_batch_signature, encode_initialize};
use nxv_wallet::contracts::WalletFunction;
use nxv_wallet::domain::abi::{AbiDecoder, AbiFunction, Token};
use nxv_wallet::domain::entities::Operation;
use nxv_wallet::domain::signatures::{encode_signatures, SignatureRecord};
use nxv_wallet::domain::typed_data::TypedDataHasher;
use nxv_wallet::domain::value_objects::{Address, Bytes, Hash, U256};
use nxv_wallet::errors::WalletError;
use nxv_wallet::ports::inbound::Deployment;
use nxv_wallet::service::install_contracts;
use std::sync::Arc;

/// Deploys the shared contracts.
pub const DEPLOYER: Address = Address::from_low_u64(0xde9);
/// Submits signed operations; holds no authority of its own.
pub const RELAYER: Address = Address::from_low_u64(0x4e1);

/// Installs a `tracing` subscriber honoring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `n` deterministic signers sorted by address.
#[must_use]
pub fn signers(n: u8) -> Vec<LocalSigner> {
    let mut signers: Vec<_> = (1..=n).map(|i| LocalSigner::from_seed([i; 32])).collect();
    signers.sort_by_key(LocalSigner::address);
    signers
}

/// Wallet-side address of a signer.
#[must_use]
pub fn address_of(signer: &LocalSigner) -> Address {
    Address::from(signer.address())
}

/// Host plus shared contracts.
pub struct World {
    /// The host every call runs on.
    pub host: InMemoryHost,
    /// Where the shared contracts live.
    pub contracts: Deployment,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// World with the default wallet configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WalletConfig::default())
    }

    /// World whose singleton runs with `config`.
    #[must_use]
    pub fn with_config(config: WalletConfig) -> Self {
        init_tracing();
        let mut host = InMemoryHost::new(HostConfig::default());
        let contracts = install_contracts(&mut host, DEPLOYER, &config, Arc::new(EcrecoverVerifier))
            .expect("shared contracts deploy");
        Self { host, contracts }
    }

    /// Chain id of the host.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.host.config().chain_id
    }

    /// Initializer calldata for a wallet without fallback handler.
    #[must_use]
    pub fn initializer(owners: &[Address], threshold: u64) -> Bytes {
        encode_initialize(owners, U256::from(threshold), Address::ZERO)
    }

    /// Creates a wallet through the factory.
    ///
    /// # Errors
    /// Whatever the factory raised.
    pub fn create_wallet(&mut self, owners: &[Address], threshold: u64, salt: u64) -> Result<Address, WalletError> {
        let initializer = Self::initializer(owners, threshold);
        let calldata = encode_create_wallet(self.contracts.singleton, initializer.as_slice(), U256::from(salt), false);
        let out = self.host.transact(DEPLOYER, self.contracts.factory, U256::zero(), calldata)?;
        Ok(AbiDecoder::new(out.as_slice()).address()?)
    }

    /// Asks the factory where `create_wallet` would land.
    pub fn predict_wallet(&mut self, singleton: Address, initializer: &Bytes, salt: u64) -> Address {
        let calldata = encode_create_wallet(singleton, initializer.as_slice(), U256::from(salt), true);
        let out = self
            .host
            .query(DEPLOYER, self.contracts.factory, calldata)
            .expect("calculateMultiSigWalletAddress");
        AbiDecoder::new(out.as_slice()).address().expect("address")
    }

    /// EIP-712 hash of `op` for `wallet`.
    #[must_use]
    pub fn transaction_hash(&self, wallet: Address, op: &Operation) -> Hash {
        TypedDataHasher::new(self.chain_id(), wallet).transaction_hash(op)
    }

    /// ECDSA signatures of `by` over `op`, packed in signer order.
    #[must_use]
    pub fn sign(&self, wallet: Address, op: &Operation, by: &[&LocalSigner]) -> Bytes {
        let hash = self.transaction_hash(wallet, op);
        let records: Vec<_> = by
            .iter()
            .map(|s| SignatureRecord::ecdsa(address_of(s), s.sign_hash(hash.as_bytes())))
            .collect();
        encode_signatures(&records)
    }

    /// Relays `op` with `signatures` to `wallet`.
    ///
    /// # Errors
    /// Whatever `batchSignature` raised.
    pub fn execute(&mut self, wallet: Address, op: &Operation, signatures: &Bytes) -> Result<Bytes, WalletError> {
        let calldata = encode_batch_signature(op, signatures.as_slice());
        self.host.transact(RELAYER, wallet, U256::zero(), calldata)
    }

    /// Signs with `by` and relays.
    ///
    /// # Errors
    /// Whatever `batchSignature` raised.
    pub fn execute_signed(&mut self, wallet: Address, op: &Operation, by: &[&LocalSigner]) -> Result<Bytes, WalletError> {
        let signatures = self.sign(wallet, op, by);
        self.execute(wallet, op, &signatures)
    }

    /// Read-only call of a wallet getter.
    pub fn view(&mut self, wallet: Address, function: WalletFunction, args: &[Token]) -> Bytes {
        self.host
            .query(RELAYER, wallet, function.encode(args))
            .expect("wallet getter")
    }

    /// `getOwners()`
    pub fn owners(&mut self, wallet: Address) -> Vec<Address> {
        let out = self.view(wallet, WalletFunction::GetOwners, &[]);
        AbiDecoder::new(out.as_slice()).address_array().expect("address[]")
    }

    /// `getThreshold()`
    pub fn threshold(&mut self, wallet: Address) -> U256 {
        let out = self.view(wallet, WalletFunction::GetThreshold, &[]);
        AbiDecoder::new(out.as_slice()).uint().expect("uint256")
    }

    /// `isNonceUsed(nonce)`
    pub fn is_nonce_used(&mut self, wallet: Address, nonce: u64) -> bool {
        let out = self.view(wallet, WalletFunction::IsNonceUsed, &[Token::Uint(U256::from(nonce))]);
        AbiDecoder::new(out.as_slice()).bool().expect("bool")
    }
}

/// Self-call operation on `wallet` running `function(args)`.
#[must_use]
pub fn self_call(wallet: Address, function: WalletFunction, args: &[Token], nonce: u64) -> Operation {
    Operation::call(wallet, U256::zero(), function.encode(args), U256::from(nonce))
}
