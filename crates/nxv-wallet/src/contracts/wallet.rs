//! # MultiSigWallet
//!
//! The wallet singleton. Every proxy delegate-calls into it, so all state it
//! touches lives in the proxy's storage (see `domain::layout`).
//!
//! ## Entry points
//!
//! | Function | Access |
//! |----------|--------|
//! | `initialize` | once, anyone |
//! | `batchSignature` | anyone holding `threshold` owner signatures |
//! | `addOwnerWithThreshold`, `removeOwner`, `swapOwner`, `changeThreshold`, `setFallbackHandler` | the wallet itself |
//! | getters, `checkSignatures`, `isValidSignature` | anyone, read-only |
//! | `simulateAndRevert` | anyone; always reverts |
//!
//! Self-management functions are reachable only through `batchSignature`
//! with `operation = Call` and `destination = wallet`, where the inner call's
//! caller is the wallet.

use crate::adapters::EcrecoverVerifier;
use crate::config::{ReplayPolicy, WalletConfig};
use crate::contracts::returns;
use crate::domain::abi::{
    encode, selector_table, split_selector, AbiDecoder, AbiFunction, Selector, SelectorTable, Token,
};
use crate::domain::authorization::SignatureChecker;
use crate::domain::entities::{ExecutionMode, Operation, EIP1271_MAGIC_VALUE};
use crate::domain::layout::{
    executed_tx_slot, nonce_slot, signed_message_slot, FALLBACK_HANDLER_SLOT, THRESHOLD_SLOT,
};
use crate::domain::owners::OwnerRegistry;
use crate::domain::typed_data::TypedDataHasher;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::{AuthorizationError, ExecutionError, StateError, ValidationError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::{Contract, SignatureVerifier};
use crate::vm::CallContext;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest window `getStorageAt` returns, in words.
const MAX_STORAGE_WINDOW: usize = 1024;

/// Functions of the wallet singleton.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletFunction {
    /// `initialize(address[],uint256,address)`
    Initialize,
    /// `batchSignature(address,uint256,bytes,uint8,uint256,bytes)`
    BatchSignature,
    /// `addOwnerWithThreshold(address,uint256)`
    AddOwnerWithThreshold,
    /// `removeOwner(address,address,uint256)`
    RemoveOwner,
    /// `swapOwner(address,address,address)`
    SwapOwner,
    /// `changeThreshold(uint256)`
    ChangeThreshold,
    /// `setFallbackHandler(address)`
    SetFallbackHandler,
    /// `getOwners()`
    GetOwners,
    /// `isOwner(address)`
    IsOwner,
    /// `getThreshold()`
    GetThreshold,
    /// `isNonceUsed(uint256)`
    IsNonceUsed,
    /// `signedMessages(bytes32)`
    SignedMessages,
    /// `domainSeparator()`
    DomainSeparator,
    /// `getTransactionHash(address,uint256,bytes,uint8,uint256)`
    GetTransactionHash,
    /// `getMessageHash(bytes)`
    GetMessageHash,
    /// `checkSignatures(bytes32,bytes)`
    CheckSignatures,
    /// `isValidSignature(bytes32,bytes)`
    IsValidSignature,
    /// `getStorageAt(uint256,uint256)`
    GetStorageAt,
    /// `simulateAndRevert(address,bytes)`
    SimulateAndRevert,
}

impl AbiFunction for WalletFunction {
    const ALL: &'static [Self] = &[
        Self::Initialize,
        Self::BatchSignature,
        Self::AddOwnerWithThreshold,
        Self::RemoveOwner,
        Self::SwapOwner,
        Self::ChangeThreshold,
        Self::SetFallbackHandler,
        Self::GetOwners,
        Self::IsOwner,
        Self::GetThreshold,
        Self::IsNonceUsed,
        Self::SignedMessages,
        Self::DomainSeparator,
        Self::GetTransactionHash,
        Self::GetMessageHash,
        Self::CheckSignatures,
        Self::IsValidSignature,
        Self::GetStorageAt,
        Self::SimulateAndRevert,
    ];

    fn signature(self) -> &'static str {
        match self {
            Self::Initialize => "initialize(address[],uint256,address)",
            Self::BatchSignature => "batchSignature(address,uint256,bytes,uint8,uint256,bytes)",
            Self::AddOwnerWithThreshold => "addOwnerWithThreshold(address,uint256)",
            Self::RemoveOwner => "removeOwner(address,address,uint256)",
            Self::SwapOwner => "swapOwner(address,address,address)",
            Self::ChangeThreshold => "changeThreshold(uint256)",
            Self::SetFallbackHandler => "setFallbackHandler(address)",
            Self::GetOwners => "getOwners()",
            Self::IsOwner => "isOwner(address)",
            Self::GetThreshold => "getThreshold()",
            Self::IsNonceUsed => "isNonceUsed(uint256)",
            Self::SignedMessages => "signedMessages(bytes32)",
            Self::DomainSeparator => "domainSeparator()",
            Self::GetTransactionHash => "getTransactionHash(address,uint256,bytes,uint8,uint256)",
            Self::GetMessageHash => "getMessageHash(bytes)",
            Self::CheckSignatures => "checkSignatures(bytes32,bytes)",
            Self::IsValidSignature => "isValidSignature(bytes32,bytes)",
            Self::GetStorageAt => "getStorageAt(uint256,uint256)",
            Self::SimulateAndRevert => "simulateAndRevert(address,bytes)",
        }
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(WalletFunction)
    }
}

// =============================================================================
// CALLDATA BUILDERS
// =============================================================================

/// Calldata for `initialize`.
#[must_use]
pub fn encode_initialize(owners: &[Address], threshold: U256, fallback_handler: Address) -> Bytes {
    WalletFunction::Initialize.encode(&[
        Token::AddressArray(owners.to_vec()),
        Token::Uint(threshold),
        Token::Address(fallback_handler),
    ])
}

fn operation_tokens(op: &Operation) -> Vec<Token> {
    vec![
        Token::Address(op.destination),
        Token::Uint(op.value),
        Token::Bytes(op.data.as_slice().to_vec()),
        Token::Uint(U256::from(op.operation.as_u8())),
        Token::Uint(op.nonce),
    ]
}

/// Calldata for `batchSignature`.
#[must_use]
pub fn encode_batch_signature(op: &Operation, signatures: &[u8]) -> Bytes {
    let mut tokens = operation_tokens(op);
    tokens.push(Token::Bytes(signatures.to_vec()));
    WalletFunction::BatchSignature.encode(&tokens)
}

/// Calldata for `getTransactionHash`.
#[must_use]
pub fn encode_get_transaction_hash(op: &Operation) -> Bytes {
    WalletFunction::GetTransactionHash.encode(&operation_tokens(op))
}

fn decode_operation(decoder: &mut AbiDecoder<'_>) -> Result<Operation, WalletError> {
    let destination = decoder.address()?;
    let value = decoder.uint()?;
    let data = Bytes::from_vec(decoder.bytes()?);
    let operation = ExecutionMode::try_from(decoder.uint8()?)?;
    let nonce = decoder.uint()?;
    Ok(Operation {
        destination,
        value,
        data,
        operation,
        nonce,
    })
}

// =============================================================================
// CONTRACT
// =============================================================================

/// Wallet singleton code.
#[derive(Debug, Clone)]
pub struct MultiSigWallet {
    config: WalletConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl Default for MultiSigWallet {
    fn default() -> Self {
        Self::new(WalletConfig::default(), Arc::new(EcrecoverVerifier))
    }
}

impl MultiSigWallet {
    /// Wallet code with the given policy and signature backend.
    #[must_use]
    pub fn new(config: WalletConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { config, verifier }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    fn checker(&self) -> SignatureChecker<'_> {
        SignatureChecker::new(self.verifier.as_ref(), self.config.max_validation_depth)
    }

    fn hasher(ctx: &CallContext<'_>) -> TypedDataHasher {
        TypedDataHasher::new(ctx.chain_id(), ctx.address())
    }

    fn threshold(ctx: &CallContext<'_>) -> U256 {
        ctx.sload(THRESHOLD_SLOT).to_u256()
    }

    fn only_self(ctx: &CallContext<'_>) -> Result<(), WalletError> {
        if ctx.caller() == ctx.address() {
            Ok(())
        } else {
            Err(AuthorizationError::NotSelf.into())
        }
    }

    fn emit_all(ctx: &mut CallContext<'_>, events: Vec<WalletEvent>) -> Result<(), WalletError> {
        for event in events {
            ctx.emit(event)?;
        }
        Ok(())
    }

    // =========================================================================
    // Setup and execution
    // =========================================================================

    fn initialize(
        ctx: &mut CallContext<'_>,
        owners: &[Address],
        threshold: U256,
        fallback_handler: Address,
    ) -> Result<Bytes, WalletError> {
        let account = ctx.address();
        OwnerRegistry::new(ctx, account).setup(owners, threshold)?;
        if !fallback_handler.is_zero() {
            Self::write_fallback_handler(ctx, fallback_handler)?;
        }
        ctx.emit(WalletEvent::WalletSetup {
            initiator: ctx.caller(),
            owners: owners.to_vec(),
            threshold,
            fallback_handler,
        })?;
        info!(%account, owners = owners.len(), %threshold, "wallet initialized");
        Ok(Bytes::new())
    }

    fn batch_signature(
        &self,
        ctx: &mut CallContext<'_>,
        op: &Operation,
        signatures: &[u8],
    ) -> Result<Bytes, WalletError> {
        if !ctx.sload(nonce_slot(op.nonce)).is_zero() {
            return Err(StateError::NonceAlreadyUsed(op.nonce).into());
        }

        let tx_hash = Self::hasher(ctx).transaction_hash(op);
        let threshold = Self::threshold(ctx);
        self.checker().check_signatures(ctx, tx_hash, signatures, threshold)?;

        // Consumed before the call so the call cannot replay it.
        ctx.sstore(nonce_slot(op.nonce), StorageValue::ONE)?;
        ctx.sstore(executed_tx_slot(tx_hash), StorageValue::ONE)?;
        debug!(%tx_hash, nonce = %op.nonce, mode = ?op.operation, "operation authorized");

        let result = match op.operation {
            ExecutionMode::Call => ctx.call(op.destination, op.value, op.data.as_slice()),
            ExecutionMode::DelegateCall => ctx.delegate_call(op.destination, op.data.as_slice()),
        };

        match result {
            Ok(_) => {
                ctx.emit(WalletEvent::ExecutionSuccess { tx_hash })?;
                info!(%tx_hash, destination = %op.destination, "operation executed");
                Ok(returns(&[Token::Bool(true)]))
            }
            Err(err) => match self.config.replay_policy {
                ReplayPolicy::RevertAll => {
                    warn!(%tx_hash, error = %err, "operation failed, reverting");
                    Err(ExecutionError::call_failed(err).into())
                }
                ReplayPolicy::ConsumeNonce => {
                    warn!(%tx_hash, error = %err, "operation failed, nonce consumed");
                    ctx.emit(WalletEvent::ExecutionFailure {
                        tx_hash,
                        reason: err.to_string(),
                    })?;
                    Ok(returns(&[Token::Bool(false)]))
                }
            },
        }
    }

    // =========================================================================
    // Self-management
    // =========================================================================

    fn manage_owners(
        ctx: &mut CallContext<'_>,
        function: WalletFunction,
        args: &[u8],
    ) -> Result<Bytes, WalletError> {
        Self::only_self(ctx)?;
        let mut decoder = AbiDecoder::new(args);
        let account = ctx.address();

        let events = match function {
            WalletFunction::AddOwnerWithThreshold => {
                let owner = decoder.address()?;
                let threshold = decoder.uint()?;
                OwnerRegistry::new(ctx, account).add_owner(owner, threshold)?
            }
            WalletFunction::RemoveOwner => {
                let prev = decoder.address()?;
                let owner = decoder.address()?;
                let threshold = decoder.uint()?;
                OwnerRegistry::new(ctx, account).remove_owner(prev, owner, threshold)?
            }
            WalletFunction::SwapOwner => {
                let prev = decoder.address()?;
                let old = decoder.address()?;
                let new = decoder.address()?;
                OwnerRegistry::new(ctx, account).swap_owner(prev, old, new)?
            }
            WalletFunction::ChangeThreshold => {
                let threshold = decoder.uint()?;
                OwnerRegistry::new(ctx, account).change_threshold(threshold)?
            }
            WalletFunction::SetFallbackHandler => {
                Self::write_fallback_handler(ctx, decoder.address()?)?;
                Vec::new()
            }
            _ => return Err(ValidationError::UnknownSelector(function.selector().0).into()),
        };

        debug!(%account, ?function, "owner configuration changed");
        Self::emit_all(ctx, events)?;
        Ok(Bytes::new())
    }

    fn write_fallback_handler(ctx: &mut CallContext<'_>, handler: Address) -> Result<(), WalletError> {
        if handler == ctx.address() {
            return Err(ValidationError::InvalidFallbackHandler.into());
        }
        ctx.sstore(FALLBACK_HANDLER_SLOT, StorageValue::from_address(handler))?;
        ctx.emit(WalletEvent::ChangedFallbackHandler { handler })
    }

    // =========================================================================
    // Signature checks
    // =========================================================================

    fn is_valid_signature(
        &self,
        ctx: &mut CallContext<'_>,
        hash: Hash,
        signature: &[u8],
    ) -> Result<Bytes, WalletError> {
        let message_hash = Self::hasher(ctx).message_hash(&encode(&[Token::FixedBytes(hash)]));
        if signature.is_empty() {
            if ctx.sload(signed_message_slot(message_hash)).is_zero() {
                return Err(AuthorizationError::HashNotApproved.into());
            }
        } else {
            let threshold = Self::threshold(ctx);
            self.checker().check_signatures(ctx, message_hash, signature, threshold)?;
        }
        Ok(Bytes::from_vec(Selector(EIP1271_MAGIC_VALUE).to_word().to_vec()))
    }

    fn get_storage_at(ctx: &CallContext<'_>, offset: U256, length: U256) -> Result<Bytes, WalletError> {
        let length = usize::try_from(length)
            .ok()
            .filter(|words| *words <= MAX_STORAGE_WINDOW)
            .ok_or(ValidationError::MalformedCalldata("storage window too large"))?;

        let mut out = Vec::with_capacity(length * 32);
        for i in 0..length {
            let (slot, _) = offset.overflowing_add(U256::from(i));
            out.extend_from_slice(ctx.sload(StorageKey::from_u256(slot)).as_bytes());
        }
        Ok(returns(&[Token::Bytes(out)]))
    }

    /// Delegate-calls `target` with the wallet's storage, then fails with the
    /// outcome so every effect is rolled back.
    fn simulate_and_revert(ctx: &mut CallContext<'_>, target: Address, payload: &[u8]) -> Result<Bytes, WalletError> {
        let outcome = ctx.delegate_call(target, payload);
        debug!(%target, success = outcome.is_ok(), "simulation finished");
        Err(ExecutionError::Simulated(Box::new(outcome)).into())
    }

    // =========================================================================
    // Receive and fallback
    // =========================================================================

    fn receive(ctx: &mut CallContext<'_>) -> Result<Bytes, WalletError> {
        ctx.emit(WalletEvent::ReceivedValue {
            sender: ctx.caller(),
            value: ctx.value(),
        })?;
        Ok(Bytes::new())
    }

    fn fallback(ctx: &mut CallContext<'_>, sel: Selector, input: &[u8]) -> Result<Bytes, WalletError> {
        let handler = ctx.sload(FALLBACK_HANDLER_SLOT).to_address();
        if handler.is_zero() {
            return Err(ValidationError::UnknownSelector(sel.0).into());
        }
        let mut data = input.to_vec();
        data.extend_from_slice(ctx.caller().as_bytes());
        debug!(%handler, selector = ?sel, "forwarding to fallback handler");
        ctx.call(handler, U256::zero(), &data)
    }
}

impl Contract for MultiSigWallet {
    fn name(&self) -> &'static str {
        "MultiSigWallet"
    }

    /// Locks the singleton's own storage so it can never be initialized.
    fn construct(&self, ctx: &mut CallContext<'_>) -> Result<(), WalletError> {
        ctx.sstore(THRESHOLD_SLOT, StorageValue::from_u256(U256::one()))
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        if input.is_empty() {
            return Self::receive(ctx);
        }
        if input.len() < 4 {
            return Self::fallback(ctx, Selector::leading(input), input);
        }
        let (sel, args) = split_selector(input)?;
        let Some(function) = WalletFunction::from_selector(sel) else {
            return Self::fallback(ctx, sel, input);
        };
        let mut decoder = AbiDecoder::new(args);

        match function {
            WalletFunction::Initialize => {
                let owners = decoder.address_array()?;
                let threshold = decoder.uint()?;
                let handler = decoder.address()?;
                Self::initialize(ctx, &owners, threshold, handler)
            }
            WalletFunction::BatchSignature => {
                let op = decode_operation(&mut decoder)?;
                let signatures = decoder.bytes()?;
                self.batch_signature(ctx, &op, &signatures)
            }
            WalletFunction::AddOwnerWithThreshold
            | WalletFunction::RemoveOwner
            | WalletFunction::SwapOwner
            | WalletFunction::ChangeThreshold
            | WalletFunction::SetFallbackHandler => Self::manage_owners(ctx, function, args),
            WalletFunction::GetOwners => {
                let account = ctx.address();
                let owners = OwnerRegistry::new(ctx, account).owners();
                Ok(returns(&[Token::AddressArray(owners)]))
            }
            WalletFunction::IsOwner => {
                let candidate = decoder.address()?;
                let account = ctx.address();
                let is_owner = OwnerRegistry::new(ctx, account).is_owner(candidate);
                Ok(returns(&[Token::Bool(is_owner)]))
            }
            WalletFunction::GetThreshold => Ok(returns(&[Token::Uint(Self::threshold(ctx))])),
            WalletFunction::IsNonceUsed => {
                let nonce = decoder.uint()?;
                Ok(returns(&[Token::Bool(!ctx.sload(nonce_slot(nonce)).is_zero())]))
            }
            WalletFunction::SignedMessages => {
                let message_hash = decoder.fixed_bytes()?;
                let state = ctx.sload(signed_message_slot(message_hash)).to_u256();
                Ok(returns(&[Token::Uint(state)]))
            }
            WalletFunction::DomainSeparator => {
                Ok(returns(&[Token::FixedBytes(Self::hasher(ctx).domain_separator())]))
            }
            WalletFunction::GetTransactionHash => {
                let op = decode_operation(&mut decoder)?;
                Ok(returns(&[Token::FixedBytes(Self::hasher(ctx).transaction_hash(&op))]))
            }
            WalletFunction::GetMessageHash => {
                let message = decoder.bytes()?;
                Ok(returns(&[Token::FixedBytes(Self::hasher(ctx).message_hash(&message))]))
            }
            WalletFunction::CheckSignatures => {
                let data_hash = decoder.fixed_bytes()?;
                let signatures = decoder.bytes()?;
                let threshold = Self::threshold(ctx);
                self.checker().check_signatures(ctx, data_hash, &signatures, threshold)?;
                Ok(Bytes::new())
            }
            WalletFunction::IsValidSignature => {
                let hash = decoder.fixed_bytes()?;
                let signature = decoder.bytes()?;
                self.is_valid_signature(ctx, hash, &signature)
            }
            WalletFunction::GetStorageAt => {
                let offset = decoder.uint()?;
                let length = decoder.uint()?;
                Self::get_storage_at(ctx, offset, length)
            }
            WalletFunction::SimulateAndRevert => {
                let target = decoder.address()?;
                let payload = decoder.bytes()?;
                Self::simulate_and_revert(ctx, target, &payload)
            }
        }
    }
}
