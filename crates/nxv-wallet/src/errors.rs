//! # Error Types
//!
//! Every wallet failure is a `WalletError`, split into four categories.
//!
//! | Category | Meaning | Effect |
//! |----------|---------|--------|
//! | `Validation` | malformed input, forbidden addresses | no mutation |
//! | `Authorization` | signatures or caller not allowed | no mutation |
//! | `State` | nonce replay, double init, invariant breach | no mutation |
//! | `Execution` | the authorized inner call failed | depends on `ReplayPolicy` |
//!
//! Host frames that return an error roll back everything they wrote, so an
//! error surfacing from a top-level transaction leaves storage untouched.

use crate::domain::value_objects::{Address, Bytes, U256};
use thiserror::Error;

// =============================================================================
// TOP-LEVEL ERROR
// =============================================================================

/// Any failure raised while executing wallet code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed shapes and forbidden values.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Signature or caller checks failed.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// State preconditions failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The authorized call itself failed.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl WalletError {
    /// Short category label, used in logs and service statistics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authorization(_) => "authorization",
            Self::State(_) => "state",
            Self::Execution(_) => "execution",
        }
    }

    /// Returns true for authorization failures.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// Unwraps nested `call-failed` layers down to the error that started it.
    #[must_use]
    pub fn root_cause(&self) -> &WalletError {
        match self {
            Self::Execution(ExecutionError::CallFailed(inner)) => inner.root_cause(),
            other => other,
        }
    }
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// Malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Calldata could not be decoded.
    #[error("malformed calldata: {0}")]
    MalformedCalldata(&'static str),

    /// Calldata is shorter than a selector, or the selector is unknown.
    #[error("unknown function selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    /// Signature blob is not well formed.
    #[error("malformed signatures: {0}")]
    MalformedSignatures(&'static str),

    /// Packed batch payload is not well formed.
    #[error("malformed batch: {0}")]
    MalformedBatch(&'static str),

    /// Execution mode byte is neither call (0) nor delegate call (1).
    #[error("unknown operation type: {0}")]
    UnknownOperation(u8),

    /// Owner address is zero, the sentinel, or the account itself.
    #[error("invalid owner address: {0}")]
    InvalidOwnerAddress(Address),

    /// `prev` does not point at `owner` in the owner list.
    #[error("invalid prev owner {prev} for owner {owner}")]
    InvalidPrevOwner {
        /// Claimed predecessor.
        prev: Address,
        /// Owner being removed or swapped.
        owner: Address,
    },

    /// Threshold out of range for the owner count.
    #[error("threshold {threshold} out of range for {owner_count} owners")]
    InvalidThreshold {
        /// Requested threshold.
        threshold: U256,
        /// Owner count the threshold is checked against.
        owner_count: U256,
    },

    /// Fallback handler cannot be the account itself.
    #[error("fallback handler cannot be the account itself")]
    InvalidFallbackHandler,

    /// The given address has no executable code.
    #[error("{0} not deployed")]
    NotDeployed(&'static str),
}

// =============================================================================
// AUTHORIZATION ERRORS
// =============================================================================

/// Signature and caller checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Self-management entry point reached by someone other than the account.
    #[error("Only be called from this contract")]
    NotSelf,

    /// Library entry point invoked directly instead of via delegate call.
    #[error("{0} should only be called via delegatecall")]
    DelegateCallRequired(&'static str),

    /// Fewer signature records than the threshold.
    #[error("signatures too short: {required} required, {provided} provided")]
    SignaturesTooShort {
        /// Threshold to satisfy.
        required: usize,
        /// Whole records present in the blob.
        provided: usize,
    },

    /// Signers are not strictly ascending (duplicate or out of order).
    #[error("signer {signer} is not greater than previous signer {previous}")]
    SignersNotAscending {
        /// Signer at the failing position.
        signer: Address,
        /// Signer before it.
        previous: Address,
    },

    /// Recovered or claimed signer is not an owner.
    #[error("signer {0} is not an owner")]
    NotOwner(Address),

    /// ECDSA recovery failed.
    #[error("invalid signature at index {index}: {reason}")]
    InvalidSignature {
        /// Position in the blob.
        index: usize,
        /// Underlying recovery failure.
        reason: String,
    },

    /// Delegated signer reverted or did not return the magic value.
    #[error("contract signature rejected by {0}")]
    ContractSignatureRejected(Address),

    /// Nested delegated validation went too deep.
    #[error("signature validation depth exceeded at frame {depth}")]
    ValidationDepthExceeded {
        /// Call depth at which validation was refused.
        depth: u16,
    },

    /// Empty signature given for a message that was never approved.
    #[error("Hash not approved")]
    HashNotApproved,
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// State preconditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Nonce was already used by an executed operation.
    #[error("nonce {0} already used")]
    NonceAlreadyUsed(U256),

    /// `initialize` called on an account that already has a threshold.
    #[error("Owners have already been setup")]
    AlreadyInitialized,

    /// Operation submitted to an account with no threshold.
    #[error("Threshold needs to be defined")]
    NotInitialized,

    /// Owner is already a member.
    #[error("owner {0} already exists")]
    DuplicateOwner(Address),

    /// Persisted data contradicts an invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// CREATE2 target already has code.
    #[error("Create2 call failed: address {0} already in use")]
    AddressCollision(Address),

    /// Write attempted inside a static call.
    #[error("write operation in static context")]
    WriteInStaticContext,

    /// Migration invoked on an account running a different implementation.
    #[error("unexpected implementation {found}, expected {expected}")]
    UnexpectedImplementation {
        /// Implementation the migration was built for.
        expected: Address,
        /// Implementation found in slot 0.
        found: Address,
    },
}

// =============================================================================
// EXECUTION ERRORS
// =============================================================================

/// Failures of the authorized call itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Inner call failed; carries the inner error as diagnostic data.
    #[error("call-failed: {0}")]
    CallFailed(Box<WalletError>),

    /// Value transfer exceeds the sender's balance.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Value requested.
        required: U256,
        /// Balance available.
        available: U256,
    },

    /// Call depth exceeded maximum.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth of the refused frame.
        depth: u16,
        /// Configured maximum.
        max: u16,
    },

    /// Explicit revert with a reason string.
    #[error("revert: {0}")]
    Reverted(String),

    /// `simulateAndRevert` finished; carries the simulated call's outcome
    /// out of the frame it rolls back.
    #[error("simulation finished")]
    Simulated(Box<Result<Bytes, WalletError>>),
}

impl ExecutionError {
    /// Wraps an inner failure as `call-failed`.
    #[must_use]
    pub fn call_failed(inner: WalletError) -> Self {
        Self::CallFailed(Box::new(inner))
    }
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Configuration parsing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable holds an unparsable value.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Value parses but exceeds the supported maximum.
    #[error("{key}={value} exceeds the maximum of {max}")]
    OutOfRange {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Largest accepted value.
        max: u64,
    },
}
