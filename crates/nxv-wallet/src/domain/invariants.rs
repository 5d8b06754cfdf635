//! # Domain Invariants
//!
//! Structural checks over a wallet's stored owner set:
//!
//! - the owner links form exactly one cycle through the sentinel
//! - no link is zero and no owner appears twice
//! - the number of owners on the cycle equals `ownerCount`
//! - `1 <= threshold <= ownerCount` once initialized
//!
//! Used by tests and by `WalletService::verify_invariants` after each
//! operation in debug builds.

use crate::domain::entities::SENTINEL_OWNERS;
use crate::domain::layout::{owner_slot, OWNER_COUNT_SLOT, THRESHOLD_SLOT};
use crate::domain::value_objects::{Address, U256};
use crate::ports::outbound::SlotStore;
use std::collections::HashSet;
use std::fmt;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Walks the owner cycle and reports every violated invariant.
#[must_use]
pub fn check_owner_invariants<S: SlotStore + ?Sized>(store: &S) -> InvariantCheckResult {
    let count = store.load(OWNER_COUNT_SLOT).to_u256();
    let threshold = store.load(THRESHOLD_SLOT).to_u256();

    // Uninitialized account: nothing may be linked from the sentinel.
    if threshold.is_zero() && count.is_zero() {
        let head = store.load(owner_slot(SENTINEL_OWNERS)).to_address();
        return if head.is_zero() {
            InvariantCheckResult::Valid
        } else {
            InvariantCheckResult::Invalid(vec![InvariantViolation::BrokenCycle { at: SENTINEL_OWNERS }])
        };
    }

    let mut violations = Vec::new();
    let limit = count.saturating_add(U256::one());
    let mut visited: HashSet<Address> = HashSet::new();
    let mut current = SENTINEL_OWNERS;
    let mut steps = U256::zero();

    loop {
        let next = store.load(owner_slot(current)).to_address();
        steps += U256::one();
        if next.is_zero() {
            violations.push(InvariantViolation::BrokenCycle { at: current });
            break;
        }
        if next == SENTINEL_OWNERS {
            break;
        }
        if !visited.insert(next) {
            violations.push(InvariantViolation::RepeatedOwner(next));
            break;
        }
        if steps > limit {
            violations.push(InvariantViolation::BrokenCycle { at: next });
            break;
        }
        current = next;
    }

    let walked = U256::from(visited.len());
    if violations.is_empty() && walked != count {
        violations.push(InvariantViolation::CountMismatch { stored: count, walked });
    }
    if threshold.is_zero() || threshold > count {
        violations.push(InvariantViolation::ThresholdOutOfRange { threshold, count });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The walk hit a zero link or never returned to the sentinel.
    BrokenCycle { at: Address },
    /// An owner was reached twice.
    RepeatedOwner(Address),
    /// `ownerCount` disagrees with the cycle length.
    CountMismatch { stored: U256, walked: U256 },
    /// Threshold outside `1..=ownerCount`.
    ThresholdOutOfRange { threshold: U256, count: U256 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokenCycle { at } => write!(f, "owner cycle broken at {at}"),
            Self::RepeatedOwner(owner) => write!(f, "owner {owner} linked twice"),
            Self::CountMismatch { stored, walked } => {
                write!(f, "owner count {stored} but cycle holds {walked}")
            }
            Self::ThresholdOutOfRange { threshold, count } => {
                write!(f, "threshold {threshold} outside 1..={count}")
            }
        }
    }
}
