//! # Owner Registry
//!
//! Owners form one cycle of `owners[a] = next` links starting and ending at
//! `SENTINEL_OWNERS`:
//!
//! ```text
//! SENTINEL -> o1 -> o2 -> ... -> on -> SENTINEL
//! ```
//!
//! `is_owner`, add, remove and swap are O(1) given the predecessor. Every
//! mutator validates all of its inputs before the first write.

use crate::domain::entities::SENTINEL_OWNERS;
use crate::domain::layout::{owner_slot, OWNER_COUNT_SLOT, THRESHOLD_SLOT};
use crate::domain::value_objects::{Address, StorageValue, U256};
use crate::errors::{StateError, ValidationError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::SlotStore;
use std::collections::HashSet;

/// Owner list and threshold of one account.
pub struct OwnerRegistry<'s, S: SlotStore + ?Sized> {
    store: &'s mut S,
    account: Address,
}

impl<'s, S: SlotStore + ?Sized> OwnerRegistry<'s, S> {
    /// Registry over `account`'s storage.
    pub fn new(store: &'s mut S, account: Address) -> Self {
        Self { store, account }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    fn next(&self, owner: Address) -> Address {
        self.store.load(owner_slot(owner)).to_address()
    }

    /// Current threshold (zero before `setup`).
    #[must_use]
    pub fn threshold(&self) -> U256 {
        self.store.load(THRESHOLD_SLOT).to_u256()
    }

    /// Number of owners.
    #[must_use]
    pub fn owner_count(&self) -> U256 {
        self.store.load(OWNER_COUNT_SLOT).to_u256()
    }

    /// True if `address` is a current owner.
    #[must_use]
    pub fn is_owner(&self, address: Address) -> bool {
        address != SENTINEL_OWNERS && !self.next(address).is_zero()
    }

    /// Owners in list order (most recently added first).
    #[must_use]
    pub fn owners(&self) -> Vec<Address> {
        let count = self.owner_count().low_u64();
        let mut owners = Vec::new();
        let mut current = self.next(SENTINEL_OWNERS);
        while current != SENTINEL_OWNERS && !current.is_zero() && (owners.len() as u64) < count {
            owners.push(current);
            current = self.next(current);
        }
        owners
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// One-time initialization; `getOwners()` returns `owners` in input order.
    ///
    /// # Errors
    /// - `AlreadyInitialized` if a threshold is already set
    /// - `InvalidThreshold` unless `1 <= threshold <= owners.len()`
    /// - `InvalidOwnerAddress` / `DuplicateOwner` for bad entries
    pub fn setup(&mut self, owners: &[Address], threshold: U256) -> Result<(), WalletError> {
        if !self.threshold().is_zero() {
            return Err(StateError::AlreadyInitialized.into());
        }
        Self::check_threshold(threshold, U256::from(owners.len()))?;

        let mut seen = HashSet::with_capacity(owners.len());
        for &owner in owners {
            self.check_new_owner_address(owner)?;
            if !seen.insert(owner) {
                return Err(StateError::DuplicateOwner(owner).into());
            }
        }

        let mut current = SENTINEL_OWNERS;
        for &owner in owners {
            self.set_next(current, owner)?;
            current = owner;
        }
        self.set_next(current, SENTINEL_OWNERS)?;
        self.store.store(OWNER_COUNT_SLOT, StorageValue::from(U256::from(owners.len())))?;
        self.store.store(THRESHOLD_SLOT, StorageValue::from(threshold))?;
        Ok(())
    }

    /// Inserts `owner` right after the sentinel and sets the threshold.
    ///
    /// # Errors
    /// - `InvalidOwnerAddress` for zero, sentinel or the account itself
    /// - `DuplicateOwner` if already present
    /// - `InvalidThreshold` unless `1 <= threshold <= count + 1`
    pub fn add_owner(&mut self, owner: Address, threshold: U256) -> Result<Vec<WalletEvent>, WalletError> {
        self.check_new_owner_address(owner)?;
        if self.is_owner(owner) {
            return Err(StateError::DuplicateOwner(owner).into());
        }
        let new_count = self.owner_count() + 1;
        Self::check_threshold(threshold, new_count)?;

        let head = self.next(SENTINEL_OWNERS);
        self.set_next(owner, head)?;
        self.set_next(SENTINEL_OWNERS, owner)?;
        self.store.store(OWNER_COUNT_SLOT, StorageValue::from(new_count))?;

        let mut events = vec![WalletEvent::AddedOwner { owner }];
        events.extend(self.write_threshold(threshold)?);
        Ok(events)
    }

    /// Unlinks `owner`, whose predecessor must be `prev`.
    ///
    /// # Errors
    /// - `InvalidThreshold` unless `1 <= threshold <= count - 1`
    /// - `InvalidOwnerAddress` for zero or sentinel
    /// - `InvalidPrevOwner` unless `owners[prev] == owner`
    pub fn remove_owner(
        &mut self,
        prev: Address,
        owner: Address,
        threshold: U256,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        let count = self.owner_count();
        if count.is_zero() {
            return Err(StateError::NotInitialized.into());
        }
        let new_count = count - 1;
        Self::check_threshold(threshold, new_count)?;
        self.check_link(prev, owner)?;

        let after = self.next(owner);
        self.set_next(prev, after)?;
        self.set_next(owner, Address::ZERO)?;
        self.store.store(OWNER_COUNT_SLOT, StorageValue::from(new_count))?;

        let mut events = vec![WalletEvent::RemovedOwner { owner }];
        events.extend(self.write_threshold(threshold)?);
        Ok(events)
    }

    /// Replaces `old` (predecessor `prev`) with `new` in place.
    ///
    /// # Errors
    /// - `InvalidOwnerAddress` for a bad `new` or `old`
    /// - `DuplicateOwner` if `new` is already an owner
    /// - `InvalidPrevOwner` unless `owners[prev] == old`
    pub fn swap_owner(
        &mut self,
        prev: Address,
        old: Address,
        new: Address,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        self.check_new_owner_address(new)?;
        if self.is_owner(new) {
            return Err(StateError::DuplicateOwner(new).into());
        }
        self.check_link(prev, old)?;

        let after = self.next(old);
        self.set_next(new, after)?;
        self.set_next(prev, new)?;
        self.set_next(old, Address::ZERO)?;

        Ok(vec![
            WalletEvent::RemovedOwner { owner: old },
            WalletEvent::AddedOwner { owner: new },
        ])
    }

    /// Sets the threshold.
    ///
    /// # Errors
    /// `InvalidThreshold` unless `1 <= threshold <= count`.
    pub fn change_threshold(&mut self, threshold: U256) -> Result<Vec<WalletEvent>, WalletError> {
        Self::check_threshold(threshold, self.owner_count())?;
        self.store.store(THRESHOLD_SLOT, StorageValue::from(threshold))?;
        Ok(vec![WalletEvent::ChangedThreshold { threshold }])
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn set_next(&mut self, owner: Address, next: Address) -> Result<(), WalletError> {
        self.store.store(owner_slot(owner), StorageValue::from_address(next))
    }

    fn write_threshold(&mut self, threshold: U256) -> Result<Vec<WalletEvent>, WalletError> {
        if self.threshold() == threshold {
            return Ok(Vec::new());
        }
        self.change_threshold(threshold)
    }

    fn check_threshold(threshold: U256, owner_count: U256) -> Result<(), WalletError> {
        if threshold.is_zero() || threshold > owner_count {
            return Err(ValidationError::InvalidThreshold {
                threshold,
                owner_count,
            }
            .into());
        }
        Ok(())
    }

    fn check_new_owner_address(&self, owner: Address) -> Result<(), WalletError> {
        if owner.is_zero() || owner == SENTINEL_OWNERS || owner == self.account {
            return Err(ValidationError::InvalidOwnerAddress(owner).into());
        }
        Ok(())
    }

    fn check_link(&self, prev: Address, owner: Address) -> Result<(), WalletError> {
        if owner.is_zero() || owner == SENTINEL_OWNERS {
            return Err(ValidationError::InvalidOwnerAddress(owner).into());
        }
        if self.next(prev) != owner {
            return Err(ValidationError::InvalidPrevOwner { prev, owner }.into());
        }
        Ok(())
    }
}
