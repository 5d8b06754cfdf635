//! # In-Memory Host
//!
//! Reference `ExecutionHost`: accounts with balances, creation nonces,
//! storage and installed code, an append-only log, and a journal of every
//! change made during the current transaction.
//!
//! Programs that contracts may create at runtime (`CreateCall`) are
//! registered up front under the hash of their init code.
//!
//! Each `execute` records a checkpoint (journal length) and, if the frame
//! fails, undoes every entry above it. Nested frames therefore revert
//! independently, and a failing top-level transaction leaves nothing behind.

use crate::config::{HostConfig, MAX_CALL_DEPTH};
use crate::domain::entities::Log;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::{ExecutionError, StateError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::{Contract, ExecutionHost, SlotStore};
use crate::vm::{CallContext, CallKind, Frame, Message};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct Account {
    balance: U256,
    nonce: u64,
    code: Option<Arc<dyn Contract>>,
    storage: HashMap<StorageKey, StorageValue>,
}

#[derive(Debug)]
enum JournalEntry {
    Storage {
        address: Address,
        key: StorageKey,
        previous: StorageValue,
    },
    Balance {
        address: Address,
        previous: U256,
    },
    Nonce {
        address: Address,
        previous: u64,
    },
    Code {
        address: Address,
    },
    Log,
}

/// Storage of one account seen from outside execution. Writes are refused.
#[derive(Debug, Clone, Copy)]
pub struct AccountView<'h> {
    host: &'h InMemoryHost,
    address: Address,
}

impl SlotStore for AccountView<'_> {
    fn load(&self, key: StorageKey) -> StorageValue {
        self.host.storage(self.address, key)
    }

    fn store(&mut self, _key: StorageKey, _value: StorageValue) -> Result<(), WalletError> {
        Err(StateError::WriteInStaticContext.into())
    }
}

/// Journaled in-memory world state.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    config: HostConfig,
    accounts: HashMap<Address, Account>,
    programs: HashMap<Hash, Arc<dyn Contract>>,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
}

impl InMemoryHost {
    /// Empty world. A `max_call_depth` above [`MAX_CALL_DEPTH`] is clamped.
    #[must_use]
    pub fn new(mut config: HostConfig) -> Self {
        if config.max_call_depth > MAX_CALL_DEPTH {
            warn!(
                requested = config.max_call_depth,
                max = MAX_CALL_DEPTH,
                "clamping call depth"
            );
            config.max_call_depth = MAX_CALL_DEPTH;
        }
        Self {
            config,
            ..Self::default()
        }
    }

    /// Host parameters.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Sets a balance outside of any transaction.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Installs code outside of any transaction, replacing what was there.
    pub fn install(&mut self, address: Address, code: Arc<dyn Contract>) {
        debug!(%address, contract = code.name(), "installing code");
        self.accounts.entry(address).or_default().code = Some(code);
    }

    /// Registers the program that `init_code` deploys. Returns the init code hash.
    pub fn register_program(&mut self, init_code: &[u8], code: Arc<dyn Contract>) -> Hash {
        let hash = keccak256(init_code);
        debug!(%hash, contract = code.name(), "registering program");
        self.programs.insert(hash, code);
        hash
    }

    /// Runs a top-level transaction. On error the world is unchanged.
    ///
    /// # Errors
    /// Whatever the called code raised.
    pub fn transact(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        input: Bytes,
    ) -> Result<Bytes, WalletError> {
        let result = self.execute(Message::transaction(from, to, value, input));
        self.journal.clear();
        result
    }

    /// Deploys `code` at `address` from a top-level transaction sent by `from`.
    ///
    /// # Errors
    /// `AddressCollision`, or whatever the constructor raised.
    pub fn create(&mut self, from: Address, address: Address, code: Arc<dyn Contract>) -> Result<(), WalletError> {
        let result = self.deploy(from, address, code, U256::zero(), 0);
        self.journal.clear();
        result
    }

    /// Deploys every `(address, code)` pair from one top-level transaction.
    /// If any deployment fails, none of them remain.
    ///
    /// # Errors
    /// The first `AddressCollision` or constructor failure.
    pub fn create_all(
        &mut self,
        from: Address,
        codes: impl IntoIterator<Item = (Address, Arc<dyn Contract>)>,
    ) -> Result<(), WalletError> {
        let checkpoint = self.journal.len();
        let mut result = Ok(());
        for (address, code) in codes {
            let name = code.name();
            result = self.deploy(from, address, code, U256::zero(), 0);
            if result.is_err() {
                self.revert_to(checkpoint);
                break;
            }
            debug!(name, %address, "deployed");
        }
        self.journal.clear();
        result
    }

    /// Runs a read-only top-level call.
    ///
    /// # Errors
    /// Whatever the called code raised, including attempted writes.
    pub fn query(&mut self, from: Address, to: Address, input: Bytes) -> Result<Bytes, WalletError> {
        let result = self.execute(Message::query(from, to, input));
        self.journal.clear();
        result
    }

    /// Every log emitted so far.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Events emitted by `address`, oldest first.
    #[must_use]
    pub fn events_of(&self, address: Address) -> Vec<&WalletEvent> {
        self.logs
            .iter()
            .filter(|log| log.address == address)
            .map(|log| &log.event)
            .collect()
    }

    /// Non-zero storage of `address`, ordered by slot.
    #[must_use]
    pub fn storage_snapshot(&self, address: Address) -> BTreeMap<StorageKey, StorageValue> {
        self.accounts
            .get(&address)
            .map(|account| {
                account
                    .storage
                    .iter()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(key, value)| (*key, *value))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read-only slot view of `address`, usable outside any frame.
    #[must_use]
    pub fn account_view(&self, address: Address) -> AccountView<'_> {
        AccountView { host: self, address }
    }

    /// Name of the contract installed at `address`.
    #[must_use]
    pub fn code_name(&self, address: Address) -> Option<&'static str> {
        self.accounts
            .get(&address)
            .and_then(|account| account.code.as_ref())
            .map(|code| code.name())
    }

    fn code_at(&self, address: Address) -> Option<Arc<dyn Contract>> {
        self.accounts.get(&address).and_then(|account| account.code.clone())
    }

    fn write_balance(&mut self, address: Address, balance: U256) {
        let account = self.accounts.entry(address).or_default();
        self.journal.push(JournalEntry::Balance {
            address,
            previous: account.balance,
        });
        account.balance = balance;
    }

    fn write_nonce(&mut self, address: Address, nonce: u64) {
        let account = self.accounts.entry(address).or_default();
        self.journal.push(JournalEntry::Nonce {
            address,
            previous: account.nonce,
        });
        account.nonce = nonce;
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), WalletError> {
        let available = self.balance(from);
        if available < value {
            return Err(ExecutionError::InsufficientBalance {
                required: value,
                available,
            }
            .into());
        }
        self.write_balance(from, available - value);
        let credited = self.balance(to).saturating_add(value);
        self.write_balance(to, credited);
        Ok(())
    }

    fn run_frame(&mut self, message: Message) -> Result<Bytes, WalletError> {
        if message.transfers_value() {
            if message.frame.is_static {
                return Err(StateError::WriteInStaticContext.into());
            }
            self.transfer(message.frame.caller, message.frame.address, message.frame.value)?;
        }

        let Message { frame, input } = message;
        let Some(code) = self.code_at(frame.code_address) else {
            return Ok(Bytes::new());
        };
        trace!(contract = code.name(), depth = frame.depth, kind = ?frame.kind, "entering frame");
        let mut ctx = CallContext::new(self, frame);
        code.execute(&mut ctx, input.as_slice())
    }

    fn revert_to(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Storage {
                    address,
                    key,
                    previous,
                } => {
                    let storage = &mut self.accounts.entry(address).or_default().storage;
                    if previous.is_zero() {
                        storage.remove(&key);
                    } else {
                        storage.insert(key, previous);
                    }
                }
                JournalEntry::Balance { address, previous } => {
                    self.accounts.entry(address).or_default().balance = previous;
                }
                JournalEntry::Nonce { address, previous } => {
                    self.accounts.entry(address).or_default().nonce = previous;
                }
                JournalEntry::Code { address } => {
                    if let Some(account) = self.accounts.get_mut(&address) {
                        account.code = None;
                    }
                }
                JournalEntry::Log => {
                    self.logs.pop();
                }
            }
        }
    }
}

impl ExecutionHost for InMemoryHost {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        self.accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or(StorageValue::ZERO)
    }

    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let storage = &mut self.accounts.entry(address).or_default().storage;
        let previous = storage.get(&key).copied().unwrap_or(StorageValue::ZERO);
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
        self.journal.push(JournalEntry::Storage {
            address,
            key,
            previous,
        });
    }

    fn balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map_or_else(U256::zero, |account| account.balance)
    }

    fn has_code(&self, address: Address) -> bool {
        self.accounts
            .get(&address)
            .is_some_and(|account| account.code.is_some())
    }

    fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map_or(0, |account| account.nonce)
    }

    fn increment_nonce(&mut self, address: Address) -> u64 {
        let nonce = self.nonce(address);
        self.write_nonce(address, nonce.saturating_add(1));
        nonce
    }

    fn program(&self, init_code: &[u8]) -> Option<Arc<dyn Contract>> {
        self.programs.get(&keccak256(init_code)).cloned()
    }

    fn emit_log(&mut self, log: Log) {
        trace!(address = %log.address, event = log.event.signature(), "log");
        self.logs.push(log);
        self.journal.push(JournalEntry::Log);
    }

    fn execute(&mut self, message: Message) -> Result<Bytes, WalletError> {
        let depth = message.frame.depth;
        if depth > self.config.max_call_depth {
            return Err(ExecutionError::CallDepthExceeded {
                depth,
                max: self.config.max_call_depth,
            }
            .into());
        }

        let checkpoint = self.journal.len();
        let result = self.run_frame(message);
        if result.is_err() {
            self.revert_to(checkpoint);
        }
        result
    }

    fn deploy(
        &mut self,
        creator: Address,
        address: Address,
        code: Arc<dyn Contract>,
        value: U256,
        depth: u16,
    ) -> Result<(), WalletError> {
        if self.has_code(address) {
            return Err(StateError::AddressCollision(address).into());
        }
        if depth > self.config.max_call_depth {
            return Err(ExecutionError::CallDepthExceeded {
                depth,
                max: self.config.max_call_depth,
            }
            .into());
        }

        let checkpoint = self.journal.len();
        debug!(%address, contract = code.name(), "deploying");
        self.accounts.entry(address).or_default().code = Some(Arc::clone(&code));
        self.journal.push(JournalEntry::Code { address });
        // new contract accounts start at nonce 1 (EIP-161)
        if self.nonce(address) == 0 {
            self.write_nonce(address, 1);
        }

        let frame = Frame {
            kind: CallKind::Call,
            caller: creator,
            address,
            code_address: address,
            value,
            depth,
            is_static: false,
        };
        let funded = if value.is_zero() {
            Ok(())
        } else {
            self.transfer(creator, address, value)
        };
        let result = funded.and_then(|()| code.construct(&mut CallContext::new(self, frame)));
        if result.is_err() {
            self.revert_to(checkpoint);
        }
        result
    }
}
