//! Execution context handed to `Contract::execute`.

use super::message::{CallKind, Frame, Message};
use crate::domain::abi::{encode_call, selector, Token};
use crate::domain::entities::{Log, EIP1271_MAGIC_VALUE};
use crate::domain::services::{compute_create2_address, compute_create_address};
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::{AuthorizationError, StateError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::{Contract, DelegatedValidator, ExecutionHost, SlotStore};
use std::sync::Arc;

/// One running frame's view of the host.
pub struct CallContext<'h> {
    host: &'h mut dyn ExecutionHost,
    frame: Frame,
}

impl<'h> CallContext<'h> {
    /// Binds a frame to a host.
    pub fn new(host: &'h mut dyn ExecutionHost, frame: Frame) -> Self {
        Self { host, frame }
    }

    /// The frame this context runs.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// `address(this)`: whose storage is in use.
    #[must_use]
    pub fn address(&self) -> Address {
        self.frame.address
    }

    /// `msg.sender`.
    #[must_use]
    pub fn caller(&self) -> Address {
        self.frame.caller
    }

    /// `msg.value`.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.frame.value
    }

    /// Address of the running code.
    #[must_use]
    pub fn code_address(&self) -> Address {
        self.frame.code_address
    }

    /// Nesting depth.
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.frame.depth
    }

    /// True when the running code is not the code of `address(this)`.
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        self.frame.address != self.frame.code_address
    }

    /// Network identity.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.host.chain_id()
    }

    /// Balance of any account.
    #[must_use]
    pub fn balance(&self, address: Address) -> U256 {
        self.host.balance(address)
    }

    /// True if `address` has code.
    #[must_use]
    pub fn has_code(&self, address: Address) -> bool {
        self.host.has_code(address)
    }

    /// Reads a slot of `address(this)`.
    #[must_use]
    pub fn sload(&self, key: StorageKey) -> StorageValue {
        self.host.storage(self.frame.address, key)
    }

    /// Writes a slot of `address(this)`.
    ///
    /// # Errors
    /// `WriteInStaticContext` inside a static call.
    pub fn sstore(&mut self, key: StorageKey, value: StorageValue) -> Result<(), WalletError> {
        self.ensure_writable()?;
        self.host.set_storage(self.frame.address, key, value);
        Ok(())
    }

    /// Emits an event from `address(this)`.
    ///
    /// # Errors
    /// `WriteInStaticContext` inside a static call.
    pub fn emit(&mut self, event: WalletEvent) -> Result<(), WalletError> {
        self.ensure_writable()?;
        self.host.emit_log(Log::new(self.frame.address, event));
        Ok(())
    }

    /// Calls `to` with `address(this)` as caller.
    ///
    /// # Errors
    /// Whatever the callee raised (its effects are already rolled back).
    pub fn call(&mut self, to: Address, value: U256, input: &[u8]) -> Result<Bytes, WalletError> {
        self.dispatch(CallKind::Call, to, value, input)
    }

    /// Runs `to`'s code against `address(this)`'s storage, keeping caller and value.
    ///
    /// # Errors
    /// Whatever the callee raised.
    pub fn delegate_call(&mut self, to: Address, input: &[u8]) -> Result<Bytes, WalletError> {
        self.dispatch(CallKind::DelegateCall, to, self.frame.value, input)
    }

    /// Read-only call.
    ///
    /// # Errors
    /// Whatever the callee raised, including attempted writes.
    pub fn static_call(&mut self, to: Address, input: &[u8]) -> Result<Bytes, WalletError> {
        self.dispatch(CallKind::StaticCall, to, U256::zero(), input)
    }

    /// Deploys `code` at the next CREATE address of `address(this)`, endowed with `value`.
    ///
    /// # Errors
    /// `AddressCollision`, `InsufficientBalance`, `WriteInStaticContext`
    /// inside a static call, or whatever the constructor raised.
    pub fn create(&mut self, value: U256, code: Arc<dyn Contract>) -> Result<Address, WalletError> {
        self.ensure_writable()?;
        let nonce = self.host.increment_nonce(self.frame.address);
        let address = compute_create_address(self.frame.address, nonce);
        self.host
            .deploy(self.frame.address, address, code, value, self.frame.depth.saturating_add(1))?;
        Ok(address)
    }

    /// Deploys `code` at the CREATE2 address of `address(this)`, endowed with `value`.
    ///
    /// # Errors
    /// `AddressCollision` if the address is occupied, `InsufficientBalance`,
    /// `WriteInStaticContext` inside a static call.
    pub fn create2(
        &mut self,
        value: U256,
        salt: Hash,
        init_code_hash: Hash,
        code: Arc<dyn Contract>,
    ) -> Result<Address, WalletError> {
        self.ensure_writable()?;
        self.host.increment_nonce(self.frame.address);
        let address = compute_create2_address(self.frame.address, salt, init_code_hash);
        self.host
            .deploy(self.frame.address, address, code, value, self.frame.depth.saturating_add(1))?;
        Ok(address)
    }

    /// Program registered for `init_code`.
    #[must_use]
    pub fn program(&self, init_code: &[u8]) -> Option<Arc<dyn Contract>> {
        self.host.program(init_code)
    }

    fn dispatch(
        &mut self,
        kind: CallKind,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes, WalletError> {
        let frame = match kind {
            CallKind::Call => Frame {
                kind,
                caller: self.frame.address,
                address: to,
                code_address: to,
                value,
                depth: self.frame.depth.saturating_add(1),
                is_static: self.frame.is_static,
            },
            CallKind::DelegateCall => Frame {
                kind,
                code_address: to,
                depth: self.frame.depth.saturating_add(1),
                ..self.frame
            },
            CallKind::StaticCall => Frame {
                kind,
                caller: self.frame.address,
                address: to,
                code_address: to,
                value: U256::zero(),
                depth: self.frame.depth.saturating_add(1),
                is_static: true,
            },
        };

        self.host.execute(Message {
            frame,
            input: Bytes::from_slice(input),
        })
    }

    fn ensure_writable(&self) -> Result<(), WalletError> {
        if self.frame.is_static {
            return Err(StateError::WriteInStaticContext.into());
        }
        Ok(())
    }
}

impl SlotStore for CallContext<'_> {
    fn load(&self, key: StorageKey) -> StorageValue {
        self.sload(key)
    }

    fn store(&mut self, key: StorageKey, value: StorageValue) -> Result<(), WalletError> {
        self.sstore(key, value)
    }
}

impl DelegatedValidator for CallContext<'_> {
    fn validation_depth(&self) -> u16 {
        self.frame.depth
    }

    fn is_valid_signature(&mut self, signer: Address, hash: Hash, proof: &[u8]) -> Result<bool, WalletError> {
        let input = encode_call(
            selector("isValidSignature(bytes32,bytes)"),
            &[Token::FixedBytes(hash), Token::Bytes(proof.to_vec())],
        );
        match self.static_call(signer, input.as_slice()) {
            Ok(output) => Ok(output.len() >= 4 && output.as_slice()[..4] == EIP1271_MAGIC_VALUE),
            Err(err) => match err.root_cause() {
                WalletError::Authorization(AuthorizationError::ValidationDepthExceeded { .. }) => Err(err),
                _ => {
                    tracing::debug!(%signer, error = %err, "contract signer reverted");
                    Ok(false)
                }
            },
        }
    }
}
