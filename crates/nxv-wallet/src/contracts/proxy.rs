//! # Wallet Proxy
//!
//! Forwarding proxy deployed once per wallet. Slot 0 holds the singleton;
//! every call except `masterCopy()` is delegate-called into it.

use crate::contracts::returns;
use crate::domain::abi::{selector, Token};
use crate::domain::layout::SINGLETON_SLOT;
use crate::domain::value_objects::{Address, Bytes, StorageValue};
use crate::errors::{ValidationError, WalletError};
use crate::ports::outbound::Contract;
use crate::vm::CallContext;

/// Proxy code. The constructor argument is only read at deployment; after
/// that the singleton is whatever slot 0 says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletProxy {
    singleton: Address,
}

impl WalletProxy {
    /// Proxy that will point at `singleton`.
    #[must_use]
    pub fn new(singleton: Address) -> Self {
        Self { singleton }
    }
}

impl Contract for WalletProxy {
    fn name(&self) -> &'static str {
        "WalletProxy"
    }

    fn construct(&self, ctx: &mut CallContext<'_>) -> Result<(), WalletError> {
        if self.singleton.is_zero() {
            return Err(ValidationError::NotDeployed("Singleton").into());
        }
        ctx.sstore(SINGLETON_SLOT, StorageValue::from_address(self.singleton))
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let singleton = ctx.sload(SINGLETON_SLOT).to_address();
        if input.len() >= 4 && input[..4] == selector("masterCopy()").0 {
            return Ok(returns(&[Token::Address(singleton)]));
        }
        ctx.delegate_call(singleton, input)
    }
}
