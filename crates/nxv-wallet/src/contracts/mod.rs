//! # Contracts
//!
//! Programs installed on the host. Each decodes Solidity ABI calldata and
//! dispatches on the 4-byte selector.
//!
//! | Contract | Reached by |
//! |----------|-----------|
//! | `MultiSigWallet` | delegate call from a `WalletProxy` |
//! | `WalletProxy` | owners, tokens, other wallets |
//! | `WalletFactory` | deployers |
//! | `BatchExecutor` | delegate call from a wallet (`multiSend`) |
//! | `CreateCall` | delegate call from a wallet, or directly |
//! | `WalletMigration` | delegate call from a wallet |
//! | `SignMessageLib` | delegate call from a wallet |
//! | `CompatibilityFallbackHandler` | call from a wallet's fallback |

pub mod create_call;
pub mod factory;
pub mod fallback_handler;
pub mod migration;
pub mod multi_send;
pub mod proxy;
pub mod sign_message;
pub mod wallet;

pub use create_call::{CreateCall, CreateCallFunction};
pub use factory::{FactoryFunction, WalletFactory};
pub use fallback_handler::{CompatibilityFallbackHandler, HandlerFunction};
pub use migration::{MigrationFunction, WalletMigration};
pub use multi_send::{BatchExecutor, MultiSendFunction};
pub use proxy::WalletProxy;
pub use sign_message::{SignMessageFunction, SignMessageLib};
pub use wallet::{MultiSigWallet, WalletFunction};

use crate::domain::abi::{encode, split_selector, AbiFunction, Token};
use crate::domain::value_objects::Bytes;
use crate::errors::{AuthorizationError, ValidationError, WalletError};
use crate::vm::CallContext;

/// Splits calldata and looks the selector up in `F::ALL`.
pub(crate) fn dispatch<F: AbiFunction>(input: &[u8]) -> Result<(F, &[u8]), WalletError> {
    let (sel, args) = split_selector(input)?;
    let function = F::from_selector(sel).ok_or(ValidationError::UnknownSelector(sel.0))?;
    Ok((function, args))
}

/// ABI-encodes return values.
pub(crate) fn returns(tokens: &[Token]) -> Bytes {
    Bytes::from_vec(encode(tokens))
}

/// Rejects direct calls to library code meant to run in a wallet's context.
pub(crate) fn only_delegate_call(ctx: &CallContext<'_>, library: &'static str) -> Result<(), WalletError> {
    if ctx.is_delegated() {
        Ok(())
    } else {
        Err(AuthorizationError::DelegateCallRequired(library).into())
    }
}
