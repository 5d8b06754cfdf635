//! # Sign Message Library
//!
//! `signMessage(bytes)`: marks a message as approved by the wallet, so that
//! `isValidSignature(hash, "")` succeeds for it without fresh signatures.
//! Run via an authorized `DelegateCall` operation.

use crate::contracts::{dispatch, only_delegate_call};
use crate::domain::abi::{selector_table, AbiDecoder, AbiFunction, SelectorTable, Token};
use crate::domain::layout::signed_message_slot;
use crate::domain::typed_data::TypedDataHasher;
use crate::domain::value_objects::{Bytes, StorageValue};
use crate::errors::WalletError;
use crate::events::WalletEvent;
use crate::ports::outbound::Contract;
use crate::vm::CallContext;
use tracing::info;

/// Functions of the sign-message library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignMessageFunction {
    /// `signMessage(bytes)`
    SignMessage,
}

impl AbiFunction for SignMessageFunction {
    const ALL: &'static [Self] = &[Self::SignMessage];

    fn signature(self) -> &'static str {
        "signMessage(bytes)"
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(SignMessageFunction)
    }
}

/// Calldata for `signMessage`.
#[must_use]
pub fn encode_sign_message(message: &[u8]) -> Bytes {
    SignMessageFunction::SignMessage.encode(&[Token::Bytes(message.to_vec())])
}

/// Sign-message library code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignMessageLib;

impl Contract for SignMessageLib {
    fn name(&self) -> &'static str {
        "SignMessageLib"
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (SignMessageFunction::SignMessage, args) = dispatch::<SignMessageFunction>(input)?;
        only_delegate_call(ctx, "SignMessageLib")?;

        let message = AbiDecoder::new(args).bytes()?;
        let msg_hash = TypedDataHasher::new(ctx.chain_id(), ctx.address()).message_hash(&message);
        ctx.sstore(signed_message_slot(msg_hash), StorageValue::ONE)?;
        ctx.emit(WalletEvent::SignMsg { msg_hash })?;
        info!(wallet = %ctx.address(), %msg_hash, "message approved");
        Ok(Bytes::new())
    }
}
