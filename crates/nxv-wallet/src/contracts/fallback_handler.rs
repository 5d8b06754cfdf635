//! # Compatibility Fallback Handler
//!
//! Answers calls a wallet does not implement itself. The wallet forwards the
//! original calldata with the original caller appended (20 bytes); the
//! handler sees the wallet as its own caller.
//!
//! | Function | Returns |
//! |----------|---------|
//! | `onERC721Received` | `0x150b7a02` |
//! | `onERC1155Received` | `0xf23a6e61` |
//! | `onERC1155BatchReceived` | `0xbc197c81` |
//! | `tokensReceived` | nothing (ERC-777 hook accepted) |
//! | `supportsInterface(bytes4)` | ERC-165, ERC-721 and ERC-1155 receiver ids |
//! | `getMessageHash(bytes)` | message hash for the calling wallet |
//! | `getMessageHashForNxv(address,bytes)` | message hash for any wallet |
//! | `simulate(address,bytes)` | result of running the call in the wallet's context, rolled back |
//!
//! `simulate` calls back into the wallet's `simulateAndRevert`, so it needs a
//! writable frame: send it as a transaction, not a static query.

use crate::contracts::{dispatch, returns, WalletFunction};
use crate::domain::abi::{selector_table, AbiDecoder, AbiFunction, SelectorTable, Token};
use crate::domain::typed_data::TypedDataHasher;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{ExecutionError, WalletError};
use crate::ports::outbound::Contract;
use crate::vm::CallContext;

const INTERFACE_ERC165: [u8; 4] = [0x01, 0xff, 0xc9, 0xa7];
const INTERFACE_ERC721_RECEIVER: [u8; 4] = [0x15, 0x0b, 0x7a, 0x02];
const INTERFACE_ERC1155_RECEIVER: [u8; 4] = [0x4e, 0x23, 0x12, 0xe0];

/// Functions of the fallback handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerFunction {
    /// `onERC721Received(address,address,uint256,bytes)`
    OnErc721Received,
    /// `onERC1155Received(address,address,uint256,uint256,bytes)`
    OnErc1155Received,
    /// `onERC1155BatchReceived(address,address,uint256[],uint256[],bytes)`
    OnErc1155BatchReceived,
    /// `tokensReceived(address,address,address,uint256,bytes,bytes)`
    TokensReceived,
    /// `supportsInterface(bytes4)`
    SupportsInterface,
    /// `getMessageHash(bytes)`
    GetMessageHash,
    /// `getMessageHashForNxv(address,bytes)`
    GetMessageHashForNxv,
    /// `simulate(address,bytes)`
    Simulate,
}

impl AbiFunction for HandlerFunction {
    const ALL: &'static [Self] = &[
        Self::OnErc721Received,
        Self::OnErc1155Received,
        Self::OnErc1155BatchReceived,
        Self::TokensReceived,
        Self::SupportsInterface,
        Self::GetMessageHash,
        Self::GetMessageHashForNxv,
        Self::Simulate,
    ];

    fn signature(self) -> &'static str {
        match self {
            Self::OnErc721Received => "onERC721Received(address,address,uint256,bytes)",
            Self::OnErc1155Received => "onERC1155Received(address,address,uint256,uint256,bytes)",
            Self::OnErc1155BatchReceived => "onERC1155BatchReceived(address,address,uint256[],uint256[],bytes)",
            Self::TokensReceived => "tokensReceived(address,address,address,uint256,bytes,bytes)",
            Self::SupportsInterface => "supportsInterface(bytes4)",
            Self::GetMessageHash => "getMessageHash(bytes)",
            Self::GetMessageHashForNxv => "getMessageHashForNxv(address,bytes)",
            Self::Simulate => "simulate(address,bytes)",
        }
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(HandlerFunction)
    }
}

/// Fallback handler code.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityFallbackHandler;

impl CompatibilityFallbackHandler {
    /// Runs `payload` against `target` inside the calling wallet and returns
    /// what it returned, or raises what it raised. The wallet keeps no trace.
    fn simulate(ctx: &mut CallContext<'_>, target: Address, payload: Vec<u8>) -> Result<Bytes, WalletError> {
        let wallet = ctx.caller();
        let call = WalletFunction::SimulateAndRevert.encode(&[Token::Address(target), Token::Bytes(payload)]);
        let Err(err) = ctx.call(wallet, U256::zero(), call.as_slice()) else {
            return Err(ExecutionError::Reverted("simulation did not revert".into()).into());
        };
        match err.root_cause() {
            WalletError::Execution(ExecutionError::Simulated(outcome)) => match outcome.as_ref() {
                Ok(response) => Ok(returns(&[Token::Bytes(response.as_slice().to_vec())])),
                Err(inner) => Err(inner.clone()),
            },
            _ => Err(err),
        }
    }
}

impl Contract for CompatibilityFallbackHandler {
    fn name(&self) -> &'static str {
        "CompatibilityFallbackHandler"
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (function, args) = dispatch::<HandlerFunction>(input)?;
        let mut decoder = AbiDecoder::new(args);

        match function {
            HandlerFunction::OnErc721Received
            | HandlerFunction::OnErc1155Received
            | HandlerFunction::OnErc1155BatchReceived => {
                Ok(Bytes::from_vec(function.selector().to_word().to_vec()))
            }
            HandlerFunction::TokensReceived => Ok(Bytes::new()),
            HandlerFunction::SupportsInterface => {
                let word = decoder.word()?;
                let id = [word[0], word[1], word[2], word[3]];
                let supported = [INTERFACE_ERC165, INTERFACE_ERC721_RECEIVER, INTERFACE_ERC1155_RECEIVER].contains(&id);
                Ok(returns(&[Token::Bool(supported)]))
            }
            HandlerFunction::GetMessageHash => {
                let message = decoder.bytes()?;
                let hash = TypedDataHasher::new(ctx.chain_id(), ctx.caller()).message_hash(&message);
                Ok(returns(&[Token::FixedBytes(hash)]))
            }
            HandlerFunction::GetMessageHashForNxv => {
                let wallet = decoder.address()?;
                let message = decoder.bytes()?;
                let hash = TypedDataHasher::new(ctx.chain_id(), wallet).message_hash(&message);
                Ok(returns(&[Token::FixedBytes(hash)]))
            }
            HandlerFunction::Simulate => {
                let target = decoder.address()?;
                let payload = decoder.bytes()?;
                Self::simulate(ctx, target, payload)
            }
        }
    }
}
