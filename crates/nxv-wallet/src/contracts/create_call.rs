//! # Create Call Library
//!
//! Deploys contracts from init code. Delegate-called from a wallet, the new
//! contract's creator is the wallet and `ContractCreation` is logged by it;
//! called directly, the library itself is the creator.
//!
//! | Function | Address of the new contract |
//! |----------|-----------------------------|
//! | `performCreate(uint256,bytes)` | CREATE: creator and its next nonce |
//! | `performCreate2(uint256,bytes,bytes32)` | CREATE2: creator, salt, `keccak256(init code)` |
//!
//! Init code is resolved to a program the host has registered for it. Unknown
//! init code, a value the creator cannot cover, or a failing constructor all
//! revert with `Could not deploy contract`.

use crate::contracts::{dispatch, returns};
use crate::domain::abi::{selector_table, AbiDecoder, AbiFunction, SelectorTable, Token};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{ExecutionError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::Contract;
use crate::vm::CallContext;
use tracing::{debug, info};

const DEPLOY_FAILED: &str = "Could not deploy contract";

/// Functions of the create-call library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateCallFunction {
    /// `performCreate(uint256,bytes)`
    PerformCreate,
    /// `performCreate2(uint256,bytes,bytes32)`
    PerformCreate2,
}

impl AbiFunction for CreateCallFunction {
    const ALL: &'static [Self] = &[Self::PerformCreate, Self::PerformCreate2];

    fn signature(self) -> &'static str {
        match self {
            Self::PerformCreate => "performCreate(uint256,bytes)",
            Self::PerformCreate2 => "performCreate2(uint256,bytes,bytes32)",
        }
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(CreateCallFunction)
    }
}

/// Calldata for `performCreate`.
#[must_use]
pub fn encode_perform_create(value: U256, init_code: &[u8]) -> Bytes {
    CreateCallFunction::PerformCreate.encode(&[Token::Uint(value), Token::Bytes(init_code.to_vec())])
}

/// Calldata for `performCreate2`.
#[must_use]
pub fn encode_perform_create2(value: U256, init_code: &[u8], salt: Hash) -> Bytes {
    CreateCallFunction::PerformCreate2.encode(&[
        Token::Uint(value),
        Token::Bytes(init_code.to_vec()),
        Token::FixedBytes(salt),
    ])
}

/// Create-call library code.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateCall;

impl Contract for CreateCall {
    fn name(&self) -> &'static str {
        "CreateCall"
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (function, args) = dispatch::<CreateCallFunction>(input)?;
        let mut decoder = AbiDecoder::new(args);
        let value = decoder.uint()?;
        let init_code = decoder.bytes()?;

        let Some(code) = ctx.program(&init_code) else {
            debug!(init_code_hash = %keccak256(&init_code), "no program registered for init code");
            return Err(ExecutionError::Reverted(DEPLOY_FAILED.into()).into());
        };
        let created = match function {
            CreateCallFunction::PerformCreate => ctx.create(value, code),
            CreateCallFunction::PerformCreate2 => {
                let salt = decoder.fixed_bytes()?;
                ctx.create2(value, salt, keccak256(&init_code), code)
            }
        };
        let new_contract: Address = created.map_err(|e| {
            debug!(error = %e, "deployment failed");
            WalletError::from(ExecutionError::Reverted(DEPLOY_FAILED.into()))
        })?;

        ctx.emit(WalletEvent::ContractCreation { new_contract })?;
        info!(creator = %ctx.address(), %new_contract, %value, "contract created");
        Ok(returns(&[Token::Address(new_contract)]))
    }
}
