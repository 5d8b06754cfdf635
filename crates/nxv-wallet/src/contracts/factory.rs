//! # Wallet Factory
//!
//! Deterministic (CREATE2) deployment of wallet proxies.
//!
//! ```text
//! salt      = keccak256(abi.encode(keccak256(initializer), saltNonce))
//! init code = proxyCreationCode ++ pad32(singleton)
//! address   = CREATE2(factory, salt, keccak256(init code))
//! ```
//!
//! The same `(singleton, initializer, saltNonce)` triple always yields the
//! same address, and deploys there at most once.

use crate::contracts::{dispatch, proxy::WalletProxy, returns};
use crate::domain::abi::{selector_table, AbiDecoder, AbiFunction, SelectorTable, Token};
use crate::domain::entities::{DeploymentRecord, PROXY_CREATION_CODE};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{ExecutionError, ValidationError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::Contract;
use crate::vm::CallContext;
use std::sync::Arc;
use tracing::info;

/// Functions of the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactoryFunction {
    /// `createMultiSigWallet(address,bytes,uint256)`
    CreateMultiSigWallet,
    /// `calculateMultiSigWalletAddress(address,bytes,uint256)`
    CalculateMultiSigWalletAddress,
    /// `proxyCreationCode()`
    ProxyCreationCode,
}

impl AbiFunction for FactoryFunction {
    const ALL: &'static [Self] = &[
        Self::CreateMultiSigWallet,
        Self::CalculateMultiSigWalletAddress,
        Self::ProxyCreationCode,
    ];

    fn signature(self) -> &'static str {
        match self {
            Self::CreateMultiSigWallet => "createMultiSigWallet(address,bytes,uint256)",
            Self::CalculateMultiSigWalletAddress => "calculateMultiSigWalletAddress(address,bytes,uint256)",
            Self::ProxyCreationCode => "proxyCreationCode()",
        }
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(FactoryFunction)
    }
}

/// Calldata for `createMultiSigWallet` (or, with `calculate`, the address query).
#[must_use]
pub fn encode_create_wallet(singleton: Address, initializer: &[u8], salt_nonce: U256, calculate: bool) -> Bytes {
    let function = if calculate {
        FactoryFunction::CalculateMultiSigWalletAddress
    } else {
        FactoryFunction::CreateMultiSigWallet
    };
    function.encode(&[
        Token::Address(singleton),
        Token::Bytes(initializer.to_vec()),
        Token::Uint(salt_nonce),
    ])
}

/// Factory code.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletFactory;

impl WalletFactory {
    fn create_wallet(ctx: &mut CallContext<'_>, record: &DeploymentRecord) -> Result<Address, WalletError> {
        if !ctx.has_code(record.implementation) {
            return Err(ValidationError::NotDeployed("Singleton").into());
        }

        let proxy = ctx.create2(
            U256::zero(),
            record.salt(),
            keccak256(&record.init_code()),
            Arc::new(WalletProxy::new(record.implementation)),
        )?;

        if !record.initializer.is_empty() {
            ctx.call(proxy, U256::zero(), record.initializer.as_slice())
                .map_err(ExecutionError::call_failed)?;
        }

        ctx.emit(WalletEvent::NewMultiSigWalletCreated {
            proxy,
            singleton: record.implementation,
        })?;
        info!(%proxy, singleton = %record.implementation, salt_nonce = %record.salt_nonce, "wallet created");
        Ok(proxy)
    }
}

impl Contract for WalletFactory {
    fn name(&self) -> &'static str {
        "WalletFactory"
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (function, args) = dispatch::<FactoryFunction>(input)?;
        if function == FactoryFunction::ProxyCreationCode {
            return Ok(returns(&[Token::Bytes(PROXY_CREATION_CODE.to_vec())]));
        }

        let mut decoder = AbiDecoder::new(args);
        let record = DeploymentRecord {
            factory: ctx.address(),
            implementation: decoder.address()?,
            initializer: Bytes::from_vec(decoder.bytes()?),
            salt_nonce: decoder.uint()?,
        };

        let address = if function == FactoryFunction::CreateMultiSigWallet {
            Self::create_wallet(ctx, &record)?
        } else {
            record.address()
        };
        Ok(returns(&[Token::Address(address)]))
    }
}
