//! # Wallet Migration
//!
//! One-shot library moving a wallet from one singleton to another. Runs only
//! via delegate call from the wallet (as an authorized `DelegateCall`
//! operation) and rewrites slot 0, plus the fallback handler slot for
//! `migrateWithFallbackHandler`. No other storage is touched.

use crate::contracts::{dispatch, only_delegate_call};
use crate::domain::abi::{selector_table, AbiFunction, SelectorTable};
use crate::domain::entities::MigrationRecord;
use crate::domain::layout::{FALLBACK_HANDLER_SLOT, SINGLETON_SLOT};
use crate::domain::value_objects::{Bytes, StorageValue};
use crate::errors::{StateError, ValidationError, WalletError};
use crate::events::WalletEvent;
use crate::ports::outbound::Contract;
use crate::vm::CallContext;
use tracing::info;

/// Functions of the migration library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationFunction {
    /// `migrate()`
    Migrate,
    /// `migrateWithFallbackHandler()`
    MigrateWithFallbackHandler,
}

impl AbiFunction for MigrationFunction {
    const ALL: &'static [Self] = &[Self::Migrate, Self::MigrateWithFallbackHandler];

    fn signature(self) -> &'static str {
        match self {
            Self::Migrate => "migrate()",
            Self::MigrateWithFallbackHandler => "migrateWithFallbackHandler()",
        }
    }

    fn selectors() -> &'static SelectorTable<Self> {
        selector_table!(MigrationFunction)
    }
}

/// Migration library bound to one version pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletMigration {
    record: MigrationRecord,
}

impl WalletMigration {
    /// Library for `record`. Its targets are checked for code at deployment.
    #[must_use]
    pub fn new(record: MigrationRecord) -> Self {
        Self { record }
    }

    /// The version pair.
    #[must_use]
    pub fn record(&self) -> &MigrationRecord {
        &self.record
    }
}

impl Contract for WalletMigration {
    fn name(&self) -> &'static str {
        "WalletMigration"
    }

    fn construct(&self, ctx: &mut CallContext<'_>) -> Result<(), WalletError> {
        if !ctx.has_code(self.record.to_implementation) {
            return Err(ValidationError::NotDeployed("Singleton").into());
        }
        if let Some(handler) = self.record.fallback_handler {
            if !ctx.has_code(handler) {
                return Err(ValidationError::NotDeployed("Fallback handler").into());
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
        let (function, _) = dispatch::<MigrationFunction>(input)?;
        only_delegate_call(ctx, "Migration")?;

        let current = ctx.sload(SINGLETON_SLOT).to_address();
        if current != self.record.from_implementation {
            return Err(StateError::UnexpectedImplementation {
                expected: self.record.from_implementation,
                found: current,
            }
            .into());
        }

        let handler = match function {
            MigrationFunction::Migrate => None,
            MigrationFunction::MigrateWithFallbackHandler => Some(
                self.record
                    .fallback_handler
                    .ok_or(ValidationError::NotDeployed("Fallback handler"))?,
            ),
        };

        let target = self.record.to_implementation;
        ctx.sstore(SINGLETON_SLOT, StorageValue::from_address(target))?;
        ctx.emit(WalletEvent::ChangedMasterCopy { singleton: target })?;

        if let Some(handler) = handler {
            ctx.sstore(FALLBACK_HANDLER_SLOT, StorageValue::from_address(handler))?;
            ctx.emit(WalletEvent::ChangedFallbackHandler { handler })?;
        }

        info!(wallet = %ctx.address(), from = %current, to = %target, "wallet migrated");
        Ok(Bytes::new())
    }
}
