//! # Migration Flows
//!
//! Moving a live wallet to a new singleton through an authorized
//! delegate call, checked against full storage snapshots.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address_of, signers, World, DEPLOYER, RELAYER};
    use nxv_signature::testing::LocalSigner;
    use nxv_wallet::adapters::EcrecoverVerifier;
    use nxv_wallet::config::WalletConfig;
    use nxv_wallet::contracts::migration::MigrationFunction;
    use nxv_wallet::contracts::{MultiSigWallet, WalletMigration};
    use nxv_wallet::domain::abi::{selector, AbiDecoder, AbiFunction};
    use nxv_wallet::domain::entities::{MigrationRecord, Operation};
    use nxv_wallet::domain::layout::{executed_tx_slot, nonce_slot, FALLBACK_HANDLER_SLOT, SINGLETON_SLOT};
    use nxv_wallet::domain::value_objects::{Address, Bytes, StorageValue, U256};
    use nxv_wallet::errors::{AuthorizationError, StateError, WalletError};
    use nxv_wallet::events::WalletEvent;
    use std::sync::Arc;

    const NEXT_SINGLETON: Address = Address::from_low_u64(0x5200);
    const MIGRATION: Address = Address::from_low_u64(0x3160);

    fn world_with_migration() -> (World, Address, LocalSigner) {
        let mut world = World::new();
        let key = signers(1).remove(0);
        let wallet = world.create_wallet(&[address_of(&key)], 1, 0).expect("wallet");

        let next = MultiSigWallet::new(WalletConfig::default(), Arc::new(EcrecoverVerifier));
        world.host.create(DEPLOYER, NEXT_SINGLETON, Arc::new(next)).expect("next singleton");
        let record = MigrationRecord {
            from_implementation: world.contracts.singleton,
            to_implementation: NEXT_SINGLETON,
            fallback_handler: Some(world.contracts.fallback_handler),
        };
        world
            .host
            .create(DEPLOYER, MIGRATION, Arc::new(WalletMigration::new(record)))
            .expect("migration library");
        (world, wallet, key)
    }

    fn master_copy(world: &mut World, wallet: Address) -> Address {
        let out = world
            .host
            .query(RELAYER, wallet, Bytes::from_slice(&selector("masterCopy()").0))
            .expect("masterCopy");
        AbiDecoder::new(out.as_slice()).address().expect("address")
    }

    #[test]
    fn test_migrate_changes_only_slot_zero() {
        let (mut world, wallet, key) = world_with_migration();
        let before = world.host.storage_snapshot(wallet);

        let op = Operation::delegate_call(MIGRATION, MigrationFunction::Migrate.encode(&[]), U256::zero());
        let tx_hash = world.transaction_hash(wallet, &op);
        world.execute_signed(wallet, &op, &[&key]).expect("migrate");

        // bookkeeping of the operation itself plus the new implementation
        let mut expected = before;
        expected.insert(SINGLETON_SLOT, StorageValue::from_address(NEXT_SINGLETON));
        expected.insert(nonce_slot(U256::zero()), StorageValue::ONE);
        expected.insert(executed_tx_slot(tx_hash), StorageValue::ONE);
        assert_eq!(world.host.storage_snapshot(wallet), expected);

        assert_eq!(master_copy(&mut world, wallet), NEXT_SINGLETON);
        assert!(world
            .host
            .events_of(wallet)
            .contains(&&WalletEvent::ChangedMasterCopy { singleton: NEXT_SINGLETON }));
    }

    #[test]
    fn test_wallet_keeps_working_after_migration() {
        let (mut world, wallet, key) = world_with_migration();
        let op = Operation::delegate_call(MIGRATION, MigrationFunction::Migrate.encode(&[]), U256::zero());
        world.execute_signed(wallet, &op, &[&key]).expect("migrate");

        assert_eq!(world.owners(wallet), vec![address_of(&key)]);
        assert_eq!(world.threshold(wallet), U256::one());
        assert!(world.is_nonce_used(wallet, 0));

        let follow_up = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::one());
        world.execute_signed(wallet, &follow_up, &[&key]).expect("new singleton executes");
    }

    #[test]
    fn test_migrate_with_fallback_handler() {
        let (mut world, wallet, key) = world_with_migration();
        let op = Operation::delegate_call(
            MIGRATION,
            MigrationFunction::MigrateWithFallbackHandler.encode(&[]),
            U256::zero(),
        );
        world.execute_signed(wallet, &op, &[&key]).expect("migrate");

        let handler = world.contracts.fallback_handler;
        let snapshot = world.host.storage_snapshot(wallet);
        assert_eq!(snapshot.get(&FALLBACK_HANDLER_SLOT), Some(&StorageValue::from_address(handler)));
        assert_eq!(snapshot.get(&SINGLETON_SLOT), Some(&StorageValue::from_address(NEXT_SINGLETON)));
    }

    #[test]
    fn test_second_migration_refused() {
        let (mut world, wallet, key) = world_with_migration();
        let first = Operation::delegate_call(MIGRATION, MigrationFunction::Migrate.encode(&[]), U256::zero());
        world.execute_signed(wallet, &first, &[&key]).expect("migrate");

        let again = Operation::delegate_call(MIGRATION, MigrationFunction::Migrate.encode(&[]), U256::one());
        let err = world.execute_signed(wallet, &again, &[&key]).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &WalletError::from(StateError::UnexpectedImplementation {
                expected: world.contracts.singleton,
                found: NEXT_SINGLETON,
            })
        );
    }

    #[test]
    fn test_direct_call_refused() {
        let (mut world, wallet, _) = world_with_migration();
        let err = world
            .host
            .transact(RELAYER, MIGRATION, U256::zero(), MigrationFunction::Migrate.encode(&[]))
            .unwrap_err();

        assert_eq!(err, AuthorizationError::DelegateCallRequired("Migration").into());
        assert_eq!(master_copy(&mut world, wallet), world.contracts.singleton);
    }
}
