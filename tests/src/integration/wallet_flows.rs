//! # Wallet Flows
//!
//! Setup, threshold authorization, replay protection and owner management
//! on factory-created wallets.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address_of, self_call, signers, World, RELAYER};
    use nxv_wallet::contracts::WalletFunction;
    use nxv_wallet::domain::abi::{AbiFunction, Token};
    use nxv_wallet::domain::entities::{Operation, SENTINEL_OWNERS};
    use nxv_wallet::domain::invariants::check_owner_invariants;
    use nxv_wallet::domain::signatures::{encode_signatures, SignatureRecord};
    use nxv_wallet::domain::value_objects::{Address, Bytes, U256};
    use nxv_wallet::errors::{AuthorizationError, StateError, ValidationError, WalletError};
    use nxv_wallet::events::WalletEvent;
    use nxv_wallet::ports::outbound::ExecutionHost;

    const C: Address = Address::from_low_u64(0xc);

    // =========================================================================
    // SETUP
    // =========================================================================

    #[test]
    fn test_setup_reflects_owners_and_threshold() {
        let mut world = World::new();
        let keys = signers(3);
        let owners: Vec<_> = keys.iter().map(address_of).collect();

        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");

        assert_eq!(world.owners(wallet), owners);
        assert_eq!(world.threshold(wallet), U256::from(2));
        assert!(check_owner_invariants(&world.host.account_view(wallet)).is_valid());
    }

    #[test]
    fn test_setup_rejects_bad_owner_sets() {
        let mut world = World::new();
        let a = Address::from_low_u64(0xa);

        let cases: [(Vec<Address>, u64); 4] = [
            (vec![a, a], 1),
            (vec![a, Address::ZERO], 1),
            (vec![a, SENTINEL_OWNERS], 1),
            (vec![a], 2),
        ];
        for (salt, (owners, threshold)) in cases.into_iter().enumerate() {
            let err = world.create_wallet(&owners, threshold, salt as u64).unwrap_err();
            assert_eq!(err.category(), "execution", "case {salt}: {err}");
            assert_eq!(err.root_cause().category(), if salt == 0 { "state" } else { "validation" });
        }
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    /// Owners [A, B], threshold 2: a transfer of 1 to C runs exactly once.
    #[test]
    fn test_two_owner_transfer_runs_once() {
        let mut world = World::new();
        let keys = signers(2);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");
        world.host.set_balance(wallet, U256::from(10));

        let op = Operation::call(C, U256::one(), Bytes::new(), U256::zero());
        let signatures = world.sign(wallet, &op, &[&keys[0], &keys[1]]);

        world.execute(wallet, &op, &signatures).expect("first submission");
        assert_eq!(world.host.balance(C), U256::one());
        assert_eq!(world.host.balance(wallet), U256::from(9));
        assert!(world.is_nonce_used(wallet, 0));

        let tx_hash = world.transaction_hash(wallet, &op);
        assert!(world
            .host
            .events_of(wallet)
            .contains(&&WalletEvent::ExecutionSuccess { tx_hash }));

        let err = world.execute(wallet, &op, &signatures).unwrap_err();
        assert_eq!(err, StateError::NonceAlreadyUsed(U256::zero()).into());
        assert_eq!(world.host.balance(C), U256::one());
    }

    #[test]
    fn test_too_few_signatures() {
        let mut world = World::new();
        let keys = signers(3);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::zero());
        let err = world.execute_signed(wallet, &op, &[&keys[1]]).unwrap_err();

        assert_eq!(err, AuthorizationError::SignaturesTooShort { required: 2, provided: 1 }.into());
        assert!(!world.is_nonce_used(wallet, 0));
    }

    #[test]
    fn test_duplicate_signer() {
        let mut world = World::new();
        let keys = signers(2);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::zero());
        let err = world.execute_signed(wallet, &op, &[&keys[0], &keys[0]]).unwrap_err();

        assert_eq!(
            err,
            AuthorizationError::SignersNotAscending {
                signer: owners[0],
                previous: owners[0],
            }
            .into()
        );
    }

    #[test]
    fn test_descending_signers() {
        let mut world = World::new();
        let keys = signers(2);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::zero());
        let hash = world.transaction_hash(wallet, &op);
        let mut blob = keys[1].sign_hash(hash.as_bytes()).to_bytes().to_vec();
        blob.extend_from_slice(&keys[0].sign_hash(hash.as_bytes()).to_bytes());

        let err = world.execute(wallet, &op, &Bytes::from_vec(blob)).unwrap_err();
        assert_eq!(
            err,
            AuthorizationError::SignersNotAscending {
                signer: owners[0],
                previous: owners[1],
            }
            .into()
        );
    }

    #[test]
    fn test_non_owner_signature() {
        let mut world = World::new();
        let keys = signers(3);
        let owners: Vec<_> = keys[..2].iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 1, 0).expect("wallet");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::zero());
        let err = world.execute_signed(wallet, &op, &[&keys[2]]).unwrap_err();
        assert_eq!(err, AuthorizationError::NotOwner(address_of(&keys[2])).into());
    }

    #[test]
    fn test_signatures_bound_to_one_wallet() {
        let mut world = World::new();
        let keys = signers(1);
        let owners = vec![address_of(&keys[0])];
        let first = world.create_wallet(&owners, 1, 0).expect("first");
        let second = world.create_wallet(&owners, 1, 1).expect("second");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::zero());
        let signatures = world.sign(first, &op, &[&keys[0]]);

        let err = world.execute(second, &op, &signatures).unwrap_err();
        assert!(err.is_authorization(), "{err}");
        world.execute(first, &op, &signatures).expect("signed wallet accepts");
    }

    #[test]
    fn test_eth_signed_message_accepted() {
        let mut world = World::new();
        let keys = signers(2);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 2, 0).expect("wallet");

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::from(9));
        let hash = world.transaction_hash(wallet, &op);
        let signatures = encode_signatures(&[
            SignatureRecord::ecdsa(owners[0], keys[0].sign_eth_message(hash.as_bytes())),
            SignatureRecord::ecdsa(owners[1], keys[1].sign_hash(hash.as_bytes())),
        ]);

        world.execute(wallet, &op, &signatures).expect("mixed signing modes");
        assert!(world.is_nonce_used(wallet, 9));
    }

    // =========================================================================
    // OWNER MANAGEMENT
    // =========================================================================

    #[test]
    fn test_self_management_requires_self_call() {
        let mut world = World::new();
        let keys = signers(2);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 1, 0).expect("wallet");

        let calldata = WalletFunction::SwapOwner.encode(&[
            Token::Address(SENTINEL_OWNERS),
            Token::Address(owners[0]),
            Token::Address(Address::from_low_u64(0x99)),
        ]);
        let err = world.host.transact(owners[0], wallet, U256::zero(), calldata).unwrap_err();

        assert_eq!(err, AuthorizationError::NotSelf.into());
        assert_eq!(world.owners(wallet), owners);
    }

    #[test]
    fn test_wrong_predecessor_rejected() {
        let mut world = World::new();
        let keys = signers(3);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 1, 0).expect("wallet");

        // owners[1] follows owners[0], not the sentinel
        let op = self_call(
            wallet,
            WalletFunction::RemoveOwner,
            &[
                Token::Address(SENTINEL_OWNERS),
                Token::Address(owners[1]),
                Token::Uint(U256::one()),
            ],
            0,
        );
        let err = world.execute_signed(wallet, &op, &[&keys[0]]).unwrap_err();

        assert_eq!(
            err.root_cause(),
            &WalletError::from(ValidationError::InvalidPrevOwner {
                prev: SENTINEL_OWNERS,
                owner: owners[1],
            })
        );
        assert_eq!(world.owners(wallet), owners);
        assert!(!world.is_nonce_used(wallet, 0));
    }

    #[test]
    fn test_remove_swap_and_change_threshold() {
        let mut world = World::new();
        let keys = signers(3);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let wallet = world.create_wallet(&owners, 1, 0).expect("wallet");
        let newcomer = Address::from_low_u64(0x99);

        let remove = self_call(
            wallet,
            WalletFunction::RemoveOwner,
            &[Token::Address(owners[0]), Token::Address(owners[1]), Token::Uint(U256::one())],
            0,
        );
        world.execute_signed(wallet, &remove, &[&keys[0]]).expect("remove");
        assert_eq!(world.owners(wallet), vec![owners[0], owners[2]]);

        let swap = self_call(
            wallet,
            WalletFunction::SwapOwner,
            &[Token::Address(owners[0]), Token::Address(owners[2]), Token::Address(newcomer)],
            1,
        );
        world.execute_signed(wallet, &swap, &[&keys[0]]).expect("swap");
        assert_eq!(world.owners(wallet), vec![owners[0], newcomer]);

        let raise = self_call(wallet, WalletFunction::ChangeThreshold, &[Token::Uint(U256::from(2))], 2);
        world.execute_signed(wallet, &raise, &[&keys[0]]).expect("threshold");
        assert_eq!(world.threshold(wallet), U256::from(2));

        // the removed owner's key no longer counts
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::from(3));
        let err = world.execute_signed(wallet, &op, &[&keys[0], &keys[1]]).unwrap_err();
        assert!(err.is_authorization());

        assert!(check_owner_invariants(&world.host.account_view(wallet)).is_valid());
        let events = world.host.events_of(wallet);
        assert!(events.contains(&&WalletEvent::RemovedOwner { owner: owners[1] }));
        assert!(events.contains(&&WalletEvent::AddedOwner { owner: newcomer }));
        assert!(events.contains(&&WalletEvent::ChangedThreshold { threshold: U256::from(2) }));
    }

    #[test]
    fn test_relayer_holds_no_authority() {
        let mut world = World::new();
        let keys = signers(1);
        let wallet = world.create_wallet(&[address_of(&keys[0])], 1, 0).expect("wallet");

        let op = Operation::call(RELAYER, U256::zero(), Bytes::new(), U256::zero());
        let err = world.execute(wallet, &op, &Bytes::new()).unwrap_err();
        assert_eq!(err, AuthorizationError::SignaturesTooShort { required: 1, provided: 0 }.into());
    }
}
