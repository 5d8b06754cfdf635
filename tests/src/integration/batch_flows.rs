//! # Batch Flows
//!
//! `multiSend` reached through an authorized delegate-call operation.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address_of, signers, World};
    use nxv_signature::testing::LocalSigner;
    use nxv_wallet::contracts::multi_send::encode_multi_send;
    use nxv_wallet::contracts::WalletFunction;
    use nxv_wallet::domain::abi::{AbiFunction, Token};
    use nxv_wallet::domain::batch::encode_batch;
    use nxv_wallet::domain::entities::{ExecutionMode, Operation, SubOperation};
    use nxv_wallet::domain::value_objects::{Address, Bytes, U256};
    use nxv_wallet::errors::{AuthorizationError, ExecutionError, ValidationError, WalletError};
    use nxv_wallet::ports::outbound::ExecutionHost;

    const C: Address = Address::from_low_u64(0xc);
    const D: Address = Address::from_low_u64(0xd);

    fn transfer(to: Address, value: u64) -> SubOperation {
        SubOperation {
            operation: ExecutionMode::Call,
            destination: to,
            value: U256::from(value),
            data: Bytes::new(),
        }
    }

    fn funded_wallet(world: &mut World, balance: u64) -> (Address, LocalSigner) {
        let key = signers(1).remove(0);
        let wallet = world.create_wallet(&[address_of(&key)], 1, 0).expect("wallet");
        world.host.set_balance(wallet, U256::from(balance));
        (wallet, key)
    }

    fn batch_op(library: Address, items: &[SubOperation], nonce: u64) -> Operation {
        let packed = encode_batch(items);
        Operation::delegate_call(library, encode_multi_send(packed.as_slice()), U256::from(nonce))
    }

    #[test]
    fn test_batch_runs_every_item() {
        let mut world = World::new();
        let (wallet, key) = funded_wallet(&mut world, 10);

        let op = batch_op(world.contracts.multi_send, &[transfer(C, 3), transfer(D, 4)], 0);
        world.execute_signed(wallet, &op, &[&key]).expect("batch");

        assert_eq!(world.host.balance(C), U256::from(3));
        assert_eq!(world.host.balance(D), U256::from(4));
        assert_eq!(world.host.balance(wallet), U256::from(3));
    }

    #[test]
    fn test_failing_item_reverts_whole_batch() {
        let mut world = World::new();
        let (wallet, key) = funded_wallet(&mut world, 10);

        // second item overdraws the wallet
        let op = batch_op(world.contracts.multi_send, &[transfer(C, 3), transfer(D, 50)], 0);
        let err = world.execute_signed(wallet, &op, &[&key]).unwrap_err();

        assert!(matches!(
            err.root_cause(),
            WalletError::Execution(ExecutionError::InsufficientBalance { .. })
        ));
        assert_eq!(world.host.balance(C), U256::zero());
        assert_eq!(world.host.balance(wallet), U256::from(10));
        assert!(!world.is_nonce_used(wallet, 0));
    }

    #[test]
    fn test_batch_of_self_calls() {
        let mut world = World::new();
        let (wallet, key) = funded_wallet(&mut world, 0);
        let newcomer = Address::from_low_u64(0x99);

        let self_item = |function: WalletFunction, args: &[Token]| SubOperation {
            operation: ExecutionMode::Call,
            destination: wallet,
            value: U256::zero(),
            data: function.encode(args),
        };
        let items = [
            self_item(
                WalletFunction::AddOwnerWithThreshold,
                &[Token::Address(newcomer), Token::Uint(U256::one())],
            ),
            self_item(WalletFunction::ChangeThreshold, &[Token::Uint(U256::from(2))]),
        ];

        let op = batch_op(world.contracts.multi_send, &items, 0);
        world.execute_signed(wallet, &op, &[&key]).expect("batch");

        assert_eq!(world.owners(wallet), vec![newcomer, address_of(&key)]);
        assert_eq!(world.threshold(wallet), U256::from(2));
    }

    #[test]
    fn test_call_only_batch_refuses_delegate_items() {
        let mut world = World::new();
        let (wallet, key) = funded_wallet(&mut world, 10);
        let delegate = SubOperation {
            operation: ExecutionMode::DelegateCall,
            destination: world.contracts.sign_message_lib,
            value: U256::zero(),
            data: Bytes::new(),
        };

        let op = batch_op(world.contracts.multi_send_call_only, &[transfer(C, 1), delegate], 0);
        let err = world.execute_signed(wallet, &op, &[&key]).unwrap_err();

        assert_eq!(
            err.root_cause(),
            &WalletError::from(ValidationError::MalformedBatch("delegate call in call-only batch"))
        );
        assert_eq!(world.host.balance(C), U256::zero());
    }

    #[test]
    fn test_batch_library_not_callable_directly() {
        let mut world = World::new();
        let (wallet, key) = funded_wallet(&mut world, 10);
        let packed = encode_batch(&[transfer(C, 1)]);

        // a plain call runs the library in its own context
        let op = Operation::call(
            world.contracts.multi_send,
            U256::zero(),
            encode_multi_send(packed.as_slice()),
            U256::zero(),
        );
        let err = world.execute_signed(wallet, &op, &[&key]).unwrap_err();

        assert_eq!(
            err.root_cause(),
            &WalletError::from(AuthorizationError::DelegateCallRequired("MultiSend"))
        );
    }
}
