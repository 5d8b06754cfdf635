//! # Delegated Signers
//!
//! Wallets owning wallets: contract signatures validated through
//! `isValidSignature`, message approval, the validation depth cap, and
//! reentrant replay attempts.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address_of, signers, World, RELAYER};
    use nxv_signature::testing::LocalSigner;
    use nxv_wallet::config::WalletConfig;
    use nxv_wallet::contracts::sign_message::encode_sign_message;
    use nxv_wallet::contracts::wallet::encode_batch_signature;
    use nxv_wallet::domain::abi::{encode, Token};
    use nxv_wallet::domain::entities::Operation;
    use nxv_wallet::domain::signatures::{encode_signatures, SignatureRecord};
    use nxv_wallet::domain::typed_data::TypedDataHasher;
    use nxv_wallet::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
    use nxv_wallet::errors::{AuthorizationError, StateError, WalletError};
    use nxv_wallet::events::WalletEvent;
    use nxv_wallet::ports::outbound::{Contract, ExecutionHost};
    use nxv_wallet::vm::CallContext;
    use std::sync::Arc;

    /// `inner` is owned by `keys[0]` alone; `outer` is owned by `inner` and
    /// `keys[1]` with threshold 2.
    struct Nested {
        world: World,
        keys: Vec<LocalSigner>,
        inner: Address,
        outer: Address,
    }

    fn nested(config: WalletConfig) -> Nested {
        let mut world = World::with_config(config);
        let keys = signers(2);
        let inner = world.create_wallet(&[address_of(&keys[0])], 1, 0).expect("inner");
        let outer = world
            .create_wallet(&[inner, address_of(&keys[1])], 2, 1)
            .expect("outer");
        Nested { world, keys, inner, outer }
    }

    /// Proof `signer` gives for `inner` approving `hash`.
    fn inner_proof(world: &World, inner: Address, hash: Hash, signer: &LocalSigner) -> Bytes {
        let message = encode(&[Token::FixedBytes(hash)]);
        let message_hash = TypedDataHasher::new(world.chain_id(), inner).message_hash(&message);
        encode_signatures(&[SignatureRecord::ecdsa(
            address_of(signer),
            signer.sign_hash(message_hash.as_bytes()),
        )])
    }

    fn outer_signatures(n: &Nested, op: &Operation, proof: Bytes) -> Bytes {
        let hash = n.world.transaction_hash(n.outer, op);
        encode_signatures(&[
            SignatureRecord::contract(n.inner, proof),
            SignatureRecord::ecdsa(address_of(&n.keys[1]), n.keys[1].sign_hash(hash.as_bytes())),
        ])
    }

    #[test]
    fn test_wallet_signs_for_wallet() {
        let mut n = nested(WalletConfig::default());
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());
        let hash = n.world.transaction_hash(n.outer, &op);

        let proof = inner_proof(&n.world, n.inner, hash, &n.keys[0]);
        let signatures = outer_signatures(&n, &op, proof);
        n.world.execute(n.outer, &op, &signatures).expect("nested authorization");
        assert!(n.world.is_nonce_used(n.outer, 0));
    }

    #[test]
    fn test_bad_inner_proof_rejected() {
        let mut n = nested(WalletConfig::default());
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());
        let hash = n.world.transaction_hash(n.outer, &op);

        // keys[1] is not an owner of the inner wallet
        let proof = inner_proof(&n.world, n.inner, hash, &n.keys[1]);
        let signatures = outer_signatures(&n, &op, proof);
        let err = n.world.execute(n.outer, &op, &signatures).unwrap_err();

        assert_eq!(err, AuthorizationError::ContractSignatureRejected(n.inner).into());
        assert!(!n.world.is_nonce_used(n.outer, 0));
    }

    #[test]
    fn test_approved_message_replaces_proof() {
        let mut n = nested(WalletConfig::default());
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());
        let hash = n.world.transaction_hash(n.outer, &op);

        // inner wallet approves the outer operation hash on-chain
        let approve = Operation::delegate_call(
            n.world.contracts.sign_message_lib,
            encode_sign_message(&encode(&[Token::FixedBytes(hash)])),
            U256::zero(),
        );
        n.world.execute_signed(n.inner, &approve, &[&n.keys[0]]).expect("signMessage");

        let signatures = outer_signatures(&n, &op, Bytes::new());
        n.world.execute(n.outer, &op, &signatures).expect("approved hash");
    }

    #[test]
    fn test_unapproved_empty_proof_rejected() {
        let mut n = nested(WalletConfig::default());
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());

        let signatures = outer_signatures(&n, &op, Bytes::new());
        let err = n.world.execute(n.outer, &op, &signatures).unwrap_err();
        assert_eq!(err, AuthorizationError::ContractSignatureRejected(n.inner).into());
    }

    #[test]
    fn test_validation_depth_capped() {
        let config = WalletConfig {
            max_validation_depth: 1,
            ..WalletConfig::default()
        };
        let mut n = nested(config);
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());
        let hash = n.world.transaction_hash(n.outer, &op);

        let proof = inner_proof(&n.world, n.inner, hash, &n.keys[0]);
        let signatures = outer_signatures(&n, &op, proof);
        let err = n.world.execute(n.outer, &op, &signatures).unwrap_err();

        // proxy frame 0, singleton frame 1
        assert_eq!(err, AuthorizationError::ValidationDepthExceeded { depth: 1 }.into());
    }

    // =========================================================================
    // REENTRANCY
    // =========================================================================

    const REENTER: Address = Address::from_low_u64(0x4ee);
    const OUTCOME: StorageKey = StorageKey::slot(0);

    /// Replays the wallet call that invoked it and records whether the
    /// replay was refused as a used nonce.
    #[derive(Debug)]
    struct Reenter {
        replay: Bytes,
    }

    impl Contract for Reenter {
        fn name(&self) -> &'static str {
            "Reenter"
        }

        fn execute(&self, ctx: &mut CallContext<'_>, _input: &[u8]) -> Result<Bytes, WalletError> {
            let wallet = ctx.caller();
            let refused = matches!(
                ctx.call(wallet, U256::zero(), self.replay.as_slice()),
                Err(WalletError::State(StateError::NonceAlreadyUsed(_)))
            );
            if refused {
                ctx.sstore(OUTCOME, StorageValue::ONE)?;
            }
            Ok(Bytes::new())
        }
    }

    #[test]
    fn test_reentrant_replay_refused() {
        let mut world = World::new();
        let key = signers(1).remove(0);
        let wallet = world.create_wallet(&[address_of(&key)], 1, 0).expect("wallet");

        let op = Operation::call(REENTER, U256::zero(), Bytes::new(), U256::zero());
        let signatures = world.sign(wallet, &op, &[&key]);
        let replay = encode_batch_signature(&op, signatures.as_slice());
        world
            .host
            .create(RELAYER, REENTER, Arc::new(Reenter { replay }))
            .expect("reenter");

        world.execute(wallet, &op, &signatures).expect("outer call");
        assert_eq!(world.host.storage(REENTER, OUTCOME), StorageValue::ONE);
        let successes = world
            .host
            .events_of(wallet)
            .into_iter()
            .filter(|event| matches!(event, WalletEvent::ExecutionSuccess { .. }))
            .count();
        assert_eq!(successes, 1);
    }
}
