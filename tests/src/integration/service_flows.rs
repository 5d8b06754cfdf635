//! # Service Flows
//!
//! The async `MultisigWalletApi` end to end: deployment, wallet creation,
//! submission receipts, statistics, concurrent submissions of one signed
//! operation, and runaway recursion under the default call-depth cap.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address_of, init_tracing, signers, DEPLOYER, RELAYER};
    use nxv_signature::testing::LocalSigner;
    use nxv_wallet::config::DEFAULT_CALL_DEPTH;
    use nxv_wallet::domain::entities::Operation;
    use nxv_wallet::domain::invariants::InvariantCheckResult;
    use nxv_wallet::domain::signatures::{encode_signatures, SignatureRecord};
    use nxv_wallet::domain::value_objects::{Address, Bytes, U256};
    use nxv_wallet::errors::{ExecutionError, StateError, WalletError};
    use nxv_wallet::events::WalletEvent;
    use nxv_wallet::ports::inbound::{CreateWalletRequest, MultisigWalletApi};
    use nxv_wallet::ports::outbound::{Contract, ExecutionHost};
    use nxv_wallet::service::{create_test_service, ServiceStats, WalletService};
    use nxv_wallet::vm::CallContext;
    use std::sync::Arc;
    use uuid::Uuid;

    const C: Address = Address::from_low_u64(0xc);

    async fn deployed_wallet(keys: &[LocalSigner], threshold: u64) -> (WalletService, Address) {
        init_tracing();
        let service = create_test_service();
        service.deploy(DEPLOYER).await.expect("deploy");
        let request = CreateWalletRequest {
            owners: keys.iter().map(address_of).collect(),
            threshold: U256::from(threshold),
            fallback_handler: None,
            salt_nonce: U256::zero(),
        };
        let wallet = service.create_wallet(DEPLOYER, request).await.expect("wallet");
        (service, wallet)
    }

    async fn sign(service: &WalletService, wallet: Address, op: &Operation, keys: &[LocalSigner]) -> Bytes {
        let hash = service.transaction_hash(wallet, op).await.expect("hash");
        let records: Vec<_> = keys
            .iter()
            .map(|key| SignatureRecord::ecdsa(address_of(key), key.sign_hash(hash.as_bytes())))
            .collect();
        encode_signatures(&records)
    }

    #[tokio::test]
    async fn test_full_service_flow() {
        let keys = signers(3);
        let (service, wallet) = deployed_wallet(&keys, 2).await;
        service.host().write().await.set_balance(wallet, U256::from(5));

        assert_eq!(service.owners(wallet).await, Ok(keys.iter().map(address_of).collect()));
        assert_eq!(service.threshold(wallet).await, Ok(U256::from(2)));

        let op = Operation::call(C, U256::from(2), Bytes::new(), U256::zero());
        let signatures = sign(&service, wallet, &op, &keys[1..]).await;
        let correlation_id = Uuid::new_v4();
        let receipt = service
            .submit_with_id(correlation_id, RELAYER, wallet, op, signatures)
            .await
            .expect("submit");

        assert_eq!(receipt.correlation_id, correlation_id);
        assert!(receipt.success);
        assert_eq!(receipt.nonce, U256::zero());
        assert_eq!(receipt.events, vec![WalletEvent::ExecutionSuccess { tx_hash: receipt.tx_hash }]);
        assert_eq!(service.is_nonce_used(wallet, U256::zero()).await, Ok(true));
        assert_eq!(service.host().read().await.balance(C), U256::from(2));

        assert!(matches!(service.verify_invariants(wallet).await, InvariantCheckResult::Valid));
        assert_eq!(
            service.stats().await,
            ServiceStats {
                operations_executed: 1,
                operations_succeeded: 1,
                wallets_created: 1,
                ..ServiceStats::default()
            }
        );
    }

    #[tokio::test]
    async fn test_prediction_before_creation() {
        init_tracing();
        let service = create_test_service();
        let deployment = service.deploy(DEPLOYER).await.expect("deploy");
        let request = CreateWalletRequest {
            owners: vec![address_of(&signers(1)[0])],
            threshold: U256::one(),
            fallback_handler: Some(deployment.fallback_handler),
            salt_nonce: U256::from(11),
        };

        let predicted = service.predict_wallet_address(&request).await.expect("predict");
        assert!(!service.host().read().await.has_code(predicted));
        let wallet = service.create_wallet(RELAYER, request).await.expect("create");
        assert_eq!(wallet, predicted);
    }

    #[tokio::test]
    async fn test_concurrent_replays_execute_once() {
        let keys = signers(1);
        let (service, wallet) = deployed_wallet(&keys, 1).await;
        let service = Arc::new(service);

        let op = Operation::call(C, U256::zero(), Bytes::new(), U256::from(7));
        let signatures = sign(&service, wallet, &op, &keys).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let op = op.clone();
                let signatures = signatures.clone();
                tokio::spawn(async move { service.submit(RELAYER, wallet, op, signatures).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.expect("task") {
                Ok(receipt) => {
                    assert!(receipt.success);
                    accepted += 1;
                }
                Err(err) => assert_eq!(err, StateError::NonceAlreadyUsed(U256::from(7)).into()),
            }
        }
        assert_eq!(accepted, 1);

        let stats = service.stats().await;
        assert_eq!(stats.operations_executed, 8);
        assert_eq!(stats.operations_succeeded, 1);
        assert_eq!(stats.operations_rejected, 7);
    }

    #[tokio::test]
    async fn test_reverted_operation_counts_as_failed() {
        let keys = signers(1);
        let (service, wallet) = deployed_wallet(&keys, 1).await;

        // wallet holds no balance
        let op = Operation::call(C, U256::one(), Bytes::new(), U256::zero());
        let signatures = sign(&service, wallet, &op, &keys).await;
        let err = service.submit(RELAYER, wallet, op, signatures).await.unwrap_err();

        assert!(matches!(err, WalletError::Execution(_)));
        assert_eq!(service.is_nonce_used(wallet, U256::zero()).await, Ok(false));
        let stats = service.stats().await;
        assert_eq!(stats.operations_failed, 1);
        assert_eq!(stats.operations_rejected, 0);
    }

    /// Calls itself with its own input until the host refuses.
    #[derive(Debug)]
    struct SelfCaller;

    impl Contract for SelfCaller {
        fn name(&self) -> &'static str {
            "SelfCaller"
        }

        fn execute(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, WalletError> {
            let me = ctx.address();
            ctx.call(me, U256::zero(), input)
        }
    }

    #[tokio::test]
    async fn test_runaway_recursion_reverts_cleanly() {
        let keys = signers(1);
        let (service, wallet) = deployed_wallet(&keys, 1).await;
        let looper = Address::from_low_u64(0x100f);
        service.host().write().await.install(looper, Arc::new(SelfCaller));
        service.host().write().await.set_balance(wallet, U256::from(3));

        let op = Operation::call(looper, U256::one(), Bytes::new(), U256::zero());
        let signatures = sign(&service, wallet, &op, &keys).await;
        let err = service.submit(RELAYER, wallet, op, signatures).await.unwrap_err();

        assert_eq!(
            err.root_cause(),
            &WalletError::from(ExecutionError::CallDepthExceeded {
                depth: DEFAULT_CALL_DEPTH + 1,
                max: DEFAULT_CALL_DEPTH,
            })
        );
        assert_eq!(service.is_nonce_used(wallet, U256::zero()).await, Ok(false));
        let host = service.host();
        let host = host.read().await;
        assert_eq!(host.balance(wallet), U256::from(3));
        assert_eq!(host.balance(looper), U256::zero());
    }
}
