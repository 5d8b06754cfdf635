//! # Signature Benchmarks
//!
//! Cost of the authorization path at increasing thresholds.
//!
//! ```bash
//! cargo bench --package nxv-tests --bench signature_benchmarks
//! cargo bench --package nxv-tests --bench signature_benchmarks -- execute
//! ```
//!
//! | Group | Measures |
//! |-------|----------|
//! | `recover` | one secp256k1 recovery, typed-data and EIP-191 digests |
//! | `decode` | splitting a packed signature blob into records |
//! | `execute` | a full `batchSignature` on a fresh wallet |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use nxv_signature::EcdsaVerifier;
use nxv_tests::fixtures::{address_of, signers, World};
use nxv_wallet::domain::entities::Operation;
use nxv_wallet::domain::signatures::{decode_signatures, encode_signatures, SignatureRecord};
use nxv_wallet::domain::value_objects::{Address, Bytes, U256};
use std::time::Duration;

const THRESHOLDS: [u8; 4] = [1, 3, 7, 15];

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");
    let signer = &signers(1)[0];
    let hash = [0x42u8; 32];
    let typed = signer.sign_hash(&hash);
    let eth = signer.sign_eth_message(&hash);
    let verifier = EcdsaVerifier::new();

    group.bench_function("typed_data", |b| {
        b.iter(|| verifier.verify_ecdsa(black_box(&hash), black_box(&typed)));
    });
    group.bench_function("eth_signed_message", |b| {
        b.iter(|| verifier.verify_ecdsa(black_box(&hash), black_box(&eth)));
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for threshold in THRESHOLDS {
        let keys = signers(threshold);
        let hash = [7u8; 32];
        let records: Vec<_> = keys
            .iter()
            .map(|key| SignatureRecord::ecdsa(address_of(key), key.sign_hash(&hash)))
            .collect();
        let blob = encode_signatures(&records);

        group.throughput(Throughput::Elements(u64::from(threshold)));
        group.bench_with_input(BenchmarkId::from_parameter(threshold), &blob, |b, blob| {
            b.iter(|| decode_signatures(black_box(blob.as_slice()), usize::from(threshold)));
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    group.sample_size(20);
    for threshold in THRESHOLDS {
        let keys = signers(threshold);
        let owners: Vec<_> = keys.iter().map(address_of).collect();
        let op = Operation::call(Address::from_low_u64(0xc), U256::zero(), Bytes::new(), U256::zero());

        group.throughput(Throughput::Elements(u64::from(threshold)));
        group.bench_function(BenchmarkId::from_parameter(threshold), |b| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    let wallet = world
                        .create_wallet(&owners, u64::from(threshold), 0)
                        .expect("wallet");
                    let refs: Vec<_> = keys.iter().collect();
                    let signatures = world.sign(wallet, &op, &refs);
                    (world, wallet, signatures)
                },
                |(mut world, wallet, signatures)| world.execute(wallet, &op, &signatures),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    name = signature_benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_recover, bench_decode, bench_execute
);
criterion_main!(signature_benches);
