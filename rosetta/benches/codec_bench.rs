// Codec benchmarks for hmy-rosetta.
//
// Covers forward encoding of plain and staking transactions (including
// sender recovery), the pre-staking reward split over growing signer sets,
// and reverse parsing of a client transfer.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ethereum_types::U256;
use secp256k1::SecretKey;

use hmy_rosetta::chain::address::Address;
use hmy_rosetta::chain::staking::{BlsKey, StakeMsg, Undelegate};
use hmy_rosetta::chain::types::{
    BlockSigners, Receipt, ReceiptStatus, Signature, SignerKeys, StakingTransaction, Transaction,
};
use hmy_rosetta::config::NetworkKind;
use hmy_rosetta::services::{OperationEncoder, OperationParser, SyntheticFormatter};
use hmy_rosetta::types::TransactionIdentifier;
use hmy_rosetta::RosettaConfig;

fn config() -> RosettaConfig {
    RosettaConfig::new(NetworkKind::Mainnet, 0).with_staking_epoch(10)
}

fn key() -> SecretKey {
    SecretKey::from_slice(&[0x5a; 32]).unwrap()
}

fn transfer() -> Transaction {
    Transaction {
        nonce: 42,
        gas_price: U256::from(1_000_000_000u64),
        gas_limit: 21_000,
        shard_id: 0,
        to_shard_id: 0,
        to: Some(Address::repeat_byte(0x42)),
        value: U256::from(500u64),
        data: vec![],
        signature: Signature::default(),
    }
    .sign(&key(), 1)
    .unwrap()
}

fn receipt() -> Receipt {
    Receipt {
        tx_hash: transfer().hash(),
        status: ReceiptStatus::Success,
        gas_used: 21_000,
        logs: vec![],
        contract_address: Address::zero(),
    }
}

fn bench_encode_transfer(c: &mut Criterion) {
    let encoder = OperationEncoder::new(&config());
    let tx = transfer();
    let receipt = receipt();

    c.bench_function("codec/encode_transfer", |b| {
        b.iter(|| encoder.operations(&tx, &receipt).unwrap());
    });
}

fn bench_encode_staking(c: &mut Criterion) {
    let encoder = OperationEncoder::new(&config());
    let stx = StakingTransaction {
        nonce: 1,
        gas_price: U256::one(),
        gas_limit: 50_000,
        msg: StakeMsg::Undelegate(Undelegate {
            delegator_address: Address::repeat_byte(1),
            validator_address: Address::repeat_byte(2),
            amount: U256::from(10u64),
        }),
        signature: Signature::default(),
    }
    .sign(&key(), 1)
    .unwrap();
    let receipt = receipt();

    c.bench_function("codec/encode_undelegate", |b| {
        b.iter(|| encoder.staking_operations(&stx, &receipt).unwrap());
    });
}

fn bench_reward_split(c: &mut Criterion) {
    let formatter = SyntheticFormatter::new(&config());
    let id = TransactionIdentifier {
        hash: "bench".into(),
    };
    let mut group = c.benchmark_group("codec/pre_staking_reward");

    for signers in [10usize, 100, 1_000] {
        let set = BlockSigners {
            signers: (0..signers)
                .map(|i| SignerKeys {
                    address: Address::from_low_u64_be(i as u64 + 1),
                    keys: vec![BlsKey(vec![0u8; 48]); 1 + i % 4],
                })
                .collect(),
        };
        // Last signer forces a full scan.
        let target = Address::from_low_u64_be(signers as u64);
        group.throughput(Throughput::Elements(signers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(signers), &set, |b, set| {
            b.iter(|| formatter.pre_staking_reward(id.clone(), set, &target).unwrap());
        });
    }
    group.finish();
}

fn bench_parse_transfer(c: &mut Criterion) {
    let parser = OperationParser::new(&config());
    let encoder = OperationEncoder::new(&config());
    let tx = transfer();
    let ops: Vec<_> = encoder
        .operations(&tx, &receipt())
        .unwrap()
        .into_iter()
        .skip(1)
        .map(|mut op| {
            op.status = None;
            op.operation_identifier.index -= 1;
            op.related_operations.retain(|r| r.index != 0);
            for related in &mut op.related_operations {
                related.index -= 1;
            }
            op
        })
        .collect();

    c.bench_function("codec/parse_transfer", |b| {
        b.iter(|| parser.parse(&ops).unwrap());
    });
}

criterion_group!(
    benches,
    bench_encode_transfer,
    bench_encode_staking,
    bench_reward_split,
    bench_parse_transfer,
);
criterion_main!(benches);
