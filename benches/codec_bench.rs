//! Performance benchmarks for keyserver-chain encoding.
//!
//! - Parsing amino JSON transactions
//! - Building canonical sign documents
//! - Amino binary encoding of transactions
//! - Decoding simulation results

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyserver_chain::amino::{decode_gas_used, encode_std_tx};
use keyserver_chain::gas::bank_send_tx;
use keyserver_chain::SignDocument;
use keyserver_core::types::{Coins, SignContext, StdTx};
use keyserver_core::AccAddress;

const ADDRESS: &str = "cosmos1yv6alpum5r0nmnzkk4esp3cs5d58h8g95mvs50";

fn sample_tx(memo_len: usize) -> StdTx {
    let address: AccAddress = ADDRESS.parse().unwrap();
    bank_send_tx(
        address.clone(),
        address,
        Coins::parse("10stake,250uatom").unwrap(),
        Coins::parse("5stake").unwrap(),
        "m".repeat(memo_len),
    )
}

fn benchmark_json_parsing(c: &mut Criterion) {
    let json = sample_tx(64).to_json().unwrap();

    c.bench_function("json/parse_std_tx", |b| {
        b.iter(|| {
            let tx = StdTx::from_json(black_box(&json)).unwrap();
            black_box(tx)
        });
    });
}

fn benchmark_sign_document(c: &mut Criterion) {
    let context = SignContext::parse("test-chain", "12", "7").unwrap();

    let mut group = c.benchmark_group("sign_document");
    for memo_len in [0usize, 256, 4096] {
        let tx = sample_tx(memo_len);
        group.bench_with_input(BenchmarkId::from_parameter(memo_len), &tx, |b, tx| {
            b.iter(|| {
                let doc = SignDocument::new(black_box(tx), &context).unwrap();
                black_box(doc)
            });
        });
    }
    group.finish();
}

fn benchmark_amino_encoding(c: &mut Criterion) {
    let tx = sample_tx(64);

    c.bench_function("amino/encode_std_tx", |b| {
        b.iter(|| {
            let bytes = encode_std_tx(black_box(&tx)).unwrap();
            black_box(bytes)
        });
    });
}

fn benchmark_gas_decoding(c: &mut Criterion) {
    // len=4, key (6 << 3 | 0), varint 100000
    let result = [0x04, 0x30, 0xa0, 0x8d, 0x06];

    c.bench_function("amino/decode_gas_used", |b| {
        b.iter(|| {
            let gas = decode_gas_used(black_box(&result)).unwrap();
            black_box(gas)
        });
    });
}

criterion_group!(
    benches,
    benchmark_json_parsing,
    benchmark_sign_document,
    benchmark_amino_encoding,
    benchmark_gas_decoding,
);

criterion_main!(benches);
