//! # Edge-Link Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Challenge issuance (OS entropy + policy check) | < 50μs |
//! | Payload encode / decode | < 50μs |
//! | Policy scan of a scan response | < 20μs |
//! | Full validation (six gates, Ed25519 verify) | < 200μs |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use shared_policy::SensitivityScanner;

use ql_01_account_linking::adapters::{Ed25519KeyStateVerifier, EdgeDevice};
use ql_01_account_linking::{ChallengeIssuer, PayloadCodec, ResponseValidator};

const ISSUED_AT: u64 = 1_752_832_800_000;
const CALLBACK: &str = "https://link.example.org/callback";

// ============================================================================
// ISSUANCE AND CODEC
// ============================================================================

fn bench_issue_and_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("ql-01-issue-codec");
    group.measurement_time(Duration::from_secs(5));

    let issuer = ChallengeIssuer::default();
    let codec = PayloadCodec::default();

    group.bench_function("issue", |b| {
        b.iter(|| issuer.issue_at(black_box(ISSUED_AT), Duration::from_secs(600)))
    });

    let challenge = issuer.issue_at(ISSUED_AT, Duration::from_secs(600)).unwrap();
    group.bench_function("encode", |b| {
        b.iter(|| codec.encode(black_box(&challenge), CALLBACK, "sandbox"))
    });

    let encoded = codec.encode(&challenge, CALLBACK, "sandbox").unwrap();
    group.throughput(Throughput::Bytes(encoded.size() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| codec.decode(black_box(encoded.as_str().as_bytes())))
    });

    group.finish();
}

// ============================================================================
// POLICY SCAN
// ============================================================================

fn wide_document(fields: usize) -> Value {
    let map = (0..fields)
        .map(|i| (format!("field_{i}"), json!(format!("value-{i:08x}"))))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

fn bench_policy_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-policy-scan");
    let scanner = SensitivityScanner::edge_protection();

    for fields in [8usize, 64, 512] {
        let document = wide_document(fields);
        group.throughput(Throughput::Elements(fields as u64));
        group.bench_with_input(BenchmarkId::new("fields", fields), &document, |b, doc| {
            b.iter(|| scanner.scan_value(black_box(doc)))
        });
    }

    group.finish();
}

// ============================================================================
// VALIDATION
// ============================================================================

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("ql-01-validate");

    let device = EdgeDevice::generate("addr1_sandbox_test_wallet_001");
    let verifier = Ed25519KeyStateVerifier::new();
    verifier.register(device.identifier(), device.verifying_key());
    let validator = ResponseValidator::new(SensitivityScanner::edge_protection());

    let challenge = ChallengeIssuer::default()
        .issue_at(ISSUED_AT, Duration::from_secs(600))
        .unwrap();
    let response = device.respond(challenge.value(), ISSUED_AT + 1_000).unwrap();

    group.bench_function("six_gates", |b| {
        b.iter(|| validator.validate(&challenge, black_box(&response), ISSUED_AT + 2_000, &verifier))
    });

    group.finish();
}

criterion_group!(benches, bench_issue_and_codec, bench_policy_scan, bench_validation);
criterion_main!(benches);
