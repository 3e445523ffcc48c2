// Attestation benchmarks for the Meshmail identity layer.
//
// Covers Ed25519 keypair generation, attestation message construction,
// signing, verification, address validation, and backup encode/decode.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use meshmail_protocol::address::validate;
use meshmail_protocol::attestation::message::build_message;
use meshmail_protocol::attestation::verifier::verify_with_key;
use meshmail_protocol::backup;
use meshmail_protocol::crypto::keys::MeshKeypair;
use meshmail_protocol::keystore::{CredentialManager, MemoryStore};

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("ed25519/keypair_generate", |b| {
        b.iter(MeshKeypair::generate);
    });
}

fn bench_build_message(c: &mut Criterion) {
    let device = MeshKeypair::generate();
    let public_key_hex = device.public_key_hex();

    c.bench_function("attestation/build_message", |b| {
        b.iter(|| build_message("alice", &public_key_hex));
    });
}

fn bench_sign_attestation(c: &mut Criterion) {
    let authority = MeshKeypair::generate();
    let device = MeshKeypair::generate();
    let message = build_message("alice", &device.public_key_hex());

    c.bench_function("attestation/sign", |b| {
        b.iter(|| authority.sign(&message));
    });
}

fn bench_verify_attestation(c: &mut Criterion) {
    let authority = MeshKeypair::generate();
    let device = MeshKeypair::generate();
    let public_key_hex = device.public_key_hex();
    let signature = authority
        .sign(&build_message("alice", &public_key_hex))
        .to_base64();
    let authority_key = authority.public_key();

    c.bench_function("attestation/verify", |b| {
        b.iter(|| verify_with_key(&authority_key, "alice", &public_key_hex, &signature));
    });
}

fn bench_address_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("address/validate");

    for input in ["alice", "bob.smith.2024", "Admin", "help123"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| validate(input));
        });
    }

    group.finish();
}

fn bench_backup_roundtrip(c: &mut Criterion) {
    let manager = CredentialManager::new(MemoryStore::new());
    let keypair = manager.ensure_keypair().unwrap();
    manager
        .save_signature(&keypair.sign(b"attestation stand-in").to_base64())
        .unwrap();
    manager.save_handle(&validate("alice").unwrap()).unwrap();
    let transport = backup::encode(&manager).unwrap();

    c.bench_function("backup/encode", |b| {
        b.iter(|| backup::encode(&manager).unwrap());
    });

    let mut group = c.benchmark_group("backup/decode");
    group.throughput(Throughput::Bytes(transport.len() as u64));
    group.bench_function("restore", |b| {
        b.iter(|| {
            let target = CredentialManager::new(MemoryStore::new());
            backup::decode(&target, &transport).unwrap();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_build_message,
    bench_sign_attestation,
    bench_verify_attestation,
    bench_address_validation,
    bench_backup_roundtrip,
);
criterion_main!(benches);
