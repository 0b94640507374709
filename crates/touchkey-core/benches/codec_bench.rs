//! Criterion benchmarks for the link protocol text codec.
//!
//! Every touch event produces one full-width key-state frame, so encoding and
//! decoding sit on the input path of both ends.
//!
//! Run with:
//! ```bash
//! cargo bench --package touchkey-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use touchkey_core::{
    decode_client_message, encode_client_message, ClientMessage, KeyStateVector,
};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_key_state(len: usize) -> ClientMessage {
    ClientMessage::KeyState(KeyStateVector::from_active(len, (0..len).step_by(3)))
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_client_message");
    group.bench_function("Probe", |b| {
        b.iter(|| encode_client_message(black_box(&ClientMessage::Probe)))
    });
    for &len in &[16usize, 64, 256] {
        let msg = make_key_state(len);
        group.bench_with_input(BenchmarkId::new("KeyState", len), &msg, |b, msg| {
            b.iter(|| encode_client_message(black_box(msg)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_client_message");
    group.bench_function("Probe", |b| {
        b.iter(|| decode_client_message(black_box("alive?")).expect("decode must succeed"))
    });
    for &len in &[16usize, 64, 256] {
        let frame = encode_client_message(&make_key_state(len));
        group.bench_with_input(BenchmarkId::new("KeyState", len), &frame, |b, frame| {
            b.iter(|| decode_client_message(black_box(frame)).expect("decode must succeed"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
