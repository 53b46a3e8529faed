//! Envelope codec benchmarks for huddle-events.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use huddle_events::{codec, Delivery, Envelope, Message, ServerEvent, Target, User};

fn message_envelope(text_len: usize) -> Envelope {
    let user = User::placeholder(&"conn-bench".into());
    let msg = Message::new(
        user,
        "x".repeat(text_len),
        None,
        None,
        Some("bench:room".into()),
    );
    Envelope::new(
        "proc-bench",
        Delivery::new(Target::room("bench:room"), ServerEvent::Message(msg)),
    )
}

fn bench_encode_small(c: &mut Criterion) {
    let envelope = message_envelope(64);

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::encode(black_box(&envelope)))
    });
    group.finish();
}

fn bench_decode_small(c: &mut Criterion) {
    let envelope = message_envelope(64);
    let encoded = codec::encode(&envelope).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::decode(black_box(&encoded)))
    });
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let envelope = message_envelope(256);

    c.bench_function("roundtrip_256B", |b| {
        b.iter(|| {
            let encoded = codec::encode(black_box(&envelope)).unwrap();
            codec::decode(black_box(&encoded)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode_small,
    bench_decode_small,
    bench_roundtrip
);
criterion_main!(benches);
