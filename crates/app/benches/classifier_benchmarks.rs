//! Classifier benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dom::MessageData;
use sandbox::{Classifier, ContainmentPolicy, EscapeSignal, KeyPolicy, Origin, SignalContext};
use std::sync::Arc;

fn classifier() -> Classifier {
    Classifier::new(
        Arc::new(ContainmentPolicy::default()),
        Origin::parse("https://safeview.app"),
    )
}

/// Benchmark message classification.
fn bench_messages(c: &mut Criterion) {
    let classifier = classifier();
    let ctx = SignalContext {
        locked: true,
        playing: true,
    };

    let status = EscapeSignal::CrossOriginMessage {
        origin: "https://www.youtube-nocookie.com".to_string(),
        payload: MessageData::Text(
            r#"{"event":"infoDelivery","info":{"currentTime":12.5}}"#.to_string(),
        ),
    };
    let untrusted = EscapeSignal::CrossOriginMessage {
        origin: "https://evil.example".to_string(),
        payload: MessageData::Text(r#"{"event":"navigate_out"}"#.to_string()),
    };
    let unstructured = EscapeSignal::CrossOriginMessage {
        origin: "https://www.youtube-nocookie.com".to_string(),
        payload: MessageData::Text("ping".to_string()),
    };

    let mut group = c.benchmark_group("message_classification");

    group.bench_function("safe_status", |b| {
        b.iter(|| classifier.classify(black_box(&status), ctx))
    });

    group.bench_function("untrusted_origin", |b| {
        b.iter(|| classifier.classify(black_box(&untrusted), ctx))
    });

    group.bench_function("unstructured", |b| {
        b.iter(|| classifier.classify(black_box(&unstructured), ctx))
    });

    group.finish();
}

/// Benchmark key policy lookups.
fn bench_keys(c: &mut Criterion) {
    let policy = KeyPolicy::default();
    let keys = ["f", "Escape", "a", "ArrowLeft", "7", "Enter"];

    c.bench_function("key_policy_action", |b| {
        b.iter(|| {
            for key in keys {
                black_box(policy.action(black_box(key)));
            }
        })
    });
}

criterion_group!(benches, bench_messages, bench_keys);
criterion_main!(benches);
