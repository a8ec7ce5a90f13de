//! IPC 编解码性能基准测试

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use gnode::system::ipc::codec::{decode, decode_ack, decode_marker, encode, encode_reply};
use gnode::system::ipc::{Command, Reply, ReplyShape};
use serde_json::{Value, json};

fn create_test_commands() -> Vec<(&'static str, Command)> {
    vec![
        ("api_version", Command::control("api_version")),
        ("read_channels", Command::read("channel/")),
        ("auth_off", Command::replace("set_api_auth_off")),
        ("switch", Command::switch(true)),
        (
            "create_channel",
            Command::create(
                "channel/mqtt-uplink",
                json!({
                    "type": "mqtt",
                    "host": "broker.example.com",
                    "port": 8883,
                    "topics": ["up/#", "join/#", "status/#"],
                    "tls": {"ca": "root.pem", "verify": true},
                }),
            ),
        ),
    ]
}

fn channel_listing(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| {
                json!({
                    "id": format!("channel_{}", i),
                    "type": "mqtt",
                    "enabled": i % 2 == 0,
                    "host": format!("10.0.0.{}", i % 255),
                    "port": 1883,
                })
            })
            .collect(),
    )
}

/// 请求编码性能
fn bench_encode_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("ipc/encode");

    for (name, command) in create_test_commands() {
        group.throughput(Throughput::Elements(1));
        group.bench_function(format!("command_{}", name), |b| {
            b.iter(|| {
                let _ = encode(&command);
            });
        });
    }

    group.finish();
}

/// 回复解码性能
fn bench_decode_replies(c: &mut Criterion) {
    let mut group = c.benchmark_group("ipc/decode");

    let flag = encode_reply(&Reply::Flag(true)).unwrap();
    let empty = encode_reply(&Reply::Text(String::new())).unwrap();
    let text = encode_reply(&Reply::Text("2.1".to_string())).unwrap();
    let doc = encode_reply(&Reply::Document(channel_listing(10))).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("reply_flag", |b| {
        b.iter(|| decode(&flag, ReplyShape::Flag).unwrap());
    });
    group.bench_function("reply_text", |b| {
        b.iter(|| decode(&text, ReplyShape::Text).unwrap());
    });
    group.bench_function("reply_document", |b| {
        b.iter(|| decode(&doc, ReplyShape::Document).unwrap());
    });
    group.bench_function("reply_ack", |b| {
        b.iter(|| decode_ack(&empty).unwrap());
    });
    group.bench_function("reply_marker", |b| {
        b.iter(|| decode_marker(b"OK", "OK").unwrap());
    });

    group.finish();
}

/// 通道列表解码性能
fn bench_listings(c: &mut Criterion) {
    let mut group = c.benchmark_group("ipc/listing");

    for count in [10, 100, 500] {
        let payload = encode_reply(&Reply::Document(channel_listing(count))).unwrap();

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_function(format!("listing_{}_channels", count), |b| {
            b.iter(|| decode(&payload, ReplyShape::Document).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_commands,
    bench_decode_replies,
    bench_listings
);
criterion_main!(benches);
