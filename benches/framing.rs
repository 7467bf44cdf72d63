//! Frame scanner and packet codec benchmarks
//!
//! Measures the per-byte scan that sits on every connection's read
//! path, under friendly (whole frames) and hostile (tiny chunks)
//! arrival patterns.
//!
//! Run with: cargo bench --bench framing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use relaybus::{FrameScanner, Packet};

/// A realistic emit frame with a packed record inside.
fn sample_frame() -> String {
    serde_json::json!({
        "type": "emit",
        "eventName": "onRecvPacket",
        "data": {"packet": "0000002A0200000BB8075BCD15DEADBEEF48656C6C6F"},
        "id": "3f2a77d1-6f0e-4e3a-9327-0c8a5c4d9b1e"
    })
    .to_string()
}

fn bench_scanner(c: &mut Criterion) {
    let stream = sample_frame().repeat(64);
    let bytes = stream.as_bytes();

    let mut group = c.benchmark_group("scanner");
    group.throughput(criterion::Throughput::Bytes(bytes.len() as u64));

    group.bench_function("64_frames_one_chunk", |b| {
        b.iter(|| {
            let mut scanner = FrameScanner::new();
            black_box(scanner.push(black_box(bytes)))
        })
    });

    for chunk in [7usize, 64, 1024] {
        group.bench_with_input(
            BenchmarkId::new("64_frames_chunked", chunk),
            &chunk,
            |b, &chunk| {
                b.iter(|| {
                    let mut scanner = FrameScanner::new();
                    let mut frames = 0;
                    for piece in bytes.chunks(chunk) {
                        frames += scanner.push(piece).len();
                    }
                    black_box(frames)
                })
            },
        );
    }
    group.finish();
}

fn bench_packet(c: &mut Criterion) {
    let packet = Packet {
        length: 42,
        version: 2,
        cmd: 3000,
        account: 123_456_789,
        checksum: 0xDEAD_BEEF,
        data: "48656C6C6F20776F726C64".to_string(),
    };
    let text = packet.pack();

    c.bench_function("packet_pack", |b| b.iter(|| black_box(&packet).pack()));
    c.bench_function("packet_unpack", |b| {
        b.iter(|| Packet::unpack(black_box(&text)).unwrap())
    });
}

criterion_group!(benches, bench_scanner, bench_packet);
criterion_main!(benches);
