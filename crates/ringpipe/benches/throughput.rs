use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringpipe::RingBuffer;
use std::sync::Arc;
use std::thread;

const TOTAL_BYTES: usize = 16 << 20; // 16 MiB per iteration

fn bench_blocking_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_spsc");
    group.throughput(Throughput::Bytes(TOTAL_BYTES as u64));

    for &ring_bytes in &[1usize << 12, 1 << 16, 1 << 20] {
        // Producer and consumer chunks together stay within the ring
        let chunk = ring_bytes / 4;

        group.bench_with_input(
            BenchmarkId::from_parameter(ring_bytes),
            &ring_bytes,
            |b, &ring_bytes| {
                b.iter(|| {
                    let ring = Arc::new(RingBuffer::new(ring_bytes, 1).unwrap());

                    let producer = {
                        let ring = Arc::clone(&ring);
                        thread::spawn(move || {
                            let data = vec![0xA5u8; chunk];
                            let mut sent = 0;
                            while sent < TOTAL_BYTES {
                                let len = chunk.min(TOTAL_BYTES - sent);
                                sent += ring.blocking_write(&data, len, None).unwrap();
                            }
                            ring.end_blocking();
                        })
                    };

                    let mut out = vec![0u8; chunk];
                    let mut received = 0;
                    while ring.is_alive() {
                        received += ring.blocking_read(&mut out, chunk, None).unwrap();
                        black_box(&out);
                    }

                    producer.join().unwrap();
                    assert_eq!(received, TOTAL_BYTES);
                });
            },
        );
    }

    group.finish();
}

fn bench_nonblocking_overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("nonblocking");
    let ring = RingBuffer::new(1 << 16, 1).unwrap();
    let data = vec![0x5Au8; 1 << 10];
    let mut out = vec![0u8; 1 << 10];

    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("write_read_1k", |b| {
        b.iter(|| {
            ring.write(black_box(&data), data.len()).unwrap();
            black_box(ring.read(&mut out, out.len()).unwrap());
        });
    });

    group.bench_function("overwrite_1k", |b| {
        b.iter(|| black_box(ring.write(black_box(&data), data.len()).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_blocking_spsc, bench_nonblocking_overwrite);
criterion_main!(benches);
