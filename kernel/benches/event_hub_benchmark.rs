/*!
 * Event Hub Benchmarks
 *
 * Raise/drain throughput and projection cost on the completion hot path
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nimbus_kernel::event::{complete, AsyncOp, Completion, EventRecord, OpPayload};
use nimbus_kernel::syscalls::EventManager;
use nimbus_kernel::Scheduler;
use std::sync::Arc;

fn bench_raise_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("raise_drain");

    for batch in [1usize, 16, 64] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_function(format!("batch_{batch}"), |b| {
            let sched = Arc::new(Scheduler::new());
            let mgr = EventManager::with_inline_sink(sched.clone());
            let hub = mgr.create_event_hub();
            let target = mgr.hub(hub).unwrap();
            let mut out = vec![EventRecord::default(); batch];

            b.iter(|| {
                for i in 0..batch {
                    let op = AsyncOp::new(
                        OpPayload::MemoryLoad {
                            offset: i as u64 * 0x1000,
                            length: 0x1000,
                        },
                        Completion::PostToHub {
                            hub: Arc::downgrade(&target),
                            submit_info: i as u128,
                        },
                    );
                    complete(op, &sched);
                }
                let n = mgr.wait_for_events(hub, &mut out, 0).unwrap();
                black_box(n);
            });
        });
    }

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    c.bench_function("project_recv_descriptor", |b| {
        let op = AsyncOp::new(
            OpPayload::RecvDescriptor {
                msg_request: 3,
                msg_sequence: 11,
                handle: 42,
            },
            Completion::Discard,
        );
        b.iter(|| black_box(op.project()));
    });
}

fn bench_record_encode(c: &mut Criterion) {
    c.bench_function("record_encode", |b| {
        let op = AsyncOp::new(
            OpPayload::MemoryLoad {
                offset: 0x4000,
                length: 0x1000,
            },
            Completion::Discard,
        );
        let rec = op.project();
        let mut buf = [0u8; EventRecord::WIRE_SIZE];
        b.iter(|| {
            rec.encode_into(black_box(&mut buf)).unwrap();
        });
    });
}

criterion_group!(benches, bench_raise_drain, bench_projection, bench_record_encode);
criterion_main!(benches);
