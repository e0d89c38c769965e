#[macro_use]
extern crate criterion;

use criterion::{BenchmarkId, Criterion, Throughput};

use blockpool_core::alloc::PoolAllocator;

fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free_cycle");

    for live_blocks in [0usize, 64, 512] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(live_blocks),
            &live_blocks,
            |b, &live_blocks| {
                let pool = PoolAllocator::with_capacity(1 << 20).unwrap();
                // Occupy the front of the arena so first-fit has to walk.
                for _ in 0..live_blocks {
                    pool.allocate(128).unwrap();
                }
                b.iter(|| {
                    let handle = pool.allocate(256).unwrap().unwrap();
                    pool.free(handle).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_resize_relocation(c: &mut Criterion) {
    c.bench_function("resize_relocate_4k", |b| {
        let pool = PoolAllocator::with_capacity(1 << 20).unwrap();
        b.iter(|| {
            let handle = pool.allocate(1024).unwrap();
            let blocker = pool.allocate(64).unwrap().unwrap();
            let moved = pool.resize(handle, 4096).unwrap().unwrap();
            pool.free(moved).unwrap();
            pool.free(blocker).unwrap();
        });
    });
}

criterion_group!(benches, bench_allocate_free, bench_resize_relocation);
criterion_main!(benches);
