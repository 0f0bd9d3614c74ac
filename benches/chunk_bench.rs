// Chunk cache throughput: sequential and strided element access through
// the write-back cache.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use silt::{Chunk, ChunkOptions, EngineConfig, IoEngine, PagePool, StorageRegion};

struct Fixture {
    _dir: tempfile::TempDir,
    engine: IoEngine,
    pool: Arc<PagePool>,
    region: Arc<StorageRegion>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let pool = Arc::new(PagePool::new(64, 17).unwrap());
    let region =
        Arc::new(StorageRegion::create(dir.path().join("bench.bin"), 1 << 30).unwrap());
    let engine = IoEngine::open(EngineConfig::default()).unwrap();
    Fixture {
        _dir: dir,
        engine,
        pool,
        region,
    }
}

fn bench_sequential_write(c: &mut Criterion) {
    let fx = fixture();
    let mut chunk = Chunk::create(
        &fx.engine,
        fx.region.clone(),
        fx.pool.clone(),
        4 << 20,
        ChunkOptions::default(),
    )
    .unwrap();
    let elems = chunk.len();

    c.bench_function("sequential_write_4mib", |b| {
        b.iter(|| {
            for i in 0..elems {
                chunk.try_write(i, black_box(i as f64 * 0.1)).unwrap();
            }
        })
    });
    chunk.close().unwrap();
}

fn bench_sequential_read(c: &mut Criterion) {
    let fx = fixture();
    let mut chunk = Chunk::create(
        &fx.engine,
        fx.region.clone(),
        fx.pool.clone(),
        4 << 20,
        ChunkOptions::default(),
    )
    .unwrap();
    let elems = chunk.len();
    for i in 0..elems {
        chunk.try_write(i, i as f64).unwrap();
    }
    chunk.sync().unwrap();

    c.bench_function("sequential_read_4mib", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..elems {
                acc += chunk.try_read(i).unwrap();
            }
            black_box(acc)
        })
    });
    chunk.close().unwrap();
}

fn bench_strided_read_out_of_core(c: &mut Criterion) {
    let fx = fixture();
    // Working set of 16 lines against 64 pages: constant eviction churn.
    let mut chunk = Chunk::create(
        &fx.engine,
        fx.region.clone(),
        fx.pool.clone(),
        64 << 17,
        ChunkOptions {
            cache_lines: 16,
            ..ChunkOptions::default()
        },
    )
    .unwrap();
    let elems = chunk.len();
    for i in 0..elems {
        chunk.try_write(i, 42.0).unwrap();
    }
    chunk.sync().unwrap();

    c.bench_function("strided_read_64_pages", |b| {
        b.iter(|| {
            let mut j = 0u64;
            let mut acc = 0.0;
            for _ in 0..4096 {
                acc += chunk.try_read(j).unwrap();
                j = (j + 999_999) % elems;
            }
            black_box(acc)
        })
    });
    chunk.close().unwrap();
}

criterion_group!(
    benches,
    bench_sequential_write,
    bench_sequential_read,
    bench_strided_read_out_of_core
);
criterion_main!(benches);
