// Cache-level behavior: coalesced write-back, pool arbitration, eviction
// churn, and state-machine invariants under mixed workloads.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use silt::{
    Chunk, ChunkOptions, ChunkStats, EngineConfig, IoEngine, LineState, PagePool, SiltError,
    StorageRegion,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup(
    pool_pages: u32,
    block_order: u32,
    capacity: u64,
) -> (tempfile::TempDir, Arc<PagePool>, Arc<StorageRegion>, IoEngine) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let pool = Arc::new(PagePool::new(pool_pages, block_order).unwrap());
    let region = Arc::new(StorageRegion::create(dir.path().join("silt.bin"), capacity).unwrap());
    let engine = IoEngine::open(EngineConfig::default()).unwrap();
    (dir, pool, region, engine)
}

fn assert_invariants(stats: &ChunkStats) {
    let non_ready = stats
        .lines
        .iter()
        .filter(|l| l.state != LineState::Ready)
        .count();
    assert_eq!(stats.usage, non_ready, "usage must count non-ready lines");

    for line in &stats.lines {
        assert_eq!(
            stats.lines.iter().filter(|o| o.id == line.id).count(),
            1,
            "page {} resident in more than one line",
            line.id
        );
    }
}

#[test]
fn contiguous_dirty_pages_flush_as_one_batch() {
    let (_dir, pool, region, engine) = setup(4, 12, 8 << 12);
    let path = region.path().to_path_buf();
    let mut chunk = Chunk::create(
        &engine,
        region,
        pool,
        8 << 12,
        ChunkOptions {
            cache_lines: 4,
            ..ChunkOptions::default()
        },
    )
    .unwrap();

    let per_page = chunk.page_size() as u64 / 8;
    for page in [3u64, 4, 2, 5] {
        for e in 0..per_page {
            chunk.try_write(page * per_page + e, page as f64 * 1.5).unwrap();
        }
    }

    // Three evictions so far, merged into a single contiguous run; the
    // page written last is still resident and dirty.
    let stats = chunk.stats();
    assert_invariants(&stats);
    assert_eq!(stats.queued_batches, 1);
    assert_eq!(stats.queued_blocks, 3);
    for id in [2, 3, 4] {
        assert_eq!(stats.line_for(id).unwrap().state, LineState::AwaitingStore);
    }
    assert!(stats.line_for(5).unwrap().dirty);

    // Sync merges the last page into the run and persists ids {2,3,4,5}
    // with a single vectorised submission.
    let before = engine.stats().submissions;
    chunk.sync().unwrap();
    assert_eq!(engine.stats().submissions - before, 1);

    let stats = chunk.stats();
    assert_invariants(&stats);
    assert!(stats
        .lines
        .iter()
        .all(|l| l.state == LineState::Ready && !l.dirty));

    let bytes = std::fs::read(&path).unwrap();
    let page_size = chunk.page_size();
    for page in [2usize, 3, 4, 5] {
        for e in [0usize, page_size / 8 - 1] {
            let at = page * page_size + e * 8;
            let value = f64::from_ne_bytes(bytes[at..at + 8].try_into().unwrap());
            assert_eq!(value, page as f64 * 1.5, "page {page} elem {e}");
        }
    }
    chunk.close().unwrap();
}

#[test]
fn pool_exhaustion_then_recovery() {
    let (_dir, pool, region, engine) = setup(4, 12, 16 << 12);

    let mut first = Chunk::create(
        &engine,
        region.clone(),
        pool.clone(),
        4 << 12,
        ChunkOptions::default(),
    )
    .unwrap();
    assert_eq!(first.stats().resident_lines, 4);
    assert!(pool.is_empty());

    // No pages left for a second working set.
    let denied = Chunk::create(
        &engine,
        region.clone(),
        pool.clone(),
        4 << 12,
        ChunkOptions::default(),
    );
    assert!(matches!(denied, Err(SiltError::ResourceExhausted(_))));

    // Closing the first chunk hands its pages back.
    first.close().unwrap();
    assert!(!pool.is_empty());

    let mut second = Chunk::create(
        &engine,
        region,
        pool.clone(),
        4 << 12,
        ChunkOptions::default(),
    )
    .unwrap();
    second.try_write(0, 1.0).unwrap();
    second.close().unwrap();
    assert!(!pool.is_empty());
}

#[test]
fn chunk_larger_than_cache_evicts_and_reloads() {
    // 40 pages against the 32-line ceiling forces eviction churn.
    let (_dir, pool, region, engine) = setup(40, 12, 40 << 12);
    let mut chunk = Chunk::create(
        &engine,
        region,
        pool.clone(),
        40 << 12,
        ChunkOptions::default(),
    )
    .unwrap();
    assert_eq!(chunk.stats().resident_lines, 32);
    assert_eq!(chunk.stats().max_lines, 32);

    let per_page = chunk.page_size() as u64 / 8;
    for page in 0..40u64 {
        chunk.try_write(page * per_page, page as f64).unwrap();
        chunk
            .try_write(page * per_page + per_page - 1, -(page as f64))
            .unwrap();
    }
    assert_invariants(&chunk.stats());

    for page in (0..40u64).rev() {
        assert_eq!(chunk.try_read(page * per_page).unwrap(), page as f64);
        assert_eq!(
            chunk.try_read(page * per_page + per_page - 1).unwrap(),
            -(page as f64)
        );
    }
    assert_invariants(&chunk.stats());

    chunk.sync().unwrap();
    chunk.close().unwrap();
    // Every page came back to the pool.
    let mut count = 0;
    while pool.pop().is_some() {
        count += 1;
    }
    assert_eq!(count, 40);
}

#[test]
fn single_line_chunk_evicts_through_the_only_page() {
    let (_dir, pool, region, engine) = setup(2, 12, 4 << 12);
    let mut chunk = Chunk::create(
        &engine,
        region,
        pool,
        4 << 12,
        ChunkOptions {
            cache_lines: 1,
            ..ChunkOptions::default()
        },
    )
    .unwrap();
    assert_eq!(chunk.stats().resident_lines, 1);

    let per_page = chunk.page_size() as u64 / 8;
    for page in 0..4u64 {
        chunk.try_write(page * per_page, page as f64 + 0.25).unwrap();
    }
    // Every revisit stores the dirty page and reloads the target through
    // the same line.
    for page in (0..4u64).rev() {
        assert_eq!(
            chunk.try_read(page * per_page).unwrap(),
            page as f64 + 0.25
        );
        assert_eq!(chunk.stats().resident_lines, 1);
    }

    chunk.sync().unwrap();
    let stats = chunk.stats();
    assert_eq!(stats.usage, 0);
    assert_eq!(stats.queued_blocks, 0);
    chunk.close().unwrap();
}

#[test]
fn starved_chunk_grows_when_pages_free_up() {
    let (_dir, pool, region, engine) = setup(3, 12, 16 << 12);

    // A neighbour holds one page while the main chunk is admitted.
    let mut neighbour = Chunk::create(
        &engine,
        region.clone(),
        pool.clone(),
        1 << 12,
        ChunkOptions::default(),
    )
    .unwrap();

    // Only two pages left for a four-line budget.
    let mut chunk = Chunk::create(
        &engine,
        region,
        pool.clone(),
        8 << 12,
        ChunkOptions {
            cache_lines: 4,
            ..ChunkOptions::default()
        },
    )
    .unwrap();
    assert_eq!(chunk.stats().resident_lines, 2);
    assert_eq!(chunk.stats().max_lines, 4);

    let per_page = chunk.page_size() as u64 / 8;
    for page in 0..8u64 {
        chunk.try_write(page * per_page, page as f64).unwrap();
    }
    // Still starved: the working set cycled through two lines.
    assert_eq!(chunk.stats().resident_lines, 2);

    // Freeing the neighbour's page lets the next miss grow the cache.
    neighbour.close().unwrap();
    for page in 0..8u64 {
        assert_eq!(chunk.try_read(page * per_page).unwrap(), page as f64);
    }
    assert_eq!(chunk.stats().resident_lines, 3);
    assert_invariants(&chunk.stats());

    chunk.close().unwrap();
}

#[test]
fn random_workload_matches_mirror() {
    let (_dir, pool, region, engine) = setup(8, 12, 16 << 12);
    let mut chunk = Chunk::create(
        &engine,
        region,
        pool,
        16 << 12,
        ChunkOptions {
            cache_lines: 8,
            ..ChunkOptions::default()
        },
    )
    .unwrap();

    let elems = chunk.len();
    let mut mirror = vec![0.0f64; elems as usize];
    let mut rng = StdRng::seed_from_u64(0x5117);

    for op in 0..20_000u32 {
        let pos = rng.random_range(0..elems);
        if rng.random_bool(0.7) {
            let value = rng.random::<f64>();
            chunk.try_write(pos, value).unwrap();
            mirror[pos as usize] = value;
        } else {
            assert_eq!(chunk.try_read(pos).unwrap(), mirror[pos as usize]);
        }
        if op % 2_000 == 0 {
            assert_invariants(&chunk.stats());
        }
    }

    chunk.sync().unwrap();
    for pos in 0..elems {
        assert_eq!(chunk.try_read(pos).unwrap(), mirror[pos as usize]);
    }
    chunk.close().unwrap();
}
