//! # silt
//!
//! An out-of-core array engine: logically contiguous arrays of `f64`
//! elements whose backing capacity exceeds physical RAM, persisted in a
//! preallocated file and staged page-by-page through a per-chunk write-back
//! cache.
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          Chunk (element-indexed facade)         │
//! ├─────────────────────────────────────────────────┤
//! │  ChunkCache (placement, eviction, prefetch,     │
//! │  dirty tracking, write-coalescing queue)        │
//! ├────────────────────────┬────────────────────────┤
//! │  PagePool (shared RAM  │  IoEngine (worker pool │
//! │  pages, lock-free LIFO)│  + per-chunk channels) │
//! ├────────────────────────┴────────────────────────┤
//! │     StorageRegion (preallocated backing file)   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Reads and writes look like ordinary indexed accesses; underneath, pages
//! move between the RAM pool and the file asynchronously, with sequential
//! access patterns detected and the next page prefetched. Evicted dirty
//! pages are merged with contiguous neighbours and flushed as single
//! vectorised writes when cache pressure demands it.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use silt::{Chunk, ChunkOptions, EngineConfig, IoEngine, PagePool, StorageRegion};
//!
//! fn main() -> silt::Result<()> {
//!     let pool = Arc::new(PagePool::new(64, 17)?); // 64 pages of 128 KiB
//!     let region = Arc::new(StorageRegion::create("array.bin", 1 << 30)?);
//!     let engine = IoEngine::open(EngineConfig::default())?;
//!
//!     let mut chunk = Chunk::create(
//!         &engine,
//!         region.clone(),
//!         pool.clone(),
//!         1 << 24,
//!         ChunkOptions::default(),
//!     )?;
//!
//!     chunk.try_write(42, 1.5)?;
//!     assert_eq!(chunk.try_read(42)?, 1.5);
//!     chunk.sync()?;
//!     chunk.close()?;
//!     Ok(())
//! }
//! ```
//!
//! Each chunk is driven by exactly one executor; the pool and the engine
//! are shared between executors.

pub mod cache;
pub mod chunk;
pub mod error;
pub mod io;
pub mod pool;
pub mod storage;

pub use cache::{
    ChunkOptions, ChunkStats, LineInfo, LineState, CACHELINES_MAX, PREDICTION_FIRE,
    PREDICTION_INITIAL, PREDICTION_MAX, PRESSURE_RATIO,
};
pub use chunk::Chunk;
pub use error::{Result, SiltError};
pub use io::{Completion, EngineConfig, IoChannel, IoEngine, IoVec, DEFAULT_QUEUE_DEPTH};
pub use pool::{PagePool, PageRef};
pub use storage::StorageRegion;
