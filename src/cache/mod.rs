//! # Per-Chunk Write-Back Cache
//!
//! The core of the engine: a fixed-capacity associative cache of pages for
//! one chunk, with a sequential-access predictor driving prefetch, a
//! write-coalescing queue batching contiguous dirty pages, and a per-line
//! state machine interleaving synchronous accesses with asynchronous
//! completion processing.

mod chunk_cache;
mod flush_queue;

pub use chunk_cache::{ChunkCache, ChunkOptions, ChunkStats, LineInfo, LineState};
pub(crate) use flush_queue::FlushQueue;

/// Upper bound on cache lines per chunk. Also keeps single-page completion
/// tags below [`BATCH_TAG_BASE`].
pub const CACHELINES_MAX: usize = 32;

/// Saturation bound of the sequential-access predictor.
pub const PREDICTION_MAX: u8 = 255;

/// Predictor level at which the next page is prefetched.
pub const PREDICTION_FIRE: u8 = 200;

/// Predictor level a fresh chunk starts from.
pub const PREDICTION_INITIAL: u8 = 100;

/// Fraction of non-ready lines above which a queued batch is flushed.
pub const PRESSURE_RATIO: f64 = 0.8;

/// Completion tags below this value are cacheline indices (single-page
/// I/O); tags at or above it key the table of in-flight coalesced batches.
pub(crate) const BATCH_TAG_BASE: u64 = 256;
