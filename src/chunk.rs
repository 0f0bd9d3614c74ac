// # Chunk
//
// Element-indexed facade over the chunk cache: translates positions in a
// logical array of doubles into page-indexed cache fetches.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::cache::{ChunkCache, ChunkOptions, ChunkStats};
use crate::error::{Result, SiltError};
use crate::io::IoEngine;
use crate::pool::PagePool;
use crate::storage::StorageRegion;

/// A logically contiguous out-of-core array of `f64` elements, persisted in
/// one byte range of a [`StorageRegion`] and accessed through a write-back
/// page cache.
///
/// A chunk is driven by a single executor; two chunks owned by distinct
/// executors progress in parallel over the shared engine and pool.
pub struct Chunk {
    cache: ChunkCache,
    /// Addressable elements: `capacity_pages * (block_size / 8)`.
    elements: u64,
}

impl Chunk {
    /// Create a chunk of at least `user_bytes` bytes, rounded up to whole
    /// pages allocated from `region`, with its working set admitted from
    /// `pool`.
    pub fn create(
        engine: &IoEngine,
        region: Arc<StorageRegion>,
        pool: Arc<PagePool>,
        user_bytes: u64,
        opts: ChunkOptions,
    ) -> Result<Self> {
        let cache = ChunkCache::new(engine, region, pool, user_bytes, &opts)?;
        let elements = cache.capacity_pages() as u64 * (cache.block_size() as u64 / 8);
        Ok(Self { cache, elements })
    }

    /// Number of addressable elements.
    #[inline]
    pub fn len(&self) -> u64 {
        self.elements
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Page size in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.cache.block_size()
    }

    /// Chunk length in pages.
    #[inline]
    pub fn pages(&self) -> u32 {
        self.cache.capacity_pages()
    }

    /// Byte offset of this chunk inside its storage region.
    #[inline]
    pub fn region_offset(&self) -> u64 {
        self.cache.base_offset()
    }

    #[inline]
    fn split(&self, pos: u64) -> Result<(u32, usize)> {
        if pos >= self.elements {
            return Err(SiltError::InvalidArgument(format!(
                "position {pos} out of range 0..{}",
                self.elements
            )));
        }
        let order = self.cache.block_order();
        let id = (pos >> (order - 3)) as u32;
        let elem = (pos & ((1u64 << (order - 3)) - 1)) as usize;
        Ok((id, elem))
    }

    /// Read the element at `pos`.
    pub fn try_read(&mut self, pos: u64) -> Result<f64> {
        let (id, elem) = self.split(pos)?;
        self.cache.read_at(id, elem)
    }

    /// Write the element at `pos`.
    pub fn try_write(&mut self, pos: u64, value: f64) -> Result<()> {
        let (id, elem) = self.split(pos)?;
        self.cache.write_at(id, elem, value)
    }

    /// Read the element at `pos`; on failure logs the error and yields 0.0.
    pub fn read(&mut self, pos: u64) -> f64 {
        match self.try_read(pos) {
            Ok(value) => value,
            Err(e) => {
                error!(pos, %e, "chunk read failed");
                0.0
            }
        }
    }

    /// Write the element at `pos`; on failure logs the error and leaves the
    /// chunk unchanged.
    pub fn write(&mut self, pos: u64, value: f64) {
        if let Err(e) = self.try_write(pos, value) {
            error!(pos, %e, "chunk write failed");
        }
    }

    /// Block until every earlier write is persisted in the backing file.
    /// Idempotent.
    pub fn sync(&mut self) -> Result<()> {
        self.cache.sync()
    }

    /// Flush and return the chunk's pages to the pool. Idempotent; also
    /// performed on drop.
    pub fn close(&mut self) -> Result<()> {
        self.cache.close()
    }

    /// Snapshot of the cache state.
    pub fn stats(&self) -> ChunkStats {
        self.cache.stats()
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let Err(e) = self.cache.close() {
            warn!(%e, "chunk close failed during drop");
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        writeln!(
            f,
            "chunk @{:#x}: {} pages x {} bytes, {} elements",
            self.region_offset(),
            self.pages(),
            self.page_size(),
            self.len()
        )?;
        writeln!(
            f,
            "  lines {}/{}  usage {}  prediction {}  queued {} blocks in {} batches",
            stats.resident_lines,
            stats.max_lines,
            stats.usage,
            stats.prediction,
            stats.queued_blocks,
            stats.queued_batches
        )?;
        for (i, line) in stats.lines.iter().enumerate() {
            writeln!(
                f,
                "  line {:2}: page {:6}  {:?}{}",
                i,
                line.id,
                line.state,
                if line.dirty { "  dirty" } else { "" }
            )?;
        }
        Ok(())
    }
}
