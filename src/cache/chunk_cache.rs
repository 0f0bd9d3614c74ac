// # Chunk Cache
//
// Fixed-capacity associative cache of pages for one chunk: admission,
// placement, eviction, dirty tracking, sequential prefetch, batched
// write-back, and the interleaving of synchronous user accesses with
// asynchronous completion processing on the chunk's I/O channel.

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::cache::{
    FlushQueue, BATCH_TAG_BASE, CACHELINES_MAX, PREDICTION_FIRE, PREDICTION_INITIAL,
    PRESSURE_RATIO,
};
use crate::error::{Result, SiltError};
use crate::io::{Completion, IoChannel, IoEngine, IoVec};
use crate::pool::{PagePool, PageRef};
use crate::storage::StorageRegion;

// ============================================================================
// Line State
// ============================================================================

/// Lifecycle of one cache line.
///
/// The order is load-bearing: a line with an outstanding transfer compares
/// greater than [`LineState::AwaitingStore`], so "an I/O is in flight" is a
/// single range test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LineState {
    /// Resident and immediately usable.
    Ready,
    /// Evicted dirty, queued for write-back, nothing submitted yet.
    AwaitingStore,
    /// One store submitted to the engine.
    PendingStore,
    /// One load submitted to the engine.
    PendingLoad,
}

struct CacheLine {
    page: PageRef,
    /// Fixed-buffer slot registered on the channel for this line's page.
    buf_index: usize,
    /// Page index in `[0, capacity)` this line represents.
    id: u32,
    state: LineState,
    dirty: bool,
}

impl CacheLine {
    #[inline]
    fn read_elem(&self, elem: usize) -> f64 {
        debug_assert!(elem < self.page.len() / 8);
        // Safety: the page is aligned to its (power-of-two) size, so every
        // 8-byte slot inside it is aligned; the line is Ready, so no
        // transfer touches the buffer.
        unsafe { (self.page.as_ptr() as *const f64).add(elem).read() }
    }

    #[inline]
    fn write_elem(&mut self, elem: usize, value: f64) {
        debug_assert!(elem < self.page.len() / 8);
        unsafe { (self.page.as_ptr() as *mut f64).add(elem).write(value) }
    }
}

// ============================================================================
// Options and Stats
// ============================================================================

/// Chunk construction options.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Cache lines to admit, clamped to the chunk's page count. At most
    /// [`CACHELINES_MAX`].
    pub cache_lines: usize,

    /// Starting level of the sequential-access predictor.
    pub initial_prediction: u8,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            cache_lines: CACHELINES_MAX,
            initial_prediction: PREDICTION_INITIAL,
        }
    }
}

/// Per-line snapshot for diagnostics and tests.
#[derive(Debug, Clone, Copy)]
pub struct LineInfo {
    pub id: u32,
    pub state: LineState,
    pub dirty: bool,
}

/// Cache state snapshot.
#[derive(Debug, Clone)]
pub struct ChunkStats {
    /// Lines currently populated.
    pub resident_lines: usize,
    /// Admission ceiling for this chunk.
    pub max_lines: usize,
    /// Lines not in [`LineState::Ready`].
    pub usage: usize,
    /// Predictor level.
    pub prediction: u8,
    /// Batches waiting in the write-coalescing queue.
    pub queued_batches: usize,
    /// Blocks waiting in the write-coalescing queue.
    pub queued_blocks: usize,
    /// Submissions not yet reaped from the channel.
    pub inflight: usize,
    pub lines: Vec<LineInfo>,
}

impl ChunkStats {
    /// Number of lines with an outstanding load.
    pub fn loads_in_flight(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.state == LineState::PendingLoad)
            .count()
    }

    pub fn line_for(&self, id: u32) -> Option<&LineInfo> {
        self.lines.iter().find(|l| l.id == id)
    }
}

// ============================================================================
// Chunk Cache
// ============================================================================

/// Write-back page cache for one chunk. Driven by a single executor.
pub struct ChunkCache {
    channel: IoChannel,
    pool: Arc<PagePool>,
    region: Arc<StorageRegion>,
    /// Byte offset of this chunk inside the region.
    base: u64,
    /// Chunk length in pages.
    capacity: u32,
    block_order: u32,
    lines: Vec<CacheLine>,
    max_lines: usize,
    /// Line serving the most recent access; always Ready between calls.
    current: usize,
    prediction: u8,
    /// Count of lines not in [`LineState::Ready`].
    usage: usize,
    flush: FlushQueue,
    /// In-flight coalesced stores, keyed by completion tag.
    batches: HashMap<u64, Vec<usize>>,
    next_batch_tag: u64,
    closed: bool,
}

impl ChunkCache {
    pub(crate) fn new(
        engine: &IoEngine,
        region: Arc<StorageRegion>,
        pool: Arc<PagePool>,
        user_bytes: u64,
        opts: &ChunkOptions,
    ) -> Result<Self> {
        if user_bytes == 0 {
            return Err(SiltError::InvalidArgument(
                "chunk size must be non-zero".to_string(),
            ));
        }
        if opts.cache_lines == 0 || opts.cache_lines > CACHELINES_MAX {
            return Err(SiltError::InvalidArgument(format!(
                "cache_lines must be in 1..={CACHELINES_MAX}"
            )));
        }

        let block_order = pool.block_order();
        let block_size = pool.block_size() as u64;
        let capacity = user_bytes.div_ceil(block_size) as u32;
        let base = region.allocate(capacity as u64 * block_size)?;
        let max_lines = (capacity as usize).min(opts.cache_lines);

        // Admit as many pages as the pool can spare, up to the line budget.
        let mut channel = engine.channel();
        let mut lines = Vec::with_capacity(max_lines);
        for id in 0..max_lines as u32 {
            let Some(page) = pool.pop() else { break };
            let buf_index = channel.register_buffer(page.as_ptr(), page.len());
            lines.push(CacheLine {
                page,
                buf_index,
                id,
                state: LineState::PendingLoad,
                dirty: false,
            });
        }
        if lines.is_empty() {
            region.free(base, capacity as u64 * block_size);
            return Err(SiltError::ResourceExhausted(
                "page pool is empty".to_string(),
            ));
        }

        let usage = lines.len();
        let mut cache = Self {
            channel,
            pool,
            region,
            base,
            capacity,
            block_order,
            lines,
            max_lines,
            current: 0,
            prediction: opts.initial_prediction,
            usage,
            flush: FlushQueue::new(),
            batches: HashMap::new(),
            next_batch_tag: BATCH_TAG_BASE,
            closed: false,
        };

        // Resident lines mirror the file from the start, so re-attaching to
        // an existing region surfaces its contents.
        for i in 0..cache.lines.len() {
            cache.submit_load(i)?;
        }
        while cache.usage > 0 {
            cache.reap();
        }

        debug!(
            pages = cache.capacity,
            admitted = cache.lines.len(),
            max_lines = cache.max_lines,
            base = cache.base,
            "chunk cache created"
        );

        Ok(cache)
    }

    // ------------------------------------------------------------------
    // Public surface (used by the chunk facade)
    // ------------------------------------------------------------------

    /// Read one element of page `id`.
    pub(crate) fn read_at(&mut self, id: u32, elem: usize) -> Result<f64> {
        self.guard_open()?;
        let line = self.fetch(id)?;
        Ok(self.lines[line].read_elem(elem))
    }

    /// Write one element of page `id`.
    pub(crate) fn write_at(&mut self, id: u32, elem: usize, value: f64) -> Result<()> {
        self.guard_open()?;
        let line = self.fetch(id)?;
        self.lines[line].write_elem(elem, value);
        self.lines[line].dirty = true;
        Ok(())
    }

    /// Block until every queued write is submitted and every outstanding
    /// transfer has completed. On return all lines are Ready and clean.
    pub(crate) fn sync(&mut self) -> Result<()> {
        self.guard_open()?;
        loop {
            // Every dirty resident line owes a store.
            for i in 0..self.lines.len() {
                if self.lines[i].state == LineState::Ready && self.lines[i].dirty {
                    self.lines[i].state = LineState::AwaitingStore;
                    self.usage += 1;
                    self.flush.push_block(self.lines[i].id, i);
                }
            }
            while !self.flush.is_empty() {
                self.flush_one_batch()?;
            }
            while self.usage > 0 {
                self.reap();
            }
            let settled = self
                .lines
                .iter()
                .all(|l| l.state == LineState::Ready && !l.dirty);
            if settled && self.flush.is_empty() {
                break;
            }
        }
        debug_assert_eq!(self.usage, 0);
        Ok(())
    }

    /// Flush and return every page to the pool.
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.sync()?;
        self.closed = true;
        for line in self.lines.drain(..) {
            self.pool.push(line.page);
        }
        debug!(pages = self.capacity, base = self.base, "chunk cache closed");
        Ok(())
    }

    pub(crate) fn stats(&self) -> ChunkStats {
        ChunkStats {
            resident_lines: self.lines.len(),
            max_lines: self.max_lines,
            usage: self.usage,
            prediction: self.prediction,
            queued_batches: self.flush.len(),
            queued_blocks: self.flush.blocks(),
            inflight: self.channel.pending(),
            lines: self
                .lines
                .iter()
                .map(|l| LineInfo {
                    id: l.id,
                    state: l.state,
                    dirty: l.dirty,
                })
                .collect(),
        }
    }

    #[inline]
    pub(crate) fn capacity_pages(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub(crate) fn block_order(&self) -> u32 {
        self.block_order
    }

    #[inline]
    pub(crate) fn block_size(&self) -> usize {
        1usize << self.block_order
    }

    #[inline]
    pub(crate) fn base_offset(&self) -> u64 {
        self.base
    }

    fn guard_open(&self) -> Result<()> {
        if self.closed {
            return Err(SiltError::InvalidState("chunk is closed".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------

    /// Make page `id` resident and current; returns its line index. The
    /// returned line is always Ready.
    fn fetch(&mut self, new_id: u32) -> Result<usize> {
        debug_assert!(new_id < self.capacity);

        let cur = self.current;
        if self.lines[cur].id == new_id {
            // Hot path: the cursor already points at the page.
            self.predict_hit();
            return Ok(cur);
        }

        // The current line is being vacated. A dirty line owes a store; a
        // clean one stays Ready and is immediately reusable.
        debug_assert_eq!(self.lines[cur].state, LineState::Ready);
        if self.lines[cur].dirty {
            self.lines[cur].state = LineState::AwaitingStore;
            self.usage += 1;
        }

        let line = if self.lines.len() == 1 {
            self.fetch_singleline(new_id)?
        } else if let Some(hit) = self.lookup(new_id) {
            self.fetch_hit(cur, hit)?
        } else {
            self.fetch_miss(cur, new_id)?
        };
        self.current = line;

        self.maybe_prefetch(new_id);

        debug_assert_eq!(self.lines[self.current].state, LineState::Ready);
        debug_assert!(self.unique_ids());
        Ok(line)
    }

    /// With a single populated line there is no second buffer to stage
    /// through: drain the store of the old page, then load the new one into
    /// the same page.
    fn fetch_singleline(&mut self, new_id: u32) -> Result<usize> {
        let old_id = self.lines[0].id;

        if self.lines[0].state == LineState::AwaitingStore {
            self.lines[0].state = LineState::PendingStore;
            self.lines[0].dirty = false;
            if let Err(e) = self.submit_store(0) {
                self.lines[0].state = LineState::AwaitingStore;
                self.lines[0].dirty = true;
                return Err(e);
            }
            // Both transfers target the same RAM page; the load must not
            // overtake the store.
            self.wait_line_ready(0);
        }

        self.lines[0].id = new_id;
        self.lines[0].state = LineState::PendingLoad;
        self.usage += 1;
        if let Err(e) = self.submit_load(0) {
            self.lines[0].id = old_id;
            self.lines[0].state = LineState::Ready;
            self.usage -= 1;
            return Err(e);
        }
        self.wait_line_ready(0);
        Ok(0)
    }

    /// Another resident line holds the page.
    fn fetch_hit(&mut self, cur: usize, hit: usize) -> Result<usize> {
        self.predict_hit();

        match self.lines[hit].state {
            LineState::Ready => {}
            LineState::PendingLoad | LineState::PendingStore => {
                // An in-flight transfer owns the buffer; drain it.
                self.wait_line_ready(hit);
            }
            LineState::AwaitingStore => {
                // The queued store was never submitted; the RAM contents are
                // current, so the eviction is simply undone. The line keeps
                // its dirty bit and re-enters the queue on its next eviction.
                let removed = self.flush.remove(self.lines[hit].id);
                debug_assert_eq!(removed, Some(hit));
                self.lines[hit].state = LineState::Ready;
                self.usage -= 1;
            }
        }

        self.retire(cur)?;
        Ok(hit)
    }

    /// The page is not resident: allocate a line and load it synchronously.
    fn fetch_miss(&mut self, cur: usize, new_id: u32) -> Result<usize> {
        self.predict_miss();

        let (line, fresh) = self.allocate_line_sync(new_id)?;
        let prev_id = self.lines[line].id;
        self.lines[line].id = new_id;
        self.lines[line].state = LineState::PendingLoad;
        self.usage += 1;

        if let Err(e) = self.submit_load(line) {
            self.usage -= 1;
            if fresh {
                let dropped = self.lines.pop().expect("fresh line at tail");
                self.pool.push(dropped.page);
            } else {
                self.lines[line].id = prev_id;
                self.lines[line].state = LineState::Ready;
            }
            return Err(e);
        }
        self.wait_line_ready(line);

        self.retire(cur)?;
        Ok(line)
    }

    /// Queue the vacated line's store and react to cache pressure.
    fn retire(&mut self, old: usize) -> Result<()> {
        if self.lines[old].state == LineState::AwaitingStore {
            self.flush.push_block(self.lines[old].id, old);
            self.check_pressure()?;
        }
        Ok(())
    }

    fn lookup(&self, id: u32) -> Option<usize> {
        self.lines.iter().position(|l| l.id == id)
    }

    #[inline]
    fn predict_hit(&mut self) {
        self.prediction = self.prediction.saturating_add(1);
    }

    #[inline]
    fn predict_miss(&mut self) {
        self.prediction = self.prediction.saturating_sub(1);
    }

    fn unique_ids(&self) -> bool {
        self.lines
            .iter()
            .all(|a| self.lines.iter().filter(|b| b.id == a.id).count() == 1)
    }

    // ------------------------------------------------------------------
    // Line allocation
    // ------------------------------------------------------------------

    /// Populate a fresh line from the pool. The new line starts Ready and
    /// clean, already labelled with `target_id` (the caller guarantees the
    /// id is not resident).
    fn grow_line(&mut self, target_id: u32) -> Option<usize> {
        if self.lines.len() >= self.max_lines {
            return None;
        }
        let page = self.pool.pop()?;
        let buf_index = self.channel.register_buffer(page.as_ptr(), page.len());
        self.lines.push(CacheLine {
            page,
            buf_index,
            id: target_id,
            state: LineState::Ready,
            dirty: false,
        });
        trace!(lines = self.lines.len(), "cache grew");
        Some(self.lines.len() - 1)
    }

    /// A Ready line whose page image matches the file, safe to repurpose.
    fn find_ready_clean(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.state == LineState::Ready && !l.dirty)
    }

    /// Allocate a line for `target_id`, blocking on completions until one
    /// is available. Returns the index and whether the line is fresh from
    /// the pool.
    fn allocate_line_sync(&mut self, target_id: u32) -> Result<(usize, bool)> {
        loop {
            if let Some(line) = self.grow_line(target_id) {
                return Ok((line, true));
            }
            if let Some(line) = self.find_ready_clean() {
                return Ok((line, false));
            }
            // Ready-but-dirty lines (a store was superseded by a later
            // write) re-enter the queue so the flush machinery can clean
            // them.
            for i in 0..self.lines.len() {
                if self.lines[i].state == LineState::Ready && self.lines[i].dirty {
                    self.lines[i].state = LineState::AwaitingStore;
                    self.usage += 1;
                    self.flush.push_block(self.lines[i].id, i);
                }
            }
            // Starved: every line is queued or in flight. Pop one batch so
            // a store can complete and free a line.
            if !self.flush.is_empty() {
                self.flush_one_batch()?;
            }
            self.reap();
        }
    }

    // ------------------------------------------------------------------
    // Prefetch
    // ------------------------------------------------------------------

    /// Opportunistically start an asynchronous load of `new_id + 1` when
    /// the access pattern looks sequential. Best-effort: every failure
    /// leaves the cache exactly as it was.
    fn maybe_prefetch(&mut self, new_id: u32) {
        let next_id = new_id + 1;
        if next_id >= self.capacity || self.prediction < PREDICTION_FIRE {
            return;
        }
        if self.lookup(next_id).is_some() {
            return;
        }

        // Hide the line being returned from the allocation scan, restoring
        // it on every exit path.
        let cur = self.current;
        let saved = self.lines[cur].state;
        self.lines[cur].state = LineState::PendingLoad;

        let (victim, fresh) = match self.grow_line(next_id) {
            Some(line) => (Some(line), true),
            None => (self.find_ready_clean(), false),
        };

        self.lines[cur].state = saved;

        let Some(line) = victim else { return };
        debug_assert_ne!(line, cur);

        let prev_id = self.lines[line].id;
        self.lines[line].id = next_id;
        self.lines[line].state = LineState::PendingLoad;
        self.usage += 1;

        if self.submit_load(line).is_err() {
            self.usage -= 1;
            if fresh {
                let dropped = self.lines.pop().expect("fresh line at tail");
                self.pool.push(dropped.page);
            } else {
                self.lines[line].id = prev_id;
                self.lines[line].state = LineState::Ready;
            }
            trace!(id = next_id, "prefetch dropped");
            return;
        }
        trace!(id = next_id, "prefetch issued");
    }

    // ------------------------------------------------------------------
    // Write-back
    // ------------------------------------------------------------------

    /// React to cache pressure: above the threshold, exactly one queued
    /// batch is submitted; the rest stay queued.
    fn check_pressure(&mut self) -> Result<()> {
        if self.flush.is_empty() {
            return Ok(());
        }
        if self.usage as f64 / self.lines.len() as f64 > PRESSURE_RATIO {
            self.flush_one_batch()?;
        }
        Ok(())
    }

    /// Pop the head batch and submit it as one vectorised write.
    fn flush_one_batch(&mut self) -> Result<()> {
        let Some(batch) = self.flush.pop_front() else {
            return Ok(());
        };

        let block_size = self.block_size();
        let mut iovs = Vec::with_capacity(batch.len());
        for (k, &line) in batch.lines.iter().enumerate() {
            debug_assert_eq!(self.lines[line].state, LineState::AwaitingStore);
            debug_assert_eq!(self.lines[line].id, batch.first_id + k as u32);
            iovs.push(IoVec {
                base: self.lines[line].page.as_ptr(),
                len: block_size,
            });
            self.lines[line].state = LineState::PendingStore;
            // The image being persisted is the one in RAM right now; a
            // later write re-dirties the line and re-flushes.
            self.lines[line].dirty = false;
        }

        let tag = self.next_batch_tag;
        self.next_batch_tag += 1;
        let members: Vec<usize> = batch.lines.iter().copied().collect();
        self.batches.insert(tag, members);

        let offset = self.file_offset(batch.first_id);
        trace!(
            first_id = batch.first_id,
            blocks = batch.len(),
            "flushing batch"
        );
        if let Err(e) = self.submit_writev_backoff(iovs, offset, tag) {
            // Roll the batch back into the queue untouched.
            let members = self.batches.remove(&tag).expect("batch just inserted");
            for (k, line) in members.into_iter().enumerate() {
                self.lines[line].state = LineState::AwaitingStore;
                self.lines[line].dirty = true;
                self.flush.push_block(batch.first_id + k as u32, line);
            }
            return Err(e);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Submission and completion plumbing
    // ------------------------------------------------------------------

    #[inline]
    fn file_offset(&self, id: u32) -> u64 {
        self.base + ((id as u64) << self.block_order)
    }

    /// Submit the load for line `i` (tag = line index), waiting out a full
    /// submission queue.
    fn submit_load(&mut self, i: usize) -> Result<()> {
        let fd = self.region.as_raw_fd();
        let len = self.block_size();
        let offset = self.file_offset(self.lines[i].id);
        let buf_index = self.lines[i].buf_index;
        loop {
            if !self.channel.is_full() {
                return self
                    .channel
                    .submit_read_fixed(fd, buf_index, len, offset, i as u64);
            }
            self.reap();
        }
    }

    /// Submit the store for line `i` (tag = line index).
    fn submit_store(&mut self, i: usize) -> Result<()> {
        let fd = self.region.as_raw_fd();
        let len = self.block_size();
        let offset = self.file_offset(self.lines[i].id);
        let buf_index = self.lines[i].buf_index;
        loop {
            if !self.channel.is_full() {
                return self
                    .channel
                    .submit_write_fixed(fd, buf_index, len, offset, i as u64);
            }
            self.reap();
        }
    }

    fn submit_writev_backoff(&mut self, iovs: Vec<IoVec>, offset: u64, tag: u64) -> Result<()> {
        let fd = self.region.as_raw_fd();
        loop {
            if !self.channel.is_full() {
                return self.channel.submit_writev(fd, iovs, offset, tag);
            }
            self.reap();
        }
    }

    /// Poll until line `i`'s outstanding transfer has completed.
    fn wait_line_ready(&mut self, i: usize) {
        while self.lines[i].state != LineState::Ready {
            debug_assert!(
                self.lines[i].state > LineState::AwaitingStore,
                "waiting on a line with no submission outstanding"
            );
            self.reap();
        }
    }

    /// Drain and apply a burst of completions; yields when none are ready.
    fn reap(&mut self) {
        let completions = self.channel.poll_completions(CACHELINES_MAX);
        if completions.is_empty() {
            std::thread::yield_now();
            return;
        }
        for completion in completions {
            self.process_completion(completion);
        }
    }

    fn process_completion(&mut self, completion: Completion) {
        if completion.tag < BATCH_TAG_BASE {
            let line = completion.tag as usize;
            self.finish_transfer(completion, self.block_size() as i64);
            debug_assert!(self.lines[line].state > LineState::AwaitingStore);
            self.lines[line].state = LineState::Ready;
            self.usage -= 1;
        } else {
            let members = self
                .batches
                .remove(&completion.tag)
                .expect("completion for an unknown batch");
            self.finish_transfer(completion, (members.len() * self.block_size()) as i64);
            for line in members {
                debug_assert_eq!(self.lines[line].state, LineState::PendingStore);
                self.lines[line].state = LineState::Ready;
                self.usage -= 1;
            }
        }
    }

    /// A failed or short transfer means the page image and the file no
    /// longer agree; there is no way back from that.
    fn finish_transfer(&self, completion: Completion, expected: i64) {
        if completion.result != expected {
            if let Some(errno) = completion.error_code() {
                error!(
                    tag = completion.tag,
                    errno, "io completion failed, aborting"
                );
            } else {
                error!(
                    tag = completion.tag,
                    got = completion.result,
                    expected,
                    "short transfer, aborting"
                );
            }
            std::process::abort();
        }
    }
}

impl Drop for ChunkCache {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Backstop for chunks dropped without close(): wait out any
        // transfers still holding page buffers, then hand the pages back.
        let mut idle_rounds = 0u32;
        while self.channel.pending() > 0 && idle_rounds < 1_000_000 {
            if self.channel.poll_completions(CACHELINES_MAX).is_empty() {
                idle_rounds += 1;
                std::thread::yield_now();
            }
        }
        if self.channel.pending() == 0 {
            for line in self.lines.drain(..) {
                self.pool.push(line.page);
            }
        } else {
            warn!(
                pending = self.channel.pending(),
                "leaking chunk pages: transfers never completed"
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_state_ordering_reflects_outstanding_io() {
        assert!(LineState::Ready < LineState::AwaitingStore);
        assert!(LineState::AwaitingStore < LineState::PendingStore);
        assert!(LineState::PendingStore < LineState::PendingLoad);
    }

    #[test]
    fn default_options() {
        let opts = ChunkOptions::default();
        assert_eq!(opts.cache_lines, CACHELINES_MAX);
        assert_eq!(opts.initial_prediction, PREDICTION_INITIAL);
    }
}
