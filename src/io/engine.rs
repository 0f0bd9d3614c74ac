// # I/O Engine
//
// Fixed pool of I/O worker threads draining a shared submission queue.
// Each submission is executed with positioned read/write syscalls and its
// completion is pushed onto the submitting channel's completion queue.

use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::{Result, SiltError};
use crate::io::{DEFAULT_IO_WORKERS, DEFAULT_QUEUE_DEPTH};

// ============================================================================
// Configuration
// ============================================================================

/// I/O engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on in-flight submissions per channel.
    pub queue_depth: usize,

    /// Number of worker threads executing submissions.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            workers: DEFAULT_IO_WORKERS,
        }
    }
}

// ============================================================================
// Submission and Completion Entries
// ============================================================================

/// Base/length pair describing one RAM buffer.
#[derive(Debug, Clone, Copy)]
pub struct IoVec {
    pub base: *mut u8,
    pub len: usize,
}

// Safety: an `IoVec` in flight points at a buffer the submitter keeps alive
// and untouched until the matching completion is reaped (cache line
// invariant).
unsafe impl Send for IoVec {}

/// Completed I/O: the submitter's tag and the transfer result.
///
/// `result` is the number of bytes transferred, or `-errno` on failure.
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub tag: u64,
    pub result: i64,
}

impl Completion {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.result >= 0
    }

    /// Bytes transferred, if the operation succeeded.
    #[inline]
    pub fn bytes_transferred(&self) -> Option<usize> {
        (self.result >= 0).then_some(self.result as usize)
    }

    /// OS error code, if the operation failed.
    #[inline]
    pub fn error_code(&self) -> Option<i32> {
        (self.result < 0).then_some(-self.result as i32)
    }
}

enum IoOp {
    Read { buf: IoVec },
    Write { buf: IoVec },
    Writev { iovs: Vec<IoVec> },
}

struct Submission {
    op: IoOp,
    fd: RawFd,
    offset: u64,
    tag: u64,
    queue: Arc<CompletionQueue>,
}

enum Job {
    Io(Submission),
    Shutdown,
}

// ============================================================================
// Completion Queue
// ============================================================================

struct CompletionQueue {
    ready: Mutex<VecDeque<Completion>>,
    /// Submitted but not yet reaped by `poll_completions`.
    inflight: AtomicUsize,
}

impl CompletionQueue {
    fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
            inflight: AtomicUsize::new(0),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Default)]
struct EngineCounters {
    submissions: AtomicU64,
    completions: AtomicU64,
    errors: AtomicU64,
}

/// Engine statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub submissions: u64,
    pub completions: u64,
    pub errors: u64,
}

// ============================================================================
// Engine
// ============================================================================

/// Process-wide I/O engine. Open once, share between chunks via
/// [`IoEngine::channel`].
pub struct IoEngine {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    config: EngineConfig,
    counters: Arc<EngineCounters>,
}

impl IoEngine {
    /// Spawn the worker pool.
    pub fn open(config: EngineConfig) -> Result<Self> {
        if config.queue_depth == 0 || config.workers == 0 {
            return Err(SiltError::InvalidArgument(
                "queue depth and worker count must be non-zero".to_string(),
            ));
        }

        let (tx, rx) = unbounded::<Job>();
        let counters = Arc::new(EngineCounters::default());

        let mut workers = Vec::with_capacity(config.workers);
        for i in 0..config.workers {
            let rx = rx.clone();
            let counters = counters.clone();
            let handle = std::thread::Builder::new()
                .name(format!("silt-io-{i}"))
                .spawn(move || worker_loop(rx, counters))
                .map_err(SiltError::Io)?;
            workers.push(handle);
        }

        debug!(
            workers = config.workers,
            queue_depth = config.queue_depth,
            "io engine open"
        );

        Ok(Self {
            tx,
            workers,
            config,
            counters,
        })
    }

    /// Open a queue pair for one chunk. Completions of submissions made on
    /// this channel are only visible to this channel.
    pub fn channel(&self) -> IoChannel {
        IoChannel {
            tx: self.tx.clone(),
            queue: Arc::new(CompletionQueue::new()),
            depth: self.config.queue_depth,
            buffers: Vec::new(),
            counters: self.counters.clone(),
        }
    }

    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.config.queue_depth
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            submissions: self.counters.submissions.load(Ordering::Relaxed),
            completions: self.counters.completions.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

impl Drop for IoEngine {
    fn drop(&mut self) {
        for _ in 0..self.workers.len() {
            let _ = self.tx.send(Job::Shutdown);
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("io engine closed");
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Per-chunk queue pair: registered fixed buffers, a bounded in-flight
/// budget, and a private completion queue.
pub struct IoChannel {
    tx: Sender<Job>,
    queue: Arc<CompletionQueue>,
    depth: usize,
    buffers: Vec<IoVec>,
    counters: Arc<EngineCounters>,
}

impl IoChannel {
    /// Register a set of buffers for fixed I/O; returns the index of the
    /// first. Registrations are append-only.
    pub fn register_buffers(&mut self, iovs: &[IoVec]) -> usize {
        let first = self.buffers.len();
        self.buffers.extend_from_slice(iovs);
        first
    }

    /// Register a single buffer; returns its index.
    pub fn register_buffer(&mut self, base: *mut u8, len: usize) -> usize {
        self.register_buffers(&[IoVec { base, len }])
    }

    fn fixed(&self, buf_index: usize, len: usize) -> Result<IoVec> {
        let buf = self.buffers.get(buf_index).ok_or_else(|| {
            SiltError::InvalidArgument(format!("unregistered buffer index {buf_index}"))
        })?;
        if len > buf.len {
            return Err(SiltError::InvalidArgument(format!(
                "length {len} exceeds registered buffer of {} bytes",
                buf.len
            )));
        }
        Ok(IoVec {
            base: buf.base,
            len,
        })
    }

    /// Read `len` bytes at `offset` into registered buffer `buf_index`.
    pub fn submit_read_fixed(
        &self,
        fd: RawFd,
        buf_index: usize,
        len: usize,
        offset: u64,
        tag: u64,
    ) -> Result<()> {
        let buf = self.fixed(buf_index, len)?;
        self.submit(IoOp::Read { buf }, fd, offset, tag)
    }

    /// Write `len` bytes from registered buffer `buf_index` at `offset`.
    pub fn submit_write_fixed(
        &self,
        fd: RawFd,
        buf_index: usize,
        len: usize,
        offset: u64,
        tag: u64,
    ) -> Result<()> {
        let buf = self.fixed(buf_index, len)?;
        self.submit(IoOp::Write { buf }, fd, offset, tag)
    }

    /// Write a gather list at `offset` in one vectorised transfer.
    pub fn submit_writev(
        &self,
        fd: RawFd,
        iovs: Vec<IoVec>,
        offset: u64,
        tag: u64,
    ) -> Result<()> {
        if iovs.is_empty() {
            return Err(SiltError::InvalidArgument(
                "empty gather list".to_string(),
            ));
        }
        self.submit(IoOp::Writev { iovs }, fd, offset, tag)
    }

    fn submit(&self, op: IoOp, fd: RawFd, offset: u64, tag: u64) -> Result<()> {
        if self.queue.inflight.load(Ordering::Acquire) >= self.depth {
            return Err(SiltError::Submission("submission queue full".to_string()));
        }
        self.queue.inflight.fetch_add(1, Ordering::AcqRel);

        let submission = Submission {
            op,
            fd,
            offset,
            tag,
            queue: self.queue.clone(),
        };

        if self.tx.send(Job::Io(submission)).is_err() {
            self.queue.inflight.fetch_sub(1, Ordering::AcqRel);
            return Err(SiltError::Submission("io engine is closed".to_string()));
        }

        self.counters.submissions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Drain up to `max` ready completions. Non-blocking.
    pub fn poll_completions(&self, max: usize) -> Vec<Completion> {
        let mut ready = self.queue.ready.lock();
        let n = max.min(ready.len());
        let drained: Vec<Completion> = ready.drain(..n).collect();
        drop(ready);

        if !drained.is_empty() {
            self.queue.inflight.fetch_sub(drained.len(), Ordering::AcqRel);
        }
        drained
    }

    /// Submissions not yet reaped by [`IoChannel::poll_completions`].
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.inflight.load(Ordering::Acquire)
    }

    /// Whether the in-flight budget is exhausted. A further submission
    /// fails until a completion is reaped.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pending() >= self.depth
    }
}

// ============================================================================
// Workers
// ============================================================================

fn worker_loop(rx: Receiver<Job>, counters: Arc<EngineCounters>) {
    while let Ok(job) = rx.recv() {
        let submission = match job {
            Job::Io(submission) => submission,
            Job::Shutdown => break,
        };

        let result = execute(&submission);

        counters.completions.fetch_add(1, Ordering::Relaxed);
        if result < 0 {
            counters.errors.fetch_add(1, Ordering::Relaxed);
            error!(
                tag = submission.tag,
                errno = -result,
                "io operation failed"
            );
        }

        submission.queue.ready.lock().push_back(Completion {
            tag: submission.tag,
            result,
        });
    }
}

fn execute(submission: &Submission) -> i64 {
    loop {
        let ret = match &submission.op {
            IoOp::Read { buf } => unsafe {
                libc::pread(
                    submission.fd,
                    buf.base as *mut libc::c_void,
                    buf.len,
                    submission.offset as libc::off_t,
                )
            },
            IoOp::Write { buf } => unsafe {
                libc::pwrite(
                    submission.fd,
                    buf.base as *const libc::c_void,
                    buf.len,
                    submission.offset as libc::off_t,
                )
            },
            IoOp::Writev { iovs } => {
                let native: Vec<libc::iovec> = iovs
                    .iter()
                    .map(|v| libc::iovec {
                        iov_base: v.base as *mut libc::c_void,
                        iov_len: v.len,
                    })
                    .collect();
                unsafe {
                    libc::pwritev(
                        submission.fd,
                        native.as_ptr(),
                        native.len() as libc::c_int,
                        submission.offset as libc::off_t,
                    )
                }
            }
        };

        if ret < 0 {
            let errno = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO);
            if errno == libc::EINTR {
                continue;
            }
            return -(errno as i64);
        }
        return ret as i64;
    }
}

// ============================================================================
// Tests
// ============================================================================
