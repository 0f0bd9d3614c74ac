//! # Asynchronous I/O Engine
//!
//! Submission/completion abstraction serving every chunk in the process:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │        Chunk caches (one IoChannel each)      │
//! ├───────────────────────────────────────────────┤
//! │   Submission queue (bounded per channel)      │
//! ├───────────────────────────────────────────────┤
//! │   I/O worker pool (pread / pwrite / pwritev)  │
//! ├───────────────────────────────────────────────┤
//! │   Per-channel completion queues, poll-driven  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Submissions carry an opaque 64-bit tag that reappears on the matching
//! completion; completions are routed to the channel that submitted, so an
//! executor only ever drains its own tags.

mod engine;

pub use engine::{
    Completion, EngineConfig, EngineStats, IoChannel, IoEngine, IoVec,
};

/// Default bound on in-flight submissions per channel.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Default number of I/O worker threads.
pub const DEFAULT_IO_WORKERS: usize = 2;
