//! # Global Page Pool
//!
//! A bounded LIFO of fixed-size, page-aligned RAM buffers shared by every
//! chunk in the process. Pages are popped at chunk creation and while a
//! cache grows, and pushed back when a chunk closes.

mod page_pool;

pub use page_pool::{PagePool, PageRef, MAX_BLOCK_ORDER, MIN_BLOCK_ORDER};
