//! # Backing Storage
//!
//! A preallocated file on an SSD plus a bump allocator handing out byte
//! ranges to chunks. Page images are stored raw: page `id` of a chunk at
//! region offset `o` lives at file offset `o + id * B`. No header, no
//! checksums, no metadata.

mod region;

pub use region::StorageRegion;
