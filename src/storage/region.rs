// # Storage Region
//
// Preallocated backing file with bump allocation of chunk byte ranges.

use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, SiltError};

struct RegionState {
    offset: u64,
    closed: bool,
}

/// A fixed-capacity byte region inside one backing file.
///
/// `allocate` hands out monotonically increasing offsets; `free` is a no-op
/// (bump allocator). The region must outlive every chunk allocated from it.
pub struct StorageRegion {
    file: File,
    path: PathBuf,
    capacity: u64,
    state: Mutex<RegionState>,
}

impl StorageRegion {
    /// Create the backing file truncated to zero and preallocate `capacity`
    /// bytes.
    pub fn create<P: AsRef<Path>>(path: P, capacity: u64) -> Result<Self> {
        Self::init(path, capacity, true)
    }

    /// Attach to an existing backing file without destroying its contents.
    ///
    /// Chunk boundaries are not recorded in the file; callers re-supply the
    /// same allocation order (and chunk geometry) they used when the data
    /// was written.
    pub fn open<P: AsRef<Path>>(path: P, capacity: u64) -> Result<Self> {
        Self::init(path, capacity, false)
    }

    fn init<P: AsRef<Path>>(path: P, capacity: u64, truncate: bool) -> Result<Self> {
        if capacity == 0 {
            return Err(SiltError::InvalidArgument(
                "storage region capacity must be non-zero".to_string(),
            ));
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&path)?;

        preallocate(&file, capacity)?;

        debug!(path = %path.display(), capacity, truncate, "storage region ready");

        Ok(Self {
            file,
            path,
            capacity,
            state: Mutex::new(RegionState {
                offset: 0,
                closed: false,
            }),
        })
    }

    /// Allocate `n` bytes; returns the byte offset of the range.
    pub fn allocate(&self, n: u64) -> Result<u64> {
        if n == 0 {
            return Err(SiltError::InvalidArgument(
                "cannot allocate zero bytes".to_string(),
            ));
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(SiltError::InvalidState("storage region is closed".to_string()));
        }
        if state.offset + n > self.capacity {
            return Err(SiltError::ResourceExhausted(format!(
                "storage region full: {} of {} bytes in use, {} requested",
                state.offset, self.capacity, n
            )));
        }

        let offset = state.offset;
        state.offset += n;
        Ok(offset)
    }

    /// Release a range. Bump allocator: space is only reclaimed by `close`.
    pub fn free(&self, _offset: u64, _n: u64) {}

    /// Truncate the backing file and retire the region. Further allocations
    /// fail; file descriptors already handed to the I/O engine stay valid
    /// until the region is dropped.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        self.file.set_len(0)?;
        state.offset = 0;
        state.closed = true;
        debug!(path = %self.path.display(), "storage region closed");
        Ok(())
    }

    /// Total region capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes handed out so far.
    pub fn allocated(&self) -> u64 {
        self.state.lock().offset
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for StorageRegion {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

#[cfg(target_os = "linux")]
fn preallocate(file: &File, capacity: u64) -> Result<()> {
    let rc = unsafe { libc::fallocate(file.as_raw_fd(), 0, 0, capacity as libc::off_t) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // Some filesystems (tmpfs before 3.5, NFS) reject fallocate; fall
        // back to extending the file size.
        if err.raw_os_error() == Some(libc::EOPNOTSUPP) {
            warn!("fallocate unsupported, falling back to ftruncate");
            file.set_len(capacity)?;
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn preallocate(file: &File, capacity: u64) -> Result<()> {
    file.set_len(capacity)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let region = StorageRegion::create(dir.path().join("r.bin"), 1 << 20).unwrap();

        assert_eq!(region.allocate(4096).unwrap(), 0);
        assert_eq!(region.allocate(8192).unwrap(), 4096);
        assert_eq!(region.allocated(), 12288);

        // free is a no-op
        region.free(0, 4096);
        assert_eq!(region.allocated(), 12288);
    }

    #[test]
    fn allocation_respects_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let region = StorageRegion::create(dir.path().join("r.bin"), 8192).unwrap();

        assert_eq!(region.allocate(8192).unwrap(), 0);
        assert!(matches!(
            region.allocate(1),
            Err(SiltError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn rejects_zero_sizes() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StorageRegion::create(dir.path().join("r.bin"), 0).is_err());
        let region = StorageRegion::create(dir.path().join("r2.bin"), 4096).unwrap();
        assert!(region.allocate(0).is_err());
    }

    #[test]
    fn preallocates_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.bin");
        let _region = StorageRegion::create(&path, 1 << 16).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1 << 16);
    }

    #[test]
    fn close_truncates_and_blocks_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.bin");
        let region = StorageRegion::create(&path, 1 << 16).unwrap();
        region.allocate(4096).unwrap();

        region.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert!(matches!(
            region.allocate(4096),
            Err(SiltError::InvalidState(_))
        ));
        // Idempotent.
        region.close().unwrap();
    }

    #[test]
    fn open_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.bin");
        {
            let region = StorageRegion::create(&path, 4096).unwrap();
            use std::os::unix::fs::FileExt;
            region.file.write_all_at(b"persist", 128).unwrap();
        }
        let region = StorageRegion::open(&path, 4096).unwrap();
        use std::os::unix::fs::FileExt;
        let mut buf = [0u8; 7];
        region.file.read_exact_at(&mut buf, 128).unwrap();
        assert_eq!(&buf, b"persist");
        assert_eq!(region.allocate(4096).unwrap(), 0);
    }
}
