//! File-backed memory-mapped regions for cross-process shared memory.
//!
//! Two processes that map the same file with `MAP_SHARED` observe each
//! other's stores; the atomics (and futex words) inside such a mapping work
//! across the process boundary.

use std::format;
use std::fs::{File, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Region;

/// Returns the system page size in bytes.
pub fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 { 4096 } else { sz as usize }
}

/// File-backed memory-mapped region shared across processes.
#[derive(Debug)]
pub struct MmapRegion {
    /// Pointer to the mapped memory
    ptr: *mut u8,
    /// Length of the mapping in bytes
    len: usize,
    /// The underlying file (kept open to maintain the mapping)
    #[allow(dead_code)]
    file: File,
    /// Path to the file (for cleanup)
    path: PathBuf,
    /// Whether this region owns the file (should delete on drop)
    owns_file: bool,
}

impl MmapRegion {
    /// Create a new file-backed region.
    ///
    /// Fails if the file already exists. The file is created with
    /// permissions 0600, sized with `ftruncate` (which zero-fills), and
    /// mapped with `MAP_SHARED`.
    pub fn create(path: &Path, size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "size must be > 0",
            ));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        file.set_permissions(Permissions::from_mode(0o600))?;
        file.set_len(size as u64)?;

        Self::map(file, path, size, true)
    }

    /// Attach to an existing file-backed region of exactly `size` bytes.
    ///
    /// A size disagreement means the two sides computed different layouts
    /// and must not share the region, so it is rejected here. A zero-length
    /// file is retried briefly: the creating peer sizes the file immediately
    /// after creating it, and an attacher can land in between.
    pub fn attach_exact(path: &Path, size: usize) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut found = file.metadata()?.len();
        let mut tries = 0;
        while found == 0 && tries < 50 {
            std::thread::sleep(Duration::from_millis(1));
            found = file.metadata()?.len();
            tries += 1;
        }

        if found != size as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("region size mismatch: expected {size}, found {found}"),
            ));
        }

        Self::map(file, path, size, false)
    }

    /// Attach to the region at `path`, creating it if it does not exist.
    ///
    /// Returns the region and whether this call created the file. Exactly
    /// one of two racing callers observes `created = true`; that caller's
    /// region owns the file and unlinks it on drop.
    pub fn open_or_create(path: &Path, size: usize) -> io::Result<(Self, bool)> {
        loop {
            match Self::create(path, size) {
                Ok(region) => return Ok((region, true)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
            match Self::attach_exact(path, size) {
                Ok(region) => return Ok((region, false)),
                // The owner unlinked between our create and attach; start over.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn map(file: File, path: &Path, size: usize, owns_file: bool) -> io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            ptr: ptr as *mut u8,
            len: size,
            file,
            path: path.to_path_buf(),
            owns_file,
        })
    }

    /// Get a `Region` view of this mapping.
    #[inline]
    pub fn region(&self) -> Region {
        // SAFETY: The mmap is valid for the lifetime of MmapRegion
        unsafe { Region::from_raw(self.ptr, self.len) }
    }

    /// Get the size of the region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region is empty (zero bytes).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the path to the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release ownership of the file.
    ///
    /// After calling this, the file will NOT be deleted when this region is
    /// dropped.
    pub fn release_ownership(&mut self) {
        self.owns_file = false;
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }

        if self.owns_file
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::debug!(path = %self.path.display(), error = %e, "region file cleanup failed");
        }
    }
}

// SAFETY: The mmap region is valid for the lifetime of MmapRegion and can be
// safely accessed from multiple threads (the underlying memory is shared).
unsafe impl Send for MmapRegion {}
unsafe impl Sync for MmapRegion {}
