//! The allocator service.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use hal_service_manager::{HalInterface, Return};
use tracing::{debug, warn};

use crate::{HidlMemory, MemoryError};

/// Conventional instance name of the anonymous shared memory allocator.
pub const ASHMEM_INSTANCE: &str = "ashmem";

/// Largest region a single allocation may request (1 GiB).
pub const MAX_ALLOCATION_SIZE: u64 = 1 << 30;

/// Allocator service contract.
///
/// Failures to allocate are reported in-band (`success == false`), not as
/// transport errors.
pub trait Allocator: Send + Sync {
    /// Allocate a region of `size` bytes.
    fn allocate(&self, size: u64) -> Return<(bool, HidlMemory)>;

    /// Allocate `count` regions of `size` bytes each. All or nothing.
    fn batch_allocate(&self, size: u64, count: u32) -> Return<(bool, Vec<HidlMemory>)>;
}

impl HalInterface for dyn Allocator {
    const DESCRIPTOR: &'static str = "android.hidl.allocator@1.0::IAllocator";
}

/// Anonymous shared memory allocator.
#[derive(Debug, Default)]
pub struct AshmemAllocator;

impl AshmemAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Create one zero-filled region.
    pub fn create_region(&self, size: u64) -> Result<HidlMemory, MemoryError> {
        if size == 0 || size > MAX_ALLOCATION_SIZE {
            return Err(MemoryError::InvalidSize(size));
        }

        let fd = create_anonymous_fd()?;
        let len = libc::off_t::try_from(size).map_err(|_| MemoryError::InvalidSize(size))?;
        // SAFETY: fd is a freshly created, owned descriptor.
        if unsafe { libc::ftruncate(fd.as_raw_fd(), len) } != 0 {
            return Err(MemoryError::Io(io::Error::last_os_error()));
        }

        debug!(size, "allocated shared memory region");
        Ok(HidlMemory::new(ASHMEM_INSTANCE, fd, size))
    }
}

impl Allocator for AshmemAllocator {
    fn allocate(&self, size: u64) -> Return<(bool, HidlMemory)> {
        match self.create_region(size) {
            Ok(memory) => Ok((true, memory)),
            Err(e) => {
                warn!(size, error = %e, "allocation refused");
                Ok((false, HidlMemory::default()))
            }
        }
    }

    fn batch_allocate(&self, size: u64, count: u32) -> Return<(bool, Vec<HidlMemory>)> {
        let mut regions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.create_region(size) {
                Ok(memory) => regions.push(memory),
                Err(e) => {
                    warn!(size, count, error = %e, "batch allocation refused");
                    return Ok((false, Vec::new()));
                }
            }
        }
        Ok((true, regions))
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_anonymous_fd() -> Result<OwnedFd, MemoryError> {
    use std::os::fd::FromRawFd;

    // SAFETY: the name is a valid NUL-terminated string.
    let fd = unsafe { libc::memfd_create(c"hidl-ashmem".as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(MemoryError::Io(io::Error::last_os_error()));
    }
    // SAFETY: memfd_create returned a new descriptor we now own.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_anonymous_fd() -> Result<OwnedFd, MemoryError> {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT: AtomicU64 = AtomicU64::new(0);

    // Unlinked immediately; only the descriptor keeps the file alive.
    let path = std::env::temp_dir().join(format!(
        "hidl-ashmem-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(MemoryError::Io)?;
    std::fs::remove_file(&path).map_err(MemoryError::Io)?;
    Ok(OwnedFd::from(file))
}
