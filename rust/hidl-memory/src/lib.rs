//! Shared memory for HAL payloads.
//!
//! Large HAL arguments (sound model blobs, recognition payloads) do not travel
//! inline. The client asks an allocator service for a region, maps it, writes
//! into it, and hands the server a [`HidlMemory`] handle. The server maps the
//! same handle and sees the same bytes.
//!
//! - [`Allocator`]: the allocator service contract, resolved from a
//!   [`ServiceManager`](hal_service_manager::ServiceManager) by instance name
//!   (conventionally [`ASHMEM_INSTANCE`]).
//! - [`AshmemAllocator`]: anonymous shared memory backed by `memfd_create`.
//! - [`map_memory`]: map a handle into this address space as a
//!   [`MappedMemory`], unmapped again on drop.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;

mod allocator;
mod mapping;

pub use allocator::{ASHMEM_INSTANCE, Allocator, AshmemAllocator, MAX_ALLOCATION_SIZE};
pub use mapping::{MappedMemory, map_memory};

/// Handle to a shared memory region.
///
/// Cloning the handle shares the underlying descriptor; the region lives until
/// the last handle and the last mapping are gone. The default handle is empty:
/// it refers to no region and cannot be mapped.
#[derive(Debug, Clone, Default)]
pub struct HidlMemory {
    name: String,
    size: u64,
    fd: Option<Arc<OwnedFd>>,
}

static_assertions::assert_impl_all!(HidlMemory: Send, Sync);

impl HidlMemory {
    /// Wrap an already-sized shared memory descriptor.
    pub fn new(name: impl Into<String>, fd: OwnedFd, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            fd: Some(Arc::new(fd)),
        }
    }

    /// Name of the allocator that produced the region (e.g. `"ashmem"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the region in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// True when the handle refers to no region.
    pub fn is_empty(&self) -> bool {
        self.fd.is_none() || self.size == 0
    }

    pub(crate) fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }
}

/// Errors from creating or mapping shared memory.
#[derive(Debug)]
pub enum MemoryError {
    /// I/O error from the OS.
    Io(io::Error),
    /// Requested size is zero or too large.
    InvalidSize(u64),
    /// The handle refers to no region.
    EmptyHandle,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::InvalidSize(size) => write!(f, "invalid region size: {}", size),
            Self::EmptyHandle => write!(f, "memory handle refers to no region"),
        }
    }
}

impl std::error::Error for MemoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
