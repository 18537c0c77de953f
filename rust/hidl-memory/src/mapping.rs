//! Mapping shared memory into this process.

use std::io;
use std::ptr::NonNull;

use tracing::{trace, warn};

use crate::{HidlMemory, MemoryError};

/// A shared memory region mapped read/write into this address space.
///
/// Writes are visible to every other mapping of the same [`HidlMemory`],
/// including the one a HAL server makes on its side. The region is unmapped
/// when this value is dropped; the handle it was mapped from stays valid.
pub struct MappedMemory {
    base: NonNull<u8>,
    len: usize,
    memory: HidlMemory,
}

// SAFETY: MappedMemory owns its mapping exclusively; shared access only hands
// out `&[u8]`, mutable access requires `&mut self`.
unsafe impl Send for MappedMemory {}
unsafe impl Sync for MappedMemory {}

/// Map `memory`, or `None` if the handle is empty or the mapping fails.
pub fn map_memory(memory: &HidlMemory) -> Option<MappedMemory> {
    match MappedMemory::map(memory) {
        Ok(mapped) => Some(mapped),
        Err(e) => {
            warn!(name = memory.name(), size = memory.size(), error = %e, "failed to map memory");
            None
        }
    }
}

impl MappedMemory {
    /// Map the whole region referred to by `memory`.
    pub fn map(memory: &HidlMemory) -> Result<Self, MemoryError> {
        let fd = match memory.raw_fd() {
            Some(fd) if memory.size() > 0 => fd,
            _ => return Err(MemoryError::EmptyHandle),
        };
        let len =
            usize::try_from(memory.size()).map_err(|_| MemoryError::InvalidSize(memory.size()))?;

        // SAFETY: fd is a live descriptor owned by `memory`, len is non-zero.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if addr == libc::MAP_FAILED {
            return Err(MemoryError::Io(io::Error::last_os_error()));
        }

        let base = NonNull::new(addr as *mut u8)
            .ok_or_else(|| MemoryError::Io(io::Error::other("mmap returned null")))?;

        trace!(name = memory.name(), len, "mapped memory");
        Ok(Self {
            base,
            len,
            memory: memory.clone(),
        })
    }

    /// Announce that the caller is about to read or modify the region.
    ///
    /// Anonymous shared memory is coherent, so this only marks the boundary.
    pub fn update(&self) {
        trace!(len = self.len, "memory update");
    }

    /// Announce that the caller is done modifying the region.
    pub fn commit(&self) {
        trace!(len = self.len, "memory commit");
    }

    /// Number of mapped bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The handle this mapping was made from.
    pub fn memory(&self) -> &HidlMemory {
        &self.memory
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: base..base+len is mapped for the lifetime of self.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: base..base+len is mapped for the lifetime of self, and the
        // `&mut self` borrow excludes other access through this mapping.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        // SAFETY: base and len describe the mapping created in `map`.
        unsafe {
            libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.len);
        }
    }
}

impl std::fmt::Debug for MappedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedMemory")
            .field("name", &self.memory.name())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Allocator, AshmemAllocator};

    #[test]
    fn fresh_region_is_zeroed() {
        let (_, memory) = AshmemAllocator::new().allocate(32).unwrap();
        let mapped = map_memory(&memory).unwrap();
        assert_eq!(mapped.len(), 32);
        assert!(mapped.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn writes_are_visible_through_another_mapping() {
        let (_, memory) = AshmemAllocator::new().allocate(100).unwrap();

        let mut writer = map_memory(&memory).unwrap();
        writer.update();
        for (i, byte) in writer.as_mut_slice().iter_mut().enumerate() {
            *byte = i as u8;
        }
        writer.commit();

        // The receiving side only has the (cloned) handle.
        let reader = map_memory(&memory.clone()).unwrap();
        let expected: Vec<u8> = (0..100u8).collect();
        assert_eq!(reader.as_slice(), expected.as_slice());
    }

    #[test]
    fn mapping_outlives_dropped_handle() {
        let (_, memory) = AshmemAllocator::new().allocate(8).unwrap();
        let mut mapped = map_memory(&memory).unwrap();
        drop(memory);

        mapped.as_mut_slice().copy_from_slice(b"soundtrg");
        assert_eq!(mapped.as_slice(), b"soundtrg");
        assert_eq!(mapped.memory().size(), 8);
    }

    #[test]
    fn empty_handle_cannot_be_mapped() {
        assert!(map_memory(&HidlMemory::default()).is_none());
        assert!(matches!(
            MappedMemory::map(&HidlMemory::default()),
            Err(MemoryError::EmptyHandle)
        ));
    }
}
