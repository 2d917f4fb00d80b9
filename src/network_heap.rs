//! Heap serving the TCP/IP stack memory hooks (`malloc`, `calloc` and `free`).

use std::ptr::{self, NonNull};

use log::{trace, warn};

use crate::{
    allocator::BestFitAllocator,
    arena::Arena,
    config::HeapConfig,
    error::Result,
    locked::Locked,
};

/// The network heap and its allocator. Failures surface as null pointers,
/// which the network stack treats as out of memory.
pub struct NetworkHeap {
    allocator: Locked<BestFitAllocator>,
}

impl NetworkHeap {
    /// Reserves the heap described by `config`.
    pub fn new(config: &HeapConfig) -> Result<Self> {
        let arena = Arena::with_backing(config.size, config.backing)?;

        Ok(Self::with_allocator(BestFitAllocator::new(arena, config)?))
    }

    pub fn with_allocator(allocator: BestFitAllocator) -> Self {
        Self {
            allocator: Locked::new(allocator),
        }
    }

    pub fn allocator(&self) -> &Locked<BestFitAllocator> {
        &self.allocator
    }

    /// Allocates `size` bytes, or returns null.
    pub fn allocate(&self, size: i32) -> *mut u8 {
        let block = self.allocator.lock().allocate(size);
        trace!("network heap allocate({}) -> {:?}", size, block);

        block.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Allocates `n` elements of `size` bytes each, all set to zero, or returns null.
    pub fn calloc(&self, n: i32, size: i32) -> *mut u8 {
        let Some(total) = n.checked_mul(size) else {
            warn!("network heap calloc({}, {}) -> size overflow", n, size);
            return ptr::null_mut();
        };

        let block = self.allocate(total);
        if !block.is_null() && total > 0 {
            unsafe { block.write_bytes(0, total as usize) };
        }

        block
    }

    /// Releases a block, null is ignored.
    pub fn free(&self, block: *mut u8) {
        trace!("network heap free({:p})", block);

        if let Err(err) = self.allocator.lock().free(block) {
            warn!("network heap free({:p}): {}", block, err);
        }
    }
}
