/// This is the structure of a block: a maximal run of contiguous arena bytes that is
/// either handed out to a caller or waiting in the [`crate::freelist::FreeList`].
///
/// Blocks carry no in-band header. Their metadata lives in the block list of the
/// [`crate::region::Region`], which keeps them sorted by address:
///
/// ```text
///   start                                                     end
///   +-----------+-------------------+-----------+-------------+
///   | used (12) |     free (40)     | used (8)  |  free (...) |
///   +-----------+-------------------+-----------+-------------+
/// ```
///
/// Sizes are always a multiple of the allocator granularity, see [`crate::utils::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    /// First address of the block.
    pub addr: usize,
    /// Size of the block.
    pub size: usize,
    /// Flag to tell whether the block is free or not.
    pub is_free: bool,
}

impl Block {
    pub const fn new(addr: usize, size: usize, is_free: bool) -> Self {
        Self { addr, size, is_free }
    }

    /// Public snapshot of this block.
    pub const fn info(&self) -> BlockInfo {
        BlockInfo {
            addr: self.addr,
            size: self.size,
            is_free: self.is_free,
        }
    }
}

/// Read-only view of a block, as returned by
/// [`BestFitAllocator::blocks`](crate::BestFitAllocator::blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    /// Start address of the block.
    pub addr: usize,
    /// Length of the block in bytes.
    pub size: usize,
    /// `true` while the block waits in the free list.
    pub is_free: bool,
}

impl BlockInfo {
    /// One past the last address of the block.
    #[inline]
    pub const fn end(&self) -> usize {
        self.addr + self.size
    }
}
