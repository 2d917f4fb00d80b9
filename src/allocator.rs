use std::ptr::NonNull;

use log::{debug, trace, warn};

use crate::{
    arena::Arena,
    block::BlockInfo,
    config::HeapConfig,
    error::{AllocError, Result},
    freelist::FreeList,
    region::Region,
    utils::{align, align_down, request_size},
};

/// General purpose best-fit allocator working inside one contiguous arena
/// `[start, end)`.
///
/// Every request is served from the smallest free block able to hold it, carving
/// the request off the low end of that block. Released blocks are merged with
/// their free neighbours straight away, so the arena never holds two free blocks
/// side by side.
///
/// Requests lower than or equal to zero get an *empty block*: the address
/// [`end`](Self::end), which never overlaps an allocation of this allocator and
/// must not be dereferenced. Another arena placed right after this one may well
/// start there. Empty blocks are counted and can be freed like any other block.
///
/// The allocator never locks. Every mutating call takes `&mut self`; share an
/// instance between tasks through [`Locked`](crate::Locked).
///
/// ```
/// use bestfit::{Arena, BestFitAllocator, HeapConfig};
///
/// let mut heap = BestFitAllocator::new(Arena::boxed(256), &HeapConfig::default()).unwrap();
///
/// let block = heap.allocate(10).unwrap();
/// assert_eq!(heap.usable_size(block.as_ptr()), Some(12));
///
/// heap.free(block.as_ptr()).unwrap();
/// assert_eq!(heap.stats().free_bytes, 256);
/// ```
pub struct BestFitAllocator {
    /// First aligned byte of the arena, carries the provenance of every block.
    base: NonNull<u8>,
    region: Region,
    free_list: FreeList,
    alignment: usize,
    /// Outstanding empty blocks.
    empty_blocks: usize,
    /// Owned backing memory, `None` for raw ranges.
    _arena: Option<Arena>,
}

/// Snapshot of the state of an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Bytes managed by the allocator.
    pub capacity: usize,
    /// Bytes currently in free blocks.
    pub free_bytes: usize,
    /// Bytes currently handed out.
    pub used_bytes: usize,
    /// Number of blocks, free and used.
    pub blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Size of the largest free block, the biggest request that can succeed.
    pub largest_free_block: usize,
    /// Outstanding empty blocks.
    pub empty_blocks: usize,
}

impl BestFitAllocator {
    /// Creates an allocator managing the whole of `arena`.
    ///
    /// Only `config.alignment` and `config.reserved_boundary` apply here. The arena
    /// is already reserved, so `config.size` and `config.backing` are ignored; they
    /// are read by [`Arena::with_backing`] and by the heaps built from a config.
    pub fn new(arena: Arena, config: &HeapConfig) -> Result<Self> {
        let start = arena.start().as_ptr();
        let mut allocator = unsafe { Self::from_raw_range(start, arena.end(), config)? };
        allocator._arena = Some(arena);

        Ok(allocator)
    }

    /// Creates an allocator working within `[start, end)`.
    ///
    /// `start` is moved up and `end` down to the configured alignment. The range
    /// must not contain `config.reserved_boundary`, though it may end right at it.
    ///
    /// # Safety
    ///
    /// The range must be valid for reads and writes for as long as the allocator and
    /// the blocks it hands out are used, and nothing else may access it meanwhile.
    pub unsafe fn from_raw_range(
        start: *mut u8,
        end: *mut u8,
        config: &HeapConfig,
    ) -> Result<Self> {
        let alignment = config.alignment;
        if !alignment.is_power_of_two() {
            return Err(AllocError::InvalidAlignment { alignment });
        }

        let (raw_start, raw_end) = (start as usize, end as usize);

        if let Some(boundary) = config.reserved_boundary {
            if (raw_start..raw_end).contains(&boundary) {
                return Err(AllocError::ReservedBoundary {
                    start: raw_start,
                    end: raw_end,
                    boundary,
                });
            }
        }

        let aligned_start = align(raw_start, alignment);
        let aligned_end = align_down(raw_end, alignment);
        if raw_end <= raw_start || aligned_end <= aligned_start {
            return Err(AllocError::EmptyArena {
                start: raw_start,
                end: raw_end,
            });
        }

        let base = NonNull::new(start.wrapping_add(aligned_start - raw_start)).ok_or(
            AllocError::EmptyArena {
                start: raw_start,
                end: raw_end,
            },
        )?;

        let mut free_list = FreeList::new();
        let region = Region::new(aligned_start, aligned_end, &mut free_list);

        debug!(
            "best-fit allocator over [{:#x}, {:#x}) ({} bytes)",
            aligned_start,
            aligned_end,
            aligned_end - aligned_start
        );

        Ok(Self {
            base,
            region,
            free_list,
            alignment,
            empty_blocks: 0,
            _arena: None,
        })
    }

    /// Allocates a new block of at least `size` bytes.
    ///
    /// If `size` is lower than or equal to 0, returns an empty block. Returns
    /// [`AllocError::OutOfMemory`] when no free block is large enough, leaving the
    /// allocator untouched.
    pub fn allocate(&mut self, size: i32) -> Result<NonNull<u8>> {
        let Some(needed) = request_size(size, self.alignment) else {
            self.empty_blocks += 1;
            trace!("allocate({}) -> empty block", size);

            return Ok(self.empty_block());
        };

        let Some(node) = self.free_list.find_free_block(&self.region.blocks, needed) else {
            warn!("allocate({}) -> out of memory ({} bytes free)", size, self.free_bytes());

            return Err(AllocError::OutOfMemory { size: needed });
        };

        let block = self.region.blocks[node].data;

        let used = if block.size == needed {
            // Exact fit, the whole block leaves the free list.
            self.free_list.remove_free_block(node);
            self.region.blocks[node].data.is_free = false;
            node
        } else {
            self.region.split_front(node, needed)
        };

        let addr = self.region.blocks[used].data.addr;
        let ptr = self.pointer_to(addr);
        trace!("allocate({}) -> {:p} ({} bytes)", size, ptr, needed);

        Ok(ptr)
    }

    /// Releases a block previously returned by [`allocate`](Self::allocate).
    ///
    /// A null `block` is ignored. Anything that is not an outstanding block of this
    /// allocator, such as a block released twice, is rejected with
    /// [`AllocError::InvalidFree`] and leaves the allocator untouched.
    pub fn free(&mut self, block: *mut u8) -> Result<()> {
        if block.is_null() {
            return Ok(());
        }

        let addr = block as usize;

        if addr == self.region.end {
            if self.empty_blocks == 0 {
                warn!("free({:p}) -> no empty block outstanding", block);
                return Err(AllocError::InvalidFree { addr });
            }

            self.empty_blocks -= 1;
            trace!("free({:p}) -> empty block", block);

            return Ok(());
        }

        let mut node = match self.region.find_block(addr) {
            Some(node) if !self.region.blocks[node].data.is_free => node,
            _ => {
                warn!("free({:p}) -> not an allocated block", block);
                return Err(AllocError::InvalidFree { addr });
            }
        };

        trace!("free({:p}) ({} bytes)", block, self.region.blocks[node].data.size);

        self.free_list.insert_free_block(&mut self.region.blocks, node);
        self.region.merge_with_next(node, &mut self.free_list);
        self.region.merge_with_prev(&mut node, &mut self.free_list);

        Ok(())
    }

    /// Address handed out for requests lower than or equal to zero.
    #[inline]
    pub fn empty_block(&self) -> NonNull<u8> {
        self.pointer_to(self.region.end)
    }

    /// First address managed by the allocator.
    #[inline]
    pub fn start(&self) -> usize {
        self.region.start
    }

    /// One past the last address managed by the allocator.
    #[inline]
    pub fn end(&self) -> usize {
        self.region.end
    }

    /// Number of bytes managed by the allocator.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.end - self.region.start
    }

    /// Whether `ptr` falls inside `[start, end)`.
    pub fn contains(&self, ptr: *const u8) -> bool {
        (self.region.start..self.region.end).contains(&(ptr as usize))
    }

    /// Size of the allocated block starting at `ptr`, if there is one.
    pub fn usable_size(&self, ptr: *const u8) -> Option<usize> {
        let node = self.region.find_block(ptr as usize)?;
        let block = self.region.blocks[node].data;

        (!block.is_free).then_some(block.size)
    }

    /// All blocks, in address order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.region.blocks.iter().map(|(_, block)| block.info())
    }

    /// Free blocks, in free list order.
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        self.free_list.iter(&self.region.blocks).map(|block| block.info())
    }

    /// Current state of the allocator.
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            capacity: self.capacity(),
            blocks: self.region.blocks.len(),
            free_blocks: self.free_list.len(),
            empty_blocks: self.empty_blocks,
            ..HeapStats::default()
        };

        for block in self.blocks() {
            if block.is_free {
                stats.free_bytes += block.size;
                stats.largest_free_block = stats.largest_free_block.max(block.size);
            } else {
                stats.used_bytes += block.size;
            }
        }

        stats
    }

    /// Checks the block partition and the free list.
    ///
    /// Blocks must cover `[start, end)` in address order without gaps, no two free
    /// blocks may be neighbours, and the free list must hold every free block once.
    pub fn verify(&self) -> Result<()> {
        let mut expected = self.region.start;
        let mut previous_free = false;
        let mut free_blocks = 0;

        for block in self.blocks() {
            if block.addr != expected {
                return Err(AllocError::Corrupted("blocks do not partition the arena"));
            }
            if block.size == 0 || block.size % self.alignment != 0 {
                return Err(AllocError::Corrupted("block size is not a whole number of granules"));
            }
            if block.is_free && previous_free {
                return Err(AllocError::Corrupted("adjacent free blocks"));
            }

            free_blocks += usize::from(block.is_free);
            previous_free = block.is_free;
            expected = block.end();
        }

        if expected != self.region.end {
            return Err(AllocError::Corrupted("blocks do not reach the end of the arena"));
        }

        if self.free_list.len() != free_blocks || self.free_blocks().any(|block| !block.is_free) {
            return Err(AllocError::Corrupted("free list out of sync with blocks"));
        }

        Ok(())
    }

    fn free_bytes(&self) -> usize {
        self.free_blocks().map(|block| block.size).sum()
    }

    /// Pointer to `addr`, derived from the arena start.
    fn pointer_to(&self, addr: usize) -> NonNull<u8> {
        unsafe { self.base.add(addr - self.region.start) }
    }
}

// The allocator is the only owner of its arena and of the blocks bookkeeping.
unsafe impl Send for BestFitAllocator {}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn heap(size: usize) -> BestFitAllocator {
        BestFitAllocator::new(Arena::boxed(size), &HeapConfig::default()).unwrap()
    }

    fn layout(heap: &BestFitAllocator) -> Vec<(usize, bool)> {
        heap.blocks().map(|block| (block.size, block.is_free)).collect()
    }

    #[test]
    fn starts_as_one_free_block() {
        let heap = heap(128);

        assert_eq!(layout(&heap), [(128, true)]);
        assert_eq!(heap.capacity(), 128);
        heap.verify().unwrap();
    }

    #[test]
    fn allocations_are_carved_from_the_front() {
        let mut heap = heap(128);

        let a = heap.allocate(10).unwrap();
        let b = heap.allocate(4).unwrap();

        assert_eq!(a.as_ptr() as usize, heap.start());
        assert_eq!(b.as_ptr() as usize, heap.start() + 12);
        assert_eq!(layout(&heap), [(12, false), (4, false), (112, true)]);
        heap.verify().unwrap();
    }

    #[test]
    fn exact_fit_consumes_the_whole_block() {
        let mut heap = heap(32);

        heap.allocate(32).unwrap();

        assert_eq!(layout(&heap), [(32, false)]);
        assert_eq!(heap.stats().free_blocks, 0);
        heap.verify().unwrap();
    }

    #[test]
    fn out_of_memory_has_no_side_effects() {
        let mut heap = heap(64);
        heap.allocate(40).unwrap();
        let before = layout(&heap);

        assert_eq!(heap.allocate(25), Err(AllocError::OutOfMemory { size: 28 }));
        assert_eq!(layout(&heap), before);
    }

    #[test]
    fn empty_blocks_take_no_space() {
        let mut heap = heap(64);

        let zero = heap.allocate(0).unwrap();
        let negative = heap.allocate(-5).unwrap();

        assert_eq!(zero, negative);
        assert_eq!(zero, heap.empty_block());
        assert!(!heap.contains(zero.as_ptr()));
        assert_eq!(heap.stats().empty_blocks, 2);
        assert_eq!(heap.stats().free_bytes, 64);

        heap.free(zero.as_ptr()).unwrap();
        heap.free(negative.as_ptr()).unwrap();
        assert_eq!(
            heap.free(zero.as_ptr()),
            Err(AllocError::InvalidFree { addr: heap.end() })
        );
    }

    #[test]
    fn empty_blocks_survive_a_full_heap() {
        let mut heap = heap(16);
        heap.allocate(16).unwrap();

        assert!(heap.allocate(0).is_ok());
        assert!(heap.allocate(1).is_err());
    }

    #[test]
    fn free_null_is_a_no_op() {
        let mut heap = heap(16);

        assert_eq!(heap.free(std::ptr::null_mut()), Ok(()));
        assert_eq!(layout(&heap), [(16, true)]);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut heap = heap(64);
        let a = heap.allocate(8).unwrap();
        heap.allocate(8).unwrap();

        heap.free(a.as_ptr()).unwrap();
        let addr = a.as_ptr() as usize;

        assert_eq!(heap.free(a.as_ptr()), Err(AllocError::InvalidFree { addr }));
        heap.verify().unwrap();
    }

    #[test]
    fn interior_and_foreign_pointers_are_rejected() {
        let mut heap = heap(64);
        let a = heap.allocate(16).unwrap();
        let mut outside = 0u8;

        let interior = a.as_ptr().wrapping_add(4);
        assert!(matches!(heap.free(interior), Err(AllocError::InvalidFree { .. })));
        assert!(matches!(heap.free(&mut outside), Err(AllocError::InvalidFree { .. })));
        assert_eq!(heap.usable_size(a.as_ptr()), Some(16));
    }

    #[test]
    fn free_merges_with_both_neighbours() {
        let mut heap = heap(48);
        let a = heap.allocate(16).unwrap();
        let b = heap.allocate(16).unwrap();
        let c = heap.allocate(16).unwrap();

        heap.free(a.as_ptr()).unwrap();
        heap.free(c.as_ptr()).unwrap();
        assert_eq!(layout(&heap), [(16, true), (16, false), (16, true)]);

        heap.free(b.as_ptr()).unwrap();
        assert_eq!(layout(&heap), [(48, true)]);
        assert_eq!(heap.stats().free_blocks, 1);
        heap.verify().unwrap();
    }

    #[test]
    fn freed_space_is_reused() {
        let mut heap = heap(64);
        let a = heap.allocate(8).unwrap();
        heap.allocate(8).unwrap();

        heap.free(a.as_ptr()).unwrap();

        assert_eq!(heap.allocate(8).unwrap(), a);
    }

    #[test]
    fn stats_add_up() {
        let mut heap = heap(100);
        heap.allocate(10).unwrap();
        let b = heap.allocate(20).unwrap();
        heap.allocate(30).unwrap();
        heap.free(b.as_ptr()).unwrap();

        let stats = heap.stats();

        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.used_bytes, 12 + 32);
        assert_eq!(stats.free_bytes, 100 - 44);
        assert_eq!(stats.blocks, 4);
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.largest_free_block, 36);
    }

    #[test]
    fn unaligned_ranges_are_trimmed() {
        let arena = Arena::boxed(64);
        let start = arena.start().as_ptr();

        let heap = unsafe {
            BestFitAllocator::from_raw_range(
                start.wrapping_add(1),
                start.wrapping_add(63),
                &HeapConfig::default(),
            )
        }
        .unwrap();

        assert_eq!(heap.start(), start as usize + 4);
        assert_eq!(heap.end(), start as usize + 60);
        drop(heap);
        drop(arena);
    }

    #[test]
    fn rejects_empty_ranges() {
        let arena = Arena::boxed(8);
        let start = arena.start().as_ptr();

        let config = HeapConfig::default();
        let result = unsafe {
            BestFitAllocator::from_raw_range(start.wrapping_add(1), start.wrapping_add(3), &config)
        };
        assert!(matches!(result, Err(AllocError::EmptyArena { .. })));

        let result = BestFitAllocator::new(Arena::boxed(0), &HeapConfig::default());
        assert!(matches!(result, Err(AllocError::EmptyArena { .. })));
    }

    #[test]
    fn arena_size_wins_over_config_size() {
        let config = HeapConfig::default().with_size(4096);

        let heap = BestFitAllocator::new(Arena::boxed(64), &config).unwrap();

        assert_eq!(heap.capacity(), 64);
    }

    #[test]
    fn empty_block_may_be_the_start_of_a_neighbour_arena() {
        let mut words = vec![0u32; 16];
        let start = words.as_mut_ptr().cast::<u8>();
        let config = HeapConfig::default();
        let (mid, end) = unsafe { (start.add(32), start.add(64)) };

        let mut low = unsafe { BestFitAllocator::from_raw_range(start, mid, &config) }.unwrap();
        let mut high = unsafe { BestFitAllocator::from_raw_range(mid, end, &config) }.unwrap();

        let empty = low.allocate(0).unwrap();
        let first = high.allocate(8).unwrap();
        assert_eq!(empty, first);

        // Each allocator only knows about its own blocks.
        assert!(!low.contains(empty.as_ptr()));
        assert_eq!(low.usable_size(empty.as_ptr()), None);
        low.free(empty.as_ptr()).unwrap();
        assert_eq!(
            low.free(empty.as_ptr()),
            Err(AllocError::InvalidFree { addr: mid as usize })
        );
        assert_eq!(high.usable_size(first.as_ptr()), Some(8));
        high.free(first.as_ptr()).unwrap();
        high.verify().unwrap();
    }

    #[test]
    fn rejects_ranges_starting_at_the_reserved_boundary() {
        let config = HeapConfig::default().with_reserved_boundary(Some(0x8000_0000));
        let start = 0x8000_0000usize as *mut u8;
        let end = 0x8000_0100usize as *mut u8;

        let result = unsafe { BestFitAllocator::from_raw_range(start, end, &config) };

        assert!(matches!(
            result,
            Err(AllocError::ReservedBoundary { start: 0x8000_0000, .. })
        ));
    }

    #[test]
    fn accepts_ranges_ending_at_the_reserved_boundary() {
        let config = HeapConfig::default().with_reserved_boundary(Some(0x8000_0000));
        let start = 0x7fff_ff00usize as *mut u8;
        let end = 0x8000_0000usize as *mut u8;

        // Nothing is allocated, the range is only recorded.
        let heap = unsafe { BestFitAllocator::from_raw_range(start, end, &config) }.unwrap();

        assert_eq!(heap.start(), 0x7fff_ff00);
        assert_eq!(heap.end(), 0x8000_0000);
        assert_eq!(heap.capacity(), 0x100);
    }

    #[test]
    fn rejects_ranges_straddling_the_reserved_boundary() {
        let config = HeapConfig::default().with_reserved_boundary(Some(0x8000_0000));
        let start = 0x7fff_0000usize as *mut u8;
        let end = 0x8001_0000usize as *mut u8;

        let result = unsafe { BestFitAllocator::from_raw_range(start, end, &config) };

        assert_eq!(
            result.err(),
            Some(AllocError::ReservedBoundary {
                start: 0x7fff_0000,
                end: 0x8001_0000,
                boundary: 0x8000_0000
            })
        );
    }

    #[test]
    fn rejects_bad_alignment() {
        let config = HeapConfig::default().with_alignment(3);

        let result = BestFitAllocator::new(Arena::boxed(64), &config);

        assert!(matches!(result, Err(AllocError::InvalidAlignment { alignment: 3 })));
    }
}
