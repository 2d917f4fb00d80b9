use log::debug;

use crate::{
    block::Block,
    freelist::FreeList,
    list::{List, NodeId},
};

/// This struct contains the arena specific metadata: the address range that was
/// handed to the allocator and the blocks partitioning it.
///
/// Blocks are kept sorted by address and always cover `[start, end)` exactly, with no
/// gaps and no overlaps. Two free blocks are never neighbours, every release merges
/// them, see [`Region::merge_with_prev`] and [`Region::merge_with_next`].
///
/// ```text
/// +-----------------------------------------------+
/// |        | +-------+    +-------+    +-------+  |
/// | Region | | Block | -> | Block | -> | Block |  |
/// |        | +-------+    +-------+    +-------+  |
/// +-----------------------------------------------+
/// ```
pub(crate) struct Region {
    /// First address of the arena (aligned)
    pub start: usize,
    /// One past the last address of the arena (aligned)
    pub end: usize,
    /// List of blocks in the region, in address order
    pub blocks: List<Block>,
}

impl Region {
    /// Creates a region made of one single free block spanning `[start, end)`.
    /// The block is registered in `free_list`.
    pub(crate) fn new(start: usize, end: usize, free_list: &mut FreeList) -> Self {
        let mut region = Self {
            start,
            end,
            blocks: List::new(),
        };

        let first = region.blocks.append(Block::new(start, end - start, true));
        free_list.insert_free_block(&mut region.blocks, first);

        region
    }

    /// Finds the block that starts exactly at `addr`.
    pub(crate) fn find_block(&self, addr: usize) -> Option<NodeId> {
        if addr < self.start || addr >= self.end {
            return None;
        }

        self.blocks
            .iter()
            .take_while(|(_, block)| block.addr <= addr)
            .find(|(_, block)| block.addr == addr)
            .map(|(node, _)| node)
    }

    /// Carves `size` bytes off the front of the free block `node`.
    ///
    /// The carved part becomes a new used block placed right before `node`, and
    /// `node` keeps the remainder. As `node` stays free, its free list entry remains
    /// valid and nothing has to be inserted or removed there.
    ///
    /// ```text
    /// +-----------------------+        +--------+--------------+
    /// |       free (node)     |  --->  |  used  | free (node)  |
    /// +-----------------------+        +--------+--------------+
    /// ```
    ///
    /// `size` must be smaller than the block size.
    pub(crate) fn split_front(&mut self, node: NodeId, size: usize) -> NodeId {
        let remainder = &mut self.blocks[node].data;
        let used = Block::new(remainder.addr, size, false);

        remainder.addr += size;
        remainder.size -= size;

        self.blocks.insert_before(node, used)
    }

    /// Tries to merge the given block `node` with the previous one
    /// on the list. This can be performed if that previous block is free.
    ///
    /// Both blocks must already be in `free_list`. The entry of `node` is dropped and
    /// `node` is updated to point at the surviving block.
    pub(crate) fn merge_with_prev(&mut self, node: &mut NodeId, free_list: &mut FreeList) {
        let Some(prev_node) = self.blocks[*node].prev else {
            return;
        };

        if !self.blocks[prev_node].data.is_free {
            return;
        }

        // The previous block absorbs this one, so only its entry survives.
        free_list.remove_free_block(*node);

        let block = self.blocks.remove(*node);
        let prev_block = &mut self.blocks[prev_node].data;
        prev_block.size += block.size;

        debug!(
            "merged {:#x} ({} bytes) into previous block {:#x} ({} bytes)",
            block.addr, block.size, prev_block.addr, prev_block.size
        );

        // The current block is now its previous one
        *node = prev_node;
    }

    /// Tries to merge the given block `node` with the next one on the
    /// list. This can be performed if that next block is free.
    pub(crate) fn merge_with_next(&mut self, node: NodeId, free_list: &mut FreeList) {
        let Some(next_node) = self.blocks[node].next else {
            return;
        };

        if !self.blocks[next_node].data.is_free {
            return;
        }

        // The current block is already on the free_list, it just absorbs the next one.
        free_list.remove_free_block(next_node);

        let next_block = self.blocks.remove(next_node);
        let block = &mut self.blocks[node].data;
        block.size += next_block.size;

        debug!(
            "merged next block {:#x} ({} bytes) into {:#x} ({} bytes)",
            next_block.addr, next_block.size, block.addr, block.size
        );
    }
}
