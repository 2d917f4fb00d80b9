use crate::{
    block::Block,
    list::{Link, List, NodeId},
};

/// Linked list to keep track of free [`Block`].
///
/// This list only stores links to the actual blocks of the
/// [`Region`](crate::region::Region). The reason behind this is that we don't
/// need to store any additional content for blocks which are free, we just
/// need to keep track of them.
///
/// ```text
///                        Free List
///
///            Next free block          Next free block
///        +------------------------+  +------------------+
///        |                        |  |                  |
/// +------|------------------------|--|------------------|-----+
/// | +----|-+    +-------+    +----|--|-+    +-------+  +-|--+ |
/// | | Free | -> | Block | -> |   Free  | -> | Block | -> |Free| |
/// | +------+    +-------+    +---------+    +-------+  +----+ |
/// +-----------------------------------------------------------+
///                          Region
/// ```
///
/// Entries are kept in insertion order. Selection does not depend on that order,
/// see [`FreeList::find_free_block`].
pub(crate) struct FreeList {
    /// Nodes of the list (links to nodes of the region block list)
    pub items: List<NodeId>,
}

impl FreeList {
    /// Creates a new empty List
    pub const fn new() -> Self {
        Self { items: List::new() }
    }

    /// It tells whether the FreeList is empty or not.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of free blocks being tracked.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Inserts an existing `block` into the FreeList and marks it as free.
    pub fn insert_free_block(&mut self, blocks: &mut List<Block>, block: NodeId) -> NodeId {
        blocks[block].data.is_free = true;

        self.items.append(block)
    }

    /// Removes `block` from the FreeList.
    ///
    /// ### Notes
    /// The extra scan here is needed because [`FreeList`] is a list of links but we
    /// are given the block we want to remove, since that's the "high-level" view the
    /// allocator has on the block that it wants to take.
    pub fn remove_free_block(&mut self, block: NodeId) {
        let mut current: Link = self.items.first();

        while let Some(free_node) = current {
            if self.items[free_node].data == block {
                self.items.remove(free_node);

                return;
            }

            current = self.items[free_node].next;
        }
    }

    /// Returns the [`Block`] where we can allocate `size` bytes.
    ///
    /// This is the best-fit policy: we walk the whole list and keep the smallest
    /// free block that is at least `size` bytes long. When several blocks of that
    /// size exist, the one with the lowest address wins, so the choice never
    /// depends on the order in which blocks were freed or merged.
    pub fn find_free_block(&self, blocks: &List<Block>, size: usize) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }

        let mut best: Option<(NodeId, Block)> = None;

        for (_, &node) in &self.items {
            let block = blocks[node].data;

            if block.size < size {
                continue;
            }

            let better = match best {
                None => true,
                Some((_, current)) => (block.size, block.addr) < (current.size, current.addr),
            };

            if better {
                best = Some((node, block));
            }
        }

        best.map(|(node, _)| node)
    }

    /// Free blocks in list order.
    pub fn iter<'a>(&'a self, blocks: &'a List<Block>) -> impl Iterator<Item = Block> + 'a {
        self.items.iter().map(move |(_, &node)| blocks[node].data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a block list out of `(size, is_free)` pairs laid out from address 0,
    /// registering the free ones in a new FreeList.
    fn layout(sizes: &[(usize, bool)]) -> (List<Block>, FreeList, Vec<NodeId>) {
        let mut blocks = List::new();
        let mut free_list = FreeList::new();
        let mut ids = Vec::new();
        let mut addr = 0;

        for &(size, is_free) in sizes {
            let id = blocks.append(Block::new(addr, size, false));
            if is_free {
                free_list.insert_free_block(&mut blocks, id);
            }
            ids.push(id);
            addr += size;
        }

        (blocks, free_list, ids)
    }

    #[test]
    fn empty_list_finds_nothing() {
        let blocks = List::new();
        let free_list = FreeList::new();

        assert!(free_list.is_empty());
        assert_eq!(free_list.find_free_block(&blocks, 4), None);
    }

    #[test]
    fn picks_smallest_block_that_fits() {
        let (blocks, free_list, ids) =
            layout(&[(10, true), (4, false), (50, true), (4, false), (20, true)]);

        assert_eq!(free_list.find_free_block(&blocks, 15), Some(ids[4]));
        assert_eq!(free_list.find_free_block(&blocks, 5), Some(ids[0]));
        assert_eq!(free_list.find_free_block(&blocks, 21), Some(ids[2]));
        assert_eq!(free_list.find_free_block(&blocks, 51), None);
    }

    #[test]
    fn exact_fit_beats_larger_blocks() {
        let (blocks, free_list, ids) = layout(&[(64, true), (4, false), (16, true)]);

        assert_eq!(free_list.find_free_block(&blocks, 16), Some(ids[2]));
    }

    #[test]
    fn ties_go_to_lowest_address() {
        let mut blocks = List::new();
        let mut free_list = FreeList::new();
        let high = blocks.append(Block::new(100, 16, false));
        let low = blocks.insert_before(high, Block::new(0, 16, false));

        // The higher block enters the list first.
        free_list.insert_free_block(&mut blocks, high);
        free_list.insert_free_block(&mut blocks, low);

        assert_eq!(free_list.find_free_block(&blocks, 8), Some(low));
    }

    #[test]
    fn remove_only_drops_the_given_block() {
        let (mut blocks, mut free_list, ids) = layout(&[(8, true), (8, false), (8, true)]);

        free_list.remove_free_block(ids[0]);
        blocks[ids[0]].data.is_free = false;

        assert_eq!(free_list.len(), 1);
        let remaining: Vec<_> = free_list.iter(&blocks).collect();
        assert_eq!(remaining, [Block::new(16, 8, true)]);
    }
}
