//! Platform constants and per-heap settings.

/// Allocator granularity in bytes. Block sizes and addresses are multiples of it.
pub const ALIGNMENT: usize = 4;

/// Size of the kernel working buffer backing dynamically loaded Features.
pub const KERNEL_WORKING_BUFFER_SIZE: usize = 0x30_0000;

/// Size of the heap serving the TCP/IP stack.
pub const NETWORK_HEAP_SIZE: usize = 0x4_0000;

/// Address an arena must not contain on 32-bit layouts, where addresses are
/// handled as signed words and would change sign in the middle of the arena.
pub const RESERVED_BOUNDARY: usize = 0x8000_0000;

/// Where an [`Arena`](crate::Arena) gets its memory from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backing {
    /// Word-aligned buffer on the global heap.
    #[default]
    Boxed,
    /// Pages mapped directly from the operating system.
    Mapped,
}

/// Settings of one heap instance.
///
/// ```
/// use bestfit::{Backing, HeapConfig};
///
/// let config = HeapConfig::network_heap().with_backing(Backing::Mapped);
/// assert_eq!(config.size, bestfit::NETWORK_HEAP_SIZE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena size in bytes.
    pub size: usize,
    /// Granularity of blocks, a power of two.
    pub alignment: usize,
    /// Source of the arena memory.
    pub backing: Backing,
    /// Address the arena range must not contain, if any. It may end right there.
    pub reserved_boundary: Option<usize>,
}

impl HeapConfig {
    /// Settings for the kernel working buffer.
    pub fn kernel_working_buffer() -> Self {
        Self {
            size: KERNEL_WORKING_BUFFER_SIZE,
            ..Self::default()
        }
    }

    /// Settings for the network heap.
    pub fn network_heap() -> Self {
        Self {
            size: NETWORK_HEAP_SIZE,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_backing(mut self, backing: Backing) -> Self {
        self.backing = backing;
        self
    }

    pub fn with_reserved_boundary(mut self, boundary: Option<usize>) -> Self {
        self.reserved_boundary = boundary;
        self
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            size: NETWORK_HEAP_SIZE,
            alignment: ALIGNMENT,
            backing: Backing::default(),
            reserved_boundary: default_reserved_boundary(),
        }
    }
}

/// Only 32-bit layouts carry the reserved boundary.
const fn default_reserved_boundary() -> Option<usize> {
    if cfg!(target_pointer_width = "32") {
        Some(RESERVED_BOUNDARY)
    } else {
        None
    }
}
