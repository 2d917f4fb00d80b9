//! General purpose best-fit allocator over fixed memory regions.
//!
//! A [`BestFitAllocator`] manages one contiguous arena `[start, end)` handed to it
//! once, at construction. It serves each request from the smallest free block that
//! can hold it and merges released blocks with their free neighbours, so the arena
//! stays partitioned in used and free blocks with never two free blocks side by side.
//!
//! ```text
//!   start                                                          end
//!   +--------+------------------+--------+-------------------------+
//!   |  used  |       free       |  used  |          free           |
//!   +--------+------------------+--------+-------------------------+
//!                  ^                                   ^
//!                  +------------ free list ------------+
//! ```
//!
//! Block bookkeeping lives outside the arena, so the arena bytes all belong to the
//! callers. Two heaps are built on top of it: the [`KernelWorkingBuffer`] backing
//! dynamically loaded Features and the [`NetworkHeap`] serving the TCP/IP stack.
//!
//! The allocator performs no locking. Wrap it in [`Locked`] to share it.

mod allocator;
mod arena;
mod block;
mod config;
mod error;
mod freelist;
mod kernel;
mod list;
mod locked;
mod network_heap;
mod region;
mod utils;
mod working_buffer;

pub use allocator::{BestFitAllocator, HeapStats};
pub use arena::Arena;
pub use block::BlockInfo;
pub use config::{
    ALIGNMENT, Backing, HeapConfig, KERNEL_WORKING_BUFFER_SIZE, NETWORK_HEAP_SIZE,
    RESERVED_BOUNDARY,
};
pub use error::{AllocError, Result};
pub use kernel::page_size;
pub use locked::Locked;
pub use network_heap::NetworkHeap;
pub use working_buffer::{FeatureHandle, FeatureInitError, KernelWorkingBuffer};
