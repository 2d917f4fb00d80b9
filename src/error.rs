use thiserror::Error;

/// Errors reported by the allocator and the heaps built on it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("out of memory (requested: {size} bytes)")]
    OutOfMemory { size: usize },

    #[error("address {addr:#x} is not the start of an allocated block")]
    InvalidFree { addr: usize },

    #[error("arena [{start:#x}, {end:#x}) does not hold a single aligned granule")]
    EmptyArena { start: usize, end: usize },

    #[error("arena [{start:#x}, {end:#x}) contains reserved address {boundary:#x}")]
    ReservedBoundary {
        start: usize,
        end: usize,
        boundary: usize,
    },

    #[error("invalid alignment (must be power of 2): {alignment}")]
    InvalidAlignment { alignment: usize },

    #[error("platform refused to map {len} bytes")]
    MapFailed { len: usize },

    #[error("{0} is not supported by this kernel configuration")]
    Unsupported(&'static str),

    #[error("heap corrupted: {0}")]
    Corrupted(&'static str),
}

pub type Result<T> = core::result::Result<T, AllocError>;
