use std::ptr::{self, NonNull};

use log::debug;

use crate::{
    config::{ALIGNMENT, Backing},
    error::{AllocError, Result},
    kernel,
    utils::align,
};

/// Word used to back boxed arenas, so their start is aligned to [`ALIGNMENT`].
type Word = u32;

const _: () = assert!(size_of::<Word>() == ALIGNMENT);

/// Contiguous memory handed over to a [`BestFitAllocator`](crate::BestFitAllocator).
///
/// The arena owns its memory for its whole lifetime and gives it back on drop,
/// except for `'static` buffers which are simply borrowed forever.
///
/// ```
/// let arena = bestfit::Arena::boxed(1024);
/// assert_eq!(arena.len(), 1024);
/// ```
pub struct Arena {
    start: NonNull<u8>,
    len: usize,
    storage: Storage,
}

enum Storage {
    /// `words` words leaked from a `Box<[Word]>`.
    Boxed { words: usize },
    /// `len` bytes of pages obtained from [`kernel::request_memory`].
    Mapped { len: usize },
    /// Caller provided buffer living for the whole program.
    Static,
}

impl Arena {
    /// Arena of `size` bytes on the global heap, zero initialized.
    pub fn boxed(size: usize) -> Self {
        let words = size.div_ceil(ALIGNMENT);
        let buffer: Box<[Word]> = vec![0; words].into_boxed_slice();
        let raw = Box::into_raw(buffer).cast::<u8>();

        // A boxed slice is never null, even when empty.
        let start = NonNull::new(raw).unwrap_or(NonNull::dangling());

        debug!("boxed arena {:p} ({} bytes)", start, size);

        Self {
            start,
            len: size,
            storage: Storage::Boxed { words },
        }
    }

    /// Arena of `size` bytes mapped straight from the operating system.
    ///
    /// The mapping is rounded up to whole pages but the arena only exposes `size` bytes.
    pub fn mapped(size: usize) -> Result<Self> {
        let len = align(size.max(1), kernel::page_size());

        let start = unsafe { kernel::request_memory(len) }.ok_or(AllocError::MapFailed { len })?;

        debug!("mapped arena {:p} ({} bytes, {} mapped)", start, size, len);

        Ok(Self {
            start,
            len: size,
            storage: Storage::Mapped { len },
        })
    }

    /// Arena over a buffer that lives as long as the program, like a heap placed in
    /// its own linker section.
    pub fn from_static(buffer: &'static mut [u8]) -> Self {
        let len = buffer.len();
        let start = NonNull::from(buffer).cast::<u8>();

        Self {
            start,
            len,
            storage: Storage::Static,
        }
    }

    /// Arena of `size` bytes obtained the way `backing` says.
    pub fn with_backing(size: usize, backing: Backing) -> Result<Self> {
        match backing {
            Backing::Boxed => Ok(Self::boxed(size)),
            Backing::Mapped => Self::mapped(size),
        }
    }

    /// First byte of the arena.
    #[inline]
    pub fn start(&self) -> NonNull<u8> {
        self.start
    }

    /// Length of the arena in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the arena.
    #[inline]
    pub fn end(&self) -> *mut u8 {
        self.start.as_ptr().wrapping_add(self.len)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        match self.storage {
            Storage::Boxed { words } => unsafe {
                let start = self.start.as_ptr().cast::<Word>();
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(start, words)));
            },
            Storage::Mapped { len } => unsafe {
                kernel::return_memory(self.start.as_ptr(), len);
            },
            Storage::Static => {}
        }
    }
}

// The arena is the only handle to its memory.
unsafe impl Send for Arena {}
