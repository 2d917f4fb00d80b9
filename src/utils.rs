//! This file contains all the helper functions for the allocator.
//! This are functions that don't particularly belong to any concrete module of the program.

/// It aligns `to_be_aligned` up using `aligment`, which must be a power of two.
///
/// This method is used to round request sizes up to the allocator granularity, to
/// move the start of an arena forward to the first aligned address and to round
/// mapped arenas up to a multiple of [`crate::kernel::page_size`].
pub fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}

/// It aligns `to_be_aligned` down using `aligment`, which must be a power of two.
///
/// Used to pull the end of an arena back so the last block ends on a granule.
pub fn align_down(to_be_aligned: usize, aligment: usize) -> usize {
    to_be_aligned & !(aligment - 1)
}

/// Converts a signed request into the number of arena bytes it occupies.
///
/// Requests lower than or equal to zero do not occupy arena space at all and
/// yield `None`; the caller hands out an empty block for them instead.
pub(crate) fn request_size(size: i32, aligment: usize) -> Option<usize> {
    if size <= 0 {
        return None;
    }

    Some(align(size as usize, aligment))
}
