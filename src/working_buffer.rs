//! Kernel working buffer: memory backing dynamically loaded Features.
//!
//! Only the working buffer itself is served. Installing Features in their own
//! ROM/RAM areas is not supported by this kernel configuration, every Feature
//! operation reports [`AllocError::Unsupported`].

use std::ptr::{self, NonNull};

use log::{error, trace, warn};

use crate::{
    allocator::BestFitAllocator,
    arena::Arena,
    config::HeapConfig,
    error::{AllocError, Result},
    locked::Locked,
};

/// Handle of an installed Feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureHandle(pub i32);

/// Reasons a Feature fails to initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FeatureInitError {
    /// The Feature content is corrupted.
    CorruptedContent = 1,
    /// The Feature was built against another Kernel.
    IncompatibleKernelWrongUid = 2,
    /// No more Features can be installed.
    TooManyInstalled = 3,
    /// The Feature is already installed.
    AlreadyInstalled = 4,
    /// The Feature was linked for other Kernel addresses.
    IncompatibleKernelWrongAddresses = 5,
    /// The Feature ROM area overlaps another one.
    RomOverlap = 6,
    /// The Feature RAM area overlaps another one.
    RamOverlap = 7,
    /// The Feature RAM address changed since it was installed.
    RamAddressChanged = 8,
}

impl FeatureInitError {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for FeatureInitError {
    type Error = i32;

    fn try_from(code: i32) -> core::result::Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::CorruptedContent,
            2 => Self::IncompatibleKernelWrongUid,
            3 => Self::TooManyInstalled,
            4 => Self::AlreadyInstalled,
            5 => Self::IncompatibleKernelWrongAddresses,
            6 => Self::RomOverlap,
            7 => Self::RamOverlap,
            8 => Self::RamAddressChanged,
            other => return Err(other),
        })
    }
}

/// The kernel working buffer and its allocator.
///
/// Allocation results are 32-bit aligned addresses, or null when the buffer
/// is exhausted.
pub struct KernelWorkingBuffer {
    allocator: Locked<BestFitAllocator>,
}

impl KernelWorkingBuffer {
    /// Reserves the working buffer described by `config`.
    pub fn new(config: &HeapConfig) -> Result<Self> {
        let arena = Arena::with_backing(config.size, config.backing)?;

        Ok(Self::with_allocator(BestFitAllocator::new(arena, config)?))
    }

    /// Serves the working buffer from an existing allocator.
    pub fn with_allocator(allocator: BestFitAllocator) -> Self {
        Self {
            allocator: Locked::new(allocator),
        }
    }

    /// Allocator behind the working buffer.
    pub fn allocator(&self) -> &Locked<BestFitAllocator> {
        &self.allocator
    }

    /// Allocates `size` bytes of working buffer, or returns null.
    pub fn allocate_working_buffer(&self, size: i32) -> *mut u8 {
        let block = self.allocator.lock().allocate(size);
        trace!("allocate_working_buffer({}) -> {:?}", size, block);

        block.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Releases a chunk obtained from [`allocate_working_buffer`](Self::allocate_working_buffer).
    pub fn free_working_buffer(&self, chunk: *mut u8) {
        trace!("free_working_buffer({:p})", chunk);

        if let Err(err) = self.allocator.lock().free(chunk) {
            warn!("free_working_buffer({:p}): {}", chunk, err);
        }
    }

    pub fn allocate_feature(&self, size_rom: i32, size_ram: i32) -> Result<FeatureHandle> {
        error!(
            "allocate_feature({}, {}): Feature installation is not supported",
            size_rom, size_ram
        );
        Err(AllocError::Unsupported("allocate_feature"))
    }

    pub fn free_feature(&self, handle: FeatureHandle) -> Result<()> {
        error!("free_feature({:?}): Feature installation is not supported", handle);
        Err(AllocError::Unsupported("free_feature"))
    }

    /// Number of installed Features, always zero.
    pub fn allocated_features_count(&self) -> i32 {
        0
    }

    pub fn feature_handle(&self, allocation_index: i32) -> Result<FeatureHandle> {
        error!("feature_handle({}): no Feature is installed", allocation_index);
        Err(AllocError::Unsupported("feature_handle"))
    }

    pub fn feature_address_ram(&self, handle: FeatureHandle) -> Result<NonNull<u8>> {
        error!("feature_address_ram({:?}): no Feature is installed", handle);
        Err(AllocError::Unsupported("feature_address_ram"))
    }

    pub fn feature_address_rom(&self, handle: FeatureHandle) -> Result<NonNull<u8>> {
        error!("feature_address_rom({:?}): no Feature is installed", handle);
        Err(AllocError::Unsupported("feature_address_rom"))
    }

    pub fn copy_to_rom(&self, dest: *mut u8, src: *const u8, size: i32) -> Result<()> {
        error!("copy_to_rom({:p}, {:p}, {}): no Feature ROM area", dest, src, size);
        Err(AllocError::Unsupported("copy_to_rom"))
    }

    pub fn flush_copy_to_rom(&self) -> Result<()> {
        error!("flush_copy_to_rom(): no Feature ROM area");
        Err(AllocError::Unsupported("flush_copy_to_rom"))
    }

    pub fn on_feature_initialization_error(
        &self,
        handle: FeatureHandle,
        error: FeatureInitError,
    ) -> Result<()> {
        warn!(
            "Feature {:?} failed to initialize: {:?} (code {})",
            handle,
            error,
            error.code()
        );
        Err(AllocError::Unsupported("on_feature_initialization_error"))
    }
}
