/// Wraps spin::Mutex so several tasks can share one allocator.
///
/// The allocators in this crate never lock by themselves. Whoever shares an
/// instance between execution contexts puts it behind a `Locked` and goes
/// through [`Locked::lock`] for every call.
///
/// ```
/// use bestfit::{Arena, BestFitAllocator, HeapConfig, Locked};
///
/// let heap = BestFitAllocator::new(Arena::boxed(64), &HeapConfig::default()).unwrap();
/// let shared = Locked::new(heap);
///
/// let block = shared.lock().allocate(8).unwrap();
/// shared.lock().free(block.as_ptr()).unwrap();
/// ```
pub struct Locked<A> {
    inner: spin::Mutex<A>,
}

impl<A> Locked<A> {
    pub const fn new(inner: A) -> Self {
        Locked {
            inner: spin::Mutex::new(inner),
        }
    }

    pub fn lock(&self) -> spin::MutexGuard<'_, A> {
        self.inner.lock()
    }

    /// Takes the wrapped value back.
    pub fn into_inner(self) -> A {
        self.inner.into_inner()
    }
}
