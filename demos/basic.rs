use std::ptr::NonNull;

use bestfit::{Arena, BestFitAllocator, HeapConfig};

fn log_alloc(size: i32, addr: NonNull<u8>) {
    println!("Requested {size} bytes of memory");
    println!("Received this address: {addr:?}");
}

fn main() -> Result<(), bestfit::AllocError> {
    env_logger::init();

    let mut allocator = BestFitAllocator::new(Arena::boxed(256), &HeapConfig::default())?;

    let addr1 = allocator.allocate(8)?;
    log_alloc(8, addr1);

    let addr2 = allocator.allocate(40)?;
    log_alloc(40, addr2);

    let addr3 = allocator.allocate(16)?;
    log_alloc(16, addr3);

    // Leaves a 40 byte hole between two used blocks.
    allocator.free(addr2.as_ptr())?;

    // Best fit: the hole is smaller than the tail of the arena, so it wins.
    let addr4 = allocator.allocate(36)?;
    log_alloc(36, addr4);
    println!("Reused the hole: {}", addr4 == addr2);

    for block in allocator.blocks() {
        let status = if block.is_free { "free" } else { "used" };
        println!("  {:#x} {:>4} bytes {status}", block.addr, block.size);
    }

    allocator.free(addr1.as_ptr())?;
    allocator.free(addr3.as_ptr())?;
    allocator.free(addr4.as_ptr())?;

    println!("{:?}", allocator.stats());

    Ok(())
}
