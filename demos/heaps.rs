//! Both heaps of the platform, the network heap shared by several threads.

use std::{sync::Arc, thread};

use bestfit::{Backing, HeapConfig, KernelWorkingBuffer, NetworkHeap};

fn main() -> Result<(), bestfit::AllocError> {
    env_logger::init();

    let kernel = KernelWorkingBuffer::new(&HeapConfig::kernel_working_buffer())?;
    let chunk = kernel.allocate_working_buffer(64 * 1024);
    println!("Working buffer chunk at: {chunk:p}");
    println!("Feature installation: {:?}", kernel.allocate_feature(1024, 1024));
    kernel.free_working_buffer(chunk);

    let network = Arc::new(NetworkHeap::new(
        &HeapConfig::network_heap().with_backing(Backing::Mapped),
    )?);

    let workers: Vec<_> = (0..4)
        .map(|id| {
            let network = Arc::clone(&network);
            thread::spawn(move || {
                let packet = network.calloc(1536, 1);
                println!("Thread {id} got packet buffer at {packet:p}");
                network.free(packet);
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    println!("Network heap: {:?}", network.allocator().lock().stats());

    Ok(())
}
