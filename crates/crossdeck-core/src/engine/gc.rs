//! RT-safe garbage collection for decoded audio
//!
//! A process-wide `basedrop` collector. Decoded tracks live in `Shared<T>`;
//! when the audio thread drops the last reference (a swapped-out deck chain
//! released inside a pull), the pointer is queued and the memory is freed on
//! the collector thread instead.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let frames = Shared::new(&gc_handle(), decoded_frames);
//! ```

use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use basedrop::{Collector, Handle};

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often queued drops are reclaimed
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, it must live on the thread that collects
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // No collector thread: keep a collector that is never drained.
            // Buffers then stay allocated until exit, which is still RT-safe.
            log::error!("Failed to start audio GC thread, deferred drops will not be reclaimed");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Handle for creating `Shared<T>` allocations. Cheap to clone.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
