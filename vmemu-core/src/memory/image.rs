//! C1 — MemoryImage.
//!
//! The spec places kernel structures and user frames at fixed byte
//! offsets inside one 8 MiB region. Per the arena-and-indices redesign in
//! spec.md §9 ("Linked intrusive structures"), kernel-side structures
//! (directory, frame table, free list) are ordinary typed Rust
//! collections rather than overlays computed from byte offsets — only
//! the user frame bytes need to live in one contiguous buffer, since that
//! buffer is what `read_from_addr`/`write_to_addr` copy into and out of
//! and what a frame's `phys_addr` must point into.
//!
//! Storage is one [`std::sync::Mutex`] per frame rather than one mutex
//! over the whole image (spec.md §5's per-FTE lock protects "that
//! frame's descriptor fields **and the byte copy into/out of the
//! frame**" — two threads touching two different resident frames must
//! not block each other).

use std::sync::{Mutex, MutexGuard};

use crate::config::PAGE_SIZE_USIZE;

type Frame = [u8; PAGE_SIZE_USIZE];

/// Owns the raw bytes backing every physical frame, one lock per frame.
pub struct MemoryImage {
    frames: Vec<Mutex<Frame>>,
}

impl MemoryImage {
    /// Zeroes `num_frames` frames of storage. Mirrors the spec's
    /// "zero all 8 MiB" bootstrap step, scoped to just the user region
    /// since kernel structures are no longer byte overlays.
    pub fn new(num_frames: usize) -> Self {
        MemoryImage {
            frames: (0..num_frames).map(|_| Mutex::new([0u8; PAGE_SIZE_USIZE])).collect(),
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Locks frame `index` for the duration of the closure. This is the
    /// only way to touch frame bytes — callers never hold two frame
    /// locks at once, so unrelated frames never contend.
    pub fn with_frame<R>(&self, index: u16, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut guard: MutexGuard<'_, Frame> = self.frames[index as usize].lock().unwrap();
        f(&mut guard[..])
    }
}
