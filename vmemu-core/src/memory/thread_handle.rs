//! C6 — ThreadHandle (VMM-side).

use std::sync::atomic::{AtomicU32, Ordering};

/// `{ threadId, heapBottom, stackTop }` per spec.md §3/§4.6. `heap_bottom`
/// and `stack_top` are atomics because `allocate_heap_mem` /
/// `allocate_stack_mem` update them without taking a page-table lock —
/// they're per-thread fields nothing else mutates concurrently for the
/// same thread, but a plain `u32` would still need a `Mutex` to be `Sync`.
pub struct ThreadHandle {
    pub thread_id: u8,
    heap_bottom: AtomicU32,
    stack_top: AtomicU32,
}

impl ThreadHandle {
    pub fn new(thread_id: u8, user_base: u32, stack_top_init: u32) -> Self {
        ThreadHandle {
            thread_id,
            heap_bottom: AtomicU32::new(user_base),
            stack_top: AtomicU32::new(stack_top_init),
        }
    }

    pub fn heap_bottom(&self) -> u32 {
        self.heap_bottom.load(Ordering::SeqCst)
    }

    pub fn stack_top(&self) -> u32 {
        self.stack_top.load(Ordering::SeqCst)
    }

    pub fn grow_heap(&self, size: u32) {
        self.heap_bottom.fetch_add(size, Ordering::SeqCst);
    }

    pub fn shrink_stack(&self, size: u32) {
        self.stack_top.fetch_sub(size, Ordering::SeqCst);
    }
}

/// Assigns fresh, monotonically increasing thread IDs starting at 1.
/// Resets to 1 on a fresh process start (spec.md §4.6) — modeled as an
/// explicit field of [`crate::context::VmmContext`] rather than a
/// process-wide static, per spec.md §9's "Global cursors" note, so tests
/// get a clean counter per [`crate::context::VmmContext`] instance.
pub struct ThreadIdAllocator {
    next: u8,
}

impl ThreadIdAllocator {
    pub fn new() -> Self {
        ThreadIdAllocator { next: 1 }
    }

    pub fn alloc(&mut self, max_threads: usize) -> Option<u8> {
        if self.next as usize > max_threads {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(id)
    }
}
