//! C3 — FrameTable & FreeList, including clock eviction (spec.md §4.3).
//!
//! Per spec.md §9 ("Linked intrusive structures" / "Cyclic free list"):
//! the intrusive FTE chain becomes an arena (`Vec<Mutex<FrameEntry>>`)
//! plus a plain FIFO of free indices (`Mutex<VecDeque<u16>>`) rather than
//! a circular linked list that is only ever treated as linear in
//! practice.
//!
//! Lock order, enforced by every call path in this module: **eviction ⊃
//! free-list ⊃ frame ⊃ page-table**. The page-table lock is taken only
//! inside [`FrameTable::evict_a_frame`] and is always released before
//! this module touches the free list or returns.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use crate::error::VmmError;
use crate::memory::image::MemoryImage;
use crate::memory::page_table::PageDirectory;
use crate::memory::swap;
use crate::runtime::PanicSink;

/// `{ accessed, ownerThreadId (0 = free), vpn }` per spec.md §3. The
/// frame's index into the arena stands in for the source's `frameIndex`
/// field and `physAddr` pointer; `next` disappears with the intrusive
/// chain (see module docs).
#[derive(Debug, Clone, Copy, Default)]
struct FrameEntry {
    accessed: bool,
    owner_thread_id: u8,
    vpn: u16,
}

impl FrameEntry {
    fn is_free(&self) -> bool {
        self.owner_thread_id == 0
    }
}

pub struct FrameTable {
    frames: Vec<Mutex<FrameEntry>>,
    free_list: Mutex<VecDeque<u16>>,
    /// The clock cursor, guarded by the same mutex that serializes
    /// evictions process-wide (spec.md §4.3: "at most one eviction in
    /// flight").
    eviction: Mutex<usize>,
}

impl FrameTable {
    /// All `num_frames` frames start free, chained in index order —
    /// spec.md §4.1's bootstrap, minus the circularity that the source
    /// never actually relies on.
    pub fn new(num_frames: usize) -> Self {
        let frames = (0..num_frames).map(|_| Mutex::new(FrameEntry::default())).collect();
        let free_list = (0..num_frames as u16).collect();
        FrameTable {
            frames,
            free_list: Mutex::new(free_list),
            eviction: Mutex::new(0),
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of free frames — must always equal `free_list.len()`
    /// (spec.md invariant 2); exposed for tests.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().unwrap().len()
    }

    pub fn frame_owner(&self, frame_index: u16) -> (u8, u16, bool) {
        let fte = self.frames[frame_index as usize].lock().unwrap();
        (fte.owner_thread_id, fte.vpn, fte.accessed)
    }

    /// Sets a frame's `accessed` bit — spec.md §4.5: writes always mark
    /// their frame accessed, whether freshly faulted in or already
    /// present; reads never do.
    pub fn mark_accessed(&self, frame_index: u16) {
        self.frames[frame_index as usize].lock().unwrap().accessed = true;
    }

    /// spec.md §4.3 `allocateFrameForPage`. Marks the requesting
    /// thread's PTE `present = true` on success, mirroring the source's
    /// step 5 (done here, under the frame lock, rather than by the
    /// caller, so the PTE and FTE always transition together).
    #[allow(clippy::too_many_arguments)]
    pub fn allocate_frame_for_page(
        &self,
        thread_id: u8,
        vpn: u16,
        directory: &PageDirectory,
        image: &MemoryImage,
        swap_dir: &Path,
        panic_sink: &dyn PanicSink,
    ) -> Result<u16, VmmError> {
        loop {
            let mut free = self.free_list.lock().unwrap();
            if let Some(frame_index) = free.pop_front() {
                drop(free);
                {
                    let mut fte = self.frames[frame_index as usize].lock().unwrap();
                    fte.accessed = true;
                    fte.owner_thread_id = thread_id;
                    fte.vpn = vpn;
                }
                directory.table(thread_id).with_entry_mut(vpn, |pte| {
                    pte.present = true;
                    pte.frame_index = frame_index;
                });
                return Ok(frame_index);
            }
            drop(free);
            self.evict_a_frame(directory, image, swap_dir, panic_sink)?;
            // loop: the evictor just pushed a frame onto the free list's tail.
        }
    }

    /// spec.md §4.3 `evictAFrame`: second-chance clock sweep over the
    /// frame arena, evicting exactly one occupied, unaccessed frame.
    fn evict_a_frame(
        &self,
        directory: &PageDirectory,
        image: &MemoryImage,
        swap_dir: &Path,
        panic_sink: &dyn PanicSink,
    ) -> Result<u16, VmmError> {
        let mut cursor = self.eviction.lock().unwrap();
        let n = self.frames.len();

        let victim = loop {
            let idx = *cursor;
            *cursor = (*cursor + 1) % n;

            let mut fte = self.frames[idx].lock().unwrap();
            if fte.is_free() {
                continue;
            }
            if fte.accessed {
                fte.accessed = false;
                continue;
            }
            break (idx as u16, fte);
        };
        let (frame_index, mut fte) = victim;
        let owner = fte.owner_thread_id;
        let vpn = fte.vpn;

        let table = directory.table(owner);
        let swap_result = swap::swap_page_to_disk(swap_dir, image, frame_index, owner, vpn);
        match swap_result {
            Ok(()) => {
                table.with_entry_mut(vpn, |pte| {
                    pte.present = false;
                    pte.frame_index = 0;
                });
                fte.owner_thread_id = 0;
                fte.vpn = 0;
                fte.accessed = false;
                drop(fte);
                self.free_list.lock().unwrap().push_back(frame_index);
                Ok(frame_index)
            }
            Err(err) => {
                panic_sink.kernel_panic(owner, format!("swap-out failed: {err}"));
                Err(err)
            }
        }
    }
}
