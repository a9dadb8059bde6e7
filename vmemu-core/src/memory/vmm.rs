//! C5 — VMM API: `allocate_heap_mem`, `allocate_stack_mem`, `read_from_addr`,
//! `write_to_addr`, `get_cache_file_name`, and the page-fault handling
//! that backs the first four.

use crate::config::{Config, PAGE_SIZE};
use crate::error::VmmError;
use crate::memory::frame_table::FrameTable;
use crate::memory::image::MemoryImage;
use crate::memory::page_table::{virtual_address_to_vpn, PageDirectory};
use crate::memory::swap;
use crate::memory::thread_handle::ThreadHandle;
use crate::runtime::PanicSink;

pub struct Vmm {
    config: Config,
    directory: PageDirectory,
    frame_table: FrameTable,
    image: MemoryImage,
}

impl Vmm {
    pub fn new(config: Config) -> Self {
        let image = MemoryImage::new(config.num_frames);
        let frame_table = FrameTable::new(config.num_frames);
        let directory = PageDirectory::new();
        Vmm {
            config,
            directory,
            frame_table,
            image,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn free_frame_count(&self) -> usize {
        self.frame_table.free_count()
    }

    pub fn frame_owner(&self, frame_index: u16) -> (u8, u16, bool) {
        self.frame_table.frame_owner(frame_index)
    }

    /// spec.md §6 `getCacheFileName(thread, addr, buf)`: the swap-file
    /// name the page containing `addr` would be written to, as
    /// `"<threadId>_<vpn>.swp"` with `vpn = vpn(addr)`.
    pub fn get_cache_file_name(&self, thread: &ThreadHandle, addr: u32) -> String {
        swap::swap_file_name(thread.thread_id, virtual_address_to_vpn(addr))
    }

    /// spec.md §4.6: heap grows up from `USER_BASE`.
    pub fn allocate_heap_mem(
        &self,
        thread: &ThreadHandle,
        size: u32,
        panic_sink: &dyn PanicSink,
    ) -> Option<u32> {
        let base = thread.heap_bottom();
        if base >= thread.stack_top() {
            return None;
        }
        self.allocate_pages(thread.thread_id, base, base + size, panic_sink).ok()?;
        thread.grow_heap(size);
        Some(base)
    }

    /// spec.md §4.6: stack grows down, bounded below by `STACK_END`.
    pub fn allocate_stack_mem(
        &self,
        thread: &ThreadHandle,
        size: u32,
        panic_sink: &dyn PanicSink,
    ) -> Option<u32> {
        let base = thread.stack_top().checked_sub(size)?;
        if base < self.config.stack_end {
            return None;
        }
        self.allocate_pages(thread.thread_id, base, thread.stack_top(), panic_sink).ok()?;
        thread.shrink_stack(size);
        Some(base)
    }

    /// spec.md §4.2 `allocatePages`: assigns a frame to every not-yet-valid
    /// page in `[start_addr, end_addr)`, retrying if a page is marked
    /// valid but not present before first use (evicted between the
    /// validity check and the frame assignment).
    fn allocate_pages(
        &self,
        thread_id: u8,
        start_addr: u32,
        end_addr: u32,
        panic_sink: &dyn PanicSink,
    ) -> Result<(), VmmError> {
        let table = self.directory.table(thread_id);
        let mut addr = start_addr;
        while addr < end_addr {
            let vpn = virtual_address_to_vpn(addr);
            let needs_frame = table.with_entry_mut(vpn, |pte| {
                if !pte.valid {
                    pte.valid = true;
                    true
                } else {
                    !pte.present
                }
            });
            if needs_frame {
                loop {
                    self.frame_table.allocate_frame_for_page(
                        thread_id,
                        vpn,
                        &self.directory,
                        &self.image,
                        &self.config.swap_dir,
                        panic_sink,
                    )?;
                    if table.get(vpn).present {
                        break;
                    }
                }
            }
            let advance = PAGE_SIZE - (addr & (PAGE_SIZE - 1));
            addr = addr.saturating_add(advance);
        }
        Ok(())
    }

    /// spec.md §4.5. Bounds: `addr >= USER_BASE && addr <= phys_mem_size
    /// && addr + size <= phys_mem_size`, else `kernelPanic`.
    pub fn write_to_addr(
        &self,
        thread: &ThreadHandle,
        addr: u32,
        data: &[u8],
        panic_sink: &dyn PanicSink,
    ) -> Result<(), VmmError> {
        self.access(thread, addr, data.len() as u32, panic_sink, |slice, off, len| {
            slice.copy_from_slice(&data[off..off + len]);
            true
        })
    }

    /// Read does **not** set `accessed` (spec.md §4.5 / §9: preserved for
    /// test parity with the source, noted as a clock-accuracy
    /// degradation, not silently fixed).
    pub fn read_from_addr(
        &self,
        thread: &ThreadHandle,
        addr: u32,
        out: &mut [u8],
        panic_sink: &dyn PanicSink,
    ) -> Result<(), VmmError> {
        self.access(thread, addr, out.len() as u32, panic_sink, |slice, off, len| {
            out[off..off + len].copy_from_slice(slice);
            false
        })
    }

    fn access(
        &self,
        thread: &ThreadHandle,
        addr: u32,
        size: u32,
        panic_sink: &dyn PanicSink,
        mut copy: impl FnMut(&mut [u8], usize, usize) -> bool,
    ) -> Result<(), VmmError> {
        let phys_mem_size = self.config.phys_mem_size as u32;
        if addr < self.config.user_base || addr > phys_mem_size || addr.saturating_add(size) > phys_mem_size {
            let err = VmmError::OutOfBounds { addr, size };
            panic_sink.kernel_panic(thread.thread_id, err.to_string());
            return Err(err);
        }

        let table = self.directory.table(thread.thread_id);
        let mut remaining = size;
        let mut cur = addr;
        let mut done = 0usize;
        while remaining > 0 {
            let vpn = virtual_address_to_vpn(cur);
            let page_off = (cur & (PAGE_SIZE - 1)) as usize;
            let chunk = (PAGE_SIZE as usize - page_off).min(remaining as usize);

            loop {
                if table.get(vpn).present {
                    break;
                }
                let frame_index = match self.frame_table.allocate_frame_for_page(
                    thread.thread_id,
                    vpn,
                    &self.directory,
                    &self.image,
                    &self.config.swap_dir,
                    panic_sink,
                ) {
                    Ok(idx) => idx,
                    Err(err) => return Err(err),
                };
                if let Err(err) =
                    swap::swap_page_from_disk(&self.config.swap_dir, &self.image, frame_index, thread.thread_id, vpn)
                {
                    panic_sink.kernel_panic(thread.thread_id, err.to_string());
                    return Err(err);
                }
            }

            // This frame's lock, not the page table's, is what makes two
            // threads copying into two different resident frames run
            // concurrently (spec.md §5's per-FTE lock).
            let frame_index = table.get(vpn).frame_index;
            let sets_accessed =
                self.image.with_frame(frame_index, |bytes| copy(&mut bytes[page_off..page_off + chunk], done, chunk));
            if sets_accessed {
                self.frame_table.mark_accessed(frame_index);
            }

            cur += chunk as u32;
            remaining -= chunk as u32;
            done += chunk;
        }
        Ok(())
    }
}
