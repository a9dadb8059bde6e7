//! C10 — startup/shutdown and the process-level context object.
//!
//! spec.md §9's "global cursors" note says to replace process-wide
//! mutable state (the clock cursor, the thread-id counter) with
//! explicit fields of a context object so tests can instantiate fresh
//! instances. `VmemuContext` is that object: it owns a [`Vmm`], a
//! [`Scheduler`], a [`LockRegistry`], and a [`ThreadIdAllocator`],
//! bundling both subsystems the way a real process would own exactly
//! one of each.

use std::path::Path;

use crate::config::{Config, MAX_THREADS, NUM_PAGE_TABLE_ENTRIES};
use crate::error::{SchedError, VmmError};
use crate::memory::thread_handle::ThreadIdAllocator;
use crate::memory::{swap, ThreadHandle, Vmm};
use crate::runtime::{DefaultLogSink, DefaultPanicSink, LogSink, PanicSink};
use crate::sched::{LockRegistry, Scheduler, ThreadRef};
use std::sync::Mutex;

pub struct VmemuContext {
    pub vmm: Vmm,
    pub scheduler: Scheduler,
    lock_registry: Mutex<LockRegistry>,
    thread_ids: Mutex<ThreadIdAllocator>,
    panic_sink: Box<dyn PanicSink>,
    log_sink: Box<dyn LogSink>,
}

impl VmemuContext {
    pub fn new(config: Config) -> Self {
        Self::with_sinks(config, Box::new(DefaultPanicSink), Box::new(DefaultLogSink))
    }

    pub fn with_sinks(config: Config, panic_sink: Box<dyn PanicSink>, log_sink: Box<dyn LogSink>) -> Self {
        VmemuContext {
            vmm: Vmm::new(config),
            scheduler: Scheduler::new(),
            lock_registry: Mutex::new(LockRegistry::new()),
            thread_ids: Mutex::new(ThreadIdAllocator::new()),
            panic_sink,
            log_sink,
        }
    }

    /// Allocates a fresh thread on both subsystems at once: a VMM
    /// [`ThreadHandle`] (heap/stack cursors) and a scheduler
    /// [`ThreadRef`] (priority, ready-list membership). The two are
    /// independent per spec.md (the VMM has no notion of priority, the
    /// scheduler has no notion of address space), linked only by
    /// sharing the caller's chosen name.
    pub fn spawn_thread(&self, name: impl Into<String> + Clone, priority: u8) -> Option<(ThreadHandle, ThreadRef)> {
        let thread_id = self.thread_ids.lock().unwrap().alloc(MAX_THREADS)?;
        let handle = ThreadHandle::new(thread_id, self.vmm.config().user_base, self.vmm.config().phys_mem_size as u32);
        let thread_ref = self.scheduler.create_and_set_thread_to_run(name, priority);
        Some((handle, thread_ref))
    }

    pub fn allocate_heap_mem(&self, thread: &ThreadHandle, size: u32) -> Option<u32> {
        self.vmm.allocate_heap_mem(thread, size, self.panic_sink.as_ref())
    }

    pub fn allocate_stack_mem(&self, thread: &ThreadHandle, size: u32) -> Option<u32> {
        self.vmm.allocate_stack_mem(thread, size, self.panic_sink.as_ref())
    }

    pub fn write_to_addr(&self, thread: &ThreadHandle, addr: u32, data: &[u8]) -> Result<(), VmmError> {
        self.vmm.write_to_addr(thread, addr, data, self.panic_sink.as_ref())
    }

    pub fn read_from_addr(&self, thread: &ThreadHandle, addr: u32, out: &mut [u8]) -> Result<(), VmmError> {
        self.vmm.read_from_addr(thread, addr, out, self.panic_sink.as_ref())
    }

    pub fn get_cache_file_name(&self, thread: &ThreadHandle, addr: u32) -> String {
        self.vmm.get_cache_file_name(thread, addr)
    }

    pub fn lock_created(&self, lock_id: u32) {
        self.lock_registry.lock().unwrap().lock_created(lock_id);
        self.log_sink.log_data(&format!("lock {lock_id} created"));
    }

    pub fn lock_attempted(&self, lock_id: u32, requester: &ThreadRef) -> Result<(), SchedError> {
        self.scheduler
            .with_ready_list(|ready| self.lock_registry.lock().unwrap().lock_attempted(lock_id, requester, ready))
    }

    pub fn lock_acquired(&self, lock_id: u32, thread: ThreadRef) -> Result<(), SchedError> {
        self.lock_registry.lock().unwrap().lock_acquired(lock_id, thread)
    }

    pub fn lock_failed(&self, lock_id: u32) -> Result<(), SchedError> {
        self.lock_registry.lock().unwrap().lock_failed(lock_id)
    }

    pub fn lock_released(&self, lock_id: u32, thread: &ThreadRef) -> Result<(), SchedError> {
        self.scheduler
            .with_ready_list(|ready| self.lock_registry.lock().unwrap().lock_released(lock_id, thread, ready))
    }

    pub fn get_thread_holding_lock(&self, lock_id: u32) -> Option<ThreadRef> {
        self.lock_registry.lock().unwrap().get_thread_holding_lock(lock_id)
    }

    /// spec.md §4.1 `deinitialize`: release lock resources and sweep
    /// per-thread swap files. Zeroing the in-memory image is implicit —
    /// dropping `self.vmm` frees its per-frame backing storage.
    pub fn shutdown(&self) {
        swap::cleanup_swap_files(self.swap_dir(), MAX_THREADS as u8, 0..NUM_PAGE_TABLE_ENTRIES as u16);
    }

    fn swap_dir(&self) -> &Path {
        &self.vmm.config().swap_dir
    }
}
