//! C9 — scheduler core (spec.md §4.9): thread lifecycle, `nextThreadToRun`,
//! `tickSleep`, and direct priority mutation.
//!
//! `getCurrentTick`/`stopExecutingThreadForCycle`/`createThread` are the
//! external tick-runtime collaborators spec.md places out of scope — the
//! scheduler here takes the current tick as an explicit argument instead
//! of reaching for a global, and "yielding" is simply returning to the
//! caller, who owns the actual OS thread parking.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::sched::list::{ReadyList, SleepList};
use crate::sched::thread::{Thread, ThreadRef, ThreadState};

pub struct Scheduler {
    ready: Mutex<ReadyList>,
    sleep: Mutex<SleepList>,
    /// Insertion-order counter handed to new threads for [`ReadyList`]'s
    /// stable tiebreak — spec.md §9's "global cursors" redesign: an
    /// explicit field on this context, not process-wide mutable state.
    next_seq: AtomicU64,
    /// Tracks the most recent tick observed via [`Self::next_thread_to_run`]
    /// so `tick_sleep` has a `getCurrentTick()` to read from.
    current_tick: AtomicI64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            ready: Mutex::new(ReadyList::new()),
            sleep: Mutex::new(SleepList::new()),
            next_seq: AtomicU64::new(0),
            current_tick: AtomicI64::new(0),
        }
    }

    /// spec.md §4.9: allocate a Thread with `priority = originalPriority
    /// = pri`, append to ReadyList, sort. Thread-resource creation via
    /// the external runtime is out of scope here.
    pub fn create_and_set_thread_to_run(&self, name: impl Into<String>, priority: u8) -> ThreadRef {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let thread = Thread::new(name, priority, seq);
        let mut ready = self.ready.lock().unwrap();
        ready.add(thread.clone());
        thread
    }

    /// Marks `thread` terminated; it is dropped from the ready list on
    /// the next call to [`Self::next_thread_to_run`], which skips
    /// terminated heads rather than requiring a separate list walk.
    pub fn destroy_thread(&self, thread: &ThreadRef) {
        thread.set_state(ThreadState::Terminated);
    }

    /// spec.md §4.9 `nextThreadToRun`: wake eligible sleepers, then
    /// return the ready-list head, skipping (and dropping) any
    /// terminated entries at the front.
    pub fn next_thread_to_run(&self, current_tick: i64) -> Option<ThreadRef> {
        self.current_tick.store(current_tick, Ordering::SeqCst);
        self.wake_up_sleeping_threads(current_tick);

        let mut ready = self.ready.lock().unwrap();
        while ready.remove_terminated_head().is_some() {}
        ready.front().cloned()
    }

    fn wake_up_sleeping_threads(&self, current_tick: i64) {
        let woken = {
            let mut sleep = self.sleep.lock().unwrap();
            sleep.drain_ready(current_tick)
        };
        if woken.is_empty() {
            return;
        }
        let mut ready = self.ready.lock().unwrap();
        for thread in woken {
            thread.set_state(ThreadState::Ready);
            ready.add(thread);
        }
        ready.sort();
    }

    /// spec.md §4.9 `tickSleep`: removes the calling thread from
    /// ReadyList *before* sorting SleepList (order preserved from
    /// `original_source/thread.cpp`, per SPEC_FULL §9).
    pub fn tick_sleep(&self, thread: &ThreadRef, num_ticks: i64) -> i64 {
        let start = self.current_tick.load(Ordering::SeqCst);
        let stop = start + num_ticks;

        thread.set_state(ThreadState::Blocked);
        {
            let mut ready = self.ready.lock().unwrap();
            ready.remove(thread);
        }
        {
            let mut sleep = self.sleep.lock().unwrap();
            sleep.add(stop, thread.clone());
        }
        start
    }

    /// spec.md §4.9 `setMyPriority`: mutates `priority` directly,
    /// leaving `original_priority` untouched — an intentionally
    /// preserved quirk, not a bug (see design notes).
    pub fn set_my_priority(&self, thread: &ThreadRef, priority: u8) {
        thread.set_priority(priority);
        self.ready.lock().unwrap().sort();
    }

    pub fn ready_len(&self) -> usize {
        self.ready.lock().unwrap().len()
    }

    pub fn sleep_len(&self) -> usize {
        self.sleep.lock().unwrap().len()
    }

    pub fn with_ready_list<R>(&self, f: impl FnOnce(&mut ReadyList) -> R) -> R {
        f(&mut self.ready.lock().unwrap())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
