//! C7 — ReadyList / SleepList (spec.md §4.7).
//!
//! Spec.md replaces the external generic `List` collaborator with typed
//! sequences here (spec.md §9: "Dynamic map and list containers"). Both
//! lists keep themselves sorted after every mutation that could change
//! order, rather than exposing a separate `sort()` call a caller could
//! forget — `add`/`remove` already restore the invariant, which is
//! simpler to get right than the source's explicit two-step protocol
//! while producing the same observable order.

use crate::sched::thread::ThreadRef;

/// Priority descending, insertion age ascending on ties (spec.md §4.7).
pub struct ReadyList {
    threads: Vec<ThreadRef>,
}

impl ReadyList {
    pub fn new() -> Self {
        ReadyList { threads: Vec::new() }
    }

    pub fn add(&mut self, thread: ThreadRef) {
        self.threads.push(thread);
        self.sort();
    }

    pub fn remove_terminated_head(&mut self) -> Option<ThreadRef> {
        if self.threads.first().map(|t| t.state() == crate::sched::thread::ThreadState::Terminated) == Some(true) {
            Some(self.threads.remove(0))
        } else {
            None
        }
    }

    /// Removes a specific thread (used by `tick_sleep` to pull the
    /// current thread out before it goes onto the sleep list).
    pub fn remove(&mut self, thread: &ThreadRef) -> bool {
        if let Some(pos) = self.threads.iter().position(|t| std::sync::Arc::ptr_eq(t, thread)) {
            self.threads.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn front(&self) -> Option<&ThreadRef> {
        self.threads.first()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThreadRef> {
        self.threads.iter()
    }

    /// Re-establishes priority-descending / age-ascending order. Public
    /// so donation and restore (spec.md §4.8) can re-sort after mutating
    /// priorities in place.
    pub fn sort(&mut self) {
        self.threads.sort_by(|a, b| b.priority().cmp(&a.priority()).then(a.seq.cmp(&b.seq)));
    }
}

impl Default for ReadyList {
    fn default() -> Self {
        Self::new()
    }
}

struct SleepRecord {
    wake_up_tick: i64,
    thread: ThreadRef,
}

/// Wake-tick ascending (spec.md §4.7).
pub struct SleepList {
    records: Vec<SleepRecord>,
}

impl SleepList {
    pub fn new() -> Self {
        SleepList { records: Vec::new() }
    }

    pub fn add(&mut self, wake_up_tick: i64, thread: ThreadRef) {
        self.records.push(SleepRecord { wake_up_tick, thread });
        self.records.sort_by(|a, b| a.wake_up_tick.cmp(&b.wake_up_tick).then(a.thread.seq.cmp(&b.thread.seq)));
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Removes and returns every sleeper whose `wake_up_tick <=
    /// current_tick`, in wake order (spec.md §4.9 `wakeUpSleepingThreads`).
    pub fn drain_ready(&mut self, current_tick: i64) -> Vec<ThreadRef> {
        let split = self.records.partition_point(|r| r.wake_up_tick <= current_tick);
        self.records.drain(..split).map(|r| r.thread).collect()
    }
}

impl Default for SleepList {
    fn default() -> Self {
        Self::new()
    }
}
