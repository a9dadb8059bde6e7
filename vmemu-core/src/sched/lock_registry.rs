//! C8 — lock registry with priority donation (spec.md §4.8).
//!
//! Donation uses the "set, don't swap" rule from spec.md §9 rather than
//! the source's literal priority swap: `holder.priority =
//! max(holder.priority, requester.priority)`, `original_priority` is
//! never touched by donation, and release restores every
//! over-priority thread in the ready list back to its recorded
//! original. Observable behavior at the scenario granularity spec.md
//! §8 tests (S8) is identical to the swap-based source.

use std::collections::HashMap;

use crate::error::SchedError;
use crate::sched::list::ReadyList;
use crate::sched::thread::ThreadRef;

pub struct LockRegistry {
    holders: HashMap<u32, Option<ThreadRef>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        LockRegistry { holders: HashMap::new() }
    }

    pub fn lock_created(&mut self, lock_id: u32) {
        self.holders.insert(lock_id, None);
    }

    /// Returns `Ok(())` whether or not a donation happened; the return
    /// value is not meaningful beyond "unknown lock" — callers proceed
    /// to attempt acquisition regardless, per spec.md §4.8.
    pub fn lock_attempted(
        &mut self,
        lock_id: u32,
        requester: &ThreadRef,
        ready: &mut ReadyList,
    ) -> Result<(), SchedError> {
        let holder = self.holders.get(&lock_id).ok_or(SchedError::UnknownLock(lock_id))?.clone();
        let Some(holder) = holder else {
            return Ok(());
        };
        if holder.priority() < requester.priority() {
            holder.set_priority(holder.priority().max(requester.priority()));
            ready.sort();
        }
        Ok(())
    }

    pub fn lock_acquired(&mut self, lock_id: u32, thread: ThreadRef) -> Result<(), SchedError> {
        let slot = self.holders.get_mut(&lock_id).ok_or(SchedError::UnknownLock(lock_id))?;
        *slot = Some(thread);
        Ok(())
    }

    /// Diagnostic only, per spec.md §4.8 — no state change.
    pub fn lock_failed(&self, lock_id: u32) -> Result<(), SchedError> {
        if self.holders.contains_key(&lock_id) {
            Ok(())
        } else {
            Err(SchedError::UnknownLock(lock_id))
        }
    }

    pub fn lock_released(
        &mut self,
        lock_id: u32,
        thread: &ThreadRef,
        ready: &mut ReadyList,
    ) -> Result<(), SchedError> {
        let slot = self.holders.get_mut(&lock_id).ok_or(SchedError::UnknownLock(lock_id))?;
        *slot = None;

        if thread.has_donation() {
            for t in ready.iter() {
                if t.has_donation() {
                    t.set_priority(t.original_priority);
                }
            }
            thread.set_priority(thread.original_priority);
            ready.sort();
        }
        Ok(())
    }

    pub fn get_thread_holding_lock(&self, lock_id: u32) -> Option<ThreadRef> {
        self.holders.get(&lock_id).cloned().flatten()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
