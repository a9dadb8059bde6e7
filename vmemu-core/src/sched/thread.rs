//! Scheduler-side `Thread` entity (spec.md §3 "Scheduler entities").

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// `{ name, func, arg, priority, originalPriority, state }` per spec.md
/// §3. `func`/`arg` belong to the external tick runtime this spec treats
/// as out of scope (it owns CPU context switching); the scheduler only
/// needs an opaque handle to hand back, so they are not modeled here.
///
/// `priority` is an atomic because donation (spec.md §4.8) and
/// `set_my_priority` (spec.md §4.9) both mutate it outside of whatever
/// mutex happens to guard the list it currently lives in.
/// `original_priority` is set once at creation and never mutated by
/// donation, per spec.md §9's "set, don't swap" redesign — it is not an
/// atomic because nothing but creation ever writes it.
pub struct Thread {
    pub name: String,
    pub original_priority: u8,
    priority: AtomicU8,
    state: AtomicU8,
    /// Insertion-order tiebreaker for [`crate::sched::list::ReadyList`]'s
    /// stable sort — an explicit sequence number rather than relying on
    /// `Vec` insertion order surviving every mutation.
    pub(crate) seq: u64,
}

impl Thread {
    pub fn new(name: impl Into<String>, priority: u8, seq: u64) -> Arc<Self> {
        Arc::new(Thread {
            name: name.into(),
            original_priority: priority,
            priority: AtomicU8::new(priority),
            state: AtomicU8::new(ThreadState::Ready as u8),
            seq,
        })
    }

    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::SeqCst)
    }

    pub fn set_priority(&self, p: u8) {
        self.priority.store(p, Ordering::SeqCst);
    }

    pub fn state(&self) -> ThreadState {
        match self.state.load(Ordering::SeqCst) {
            0 => ThreadState::Ready,
            1 => ThreadState::Running,
            2 => ThreadState::Blocked,
            _ => ThreadState::Terminated,
        }
    }

    pub fn set_state(&self, s: ThreadState) {
        self.state.store(s as u8, Ordering::SeqCst);
    }

    pub fn has_donation(&self) -> bool {
        self.priority() != self.original_priority
    }
}

pub type ThreadRef = Arc<Thread>;
