//! Error taxonomy for the VMM and scheduler.
//!
//! Conditions the spec routes to `kernelPanic` (out-of-bounds access, swap
//! I/O failure, a present=false page with no backing file) surface here as
//! `VmmError` so the [`crate::runtime::PanicSink`] boundary, not library
//! code, decides what "panic" means. Conditions the spec treats as ordinary
//! return values (heap/stack exhaustion, an empty scheduler, an unknown
//! lock id) are not errors at all — they stay `Option`/`-1`-shaped at the
//! call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmmError {
    #[error("address {addr:#x} size {size} is out of bounds")]
    OutOfBounds { addr: u32, size: u32 },

    #[error("swap I/O failure for thread {thread_id} vpn {vpn}: {source}")]
    SwapIo {
        thread_id: u8,
        vpn: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("page table entry for thread {thread_id} vpn {vpn} is present=false with no swap file")]
    MissingSwapOnFault { thread_id: u8, vpn: u16 },
}

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("lock {0} is not registered")]
    UnknownLock(u32),
}
