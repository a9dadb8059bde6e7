//! External collaborators the spec treats as out of scope but still
//! needs a seam for: the `kernelPanic` hook and log buffering/flushing.
//! Both are traits the owning context holds as `Box<dyn _>`, so tests
//! can substitute a capturing implementation instead of a real one.

/// Invoked on an out-of-bounds access or an unrecoverable swap I/O
/// failure (spec.md §4.4, §4.5). The spec expects this to terminate the
/// offending thread; the default implementation logs at `error` level
/// and leaves termination to the caller, since this crate does not own
/// thread lifecycle (that's the external tick runtime's job).
pub trait PanicSink: Send + Sync {
    fn kernel_panic(&self, thread_id: u8, context: String);
}

/// `logData` / `flushLog` from spec.md §6. The default sink forwards to
/// the `log` crate; tests that want to assert on log content can supply
/// a sink that pushes into a `Vec<String>` instead.
pub trait LogSink: Send + Sync {
    fn log_data(&self, msg: &str);
    fn flush_log(&self);
}

/// Logs via `log::error!` and does nothing else — sufficient for a
/// library that does not own thread teardown itself.
pub struct DefaultPanicSink;

impl PanicSink for DefaultPanicSink {
    fn kernel_panic(&self, thread_id: u8, context: String) {
        log::error!("kernel_panic: thread {thread_id}: {context}");
    }
}

/// Logs via the `log` facade (`log::debug!`); `flush_log` is a no-op
/// since the `log` crate's backend owns its own buffering.
pub struct DefaultLogSink;

impl LogSink for DefaultLogSink {
    fn log_data(&self, msg: &str) {
        log::debug!("{msg}");
    }

    fn flush_log(&self) {}
}
