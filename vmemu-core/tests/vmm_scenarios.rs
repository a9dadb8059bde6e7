//! Integration tests for the VMM: allocation, faulting, eviction, and
//! the out-of-bounds panic path.

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use vmemu_core::config::Config;
use vmemu_core::context::VmemuContext;
use vmemu_core::error::VmmError;
use vmemu_core::runtime::PanicSink;

struct CapturingPanicSink {
    panics: std::sync::Mutex<Vec<(u8, String)>>,
}

impl CapturingPanicSink {
    fn new() -> Self {
        CapturingPanicSink { panics: std::sync::Mutex::new(Vec::new()) }
    }
}

impl PanicSink for CapturingPanicSink {
    fn kernel_panic(&self, thread_id: u8, context: String) {
        self.panics.lock().unwrap().push((thread_id, context));
    }
}

#[test]
fn basic_heap_write_and_read_round_trips() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.swap_dir = dir.path().to_path_buf();
    let ctx = VmemuContext::new(config);
    let (thread, _) = ctx.spawn_thread("t1", 1).unwrap();

    let base = ctx.allocate_heap_mem(&thread, 4096).unwrap();
    assert_eq!(base, 1_048_576);

    ctx.write_to_addr(&thread, base, b"abcd").unwrap();
    let mut out = [0u8; 4];
    ctx.read_from_addr(&thread, base, &mut out).unwrap();
    assert_eq!(&out, b"abcd");
}

#[test]
fn write_spanning_two_pages_reads_back_whole() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.swap_dir = dir.path().to_path_buf();
    let ctx = VmemuContext::new(config);
    let (thread, _) = ctx.spawn_thread("t1", 1).unwrap();

    let base = ctx.allocate_heap_mem(&thread, 8192).unwrap();
    let addr = base + 4094;
    let data = b"abcdef";
    ctx.write_to_addr(&thread, addr, data).unwrap();

    let mut out = [0u8; 6];
    ctx.read_from_addr(&thread, addr, &mut out).unwrap();
    assert_eq!(&out, data);
}

#[test]
fn eviction_round_trip_preserves_every_threads_page_contents() {
    let dir = tempdir().unwrap();
    let config = Config::small(16, dir.path());
    let ctx = VmemuContext::new(config);

    let mut threads = Vec::new();
    for i in 0..32u32 {
        let (thread, _) = ctx.spawn_thread(format!("t{i}"), 1).unwrap();
        let base = ctx.allocate_heap_mem(&thread, 4096).unwrap();
        let pattern = vec![(i % 256) as u8; 4096];
        ctx.write_to_addr(&thread, base, &pattern).unwrap();
        threads.push((thread, base, pattern));
    }

    for (thread, base, pattern) in &threads {
        let mut out = vec![0u8; 4096];
        ctx.read_from_addr(thread, *base, &mut out).unwrap();
        assert_eq!(&out, pattern, "thread {} lost its page contents across eviction", thread.thread_id);
    }
}

#[test]
fn stack_allocation_stops_at_stack_end() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.swap_dir = dir.path().to_path_buf();
    let ctx = VmemuContext::new(config);
    let (thread, _) = ctx.spawn_thread("t1", 1).unwrap();

    let one_mib = 1024 * 1024;
    assert_eq!(ctx.allocate_stack_mem(&thread, one_mib), Some(7 * 1024 * 1024));
    assert_eq!(ctx.allocate_stack_mem(&thread, one_mib), Some(6 * 1024 * 1024));
    assert_eq!(thread.stack_top(), 6 * 1024 * 1024);

    assert_eq!(ctx.allocate_stack_mem(&thread, one_mib), None);
    assert_eq!(thread.stack_top(), 6 * 1024 * 1024);
}

#[test]
fn read_below_user_base_triggers_kernel_panic() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.swap_dir = dir.path().to_path_buf();
    let sink = std::sync::Arc::new(CapturingPanicSink::new());
    let ctx = VmemuContext::with_sinks(
        config,
        Box::new(CapturingPanicSinkHandle(sink.clone())),
        Box::new(vmemu_core::runtime::DefaultLogSink),
    );
    let (thread, _) = ctx.spawn_thread("t1", 1).unwrap();

    let mut out = [0u8; 8];
    let err = ctx.read_from_addr(&thread, 1024, &mut out).unwrap_err();
    assert!(matches!(err, VmmError::OutOfBounds { addr: 1024, size: 8 }));
    assert_eq!(sink.panics.lock().unwrap().len(), 1);
}

struct CapturingPanicSinkHandle(std::sync::Arc<CapturingPanicSink>);

impl PanicSink for CapturingPanicSinkHandle {
    fn kernel_panic(&self, thread_id: u8, context: String) {
        self.0.kernel_panic(thread_id, context);
    }
}
