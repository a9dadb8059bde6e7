//! Property tests for invariants spec.md §8 states as universal rules
//! rather than single scenarios (invariant numbering follows spec.md §8).

use proptest::prelude::*;
use tempfile::tempdir;

use vmemu_core::config::Config;
use vmemu_core::context::VmemuContext;
use vmemu_core::sched::{LockRegistry, Scheduler};

proptest! {
    /// Invariant 1: a page's swap file exists exactly when that page is
    /// valid but not present, and is always exactly one page (4096
    /// bytes) long. Checked through the visible effects of eviction and
    /// swap-in rather than by reaching into the page table directly.
    #[test]
    fn swap_file_exists_iff_valid_and_not_present(total_frames in 2usize..8) {
        let dir = tempdir().unwrap();
        let config = Config::small(total_frames, dir.path());
        let ctx = VmemuContext::new(config);
        let (thread, _) = ctx.spawn_thread("t", 1).unwrap();

        let mut addrs = Vec::new();
        for _ in 0..total_frames {
            addrs.push(ctx.allocate_heap_mem(&thread, 4096).unwrap());
        }
        // every page is freshly resident: valid && present, so no swap
        // file should exist for any of them yet.
        for &addr in &addrs {
            let path = dir.path().join(ctx.get_cache_file_name(&thread, addr));
            prop_assert!(!path.exists());
        }

        // one more allocation has nowhere free to go but eviction —
        // exactly one of the frames above must be forced out.
        ctx.allocate_heap_mem(&thread, 4096).unwrap();

        let evicted: Vec<u32> = addrs
            .iter()
            .copied()
            .filter(|&addr| dir.path().join(ctx.get_cache_file_name(&thread, addr)).exists())
            .collect();
        prop_assert_eq!(evicted.len(), 1);

        let swap_path = dir.path().join(ctx.get_cache_file_name(&thread, evicted[0]));
        prop_assert_eq!(std::fs::metadata(&swap_path).unwrap().len(), 4096);

        // faulting the page back in (valid && present again) must make
        // the swap file disappear.
        let mut buf = [0u8; 4096];
        ctx.read_from_addr(&thread, evicted[0], &mut buf).unwrap();
        prop_assert!(!swap_path.exists());
    }

    /// Invariant 3: a page's contents survive being swapped out and
    /// faulted back in, across a varying number of threads competing
    /// for a small, eviction-prone frame pool (the fixed-count version
    /// of this scenario lives in `vmm_scenarios.rs`).
    #[test]
    fn write_read_round_trips_across_eviction(num_threads in 2usize..12, fill_byte_seed in 0u8..=255) {
        let dir = tempdir().unwrap();
        let total_frames = 4;
        let config = Config::small(total_frames, dir.path());
        let ctx = VmemuContext::new(config);

        let mut threads = Vec::new();
        for i in 0..num_threads {
            let (thread, _) = ctx.spawn_thread(format!("t{i}"), 1).unwrap();
            let base = ctx.allocate_heap_mem(&thread, 4096).unwrap();
            let pattern = vec![fill_byte_seed.wrapping_add(i as u8); 4096];
            ctx.write_to_addr(&thread, base, &pattern).unwrap();
            threads.push((thread, base, pattern));
        }

        for (thread, base, pattern) in &threads {
            let mut out = vec![0u8; 4096];
            ctx.read_from_addr(thread, *base, &mut out).unwrap();
            prop_assert_eq!(&out, pattern);
        }
    }

    /// Invariant 2: free frame count always equals the number of frames
    /// not currently backing a valid page, across any sequence of
    /// single-page heap allocations.
    #[test]
    fn free_count_matches_unallocated_frames(num_allocations in 1usize..12) {
        let dir = tempdir().unwrap();
        let total_frames = 16;
        let config = Config::small(total_frames, dir.path());
        let ctx = VmemuContext::new(config);
        let (thread, _) = ctx.spawn_thread("t", 1).unwrap();

        let mut allocated_pages = 0usize;
        for _ in 0..num_allocations.min(total_frames) {
            if ctx.allocate_heap_mem(&thread, 4096).is_some() {
                allocated_pages += 1;
            }
        }
        prop_assert_eq!(ctx.vmm.free_frame_count() + allocated_pages, total_frames);
    }

    /// Invariant 5: heap_bottom stays strictly below stack_top for every
    /// successful heap allocation.
    #[test]
    fn heap_bottom_never_reaches_stack_top(sizes in prop::collection::vec(1u32..4096, 1..6)) {
        let dir = tempdir().unwrap();
        let config = Config::small(32, dir.path());
        let ctx = VmemuContext::new(config);
        let (thread, _) = ctx.spawn_thread("t", 1).unwrap();

        for size in sizes {
            ctx.allocate_heap_mem(&thread, size);
            prop_assert!(thread.heap_bottom() < thread.stack_top());
        }
    }

    /// Invariant 6: SleepList stays non-decreasing in wake_up_tick —
    /// exercised indirectly by asserting threads always wake in
    /// wake-tick order regardless of the order they went to sleep in.
    #[test]
    fn sleepers_wake_in_nondecreasing_tick_order(durations in prop::collection::vec(1i64..50, 2..6)) {
        let sched = Scheduler::new();
        let mut sleepers = Vec::new();
        for (i, d) in durations.iter().enumerate() {
            let t = sched.create_and_set_thread_to_run(format!("s{i}"), 1);
            sched.tick_sleep(&t, *d);
            sleepers.push((t, *d));
        }
        sleepers.sort_by_key(|(_, d)| *d);

        let mut last_tick = -1i64;
        for (_, d) in &sleepers {
            let woken = sched.next_thread_to_run(*d);
            prop_assert!(woken.is_some());
            prop_assert!(*d >= last_tick);
            last_tick = *d;
        }
    }

    /// Invariant 7: after any sequence of lock attempts followed by a
    /// release from every donating holder, every thread's priority
    /// equals its original priority.
    #[test]
    fn lock_release_always_restores_original_priorities(requester_priorities in prop::collection::vec(1u8..10, 1..5)) {
        let sched = Scheduler::new();
        let mut locks = LockRegistry::new();
        locks.lock_created(1);

        let holder = sched.create_and_set_thread_to_run("holder", 1);
        sched.with_ready_list(|ready| locks.lock_attempted(1, &holder, ready).unwrap());
        locks.lock_acquired(1, holder.clone()).unwrap();

        for (i, pri) in requester_priorities.iter().enumerate() {
            let requester = sched.create_and_set_thread_to_run(format!("r{i}"), *pri);
            sched.with_ready_list(|ready| locks.lock_attempted(1, &requester, ready).unwrap());
        }

        sched.with_ready_list(|ready| locks.lock_released(1, &holder, ready).unwrap());

        prop_assert_eq!(holder.priority(), holder.original_priority);
        prop_assert!(locks.get_thread_holding_lock(1).is_none());
    }
}
