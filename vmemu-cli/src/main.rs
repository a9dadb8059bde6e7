// vmemu-cli — command-line harness for the vmemu VMM + scheduler emulator.
//
// Thin by design: this binary exists so the library can be explored and
// poked at from a shell. It is not part of the hard contract vmemu-core
// implements; scenario tests live in vmemu-core's own test suite.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;

use vmemu_core::config::Config;
use vmemu_core::VmemuContext;

#[derive(Parser)]
#[command(
    name = "vmemu",
    version,
    about = "vmemu — virtual-memory emulator with a priority-scheduled cooperative runtime"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a vmemu.toml config file (overridden by CLI flags and
    /// VMEMU_* environment variables).
    #[arg(long, global = true, env = "VMEMU_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn a handful of scheduler threads running a scripted workload
    /// and print each scheduling decision.
    Run {
        #[arg(long, default_value_t = 4)]
        threads: u8,
        #[arg(long, default_value_t = 20)]
        ticks: i64,
    },
    /// Allocate heap memory for one thread and dump frame table / free
    /// list occupancy before and after.
    Inspect {
        #[arg(long, default_value_t = 16)]
        frames: usize,
        #[arg(long, default_value_t = 8192)]
        heap_bytes: u32,
    },
    /// List the swap directory's `.swp` files.
    FmtSwap {
        #[arg(long, env = "VMEMU_SWAP_DIR", default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    num_frames: Option<usize>,
    swap_dir: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(path) = &cli.config {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(file) => {
                    if let Some(num_frames) = file.num_frames {
                        config = Config::small(num_frames, file.swap_dir.unwrap_or(config.swap_dir));
                    } else if let Some(swap_dir) = file.swap_dir {
                        config.swap_dir = swap_dir;
                    }
                }
                Err(err) => tracing::warn!(?err, path = %path.display(), "failed to parse config file"),
            },
            Err(err) => tracing::warn!(?err, path = %path.display(), "failed to read config file"),
        }
    }
    config
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match &cli.command {
        Commands::Run { threads, ticks } => run_demo(config, *threads, *ticks),
        Commands::Inspect { frames, heap_bytes } => inspect(config, *frames, *heap_bytes),
        Commands::FmtSwap { dir } => fmt_swap(dir),
    }
}

/// Minimal stand-in for the external tick runtime spec.md places out of
/// scope: drives `next_thread_to_run`/`tick_sleep` from a manual loop
/// instead of real OS thread context switching.
fn run_demo(config: Config, threads: u8, ticks: i64) {
    let ctx = VmemuContext::new(config);
    let mut handles = Vec::new();
    for i in 0..threads {
        let priority = (threads - i) as u8;
        if let Some((_vmm_handle, sched_thread)) = ctx.spawn_thread(format!("worker-{i}"), priority) {
            tracing::info!(name = %sched_thread.name, priority, "spawned");
            handles.push(sched_thread);
        }
    }

    for tick in 0..ticks {
        match ctx.scheduler.next_thread_to_run(tick) {
            Some(thread) => println!("tick {tick:>4}: running {} (priority {})", thread.name, thread.priority()),
            None => println!("tick {tick:>4}: idle"),
        }
    }

    ctx.shutdown();
}

fn inspect(config: Config, frames: usize, heap_bytes: u32) {
    let config = Config::small(frames, config.swap_dir);
    let ctx = VmemuContext::new(config);
    let Some((handle, _)) = ctx.spawn_thread("inspector", 1) else {
        eprintln!("no thread ids available");
        return;
    };

    println!("free frames before allocation: {}", ctx.vmm.free_frame_count());
    match ctx.allocate_heap_mem(&handle, heap_bytes) {
        Some(base) => println!("allocated {heap_bytes} heap bytes at {base:#x}"),
        None => println!("heap allocation failed (exhausted)"),
    }
    println!("free frames after allocation: {}", ctx.vmm.free_frame_count());
    ctx.shutdown();
}

fn fmt_swap(dir: &std::path::Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        eprintln!("cannot read swap directory: {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".swp") {
            println!("{name}");
        }
    }
}
