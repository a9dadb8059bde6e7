//! C4 — Swap.
//!
//! Filename convention `"<ownerThreadId>_<vpn>.swp"`, raw 4096-byte
//! content, process-configurable directory (spec.md §4.4 always uses the
//! working directory; `Config::swap_dir` defaults to that but lets tests
//! isolate themselves in a temp directory).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::PAGE_SIZE;
use crate::error::VmmError;
use crate::memory::image::MemoryImage;

pub fn swap_file_name(owner_thread_id: u8, vpn: u16) -> String {
    format!("{}_{}.swp", owner_thread_id, vpn)
}

fn swap_file_path(swap_dir: &Path, owner_thread_id: u8, vpn: u16) -> PathBuf {
    swap_dir.join(swap_file_name(owner_thread_id, vpn))
}

/// Writes the frame's current contents to `"<owner>_<vpn>.swp"`,
/// truncating any prior copy. On any I/O failure returns
/// [`VmmError::SwapIo`] — the caller is responsible for invoking the
/// `kernelPanic` collaborator (spec.md §4.4: "must not proceed with a
/// partial swap").
pub fn swap_page_to_disk(
    swap_dir: &Path,
    image: &MemoryImage,
    frame_index: u16,
    owner_thread_id: u8,
    vpn: u16,
) -> Result<(), VmmError> {
    let path = swap_file_path(swap_dir, owner_thread_id, vpn);
    image.with_frame(frame_index, |bytes| write_frame(&path, bytes)).map_err(|source| VmmError::SwapIo {
        thread_id: owner_thread_id,
        vpn,
        source,
    })
}

fn write_frame(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

/// Reads `"<owner>_<vpn>.swp"` into the given frame, then deletes the
/// file — page contents are defined only after a swap-out, so a missing
/// file on a `present=false` fault is [`VmmError::MissingSwapOnFault`],
/// not a plain I/O error (spec.md §9: swap-in before first write).
pub fn swap_page_from_disk(
    swap_dir: &Path,
    image: &MemoryImage,
    frame_index: u16,
    owner_thread_id: u8,
    vpn: u16,
) -> Result<(), VmmError> {
    let path = swap_file_path(swap_dir, owner_thread_id, vpn);
    if !path.exists() {
        return Err(VmmError::MissingSwapOnFault {
            thread_id: owner_thread_id,
            vpn,
        });
    }
    image.with_frame(frame_index, |bytes| read_frame(&path, bytes)).map_err(|source| VmmError::SwapIo {
        thread_id: owner_thread_id,
        vpn,
        source,
    })?;
    let _ = fs::remove_file(&path);
    Ok(())
}

fn read_frame(path: &Path, out: &mut [u8]) -> std::io::Result<()> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; PAGE_SIZE as usize];
    file.read_exact(&mut buf)?;
    out.copy_from_slice(&buf);
    Ok(())
}

/// Deletes any swap file matching `"<t>_<v>.swp"` for `t` in
/// `0..=max_thread_id`, `v` in `vpn_range` — spec.md §4.4's shutdown
/// sweep, with the swept VPN range configurable since callers may widen
/// it beyond the source's `[256, 2048)`.
pub fn cleanup_swap_files(
    swap_dir: &Path,
    max_thread_id: u8,
    vpn_range: std::ops::Range<u16>,
) {
    for t in 0..=max_thread_id {
        for v in vpn_range.clone() {
            let path = swap_file_path(swap_dir, t, v);
            let _ = fs::remove_file(path);
        }
    }
}
