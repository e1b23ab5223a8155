//! Discovery of archived directories by scanning the results tree.
//!
//! Later stages derive their work list from disk state alone, never from the
//! in-memory results of earlier stages, which keeps every stage resumable.

use crate::storage::WARD_RECORD;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Immediate subdirectories of `dir`, sorted by name.
pub fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// State directories under the results root.
pub fn state_directories(results_dir: &Path) -> io::Result<Vec<PathBuf>> {
    subdirectories(results_dir)
}

/// Ward directories within one state directory: two levels down, holding a
/// ward record.
pub fn ward_directories_in_state(state_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut wards = Vec::new();
    for lga_dir in subdirectories(state_dir)? {
        for ward_dir in subdirectories(&lga_dir)? {
            if ward_dir.join(WARD_RECORD).is_file() {
                wards.push(ward_dir);
            }
        }
    }
    Ok(wards)
}

/// Every ward directory in the archive.
pub fn ward_directories(results_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut wards = Vec::new();
    for state_dir in state_directories(results_dir)? {
        wards.extend(ward_directories_in_state(&state_dir)?);
    }
    Ok(wards)
}
