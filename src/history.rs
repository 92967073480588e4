//! Persistent question/answer history.
//!
//! The history lives in a single JSON array on disk. Every append reads
//! the whole file, pushes one entry, and rewrites it through a temp file
//! so a crash mid-write leaves the previous history intact. A missing
//! file reads as an empty history; a file that exists but does not parse
//! is an error, not a silent reset.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::HistoryEntry;

/// Load all history entries, oldest first.
pub fn load_history(path: &Path) -> Result<Vec<HistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read history file {}", path.display()))?;
    let entries: Vec<HistoryEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse history file {}", path.display()))?;
    Ok(entries)
}

/// Append one entry, rewriting the whole file.
pub fn append_history(path: &Path, entry: HistoryEntry) -> Result<()> {
    let mut entries = load_history(path)?;
    entries.push(entry);
    write_history(path, &entries)
}

/// Reset the history to an empty array.
pub fn clear_history(path: &Path) -> Result<()> {
    write_history(path, &[])
}

fn write_history(path: &Path, entries: &[HistoryEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create history directory {}", parent.display())
            })?;
        }
    }
    let json = serde_json::to_string_pretty(entries).context("failed to encode history")?;

    // Write to a sibling temp file, then rename over the target.
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, json)
        .with_context(|| format!("failed to write history file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace history file {}", path.display()))?;
    Ok(())
}
