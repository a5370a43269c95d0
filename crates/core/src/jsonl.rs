// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Provides durable append-only storage for JSON-serializable records.
//! Each record is stored as a single JSON line with fsync for durability.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads all records from a JSONL file.
///
/// Skips empty lines and returns an empty vec if the file doesn't exist.
/// A final line that is not newline-terminated and fails to parse is a write
/// torn by a crash; it is dropped. Any other unparsable line is reported as
/// [`Error::Corrupted`].
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let terminated = bytes.last().map_or(true, |b| *b == b'\n');
    let lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    let last_index = lines.len().saturating_sub(1);
    let mut records = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<T>(line) {
            Ok(record) => records.push(record),
            Err(_) if index == last_index && !terminated => {
                tracing::warn!(path = %path.display(), "ignoring torn trailing record");
            }
            Err(e) => {
                return Err(Error::Corrupted {
                    line: index + 1,
                    reason: e.to_string(),
                })
            }
        }
    }

    Ok(records)
}

/// Replaces the file content with the given records, atomically.
///
/// Records are written to a sibling temporary file which is fsynced and then
/// renamed over `path`, so readers observe either the old or the new content.
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = sibling(path, ".tmp");
    {
        let mut file = File::create(&tmp_path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    // Persist the rename itself; not every platform supports syncing a directory.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Makes the file end on a record boundary so the next append starts a
/// fresh line.
///
/// A torn final line is cut off; a complete record that only lacks its
/// newline gets one. Returns true if the file was changed.
pub fn repair_tail<T: DeserializeOwned>(path: &Path) -> Result<bool> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if bytes.last().map_or(true, |b| *b == b'\n') {
        return Ok(false);
    }

    let keep = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |index| index + 1);
    let tail = &bytes[keep..];
    let file = if serde_json::from_slice::<T>(tail).is_ok() {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(b"\n")?;
        file
    } else {
        tracing::warn!(path = %path.display(), bytes = tail.len(), "truncating torn trailing record");
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(keep as u64)?;
        file
    };
    file.sync_all()?;
    Ok(true)
}

/// Returns `path` with `suffix` appended to its file name.
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
