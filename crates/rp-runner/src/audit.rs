//! Reading a directory of artifacts back for analysis.

use rp_types::{PersistenceError, ResultRecord, RpResult};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A break in the `1..=n` artifact sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("missing artifact index {expected} (next present is {found})")]
    Gap { expected: usize, found: usize },

    #[error("artifact index {0} appears more than once")]
    Duplicate(usize),
}

/// Load one artifact.
pub fn load_artifact(path: &Path) -> RpResult<ResultRecord> {
    let read_err = |message: String| PersistenceError::Read {
        path: path.display().to_string(),
        message,
    };
    let bytes = fs::read(path).map_err(|e| read_err(e.to_string()))?;
    let record = serde_json::from_slice(&bytes).map_err(|e| read_err(e.to_string()))?;
    Ok(record)
}

/// Success index encoded in `file_name`, if it is an artifact of `prefix`.
pub fn parse_artifact_index(prefix: &str, file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".json")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Artifacts of `prefix` in `dir`, sorted by success index. Temp files, the
/// run summary and other runs' artifacts are ignored.
pub fn scan_artifacts(dir: &Path, prefix: &str) -> RpResult<Vec<(usize, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(|n| parse_artifact_index(prefix, n)) {
            found.push((index, entry.path()));
        }
    }
    found.sort_by_key(|(index, _)| *index);
    Ok(found)
}

/// Check that sorted `indices` are exactly `1, 2, ..., n`.
pub fn verify_sequence(indices: &[usize]) -> Result<(), SequenceError> {
    for (pos, &index) in indices.iter().enumerate() {
        let expected = pos + 1;
        if index == expected {
            continue;
        }
        if pos > 0 && index == indices[pos - 1] {
            return Err(SequenceError::Duplicate(index));
        }
        return Err(SequenceError::Gap {
            expected,
            found: index,
        });
    }
    Ok(())
}
