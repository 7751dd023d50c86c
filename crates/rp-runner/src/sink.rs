//! Durable, atomic artifact storage.

use chrono::Utc;
use rp_types::{PersistenceError, ResultRecord};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `{prefix}_{index:04}.json`, with a 1-based success index.
pub fn artifact_file_name(prefix: &str, success_index: usize) -> String {
    format!("{prefix}_{success_index:04}.json")
}

/// `{prefix}_summary.json`
pub fn summary_file_name(prefix: &str) -> String {
    format!("{prefix}_summary.json")
}

/// Destination for successful trial records.
pub trait ArtifactSink: Send + Sync {
    /// Durably store `record` at `path`. Must never leave a partial file at
    /// `path` and must never replace an existing artifact.
    fn write(&self, path: &Path, record: &ResultRecord) -> Result<(), PersistenceError>;
}

/// Writes each record as one JSON document via temp file + link, never
/// replacing an existing artifact.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSink {
    pretty: bool,
}

impl JsonFileSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the JSON. Larger files, easier to eyeball.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl ArtifactSink for JsonFileSink {
    fn write(&self, path: &Path, record: &ResultRecord) -> Result<(), PersistenceError> {
        create_json_atomic(path, record, self.pretty)
    }
}

/// Serialize `value` and move it into place atomically, replacing any
/// existing file.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<(), PersistenceError> {
    let bytes = encode(path, value, pretty)?;
    atomic_write_bytes(path, &bytes, true).map_err(|source| PersistenceError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Like [`write_json_atomic`], but fails with `AlreadyExists` rather than
/// replace a file at `path`, including one created concurrently.
pub fn create_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<(), PersistenceError> {
    let bytes = encode(path, value, pretty)?;
    atomic_write_bytes(path, &bytes, false).map_err(|source| {
        if source.kind() == ErrorKind::AlreadyExists {
            PersistenceError::AlreadyExists {
                path: path.display().to_string(),
            }
        } else {
            PersistenceError::Write {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

fn encode<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<Vec<u8>, PersistenceError> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    };
    encoded.map_err(|source| PersistenceError::Encode {
        path: path.display().to_string(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        name,
        std::process::id(),
        Utc::now().timestamp_micros()
    ))
}

fn atomic_write_bytes(path: &Path, bytes: &[u8], replace: bool) -> std::io::Result<()> {
    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        if replace {
            fs::rename(&tmp, path)
        } else {
            // Unlike rename, linking never replaces an existing `path`.
            fs::hard_link(&tmp, path)
        }
    })();
    if result.is_err() || !replace {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    // Persist the directory entry itself; not every platform allows opening a dir.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
