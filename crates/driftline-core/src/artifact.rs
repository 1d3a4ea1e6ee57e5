// crates/driftline-core/src/artifact.rs
//
// JSON artifact I/O shared by every producer and consumer in the workspace.
//
// Writes go to a temporary file in the destination directory, are fsynced,
// then renamed over the target, so a reader sees either the previous
// document or the new one and never a partial write.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{DriftlineError, Result};

/// Artifact schema version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Read and decode a JSON document.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| DriftlineError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents).map_err(|e| {
        DriftlineError::Serialization(format!("failed to decode {}: {}", path.display(), e))
    })
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_bytes_atomic(path, &bytes)
}

/// Atomically replace `path` with the given text.
pub fn write_text_atomic(path: impl AsRef<Path>, text: &str) -> Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn write_bytes_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| DriftlineError::Io(format!("failed to create {}: {}", dir.display(), e)))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        DriftlineError::Io(format!("failed to replace {}: {}", path.display(), e.error))
    })?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Reject artifacts written by an incompatible producer.
pub fn ensure_format_version(found: u32, what: &str) -> Result<()> {
    if found == FORMAT_VERSION {
        Ok(())
    } else {
        Err(DriftlineError::Artifact(format!(
            "{} has format_version {}, this build reads version {}",
            what, found, FORMAT_VERSION
        )))
    }
}
