//! Serialization and writing of dereferenced documents.

use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::OutputError;

/// Destination name that selects standard output.
pub const STDOUT: &str = "-";

/// Serialize `value` as compact JSON, or indented when `pretty` is set.
pub fn to_json(value: &Value, pretty: bool) -> Result<String, OutputError> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|source| OutputError::Serialize { source })
}

/// Write `value` to `dest`, or to stdout when `dest` is `-`.
///
/// Files are written through a temporary file in the destination directory
/// and renamed into place, so a failed write never leaves partial output.
pub fn write_output(value: &Value, dest: &Path, pretty: bool) -> Result<(), OutputError> {
    let json = to_json(value, pretty)?;

    if dest == Path::new(STDOUT) {
        println!("{}", json);
        return Ok(());
    }

    let write_err = |source: std::io::Error| OutputError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(json.as_bytes()).map_err(write_err)?;
    file.persist(dest).map_err(|e| write_err(e.error))?;

    debug!(path = %dest.display(), bytes = json.len(), "output written");
    Ok(())
}
