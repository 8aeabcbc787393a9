//! File-writing helpers shared by the converters and report writers.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::LabelprepError;

/// Write `contents` to `path` through a sibling temporary file and rename.
///
/// Parent directories are created as needed. A crash mid-write leaves at
/// most a stray temporary file, never a truncated `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), LabelprepError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(LabelprepError::Io)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(LabelprepError::Io)?;
    tmp.write_all(contents).map_err(LabelprepError::Io)?;
    tmp.persist(path)
        .map_err(|err| LabelprepError::Io(err.error))?;
    Ok(())
}
