//! Small file helpers shared by the stores.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// Write `data` to `path` through a tempfile in the same directory, creating
/// parent directories on demand.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = data.len(), "Wrote file");
    Ok(())
}

/// Like [`atomic_write`], but fails with `AlreadyExists` instead of
/// replacing a file that is already at `path`.
pub fn atomic_write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = data.len(), "Created file");
    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
