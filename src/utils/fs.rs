//! File helpers for reading source profiles and persisting results.
//!
//! Output is written to a temporary file in the destination directory and
//! renamed into place, so a failed run never leaves a partial file behind.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads a source profile.
pub fn read_profile(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).with_context(|| format!("Failed to read input profile: {}", path.display()))
}

/// Atomically writes `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The temporary file cannot be created or written
/// - The temporary file cannot be renamed over `path`
pub fn write_atomically(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut temp_file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    temp_file
        .write_all(contents)
        .context("Failed to write output profile to temporary file")?;

    temp_file
        .flush()
        .context("Failed to flush output profile to disk")?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist output profile: {}", path.display()))?;

    tracing::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_missing_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/deeper/profile.yaml");

        write_atomically(&path, b"kind: ApplicationProfile\n")?;

        assert_eq!(std::fs::read_to_string(&path)?, "kind: ApplicationProfile\n");
        Ok(())
    }

    #[test]
    fn test_write_replaces_existing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.yaml");
        std::fs::write(&path, "old")?;

        write_atomically(&path, b"new")?;

        assert_eq!(std::fs::read_to_string(&path)?, "new");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = read_profile("/nonexistent/profile.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/profile.yaml"));
    }

    #[test]
    fn test_read_profile() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("in.yaml");
        std::fs::write(&path, "abc")?;
        assert_eq!(read_profile(&path)?, b"abc");
        Ok(())
    }
}
