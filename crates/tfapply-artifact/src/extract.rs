//! Zip extraction with path containment
//!
//! Entry names are kept as-is, but any entry whose name would resolve
//! outside the destination (absolute paths, `..` escapes, embedded NUL)
//! aborts the extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;

/// Extract every entry of the zip at `archive` into `dest`.
///
/// Returns the paths of the extracted files, in archive order.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    let file = fs::File::open(archive)
        .map_err(|e| ArtifactError::io(format!("opening archive {}", archive.display()), e))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| ArtifactError::Archive(e.to_string()))?;

    fs::create_dir_all(dest)
        .map_err(|e| ArtifactError::io(format!("creating {}", dest.display()), e))?;

    let mut extracted = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| ArtifactError::Archive(e.to_string()))?;

        let relative = entry.enclosed_name().ok_or_else(|| {
            ArtifactError::Archive(format!(
                "entry {:?} escapes the destination directory",
                entry.name()
            ))
        })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| ArtifactError::io(format!("creating {}", target.display()), e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArtifactError::io(format!("creating {}", parent.display()), e))?;
        }

        let mut out = fs::File::create(&target)
            .map_err(|e| ArtifactError::io(format!("creating {}", target.display()), e))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            // Decompression and CRC failures surface as io errors from the reader.
            ArtifactError::Archive(format!("reading entry {:?}: {e}", entry.name()))
        })?;

        apply_mode(&target, entry.unix_mode())?;

        tracing::debug!(entry = %target.display(), bytes = entry.size(), "artifact: extracted");
        extracted.push(target);
    }

    Ok(extracted)
}

#[cfg(unix)]
fn apply_mode(target: &Path, mode: Option<u32>) -> Result<(), ArtifactError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| ArtifactError::io(format!("chmod {}", target.display()), e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_target: &Path, _mode: Option<u32>) -> Result<(), ArtifactError> {
    Ok(())
}
