//! Plan staging: classifying the plan path and holding the decrypted copy
//!
//! The plaintext plan lives next to the encrypted one as
//! `<plan>.decrypted`. [`ScopedFile`] owns it and removes it on drop, so it
//! is gone after apply regardless of how apply ended.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tfapply_core::{ApplyError, ApplyResult, PlanKind};

pub const DECRYPTED_SUFFIX: &str = ".decrypted";

/// `<path>.decrypted`, in the same directory as `path`.
pub fn decrypted_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(DECRYPTED_SUFFIX);
    path.with_file_name(name)
}

/// Classify the plan path and reject combinations that cannot proceed.
///
/// `fetched` means an artifact was just extracted and must have produced a
/// single file at `path`.
pub async fn inspect(path: &Path, fetched: bool, decrypt: bool) -> ApplyResult<PlanKind> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(if fetched {
                not_at_expected_path(path)
            } else {
                ApplyError::config(format!("no file or directory at {}", path.display()))
            });
        }
        Err(e) => return Err(ApplyError::io(format!("inspecting {}", path.display()), e)),
    };

    let kind = PlanKind::from_file_type(meta.file_type()).ok_or_else(|| {
        ApplyError::config(format!(
            "{} is neither a regular file nor a directory",
            path.display()
        ))
    })?;

    match kind {
        PlanKind::Directory if fetched => Err(not_at_expected_path(path)),
        PlanKind::Directory if decrypt => Err(ApplyError::config(
            "decryption requires a single plan file, not a directory",
        )),
        _ => Ok(kind),
    }
}

fn not_at_expected_path(path: &Path) -> ApplyError {
    ApplyError::config(format!(
        "artifact target not found at expected path {}",
        path.display()
    ))
}

/// A file that is deleted when the guard is dropped.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Write `contents` to `path` (owner read/write only on unix),
    /// replacing any stale file left there.
    ///
    /// The guard exists before the first byte is written; a failed write
    /// still removes the partial file. Blocking; call from a blocking
    /// context.
    pub fn create(path: PathBuf, contents: &[u8]) -> io::Result<Self> {
        let mut file = open_private(&path)?;
        let guard = Self { path };
        restrict(&file)?;
        file.write_all(contents)?;
        file.sync_all()?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "staging: removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                "staging: failed to remove decrypted plan: {e}"
            ),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// `mode` on open only applies to a newly created file; a stale copy keeps
/// whatever mode it had until this runs.
#[cfg(unix)]
fn restrict(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypted_path_is_sibling() {
        assert_eq!(
            decrypted_path(Path::new("/work/infra/tfplan")),
            PathBuf::from("/work/infra/tfplan.decrypted")
        );
        assert_eq!(
            decrypted_path(Path::new("plan.bin")),
            PathBuf::from("plan.bin.decrypted")
        );
    }

    #[test]
    fn scoped_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfplan.decrypted");

        let guard = ScopedFile::create(path.clone(), b"plaintext").unwrap();
        assert_eq!(std::fs::read(guard.path()).unwrap(), b"plaintext");

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn scoped_file_replaces_stale_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfplan.decrypted");
        std::fs::write(&path, b"stale and much longer").unwrap();

        let guard = ScopedFile::create(path.clone(), b"fresh").unwrap();
        assert_eq!(std::fs::read(guard.path()).unwrap(), b"fresh");
    }

    #[test]
    fn already_removed_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        let guard = ScopedFile::create(path.clone(), b"x").unwrap();
        std::fs::remove_file(&path).unwrap();
        drop(guard);
    }

    #[cfg(unix)]
    #[test]
    fn scoped_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let guard = ScopedFile::create(dir.path().join("p"), b"x").unwrap();
        let mode = std::fs::metadata(guard.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn stale_copy_is_tightened_to_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfplan.decrypted");
        std::fs::write(&path, b"stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let guard = ScopedFile::create(path, b"fresh").unwrap();
        let mode = std::fs::metadata(guard.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(guard.path()).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn inspect_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("tfplan");
        std::fs::write(&plan, b"plan").unwrap();

        assert_eq!(inspect(&plan, false, true).await.unwrap(), PlanKind::File);
        assert_eq!(
            inspect(dir.path(), false, false).await.unwrap(),
            PlanKind::Directory
        );
    }

    #[tokio::test]
    async fn inspect_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = inspect(&missing, false, false).await.unwrap_err();
        assert!(err.to_string().contains("no file or directory"), "{err}");

        let err = inspect(&missing, true, false).await.unwrap_err();
        assert!(err.to_string().contains("artifact target not found"), "{err}");
    }

    #[tokio::test]
    async fn inspect_rejects_directory_combinations() {
        let dir = tempfile::tempdir().unwrap();

        let err = inspect(dir.path(), false, true).await.unwrap_err();
        assert!(err.to_string().contains("requires a single plan file"), "{err}");

        let err = inspect(dir.path(), true, false).await.unwrap_err();
        assert!(err.to_string().contains("artifact target not found"), "{err}");
    }
}
