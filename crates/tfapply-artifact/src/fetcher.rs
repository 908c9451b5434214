use reqwest::{Client, Url};
use secrecy::SecretString;
use std::future::Future;
use std::path::{Path, PathBuf};
use tfapply_core::config::ArtifactConfig;

use crate::download::{build_client, download_to};
use crate::error::ArtifactError;
use crate::extract::extract_zip;
use crate::reference::ArtifactReference;

/// Where the orchestrator gets a plan bundle from.
///
/// Unpacks the bundle named by `reference` into `destination` and returns
/// the extracted file paths. Any temporary download must be gone by the
/// time the future resolves.
pub trait ArtifactSource: Send + Sync {
    fn fetch(
        &self,
        reference: &str,
        token: Option<&SecretString>,
        temp_dir: Option<&Path>,
        destination: &Path,
    ) -> impl Future<Output = Result<Vec<PathBuf>, ArtifactError>> + Send;
}

/// Downloads an artifact archive and unpacks it next to the plan.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: Client,
    allowed_hosts: Vec<String>,
}

impl ArtifactFetcher {
    pub fn new(config: &ArtifactConfig) -> Result<Self, ArtifactError> {
        Ok(Self {
            client: build_client(config)?,
            allowed_hosts: config.allowed_hosts.clone(),
        })
    }

    /// Validate `reference`, download it with `token` into a temp file under
    /// `temp_dir`, and extract it into `destination`.
    ///
    /// Checks run in order: reference format, credential, temp dir. None of
    /// them touch the network.
    pub async fn fetch(
        &self,
        reference: &str,
        token: Option<&SecretString>,
        temp_dir: Option<&Path>,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        let reference = ArtifactReference::parse(reference, &self.allowed_hosts)?;
        let token = token.ok_or(ArtifactError::MissingCredential)?;
        let temp_dir = temp_dir.ok_or(ArtifactError::TempDirNotConfigured)?;

        tracing::info!(artifact = %reference, "artifact: downloading");
        self.fetch_url(reference.url(), token, temp_dir, destination)
            .await
    }

    /// Download and extract an already-validated URL.
    ///
    /// The temp archive is removed once extraction finishes, whether or not
    /// it succeeded, and on every earlier error path via `NamedTempFile`'s drop.
    pub async fn fetch_url(
        &self,
        url: &Url,
        token: &SecretString,
        temp_dir: &Path,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        let archive = tempfile::Builder::new()
            .prefix("artifact-")
            .suffix(".zip")
            .tempfile_in(temp_dir)
            .map_err(|e| {
                ArtifactError::io(format!("creating temp file in {}", temp_dir.display()), e)
            })?;

        let handle = archive
            .as_file()
            .try_clone()
            .map_err(|e| ArtifactError::io("opening temp archive", e))?;
        let mut file = tokio::fs::File::from_std(handle);
        let bytes = download_to(&self.client, url, token, &mut file).await?;
        drop(file);

        tracing::debug!(
            bytes,
            archive = %archive.path().display(),
            destination = %destination.display(),
            "artifact: download complete, extracting"
        );

        let archive_path = archive.path().to_path_buf();
        let dest = destination.to_path_buf();
        let result = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &dest))
            .await
            .map_err(|e| ArtifactError::io("extraction task", std::io::Error::other(e)))?;

        if let Err(e) = archive.close() {
            tracing::warn!("failed to remove temp archive: {e}");
        }

        let files = result?;
        tracing::info!(files = files.len(), "artifact: extracted");
        Ok(files)
    }
}

impl ArtifactSource for ArtifactFetcher {
    async fn fetch(
        &self,
        reference: &str,
        token: Option<&SecretString>,
        temp_dir: Option<&Path>,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        ArtifactFetcher::fetch(self, reference, token, temp_dir, destination).await
    }
}
