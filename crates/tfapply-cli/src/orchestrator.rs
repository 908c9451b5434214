//! The apply state machine
//!
//! ```text
//! FetchArtifact? → Stage → Decrypt? → Apply → CaptureOutputs?
//! ```
//!
//! Each phase either hands off to the next or fails the whole run with a
//! [`PhaseError`]. Nothing is retried. The decrypted plan, when one was
//! written, is removed as soon as apply returns.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tfapply_artifact::{ArtifactFetcher, ArtifactSource};
use tfapply_core::config::KeyLayout;
use tfapply_core::{ApplyConfig, ApplyError, ApplyResult, Phase, PhaseError, PlanKind};
use tfapply_crypto::{decrypt_with_key, KeyDerivation, PlanKey, RepeatedFill, ZeroPadded};
use tfapply_exec::{republish, CommandRunner, HostReporter, OutputCapture};
use tracing::info;

use crate::staging::{decrypted_path, inspect, ScopedFile};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub kind: PlanKind,
    /// Directory the tool ran in
    pub working_dir: PathBuf,
    /// Files extracted from the artifact, if one was fetched
    pub fetched: Vec<PathBuf>,
    pub decrypted: bool,
    /// Outputs republished to the host; zero when outputs were not requested
    pub outputs_published: usize,
}

pub struct Orchestrator<R, H, A = ArtifactFetcher> {
    config: ApplyConfig,
    runner: R,
    host: H,
    source: A,
}

impl<R: CommandRunner, H: HostReporter> Orchestrator<R, H> {
    /// Orchestrator that downloads artifacts over HTTPS per
    /// `config.settings.artifact`.
    pub fn new(config: ApplyConfig, runner: R, host: H) -> ApplyResult<Self> {
        let source = ArtifactFetcher::new(&config.settings.artifact)?;
        Ok(Self::with_source(config, runner, host, source))
    }
}

impl<R: CommandRunner, H: HostReporter, A: ArtifactSource> Orchestrator<R, H, A> {
    pub fn with_source(config: ApplyConfig, runner: R, host: H, source: A) -> Self {
        Self {
            config,
            runner,
            host,
            source,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Run every requested phase in order.
    pub async fn run(&mut self) -> Result<ApplyReport, PhaseError> {
        let plan_path = self.config.plan_path();
        let inputs = self.config.inputs.clone();
        info!(
            path = %plan_path.display(),
            decrypt = inputs.decrypt,
            outputs = inputs.outputs,
            artifact = inputs.artifact.is_some(),
            "apply: starting"
        );

        let mut fetched = Vec::new();
        if let Some(reference) = inputs.artifact.as_deref() {
            fetched = self
                .fetch_artifact(reference, &plan_path)
                .await
                .map_err(at(Phase::FetchArtifact))?;
        }

        let kind = inspect(&plan_path, inputs.artifact.is_some(), inputs.decrypt)
            .await
            .map_err(at(Phase::Stage))?;
        let working_dir = match kind {
            PlanKind::Directory => plan_path.clone(),
            PlanKind::File => parent_dir(&plan_path),
        };

        let staged = if inputs.decrypt {
            Some(
                self.decrypt(&plan_path)
                    .await
                    .map_err(at(Phase::Decrypt))?,
            )
        } else {
            None
        };
        let target = staged
            .as_ref()
            .map_or(plan_path.as_path(), |s| s.path())
            .to_path_buf();

        let applied = self.apply(&target, &working_dir).await;
        drop(staged);
        applied.map_err(at(Phase::Apply))?;

        let outputs_published = if inputs.outputs {
            self.capture_outputs(&working_dir)
                .await
                .map_err(at(Phase::CaptureOutputs))?
        } else {
            0
        };

        info!(kind = ?kind, outputs = outputs_published, "apply: complete");
        Ok(ApplyReport {
            kind,
            working_dir,
            fetched,
            decrypted: inputs.decrypt,
            outputs_published,
        })
    }

    async fn fetch_artifact(
        &self,
        reference: &str,
        plan_path: &Path,
    ) -> ApplyResult<Vec<PathBuf>> {
        let destination = parent_dir(plan_path);
        let files = self
            .source
            .fetch(
                reference,
                self.config.credentials.token.as_ref(),
                self.config.runner_temp.as_deref(),
                &destination,
            )
            .await?;
        info!(files = files.len(), destination = %destination.display(), "artifact: extracted");
        Ok(files)
    }

    async fn decrypt(&self, plan_path: &Path) -> ApplyResult<ScopedFile> {
        let passphrase = self.config.credentials.passphrase()?;
        let envelope = tokio::fs::read(plan_path)
            .await
            .map_err(|e| ApplyError::io(format!("reading {}", plan_path.display()), e))?;

        let key = derive_key(self.config.settings.crypto.key_layout, passphrase);
        let plaintext = decrypt_with_key(&envelope, &key).map_err(|_| ApplyError::Crypto)?;

        let target = decrypted_path(plan_path);
        let context = format!("writing {}", target.display());
        let bytes = plaintext.len();
        let staged = tokio::task::spawn_blocking(move || ScopedFile::create(target, &plaintext))
            .await
            .map_err(|e| ApplyError::io(context.clone(), std::io::Error::other(e)))?
            .map_err(|e| ApplyError::io(context, e))?;
        info!(path = %staged.path().display(), bytes, "decrypt: plan staged");
        Ok(staged)
    }

    async fn apply(&self, target: &Path, working_dir: &Path) -> ApplyResult<()> {
        let terraform = &self.config.settings.terraform;
        let mut args = Vec::with_capacity(terraform.apply_args.len() + 2);
        args.push("apply".to_string());
        args.extend(terraform.apply_args.iter().cloned());
        args.push(target.display().to_string());

        self.runner
            .execute(&terraform.binary, &args, working_dir, None)
            .await?;
        Ok(())
    }

    async fn capture_outputs(&mut self, working_dir: &Path) -> ApplyResult<usize> {
        let args = ["output".to_string(), "-json".to_string()];
        let mut capture = OutputCapture::new();
        self.runner
            .execute(
                &self.config.settings.terraform.binary,
                &args,
                working_dir,
                Some(&mut capture),
            )
            .await?;

        let outputs = capture.parse()?;
        republish(&outputs, &mut self.host)
            .map_err(|e| ApplyError::io("publishing step outputs", e))
    }
}

fn derive_key(layout: KeyLayout, passphrase: &SecretString) -> PlanKey {
    match layout {
        KeyLayout::ZeroPadded => ZeroPadded.derive(passphrase),
        KeyLayout::Repeated => RepeatedFill.derive(passphrase),
    }
}

/// Directory containing `path`; `.` for a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn at(phase: Phase) -> impl Fn(ApplyError) -> PhaseError {
    move |error| PhaseError::new(phase, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_bare_name_is_cwd() {
        assert_eq!(parent_dir(Path::new("tfplan")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/w/infra/tfplan")), PathBuf::from("/w/infra"));
    }

    #[test]
    fn key_layout_selects_derivation() {
        let secret = SecretString::from("ab".to_string());
        let zero = derive_key(KeyLayout::ZeroPadded, &secret);
        let repeated = derive_key(KeyLayout::Repeated, &secret);

        assert_eq!(&zero.as_bytes()[..4], b"ab\0\0");
        assert_eq!(&repeated.as_bytes()[..4], b"abab");
    }
}
