//! Fetch → stage → apply against a local artifact endpoint.
//!
//! The endpoint checks the bearer token and redirects to a blob URL, like
//! the hosted API. [`LocalEndpoint`] resolves references against the local
//! server and then runs the real download and extraction.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::Url;
use secrecy::SecretString;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tfapply_artifact::{ArtifactError, ArtifactFetcher, ArtifactSource};
use tfapply_cli::Orchestrator;
use tfapply_core::config::ArtifactConfig;
use tfapply_core::{ApplyConfig, ApplyError, ApplyInputs, Phase, PlanKind};
use tfapply_exec::{CommandRunner, HostReporter, ProcessError};

const REFERENCE: &str = "/repos/o/r/actions/artifacts/1/zip";

struct LocalEndpoint {
    base: String,
    fetcher: ArtifactFetcher,
}

impl LocalEndpoint {
    fn new(addr: SocketAddr) -> Self {
        Self {
            base: format!("http://{addr}"),
            fetcher: ArtifactFetcher::new(&ArtifactConfig::default()).unwrap(),
        }
    }
}

impl ArtifactSource for LocalEndpoint {
    async fn fetch(
        &self,
        reference: &str,
        token: Option<&SecretString>,
        temp_dir: Option<&Path>,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        let url = Url::parse(&format!("{}{reference}", self.base))
            .map_err(|_| ArtifactError::UnsupportedReference(reference.to_string()))?;
        let token = token.ok_or(ArtifactError::MissingCredential)?;
        let temp_dir = temp_dir.ok_or(ArtifactError::TempDirNotConfigured)?;
        self.fetcher
            .fetch_url(&url, token, temp_dir, destination)
            .await
    }
}

#[derive(Debug, Clone)]
struct Invocation {
    args: Vec<String>,
    working_dir: PathBuf,
    plan: Option<Vec<u8>>,
}

#[derive(Clone, Default)]
struct RecordingRunner {
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn execute(
        &self,
        _program: &str,
        args: &[String],
        working_dir: &Path,
        _sink: Option<&mut (dyn Write + Send)>,
    ) -> Result<(), ProcessError> {
        let plan = args.last().and_then(|p| std::fs::read(working_dir.join(p)).ok());
        self.calls.lock().unwrap().push(Invocation {
            args: args.to_vec(),
            working_dir: working_dir.to_path_buf(),
            plan,
        });
        Ok(())
    }
}

struct NoHost;

impl HostReporter for NoHost {
    fn register_secret(&mut self, _value: &str) -> std::io::Result<()> {
        Ok(())
    }

    fn set_output(&mut self, _name: &str, _value: &str) -> std::io::Result<()> {
        Ok(())
    }
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

async fn artifact(headers: HeaderMap) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth != Some("Bearer testing") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (StatusCode::FOUND, [(header::LOCATION, "/signed/blob")]).into_response()
}

async fn blob(State(body): State<Arc<Vec<u8>>>) -> Response {
    (StatusCode::OK, body.as_ref().clone()).into_response()
}

async fn spawn_server(body: Vec<u8>) -> SocketAddr {
    let app = Router::new()
        .route(REFERENCE, get(artifact))
        .route("/signed/blob", get(blob))
        .with_state(Arc::new(body));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

/// Workspace and runner temp dir, with the artifact input pointed at
/// `infra/tfplan-zipped`.
fn config(ws: &Path, runner_temp: &Path, token: &str) -> ApplyConfig {
    let mut config = ApplyConfig {
        workspace: ws.to_path_buf(),
        runner_temp: Some(runner_temp.to_path_buf()),
        inputs: ApplyInputs {
            path: PathBuf::from("infra/tfplan-zipped"),
            artifact: Some(REFERENCE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    config.credentials.token = Some(secret(token));
    config
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn fetched_plan_is_applied_from_its_directory() {
    let addr = spawn_server(zip_bytes(&[("tfplan-zipped", b"plan-bytes".as_slice())])).await;
    let ws = tempfile::tempdir().unwrap();
    let runner_temp = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();

    let report = Orchestrator::with_source(
        config(ws.path(), runner_temp.path(), "testing"),
        runner.clone(),
        NoHost,
        LocalEndpoint::new(addr),
    )
    .run()
    .await
    .unwrap();

    let infra = ws.path().join("infra");
    let plan = infra.join("tfplan-zipped");
    assert_eq!(report.kind, PlanKind::File);
    assert_eq!(report.fetched, vec![plan.clone()]);
    assert_eq!(report.working_dir, infra);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args.last(), Some(&plan.display().to_string()));
    assert_eq!(calls[0].working_dir, infra);
    assert_eq!(calls[0].plan.as_deref(), Some(b"plan-bytes".as_slice()));
    assert!(
        dir_is_empty(runner_temp.path()),
        "downloaded archive must not outlive the fetch"
    );
}

#[tokio::test]
async fn fetched_encrypted_plan_is_decrypted_before_apply() {
    let envelope = tfapply_crypto::encrypt(b"plaintext plan", &secret("pw"));
    let addr = spawn_server(zip_bytes(&[("tfplan-zipped", envelope.as_slice())])).await;
    let ws = tempfile::tempdir().unwrap();
    let runner_temp = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();

    let mut cfg = config(ws.path(), runner_temp.path(), "testing");
    cfg.inputs.decrypt = true;
    cfg.credentials.passphrase = Some(secret("pw"));
    let report = Orchestrator::with_source(cfg, runner.clone(), NoHost, LocalEndpoint::new(addr))
        .run()
        .await
        .unwrap();

    assert!(report.decrypted);
    let staged = ws.path().join("infra/tfplan-zipped.decrypted");
    let calls = runner.calls();
    assert_eq!(calls[0].args.last(), Some(&staged.display().to_string()));
    assert_eq!(calls[0].plan.as_deref(), Some(b"plaintext plan".as_slice()));
    assert!(!staged.exists());
    assert!(dir_is_empty(runner_temp.path()));
}

#[tokio::test]
async fn fetched_directory_is_not_a_plan() {
    let addr = spawn_server(zip_bytes(&[("tfplan-zipped/main.tf", b"{}".as_slice())])).await;
    let ws = tempfile::tempdir().unwrap();
    let runner_temp = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();

    let err = Orchestrator::with_source(
        config(ws.path(), runner_temp.path(), "testing"),
        runner.clone(),
        NoHost,
        LocalEndpoint::new(addr),
    )
    .run()
    .await
    .unwrap_err();

    assert_eq!(err.phase, Phase::Stage);
    assert!(err.to_string().contains("artifact target not found"), "{err}");
    assert!(runner.calls().is_empty());
    assert!(dir_is_empty(runner_temp.path()));
}

#[tokio::test]
async fn rejected_download_never_applies() {
    let addr = spawn_server(zip_bytes(&[("tfplan-zipped", b"plan".as_slice())])).await;
    let ws = tempfile::tempdir().unwrap();
    let runner_temp = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();

    let err = Orchestrator::with_source(
        config(ws.path(), runner_temp.path(), "wrong"),
        runner.clone(),
        NoHost,
        LocalEndpoint::new(addr),
    )
    .run()
    .await
    .unwrap_err();

    assert_eq!(err.phase, Phase::FetchArtifact);
    assert!(matches!(err.error, ApplyError::Transport(_)), "{err}");
    assert!(runner.calls().is_empty());
    assert!(!ws.path().join("infra/tfplan-zipped").exists());
    assert!(dir_is_empty(runner_temp.path()));
}
