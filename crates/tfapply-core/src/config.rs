use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ApplyError, ApplyResult};

/// Settings file schema (loaded from .tfapply.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TfapplyConfig {
    pub terraform: TerraformConfig,
    pub artifact: ArtifactConfig,
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// Program name or path of the infrastructure tool (default: terraform)
    pub binary: String,
    /// Flags passed to `apply` ahead of the plan path
    pub apply_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Hosts an artifact reference may point at
    pub allowed_hosts: Vec<String>,
    /// Redirect hops followed before the download is abandoned
    pub max_redirects: usize,
    /// User-Agent sent with the download request
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// How the passphrase is laid out into the 32-byte key
    pub key_layout: KeyLayout,
}

/// Passphrase-to-key layouts understood by the envelope codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyLayout {
    /// Passphrase bytes followed by zero fill, truncated at 32 bytes
    #[default]
    ZeroPadded,
    /// Passphrase bytes repeated until 32 bytes are filled
    Repeated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".into(),
            apply_args: vec!["-auto-approve".into(), "-input=false".into()],
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec!["api.github.com".into()],
            max_redirects: 3,
            user_agent: concat!("tfapply/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Step inputs as supplied by the workflow.
#[derive(Debug, Clone, Default)]
pub struct ApplyInputs {
    /// Plan file or configuration directory, relative to the workspace
    pub path: PathBuf,
    pub decrypt: bool,
    pub outputs: bool,
    /// Artifact download URL; when set, the plan is fetched before staging
    pub artifact: Option<String>,
}

/// Secrets handed to the step. `Debug` on `SecretString` is redacted.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub passphrase: Option<SecretString>,
    pub token: Option<SecretString>,
}

impl Credentials {
    pub fn passphrase(&self) -> ApplyResult<&SecretString> {
        self.passphrase
            .as_ref()
            .ok_or_else(|| ApplyError::config("missing credential: decryption passphrase (SECRET)"))
    }
}

/// Everything one invocation needs, sourced once at the process boundary.
#[derive(Debug, Clone, Default)]
pub struct ApplyConfig {
    pub settings: TfapplyConfig,
    pub inputs: ApplyInputs,
    pub credentials: Credentials,
    /// Directory the `path` input is resolved against
    pub workspace: PathBuf,
    /// Scratch directory provided by the runner (RUNNER_TEMP)
    pub runner_temp: Option<PathBuf>,
}

impl ApplyConfig {
    /// The plan path: `inputs.path` resolved against the workspace.
    /// Absolute inputs are returned unchanged.
    pub fn plan_path(&self) -> PathBuf {
        self.workspace.join(&self.inputs.path)
    }
}

/// Parse a boolean step input.
///
/// Accepts the YAML 1.2 core schema spellings; an empty value is false.
pub fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" | "" => Ok(false),
        other => Err(format!(
            "invalid boolean input {other:?}: expected one of true|True|TRUE|false|False|FALSE"
        )),
    }
}
