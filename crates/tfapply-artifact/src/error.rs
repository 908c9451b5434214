use tfapply_core::ApplyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("unsupported artifact reference: {0}")]
    UnsupportedReference(String),

    #[error("missing credential: bearer token (GITHUB_TOKEN)")]
    MissingCredential,

    #[error("temporary directory not configured (RUNNER_TEMP)")]
    TempDirNotConfigured,

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("artifact download returned HTTP {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid artifact archive: {0}")]
    Archive(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<ArtifactError> for ApplyError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::UnsupportedReference(_)
            | ArtifactError::MissingCredential
            | ArtifactError::TempDirNotConfigured
            | ArtifactError::Client(_) => ApplyError::Configuration(err.to_string()),
            ArtifactError::Transport { .. } | ArtifactError::Status { .. } => {
                ApplyError::Transport(err.to_string())
            }
            ArtifactError::Archive(_) => ApplyError::Format(err.to_string()),
            ArtifactError::Io { context, source } => ApplyError::Io { context, source },
        }
    }
}
