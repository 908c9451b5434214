use thiserror::Error;

use crate::types::Phase;

pub type ApplyResult<T> = Result<T, ApplyError>;

/// Failure classes of a single apply invocation.
///
/// None of these are retried; the hosting CI layer owns retry policy.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Missing credential or temp dir, invalid artifact reference, or
    /// contradictory inputs.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// Bad envelope, bad archive, or unparseable output JSON.
    #[error("format error: {0}")]
    Format(String),

    /// Carries no cause so callers cannot tell which decryption step failed.
    #[error("decryption failed")]
    Crypto,

    #[error("process error: {0}")]
    Process(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApplyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// An [`ApplyError`] tagged with the phase it aborted.
#[derive(Debug, Error)]
#[error("{phase} failed: {error}")]
pub struct PhaseError {
    pub phase: Phase,
    #[source]
    pub error: ApplyError,
}

impl PhaseError {
    pub fn new(phase: Phase, error: ApplyError) -> Self {
        Self { phase, error }
    }
}
