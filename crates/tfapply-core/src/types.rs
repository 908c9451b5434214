use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::FileType;

/// Kind of a plan path: a single saved plan file, or a configuration directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    File,
    Directory,
}

impl PlanKind {
    /// Classify a file type; anything other than a regular file or directory
    /// (sockets, fifos, ...) has no kind.
    pub fn from_file_type(ft: FileType) -> Option<Self> {
        if ft.is_file() {
            Some(Self::File)
        } else if ft.is_dir() {
            Some(Self::Directory)
        } else {
            None
        }
    }
}

/// Phases of an apply invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    FetchArtifact,
    Stage,
    Decrypt,
    Apply,
    CaptureOutputs,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::FetchArtifact => "fetch artifact",
            Phase::Stage => "stage plan",
            Phase::Decrypt => "decrypt plan",
            Phase::Apply => "apply",
            Phase::CaptureOutputs => "capture outputs",
        };
        f.write_str(s)
    }
}
