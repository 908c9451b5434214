//! Artifact reference validation
//!
//! Only archive-download URLs of the form
//! ```text
//! https://<allowed host>/repos/<owner>/<repo>/actions/artifacts/<id>/zip
//! ```
//! are accepted. Validation happens before any network traffic.

use reqwest::Url;
use std::fmt;

use crate::error::ArtifactError;

/// A validated artifact download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    url: Url,
    owner: String,
    repo: String,
    id: u64,
}

impl ArtifactReference {
    pub fn parse(raw: &str, allowed_hosts: &[String]) -> Result<Self, ArtifactError> {
        let reject = || ArtifactError::UnsupportedReference(raw.to_string());

        let url = Url::parse(raw.trim()).map_err(|_| reject())?;
        if url.scheme() != "https"
            || url.port().is_some()
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
        {
            return Err(reject());
        }

        let host = url.host_str().ok_or_else(reject)?;
        if !allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(reject());
        }

        let segments: Vec<&str> = url.path_segments().ok_or_else(reject)?.collect();
        let (owner, repo, id) = match segments.as_slice() {
            ["repos", owner, repo, "actions", "artifacts", id, "zip"]
                if !owner.is_empty() && !repo.is_empty() =>
            {
                (*owner, *repo, *id)
            }
            _ => return Err(reject()),
        };
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject());
        }
        let id: u64 = id.parse().map_err(|_| reject())?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            id,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.id)
    }
}
