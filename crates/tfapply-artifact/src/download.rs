//! Authenticated, redirect-following artifact download
//!
//! The artifact endpoint answers with a redirect to a short-lived signed
//! URL on a different host. The client follows at most `max_redirects`
//! hops. reqwest drops the `Authorization` header when a redirect changes
//! host, so the bearer token never reaches the signed-URL host.

use reqwest::{redirect::Policy, Client, Url};
use secrecy::{ExposeSecret, SecretString};
use tfapply_core::config::ArtifactConfig;
use tokio::io::AsyncWriteExt;

use crate::error::ArtifactError;

/// Build the HTTP client used for artifact downloads.
pub fn build_client(config: &ArtifactConfig) -> Result<Client, ArtifactError> {
    Client::builder()
        .redirect(Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(ArtifactError::Client)
}

/// GET `url` with a bearer token and stream the final response body into
/// `dest`. Returns the number of bytes written.
///
/// A non-2xx status after redirects is an error; the body is not read.
pub async fn download_to(
    client: &Client,
    url: &Url,
    token: &SecretString,
    dest: &mut tokio::fs::File,
) -> Result<u64, ArtifactError> {
    let transport = |source: reqwest::Error| ArtifactError::Transport {
        url: url.to_string(),
        source,
    };

    let mut response = client
        .get(url.clone())
        .bearer_auth(token.expose_secret())
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArtifactError::Status {
            status,
            url: response.url().to_string(),
        });
    }

    tracing::debug!(
        status = %status,
        redirected = response.url() != url,
        "artifact: response received, streaming body"
    );

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(transport)? {
        dest.write_all(&chunk)
            .await
            .map_err(|e| ArtifactError::io("writing artifact archive", e))?;
        written += chunk.len() as u64;
    }
    dest.flush()
        .await
        .map_err(|e| ArtifactError::io("flushing artifact archive", e))?;

    Ok(written)
}
