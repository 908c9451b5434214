//! Subprocess execution
//!
//! Every invocation first echoes `[command]<program> <args>` as one line,
//! then streams the child's stdout. With a sink attached, both go to the
//! sink only; without one, both go to our stdout. Stderr is inherited.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tfapply_core::ApplyError;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("streaming output of {program}: {source}")]
    Stream {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ProcessError> for ApplyError {
    fn from(err: ProcessError) -> Self {
        ApplyError::Process(err.to_string())
    }
}

/// Runs an external program to completion.
///
/// A non-zero exit is an error. When `sink` is given, standard output is
/// written to it incrementally as the child produces it.
pub trait CommandRunner: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
        sink: Option<&mut (dyn Write + Send)>,
    ) -> impl Future<Output = Result<(), ProcessError>> + Send;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
        mut sink: Option<&mut (dyn Write + Send)>,
    ) -> Result<(), ProcessError> {
        let stream_err = |source: std::io::Error| ProcessError::Stream {
            program: program.to_string(),
            source,
        };

        let banner = format!("[command]{}\n", command_line(program, args));
        let mut stdout = tokio::io::stdout();
        match sink.as_deref_mut() {
            Some(s) => s.write_all(banner.as_bytes()).map_err(stream_err)?,
            None => stdout
                .write_all(banner.as_bytes())
                .await
                .map_err(stream_err)?,
        }

        tracing::debug!(
            program,
            cwd = %working_dir.display(),
            captured = sink.is_some(),
            "exec: spawning"
        );

        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if let Some(mut out) = child.stdout.take() {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                let n = out.read(&mut buf).await.map_err(stream_err)?;
                if n == 0 {
                    break;
                }
                match sink.as_deref_mut() {
                    Some(s) => s.write_all(&buf[..n]).map_err(stream_err)?,
                    None => stdout.write_all(&buf[..n]).await.map_err(stream_err)?,
                }
            }
        }
        stdout.flush().await.map_err(stream_err)?;

        let status = child.wait().await.map_err(stream_err)?;
        if !status.success() {
            return Err(ProcessError::Exit {
                program: program.to_string(),
                status,
            });
        }

        tracing::debug!(program, "exec: finished");
        Ok(())
    }
}

/// Render a command line for display, quoting arguments that contain
/// whitespace or quotes.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = quote(program);
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line
}

fn quote(s: &str) -> String {
    if !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == '"') {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\\\""))
}
