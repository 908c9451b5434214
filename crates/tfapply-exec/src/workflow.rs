//! Host reporting through workflow commands
//!
//! Secrets are masked with `::add-mask::`. Outputs go to the `GITHUB_OUTPUT`
//! file as heredoc records when the runner provides one, else through the
//! legacy `::set-output` command.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::capture::CapturedOutputs;

/// Host-side effects of publishing outputs.
pub trait HostReporter {
    /// Register a value with the host's log redaction.
    fn register_secret(&mut self, value: &str) -> io::Result<()>;

    /// Expose a named step output.
    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()>;
}

/// Republish every captured output, masking sensitive values first.
///
/// A sensitive value is registered before its output is emitted; the
/// reverse order could print it before redaction is in place.
pub fn republish<H: HostReporter + ?Sized>(
    outputs: &CapturedOutputs,
    host: &mut H,
) -> io::Result<usize> {
    let mut published = 0;
    for (name, record) in outputs.iter() {
        let value = record.rendered_value();
        if record.sensitive {
            host.register_secret(&value)?;
        }
        host.set_output(name, &value)?;
        tracing::debug!(output = name, sensitive = record.sensitive, "outputs: published");
        published += 1;
    }
    Ok(published)
}

/// [`HostReporter`] that writes workflow commands to `out`.
#[derive(Debug)]
pub struct WorkflowCommands<W: Write> {
    out: W,
    output_file: Option<PathBuf>,
}

impl WorkflowCommands<io::Stdout> {
    pub fn stdout(output_file: Option<PathBuf>) -> Self {
        Self::new(io::stdout(), output_file)
    }
}

impl<W: Write> WorkflowCommands<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self { out, output_file }
    }

    /// Emit an error annotation.
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        self.command("error", None, message)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn command(
        &mut self,
        name: &str,
        property: Option<(&str, &str)>,
        data: &str,
    ) -> io::Result<()> {
        let mut line = format!("::{name}");
        if let Some((key, value)) = property {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&escape_property(value));
        }
        line.push_str("::");
        line.push_str(&escape_data(data));
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

impl<W: Write> HostReporter for WorkflowCommands<W> {
    fn register_secret(&mut self, value: &str) -> io::Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.command("add-mask", None, value)
    }

    fn set_output(&mut self, name: &str, value: &str) -> io::Result<()> {
        let Some(path) = self.output_file.as_deref() else {
            return self.command("set-output", Some(("name", name)), value);
        };
        let record = file_record(name, value)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(record.as_bytes())
    }
}

/// `name<<DELIM\nvalue\nDELIM\n`, with a random delimiter that must not
/// occur in the name or value.
fn file_record(name: &str, value: &str) -> io::Result<String> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "output contains the generated delimiter",
        ));
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
