//! Capturing `terraform output -json`
//!
//! The captured stream starts with the runner's `[command]...` banner, so
//! the first line is dropped unconditionally before the remainder is
//! parsed as:
//! ```text
//! { "<name>": { "sensitive": bool, "type": <json>, "value": <json> }, ... }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;
use tfapply_core::ApplyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("unparseable output: {0}")]
    Unparseable(String),
}

impl From<CaptureError> for ApplyError {
    fn from(err: CaptureError) -> Self {
        ApplyError::Format(err.to_string())
    }
}

/// One named output as reported by the infrastructure tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub sensitive: bool,
    /// Type descriptor; a string for primitives, an array for collections.
    #[serde(rename = "type")]
    pub output_type: Value,
    pub value: Value,
}

impl OutputRecord {
    /// The value as published: strings verbatim, everything else as
    /// compact JSON.
    pub fn rendered_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Outputs in the order the tool reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutputs {
    entries: Vec<(String, OutputRecord)>,
}

impl CapturedOutputs {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&OutputRecord> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputRecord)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }
}

/// Parse the JSON document that follows the banner line.
pub fn parse_outputs(json: &str) -> Result<CapturedOutputs, CaptureError> {
    let map: Map<String, Value> =
        serde_json::from_str(json).map_err(|e| CaptureError::Unparseable(e.to_string()))?;

    let mut entries = Vec::with_capacity(map.len());
    for (name, raw) in map {
        let record: OutputRecord = serde_json::from_value(raw)
            .map_err(|e| CaptureError::Unparseable(format!("output {name:?}: {e}")))?;
        entries.push((name, record));
    }
    Ok(CapturedOutputs { entries })
}

/// Everything after the first newline; empty when there is none.
pub fn strip_banner(text: &str) -> &str {
    text.split_once('\n').map_or("", |(_, rest)| rest)
}

/// Sink for a subprocess's stdout.
#[derive(Debug, Default)]
pub struct OutputCapture {
    buf: Vec<u8>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured text with the banner line removed.
    ///
    /// Invalid UTF-8 anywhere in the stream is an error rather than being
    /// replaced, so a corrupted value is never republished.
    pub fn contents(&self) -> Result<&str, CaptureError> {
        let text = std::str::from_utf8(&self.buf)
            .map_err(|e| CaptureError::Unparseable(format!("output is not UTF-8: {e}")))?;
        Ok(strip_banner(text))
    }

    pub fn parse(&self) -> Result<CapturedOutputs, CaptureError> {
        parse_outputs(self.contents()?)
    }
}

impl io::Write for OutputCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
