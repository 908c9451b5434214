//! tfapply-exec: running the infrastructure tool and republishing its outputs
//!
//!   runner   - `CommandRunner` seam + tokio process implementation
//!   capture  - stdout sink that drops the command banner and parses outputs
//!   workflow - host reporting: secret masking and step outputs

pub mod capture;
pub mod runner;
pub mod workflow;

pub use capture::{CaptureError, CapturedOutputs, OutputCapture, OutputRecord};
pub use runner::{CommandRunner, ProcessError, ProcessRunner};
pub use workflow::{republish, HostReporter, WorkflowCommands};
