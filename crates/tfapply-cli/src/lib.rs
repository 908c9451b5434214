//! tfapply orchestration: fetch → stage → decrypt → apply → outputs.

pub mod orchestrator;
pub mod staging;

pub use orchestrator::{ApplyReport, Orchestrator};
pub use staging::{decrypted_path, ScopedFile, DECRYPTED_SUFFIX};
