//! tfapply-core: shared types, configuration, and the error taxonomy used by
//! every tfapply crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ApplyConfig, ApplyInputs, Credentials, TfapplyConfig};
pub use error::{ApplyError, ApplyResult, PhaseError};
pub use types::{Phase, PlanKind};
