//! tfapply-artifact: fetch a plan bundle from a CI artifact endpoint
//!
//! Pipeline:
//!   validate reference → bearer GET → follow redirect to signed URL
//!   → stream body to a temp file → extract zip into the plan's directory
//!   → delete temp file
//!
//! Nothing here retries. A failed fetch fails the invocation.

pub mod download;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod reference;

pub use error::ArtifactError;
pub use extract::extract_zip;
pub use fetcher::{ArtifactFetcher, ArtifactSource};
pub use reference::ArtifactReference;
