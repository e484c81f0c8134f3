//! Versions Publisher Library
//!
//! Maintains an append-only `versions.json` history for a name record and
//! deploys the versions site that serves it.

pub mod config;
pub mod credentials;
pub mod fs;
pub mod manifest;
pub mod publisher;
pub mod records;
pub mod stage;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use credentials::DeployKey;
pub use manifest::{VersionEntry, VersionManifest};
pub use publisher::{PublishOutcome, Publisher};
pub use utils::errors::PublishError;
pub type Result<T> = std::result::Result<T, PublishError>;
