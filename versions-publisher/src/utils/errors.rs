//! Custom error types for the versions publisher.
//!
//! Every variant is a hard stop for the run. Soft conditions, such as a
//! missing or corrupt remote `versions.json`, are not errors; see
//! [`crate::manifest::reader::FallbackReason`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} must not be empty")]
    InvalidInput(&'static str),

    #[error("DEPLOY_KEY not configured")]
    MissingCredential,

    #[error("Invalid deploy key: {0}")]
    InvalidCredential(String),

    /// Carries the undername that was looked up; empty when the identifier
    /// reached the merge without one.
    #[error("No transaction ID found{}", for_undername(.0))]
    MissingTransactionId(String),

    #[error("Invalid additional fields: {0}")]
    InvalidExtraFields(String),

    #[error("No staged bundle found at {0}")]
    MissingStagedBundle(String),

    #[error("Record resolver error: {0}")]
    Resolver(String),

    #[error("Failed to upload {0}")]
    UploadFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PublishError>;

fn for_undername(undername: &str) -> String {
    if undername.is_empty() {
        String::new()
    } else {
        format!(" for undername [ {} ]", undername)
    }
}
