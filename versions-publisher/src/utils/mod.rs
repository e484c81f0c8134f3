//! Utility modules for the versions publisher.

pub mod errors;
pub mod logger;

pub use errors::{PublishError, Result};
