//! Name-record access.
//!
//! A record maps an undername of a process to the content it points at.

pub mod http;

use crate::utils::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use http::HttpRecordResolver;

/// TTL written with every record update.
pub const RECORD_TTL_SECONDS: u32 = 3600;

/// Root undername.
pub const ROOT_UNDERNAME: &str = "@";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub transaction_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u32>,
}

/// Read/write access to the records of one process.
#[async_trait]
pub trait RecordResolver: Send + Sync {
    /// The record for `undername`, or `None` when it does not exist.
    async fn get_record(&self, undername: &str) -> Result<Option<Record>>;

    /// Every record of the process keyed by undername.
    async fn get_records(&self) -> Result<BTreeMap<String, Record>>;

    /// Point `undername` at `transaction_id`.
    async fn set_record(&self, undername: &str, transaction_id: &str, ttl_seconds: u32) -> Result<()>;
}
