//! Record resolver backed by a JSON records endpoint.
//!
//! Routes, relative to the endpoint:
//! - `GET  /{process}/records/{undername}` → `Record` (404 when absent)
//! - `GET  /{process}/records` → `{ undername: Record }`
//! - `POST /{process}/records` with `{ undername, transactionId, ttlSeconds }`

use super::{Record, RecordResolver};
use crate::utils::errors::{PublishError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Header naming the wallet on whose behalf a write is made.
pub const OWNER_HEADER: &str = "x-deploy-owner";

#[derive(Debug, Clone)]
pub struct HttpRecordResolver {
    client: reqwest::Client,
    endpoint: String,
    process_id: String,
    owner: Option<String>,
    api_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRecordRequest<'a> {
    undername: &'a str,
    transaction_id: &'a str,
    ttl_seconds: u32,
}

impl HttpRecordResolver {
    pub fn new(endpoint: &str, process_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, process_id)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str, process_id: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            process_id: process_id.into(),
            owner: None,
            api_token: None,
        }
    }

    /// Sign writes as `owner`.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| PublishError::Config(format!("invalid records endpoint {}: {}", self.endpoint, e)))?;

        url.path_segments_mut()
            .map_err(|_| PublishError::Config(format!("records endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .push(&self.process_id)
            .push("records")
            .extend(tail);

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match &self.owner {
            Some(owner) => request.header(OWNER_HEADER, owner),
            None => request,
        }
    }

    async fn failure(&self, action: &str, response: Response) -> PublishError {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        PublishError::Resolver(format!(
            "{} for process {} failed with status {}: {}",
            action, self.process_id, status, body
        ))
    }
}

#[async_trait]
impl RecordResolver for HttpRecordResolver {
    async fn get_record(&self, undername: &str) -> Result<Option<Record>> {
        let url = self.url(&[undername])?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(self.failure("getRecord", response).await),
        }
    }

    async fn get_records(&self) -> Result<BTreeMap<String, Record>> {
        let url = self.url(&[])?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(self.failure("getRecords", response).await);
        }

        Ok(response.json().await?)
    }

    async fn set_record(&self, undername: &str, transaction_id: &str, ttl_seconds: u32) -> Result<()> {
        let url = self.url(&[])?;
        let body = SetRecordRequest {
            undername,
            transaction_id,
            ttl_seconds,
        };

        let response = self
            .authorize(self.client.post(url).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure("setRecord", response).await);
        }

        info!(
            "Record [{}] of process {} now points at {}",
            undername, self.process_id, transaction_id
        );
        Ok(())
    }
}
