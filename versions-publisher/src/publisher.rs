//! Publish pipeline.
//!
//! Mirrors the source record's content into the destination's version
//! history: resolve pointers, load and merge `versions.json`, stage the site,
//! upload it and point the destination record at the new bundle. Each step
//! runs to completion before the next; any failure ends the run without
//! touching the destination record.

use crate::config::Config;
use crate::credentials::DeployKey;
use crate::manifest::merge::{merge_versions, MergeOutcome};
use crate::manifest::reader::ManifestReader;
use crate::manifest::VERSIONS_FILE;
use crate::records::{HttpRecordResolver, Record, RecordResolver, RECORD_TTL_SECONDS};
use crate::stage::{stage_bundle, StagedBundle};
use crate::upload::{BundleUploader, HttpBundleUploader};
use crate::utils::errors::{PublishError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Source of merge timestamps.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The source content already heads the history; nothing was staged.
    UpToDate { content_id: String },

    /// The bundle was staged but not uploaded.
    DryRun { staging_dir: PathBuf },

    /// The bundle was uploaded and the destination record updated.
    Deployed {
        manifest_id: String,
        process_id: String,
        undername: String,
    },
}

pub struct Publisher {
    config: Config,
    deploy_key: Option<DeployKey>,
    source: Arc<dyn RecordResolver>,
    destination: Arc<dyn RecordResolver>,
    uploader: Arc<dyn BundleUploader>,
    reader: ManifestReader,
    clock: Arc<dyn Clock>,
}

impl Publisher {
    pub fn new(
        config: Config,
        deploy_key: Option<DeployKey>,
        source: Arc<dyn RecordResolver>,
        destination: Arc<dyn RecordResolver>,
        uploader: Arc<dyn BundleUploader>,
    ) -> Self {
        let reader = ManifestReader::new(&config.gateway);
        Self {
            config,
            deploy_key,
            source,
            destination,
            uploader,
            reader,
            clock: Arc::new(SystemClock),
        }
    }

    /// Publisher talking to the configured gateway, records and upload
    /// endpoints over HTTP.
    pub fn from_config(config: Config, deploy_key: Option<DeployKey>) -> Self {
        let client = reqwest::Client::new();
        let owner = deploy_key.as_ref().map(|key| key.address().to_string());

        let resolver = |process_id: &str| {
            let resolver = HttpRecordResolver::with_client(client.clone(), &config.records_url, process_id)
                .with_api_token(config.api_token.clone());
            match &owner {
                Some(owner) => resolver.with_owner(owner.clone()),
                None => resolver,
            }
        };
        let source = Arc::new(resolver(&config.source.process_id));
        let destination = Arc::new(resolver(&config.destination.process_id));

        let uploader = HttpBundleUploader::with_client(client.clone(), &config.upload_url)
            .with_api_token(config.api_token.clone());

        let reader = ManifestReader::with_client(client, &config.gateway);

        Self::new(config, deploy_key, source, destination, Arc::new(uploader)).with_reader(reader)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reader(mut self, reader: ManifestReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline once.
    pub async fn run(&self) -> Result<PublishOutcome> {
        let run_id = Uuid::new_v4();
        self.run_steps()
            .instrument(info_span!("publish", %run_id))
            .await
    }

    async fn run_steps(&self) -> Result<PublishOutcome> {
        let key = self.validate_inputs()?;

        let staging_dir = self.config.dist_folder.clone();

        if self.config.deploy_dist {
            info!("Deploying current {} to ANT", staging_dir.display());
            if !staging_dir.is_dir() {
                return Err(PublishError::MissingStagedBundle(staging_dir.display().to_string()));
            }
        } else if let Some(content_id) = self.prepare_bundle().await? {
            return Ok(PublishOutcome::UpToDate { content_id });
        }

        if self.config.dry_run {
            info!("Dry run complete. Exiting.");
            return Ok(PublishOutcome::DryRun { staging_dir });
        }

        info!("Uploading {} to Arweave", staging_dir.display());
        let manifest_id = self
            .uploader
            .upload_bundle(&staging_dir, key)
            .await?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PublishError::UploadFailed(staging_dir.display().to_string()))?;

        let destination = &self.config.destination;
        self.destination
            .set_record(&destination.undername, &manifest_id, RECORD_TTL_SECONDS)
            .await?;

        info!(
            "Deployed TxId [{}] to ANT [{}] using undername [{}]",
            manifest_id, destination.process_id, destination.undername
        );

        Ok(PublishOutcome::Deployed {
            manifest_id,
            process_id: destination.process_id.clone(),
            undername: destination.undername.clone(),
        })
    }

    fn validate_inputs(&self) -> Result<&DeployKey> {
        let key = self.deploy_key.as_ref().ok_or(PublishError::MissingCredential)?;

        let required = [
            ("ant process", &self.config.destination.process_id),
            ("undername", &self.config.destination.undername),
            ("source ant process", &self.config.source.process_id),
            ("source ant undername", &self.config.source.undername),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(PublishError::InvalidInput(name));
            }
        }

        info!("Publishing as {}", key.address());
        Ok(key)
    }

    /// Resolve, merge and stage. Returns the source content id when the
    /// history is already up to date and nothing was staged.
    async fn prepare_bundle(&self) -> Result<Option<String>> {
        let source = &self.config.source;
        let destination = &self.config.destination;

        info!(
            "Retrieving source record from ANT: process {}, undername {}",
            source.process_id, source.undername
        );
        let source_tx_id = transaction_id(self.source.get_record(&source.undername).await?);
        let current_tx_id = transaction_id(self.destination.get_record(&destination.undername).await?);

        let source_tx_id = source_tx_id.ok_or_else(|| PublishError::MissingTransactionId(source.undername.clone()))?;
        info!("Found transaction ID [{}]", source_tx_id);

        info!(
            "Retrieving {} from ANT: process {}, undername {}",
            VERSIONS_FILE, destination.process_id, destination.undername
        );
        let records = self.destination.get_records().await?;
        let bundle_id = transaction_id(records.get(&destination.undername).cloned())
            .ok_or_else(|| PublishError::MissingTransactionId(destination.undername.clone()))?;

        let manifest = self.reader.fetch(&bundle_id).await.into_manifest();

        let outcome = merge_versions(
            manifest,
            &source_tx_id,
            current_tx_id.as_deref(),
            &self.config.additional_fields,
            self.clock.now_millis(),
        )?;

        let manifest = match outcome {
            MergeOutcome::Unchanged(_) => {
                info!("Source TxId is already the latest version. Exiting.");
                return Ok(Some(source_tx_id));
            }
            MergeOutcome::Changed(manifest) => manifest,
        };

        let options = self.config.stage_options();
        let staged: StagedBundle = tokio::task::spawn_blocking(move || stage_bundle(&options, &manifest))
            .await
            .map_err(|e| PublishError::Io(std::io::Error::other(e)))??;

        info!(
            "Staged {} ({} template files)",
            staged.dir.display(),
            staged.template_files
        );
        Ok(None)
    }
}

fn transaction_id(record: Option<Record>) -> Option<String> {
    record
        .map(|record| record.transaction_id)
        .filter(|id| !id.is_empty())
}
