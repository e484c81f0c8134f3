//! Versions Publisher - Main entry point
//!
//! Records the source record's current content as the newest entry of the
//! destination's `versions.json` and deploys the versions site.

use anyhow::Result;
use clap::Parser;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use versions_publisher::config::{parse_additional_fields, Config, Overrides};
use versions_publisher::{utils, DeployKey, PublishError, PublishOutcome, Publisher};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// ANT process ID to update
    #[arg(short = 'a', long)]
    ant_process: Option<String>,

    /// ANT undername to update [default: @]
    #[arg(short, long)]
    undername: Option<String>,

    /// Source ANT process ID to read the target ID from
    #[arg(long)]
    source_ant_process: Option<String>,

    /// Source ANT undername to read the target ID from [default: @]
    #[arg(long)]
    source_ant_undername: Option<String>,

    /// Gateway FQDN or URL [default: arweave.net]
    #[arg(short, long)]
    gateway: Option<String>,

    /// Folder containing the versions site template. Without it, a directory
    /// holding only versions.json is deployed [default: ./versions-site]
    #[arg(short = 'd', long, value_name = "DIR")]
    template_folder: Option<PathBuf>,

    /// Staging folder [default: ./versions-site-dist]
    #[arg(long, value_name = "DIR")]
    dist_folder: Option<PathBuf>,

    /// JSON object of additional fields for the new version entry
    #[arg(long, value_name = "JSON", value_parser = parse_additional_fields)]
    additional_fields: Option<Map<String, Value>>,

    /// Records endpoint
    #[arg(long, value_name = "URL")]
    records_url: Option<String>,

    /// Upload service endpoint
    #[arg(long, value_name = "URL")]
    upload_url: Option<String>,

    /// Generate the staging folder but do not upload or update the ANT record
    #[arg(long)]
    dry_run: bool,

    /// Only deploy the current staging folder and update the ANT record
    #[arg(long)]
    deploy_dist: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            destination_process: self.ant_process.clone(),
            destination_undername: self.undername.clone(),
            source_process: self.source_ant_process.clone(),
            source_undername: self.source_ant_undername.clone(),
            gateway: self.gateway.clone(),
            records_url: self.records_url.clone(),
            upload_url: self.upload_url.clone(),
            template_folder: self.template_folder.clone(),
            dist_folder: self.dist_folder.clone(),
            additional_fields: self.additional_fields.clone(),
            dry_run: self.dry_run,
            deploy_dist: self.deploy_dist,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?.with_overrides(args.overrides());

    // Initialize logging
    utils::logger::init(&config.log.level)?;

    tracing::debug!("Starting versions-publisher v{}", env!("CARGO_PKG_VERSION"));

    // A missing key is reported by the pipeline's input validation
    let deploy_key = match DeployKey::from_env() {
        Ok(key) => Some(key),
        Err(PublishError::MissingCredential) => None,
        Err(e) => {
            tracing::error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let publisher = Publisher::from_config(config, deploy_key);

    match publisher.run().await {
        Ok(PublishOutcome::UpToDate { content_id }) => {
            tracing::debug!("Nothing to publish, {} is current", content_id);
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
