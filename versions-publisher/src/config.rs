//! Configuration management for the versions publisher.
//!
//! Loaded from an optional TOML file, then overridden by command-line flags.
//! Secrets come from the environment (a `.env` file is honoured).

use crate::records::ROOT_UNDERNAME;
use crate::stage::StageOptions;
use crate::utils::errors::{PublishError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variable holding the records/upload API token.
pub const API_TOKEN_ENV: &str = "PUBLISH_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record whose history is published
    pub destination: RecordTarget,

    /// Record whose current content becomes the newest version
    pub source: RecordTarget,

    /// Gateway host (or full URL) serving deployed bundles
    pub gateway: String,

    /// Records endpoint used to read and update name records
    pub records_url: String,

    /// Upload service endpoint
    pub upload_url: String,

    /// Bearer token for the records and upload endpoints
    pub api_token: Option<String>,

    /// Site template copied into every bundle
    pub template_folder: PathBuf,

    /// Staging directory, replaced on every run
    pub dist_folder: PathBuf,

    /// Fields added to every new version entry
    pub additional_fields: Map<String, Value>,

    /// Stage the bundle but skip upload and record update
    pub dry_run: bool,

    /// Publish the existing staging directory as is
    pub deploy_dist: bool,

    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTarget {
    /// Process owning the record
    #[serde(default)]
    pub process_id: String,

    /// Undername within the process
    #[serde(default = "default_undername")]
    pub undername: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Values supplied on the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub destination_process: Option<String>,
    pub destination_undername: Option<String>,
    pub source_process: Option<String>,
    pub source_undername: Option<String>,
    pub gateway: Option<String>,
    pub records_url: Option<String>,
    pub upload_url: Option<String>,
    pub template_folder: Option<PathBuf>,
    pub dist_folder: Option<PathBuf>,
    pub additional_fields: Option<Map<String, Value>>,
    pub dry_run: bool,
    pub deploy_dist: bool,
    pub log_level: Option<String>,
}

// Default values
fn default_undername() -> String {
    ROOT_UNDERNAME.to_string()
}

fn default_gateway() -> String {
    "arweave.net".to_string()
}

fn default_records_url() -> String {
    "https://records.ar.io".to_string()
}

fn default_upload_url() -> String {
    "https://upload.ardrive.io/v1".to_string()
}

fn default_template_folder() -> PathBuf {
    PathBuf::from("./versions-site")
}

fn default_dist_folder() -> PathBuf {
    PathBuf::from("./versions-site-dist")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RecordTarget {
    fn default() -> Self {
        Self {
            process_id: String::new(),
            undername: default_undername(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            destination: RecordTarget::default(),
            source: RecordTarget::default(),
            gateway: default_gateway(),
            records_url: default_records_url(),
            upload_url: default_upload_url(),
            api_token: None,
            template_folder: default_template_folder(),
            dist_folder: default_dist_folder(),
            additional_fields: Map::new(),
            dry_run: false,
            deploy_dist: false,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PublishError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PublishError::Config(e.to_string()))
    }

    /// Load the file (or defaults) and fill unset secrets from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if config.api_token.is_none() {
            config.api_token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        }

        Ok(config)
    }

    /// Apply command-line values on top of the loaded configuration.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.destination_process {
            self.destination.process_id = v;
        }
        if let Some(v) = overrides.destination_undername {
            self.destination.undername = v;
        }
        if let Some(v) = overrides.source_process {
            self.source.process_id = v;
        }
        if let Some(v) = overrides.source_undername {
            self.source.undername = v;
        }
        if let Some(v) = overrides.gateway {
            self.gateway = v;
        }
        if let Some(v) = overrides.records_url {
            self.records_url = v;
        }
        if let Some(v) = overrides.upload_url {
            self.upload_url = v;
        }
        if let Some(v) = overrides.template_folder {
            self.template_folder = v;
        }
        if let Some(v) = overrides.dist_folder {
            self.dist_folder = v;
        }
        if let Some(v) = overrides.additional_fields {
            self.additional_fields = v;
        }
        if let Some(v) = overrides.log_level {
            self.log.level = v;
        }
        self.dry_run |= overrides.dry_run;
        self.deploy_dist |= overrides.deploy_dist;
        self
    }

    pub fn stage_options(&self) -> StageOptions {
        StageOptions {
            template_dir: Some(self.template_folder.clone()),
            staging_dir: self.dist_folder.clone(),
        }
    }
}

/// Parse `--additional-fields`; the value must be a JSON object.
pub fn parse_additional_fields(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(format!("expected a JSON object, got {}", other)),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}
