//! Layered configuration for setsync.
//!
//! Values are resolved in order, each layer overriding the last:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. An optional configuration file; TOML, YAML or JSON chosen by extension.
//! 3. Environment variables prefixed with `SETSYNC_`, using `__` to reach
//!    nested keys (`SETSYNC_QUEUE__CONCURRENCY=8`).

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "SETSYNC_";
const DEFAULT_SNAPSHOT_FILENAME: &str = "online.db";
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the snapshot and its temporary files.
    pub storage_dir: PathBuf,
    pub snapshot: SnapshotConfig,
    pub queue: QueueConfig,
    pub online: OnlineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub filename: String,
    /// Where to download a compressed snapshot from when none exists locally.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of resolutions (and therefore online lookups) allowed at once.
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineConfig {
    /// Lookup endpoint root. Without one, lookups are permanently offline.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            snapshot: SnapshotConfig::default(),
            queue: QueueConfig::default(),
            online: OnlineConfig::default(),
        }
    }
}
impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_SNAPSHOT_FILENAME.to_string(),
            url: None,
        }
    }
}
impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "setsync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Load`] if the file is missing or unreadable, or any
    ///   layer fails to parse.
    /// - [`ErrorKind::Invalid`] if the merged values fail validation.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(file)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Defaults merged with an optional file; the environment is not included.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let Some(path) = file else {
            return Ok(figment);
        };
        // Figment treats a missing file as an empty layer; an explicitly
        // requested file has to exist.
        if !path.is_file() {
            exn::bail!(ErrorKind::Load);
        }
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        Ok(match extension.to_ascii_lowercase().as_str() {
            "toml" => figment.merge(Toml::file_exact(path)),
            "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
            "json" => figment.merge(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::Invalid("config file extension")),
        })
    }

    /// Extract and validate a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(config = ?config, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("queue.concurrency"));
        }
        if self.snapshot.filename.is_empty() || Path::new(&self.snapshot.filename).file_name().is_none() {
            exn::bail!(ErrorKind::Invalid("snapshot.filename"));
        }
        if self.online.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("online.timeout_secs"));
        }
        Ok(())
    }

    /// Final location of the local snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage_dir.join(&self.snapshot.filename)
    }

    pub fn online_timeout(&self) -> Duration {
        Duration::from_secs(self.online.timeout_secs)
    }
}
