//! Review client configuration management

use anyhow::Result;
use nostr::{DEFAULT_BID_MSATS, DEFAULT_REVIEW_PREAMBLE, JOB_TYPE_CODE_REVIEW};
use nostr_client::DEFAULT_RELAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Review client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReviewConfig {
    pub relays: RelaysConfig,
    pub job: JobConfig,
    pub feed: FeedConfig,
    pub diff: DiffConfig,
}

impl ReviewConfig {
    /// Load configuration from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ReviewConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".openagents").join("nostr-review.toml"))
    }
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaysConfig {
    /// List of relay URLs
    pub urls: Vec<String>,
    /// How long `connect` waits before returning, in milliseconds
    pub connect_timeout_ms: u64,
}

impl RelaysConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for RelaysConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect(),
            connect_timeout_ms: 2500,
        }
    }
}

/// Job request configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Value of the `j` tag
    pub job_type: String,
    /// Offered amount in millisats (`bid` tag)
    pub bid_msats: u64,
    /// Text placed before the diff in the request content
    pub preamble: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_type: JOB_TYPE_CODE_REVIEW.to_string(),
            bid_msats: DEFAULT_BID_MSATS,
            preamble: DEFAULT_REVIEW_PREAMBLE.to_string(),
        }
    }
}

/// Response feed configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Oldest entries are evicted past this size (None keeps everything)
    pub max_entries: Option<usize>,
    /// Ignore events whose id is already in the feed
    pub dedupe: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            dedupe: false,
        }
    }
}

/// Diff acquisition configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Revision the working tree is compared against
    pub base: String,
    /// Upper bound on a single `git` invocation, in seconds
    pub timeout_secs: u64,
}

impl DiffConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            base: "HEAD".to_string(),
            timeout_secs: 5,
        }
    }
}
