use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::lifecycle::poller::PollerSettings;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Template locations used by "new document"
    #[serde(default)]
    pub templates: TemplateConfig,

    /// Publish transport and status polling
    #[serde(default)]
    pub publish: PublishConfig,

    /// Mimetype the file picker is restricted to
    #[serde(default = "default_native_mimetype")]
    pub native_mimetype: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where blank and named templates are loaded from
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TemplateConfig {
    // @field: Template loaded when the editor would otherwise be empty
    #[serde(default = "default_blank_template_url")]
    pub blank_template_url: String,

    // @field: Directory relative template URLs are resolved against
    #[serde(default)]
    pub template_root: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            blank_template_url: default_blank_template_url(),
            template_root: None,
        }
    }
}

/// Publish server and poller settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PublishConfig {
    // @field: Base URL of the publish task server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    // @field: Timeout of each publish server request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Delay between two status queries
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // @field: Optional budget of status queries, unlimited when absent
    #[serde(default)]
    pub max_polls: Option<u32>,

    // @field: Delay before the informational panel shows, disabled when absent
    #[serde(default = "default_info_panel_delay_ms")]
    pub info_panel_delay_ms: Option<u64>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: None,
            info_panel_delay_ms: default_info_panel_delay_ms(),
        }
    }
}

impl PublishConfig {
    /// Poller settings derived from this configuration
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_polls: self.max_polls,
            info_panel_delay: self.info_panel_delay_ms.map(Duration::from_millis),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_native_mimetype() -> String {
    "text/html".to_string()
}

fn default_blank_template_url() -> String {
    "templates/blank/desktop/editable.html".to_string()
}

fn default_server_url() -> String {
    "http://localhost:6805".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_info_panel_delay_ms() -> Option<u64> {
    Some(2000)
}

impl Config {
    /// Load the configuration file, or write a default one when it does not exist yet
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.templates.blank_template_url.trim().is_empty() {
            return Err(anyhow!("A blank template URL is required"));
        }

        if self.native_mimetype.trim().is_empty() {
            return Err(anyhow!("The native mimetype must not be empty"));
        }

        url::Url::parse(&self.publish.server_url)
            .map_err(|e| anyhow!("Invalid publish server URL '{}': {}", self.publish.server_url, e))?;

        if self.publish.timeout_secs == 0 {
            return Err(anyhow!("Publish request timeout must be greater than zero"));
        }

        if self.publish.poll_interval_ms == 0 {
            return Err(anyhow!("Publish poll interval must be greater than zero"));
        }

        if self.publish.max_polls == Some(0) {
            return Err(anyhow!("Publish poll budget must allow at least one query"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            templates: TemplateConfig::default(),
            publish: PublishConfig::default(),
            native_mimetype: default_native_mimetype(),
            log_level: LogLevel::default(),
        }
    }
}
