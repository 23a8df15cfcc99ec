use config::{self, File};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{PublishError, Result};

/// Publisher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherConfig {
    /// Collector address (host:port)
    pub address: String,
    /// Dial timeout in milliseconds
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,
    /// Publish interval in seconds
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,
    /// Fractional digits kept when formatting decimal values
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// Optional prefix applied to every metric name
    #[serde(default)]
    pub prefix: Option<String>,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Default dial timeout
fn default_dial_timeout_ms() -> u64 {
    5_000
}

/// Default publish interval
fn default_publish_interval_secs() -> u64 {
    60
}

/// Default formatting precision
fn default_precision() -> usize {
    2
}

impl PublisherConfig {
    /// Create a configuration with defaults for everything but the address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            dial_timeout_ms: default_dial_timeout_ms(),
            publish_interval_secs: default_publish_interval_secs(),
            precision: default_precision(),
            prefix: None,
            log_level: LogLevel::default(),
        }
    }

    /// Dial timeout as a `Duration`
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Publish interval as a `Duration`
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

/// Load publisher configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PublisherConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    // Check if the file exists
    if !path.exists() {
        error!("Configuration file {} does not exist", path.display());
        return Err(PublishError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        ))
        .into());
    }

    // Get the file extension
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(PublishError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            ))
            .into());
        }
    };

    // Check if the extension is supported and create the appropriate FileFormat
    let format = match extension.as_str() {
        "toml" => config::FileFormat::Toml,
        "json" => config::FileFormat::Json,
        "yaml" | "yml" => config::FileFormat::Yaml,
        format => {
            error!("Unsupported configuration format: {}", format);
            return Err(
                PublishError::Config(format!("Unsupported config format: {}", format)).into(),
            );
        }
    };

    // Build configuration
    let config = config::Config::builder()
        .add_source(File::from(path).format(format))
        .build()
        .map_err(|e| PublishError::Config(e.to_string()))?;

    // Deserialize configuration
    config
        .try_deserialize()
        .map_err(|e| PublishError::Config(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            address = "graphite.internal:2003"
            publish_interval_secs = 30
            prefix = "servers"
        "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.address, "graphite.internal:2003");
        assert_eq!(config.publish_interval(), Duration::from_secs(30));
        assert_eq!(config.prefix.as_deref(), Some("servers"));

        // Unspecified fields fall back to defaults
        assert_eq!(config.dial_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.precision, 2);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = load_config("/nonexistent/carbonlink.toml").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::Config(_))
        ));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let file = Builder::new().suffix(".ini").tempfile().unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::Config(_))
        ));
    }
}
