use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CaptureError, Result};

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Interface to capture on; the highest-priority device when unset
    #[serde(default)]
    pub interface: Option<String>,

    /// BPF filter expression; blank or unset means no filter
    #[serde(default)]
    pub filter: Option<String>,

    /// Snapshot length in bytes
    #[serde(default = "default_snaplen")]
    pub snaplen: i32,

    /// Read timeout in milliseconds; also the stop-check granularity
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i32,

    /// Capture in promiscuous mode
    #[serde(default = "default_true")]
    pub promiscuous: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            filter: None,
            snaplen: default_snaplen(),
            timeout_ms: default_timeout_ms(),
            promiscuous: true,
        }
    }
}

impl CaptureConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: CaptureConfig = toml::from_str(&content).map_err(|e| {
            CaptureError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Ok(config)
    }
}

// Default value functions
fn default_snaplen() -> i32 {
    65536
}

fn default_timeout_ms() -> i32 {
    10
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();
        assert_eq!(config.snaplen, 65536);
        assert_eq!(config.timeout_ms, 10);
        assert!(config.promiscuous);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CaptureConfig =
            toml::from_str("interface = \"eth0\"\nfilter = \"tcp port 80\"").unwrap();
        assert_eq!(config.interface.as_deref(), Some("eth0"));
        assert_eq!(config.filter.as_deref(), Some("tcp port 80"));
        assert_eq!(config.snaplen, 65536);
    }

    #[test]
    fn test_config_round_trip() {
        let config = CaptureConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CaptureConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.snaplen, config.snaplen);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = CaptureConfig::load("/nonexistent/packetscope.toml").unwrap_err();
        assert!(matches!(err, CaptureError::Config(_)));
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let path = std::env::temp_dir().join("packetscope-config-test.toml");
        std::fs::write(&path, "snaplen = \"not a number\"").unwrap();
        let err = CaptureConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, CaptureError::Config(_)));
        assert!(err.to_string().contains("failed to parse"));
    }
}
