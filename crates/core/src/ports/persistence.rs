use crate::app::SortKey;
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load configuration from storage
    fn load(&self) -> Result<ClientConfig>;

    /// Save configuration to storage
    fn save(&self, config: &ClientConfig) -> Result<()>;
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub version: u32,
    pub server_url: String,
    pub default_scan_path: PathBuf,
    pub default_scan_depth: u32,
    /// A channel silent for this long, heartbeats included, counts as dropped.
    /// `0` turns the timeout off.
    pub channel_idle_timeout_secs: Option<u64>,
    pub request_timeout_secs: u64,
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub default_sort: SortKey,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_scan_path: PathBuf::from("code"),
            default_scan_depth: 5,
            channel_idle_timeout_secs: Some(30),
            request_timeout_secs: 30,
            ui: UiConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"server_url": "http://nas:5000"}"#).unwrap();
        assert_eq!(config.server_url, "http://nas:5000");
        assert_eq!(config.default_scan_depth, 5);
        assert_eq!(config.channel_idle_timeout_secs, Some(30));
        assert_eq!(config.ui.default_sort, SortKey::Name);
    }
}
