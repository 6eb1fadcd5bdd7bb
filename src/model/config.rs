use serde::{Deserialize, Serialize};

/// Configuration from settings.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ids: IdConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the todo resource (without the `/todos` suffix)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Number of tasks fetched on load
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Owner id sent with newly created tasks
    #[serde(default = "default_user_id")]
    pub user_id: u64,
    /// Per-request limit in seconds; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: default_base_url(),
            page_size: default_page_size(),
            user_id: default_user_id(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConfig {
    /// Ids strictly above this value never reach the gateway
    #[serde(default = "default_local_threshold")]
    pub local_threshold: u64,
}

impl Default for IdConfig {
    fn default() -> Self {
        IdConfig {
            local_threshold: default_local_threshold(),
        }
    }
}

fn default_base_url() -> String {
    "https://dummyjson.com".to_string()
}

fn default_page_size() -> usize {
    30
}

fn default_user_id() -> u64 {
    1
}

/// The demo backend holds 150 records; anything above was never stored there.
fn default_local_threshold() -> u64 {
    150
}
