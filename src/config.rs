// src/config.rs

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.fieldops.example.com/api/v1";
pub const DEFAULT_STATE_DIR: &str = "./fieldops_state";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ASSIGNMENT_CACHE_TTL_SECS: u64 = 5 * 60; // 5 minutes

/// Environment configuration, read with the `FIELDOPS_` prefix
/// (e.g. `FIELDOPS_BASE_URL`). Every field has a default so the CLI runs
/// with nothing but a `.env` or bare environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_assignment_cache_ttl_secs")]
    pub assignment_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FIELDOPS_").from_env()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_assignment_cache_ttl_secs() -> u64 {
    DEFAULT_ASSIGNMENT_CACHE_TTL_SECS
}
