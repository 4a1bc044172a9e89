use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Code package analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Download and scan deployment packages
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hard timeout for one package download
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Packages larger than this are rejected, never truncated
    #[serde(default = "default_max_package_bytes")]
    pub max_package_bytes: u64,

    /// Per-entry cap; larger members are skipped
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,

    /// Aggregate cap across all scanned members of one package
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,

    /// Maximum number of members scanned per package
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// File extensions (without the dot) treated as text
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            download_timeout_secs: default_download_timeout_secs(),
            max_package_bytes: default_max_package_bytes(),
            max_entry_bytes: default_max_entry_bytes(),
            max_total_bytes: default_max_total_bytes(),
            max_entries: default_max_entries(),
            text_extensions: default_text_extensions(),
        }
    }
}

impl AnalysisConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

pub fn default_enabled() -> bool {
    true
}

pub fn default_download_timeout_secs() -> u64 {
    30
}

pub fn default_max_package_bytes() -> u64 {
    50 * 1024 * 1024
}

pub fn default_max_entry_bytes() -> u64 {
    1024 * 1024
}

pub fn default_max_total_bytes() -> u64 {
    20 * 1024 * 1024
}

pub fn default_max_entries() -> usize {
    5000
}

pub fn default_text_extensions() -> Vec<String> {
    [
        "js", "mjs", "cjs", "ts", "mts", "cts", "jsx", "tsx", "py", "rb", "java", "kt", "go", "cs",
        "php", "json", "yaml", "yml", "toml", "txt", "env", "properties", "xml", "ini", "cfg", "sh",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}
