use serde::{Deserialize, Serialize};

use super::analysis_config::AnalysisConfig;
use super::layout::LayoutConfig;

/// Root configuration structure for lambdamap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LambdamapConfig {
    /// Deployment package analysis
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Fallback layered layout
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Output configuration
    #[serde(default)]
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub default_format: Option<String>,
    /// Enable colored output (default: auto-detect based on TTY)
    #[serde(default)]
    pub use_color: Option<bool>,
}
