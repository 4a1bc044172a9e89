//! Configuration loaded from `.lambdamap.toml`.

pub mod analysis_config;
mod core;
pub mod layout;
mod loader;
pub mod validation;

pub use self::core::{LambdamapConfig, OutputConfig};
pub use analysis_config::AnalysisConfig;
pub use layout::LayoutConfig;
pub use loader::{
    directory_ancestors, discover_config, load_config, load_config_from_path,
    parse_and_validate_config, CONFIG_FILE_NAME,
};
pub use validation::{validate_config, validation_errors};

/// Default configuration rendered as TOML, used by `lambdamap init`.
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&LambdamapConfig::default()).unwrap_or_default()
}
