//! Configuration validation with error accumulation.
//!
//! Every rule is checked so a user sees all problems with a config file in
//! one run instead of fixing them one at a time.

use super::analysis_config::AnalysisConfig;
use super::layout::LayoutConfig;
use super::LambdamapConfig;
use crate::core::{Error, Result};

/// Collect every validation failure, prefixed with its field path.
pub fn validation_errors(config: &LambdamapConfig) -> Vec<String> {
    let mut errors = analysis_errors(&config.analysis);
    errors.extend(layout_errors(&config.layout));
    errors
}

/// Validate the whole config, failing with all accumulated messages.
pub fn validate_config(config: &LambdamapConfig) -> Result<()> {
    let errors = validation_errors(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::configuration(errors.join("; ")))
    }
}

fn analysis_errors(analysis: &AnalysisConfig) -> Vec<String> {
    let positive = [
        ("analysis.download_timeout_secs", analysis.download_timeout_secs),
        ("analysis.max_package_bytes", analysis.max_package_bytes),
        ("analysis.max_entry_bytes", analysis.max_entry_bytes),
        ("analysis.max_total_bytes", analysis.max_total_bytes),
        ("analysis.max_entries", analysis.max_entries as u64),
    ];

    let mut errors: Vec<String> = positive
        .iter()
        .filter(|(_, value)| *value == 0)
        .map(|(field, _)| format!("{field}: must be greater than 0"))
        .collect();

    if analysis.max_entry_bytes > analysis.max_total_bytes {
        errors.push(format!(
            "analysis.max_entry_bytes: {} exceeds analysis.max_total_bytes ({})",
            analysis.max_entry_bytes, analysis.max_total_bytes
        ));
    }

    if analysis
        .text_extensions
        .iter()
        .any(|ext| ext.trim().is_empty() || ext.contains('/'))
    {
        errors.push("analysis.text_extensions: entries must be non-empty extensions".to_string());
    }

    errors
}

fn layout_errors(layout: &LayoutConfig) -> Vec<String> {
    [
        ("layout.layer_spacing", layout.layer_spacing),
        ("layout.node_spacing", layout.node_spacing),
        ("layout.min_separation", layout.min_separation),
    ]
    .iter()
    .filter(|(_, value)| !value.is_finite() || *value <= 0.0)
    .map(|(field, value)| format!("{field}: expected a positive finite number, got {value}"))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LambdamapConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_accumulated() {
        let mut config = LambdamapConfig::default();
        config.analysis.max_entries = 0;
        config.analysis.max_entry_bytes = config.analysis.max_total_bytes + 1;
        config.layout.node_spacing = f64::NAN;

        let errors = validation_errors(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("analysis.max_entries"));
        assert!(errors[1].starts_with("analysis.max_entry_bytes"));
        assert!(errors[2].starts_with("layout.node_spacing"));
    }

    #[test]
    fn test_validate_config_joins_messages() {
        let mut config = LambdamapConfig::default();
        config.layout.layer_spacing = -1.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("layout.layer_spacing"));
    }
}
