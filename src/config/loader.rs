use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::LambdamapConfig;
use super::validation::validate_config;
use crate::core::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".lambdamap.toml";

/// Read a config file's contents
pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Pure function to parse and validate config from TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<LambdamapConfig> {
    let config = toml::from_str::<LambdamapConfig>(contents)
        .map_err(|e| Error::configuration(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load an explicitly requested config file; any problem is an error
pub fn load_config_from_path(path: &Path) -> Result<LambdamapConfig> {
    let contents = read_config_file(path).map_err(|e| {
        Error::configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config = parse_and_validate_config(&contents)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Try loading a discovered config file, falling back on any problem
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<LambdamapConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{} in {}. Using defaults.", e, config_path.display());
            Some(LambdamapConfig::default())
        }
    }
}

/// Handle file read errors with appropriate logging
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest config file above `start`
pub fn discover_config(start: PathBuf) -> LambdamapConfig {
    const MAX_TRAVERSAL_DEPTH: usize = 10;

    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            LambdamapConfig::default()
        })
}

pub fn load_config() -> LambdamapConfig {
    match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            LambdamapConfig::default()
        }
    }
}
