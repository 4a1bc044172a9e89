//! Text extraction from deployment archives.
//!
//! Only members with an allow-listed extension are read. Members over the
//! per-entry cap, members that would push the package over the aggregate
//! cap, binary-looking members and members that are not valid UTF-8 are
//! skipped whole, never truncated.

use crate::config::AnalysisConfig;
use crate::core::Result;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use tracing::debug;

/// Bytes inspected by the binary heuristic.
const BINARY_SNIFF_BYTES: usize = 1024;

/// One decoded member of a deployment package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: String,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Caps applied while reading members.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
    pub max_entries: usize,
    pub extensions: HashSet<String>,
}

impl ExtractionLimits {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            max_entry_bytes: config.max_entry_bytes,
            max_total_bytes: config.max_total_bytes,
            max_entries: config.max_entries,
            extensions: config
                .text_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn allows(&self, path: &str) -> bool {
        entry_extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Why members were left out, for debug logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub members: usize,
    pub extracted: usize,
    pub skipped_extension: usize,
    pub skipped_size: usize,
    pub skipped_binary: usize,
    pub skipped_decode: usize,
    pub bytes_read: u64,
}

/// Lowercased extension of a member's file name.
///
/// Dotfiles such as `.env` use the name after the dot.
pub fn entry_extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Archiver and OS droppings that never contain code.
pub fn is_os_metadata(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    path.starts_with("__MACOSX/")
        || path.contains("/__MACOSX/")
        || file_name == ".DS_Store"
        || file_name == "Thumbs.db"
        || file_name == "desktop.ini"
        || file_name.starts_with("._")
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0)
}

/// Open a zip archive and decode its text members.
///
/// Fails only when the archive itself cannot be opened; problems with
/// individual members are skipped.
pub fn extract_text_entries(
    bytes: &[u8],
    limits: &ExtractionLimits,
) -> Result<(Vec<ArchiveEntry>, ExtractionStats)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut stats = ExtractionStats {
        members: archive.len(),
        ..Default::default()
    };
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        if entries.len() >= limits.max_entries {
            debug!(cap = limits.max_entries, "Entry count cap reached");
            break;
        }

        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(e) => {
                debug!(index = i, error = %e, "Unreadable archive member");
                continue;
            }
        };

        let path = file.name().to_string();
        if file.is_dir() || is_os_metadata(&path) {
            continue;
        }
        if !limits.allows(&path) {
            stats.skipped_extension += 1;
            continue;
        }

        let declared = file.size();
        if declared > limits.max_entry_bytes
            || stats.bytes_read + declared > limits.max_total_bytes
        {
            stats.skipped_size += 1;
            continue;
        }

        let mut buffer = Vec::with_capacity(declared as usize);
        if let Err(e) = (&mut file)
            .take(limits.max_entry_bytes + 1)
            .read_to_end(&mut buffer)
        {
            debug!(path = %path, error = %e, "Failed to read archive member");
            continue;
        }

        let actual = buffer.len() as u64;
        if actual > limits.max_entry_bytes || stats.bytes_read + actual > limits.max_total_bytes {
            stats.skipped_size += 1;
            continue;
        }
        stats.bytes_read += actual;

        if looks_binary(&buffer) {
            stats.skipped_binary += 1;
            continue;
        }

        match String::from_utf8(buffer) {
            Ok(content) => {
                stats.extracted += 1;
                entries.push(ArchiveEntry { path, content });
            }
            Err(_) => stats.skipped_decode += 1,
        }
    }

    Ok((entries, stats))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    /// Build an in-memory zip from `(path, bytes)` members.
    pub fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (path, bytes) in members {
            if path.ends_with('/') {
                writer.add_directory(*path, options).unwrap();
            } else {
                writer.start_file(*path, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }
}
