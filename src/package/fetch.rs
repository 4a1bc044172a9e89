//! Deployment package retrieval.
//!
//! Remote packages come over HTTP(S) with a hard timeout. Local packages
//! (`file://` URLs or plain paths) are read from disk. Either way the
//! absolute size ceiling rejects oversized packages instead of truncating
//! them.

use crate::config::AnalysisConfig;
use crate::core::{Error, Result};
use reqwest::blocking::Client;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const FILE_SCHEME: &str = "file://";

pub struct PackageDownloader {
    client: Client,
    timeout: Duration,
    max_package_bytes: u64,
}

impl PackageDownloader {
    pub fn new(timeout: Duration, max_package_bytes: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lambdamap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_package_bytes,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Self::new(config.download_timeout(), config.max_package_bytes)
    }

    pub fn max_package_bytes(&self) -> u64 {
        self.max_package_bytes
    }

    /// Fetch a package by URL or local path.
    pub fn download(&self, location: &str) -> Result<Vec<u8>> {
        match local_path(location) {
            Some(path) => self.read_local(path),
            None => self.fetch_remote(location),
        }
    }

    fn read_local(&self, path: PathBuf) -> Result<Vec<u8>> {
        let display = path.display().to_string();
        let file = File::open(&path)
            .map_err(|e| Error::download(&display, e.to_string()))?;
        let size = file.metadata()?.len();
        if size > self.max_package_bytes {
            return Err(Error::PackageTooLarge {
                size,
                limit: self.max_package_bytes,
            });
        }
        read_capped(file, self.max_package_bytes)
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let shown = redact_url(url);
        debug!(url = %shown, "Downloading package");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| self.transport_error(&shown, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(shown, format!("HTTP status {status}")));
        }

        if let Some(size) = response.content_length() {
            if size > self.max_package_bytes {
                return Err(Error::PackageTooLarge {
                    size,
                    limit: self.max_package_bytes,
                });
            }
        }

        read_capped(response, self.max_package_bytes)
    }

    fn transport_error(&self, url: &str, error: reqwest::Error) -> Error {
        let reason = if error.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs())
        } else {
            error.without_url().to_string()
        };
        Error::download(url, reason)
    }
}

/// Read at most `limit` bytes, failing if the source holds more.
pub fn read_capped<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buffer)?;
    let size = buffer.len() as u64;
    if size > limit {
        return Err(Error::PackageTooLarge { size, limit });
    }
    Ok(buffer)
}

/// Local path for `file://` URLs and scheme-less locations.
pub fn local_path(location: &str) -> Option<PathBuf> {
    if let Some(rest) = location.strip_prefix(FILE_SCHEME) {
        return Some(PathBuf::from(rest));
    }
    if location.contains("://") {
        return None;
    }
    Some(PathBuf::from(location))
}

/// Drop the query string; presigned URLs carry credentials there.
pub fn redact_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?…"),
        None => url.to_string(),
    }
}
