// Test utility module for lambdamap integration tests
#![allow(dead_code)]

use lambdamap::discovery::{FunctionCatalog, IdentityProvider, PackageSource, Page};
use lambdamap::{
    CallerIdentity, Error, EventSourceMapping, FunctionAlias, FunctionDescriptor, Result,
};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-east-1";

pub fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:{REGION}:{ACCOUNT}:function:{name}")
}

pub fn queue_arn(name: &str) -> String {
    format!("arn:aws:sqs:{REGION}:{ACCOUNT}:{name}")
}

pub fn function(name: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name, function_arn(name))
}

pub fn mapping(uuid: &str, source: &str, qualifier: &str) -> EventSourceMapping {
    EventSourceMapping {
        uuid: Some(uuid.to_string()),
        event_source_arn: Some(source.to_string()),
        function_arn: Some(qualifier.to_string()),
        ..Default::default()
    }
}

pub fn alias(function: &str, name: &str, version: &str) -> FunctionAlias {
    FunctionAlias {
        name: name.to_string(),
        alias_arn: format!("{}:{}", function_arn(function), name),
        function_version: Some(version.to_string()),
    }
}

/// In-memory control plane with failure injection.
#[derive(Debug, Default)]
pub struct FakeCloud {
    pub identity_error: Option<String>,
    pub listing_error: Option<String>,
    pub functions: Vec<FunctionDescriptor>,
    pub page_size: usize,
    pub aliases: HashMap<String, Vec<FunctionAlias>>,
    pub mappings: Vec<EventSourceMapping>,
    pub failing_qualifiers: HashSet<String>,
    pub packages: HashMap<String, Vec<u8>>,
    pub failing_downloads: HashSet<String>,
}

impl FakeCloud {
    pub fn with_functions(names: &[&str]) -> Self {
        Self {
            functions: names.iter().map(|n| function(n)).collect(),
            page_size: 1,
            ..Default::default()
        }
    }

    pub fn with_package(mut self, name: &str, members: &[(&str, &[u8])]) -> Self {
        self.packages.insert(function_arn(name), build_zip(members));
        self
    }

    pub fn with_raw_package(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.packages.insert(function_arn(name), bytes);
        self
    }
}

fn page<T: Clone>(items: &[T], marker: Option<&str>, size: usize) -> Page<T> {
    let start = marker.and_then(|m| m.parse::<usize>().ok()).unwrap_or(0);
    let end = (start + size.max(1)).min(items.len());
    Page {
        items: items[start.min(end)..end].to_vec(),
        next_marker: (end < items.len()).then(|| end.to_string()),
    }
}

impl IdentityProvider for FakeCloud {
    fn resolve_identity(&self) -> Result<CallerIdentity> {
        match &self.identity_error {
            Some(message) => Err(Error::provider("GetCallerIdentity", message.clone())),
            None => Ok(CallerIdentity {
                account: ACCOUNT.to_string(),
                arn: format!("arn:aws:iam::{ACCOUNT}:user/tester"),
                region: REGION.to_string(),
            }),
        }
    }
}

impl FunctionCatalog for FakeCloud {
    fn list_functions(&self, marker: Option<&str>) -> Result<Page<FunctionDescriptor>> {
        if let Some(message) = &self.listing_error {
            return Err(Error::provider("ListFunctions", message.clone()));
        }
        Ok(page(&self.functions, marker, self.page_size))
    }

    fn list_aliases(
        &self,
        function_name: &str,
        marker: Option<&str>,
    ) -> Result<Page<FunctionAlias>> {
        let aliases = self.aliases.get(function_name).cloned().unwrap_or_default();
        Ok(page(&aliases, marker, self.page_size))
    }

    fn list_event_source_mappings(
        &self,
        function_qualifier: &str,
        marker: Option<&str>,
    ) -> Result<Page<EventSourceMapping>> {
        if self.failing_qualifiers.contains(function_qualifier) {
            return Err(Error::provider("ListEventSourceMappings", "throttled"));
        }
        let matching: Vec<_> = self
            .mappings
            .iter()
            .filter(|m| m.function_arn.as_deref() == Some(function_qualifier))
            .cloned()
            .collect();
        Ok(page(&matching, marker, self.page_size))
    }
}

impl PackageSource for FakeCloud {
    fn package_location(&self, function_arn: &str) -> Result<Option<String>> {
        Ok(self
            .packages
            .contains_key(function_arn)
            .then(|| format!("mem://{function_arn}")))
    }

    fn download_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let key = url.trim_start_matches("mem://");
        if self.failing_downloads.contains(key) {
            return Err(Error::download(url, "connection reset"));
        }
        self.packages
            .get(key)
            .cloned()
            .ok_or_else(|| Error::download(url, "not found"))
    }
}

/// Build a deflated zip archive in memory.
pub fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write a file into a temp directory, creating parents.
pub fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
