//! File-backed collaborators.
//!
//! An inventory is a JSON snapshot of a region's function metadata in the
//! control plane's own shape:
//!
//! ```json
//! {
//!   "Identity": {"Account": "123456789012", "Arn": "...", "Region": "us-east-1"},
//!   "Functions": [
//!     {"FunctionName": "orders", "FunctionArn": "...", "Aliases": [], "CodeLocation": "pkg/orders.zip"}
//!   ],
//!   "EventSourceMappings": [{"UUID": "...", "EventSourceArn": "...", "FunctionArn": "..."}]
//! }
//! ```
//!
//! Listings are served in pages of a configurable size so the pagination
//! path is exercised exactly as against a live service.

use super::provider::{FunctionCatalog, IdentityProvider, Page, PackageSource};
use crate::core::{
    CallerIdentity, Error, EventSourceMapping, FunctionAlias, FunctionDescriptor, Result,
    ResultExt,
};
use crate::package::PackageDownloader;
use crate::package::fetch::local_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InventoryFunction {
    #[serde(flatten)]
    pub descriptor: FunctionDescriptor,
    pub aliases: Vec<FunctionAlias>,
    /// URL or path of the deployment package.
    pub code_location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Inventory {
    pub identity: Option<CallerIdentity>,
    pub functions: Vec<InventoryFunction>,
    pub event_source_mappings: Vec<EventSourceMapping>,
}

impl Inventory {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Identity and function catalog served from an [`Inventory`].
#[derive(Debug, Clone)]
pub struct InventoryCatalog {
    inventory: Inventory,
    page_size: usize,
    base_dir: Option<PathBuf>,
}

impl InventoryCatalog {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            page_size: DEFAULT_PAGE_SIZE,
            base_dir: None,
        }
    }

    /// Load an inventory file; relative package paths resolve against its
    /// directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("reading inventory {}", path.display()))?;
        let inventory =
            Inventory::from_json(&contents).context(format!("parsing inventory {}", path.display()))?;
        log::debug!(
            "Loaded inventory {} with {} functions",
            path.display(),
            inventory.functions.len()
        );
        Ok(Self {
            inventory,
            page_size: DEFAULT_PAGE_SIZE,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn function_by_name(&self, name: &str) -> Option<&InventoryFunction> {
        self.inventory
            .functions
            .iter()
            .find(|f| f.descriptor.function_name == name)
    }

    fn function_by_arn(&self, arn: &str) -> Option<&InventoryFunction> {
        self.inventory
            .functions
            .iter()
            .find(|f| f.descriptor.function_arn == arn)
    }

    /// Package location with relative paths anchored at the inventory file.
    pub fn code_location(&self, function_arn: &str) -> Option<String> {
        let location = self.function_by_arn(function_arn)?.code_location.clone()?;
        match (local_path(&location), &self.base_dir) {
            (Some(path), Some(base)) if path.is_relative() && !location.starts_with("file://") => {
                Some(base.join(path).to_string_lossy().into_owned())
            }
            _ => Some(location),
        }
    }
}

/// Serve `items` in pages; markers are decimal offsets.
fn page_of<T: Clone>(
    items: &[T],
    marker: Option<&str>,
    page_size: usize,
    operation: &str,
) -> Result<Page<T>> {
    let start = match marker {
        None => 0,
        Some(m) => m
            .parse::<usize>()
            .map_err(|_| Error::provider(operation, format!("invalid marker {m:?}")))?,
    };
    let end = start.saturating_add(page_size).min(items.len());
    let page = items.get(start..end).unwrap_or_default().to_vec();
    let next_marker = (end < items.len()).then(|| end.to_string());
    Ok(Page {
        items: page,
        next_marker,
    })
}

impl IdentityProvider for InventoryCatalog {
    fn resolve_identity(&self) -> Result<CallerIdentity> {
        self.inventory
            .identity
            .clone()
            .ok_or_else(|| Error::provider("GetCallerIdentity", "inventory has no Identity section"))
    }
}

impl FunctionCatalog for InventoryCatalog {
    fn list_functions(&self, marker: Option<&str>) -> Result<Page<FunctionDescriptor>> {
        let descriptors: Vec<FunctionDescriptor> = self
            .inventory
            .functions
            .iter()
            .map(|f| f.descriptor.clone())
            .collect();
        page_of(&descriptors, marker, self.page_size, "ListFunctions")
    }

    fn list_aliases(
        &self,
        function_name: &str,
        marker: Option<&str>,
    ) -> Result<Page<FunctionAlias>> {
        let function = self.function_by_name(function_name).ok_or_else(|| {
            Error::provider("ListAliases", format!("function not found: {function_name}"))
        })?;
        page_of(&function.aliases, marker, self.page_size, "ListAliases")
    }

    fn list_event_source_mappings(
        &self,
        function_qualifier: &str,
        marker: Option<&str>,
    ) -> Result<Page<EventSourceMapping>> {
        let mappings: Vec<EventSourceMapping> = self
            .inventory
            .event_source_mappings
            .iter()
            .filter(|m| m.function_arn.as_deref() == Some(function_qualifier))
            .cloned()
            .collect();
        page_of(&mappings, marker, self.page_size, "ListEventSourceMappings")
    }
}

/// Package source reading locations from an inventory and fetching them
/// with a [`PackageDownloader`].
pub struct InventoryPackages<'a> {
    catalog: &'a InventoryCatalog,
    downloader: PackageDownloader,
}

impl<'a> InventoryPackages<'a> {
    pub fn new(catalog: &'a InventoryCatalog, downloader: PackageDownloader) -> Self {
        Self {
            catalog,
            downloader,
        }
    }
}

impl PackageSource for InventoryPackages<'_> {
    fn package_location(&self, function_arn: &str) -> Result<Option<String>> {
        Ok(self.catalog.code_location(function_arn))
    }

    fn download_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.downloader.download(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::provider::collect_pages;
    use indoc::indoc;

    const INVENTORY: &str = indoc! {r#"
        {
          "Identity": {"Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ops", "Region": "us-east-1"},
          "Functions": [
            {"FunctionName": "a", "FunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:a",
             "Aliases": [{"Name": "live", "AliasArn": "arn:aws:lambda:us-east-1:123456789012:function:a:live", "FunctionVersion": "3"}],
             "CodeLocation": "packages/a.zip"},
            {"FunctionName": "b", "FunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:b",
             "CodeLocation": "https://example.com/b.zip?sig=1"},
            {"FunctionName": "c", "FunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:c"}
          ],
          "EventSourceMappings": [
            {"UUID": "m1", "EventSourceArn": "arn:aws:sqs:us-east-1:123456789012:jobs",
             "FunctionArn": "arn:aws:lambda:us-east-1:123456789012:function:a:live"}
          ]
        }
    "#};

    fn catalog() -> InventoryCatalog {
        InventoryCatalog::new(Inventory::from_json(INVENTORY).unwrap()).with_page_size(2)
    }

    #[test]
    fn test_functions_are_paginated() {
        let catalog = catalog();
        let first = catalog.list_functions(None).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_marker.as_deref(), Some("2"));

        let all = collect_pages(|m| catalog.list_functions(m)).unwrap();
        let names: Vec<_> = all.iter().map(|f| f.function_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mappings_filtered_by_qualifier() {
        let catalog = catalog();
        let unqualified = catalog
            .list_event_source_mappings("arn:aws:lambda:us-east-1:123456789012:function:a", None)
            .unwrap();
        assert!(unqualified.items.is_empty());

        let alias = catalog
            .list_event_source_mappings(
                "arn:aws:lambda:us-east-1:123456789012:function:a:live",
                None,
            )
            .unwrap();
        assert_eq!(alias.items.len(), 1);
    }

    #[test]
    fn test_aliases_and_unknown_function() {
        let catalog = catalog();
        assert_eq!(catalog.list_aliases("a", None).unwrap().items.len(), 1);
        assert!(catalog.list_aliases("zzz", None).is_err());
    }

    #[test]
    fn test_invalid_marker_is_provider_error() {
        assert!(matches!(
            catalog().list_functions(Some("not-a-number")),
            Err(Error::Provider { .. })
        ));
    }

    #[test]
    fn test_marker_past_the_end_yields_empty_page() {
        let marker = usize::MAX.to_string();
        let page = catalog().list_functions(Some(&marker)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_marker, None);
    }

    #[test]
    fn test_huge_page_size_returns_everything() {
        let catalog = catalog().with_page_size(usize::MAX);
        let second = catalog.list_functions(Some("1")).unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.next_marker, None);
    }

    #[test]
    fn test_code_location_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, INVENTORY).unwrap();
        let catalog = InventoryCatalog::from_path(&path).unwrap();

        assert_eq!(
            catalog.code_location("arn:aws:lambda:us-east-1:123456789012:function:a"),
            Some(dir.path().join("packages/a.zip").to_string_lossy().into_owned())
        );
        assert_eq!(
            catalog.code_location("arn:aws:lambda:us-east-1:123456789012:function:b"),
            Some("https://example.com/b.zip?sig=1".to_string())
        );
        assert_eq!(
            catalog.code_location("arn:aws:lambda:us-east-1:123456789012:function:c"),
            None
        );
    }

    #[test]
    fn test_missing_identity() {
        let catalog = InventoryCatalog::new(Inventory::default());
        assert!(catalog.resolve_identity().is_err());
    }
}
