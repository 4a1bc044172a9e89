//! Collaborator contracts consumed by discovery.
//!
//! The engine never talks to the cloud directly. Identity resolution,
//! metadata listing and package retrieval are capabilities handed in by the
//! caller; [`crate::discovery::inventory`] provides a file-backed
//! implementation.

use crate::core::{
    CallerIdentity, EventSourceMapping, FunctionAlias, FunctionDescriptor, Result,
};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` ends the listing.
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }
}

pub trait IdentityProvider {
    fn resolve_identity(&self) -> Result<CallerIdentity>;
}

pub trait FunctionCatalog {
    fn list_functions(&self, marker: Option<&str>) -> Result<Page<FunctionDescriptor>>;

    fn list_aliases(&self, function_name: &str, marker: Option<&str>)
        -> Result<Page<FunctionAlias>>;

    /// Mappings bound to one function qualifier (unqualified, version or alias ARN).
    fn list_event_source_mappings(
        &self,
        function_qualifier: &str,
        marker: Option<&str>,
    ) -> Result<Page<EventSourceMapping>>;
}

pub trait PackageSource {
    /// Where the function's deployment package can be downloaded from.
    fn package_location(&self, function_arn: &str) -> Result<Option<String>>;

    fn download_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Drain a paginated listing until no continuation token is returned.
///
/// A collaborator that hands back the marker it was just given would loop
/// forever, so a repeated marker also ends the listing.
pub fn collect_pages<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = fetch(marker.as_deref())?;
        items.extend(page.items);

        match page.next_marker.filter(|next| !next.is_empty()) {
            Some(next) if marker.as_deref() == Some(next.as_str()) => {
                log::warn!("Listing returned repeated marker {}; stopping", next);
                break;
            }
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    Ok(items)
}
