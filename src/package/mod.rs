//! Static analysis of deployment packages.
//!
//! Per function: look up the package location, download it, extract text
//! members, run the invocation and service-usage passes, then resolve the
//! findings into graph nodes and edges.

pub mod archive;
pub mod fetch;
pub mod patterns;
pub mod resolve;
pub mod scanner;

pub use archive::{extract_text_entries, ArchiveEntry, ExtractionLimits, ExtractionStats};
pub use fetch::PackageDownloader;
pub use patterns::{PatternCatalog, ResourceKind};
pub use resolve::{apply_findings, ResolutionContext, ResolutionStats};
pub use scanner::{extract_invocation_targets, extract_service_hints, InvocationTarget, ServiceHint};

use crate::config::AnalysisConfig;
use crate::core::{FunctionDescriptor, Result, ResultExt};
use crate::discovery::provider::PackageSource;
use crate::topology::{FunctionIndex, GraphStore};
use tracing::debug;

/// What one package contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// `false` when the function has no downloadable package.
    pub package_found: bool,
    pub entries_scanned: usize,
    pub invocation_targets: usize,
    pub service_hints: usize,
    pub invocations_added: usize,
    pub usages_added: usize,
}

pub struct PackageAnalyzer {
    catalog: PatternCatalog,
    limits: ExtractionLimits,
}

impl PackageAnalyzer {
    pub fn new(catalog: PatternCatalog, config: &AnalysisConfig) -> Self {
        Self {
            catalog,
            limits: ExtractionLimits::from_config(config),
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Scan an already-downloaded archive.
    pub fn analyze_bytes(
        &self,
        bytes: &[u8],
        function: &FunctionDescriptor,
        index: &FunctionIndex,
        store: &mut GraphStore,
    ) -> Result<PackageReport> {
        let (entries, stats) = extract_text_entries(bytes, &self.limits)
            .context(format!("opening package of {}", function.function_name))?;
        debug!(
            function = %function.function_name,
            members = stats.members,
            extracted = stats.extracted,
            skipped_size = stats.skipped_size,
            skipped_binary = stats.skipped_binary,
            "Extracted package"
        );

        let targets = extract_invocation_targets(&entries, &self.catalog);
        let hints = extract_service_hints(&entries, &self.catalog);
        let ctx = ResolutionContext::new(function, index);
        let resolved = apply_findings(store, &ctx, &targets, &hints);

        Ok(PackageReport {
            package_found: true,
            entries_scanned: entries.len(),
            invocation_targets: targets.len(),
            service_hints: hints.len(),
            invocations_added: resolved.invocations,
            usages_added: resolved.usages,
        })
    }

    /// Locate, download and scan one function's package.
    pub fn analyze_function(
        &self,
        function: &FunctionDescriptor,
        source: &dyn PackageSource,
        index: &FunctionIndex,
        store: &mut GraphStore,
    ) -> Result<PackageReport> {
        let Some(location) = source.package_location(&function.function_arn)? else {
            debug!(function = %function.function_name, "No deployment package");
            return Ok(PackageReport::default());
        };

        let bytes = source.download_bytes(&location)?;
        self.analyze_bytes(&bytes, function, index, store)
    }
}
