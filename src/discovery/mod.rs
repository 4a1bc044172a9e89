//! Discovery run driver.
//!
//! A run authenticates, lists every function, then processes functions one
//! at a time: metadata relations first, then code package analysis. Only
//! authentication failure, listing failure and an empty fleet abort the
//! run; everything else degrades to warnings.

pub mod inventory;
pub mod provider;

pub use inventory::{Inventory, InventoryCatalog, InventoryFunction, InventoryPackages};
pub use provider::{collect_pages, FunctionCatalog, IdentityProvider, Page, PackageSource};

use crate::config::AnalysisConfig;
use crate::core::{CallerIdentity, FunctionDescriptor};
use crate::observability::{
    increment_processed, set_current_function, set_phase, set_progress, DiscoveryPhase,
};
use crate::package::{PackageAnalyzer, PatternCatalog};
use crate::topology::metadata::function_node;
use crate::topology::{FunctionIndex, Graph, GraphStore, MetadataExtractor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failure,
}

/// Outcome of one phase of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStep {
    pub action: String,
    pub status: StepStatus,
    pub message: String,
}

impl ValidationStep {
    pub fn success(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            status: StepStatus::Success,
            message: message.into(),
        }
    }

    pub fn failure(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            status: StepStatus::Failure,
            message: message.into(),
        }
    }

    /// Failure only when every attempt of the phase failed.
    fn from_counts(
        action: &str,
        attempts: usize,
        failures: usize,
        message: impl Into<String>,
    ) -> Self {
        if attempts > 0 && failures == attempts {
            Self::failure(action, message)
        } else {
            Self::success(action, message)
        }
    }
}

pub const AUTHENTICATION_STEP: &str = "Authentication";
pub const RESOURCE_DISCOVERY_STEP: &str = "Resource discovery";
pub const CODE_ANALYSIS_STEP: &str = "Code analysis";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<CallerIdentity>,
    pub graph: Graph,
    pub steps: Vec<ValidationStep>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl DiscoveryResult {
    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }

    fn fatal(
        identity: Option<CallerIdentity>,
        mut steps: Vec<ValidationStep>,
        action: &str,
        message: String,
    ) -> Self {
        warn!("{}", message);
        steps.push(ValidationStep::failure(action, message.clone()));
        Self {
            identity,
            graph: Graph::default(),
            steps,
            warnings: Vec::new(),
            fatal_error: Some(message),
        }
    }
}

#[derive(Debug, Default)]
struct MetadataTally {
    relations: usize,
    lookups: usize,
    failures: usize,
}

#[derive(Debug, Default)]
struct CodeTally {
    attempts: usize,
    failures: usize,
    without_package: usize,
    invocations: usize,
    usages: usize,
}

pub struct Discoverer<'a> {
    identity: &'a dyn IdentityProvider,
    catalog: &'a dyn FunctionCatalog,
    packages: &'a dyn PackageSource,
    analyzer: PackageAnalyzer,
    analyze_code: bool,
}

impl<'a> Discoverer<'a> {
    pub fn new(
        identity: &'a dyn IdentityProvider,
        catalog: &'a dyn FunctionCatalog,
        packages: &'a dyn PackageSource,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            identity,
            catalog,
            packages,
            analyzer: PackageAnalyzer::new(PatternCatalog::builtin(), config),
            analyze_code: config.enabled,
        }
    }

    /// Replace the built-in scanning rules.
    pub fn with_patterns(mut self, catalog: PatternCatalog, config: &AnalysisConfig) -> Self {
        self.analyzer = PackageAnalyzer::new(catalog, config);
        self
    }

    pub fn discover(&self) -> DiscoveryResult {
        let span = info_span!("discovery");
        let _span = span.enter();
        let mut steps = Vec::new();

        let identity = {
            let _phase = set_phase(DiscoveryPhase::Authentication);
            match self.identity.resolve_identity() {
                Ok(identity) => identity,
                Err(e) => {
                    return DiscoveryResult::fatal(
                        None,
                        steps,
                        AUTHENTICATION_STEP,
                        format!("Failed to resolve credentials: {e}"),
                    )
                }
            }
        };
        info!(account = %identity.account, region = %identity.region, "Authenticated");
        steps.push(ValidationStep::success(
            AUTHENTICATION_STEP,
            format!(
                "Authenticated as {} (account {}, region {})",
                identity.arn, identity.account, identity.region
            ),
        ));

        let _phase = set_phase(DiscoveryPhase::ResourceDiscovery);
        let functions = match collect_pages(|marker| self.catalog.list_functions(marker)) {
            Ok(functions) => functions,
            Err(e) => {
                return DiscoveryResult::fatal(
                    Some(identity),
                    steps,
                    RESOURCE_DISCOVERY_STEP,
                    format!("Failed to list functions: {e}"),
                )
            }
        };
        if functions.is_empty() {
            let region = identity.region.clone();
            return DiscoveryResult::fatal(
                Some(identity),
                steps,
                RESOURCE_DISCOVERY_STEP,
                format!("No functions found in region {region}"),
            );
        }
        info!(functions = functions.len(), "Listed functions");

        let mut store = GraphStore::new();
        let mut warnings = Vec::new();
        for function in &functions {
            if let Err(e) = store.add_node(function_node(function)) {
                warnings.push(format!("Skipping function {}: {}", function.function_name, e));
            }
        }

        let index = FunctionIndex::build(&functions);
        let extractor = MetadataExtractor::new(self.catalog);
        let mut metadata = MetadataTally::default();
        let mut code = CodeTally::default();
        set_progress(0, functions.len());

        for function in &functions {
            let _function = set_current_function(&function.function_name);
            let function_span = info_span!("function", name = %function.function_name);
            let _entered = function_span.enter();

            let report = extractor.extract(function, &mut store);
            metadata.relations += report.relations_added;
            metadata.lookups += report.mapping_lookups;
            metadata.failures += report.mapping_failures;
            warnings.extend(report.warnings);

            if self.analyze_code {
                self.analyze_package(function, &index, &mut store, &mut code, &mut warnings);
            }
            increment_processed();
        }

        steps.push(resource_step(&functions, &store, &metadata));
        if self.analyze_code {
            steps.push(code_step(&code));
        }

        info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            warnings = warnings.len(),
            "Discovery complete"
        );

        DiscoveryResult {
            identity: Some(identity),
            graph: store.into_graph(),
            steps,
            warnings,
            fatal_error: None,
        }
    }

    fn analyze_package(
        &self,
        function: &FunctionDescriptor,
        index: &FunctionIndex,
        store: &mut GraphStore,
        tally: &mut CodeTally,
        warnings: &mut Vec<String>,
    ) {
        let _phase = set_phase(DiscoveryPhase::CodeAnalysis);
        match self
            .analyzer
            .analyze_function(function, self.packages, index, store)
        {
            Ok(report) if report.package_found => {
                tally.attempts += 1;
                tally.invocations += report.invocations_added;
                tally.usages += report.usages_added;
                debug!(
                    entries = report.entries_scanned,
                    invocations = report.invocations_added,
                    usages = report.usages_added,
                    "Analyzed package"
                );
            }
            Ok(_) => tally.without_package += 1,
            Err(e) => {
                tally.attempts += 1;
                tally.failures += 1;
                let message = format!("Code analysis failed for {}: {}", function.function_name, e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }
}

fn resource_step(
    functions: &[FunctionDescriptor],
    store: &GraphStore,
    tally: &MetadataTally,
) -> ValidationStep {
    let mut message = format!(
        "Discovered {} functions, {} nodes and {} relationships ({} from metadata)",
        functions.len(),
        store.node_count(),
        store.edge_count(),
        tally.relations
    );
    if tally.failures > 0 {
        message.push_str(&format!(
            "; {} of {} event source lookups failed",
            tally.failures, tally.lookups
        ));
    }
    ValidationStep::from_counts(RESOURCE_DISCOVERY_STEP, tally.lookups, tally.failures, message)
}

fn code_step(tally: &CodeTally) -> ValidationStep {
    let mut message = format!(
        "Analyzed {} of {} packages: {} invocations and {} service usages inferred",
        tally.attempts - tally.failures,
        tally.attempts,
        tally.invocations,
        tally.usages
    );
    if tally.without_package > 0 {
        message.push_str(&format!("; {} functions had no package", tally.without_package));
    }
    ValidationStep::from_counts(CODE_ANALYSIS_STEP, tally.attempts, tally.failures, message)
}
