//! Relationships derived from function configuration.
//!
//! Every category except event sources is a pure function of the
//! descriptor. Event sources need the mapping listings for each of the
//! function's qualifiers; those lookups degrade to warnings so the remaining
//! categories are still extracted.

use super::arn::{unqualified_function_arn, ResourceIdentifier};
use super::graph::{Edge, GraphStore, NodeCandidate, RelationKind};
use crate::core::{EventSourceMapping, FunctionAlias, FunctionDescriptor};
use crate::discovery::provider::{collect_pages, FunctionCatalog};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const FUNCTION_SERVICE: &str = "Lambda";
pub const ROLE_SERVICE: &str = "IAM";
pub const NETWORK_SERVICE: &str = "VPC";

/// Identifiers embedded anywhere in a configuration value.
static EMBEDDED_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"arn:aws[a-zA-Z-]*:[a-zA-Z0-9-]+:[a-z0-9-]*:[0-9]*:[^\s"',;<>()\[\]{}]+"#)
        .expect("embedded identifier pattern")
});

/// `s3://bucket[/key]` storage URIs; group 1 is the bucket name.
static STORAGE_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:s3)://([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])(?:/[^\s'\x22,;]*)?")
        .expect("storage URI pattern")
});

/// Node for a function itself.
pub fn function_node(function: &FunctionDescriptor) -> NodeCandidate {
    NodeCandidate::new(&function.function_arn)
        .with_label(&function.function_name)
        .with_service(FUNCTION_SERVICE)
}

/// What one function's metadata contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataReport {
    pub relations_added: usize,
    pub mapping_lookups: usize,
    pub mapping_failures: usize,
    pub warnings: Vec<String>,
}

/// Mappings gathered across all qualifiers of one function.
#[derive(Debug, Clone, Default)]
pub struct MappingLookup {
    pub mappings: Vec<EventSourceMapping>,
    pub attempts: usize,
    pub failures: usize,
    pub warnings: Vec<String>,
}

pub struct MetadataExtractor<'a> {
    catalog: &'a dyn FunctionCatalog,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(catalog: &'a dyn FunctionCatalog) -> Self {
        Self { catalog }
    }

    /// Emit every metadata relation of `function` into `store`.
    pub fn extract(&self, function: &FunctionDescriptor, store: &mut GraphStore) -> MetadataReport {
        let source = function.function_arn.as_str();
        if let Err(e) = store.add_node(function_node(function)) {
            warn!(function = %function.function_name, error = %e, "Skipping function without identifier");
            return MetadataReport::default();
        }

        let lookup = self.collect_event_source_mappings(function);

        let relations_added = add_event_sources(source, &lookup.mappings, store)
            + add_dead_letter(function, store)
            + add_role(function, store)
            + add_layers(function, store)
            + add_network(function, store)
            + add_config_refs(function, store)
            + add_file_systems(function, store)
            + add_encryption(function, store)
            + add_destinations(function, &lookup.mappings, store);

        debug!(
            function = %function.function_name,
            relations = relations_added,
            mappings = lookup.mappings.len(),
            "Extracted metadata relations"
        );

        MetadataReport {
            relations_added,
            mapping_lookups: lookup.attempts,
            mapping_failures: lookup.failures,
            warnings: lookup.warnings,
        }
    }

    /// List mappings for every qualifier, deduplicated by mapping identity.
    pub fn collect_event_source_mappings(&self, function: &FunctionDescriptor) -> MappingLookup {
        let mut lookup = MappingLookup::default();

        let aliases = match collect_pages(|marker| {
            self.catalog.list_aliases(&function.function_name, marker)
        }) {
            Ok(aliases) => aliases,
            Err(e) => {
                let message = format!("Failed to list aliases for {}: {}", function.function_name, e);
                warn!("{}", message);
                lookup.warnings.push(message);
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        for qualifier in function_qualifiers(function, &aliases) {
            lookup.attempts += 1;
            let listed = collect_pages(|marker| {
                self.catalog.list_event_source_mappings(&qualifier, marker)
            });

            match listed {
                Ok(mappings) => {
                    for mapping in mappings {
                        if seen.insert(mapping.dedup_key()) {
                            lookup.mappings.push(mapping);
                        }
                    }
                }
                Err(e) => {
                    lookup.failures += 1;
                    let message =
                        format!("Failed to list event source mappings for {}: {}", qualifier, e);
                    warn!("{}", message);
                    lookup.warnings.push(message);
                }
            }
        }

        lookup
    }
}

/// Qualified identifiers under which mappings may be registered, in lookup
/// order: unqualified, published version, each alias, each alias's version.
pub fn function_qualifiers(function: &FunctionDescriptor, aliases: &[FunctionAlias]) -> Vec<String> {
    let base = unqualified_function_arn(&function.function_arn);
    let mut qualifiers = vec![base.clone()];

    if let Some(version) = function.published_version() {
        qualifiers.push(format!("{base}:{version}"));
    }

    for alias in aliases {
        if !alias.alias_arn.is_empty() {
            qualifiers.push(alias.alias_arn.clone());
        } else if !alias.name.is_empty() {
            qualifiers.push(format!("{base}:{}", alias.name));
        }
    }

    for alias in aliases {
        let version = alias
            .function_version
            .as_deref()
            .filter(|v| !v.is_empty() && *v != crate::core::LATEST_VERSION);
        if let Some(version) = version {
            qualifiers.push(format!("{base}:{version}"));
        }
    }

    let mut seen = HashSet::new();
    qualifiers.retain(|q| seen.insert(q.clone()));
    qualifiers
}

fn relate(store: &mut GraphStore, source: &str, candidate: NodeCandidate, kind: RelationKind) -> usize {
    match store.link(source, candidate, kind) {
        Ok(outcome) => usize::from(outcome.is_added()),
        Err(e) => {
            debug!(source, %kind, error = %e, "Relation skipped");
            0
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Mappings point from the event source into the function.
pub fn add_event_sources(
    function_arn: &str,
    mappings: &[EventSourceMapping],
    store: &mut GraphStore,
) -> usize {
    let mut added = 0;
    for mapping in mappings {
        let Some(source_arn) = non_empty(mapping.event_source_arn.as_deref()) else {
            continue;
        };
        if store.add_node(NodeCandidate::new(source_arn)).is_err() {
            continue;
        }
        let outcome = store.add_edge(Edge::new(source_arn, function_arn, RelationKind::EventSource));
        added += usize::from(outcome.is_added());
    }
    added
}

pub fn add_dead_letter(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    let target = function
        .dead_letter_config
        .as_ref()
        .and_then(|dlq| non_empty(dlq.target_arn.as_deref()));
    match target {
        Some(target) => relate(
            store,
            &function.function_arn,
            NodeCandidate::new(target),
            RelationKind::Dlq,
        ),
        None => 0,
    }
}

/// Role nodes are always tagged as identity resources.
pub fn add_role(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    match non_empty(function.role.as_deref()) {
        Some(role) => relate(
            store,
            &function.function_arn,
            NodeCandidate::new(role).with_service(ROLE_SERVICE),
            RelationKind::UsesRole,
        ),
        None => 0,
    }
}

pub fn add_layers(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    function
        .layers
        .iter()
        .filter_map(|layer| non_empty(Some(layer.arn.as_str())))
        .map(|arn| {
            relate(
                store,
                &function.function_arn,
                NodeCandidate::new(arn),
                RelationKind::Layer,
            )
        })
        .sum()
}

pub fn add_network(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    let Some(vpc) = function.vpc_config.as_ref() else {
        return 0;
    };

    let subnets = vpc
        .subnet_ids
        .iter()
        .map(|id| ("subnet", id, RelationKind::Subnet));
    let groups = vpc
        .security_group_ids
        .iter()
        .map(|id| ("securityGroup", id, RelationKind::SecurityGroup));

    subnets
        .chain(groups)
        .filter(|(_, id, _)| !id.trim().is_empty())
        .map(|(kind_prefix, id, kind)| {
            let candidate = NodeCandidate::new(format!("{kind_prefix}:{}", id.trim()))
                .with_label(id.trim())
                .with_service(NETWORK_SERVICE);
            relate(store, &function.function_arn, candidate, kind)
        })
        .sum()
}

/// Identifiers and storage URIs referenced by environment variables.
pub fn config_references(function: &FunctionDescriptor) -> Vec<String> {
    let partition = ResourceIdentifier::parse(&function.function_arn)
        .map(|arn| arn.partition)
        .unwrap_or_else(|| "aws".to_string());
    let own_arn = unqualified_function_arn(&function.function_arn);

    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for (_, value) in function.environment_variables() {
        let arns = EMBEDDED_ARN
            .find_iter(value)
            .map(|m| m.as_str().trim_end_matches(['.', ':', '/']).to_string());
        let buckets = STORAGE_URI
            .captures_iter(value)
            .filter_map(|caps| caps.get(1))
            .map(|bucket| format!("arn:{partition}:s3:::{}", bucket.as_str().to_lowercase()));

        for reference in arns.chain(buckets) {
            if unqualified_function_arn(&reference) == own_arn {
                continue;
            }
            if seen.insert(reference.clone()) {
                references.push(reference);
            }
        }
    }
    references
}

pub fn add_config_refs(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    config_references(function)
        .into_iter()
        .map(|reference| {
            relate(
                store,
                &function.function_arn,
                NodeCandidate::new(reference),
                RelationKind::ConfigRef,
            )
        })
        .sum()
}

pub fn add_file_systems(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    function
        .file_system_configs
        .iter()
        .filter_map(|fs| non_empty(Some(fs.arn.as_str())))
        .map(|arn| {
            relate(
                store,
                &function.function_arn,
                NodeCandidate::new(arn),
                RelationKind::Efs,
            )
        })
        .sum()
}

pub fn add_encryption(function: &FunctionDescriptor, store: &mut GraphStore) -> usize {
    match non_empty(function.kms_key_arn.as_deref()) {
        Some(key) => relate(
            store,
            &function.function_arn,
            NodeCandidate::new(key),
            RelationKind::Encryption,
        ),
        None => 0,
    }
}

/// Invocation destinations plus the failure destinations of its mappings.
pub fn add_destinations(
    function: &FunctionDescriptor,
    mappings: &[EventSourceMapping],
    store: &mut GraphStore,
) -> usize {
    let from_function = function.destination_configs.iter();
    let from_mappings = mappings.iter().filter_map(|m| m.destination_config.as_ref());

    let targets: Vec<String> = from_function
        .chain(from_mappings)
        .flat_map(|config| config.targets())
        .map(str::to_string)
        .collect();

    targets
        .into_iter()
        .map(|target| {
            relate(
                store,
                &function.function_arn,
                NodeCandidate::new(target),
                RelationKind::Destination,
            )
        })
        .sum()
}
