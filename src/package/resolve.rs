//! Turning scan findings into graph nodes and edges.

use super::patterns::ResourceKind;
use super::scanner::{InvocationTarget, ServiceHint};
use crate::core::FunctionDescriptor;
use crate::topology::metadata::FUNCTION_SERVICE;
use crate::topology::{
    canonical_service, unqualified_function_arn, FunctionIndex, GraphStore, NodeCandidate,
    RelationKind, ResourceIdentifier,
};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use tracing::debug;

pub const FUNCTION_REF_SCHEME: &str = "function-ref://";
pub const QUEUE_URL_SCHEME: &str = "queue-url://";
pub const SERVICE_SCHEME: &str = "service://";

const DEFAULT_PARTITION: &str = "aws";

/// `https://sqs.<region>.amazonaws.com/<account>/<name>`
static QUEUE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://sqs\.([a-z0-9-]+)\.amazonaws\.com(?:\.cn)?/(\d{12})/([A-Za-z0-9_.-]+)/?$")
        .expect("queue URL pattern")
});

/// The scanning function and the run's known functions.
pub struct ResolutionContext<'a> {
    pub function_arn: &'a str,
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub index: &'a FunctionIndex,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(function: &'a FunctionDescriptor, index: &'a FunctionIndex) -> Self {
        let (partition, region, account_id) =
            match ResourceIdentifier::parse(&function.function_arn) {
                Some(arn) => (arn.partition, arn.region, arn.account_id),
                None => Default::default(),
            };
        Self {
            function_arn: &function.function_arn,
            partition: if partition.is_empty() {
                DEFAULT_PARTITION.to_string()
            } else {
                partition
            },
            region,
            account_id,
            index,
        }
    }

    fn is_self(&self, id: &str) -> bool {
        id == self.function_arn || unqualified_function_arn(id) == self.function_arn
    }
}

/// Node for an invocation target, or `None` when it points back at the
/// scanning function.
pub fn resolve_invocation(
    target: &InvocationTarget,
    ctx: &ResolutionContext<'_>,
) -> Option<NodeCandidate> {
    let candidate = match target {
        InvocationTarget::Arn(arn) => match ctx.index.resolve_arn(arn) {
            Some(known) => NodeCandidate::new(known),
            None => NodeCandidate::new(unqualified_function_arn(arn)).with_service(FUNCTION_SERVICE),
        },
        InvocationTarget::Name(name) => match ctx.index.resolve_name(name) {
            Some(known) => NodeCandidate::new(known),
            None => NodeCandidate::new(format!("{FUNCTION_REF_SCHEME}{name}"))
                .with_label(name)
                .with_service(FUNCTION_SERVICE),
        },
    };

    if ctx.is_self(&candidate.id) {
        debug!(target = %target.value(), "Suppressing self invocation");
        return None;
    }
    Some(candidate)
}

/// Canonical queue identifier for a queue URL, if it has the standard shape.
pub fn queue_url_to_arn(url: &str, partition: &str) -> Option<String> {
    let caps = QUEUE_URL.captures(url.trim())?;
    Some(format!(
        "arn:{partition}:sqs:{}:{}:{}",
        &caps[1], &caps[2], &caps[3]
    ))
}

fn queue_url_node(url: &str, partition: &str) -> NodeCandidate {
    match queue_url_to_arn(url, partition) {
        Some(arn) => NodeCandidate::new(arn),
        None => {
            let label = url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(url);
            NodeCandidate::new(format!(
                "{QUEUE_URL_SCHEME}{}",
                utf8_percent_encode(url, NON_ALPHANUMERIC)
            ))
            .with_label(label)
            .with_service(canonical_service("sqs"))
        }
    }
}

fn named_resource_node(service: &str, name: &str, ctx: &ResolutionContext<'_>) -> NodeCandidate {
    if name.starts_with("arn:") {
        return NodeCandidate::new(name);
    }
    let ResolutionContext {
        partition,
        region,
        account_id,
        ..
    } = ctx;
    match service {
        "s3" => NodeCandidate::new(format!("arn:{partition}:s3:::{name}")),
        "dynamodb" if !region.is_empty() && !account_id.is_empty() => NodeCandidate::new(
            format!("arn:{partition}:dynamodb:{region}:{account_id}:table/{name}"),
        ),
        _ => NodeCandidate::new(format!("{service}://{name}"))
            .with_label(name)
            .with_service(canonical_service(service)),
    }
}

/// Node for a service hint, or `None` when it resolves to the scanning
/// function.
pub fn resolve_service_hint(
    hint: &ServiceHint,
    ctx: &ResolutionContext<'_>,
) -> Option<NodeCandidate> {
    let candidate = match &hint.resource {
        None => NodeCandidate::new(format!("{SERVICE_SCHEME}{}", hint.service))
            .with_label(canonical_service(&hint.service))
            .with_service(canonical_service(&hint.service)),
        Some((ResourceKind::Arn, arn)) => NodeCandidate::new(arn.as_str()),
        Some((ResourceKind::QueueUrl, url)) => queue_url_node(url, &ctx.partition),
        Some((ResourceKind::Name, name)) => named_resource_node(&hint.service, name, ctx),
    };

    if ctx.is_self(&candidate.id) {
        return None;
    }
    Some(candidate)
}

/// Edges contributed by one package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub invocations: usize,
    pub usages: usize,
}

/// Add a node and an edge from the scanning function for every finding.
pub fn apply_findings(
    store: &mut GraphStore,
    ctx: &ResolutionContext<'_>,
    targets: &[InvocationTarget],
    hints: &[ServiceHint],
) -> ResolutionStats {
    let mut stats = ResolutionStats::default();

    for candidate in targets.iter().filter_map(|t| resolve_invocation(t, ctx)) {
        match store.link(ctx.function_arn, candidate, RelationKind::Invokes) {
            Ok(insertion) if insertion.is_added() => stats.invocations += 1,
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Skipping invocation target"),
        }
    }

    for candidate in hints.iter().filter_map(|h| resolve_service_hint(h, ctx)) {
        match store.link(ctx.function_arn, candidate, RelationKind::UsesService) {
            Ok(insertion) if insertion.is_added() => stats.usages += 1,
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Skipping service hint"),
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::metadata::function_node;
    use pretty_assertions::assert_eq;

    const A: &str = "arn:aws:lambda:us-east-1:123456789012:function:A";
    const B: &str = "arn:aws:lambda:us-east-1:123456789012:function:B";

    fn functions() -> Vec<FunctionDescriptor> {
        vec![FunctionDescriptor::new("A", A), FunctionDescriptor::new("B", B)]
    }

    #[test]
    fn test_name_resolves_to_known_function() {
        let functions = functions();
        let index = FunctionIndex::build(&functions);
        let ctx = ResolutionContext::new(&functions[0], &index);

        let node = resolve_invocation(&InvocationTarget::Name("B:prod".into()), &ctx).unwrap();
        assert_eq!(node.id, B);
    }

    #[test]
    fn test_unresolved_targets_become_synthetic() {
        let functions = functions();
        let index = FunctionIndex::build(&functions);
        let ctx = ResolutionContext::new(&functions[0], &index);

        let node = resolve_invocation(&InvocationTarget::Name("ghost".into()), &ctx).unwrap();
        assert_eq!(node.id, "function-ref://ghost");
        assert_eq!(node.service.as_deref(), Some("Lambda"));

        let node = resolve_invocation(
            &InvocationTarget::Arn("arn:aws:lambda:eu-west-1:999999999999:function:ext:3".into()),
            &ctx,
        )
        .unwrap();
        assert_eq!(node.id, "arn:aws:lambda:eu-west-1:999999999999:function:ext");
    }

    #[test]
    fn test_self_invocation_suppressed() {
        let functions = functions();
        let index = FunctionIndex::build(&functions);
        let ctx = ResolutionContext::new(&functions[0], &index);

        assert!(resolve_invocation(&InvocationTarget::Name("A".into()), &ctx).is_none());
        assert!(resolve_invocation(&InvocationTarget::Arn(format!("{A}:live")), &ctx).is_none());
    }

    #[test]
    fn test_queue_url_transform() {
        assert_eq!(
            queue_url_to_arn("https://sqs.us-east-1.amazonaws.com/123456789012/jobs", "aws"),
            Some("arn:aws:sqs:us-east-1:123456789012:jobs".to_string())
        );
        assert_eq!(queue_url_to_arn("http://localhost:4566/000000000000/jobs", "aws"), None);

        let node = queue_url_node("http://localhost:4566/000000000000/jobs", "aws");
        assert_eq!(
            node.id,
            "queue-url://http%3A%2F%2Flocalhost%3A4566%2F000000000000%2Fjobs"
        );
        assert_eq!(node.label.as_deref(), Some("jobs"));
    }

    #[test]
    fn test_named_resources() {
        let functions = functions();
        let index = FunctionIndex::build(&functions);
        let ctx = ResolutionContext::new(&functions[0], &index);

        let table = ServiceHint::with_resource("dynamodb", ResourceKind::Name, "orders");
        assert_eq!(
            resolve_service_hint(&table, &ctx).unwrap().id,
            "arn:aws:dynamodb:us-east-1:123456789012:table/orders"
        );

        let bucket = ServiceHint::with_resource("s3", ResourceKind::Name, "assets");
        assert_eq!(resolve_service_hint(&bucket, &ctx).unwrap().id, "arn:aws:s3:::assets");

        let secret = ServiceHint::with_resource("secretsmanager", ResourceKind::Name, "db/creds");
        let node = resolve_service_hint(&secret, &ctx).unwrap();
        assert_eq!(node.id, "secretsmanager://db/creds");
        assert_eq!(node.service.as_deref(), Some("Secrets Manager"));

        let weak = resolve_service_hint(&ServiceHint::weak("sns"), &ctx).unwrap();
        assert_eq!(weak.id, "service://sns");
    }

    #[test]
    fn test_apply_findings_adds_typed_edges() {
        let functions = functions();
        let index = FunctionIndex::build(&functions);
        let mut store = GraphStore::new();
        for f in &functions {
            store.add_node(function_node(f)).unwrap();
        }
        let ctx = ResolutionContext::new(&functions[0], &index);

        let stats = apply_findings(
            &mut store,
            &ctx,
            &[
                InvocationTarget::Name("B".into()),
                InvocationTarget::Name("A".into()),
            ],
            &[ServiceHint::with_resource(
                "sqs",
                ResourceKind::QueueUrl,
                "https://sqs.us-east-1.amazonaws.com/123456789012/jobs",
            )],
        );

        assert_eq!(stats, ResolutionStats { invocations: 1, usages: 1 });
        let graph = store.into_graph();
        assert!(graph.has_edge(A, B, RelationKind::Invokes));
        assert!(graph.has_edge(
            A,
            "arn:aws:sqs:us-east-1:123456789012:jobs",
            RelationKind::UsesService
        ));
        assert!(!graph.has_edge(A, A, RelationKind::Invokes));
    }
}
