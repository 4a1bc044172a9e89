//! Pattern passes over extracted package text.

use super::archive::ArchiveEntry;
use super::patterns::{PatternCatalog, ResourceKind, TargetCapture};
use regex::Captures;
use serde::Serialize;
use std::collections::HashSet;

/// A function the package appears to call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum InvocationTarget {
    Arn(String),
    Name(String),
}

impl InvocationTarget {
    pub fn value(&self) -> &str {
        match self {
            Self::Arn(v) | Self::Name(v) => v,
        }
    }
}

/// A managed service the package appears to use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceHint {
    /// Service key from the catalog (`sqs`, `dynamodb`).
    pub service: String,
    pub resource: Option<(ResourceKind, String)>,
}

impl ServiceHint {
    pub fn weak(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            resource: None,
        }
    }

    pub fn with_resource(
        service: impl Into<String>,
        kind: ResourceKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            resource: Some((kind, value.into())),
        }
    }
}

fn first_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}

fn literal_target(literal: &str) -> Option<InvocationTarget> {
    let literal = literal.trim();
    if literal.is_empty() || literal.contains("${") {
        return None;
    }
    if literal.starts_with("arn:") {
        Some(InvocationTarget::Arn(literal.to_string()))
    } else {
        Some(InvocationTarget::Name(literal.to_string()))
    }
}

/// Candidate invocation targets, deduplicated by type and value in
/// first-seen order.
pub fn extract_invocation_targets(
    entries: &[ArchiveEntry],
    catalog: &PatternCatalog,
) -> Vec<InvocationTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for entry in entries {
        for rule in catalog.invocation_rules() {
            for caps in rule.regex.captures_iter(&entry.content) {
                let target = match rule.capture {
                    TargetCapture::Arn => caps
                        .get(0)
                        .map(|m| InvocationTarget::Arn(m.as_str().to_string())),
                    TargetCapture::Literal => first_group(&caps).and_then(literal_target),
                };
                if let Some(target) = target {
                    if seen.insert(target.clone()) {
                        targets.push(target);
                    }
                }
            }
        }
    }

    targets
}

/// Service usage hints, deduplicated by `(service, kind, value)`, or by
/// service alone for resource-less hints.
pub fn extract_service_hints(
    entries: &[ArchiveEntry],
    catalog: &PatternCatalog,
) -> Vec<ServiceHint> {
    let mut seen = HashSet::new();
    let mut hints = Vec::new();

    for service in catalog.services() {
        for entry in entries {
            for rule in &service.rules {
                for caps in rule.regex.captures_iter(&entry.content) {
                    let hint = match rule.resource {
                        Some(kind) => match first_group(&caps).map(str::trim) {
                            Some(value) if !value.is_empty() && !value.contains("${") => {
                                ServiceHint::with_resource(&service.key, kind, value)
                            }
                            _ => continue,
                        },
                        None => ServiceHint::weak(&service.key),
                    };
                    if seen.insert(hint.clone()) {
                        hints.push(hint);
                    }
                }
            }
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn scan(path: &str, content: &str) -> (Vec<InvocationTarget>, Vec<ServiceHint>) {
        let entries = vec![ArchiveEntry::new(path, content)];
        let catalog = PatternCatalog::builtin();
        (
            extract_invocation_targets(&entries, &catalog),
            extract_service_hints(&entries, &catalog),
        )
    }

    #[test]
    fn test_function_name_assignment() {
        let (targets, _) = scan("index.js", r#"lambda.invoke({ FunctionName: "B" })"#);
        assert_eq!(targets, vec![InvocationTarget::Name("B".to_string())]);
    }

    #[test]
    fn test_template_interpolation_is_ignored() {
        let (targets, _) = scan(
            "index.js",
            "client.invoke({ FunctionName: `${process.env.STAGE}-worker` })",
        );
        assert!(targets.is_empty());
    }

    #[test]
    fn test_literal_arn_and_assignment_deduplicate() {
        let source = indoc! {r#"
            const target = "arn:aws:lambda:us-east-1:123456789012:function:billing";
            await client.send(new InvokeCommand({
              FunctionName: "arn:aws:lambda:us-east-1:123456789012:function:billing",
            }));
        "#};
        let (targets, _) = scan("index.js", source);
        assert_eq!(
            targets,
            vec![InvocationTarget::Arn(
                "arn:aws:lambda:us-east-1:123456789012:function:billing".to_string()
            )]
        );
    }

    #[test]
    fn test_direct_invocation_call() {
        let source = indoc! {r#"
            import boto3
            client = boto3.client("lambda")
            client.invoke(FunctionName="audit:live", Payload=b"{}")
            invoke_lambda('notifier')
        "#};
        let (targets, _) = scan("handler.py", source);
        assert_eq!(
            targets,
            vec![
                InvocationTarget::Name("audit:live".to_string()),
                InvocationTarget::Name("notifier".to_string()),
            ]
        );
    }

    #[test]
    fn test_weak_hint_kept_alongside_resource() {
        let source = indoc! {r#"
            const sqs = new SQSClient({});
            await sqs.send(new SendMessageCommand({
              QueueUrl: "https://sqs.eu-west-1.amazonaws.com/123456789012/jobs",
            }));
            const sns = new SNSClient({});
        "#};
        let (_, hints) = scan("index.js", source);
        assert_eq!(
            hints,
            vec![
                ServiceHint::with_resource(
                    "sqs",
                    ResourceKind::QueueUrl,
                    "https://sqs.eu-west-1.amazonaws.com/123456789012/jobs"
                ),
                ServiceHint::weak("sqs"),
                ServiceHint::weak("sns"),
            ]
        );
    }

    #[test]
    fn test_hints_deduplicated_across_entries() {
        let entries = vec![
            ArchiveEntry::new("a.py", "ddb.Table('orders')"),
            ArchiveEntry::new("b.py", "TableName='orders'"),
        ];
        let hints = extract_service_hints(&entries, &PatternCatalog::builtin());
        assert_eq!(
            hints,
            vec![ServiceHint::with_resource(
                "dynamodb",
                ResourceKind::Name,
                "orders"
            )]
        );
    }
}
