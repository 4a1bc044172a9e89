//! Resource identifier parsing.
//!
//! Identifiers have the shape
//! `arn:<partition>:<service>:<region>:<account>:<resource>`, where the
//! resource part may itself contain `:` or `/` separators. Parsing never
//! fails loudly: anything that does not look like an identifier yields
//! `None` and callers fall back to the raw string.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

pub const ARN_PREFIX: &str = "arn:";

/// Service tag for nodes whose service cannot be determined.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Display tags keyed by the normalized (lowercase alphanumeric) service name.
static SERVICE_TAGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("lambda", "Lambda"),
        ("s3", "S3"),
        ("sqs", "SQS"),
        ("sns", "SNS"),
        ("dynamodb", "DynamoDB"),
        ("events", "EventBridge"),
        ("eventbridge", "EventBridge"),
        ("states", "Step Functions"),
        ("stepfunctions", "Step Functions"),
        ("kinesis", "Kinesis"),
        ("firehose", "Firehose"),
        ("secretsmanager", "Secrets Manager"),
        ("ssm", "SSM"),
        ("iam", "IAM"),
        ("kms", "KMS"),
        ("elasticfilesystem", "EFS"),
        ("efs", "EFS"),
        ("ec2", "EC2"),
        ("vpc", "VPC"),
        ("logs", "CloudWatch Logs"),
        ("cloudwatch", "CloudWatch"),
        ("apigateway", "API Gateway"),
        ("executeapi", "API Gateway"),
        ("rds", "RDS"),
        ("kafka", "MSK"),
        ("mq", "Amazon MQ"),
        ("cognitoidp", "Cognito"),
        ("ses", "SES"),
        ("appsync", "AppSync"),
        ("elasticache", "ElastiCache"),
        ("es", "OpenSearch"),
        ("xray", "X-Ray"),
    ])
});

/// Canonical display tag for a raw service name.
///
/// Lookup ignores case and punctuation, so `execute-api`, `ExecuteApi` and
/// `execute_api` share a tag. Unmapped services keep their spelling with the
/// first character uppercased.
pub fn canonical_service(service: &str) -> String {
    let key: String = service
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if key.is_empty() {
        return UNKNOWN_SERVICE.to_string();
    }

    match SERVICE_TAGS.get(key.as_str()) {
        Some(tag) => (*tag).to_string(),
        None => capitalize_first(service),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A decomposed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifier {
    pub raw: String,
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceIdentifier {
    /// Parse an identifier, returning `None` for anything that is not one.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.starts_with(ARN_PREFIX) {
            return None;
        }

        let parts: Vec<&str> = raw.splitn(6, ':').collect();
        if parts.len() < 6 {
            return None;
        }

        let resource = parts[5];
        let (resource_type, resource_id) = split_resource(resource);

        Some(Self {
            raw: raw.to_string(),
            partition: parts[1].to_string(),
            service: parts[2].to_string(),
            region: parts[3].to_string(),
            account_id: parts[4].to_string(),
            resource: resource.to_string(),
            resource_type,
            resource_id,
        })
    }

    /// Canonical display tag of this identifier's service.
    pub fn service_tag(&self) -> String {
        canonical_service(&self.service)
    }

    pub fn is_storage(&self) -> bool {
        self.service.eq_ignore_ascii_case("s3")
    }

    /// Short human-readable label for this resource.
    pub fn label(&self) -> String {
        if self.is_storage() {
            let path = self.resource.trim_start_matches('/');
            if !path.is_empty() {
                return path.to_string();
            }
        }

        if !self.resource_id.is_empty() {
            return self.resource_id.clone();
        }

        self.resource
            .split(['/', ':'])
            .rev()
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.raw.clone())
    }
}

fn split_resource(resource: &str) -> (String, String) {
    let separator = if resource.contains('/') {
        Some('/')
    } else if resource.contains(':') {
        Some(':')
    } else {
        None
    };

    match separator {
        Some(sep) => {
            let first = resource.split(sep).next().unwrap_or_default();
            let last = resource.rsplit(sep).next().unwrap_or_default();
            (first.to_string(), last.to_string())
        }
        None => (resource.to_string(), resource.to_string()),
    }
}

/// Display label and service tag for any identifier-like string.
///
/// Strings that do not parse label as themselves with the `Unknown` tag.
pub fn describe(raw: &str) -> (String, String) {
    match ResourceIdentifier::parse(raw) {
        Some(arn) => (arn.label(), arn.service_tag()),
        None => (raw.to_string(), UNKNOWN_SERVICE.to_string()),
    }
}

/// Strip a version or alias qualifier from a function identifier.
///
/// `arn:aws:lambda:us-east-1:1:function:name:prod` becomes
/// `arn:aws:lambda:us-east-1:1:function:name`; identifiers with seven or
/// fewer segments are returned unchanged.
pub fn unqualified_function_arn(arn: &str) -> String {
    let segments: Vec<&str> = arn.split(':').collect();
    if segments.len() > 7 {
        segments[..7].join(":")
    } else {
        arn.to_string()
    }
}
