//! Pattern catalog for static package scanning.
//!
//! The catalog is an immutable table built once and handed to the analyzer.
//! `Regex` matching keeps no cursor state between calls, so one catalog can
//! serve every package of a run.

use crate::core::{Error, Result};
use crate::topology::canonical_service;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// What a rule's first capture group holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Arn,
    QueueUrl,
    Name,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arn => "arn",
            Self::QueueUrl => "queueUrl",
            Self::Name => "name",
        }
    }
}

/// How an invocation rule's capture is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCapture {
    /// The whole match is a function identifier.
    Arn,
    /// A quoted literal; identifier if it starts with `arn:`, name otherwise.
    Literal,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub regex: Regex,
    /// `None` marks a weak rule that only signals the service is used.
    pub resource: Option<ResourceKind>,
}

#[derive(Debug, Clone)]
pub struct InvocationRule {
    pub regex: Regex,
    pub capture: TargetCapture,
}

/// Rules for one service, tried in order.
#[derive(Debug, Clone)]
pub struct ServicePatterns {
    /// Raw service key as it appears in identifiers (`sqs`, `dynamodb`).
    pub key: String,
    /// Display tag (`SQS`, `DynamoDB`).
    pub tag: String,
    pub rules: Vec<PatternRule>,
}

/// Uncompiled rule table: `(service key, [(pattern, captured kind)])`.
pub type ServiceSpec<'a> = (&'a str, &'a [(&'a str, Option<ResourceKind>)]);

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    services: Vec<ServicePatterns>,
    invocations: Vec<InvocationRule>,
}

const QUOTED: &str = r#"(?:"([^"\n]+)"|'([^'\n]+)'|`([^`\n]+)`)"#;

static INVOCATION_SPECS: Lazy<Vec<(String, TargetCapture)>> = Lazy::new(|| {
    vec![
        (
            r"arn:aws[a-zA-Z-]*:lambda:[a-z0-9-]+:\d{12}:function:[A-Za-z0-9_-]+(?::[A-Za-z0-9_$-]+)?"
                .to_string(),
            TargetCapture::Arn,
        ),
        (
            format!(r#"\bFunctionName["']?\s*[:=]\s*{QUOTED}"#),
            TargetCapture::Literal,
        ),
        (
            format!(r"(?i)\binvoke_?(?:Function|Lambda|Async)?\s*\(\s*{QUOTED}"),
            TargetCapture::Literal,
        ),
    ]
});

use ResourceKind::{Arn, Name, QueueUrl};

const SQS_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bQueueUrl["']?\s*[:=]\s*["'`](https?://[^"'`\s]+)["'`]"#, Some(QueueUrl)),
    (r#"["'`](https://sqs\.[a-z0-9-]+\.amazonaws\.com(?:\.cn)?/\d{12}/[A-Za-z0-9_.-]+)["'`]"#, Some(QueueUrl)),
    (r#"["'`](arn:aws[a-z-]*:sqs:[a-z0-9-]+:\d{12}:[A-Za-z0-9_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+SQS(?:Client)?\s*\(", None),
    (r#"boto3\.(?:client|resource)\(\s*["']sqs["']"#, None),
    (r"\b(?:SendMessage|SendMessageBatch|ReceiveMessage)Command\b", None),
    (r"\bSqsClient\b", None),
];

const SNS_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bTopicArn["']?\s*[:=]\s*["'`](arn:[^"'`\s]+)["'`]"#, Some(Arn)),
    (r#"["'`](arn:aws[a-z-]*:sns:[a-z0-9-]+:\d{12}:[A-Za-z0-9_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+SNS(?:Client)?\s*\(", None),
    (r#"boto3\.(?:client|resource)\(\s*["']sns["']"#, None),
    (r"\bPublish(?:Batch)?Command\b", None),
    (r"\bSnsClient\b", None),
];

const S3_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bBucket["']?\s*[:=]\s*["'`]([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])["'`]"#, Some(Name)),
    (r#"["'`]s3://([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:s3:::[^"'`\s]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+S3(?:Client)?\s*\(", None),
    (r#"boto3\.(?:client|resource)\(\s*["']s3["']"#, None),
    (r"\b(?:Get|Put|Delete|Head|Copy)ObjectCommand\b", None),
    (r"\bS3Client\b", None),
];

const DYNAMODB_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bTableName["']?\s*[:=]\s*["'`]([A-Za-z0-9_.-]{3,255})["'`]"#, Some(Name)),
    (r#"\.Table\(\s*["']([A-Za-z0-9_.-]{3,255})["']\s*\)"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:dynamodb:[a-z0-9-]+:\d{12}:table/[A-Za-z0-9_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+DynamoDB(?:Client)?\s*\(", None),
    (r"\bDocumentClient\s*\(", None),
    (r"\bDynamoDBDocumentClient\b", None),
    (r#"boto3\.(?:client|resource)\(\s*["']dynamodb["']"#, None),
    (r"\bDynamoDbClient\b", None),
];

const EVENTS_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bEventBusName["']?\s*[:=]\s*["'`]([A-Za-z0-9/_.:\-]+)["'`]"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:events:[a-z0-9-]+:\d{12}:event-bus/[A-Za-z0-9/_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+EventBridge(?:Client)?\s*\(", None),
    (r#"boto3\.client\(\s*["']events["']"#, None),
    (r"\bPutEventsCommand\b", None),
    (r"\bEventBridgeClient\b", None),
];

const STATES_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"(?i)\bstateMachineArn["']?\s*[:=]\s*["'`](arn:[^"'`\s]+)["'`]"#, Some(Arn)),
    (r#"["'`](arn:aws[a-z-]*:states:[a-z0-9-]+:\d{12}:stateMachine:[A-Za-z0-9_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+(?:SFN|StepFunctions)(?:Client)?\s*\(", None),
    (r#"boto3\.client\(\s*["']stepfunctions["']"#, None),
    (r"\bStart(?:Sync)?ExecutionCommand\b", None),
    (r"\bSfnClient\b", None),
];

const KINESIS_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bStreamName["']?\s*[:=]\s*["'`]([A-Za-z0-9_.-]+)["'`]"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:kinesis:[a-z0-9-]+:\d{12}:stream/[A-Za-z0-9_.-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+Kinesis(?:Client)?\s*\(", None),
    (r#"boto3\.client\(\s*["']kinesis["']"#, None),
    (r"\bPutRecords?Command\b", None),
    (r"\bKinesisClient\b", None),
];

const SECRETS_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bSecretId["']?\s*[:=]\s*["'`]([^"'`\s$]+)["'`]"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:secretsmanager:[a-z0-9-]+:\d{12}:secret:[A-Za-z0-9/_+=.@-]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+SecretsManager(?:Client)?\s*\(", None),
    (r#"boto3\.client\(\s*["']secretsmanager["']"#, None),
    (r"\bGetSecretValueCommand\b", None),
    (r"\bSecretsManagerClient\b", None),
];

const SSM_RULES: &[(&str, Option<ResourceKind>)] = &[
    (r#"\bName["']?\s*[:=]\s*["'`](/[A-Za-z0-9_.\-/]+)["'`]"#, Some(Name)),
    (r#"["'`](arn:aws[a-z-]*:ssm:[a-z0-9-]+:\d{12}:parameter/[A-Za-z0-9_.\-/]+)["'`]"#, Some(Arn)),
    (r"\bnew\s+SSM(?:Client)?\s*\(", None),
    (r#"boto3\.client\(\s*["']ssm["']"#, None),
    (r"\bGetParameters?(?:ByPath)?Command\b", None),
    (r"\bSsmClient\b", None),
];

/// Built-in rules, one group per managed service.
pub const BUILTIN_SERVICES: &[ServiceSpec<'static>] = &[
    ("sqs", SQS_RULES),
    ("sns", SNS_RULES),
    ("s3", S3_RULES),
    ("dynamodb", DYNAMODB_RULES),
    ("events", EVENTS_RULES),
    ("states", STATES_RULES),
    ("kinesis", KINESIS_RULES),
    ("secretsmanager", SECRETS_RULES),
    ("ssm", SSM_RULES),
];

static BUILTIN: Lazy<PatternCatalog> = Lazy::new(|| {
    PatternCatalog::from_specs(BUILTIN_SERVICES).expect("built-in patterns compile")
});

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::configuration(format!("invalid pattern {pattern:?}: {e}")))
}

impl PatternCatalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Compile a service table alongside the built-in invocation rules.
    pub fn from_specs(specs: &[ServiceSpec<'_>]) -> Result<Self> {
        let services = specs
            .iter()
            .map(|(key, rules)| {
                let rules = rules
                    .iter()
                    .map(|(pattern, resource)| {
                        Ok(PatternRule {
                            regex: compile(pattern)?,
                            resource: *resource,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ServicePatterns {
                    key: key.to_string(),
                    tag: canonical_service(key),
                    rules,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let invocations = INVOCATION_SPECS
            .iter()
            .map(|(pattern, capture)| {
                Ok(InvocationRule {
                    regex: compile(pattern)?,
                    capture: *capture,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            services,
            invocations,
        })
    }

    pub fn services(&self) -> &[ServicePatterns] {
        &self.services
    }

    pub fn service(&self, key: &str) -> Option<&ServicePatterns> {
        self.services.iter().find(|s| s.key == key)
    }

    pub fn invocation_rules(&self) -> &[InvocationRule] {
        &self.invocations
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
