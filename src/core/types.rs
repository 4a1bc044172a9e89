//! Function metadata as delivered by the cloud control plane.
//!
//! These types mirror the PascalCase JSON shape of the function management
//! API so inventories exported from it deserialize without translation. They
//! are read-only inputs to discovery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version string the control plane uses for the mutable, unpublished code.
pub const LATEST_VERSION: &str = "$LATEST";

/// One function's full descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FunctionDescriptor {
    pub function_name: String,
    pub function_arn: String,
    pub runtime: Option<String>,
    pub role: Option<String>,
    pub version: Option<String>,
    pub vpc_config: Option<VpcConfig>,
    pub layers: Vec<LayerRef>,
    pub environment: Option<Environment>,
    pub dead_letter_config: Option<DeadLetterConfig>,
    pub file_system_configs: Vec<FileSystemConfig>,
    #[serde(rename = "KMSKeyArn")]
    pub kms_key_arn: Option<String>,
    /// Asynchronous invocation destinations, one entry per configured qualifier
    pub destination_configs: Vec<DestinationConfig>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            function_name: name.into(),
            function_arn: arn.into(),
            ..Default::default()
        }
    }

    /// Published version worth querying separately, if any.
    pub fn published_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .filter(|v| !v.is_empty() && *v != LATEST_VERSION)
    }

    /// Environment variables in a stable order.
    pub fn environment_variables(&self) -> impl Iterator<Item = (&String, &String)> {
        self.environment
            .iter()
            .flat_map(|env| env.variables.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VpcConfig {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LayerRef {
    pub arn: String,
    pub code_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Environment {
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeadLetterConfig {
    pub target_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileSystemConfig {
    pub arn: String,
    pub local_mount_path: Option<String>,
}

/// Destination map keyed by kind (`OnSuccess`, `OnFailure`,
/// `OnRetryExhausted`, ...). Unknown kinds are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationConfig {
    pub destinations: BTreeMap<String, Option<Destination>>,
}

impl DestinationConfig {
    pub fn with(mut self, kind: impl Into<String>, destination: impl Into<String>) -> Self {
        self.destinations.insert(
            kind.into(),
            Some(Destination {
                destination: Some(destination.into()),
            }),
        );
        self
    }

    /// Non-empty destination targets in kind order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.destinations
            .values()
            .flatten()
            .filter_map(|d| d.destination.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Destination {
    pub destination: Option<String>,
}

/// Binding between a stream/queue and a function (or one of its qualifiers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventSourceMapping {
    #[serde(rename = "UUID")]
    pub uuid: Option<String>,
    pub event_source_arn: Option<String>,
    pub function_arn: Option<String>,
    pub state: Option<String>,
    pub batch_size: Option<u32>,
    pub destination_config: Option<DestinationConfig>,
}

impl EventSourceMapping {
    /// Key used to collapse the same mapping seen through several qualifiers.
    pub fn dedup_key(&self) -> String {
        match self.uuid.as_deref().filter(|u| !u.is_empty()) {
            Some(uuid) => format!("uuid:{uuid}"),
            None => format!(
                "pair:{}|{}",
                self.event_source_arn.as_deref().unwrap_or_default(),
                self.function_arn.as_deref().unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FunctionAlias {
    pub name: String,
    pub alias_arn: String,
    pub function_version: Option<String>,
}

/// Who the run is authenticated as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_deserializes_api_shape() {
        let json = r#"{
            "FunctionName": "orders",
            "FunctionArn": "arn:aws:lambda:us-east-1:111122223333:function:orders",
            "Role": "arn:aws:iam::111122223333:role/orders-role",
            "KMSKeyArn": "arn:aws:kms:us-east-1:111122223333:key/abc",
            "Environment": {"Variables": {"QUEUE": "arn:aws:sqs:us-east-1:111122223333:q1"}},
            "VpcConfig": {"SubnetIds": ["subnet-1"], "SecurityGroupIds": ["sg-1"]},
            "Unknown": 42
        }"#;
        let descriptor: FunctionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.function_name, "orders");
        assert_eq!(
            descriptor.kms_key_arn.as_deref(),
            Some("arn:aws:kms:us-east-1:111122223333:key/abc")
        );
        assert_eq!(descriptor.environment_variables().count(), 1);
        assert_eq!(descriptor.vpc_config.unwrap().subnet_ids, vec!["subnet-1"]);
    }

    #[test]
    fn test_published_version_ignores_latest() {
        let mut descriptor = FunctionDescriptor::new("f", "arn");
        assert_eq!(descriptor.published_version(), None);
        descriptor.version = Some(LATEST_VERSION.to_string());
        assert_eq!(descriptor.published_version(), None);
        descriptor.version = Some("7".to_string());
        assert_eq!(descriptor.published_version(), Some("7"));
    }

    #[test]
    fn test_destination_targets_skip_empty_values() {
        let config = DestinationConfig::default()
            .with("OnSuccess", "  ")
            .with("OnFailure", "arn:aws:sqs:us-east-1:1:dlq");
        assert_eq!(
            config.targets().collect::<Vec<_>>(),
            vec!["arn:aws:sqs:us-east-1:1:dlq"]
        );
    }

    #[test]
    fn test_destination_config_keeps_every_kind() {
        let config: DestinationConfig = serde_json::from_str(
            r#"{
                "OnSuccess": {"Destination": "arn:aws:sqs:us-east-1:1:ok"},
                "OnFailure": null,
                "OnRetryExhausted": {"Destination": "arn:aws:sqs:us-east-1:1:exhausted"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.targets().collect::<Vec<_>>(),
            vec!["arn:aws:sqs:us-east-1:1:exhausted", "arn:aws:sqs:us-east-1:1:ok"]
        );
    }

    #[test]
    fn test_mapping_dedup_key_prefers_uuid() {
        let mut mapping = EventSourceMapping {
            uuid: Some("u-1".to_string()),
            event_source_arn: Some("src".to_string()),
            function_arn: Some("fn".to_string()),
            ..Default::default()
        };
        assert_eq!(mapping.dedup_key(), "uuid:u-1");
        mapping.uuid = None;
        assert_eq!(mapping.dedup_key(), "pair:src|fn");
    }
}
