//! Append-only, deduplicating graph store.
//!
//! Nodes are keyed by id and keep the label/service of their first
//! insertion. Edges are keyed by `(source, target, type)`. Both lists keep
//! insertion order so snapshots are deterministic.

use super::arn::{describe, UNKNOWN_SERVICE};
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Relationship categories carried on edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    EventSource,
    Dlq,
    UsesRole,
    Layer,
    Subnet,
    SecurityGroup,
    ConfigRef,
    Efs,
    Encryption,
    Destination,
    Invokes,
    UsesService,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventSource => "eventSource",
            Self::Dlq => "dlq",
            Self::UsesRole => "usesRole",
            Self::Layer => "layer",
            Self::Subnet => "subnet",
            Self::SecurityGroup => "securityGroup",
            Self::ConfigRef => "configRef",
            Self::Efs => "efs",
            Self::Encryption => "encryption",
            Self::Destination => "destination",
            Self::Invokes => "invokes",
            Self::UsesService => "usesService",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RelationKind>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: Some(kind),
        }
    }
}

/// A node as proposed by an extractor, before normalization.
///
/// Missing labels and services are derived from the id by the identifier
/// parser.
#[derive(Debug, Clone, Default)]
pub struct NodeCandidate {
    pub id: String,
    pub label: Option<String>,
    pub service: Option<String>,
}

impl NodeCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    fn normalize(self) -> Node {
        let (derived_label, derived_service) = describe(&self.id);
        let label = self
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(derived_label);
        let service = self
            .service
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(derived_service);
        Node {
            id: self.id,
            label,
            service: if service.is_empty() {
                UNKNOWN_SERVICE.to_string()
            } else {
                service
            },
        }
    }
}

/// Why an edge was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeRejection {
    MissingSource,
    MissingTarget,
    UnknownSource(String),
    UnknownTarget(String),
}

/// Outcome of an edge insertion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeInsertion {
    Added,
    Duplicate,
    Rejected(EdgeRejection),
}

impl EdgeInsertion {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

type EdgeKey = (String, String, Option<RelationKind>);

/// Immutable result of a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: RelationKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.kind == Some(kind))
    }

    pub fn edges_of_kind(&self, kind: RelationKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == Some(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Single-writer graph builder.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: HashSet<EdgeKey>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or return the already-stored node with the same id.
    pub fn add_node(&mut self, candidate: NodeCandidate) -> Result<&Node> {
        if candidate.id.trim().is_empty() {
            return Err(Error::InvalidNode("node id is missing".to_string()));
        }

        let position = match self.node_index.get(&candidate.id) {
            Some(&existing) => existing,
            None => {
                let node = candidate.normalize();
                let position = self.nodes.len();
                self.node_index.insert(node.id.clone(), position);
                self.nodes.push(node);
                position
            }
        };

        Ok(&self.nodes[position])
    }

    /// Insert an edge between two stored nodes.
    ///
    /// Missing or unknown endpoints are reported, never raised.
    pub fn add_edge(&mut self, edge: Edge) -> EdgeInsertion {
        if edge.source.is_empty() {
            return EdgeInsertion::Rejected(EdgeRejection::MissingSource);
        }
        if edge.target.is_empty() {
            return EdgeInsertion::Rejected(EdgeRejection::MissingTarget);
        }
        if !self.node_index.contains_key(&edge.source) {
            return EdgeInsertion::Rejected(EdgeRejection::UnknownSource(edge.source));
        }
        if !self.node_index.contains_key(&edge.target) {
            return EdgeInsertion::Rejected(EdgeRejection::UnknownTarget(edge.target));
        }

        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if !self.edge_index.insert(key) {
            return EdgeInsertion::Duplicate;
        }

        self.edges.push(edge);
        EdgeInsertion::Added
    }

    /// Insert a node and link `source` to it in one step.
    pub fn link(
        &mut self,
        source: &str,
        candidate: NodeCandidate,
        kind: RelationKind,
    ) -> Result<EdgeInsertion> {
        let target = self.add_node(candidate)?.id.clone();
        Ok(self.add_edge(Edge::new(source, target, kind)))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn snapshot(&self) -> Graph {
        Graph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn into_graph(self) -> Graph {
        Graph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
