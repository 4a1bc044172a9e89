//! Spatial layout of discovered topologies.

pub mod layered;

pub use layered::layout;

use crate::topology::Edge;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub label: String,
    pub service: String,
    pub layer: usize,
    /// Position within the layer after crossing reduction.
    pub order: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionedGraph {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<Edge>,
    pub layer_count: usize,
    /// Edges whose target is not on a strictly later layer (cycles).
    pub backward_edges: Vec<Edge>,
}

impl PositionedGraph {
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes of one layer in their final order.
    pub fn layer(&self, layer: usize) -> Vec<&PositionedNode> {
        let mut row: Vec<_> = self.nodes.iter().filter(|n| n.layer == layer).collect();
        row.sort_by_key(|n| n.order);
        row
    }
}
