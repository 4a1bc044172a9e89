use serde::{Deserialize, Serialize};

/// Layered layout spacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Compute positions for the discovered graph
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Distance between consecutive layers
    #[serde(default = "default_layer_spacing")]
    pub layer_spacing: f64,

    /// Distance between consecutive nodes of one layer
    #[serde(default = "default_node_spacing")]
    pub node_spacing: f64,

    /// Closest two nodes of one layer may be after alignment
    #[serde(default = "default_min_separation")]
    pub min_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            layer_spacing: default_layer_spacing(),
            node_spacing: default_node_spacing(),
            min_separation: default_min_separation(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

pub fn default_layer_spacing() -> f64 {
    260.0
}

pub fn default_node_spacing() -> f64 {
    90.0
}

pub fn default_min_separation() -> f64 {
    60.0
}
