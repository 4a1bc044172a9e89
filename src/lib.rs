//! Topology discovery for serverless function fleets.
//!
//! Builds a node/edge graph of functions and the resources they touch from
//! control-plane metadata and static scanning of deployment packages, and
//! lays it out in layers for rendering.

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod discovery;
pub mod io;
pub mod layout;
pub mod observability;
pub mod package;
pub mod topology;

// Re-export commonly used types
pub use crate::core::{
    CallerIdentity, Error, EventSourceMapping, FunctionAlias, FunctionDescriptor, Result,
};

pub use crate::topology::{
    Edge, EdgeInsertion, EdgeRejection, FunctionIndex, Graph, GraphStore, MetadataExtractor,
    Node, NodeCandidate, RelationKind, ResourceIdentifier,
};

pub use crate::discovery::{
    Discoverer, DiscoveryResult, FunctionCatalog, IdentityProvider, PackageSource, Page,
    StepStatus, ValidationStep,
};

pub use crate::package::{PackageAnalyzer, PackageDownloader, PatternCatalog};

pub use crate::layout::{layout, PositionedGraph, PositionedNode};

pub use crate::io::output::{create_writer, OutputFormat, OutputWriter, TopologyReport};
