//! Node/edge model of a function fleet and the extractors that populate it.

pub mod arn;
pub mod graph;
pub mod index;
pub mod metadata;

pub use arn::{canonical_service, describe, unqualified_function_arn, ResourceIdentifier};
pub use graph::{
    Edge, EdgeInsertion, EdgeRejection, Graph, GraphStore, Node, NodeCandidate, RelationKind,
};
pub use index::FunctionIndex;
pub use metadata::{MetadataExtractor, MetadataReport};
