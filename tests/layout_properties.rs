//! Property-based tests for the layered layout
//!
//! These tests verify invariants that should hold for all graphs:
//! - Every node is placed exactly once
//! - Non-backward edges always point to a strictly later layer
//! - Backward edges are self-loops or lie inside a cycle
//! - Acyclic graphs have no backward edges
//! - Layout is deterministic
//! - Nodes of one layer keep the configured minimum separation

use lambdamap::config::LayoutConfig;
use lambdamap::{layout, Edge, Graph, GraphStore, NodeCandidate, RelationKind};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

const SERVICES: &[&str] = &["Lambda", "SQS", "S3", "DynamoDB"];

fn build_graph(n: usize, edges: &[(usize, usize)], acyclic: bool) -> Graph {
    let mut store = GraphStore::new();
    for i in 0..n {
        store
            .add_node(
                NodeCandidate::new(format!("node-{i}"))
                    .with_label(format!("n{}", i % 5))
                    .with_service(SERVICES[i % SERVICES.len()]),
            )
            .unwrap();
    }
    if n == 0 {
        return store.into_graph();
    }
    for &(a, b) in edges {
        let (mut s, mut t) = (a % n, b % n);
        if acyclic {
            if s == t {
                continue;
            }
            if s > t {
                std::mem::swap(&mut s, &mut t);
            }
        }
        let kind = if (a + b) % 2 == 0 {
            RelationKind::Invokes
        } else {
            RelationKind::UsesService
        };
        store.add_edge(Edge::new(format!("node-{s}"), format!("node-{t}"), kind));
    }
    store.into_graph()
}

/// Strongly connected component id and component size for every node id.
fn cycle_components(graph: &Graph) -> HashMap<String, (usize, usize)> {
    let mut pg = DiGraph::<&str, ()>::new();
    let index: HashMap<&str, NodeIndex> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), pg.add_node(n.id.as_str())))
        .collect();
    for edge in &graph.edges {
        pg.add_edge(index[edge.source.as_str()], index[edge.target.as_str()], ());
    }

    let mut components = HashMap::new();
    for (id, scc) in tarjan_scc(&pg).into_iter().enumerate() {
        for ix in &scc {
            components.insert(pg[*ix].to_string(), (id, scc.len()));
        }
    }
    components
}

fn graph_strategy(acyclic: bool) -> impl Strategy<Value = Graph> {
    (0usize..14, prop::collection::vec((0usize..64, 0usize..64), 0..40))
        .prop_map(move |(n, edges)| build_graph(n, &edges, acyclic))
}

proptest! {
    #[test]
    fn prop_every_node_placed_once(graph in graph_strategy(false)) {
        let positioned = layout(&graph, &LayoutConfig::default());

        prop_assert_eq!(positioned.nodes.len(), graph.nodes.len());
        let ids: HashSet<_> = positioned.nodes.iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(ids.len(), graph.nodes.len());
        for node in &positioned.nodes {
            prop_assert!(node.layer < positioned.layer_count.max(1));
        }
    }

    #[test]
    fn prop_forward_edges_advance_layers(graph in graph_strategy(false)) {
        let positioned = layout(&graph, &LayoutConfig::default());
        let backward: HashSet<_> = positioned
            .backward_edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.kind))
            .collect();

        for edge in &graph.edges {
            let source = positioned.node(&edge.source).unwrap();
            let target = positioned.node(&edge.target).unwrap();
            let key = (edge.source.clone(), edge.target.clone(), edge.kind);
            prop_assert!(target.layer > source.layer || backward.contains(&key));
        }
    }

    #[test]
    fn prop_backward_edges_lie_on_cycles(graph in graph_strategy(false)) {
        let positioned = layout(&graph, &LayoutConfig::default());
        let components = cycle_components(&graph);

        for edge in &positioned.backward_edges {
            if edge.source == edge.target {
                continue;
            }
            let (source_scc, size) = components[&edge.source];
            let (target_scc, _) = components[&edge.target];
            prop_assert_eq!(source_scc, target_scc);
            prop_assert!(size > 1);
        }
    }

    #[test]
    fn prop_acyclic_graphs_have_no_backward_edges(graph in graph_strategy(true)) {
        let positioned = layout(&graph, &LayoutConfig::default());
        prop_assert!(positioned.backward_edges.is_empty());
    }

    #[test]
    fn prop_layout_is_deterministic(graph in graph_strategy(false)) {
        let config = LayoutConfig::default();
        prop_assert_eq!(layout(&graph, &config), layout(&graph, &config));
    }

    #[test]
    fn prop_layers_keep_min_separation(
        graph in graph_strategy(false),
        min_separation in 10.0f64..200.0,
    ) {
        let config = LayoutConfig {
            min_separation,
            ..LayoutConfig::default()
        };
        let positioned = layout(&graph, &config);

        for l in 0..positioned.layer_count {
            let row = positioned.layer(l);
            for pair in row.windows(2) {
                prop_assert!(pair[1].y - pair[0].y >= min_separation - 1e-9);
            }
            for node in &row {
                prop_assert!((node.x - l as f64 * config.layer_spacing).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn test_fan_in_layers() {
    let graph = build_graph(4, &[(0, 3), (1, 3), (2, 1)], true);
    let positioned = layout(&graph, &LayoutConfig::default());

    assert_eq!(positioned.node("node-0").unwrap().layer, 0);
    assert_eq!(positioned.node("node-2").unwrap().layer, 0);
    assert_eq!(positioned.node("node-1").unwrap().layer, 1);
    assert_eq!(positioned.node("node-3").unwrap().layer, 2);
    assert_eq!(positioned.layer_count, 3);
}
