//! Layered placement of a topology graph.
//!
//! Longest-path layering, cycle fallback, one barycenter sweep in each
//! direction and coordinate assignment. Every ordering decision falls back
//! to the stable `(service, label, id)` rank, so the same graph always lays
//! out the same way.

use super::{PositionedGraph, PositionedNode};
use crate::config::LayoutConfig;
use crate::topology::{Edge, Graph};
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Adjacency over node positions in `Graph::nodes`.
struct Adjacency {
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
}

fn build_petgraph(graph: &Graph) -> DiGraph<usize, ()> {
    let mut pg = DiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
    let index: HashMap<&str, NodeIndex> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), pg.add_node(i)))
        .collect();

    for edge in &graph.edges {
        if let (Some(&s), Some(&t)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            pg.add_edge(s, t, ());
        }
    }
    pg
}

fn adjacency(pg: &DiGraph<usize, ()>, rank: &[usize]) -> Adjacency {
    let collect = |i: usize, dir: Direction| {
        let mut out: Vec<usize> = pg
            .neighbors_directed(NodeIndex::new(i), dir)
            .map(|n| pg[n])
            .collect();
        out.sort_by_key(|&n| rank[n]);
        out.dedup();
        out
    };
    let n = pg.node_count();
    Adjacency {
        preds: (0..n).map(|i| collect(i, Direction::Incoming)).collect(),
        succs: (0..n).map(|i| collect(i, Direction::Outgoing)).collect(),
    }
}

/// Rank of each node under the `(service, label, id)` ordering.
fn stable_rank(graph: &Graph) -> Vec<usize> {
    let mut order: Vec<usize> = (0..graph.nodes.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&graph.nodes[a], &graph.nodes[b]);
        (&a.service, &a.label, &a.id).cmp(&(&b.service, &b.label, &b.id))
    });
    let mut rank = vec![0; order.len()];
    for (position, &node) in order.iter().enumerate() {
        rank[node] = position;
    }
    rank
}

/// Longest-path layers for the acyclic part of the graph.
fn longest_path_layers(adj: &Adjacency, by_rank: &[usize]) -> Vec<Option<usize>> {
    let n = adj.preds.len();
    let mut remaining: Vec<usize> = adj.preds.iter().map(Vec::len).collect();
    let mut tentative = vec![0usize; n];
    let mut layer = vec![None; n];

    let mut queue: VecDeque<usize> = by_rank
        .iter()
        .copied()
        .filter(|&v| remaining[v] == 0)
        .collect();
    for &v in &queue {
        layer[v] = Some(0);
    }

    while let Some(u) = queue.pop_front() {
        let current = layer[u].unwrap_or(0);
        for &v in &adj.succs[u] {
            tentative[v] = tentative[v].max(current + 1);
            remaining[v] -= 1;
            if remaining[v] == 0 {
                layer[v] = Some(tentative[v]);
                queue.push_back(v);
            }
        }
    }

    layer
}

/// Place nodes the relaxation pass could not reach because of cycles.
///
/// A node is only placed once every predecessor outside its strongly
/// connected component has a layer, so the only edges that can end up
/// pointing backward are edges inside a cycle.
fn resolve_cycles(
    adj: &Adjacency,
    by_rank: &[usize],
    component: &[usize],
    layer: &mut [Option<usize>],
) {
    let ready = |v: usize, layer: &[Option<usize>]| {
        adj.preds[v]
            .iter()
            .all(|&p| component[p] == component[v] || layer[p].is_some())
    };

    loop {
        let mut progress = true;
        while progress {
            progress = false;
            for &v in by_rank {
                if layer[v].is_some() || !ready(v, layer) {
                    continue;
                }
                let from_preds = adj.preds[v].iter().filter_map(|&p| layer[p]).max();
                if let Some(max) = from_preds {
                    layer[v] = Some(max + 1);
                    progress = true;
                }
            }
        }

        let Some(&seed) = by_rank
            .iter()
            .find(|&&v| layer[v].is_none() && ready(v, layer))
        else {
            break;
        };
        let trailing = layer.iter().flatten().max().map_or(0, |max| max + 1);
        debug!(node = seed, layer = trailing, "Opening trailing layer for cycle");
        layer[seed] = Some(trailing);
    }
}

/// Strongly connected component id of each node position.
fn components(pg: &DiGraph<usize, ()>) -> (Vec<usize>, usize) {
    let mut component = vec![0usize; pg.node_count()];
    let mut cycles = 0;
    for (id, scc) in tarjan_scc(pg).into_iter().enumerate() {
        if scc.len() > 1 {
            cycles += 1;
        }
        for ix in scc {
            component[pg[ix]] = id;
        }
    }
    (component, cycles)
}

fn barycenter(neighbors: &[usize], position: &[usize]) -> Option<f64> {
    if neighbors.is_empty() {
        return None;
    }
    let sum: usize = neighbors.iter().map(|&n| position[n]).sum();
    Some(sum as f64 / neighbors.len() as f64)
}

fn reorder(row: &mut [usize], keys: &HashMap<usize, f64>, rank: &[usize]) {
    row.sort_by(|a, b| {
        keys[a]
            .total_cmp(&keys[b])
            .then_with(|| rank[*a].cmp(&rank[*b]))
    });
}

fn record_positions(row: &[usize], position: &mut [usize]) {
    for (i, &v) in row.iter().enumerate() {
        position[v] = i;
    }
}

/// One forward and one backward barycenter sweep.
fn order_layers(rows: &mut [Vec<usize>], adj: &Adjacency, layer: &[usize], rank: &[usize]) {
    let mut position = vec![0usize; layer.len()];
    for row in rows.iter() {
        record_positions(row, &mut position);
    }

    for l in 1..rows.len() {
        let keys: HashMap<usize, f64> = rows[l]
            .iter()
            .map(|&v| {
                let earlier: Vec<usize> = adj.preds[v]
                    .iter()
                    .copied()
                    .filter(|&p| layer[p] < l)
                    .collect();
                (v, barycenter(&earlier, &position).unwrap_or(position[v] as f64))
            })
            .collect();
        reorder(&mut rows[l], &keys, rank);
        record_positions(&rows[l], &mut position);
    }

    for l in (0..rows.len().saturating_sub(1)).rev() {
        let keys: HashMap<usize, f64> = rows[l]
            .iter()
            .map(|&v| {
                let later: Vec<usize> = adj.succs[v]
                    .iter()
                    .copied()
                    .filter(|&s| layer[s] > l)
                    .collect();
                (v, barycenter(&later, &position).unwrap_or(position[v] as f64))
            })
            .collect();
        reorder(&mut rows[l], &keys, rank);
        record_positions(&rows[l], &mut position);
    }
}

/// Vertical coordinates, nudged toward already-placed neighbors.
fn assign_y(rows: &[Vec<usize>], adj: &Adjacency, config: &LayoutConfig) -> Vec<f64> {
    let n = adj.preds.len();
    let mut y: Vec<Option<f64>> = vec![None; n];

    for row in rows {
        let mut previous: Option<f64> = None;
        for (order, &v) in row.iter().enumerate() {
            let base = order as f64 * config.node_spacing;
            let placed: Vec<f64> = adj.preds[v]
                .iter()
                .chain(&adj.succs[v])
                .filter_map(|&u| y[u])
                .collect();
            let target = if placed.is_empty() {
                base
            } else {
                let mean = placed.iter().sum::<f64>() / placed.len() as f64;
                (base + mean) / 2.0
            };
            let value = match previous {
                Some(prev) => target.max(prev + config.min_separation),
                None => target,
            };
            y[v] = Some(value);
            previous = Some(value);
        }
    }

    y.into_iter().map(Option::unwrap_or_default).collect()
}

/// Lay out `graph` in layers from sources to sinks.
pub fn layout(graph: &Graph, config: &LayoutConfig) -> PositionedGraph {
    let pg = build_petgraph(graph);
    let (component, cycles) = components(&pg);
    if is_cyclic_directed(&pg) {
        debug!(cycles, "Graph contains cycles; some edges will point backward");
    }

    let rank = stable_rank(graph);
    let mut by_rank: Vec<usize> = (0..graph.nodes.len()).collect();
    by_rank.sort_by_key(|&v| rank[v]);

    let adj = adjacency(&pg, &rank);
    let mut tentative = longest_path_layers(&adj, &by_rank);
    resolve_cycles(&adj, &by_rank, &component, &mut tentative);
    let layer: Vec<usize> = tentative.into_iter().map(Option::unwrap_or_default).collect();

    let layer_count = layer.iter().max().map_or(0, |max| max + 1);
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for &v in &by_rank {
        rows[layer[v]].push(v);
    }

    order_layers(&mut rows, &adj, &layer, &rank);
    let y = assign_y(&rows, &adj, config);

    let mut order = vec![0usize; layer.len()];
    for row in &rows {
        record_positions(row, &mut order);
    }

    let nodes = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| PositionedNode {
            id: node.id.clone(),
            label: node.label.clone(),
            service: node.service.clone(),
            layer: layer[i],
            order: order[i],
            x: layer[i] as f64 * config.layer_spacing,
            y: y[i],
        })
        .collect::<Vec<_>>();

    let layer_of: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), layer[i]))
        .collect();
    let backward_edges: Vec<Edge> = graph
        .edges
        .iter()
        .filter(|edge| {
            match (
                layer_of.get(edge.source.as_str()),
                layer_of.get(edge.target.as_str()),
            ) {
                (Some(s), Some(t)) => t <= s,
                _ => false,
            }
        })
        .cloned()
        .collect();

    debug!(
        nodes = nodes.len(),
        layers = layer_count,
        backward = backward_edges.len(),
        "Layout complete"
    );

    PositionedGraph {
        nodes,
        edges: graph.edges.clone(),
        layer_count,
        backward_edges,
    }
}
