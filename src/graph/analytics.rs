//! Graph analytics: centrality, components, and path algorithms.
//!
//! All functions operate on a [`KnowledgeGraph`] reference and return
//! structured results sorted by relevance (score desc, size desc, etc.).

use std::collections::HashMap;

use petgraph::algo::{astar, page_rank, tarjan_scc};
use petgraph::graph::NodeIndex;

use crate::error::GraphError;
use crate::symbol::SymbolId;

use super::index::{GraphResult, KnowledgeGraph};

// ---------------------------------------------------------------------------
// Degree centrality
// ---------------------------------------------------------------------------

/// Degree centrality metrics for a single node.
#[derive(Debug, Clone)]
pub struct DegreeCentrality {
    /// The symbol this measurement belongs to.
    pub symbol: SymbolId,
    /// Number of incoming edges.
    pub in_degree: usize,
    /// Number of outgoing edges.
    pub out_degree: usize,
    /// Total degree (in + out).
    pub total: usize,
}

/// Compute degree centrality for all nodes. Returns sorted by total degree desc.
pub fn degree_centrality(kg: &KnowledgeGraph) -> Vec<DegreeCentrality> {
    let nodes = kg.nodes();
    let mut results: Vec<DegreeCentrality> = nodes
        .into_iter()
        .map(|symbol| {
            let out_degree = kg.triples_from(symbol).len();
            let in_degree = kg.triples_to(symbol).len();
            DegreeCentrality {
                symbol,
                in_degree,
                out_degree,
                total: in_degree + out_degree,
            }
        })
        .collect();
    results.sort_by(|a, b| b.total.cmp(&a.total));
    results
}

// ---------------------------------------------------------------------------
// PageRank
// ---------------------------------------------------------------------------

/// PageRank score for a single node.
#[derive(Debug, Clone)]
pub struct PageRankScore {
    /// The symbol this score belongs to.
    pub symbol: SymbolId,
    /// Computed PageRank score.
    pub score: f64,
}

/// Compute PageRank scores. Returns sorted by score desc.
pub fn pagerank(
    kg: &KnowledgeGraph,
    damping: f64,
    iterations: usize,
) -> GraphResult<Vec<PageRankScore>> {
    let graph = kg.graph();
    if graph.node_count() == 0 {
        return Ok(vec![]);
    }

    let scores = page_rank(&*graph, damping, iterations);
    let reverse_map = kg.node_index_to_symbol();

    let mut results: Vec<PageRankScore> = graph
        .node_indices()
        .filter_map(|idx| {
            let symbol = reverse_map.get(&idx)?;
            let score = scores[idx.index()];
            Some(PageRankScore {
                symbol: *symbol,
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(results)
}

// ---------------------------------------------------------------------------
// Strongly connected components
// ---------------------------------------------------------------------------

/// A strongly connected component in the graph.
#[derive(Debug, Clone)]
pub struct ConnectedComponent {
    /// Component identifier (arbitrary, for display).
    pub id: usize,
    /// Member symbols in this component.
    pub members: Vec<SymbolId>,
    /// Number of members.
    pub size: usize,
}

/// Find strongly connected components. Returns sorted by size desc.
pub fn strongly_connected_components(kg: &KnowledgeGraph) -> GraphResult<Vec<ConnectedComponent>> {
    let graph = kg.graph();
    let reverse_map = kg.node_index_to_symbol();

    let sccs = tarjan_scc(&*graph);

    let mut components: Vec<ConnectedComponent> = sccs
        .into_iter()
        .enumerate()
        .map(|(id, indices)| {
            let members: Vec<SymbolId> = indices
                .iter()
                .filter_map(|idx| reverse_map.get(idx).copied())
                .collect();
            let size = members.len();
            ConnectedComponent { id, members, size }
        })
        .collect();

    components.sort_by(|a, b| b.size.cmp(&a.size));
    Ok(components)
}

// ---------------------------------------------------------------------------
// Shortest path
// ---------------------------------------------------------------------------

/// Find shortest path (by hop count) between two symbols.
/// Returns None if no path exists.
pub fn shortest_path(
    kg: &KnowledgeGraph,
    from: SymbolId,
    to: SymbolId,
) -> GraphResult<Option<Vec<SymbolId>>> {
    if !kg.has_node(from) {
        return Err(GraphError::NodeNotFound {
            symbol_id: from.get(),
        });
    }
    if !kg.has_node(to) {
        return Err(GraphError::NodeNotFound {
            symbol_id: to.get(),
        });
    }

    let graph = kg.graph();
    let reverse_map = kg.node_index_to_symbol();

    // Use the forward map for O(1) lookup of start/end indices.
    let forward_map: HashMap<SymbolId, NodeIndex> =
        reverse_map.iter().map(|(&idx, &sym)| (sym, idx)).collect();

    let from_idx = forward_map[&from];
    let to_idx = forward_map[&to];

    let result = astar(&*graph, from_idx, |n| n == to_idx, |_| 1usize, |_| 0usize);

    match result {
        Some((_cost, path)) => {
            let symbols: Vec<SymbolId> = path
                .iter()
                .filter_map(|idx| reverse_map.get(idx).copied())
                .collect();
            Ok(Some(symbols))
        }
        None => Ok(None),
    }
}
