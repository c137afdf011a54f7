//! Multi-hop graph traversal and subgraph extraction.
//!
//! Provides BFS-based traversal from seed nodes with configurable depth limits,
//! predicate filters, and confidence thresholds.

use std::collections::{HashSet, VecDeque};

use crate::error::GraphError;
use crate::symbol::SymbolId;

use super::Triple;
use super::index::KnowledgeGraph;

/// Configuration for a graph traversal.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Maximum hop depth from seed nodes.
    pub max_depth: usize,
    /// Only follow edges with these predicates (empty = follow all).
    pub predicate_filter: HashSet<SymbolId>,
    /// Minimum confidence to traverse an edge.
    pub min_confidence: f32,
    /// Maximum number of triples to collect.
    pub max_results: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            predicate_filter: HashSet::new(),
            min_confidence: 0.0,
            max_results: 10_000,
        }
    }
}

/// Result of a multi-hop traversal.
#[derive(Debug, Clone)]
pub struct TraversalResult {
    /// All triples discovered during traversal.
    pub triples: Vec<Triple>,
    /// All nodes visited.
    pub visited: HashSet<SymbolId>,
    /// Maximum depth actually reached.
    pub depth_reached: usize,
}

/// Perform a BFS traversal from seed nodes.
///
/// Explores outgoing edges from each seed, collecting triples up to `max_depth` hops.
pub fn traverse_bfs(
    graph: &KnowledgeGraph,
    seeds: &[SymbolId],
    config: &TraversalConfig,
) -> Result<TraversalResult, GraphError> {
    let mut visited: HashSet<SymbolId> = HashSet::new();
    let mut collected_triples: Vec<Triple> = Vec::new();
    let mut depth_reached: usize = 0;

    // BFS queue: (node, current_depth)
    let mut queue: VecDeque<(SymbolId, usize)> = VecDeque::new();

    for &seed in seeds {
        if visited.insert(seed) {
            queue.push_back((seed, 0));
        }
    }

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= config.max_depth {
            continue;
        }
        if collected_triples.len() >= config.max_results {
            break;
        }

        let outgoing = graph.triples_from(node);
        for triple in outgoing {
            // Apply predicate filter
            if !config.predicate_filter.is_empty()
                && !config.predicate_filter.contains(&triple.predicate)
            {
                continue;
            }

            // Apply confidence threshold
            if triple.confidence < config.min_confidence {
                continue;
            }

            collected_triples.push(triple.clone());
            depth_reached = depth_reached.max(depth + 1);

            if visited.insert(triple.object) {
                queue.push_back((triple.object, depth + 1));
            }
        }
    }

    Ok(TraversalResult {
        triples: collected_triples,
        visited,
        depth_reached,
    })
}

/// Extract the subgraph reachable from seeds within the configured depth.
///
/// Returns all unique nodes and triples in the reachable subgraph.
pub fn extract_subgraph(
    graph: &KnowledgeGraph,
    seeds: &[SymbolId],
    max_depth: usize,
) -> Result<TraversalResult, GraphError> {
    traverse_bfs(
        graph,
        seeds,
        &TraversalConfig {
            max_depth,
            ..Default::default()
        },
    )
}
