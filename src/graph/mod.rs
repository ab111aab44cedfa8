//! Graph model: the single source of truth for scan topology
//!
//! Nodes are pages keyed by normalized URL, stored in discovery order. Edges
//! are ordered (source, target) pairs, deduplicated, with degree counters
//! updated atomically with edge insertion. The graph is exclusively owned by
//! its session's scheduler task, so no internal locking is needed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Health classification of a page.
///
/// `Pending` is the only non-terminal status; a node leaves it exactly once,
/// when its fetch resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Discovered, fetch not yet resolved
    Pending,
    /// Responded in time with a non-error status
    Healthy,
    /// Responded, but slower than the latency threshold
    Blockage,
    /// HTTP 4xx/5xx, exhausted retries, or terminal transport failure
    Necrosis,
}

impl HealthStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Healthy => "healthy",
            Self::Blockage => "blockage",
            Self::Necrosis => "necrosis",
        };
        write!(f, "{}", s)
    }
}

/// Graph invariant violations. These are session-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node already exists for URL: {0}")]
    DuplicateNode(String),

    #[error("node {0} was already resolved")]
    AlreadyResolved(usize),

    #[error("edge endpoint {0} does not exist")]
    MissingEndpoint(usize),
}

/// A discovered page
#[derive(Debug, Clone)]
pub struct PageNode {
    /// Index into the graph's node list, also the wire id (`node_{index}`)
    pub index: usize,
    /// Normalized URL, the node's identity
    pub url: String,
    /// Link distance from the seed; fixed at creation
    pub depth: u32,
    pub status: HealthStatus,
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub in_degree: u32,
    pub out_degree: u32,
}

/// Topology of one crawl session
#[derive(Debug, Default)]
pub struct PageGraph {
    nodes: Vec<PageNode>,
    index_by_url: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    edge_set: HashSet<(usize, usize)>,
}

impl PageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node with status `Pending` and returns its index.
    pub fn add_node(&mut self, url: &str, depth: u32) -> Result<usize, GraphError> {
        if self.index_by_url.contains_key(url) {
            return Err(GraphError::DuplicateNode(url.to_string()));
        }

        let index = self.nodes.len();
        self.nodes.push(PageNode {
            index,
            url: url.to_string(),
            depth,
            status: HealthStatus::Pending,
            status_code: None,
            latency_ms: None,
            in_degree: 0,
            out_degree: 0,
        });
        self.index_by_url.insert(url.to_string(), index);
        Ok(index)
    }

    /// Looks up a node by normalized URL
    pub fn find(&self, url: &str) -> Option<usize> {
        self.index_by_url.get(url).copied()
    }

    pub fn node(&self, index: usize) -> Option<&PageNode> {
        self.nodes.get(index)
    }

    /// Nodes in discovery order
    pub fn nodes(&self) -> &[PageNode] {
        &self.nodes
    }

    /// Edges in creation order
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Wire identifier for a node
    pub fn node_label(index: usize) -> String {
        format!("node_{}", index)
    }

    /// Inserts the ordered edge (source, target), updating both degree
    /// counters with it. Returns false when the edge already exists.
    pub fn add_edge(&mut self, source: usize, target: usize) -> Result<bool, GraphError> {
        if source >= self.nodes.len() {
            return Err(GraphError::MissingEndpoint(source));
        }
        if target >= self.nodes.len() {
            return Err(GraphError::MissingEndpoint(target));
        }

        if !self.edge_set.insert((source, target)) {
            return Ok(false);
        }

        self.edges.push((source, target));
        self.nodes[source].out_degree += 1;
        self.nodes[target].in_degree += 1;
        Ok(true)
    }

    /// Moves a node out of `Pending` into its terminal status. Each node
    /// resolves exactly once; a second resolution is an invariant breach.
    pub fn resolve(
        &mut self,
        index: usize,
        status: HealthStatus,
        status_code: Option<u16>,
        latency_ms: Option<u64>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(GraphError::MissingEndpoint(index))?;

        if node.status != HealthStatus::Pending {
            return Err(GraphError::AlreadyResolved(index));
        }

        node.status = status;
        node.status_code = status_code;
        node.latency_ms = latency_ms;
        Ok(())
    }

    /// Recomputes the in-degree of every node from the edge list.
    ///
    /// Degree-derived report fields (orphans, overloads) use this rather
    /// than the counters so they can never be stale.
    pub fn recompute_in_degrees(&self) -> Vec<u32> {
        let mut in_degrees = vec![0u32; self.nodes.len()];
        for &(_, target) in &self.edges {
            in_degrees[target] += 1;
        }
        in_degrees
    }

    /// Recomputes the out-degree of every node from the edge list
    pub fn recompute_out_degrees(&self) -> Vec<u32> {
        let mut out_degrees = vec![0u32; self.nodes.len()];
        for &(source, _) in &self.edges {
            out_degrees[source] += 1;
        }
        out_degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_starts_pending() {
        let mut graph = PageGraph::new();
        let idx = graph.add_node("https://example.com/", 0).unwrap();
        let node = graph.node(idx).unwrap();
        assert_eq!(node.status, HealthStatus::Pending);
        assert_eq!(node.depth, 0);
        assert_eq!(node.status_code, None);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = PageGraph::new();
        graph.add_node("https://example.com/", 0).unwrap();
        assert!(matches!(
            graph.add_node("https://example.com/", 1),
            Err(GraphError::DuplicateNode(_))
        ));
    }

    #[test]
    fn test_edge_dedup() {
        let mut graph = PageGraph::new();
        let a = graph.add_node("https://example.com/", 0).unwrap();
        let b = graph.add_node("https://example.com/about", 1).unwrap();

        assert!(graph.add_edge(a, b).unwrap());
        // Posting the same link twice yields one edge
        assert!(!graph.add_edge(a, b).unwrap());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node(a).unwrap().out_degree, 1);
        assert_eq!(graph.node(b).unwrap().in_degree, 1);

        // The reverse direction is a distinct edge
        assert!(graph.add_edge(b, a).unwrap());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_edge_missing_endpoint() {
        let mut graph = PageGraph::new();
        let a = graph.add_node("https://example.com/", 0).unwrap();
        assert!(matches!(
            graph.add_edge(a, 7),
            Err(GraphError::MissingEndpoint(7))
        ));
    }

    #[test]
    fn test_resolve_once() {
        let mut graph = PageGraph::new();
        let idx = graph.add_node("https://example.com/", 0).unwrap();
        graph
            .resolve(idx, HealthStatus::Healthy, Some(200), Some(42))
            .unwrap();

        let node = graph.node(idx).unwrap();
        assert_eq!(node.status, HealthStatus::Healthy);
        assert_eq!(node.status_code, Some(200));
        assert_eq!(node.latency_ms, Some(42));

        assert!(matches!(
            graph.resolve(idx, HealthStatus::Necrosis, Some(500), None),
            Err(GraphError::AlreadyResolved(_))
        ));
    }

    #[test]
    fn test_recomputed_degrees_match_counters() {
        let mut graph = PageGraph::new();
        let a = graph.add_node("https://example.com/", 0).unwrap();
        let b = graph.add_node("https://example.com/x", 1).unwrap();
        let c = graph.add_node("https://example.com/y", 1).unwrap();
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(b, c).unwrap();

        let in_degrees = graph.recompute_in_degrees();
        let out_degrees = graph.recompute_out_degrees();
        for node in graph.nodes() {
            assert_eq!(in_degrees[node.index], node.in_degree);
            assert_eq!(out_degrees[node.index], node.out_degree);
        }
        assert_eq!(in_degrees, vec![0, 1, 2]);
        assert_eq!(out_degrees, vec![2, 1, 0]);
    }

    #[test]
    fn test_node_label_format() {
        assert_eq!(PageGraph::node_label(0), "node_0");
        assert_eq!(PageGraph::node_label(17), "node_17");
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&HealthStatus::Necrosis).unwrap();
        assert_eq!(json, "\"necrosis\"");
        let status: HealthStatus = serde_json::from_str("\"blockage\"").unwrap();
        assert_eq!(status, HealthStatus::Blockage);
    }
}
