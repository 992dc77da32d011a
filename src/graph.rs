//! Weighted directed graph over dense integer node indices.
//!
//! Every algorithm in this crate (cycle detection, strong components,
//! topological ordering, meta-graph construction) works on [`Digraph`].
//! The node count is fixed at construction; edges may be added and removed.
//! Self-loops and parallel edges are allowed.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use crate::error::{Error, Result};

/// A node identifier. Nodes of a graph with `n` nodes are `0..n`.
pub type NodeId = usize;

/// A directed, weighted edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Self { from, to, weight }
    }
}

/// Adjacency-list digraph. `adj[u]` holds the edges leaving `u` in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Digraph {
    adj: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl Digraph {
    /// Creates a graph with `num_nodes` nodes and no edges.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            adj: vec![Vec::new(); num_nodes],
            edge_count: 0,
        }
    }

    /// Creates a graph from unweighted `(from, to)` pairs (weight 1.0).
    pub fn from_edges<I>(num_nodes: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new(num_nodes);
        for (from, to) in edges {
            graph.add_edge(from, to)?;
        }
        Ok(graph)
    }

    pub fn num_nodes(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if node < self.adj.len() {
            Ok(())
        } else {
            Err(Error::NodeOutOfRange {
                node,
                num_nodes: self.adj.len(),
            })
        }
    }

    /// Adds `from → to` with weight 1.0.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.add_weighted_edge(from, to, 1.0)
    }

    pub fn add_weighted_edge(&mut self, from: NodeId, to: NodeId, weight: f64) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        self.adj[from].push(Edge::new(from, to, weight));
        self.edge_count += 1;
        Ok(())
    }

    /// Removes the single edge `from → to` and returns it.
    ///
    /// Fails if there is no such edge, or if parallel edges make the
    /// request ambiguous.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Result<Edge> {
        self.check(from)?;
        self.check(to)?;
        let out = &mut self.adj[from];
        let count = out.iter().filter(|e| e.to == to).count();
        match count {
            0 => Err(Error::EdgeNotFound { from, to }),
            1 => {
                let pos = out.iter().position(|e| e.to == to).ok_or(Error::EdgeNotFound { from, to })?;
                self.edge_count -= 1;
                Ok(out.remove(pos))
            }
            _ => Err(Error::AmbiguousEdge { from, to, count }),
        }
    }

    /// Edges leaving `node`.
    pub fn adj(&self, node: NodeId) -> Result<&[Edge]> {
        self.check(node)?;
        Ok(&self.adj[node])
    }

    /// Unchecked adjacency for in-crate traversals over `0..num_nodes`.
    pub(crate) fn out(&self, node: NodeId) -> &[Edge] {
        &self.adj[node]
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.adj
            .get(from)
            .is_some_and(|out| out.iter().any(|e| e.to == to))
    }

    pub fn out_degree(&self, node: NodeId) -> Result<usize> {
        Ok(self.adj(node)?.len())
    }

    /// In-degree of every node.
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut deg = vec![0usize; self.num_nodes()];
        for edge in self.edges() {
            deg[edge.to] += 1;
        }
        deg
    }

    /// All edges, grouped by source node in index order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.adj.iter().flatten()
    }

    /// The graph with every edge reversed.
    pub fn reverse(&self) -> Digraph {
        let mut rev = Digraph::new(self.num_nodes());
        for edge in self.edges() {
            rev.adj[edge.to].push(Edge::new(edge.to, edge.from, edge.weight));
            rev.edge_count += 1;
        }
        rev
    }

    /// Subgraph induced by `nodes`, re-indexed so that `nodes[i]` becomes `i`.
    ///
    /// Parallel edges collapse to the first one seen, so every edge of the
    /// result can be removed by endpoints.
    pub fn induced(&self, nodes: &[NodeId]) -> Result<Digraph> {
        let mut local = vec![None; self.num_nodes()];
        for (i, &node) in nodes.iter().enumerate() {
            self.check(node)?;
            local[node] = Some(i);
        }

        let mut sub = Digraph::new(nodes.len());
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        for &node in nodes {
            for edge in &self.adj[node] {
                if let (Some(u), Some(v)) = (local[edge.from], local[edge.to])
                    && seen.insert((u, v))
                {
                    sub.add_weighted_edge(u, v, edge.weight)?;
                }
            }
        }
        Ok(sub)
    }

    /// Nodes reachable from `source` (including itself), as a membership vector.
    pub fn reachable_from(&self, source: NodeId) -> Result<Vec<bool>> {
        self.check(source)?;
        let mut visited = vec![false; self.num_nodes()];
        let mut queue = VecDeque::new();
        visited[source] = true;
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            for edge in &self.adj[node] {
                if !visited[edge.to] {
                    visited[edge.to] = true;
                    queue.push_back(edge.to);
                }
            }
        }
        Ok(visited)
    }

    /// Plain successor lists, dropping weights.
    pub fn to_adjacency(&self) -> Vec<Vec<NodeId>> {
        self.adj
            .iter()
            .map(|out| out.iter().map(|e| e.to).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_graph_has_no_edges() {
        let g = Digraph::new(4);
        assert_eq!(g.num_nodes(), 4);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.edges().count(), 0);
    }

    #[test]
    fn test_add_edge_out_of_range_fails() {
        let mut g = Digraph::new(2);
        let err = g.add_edge(0, 2).unwrap_err();
        assert!(matches!(err, Error::NodeOutOfRange { node: 2, num_nodes: 2 }));
        assert!(g.adj(5).is_err());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_self_loops_and_parallel_edges_allowed() {
        let mut g = Digraph::new(2);
        g.add_edge(0, 0).unwrap();
        g.add_edge(0, 1).unwrap();
        g.add_weighted_edge(0, 1, 2.5).unwrap();
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.out_degree(0).unwrap(), 3);
        assert!(g.has_edge(0, 0));
        assert_eq!(g.in_degrees(), vec![1, 2]);
    }

    #[test]
    fn test_remove_edge() {
        let mut g = Digraph::from_edges(3, [(0, 1), (1, 2)]).unwrap();
        let removed = g.remove_edge(0, 1).unwrap();
        assert_eq!(removed, Edge::new(0, 1, 1.0));
        assert!(!g.has_edge(0, 1));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_remove_missing_edge_fails() {
        let mut g = Digraph::from_edges(3, [(0, 1)]).unwrap();
        assert!(matches!(
            g.remove_edge(1, 0),
            Err(Error::EdgeNotFound { from: 1, to: 0 })
        ));
    }

    #[test]
    fn test_remove_parallel_edge_is_ambiguous() {
        let mut g = Digraph::from_edges(2, [(0, 1), (0, 1)]).unwrap();
        assert!(matches!(
            g.remove_edge(0, 1),
            Err(Error::AmbiguousEdge { count: 2, .. })
        ));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_reverse() {
        let g = Digraph::from_edges(3, [(0, 1), (1, 2)]).unwrap();
        let r = g.reverse();
        assert!(r.has_edge(1, 0));
        assert!(r.has_edge(2, 1));
        assert!(!r.has_edge(0, 1));
        assert_eq!(r.edge_count(), 2);
    }

    #[test]
    fn test_induced_reindexes_and_dedupes() {
        // 0 → 1, 1 → 2 (twice), 2 → 3, 3 → 1
        let g = Digraph::from_edges(4, [(0, 1), (1, 2), (1, 2), (2, 3), (3, 1)]).unwrap();
        let sub = g.induced(&[1, 2, 3]).unwrap();
        assert_eq!(sub.num_nodes(), 3);
        assert_eq!(sub.to_adjacency(), vec![vec![1], vec![2], vec![0]]);
    }

    #[test]
    fn test_reachable_from() {
        // 0 → 1 → 2, 3 isolated
        let g = Digraph::from_edges(4, [(0, 1), (1, 2)]).unwrap();
        assert_eq!(g.reachable_from(0).unwrap(), vec![true, true, true, false]);
        assert_eq!(g.reachable_from(2).unwrap(), vec![false, false, true, false]);
    }
}
