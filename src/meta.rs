//! Meta-graph construction: collapsing cycles into single nodes.
//!
//! [`MetaGraph::build`] repeatedly asks the cycle detector for a cycle and
//! merges every meta-node on it into one [`MetaNode::Set`], re-deriving the
//! edges between the surviving meta-nodes, until the graph is acyclic.
//! Nodes are addressed by position and every rebuild goes through an
//! explicit old-index → new-index table, so no meta-node ever points at
//! another.
//!
//! [`MetaGraph::condense`] produces the same partition in one pass using the
//! strong components directly.

use log::{debug, trace};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::cycle::DirectedCycle;
use crate::error::{Error, Result};
use crate::graph::{Digraph, NodeId};
use crate::scc::StronglyConnected;

/// Upper bound on cycle merges before construction is declared broken.
///
/// Each merge removes at least one node, so a finite graph needs fewer
/// merges than it has nodes; the cap only trips on an implementation defect.
pub const DEFAULT_MERGE_LIMIT: usize = 1000;

/// One node of a meta-graph: an original node, or a collapsed cyclic set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaNode {
    Single(NodeId),
    Set(BTreeSet<NodeId>),
}

impl MetaNode {
    /// Original nodes covered by this meta-node, ascending.
    pub fn members(&self) -> Vec<NodeId> {
        match self {
            MetaNode::Single(node) => vec![*node],
            MetaNode::Set(nodes) => nodes.iter().copied().collect(),
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        match self {
            MetaNode::Single(n) => *n == node,
            MetaNode::Set(nodes) => nodes.contains(&node),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetaNode::Single(_) => 1,
            MetaNode::Set(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this meta-node stands for a collapsed cycle.
    pub fn is_set(&self) -> bool {
        matches!(self, MetaNode::Set(_))
    }
}

/// An acyclic graph over meta-nodes plus the mapping back to original nodes.
#[derive(Debug, Clone)]
pub struct MetaGraph {
    graph: Digraph,
    nodes: Vec<MetaNode>,
    /// original node → index of the meta-node that owns it
    owner: Vec<usize>,
    merges: usize,
}

impl MetaGraph {
    /// Collapses cycles of `graph` with the default merge cap.
    pub fn build(graph: &Digraph) -> Result<Self> {
        Self::build_with_merge_limit(graph, DEFAULT_MERGE_LIMIT)
    }

    /// Collapses cycles of `graph`, failing with
    /// [`Error::MergeLimitExceeded`] if more than `merge_limit` merges are
    /// needed.
    pub fn build_with_merge_limit(graph: &Digraph, merge_limit: usize) -> Result<Self> {
        let mut nodes: Vec<MetaNode> = (0..graph.num_nodes()).map(MetaNode::Single).collect();
        let mut owner: Vec<usize> = (0..graph.num_nodes()).collect();
        let mut current = graph.clone();
        let mut merges = 0usize;

        while let Some(cycle) = DirectedCycle::new(&current).into_cycle() {
            if merges >= merge_limit {
                return Err(Error::MergeLimitExceeded { limit: merge_limit });
            }
            trace!("merging cycle {:?}", cycle);

            let absorbed: HashSet<usize> = cycle.iter().copied().collect();
            let (next_nodes, remap) = merge_nodes(nodes, &absorbed);
            current = remap_graph(&current, &remap, next_nodes.len())?;
            for slot in owner.iter_mut() {
                *slot = remap[*slot];
            }
            nodes = next_nodes;
            merges += 1;
        }

        debug!(
            "meta-graph: {} original nodes -> {} meta-nodes after {} merges",
            graph.num_nodes(),
            nodes.len(),
            merges
        );

        Ok(Self {
            graph: current,
            nodes,
            owner,
            merges,
        })
    }

    /// Builds the meta-graph from strong components in a single pass.
    ///
    /// Meta-node `i` is component `i`; a single node becomes a `Set` when
    /// it loops onto itself.
    pub fn condense(graph: &Digraph) -> Result<Self> {
        let scc = StronglyConnected::new(graph);
        let nodes: Vec<MetaNode> = scc
            .components()
            .into_iter()
            .map(|members| match members.as_slice() {
                [single] if !graph.has_edge(*single, *single) => MetaNode::Single(*single),
                _ => MetaNode::Set(members.into_iter().collect()),
            })
            .collect();
        let owner = scc.ids().to_vec();
        let merges = nodes.iter().filter(|n| n.is_set()).count();
        let condensed = remap_graph(graph, &owner, nodes.len())?;

        Ok(Self {
            graph: condensed,
            nodes,
            owner,
            merges,
        })
    }

    /// The acyclic graph over meta-node indices.
    pub fn graph(&self) -> &Digraph {
        &self.graph
    }

    pub fn nodes(&self) -> &[MetaNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&MetaNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the meta-node that owns original node `node`.
    pub fn meta_of(&self, node: NodeId) -> Option<usize> {
        self.owner.get(node).copied()
    }

    /// Merge steps performed; for [`MetaGraph::condense`], the number of sets.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// The meta-nodes that are collapsed cycles.
    pub fn sets(&self) -> impl Iterator<Item = &MetaNode> + '_ {
        self.nodes.iter().filter(|n| n.is_set())
    }
}

/// Replaces the meta-nodes in `absorbed` by one `Set` appended at the end.
///
/// Returns the new node list and the old → new index table. Nested sets are
/// flattened into the new member set.
fn merge_nodes(nodes: Vec<MetaNode>, absorbed: &HashSet<usize>) -> (Vec<MetaNode>, Vec<usize>) {
    let mut remap = vec![0usize; nodes.len()];
    let mut kept = Vec::with_capacity(nodes.len() + 1 - absorbed.len());
    let mut members = BTreeSet::new();
    let mut absorbed_slots = Vec::with_capacity(absorbed.len());

    for (old, node) in nodes.into_iter().enumerate() {
        if absorbed.contains(&old) {
            members.extend(node.members());
            absorbed_slots.push(old);
        } else {
            remap[old] = kept.len();
            kept.push(node);
        }
    }

    let set_index = kept.len();
    for old in absorbed_slots {
        remap[old] = set_index;
    }
    kept.push(MetaNode::Set(members));
    (kept, remap)
}

/// Re-derives edges under `remap`, dropping edges that collapse onto one
/// meta-node and keeping one edge per remaining (from, to) pair.
fn remap_graph(graph: &Digraph, remap: &[usize], num_nodes: usize) -> Result<Digraph> {
    let mut next = Digraph::new(num_nodes);
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for edge in graph.edges() {
        let (from, to) = (remap[edge.from], remap[edge.to]);
        if from != to && seen.insert((from, to)) {
            next.add_weighted_edge(from, to, edge.weight)?;
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topo::Topological;

    fn partition(meta: &MetaGraph) -> Vec<Vec<NodeId>> {
        let mut parts: Vec<Vec<NodeId>> = meta.nodes().iter().map(|n| n.members()).collect();
        parts.sort();
        parts
    }

    #[test]
    fn test_acyclic_graph_is_unchanged() {
        let g = Digraph::from_edges(3, [(0, 1), (1, 2)]).unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta.merges(), 0);
        assert!(meta.nodes().iter().all(|n| !n.is_set()));
        assert_eq!(meta.graph().edge_count(), 2);
    }

    #[test]
    fn test_single_cycle_collapses() {
        // 0 → 1 → 2 → 0, 2 → 3
        let g = Digraph::from_edges(4, [(0, 1), (1, 2), (2, 0), (2, 3)]).unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.merges(), 1);
        let set = meta.meta_of(0).unwrap();
        assert_eq!(meta.node(set).unwrap().members(), vec![0, 1, 2]);
        assert_eq!(meta.meta_of(1), Some(set));
        let single = meta.meta_of(3).unwrap();
        assert_eq!(meta.node(single), Some(&MetaNode::Single(3)));
        assert!(meta.graph().has_edge(set, single));
        assert_eq!(meta.graph().edge_count(), 1);
    }

    #[test]
    fn test_overlapping_cycles_flatten_into_one_set() {
        // 0 → 1 → 0 and 1 → 2 → 1: needs two merges, nested set flattened
        let g = Digraph::from_edges(3, [(0, 1), (1, 0), (1, 2), (2, 1)]).unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.nodes()[0], MetaNode::Set(BTreeSet::from([0, 1, 2])));
        assert_eq!(meta.graph().edge_count(), 0);
    }

    #[test]
    fn test_self_loop_becomes_singleton_set() {
        let g = Digraph::from_edges(2, [(0, 0), (0, 1)]).unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert_eq!(meta.len(), 2);
        let idx = meta.meta_of(0).unwrap();
        assert_eq!(meta.node(idx), Some(&MetaNode::Set(BTreeSet::from([0]))));
        assert!(Topological::new(meta.graph()).has_order());
    }

    #[test]
    fn test_parallel_cross_edges_collapse() {
        // 0 ↔ 1, both point at 2
        let g = Digraph::from_edges(3, [(0, 1), (1, 0), (0, 2), (1, 2)]).unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert_eq!(meta.graph().edge_count(), 1);
    }

    #[test]
    fn test_node_count_postcondition() {
        // two disjoint cycles {0,1} and {2,3,4}, plus 5 and 6
        let g = Digraph::from_edges(
            7,
            [(0, 1), (1, 0), (2, 3), (3, 4), (4, 2), (1, 5), (4, 6)],
        )
        .unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        let absorbed: usize = meta.sets().map(|s| s.len()).sum();
        let sets = meta.sets().count();
        assert_eq!(meta.len(), g.num_nodes() - absorbed + sets);
        assert_eq!(meta.len(), 4);
    }

    #[test]
    fn test_result_is_acyclic() {
        let g = Digraph::from_edges(
            6,
            [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 3), (4, 5), (5, 1)],
        )
        .unwrap();
        let meta = MetaGraph::build(&g).unwrap();
        assert!(Topological::new(meta.graph()).has_order());
        // 5 → 1 closes a path through everything: one big set
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_merge_limit_guard() {
        let g = Digraph::from_edges(2, [(0, 1), (1, 0)]).unwrap();
        assert!(matches!(
            MetaGraph::build_with_merge_limit(&g, 0),
            Err(Error::MergeLimitExceeded { limit: 0 })
        ));
    }

    #[test]
    fn test_merge_limit_not_hit_on_acyclic_graph() {
        let g = Digraph::from_edges(2, [(0, 1)]).unwrap();
        assert!(MetaGraph::build_with_merge_limit(&g, 0).is_ok());
    }

    #[test]
    fn test_merge_limit_counts_every_merge() {
        let g = Digraph::from_edges(4, [(0, 1), (1, 0), (2, 3), (3, 2)]).unwrap();
        assert!(MetaGraph::build_with_merge_limit(&g, 1).is_err());
        assert_eq!(MetaGraph::build_with_merge_limit(&g, 2).unwrap().merges(), 2);
    }

    #[test]
    fn test_condense_matches_build() {
        let g = Digraph::from_edges(
            7,
            [(0, 1), (1, 0), (1, 2), (2, 3), (3, 2), (3, 3), (4, 4), (5, 6)],
        )
        .unwrap();
        let built = MetaGraph::build(&g).unwrap();
        let condensed = MetaGraph::condense(&g).unwrap();
        assert_eq!(partition(&built), partition(&condensed));
        assert!(Topological::new(condensed.graph()).has_order());
        let idx = condensed.meta_of(4).unwrap();
        assert!(condensed.node(idx).unwrap().is_set());
    }
}
