//! Topological ordering of acyclic graphs.
//!
//! [`Topological`] first asks the cycle detector whether an order can exist;
//! if so the order is the reverse of a depth-first postorder.

use std::collections::VecDeque;

use crate::cycle::has_cycle;
use crate::graph::{Digraph, NodeId};

/// Depth-first postorder of every node, visiting roots in index order.
pub fn postorder(graph: &Digraph) -> Vec<NodeId> {
    let n = graph.num_nodes();
    let mut marked = vec![false; n];
    let mut post = Vec::with_capacity(n);

    for start in 0..n {
        if marked[start] {
            continue;
        }
        marked[start] = true;
        // (node, next edge position)
        let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some((v, next)) = stack.last_mut() {
            let v = *v;
            let out = graph.out(v);
            if *next < out.len() {
                let w = out[*next].to;
                *next += 1;
                if !marked[w] {
                    marked[w] = true;
                    stack.push((w, 0));
                }
            } else {
                post.push(v);
                stack.pop();
            }
        }
    }

    post
}

/// A topological order, when one exists.
///
/// # Example
/// ```
/// use cellgraph::graph::Digraph;
/// use cellgraph::topo::Topological;
///
/// let g = Digraph::from_edges(3, [(2, 1), (1, 0)]).unwrap();
/// let topo = Topological::new(&g);
/// assert_eq!(topo.order(), Some(&[2, 1, 0][..]));
/// assert_eq!(topo.rank(0), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct Topological {
    order: Option<Vec<NodeId>>,
    rank: Vec<Option<usize>>,
}

impl Topological {
    pub fn new(graph: &Digraph) -> Self {
        let n = graph.num_nodes();
        if has_cycle(graph) {
            return Self {
                order: None,
                rank: vec![None; n],
            };
        }

        let mut order = postorder(graph);
        order.reverse();
        let mut rank = vec![None; n];
        for (position, &node) in order.iter().enumerate() {
            rank[node] = Some(position);
        }
        Self {
            order: Some(order),
            rank,
        }
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    /// Nodes in topological order, or `None` if the graph has a cycle.
    pub fn order(&self) -> Option<&[NodeId]> {
        self.order.as_deref()
    }

    pub fn into_order(self) -> Option<Vec<NodeId>> {
        self.order
    }

    /// Position of `node` in the order; `None` when no order exists or the
    /// node is out of range.
    pub fn rank(&self, node: NodeId) -> Option<usize> {
        self.rank.get(node).copied().flatten()
    }
}

/// Groups nodes of an acyclic graph by dependency depth (Kahn layering).
///
/// Level 0 holds nodes with no incoming edges; every other node sits one
/// level below its deepest predecessor. Nodes in the same level share no
/// path between them. Returns `None` if the graph has a cycle.
pub fn levels(graph: &Digraph) -> Option<Vec<Vec<NodeId>>> {
    let n = graph.num_nodes();
    let mut in_degree = graph.in_degrees();
    let mut depth = vec![0usize; n];
    let mut queue: VecDeque<NodeId> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut levels: Vec<Vec<NodeId>> = Vec::new();
    let mut seen = 0usize;

    while let Some(v) = queue.pop_front() {
        seen += 1;
        if levels.len() <= depth[v] {
            levels.resize_with(depth[v] + 1, Vec::new);
        }
        levels[depth[v]].push(v);
        for edge in graph.out(v) {
            let w = edge.to;
            depth[w] = depth[w].max(depth[v] + 1);
            in_degree[w] -= 1;
            if in_degree[w] == 0 {
                queue.push_back(w);
            }
        }
    }

    if seen < n {
        return None;
    }
    for level in &mut levels {
        level.sort_unstable();
    }
    Some(levels)
}
