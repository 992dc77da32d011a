//! Directed cycle detection.
//!
//! A depth-first search that tracks which nodes are on the current
//! exploration path. The first edge into a node still on that path closes a
//! cycle, which is rebuilt from the DFS parent pointers.
//!
//! The detector reports *some* cycle, not necessarily the shortest one. Which
//! cycle is found depends on node and edge order, so callers that remove
//! edges to break cycles may see different (equally valid) results for
//! differently ordered but otherwise identical graphs.

use crate::graph::{Digraph, NodeId};

/// Result of a cycle search over a [`Digraph`].
///
/// A cycle is reported as `[v0, v1, ..., vk, v0]`: consecutive pairs are
/// graph edges and the first node equals the last. A self-loop on `v` is
/// reported as `[v, v]`.
///
/// # Complexity
/// * Time: O(V + E)
/// * Space: O(V)
///
/// # Example
/// ```
/// use cellgraph::cycle::DirectedCycle;
/// use cellgraph::graph::Digraph;
///
/// // 0 → 1 → 2 → 0
/// let g = Digraph::from_edges(3, [(0, 1), (1, 2), (2, 0)]).unwrap();
/// let cycle = DirectedCycle::new(&g);
/// assert!(cycle.has_cycle());
/// assert_eq!(cycle.cycle().unwrap().len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct DirectedCycle {
    cycle: Option<Vec<NodeId>>,
}

impl DirectedCycle {
    pub fn new(graph: &Digraph) -> Self {
        let n = graph.num_nodes();
        let mut marked = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut edge_to: Vec<Option<NodeId>> = vec![None; n];

        // Iterative DFS: each frame is (node, next edge position).
        struct Frame {
            node: NodeId,
            next_edge: usize,
        }

        for start in 0..n {
            if marked[start] {
                continue;
            }

            marked[start] = true;
            on_stack[start] = true;
            let mut call_stack = vec![Frame {
                node: start,
                next_edge: 0,
            }];

            while let Some(frame) = call_stack.last_mut() {
                let v = frame.node;
                let out = graph.out(v);

                if frame.next_edge < out.len() {
                    let w = out[frame.next_edge].to;
                    frame.next_edge += 1;

                    if !marked[w] {
                        marked[w] = true;
                        on_stack[w] = true;
                        edge_to[w] = Some(v);
                        call_stack.push(Frame {
                            node: w,
                            next_edge: 0,
                        });
                    } else if on_stack[w] {
                        return Self {
                            cycle: Some(trace_cycle(&edge_to, v, w)),
                        };
                    }
                } else {
                    on_stack[v] = false;
                    call_stack.pop();
                }
            }
        }

        Self { cycle: None }
    }

    pub fn has_cycle(&self) -> bool {
        self.cycle.is_some()
    }

    /// The cycle found, if any.
    pub fn cycle(&self) -> Option<&[NodeId]> {
        self.cycle.as_deref()
    }

    pub fn into_cycle(self) -> Option<Vec<NodeId>> {
        self.cycle
    }
}

/// Walks parent pointers from `v` back to `w` (an ancestor still on the
/// stack), then closes the loop with the back edge `v → w`.
fn trace_cycle(edge_to: &[Option<NodeId>], v: NodeId, w: NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = v;
    while current != w {
        path.push(current);
        match edge_to[current] {
            Some(parent) => current = parent,
            // w is on the stack, so it is an ancestor of v
            None => break,
        }
    }
    path.push(w);
    path.reverse();
    path.push(w);
    path
}

/// Whether `graph` contains a directed cycle (self-loops included).
pub fn has_cycle(graph: &Digraph) -> bool {
    DirectedCycle::new(graph).has_cycle()
}

/// One directed cycle of `graph`, or `None` if it is acyclic.
pub fn find_cycle(graph: &Digraph) -> Option<Vec<NodeId>> {
    DirectedCycle::new(graph).into_cycle()
}
