//! Strongly connected components (Tarjan's algorithm).
//!
//! Uses an **iterative** DFS so deep dependency chains cannot overflow the
//! call stack. Reference: Tarjan, "Depth-First Search and Linear Graph
//! Algorithms," SIAM 1972.

use crate::graph::{Digraph, NodeId};

/// Component assignment for every node of a graph.
///
/// `id(u) == id(v)` exactly when `u` and `v` are mutually reachable.
/// Component ids are handed out as components are completed, which is a
/// reverse topological order of the condensation: if an edge leads from
/// component `a` to a different component `b`, then `id(b) < id(a)`.
///
/// # Complexity
/// * Time: O(V + E)
/// * Space: O(V)
///
/// # Example
/// ```
/// use cellgraph::graph::Digraph;
/// use cellgraph::scc::StronglyConnected;
///
/// // 0 → 1 → 2 → 0, 2 → 3
/// let g = Digraph::from_edges(4, [(0, 1), (1, 2), (2, 0), (2, 3)]).unwrap();
/// let scc = StronglyConnected::new(&g);
/// assert_eq!(scc.count(), 2);
/// assert!(scc.strongly_connected(0, 2));
/// assert!(!scc.strongly_connected(0, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StronglyConnected {
    id: Vec<usize>,
    count: usize,
}

impl StronglyConnected {
    pub fn new(graph: &Digraph) -> Self {
        const UNDEFINED: usize = usize::MAX;
        let n = graph.num_nodes();
        let mut index = vec![UNDEFINED; n]; // discovery index
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut id = vec![UNDEFINED; n];

        let mut stack: Vec<NodeId> = Vec::new();
        let mut next_index = 0usize;
        let mut count = 0usize;

        struct Frame {
            node: NodeId,
            next_edge: usize,
        }

        for start in 0..n {
            if index[start] != UNDEFINED {
                continue;
            }

            index[start] = next_index;
            lowlink[start] = next_index;
            next_index += 1;
            stack.push(start);
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

                    if index[w] == UNDEFINED {
                        // Tree edge: descend into w
                        index[w] = next_index;
                        lowlink[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        call_stack.push(Frame {
                            node: w,
                            next_edge: 0,
                        });
                    } else if on_stack[w] {
                        lowlink[v] = lowlink[v].min(index[w]);
                    }
                } else {
                    if lowlink[v] == index[v] {
                        // v is a component root: pop its members
                        while let Some(w) = stack.pop() {
                            on_stack[w] = false;
                            id[w] = count;
                            if w == v {
                                break;
                            }
                        }
                        count += 1;
                    }

                    call_stack.pop();
                    if let Some(parent) = call_stack.last() {
                        let p = parent.node;
                        lowlink[p] = lowlink[p].min(lowlink[v]);
                    }
                }
            }
        }

        Self { id, count }
    }

    /// Number of components.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Component id of `node`.
    ///
    /// # Panics
    /// If `node` is not a node of the analysed graph.
    pub fn id(&self, node: NodeId) -> usize {
        self.id[node]
    }

    pub fn ids(&self) -> &[usize] {
        &self.id
    }

    pub fn strongly_connected(&self, u: NodeId, v: NodeId) -> bool {
        self.id[u] == self.id[v]
    }

    /// Members of every component, indexed by component id, each sorted.
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let mut components = vec![Vec::new(); self.count];
        for (node, &c) in self.id.iter().enumerate() {
            components[c].push(node);
        }
        components
    }
}

/// Components that contain a cycle: more than one member, or (when
/// `include_self_loops` is set) a single node with an edge to itself.
pub fn cyclic_components(graph: &Digraph, include_self_loops: bool) -> Vec<Vec<NodeId>> {
    StronglyConnected::new(graph)
        .components()
        .into_iter()
        .filter(|members| match members.as_slice() {
            [single] => include_self_loops && graph.has_edge(*single, *single),
            _ => true,
        })
        .collect()
}
