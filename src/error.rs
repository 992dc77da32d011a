use thiserror::Error;

use crate::graph::NodeId;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised by graph construction, planning and sheet loading.
///
/// Numerical non-convergence is not an error: it is reported through
/// [`CalculationResult`](crate::evaluate::CalculationResult) flags instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("node {node} out of range for a graph with {num_nodes} nodes")]
    NodeOutOfRange { node: NodeId, num_nodes: usize },

    #[error("cell {cell} does not exist (sheet has {len} cells)")]
    UnknownCell { cell: usize, len: usize },

    #[error("cell {cell} is listed more than once")]
    DuplicateCell { cell: usize },

    #[error("no edge {from} -> {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },

    #[error("edge {from} -> {to} is ambiguous ({count} parallel edges)")]
    AmbiguousEdge {
        from: NodeId,
        to: NodeId,
        count: usize,
    },

    /// Merges strictly shrink the graph, so hitting this is a bug.
    #[error("meta-graph construction exceeded {limit} merges")]
    MergeLimitExceeded { limit: usize },

    #[error("graph has no topological order after cycle removal")]
    NoTopologicalOrder,

    #[error("invalid evaluation settings: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Sheet(String),
}

pub type Result<T> = std::result::Result<T, Error>;
