//! Iterating a cyclic group of cells to a fixed point.
//!
//! Cells in one strong component depend on each other, so no single pass
//! can compute them. They are swept repeatedly in a fixed order until the
//! largest change in a sweep drops below the convergence threshold, or one
//! of them hits the calculation limit.

use log::{trace, warn};

use crate::cell::{CellId, Sheet};
use crate::config::EvalConfig;
use crate::cycle::find_cycle;
use crate::error::Result;
use crate::evaluate::CalculationResult;
use crate::graph::{Digraph, NodeId};
use crate::topo::Topological;

/// How a group's sweep loop ended. Exactly one of `converged` and
/// `limit_reached` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupOutcome {
    pub converged: bool,
    pub limit_reached: bool,
    pub sweeps: usize,
    /// Largest absolute change in the final sweep.
    pub max_change: f64,
}

/// Running maximum that stays NaN once a NaN change has been seen, so a
/// formula producing NaN can never look converged.
pub(crate) fn widen(max: f64, change: f64) -> f64 {
    if max.is_nan() || change.is_nan() {
        f64::NAN
    } else {
        max.max(change.abs())
    }
}

/// Sweeps `order` until stable. `counts` is indexed by [`CellId`] and
/// accumulates across calls, so limits apply to a cell's total work in a run.
pub(crate) fn sweep_until_stable(
    sheet: &mut Sheet,
    order: &[CellId],
    counts: &mut [usize],
    config: &EvalConfig,
) -> GroupOutcome {
    let mut sweeps = 0usize;
    loop {
        let mut max_change = 0.0f64;
        for &id in order {
            let change = sheet.recalculate(id);
            counts[id] += 1;
            max_change = widen(max_change, change);
        }
        sweeps += 1;
        trace!("group sweep {}: max change {}", sweeps, max_change);

        if max_change < config.convergence_threshold {
            return GroupOutcome {
                converged: true,
                limit_reached: false,
                sweeps,
                max_change,
            };
        }
        if order.iter().any(|&id| counts[id] >= config.calculation_limit) {
            return GroupOutcome {
                converged: false,
                limit_reached: true,
                sweeps,
                max_change,
            };
        }
    }
}

/// Evaluates one cyclic group on its own, sweeping `order` until it
/// converges or a cell reaches the calculation limit.
///
/// Dependencies outside `order` are read but never recomputed.
pub fn evaluate_group(
    sheet: &mut Sheet,
    order: &[CellId],
    config: &EvalConfig,
) -> Result<CalculationResult> {
    config.validate()?;
    sheet.dependency_graph(order)?;

    let mut counts = vec![0usize; sheet.len()];
    let outcome = if order.is_empty() {
        GroupOutcome {
            converged: true,
            limit_reached: false,
            sweeps: 0,
            max_change: 0.0,
        }
    } else {
        sweep_until_stable(sheet, order, &mut counts, config)
    };

    Ok(CalculationResult::new(
        counts,
        outcome.converged,
        outcome.limit_reached,
        config,
        outcome.sweeps,
        outcome.max_change,
    ))
}

/// Order in which to sweep `members`, given as nodes of `graph`.
///
/// The subgraph induced by `members` is made acyclic by repeatedly
/// removing the first edge of a detected cycle, then sorted topologically.
/// Which edges go depends on traversal order, so different member orders
/// can yield different (all usable) sweep orders. The sweep order only
/// affects how fast a group converges, never the fixed point it converges to.
pub fn sweep_order(graph: &Digraph, members: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut sub = graph.induced(members)?;
    while let Some(cycle) = find_cycle(&sub) {
        sub.remove_edge(cycle[0], cycle[1])?;
    }

    match Topological::new(&sub).into_order() {
        Some(order) => Ok(order.into_iter().map(|local| members[local]).collect()),
        None => {
            warn!("no order after cycle removal, sweeping members as given");
            Ok(members.to_vec())
        }
    }
}
