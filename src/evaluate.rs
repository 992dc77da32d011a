//! Cycle-tolerant evaluation of a sheet.
//!
//! Evaluation runs in two phases:
//!
//! 1. **Planning.** The dependency graph of the evaluated cells is collapsed
//!    into a meta-graph (cycles become single units) and sorted
//!    topologically. Each unit is either one cell or a cyclic group with
//!    its own sweep order.
//! 2. **Passes.** Units are evaluated in plan order: a single cell is
//!    recomputed once, a group is swept until it converges or hits the
//!    calculation limit. Passes repeat until one pass changes nothing by
//!    more than the convergence threshold, or some cell has used up its
//!    calculation budget. A started pass always runs to the end.
//!
//! Non-convergence is an outcome, not an error: it shows up as
//! `calculation_limit_reached` in the [`CalculationResult`].

use log::{debug, trace, warn};
use serde::Serialize;

use crate::cell::{CellId, Sheet};
use crate::config::EvalConfig;
use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::group::{sweep_order, sweep_until_stable, widen};
use crate::meta::{MetaGraph, MetaNode};
use crate::topo::{self, Topological};

/// Outcome of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    /// Recomputations per cell, indexed by [`CellId`]; cells that were not
    /// evaluated stay at zero.
    pub num_calculations: Vec<usize>,
    pub total_calculations: usize,
    pub calculation_limit_reached: bool,
    pub converged: bool,
    pub calculation_limit: usize,
    pub convergence_threshold: f64,
    /// Full passes over the plan (sweeps, for a lone group).
    pub passes: usize,
    /// Largest absolute change in the final pass.
    pub max_change: f64,
}

impl CalculationResult {
    pub(crate) fn new(
        num_calculations: Vec<usize>,
        converged: bool,
        calculation_limit_reached: bool,
        config: &EvalConfig,
        passes: usize,
        max_change: f64,
    ) -> Self {
        Self {
            total_calculations: num_calculations.iter().sum(),
            num_calculations,
            calculation_limit_reached,
            converged,
            calculation_limit: config.calculation_limit,
            convergence_threshold: config.convergence_threshold,
            passes,
            max_change,
        }
    }

    /// Recomputations of `cell` in this run.
    pub fn calculations_of(&self, cell: CellId) -> usize {
        self.num_calculations.get(cell).copied().unwrap_or(0)
    }
}

/// One step of an evaluation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unit {
    /// A cell outside any cycle, recomputed once per pass.
    Single { cell: CellId },
    /// A cyclic group, swept in the given order until stable.
    Group { cells: Vec<CellId> },
}

impl Unit {
    pub fn cells(&self) -> &[CellId] {
        match self {
            Unit::Single { cell } => std::slice::from_ref(cell),
            Unit::Group { cells } => cells,
        }
    }
}

/// Evaluation order for a set of cells.
#[derive(Debug, Clone)]
pub struct EvaluationPlan {
    members: Vec<CellId>,
    meta: MetaGraph,
    units: Vec<Unit>,
    /// meta-node index → position in `units`
    unit_of_meta: Vec<usize>,
}

impl EvaluationPlan {
    /// Cells covered by the plan, in the order they were requested.
    pub fn members(&self) -> &[CellId] {
        &self.members
    }

    /// Units in evaluation order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Meta-graph over the requested cells. Meta-node members are positions
    /// in [`EvaluationPlan::members`], not cell ids.
    pub fn meta_graph(&self) -> &MetaGraph {
        &self.meta
    }

    pub fn groups(&self) -> impl Iterator<Item = &[CellId]> + '_ {
        self.units.iter().filter_map(|unit| match unit {
            Unit::Group { cells } => Some(cells.as_slice()),
            Unit::Single { .. } => None,
        })
    }

    /// Unit positions grouped by dependency depth. Units in one level do
    /// not depend on each other.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        topo::levels(self.meta.graph())
            .unwrap_or_default()
            .into_iter()
            .map(|level| {
                let mut units: Vec<usize> =
                    level.into_iter().map(|m| self.unit_of_meta[m]).collect();
                units.sort_unstable();
                units
            })
            .collect()
    }
}

/// Plans and runs evaluations with one set of limits.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Builds the evaluation plan for `members` without touching any value.
    pub fn plan(&self, sheet: &Sheet, members: &[CellId]) -> Result<EvaluationPlan> {
        let graph = sheet.dependency_graph(members)?;
        let meta = MetaGraph::build_with_merge_limit(&graph, self.config.merge_limit)?;
        let order = Topological::new(meta.graph())
            .into_order()
            .ok_or(Error::NoTopologicalOrder)?;

        let mut units = Vec::with_capacity(order.len());
        let mut unit_of_meta = vec![0usize; meta.len()];
        for (position, &m) in order.iter().enumerate() {
            unit_of_meta[m] = position;
            let unit = match &meta.nodes()[m] {
                MetaNode::Single(local) => Unit::Single {
                    cell: members[*local],
                },
                MetaNode::Set(locals) => {
                    let locals: Vec<NodeId> = locals.iter().copied().collect();
                    let cells = sweep_order(&graph, &locals)?
                        .into_iter()
                        .map(|local| members[local])
                        .collect();
                    Unit::Group { cells }
                }
            };
            units.push(unit);
        }

        debug!(
            "plan: {} cells, {} units, {} cyclic groups",
            members.len(),
            units.len(),
            meta.sets().count()
        );

        Ok(EvaluationPlan {
            members: members.to_vec(),
            meta,
            units,
            unit_of_meta,
        })
    }

    /// Evaluates every cell of the sheet.
    pub fn evaluate(&self, sheet: &mut Sheet) -> Result<CalculationResult> {
        let members = sheet.all_ids();
        self.evaluate_cells(sheet, &members)
    }

    /// Evaluates only `members`. Cells they depend on outside this set are
    /// read as external inputs and never recomputed.
    pub fn evaluate_cells(&self, sheet: &mut Sheet, members: &[CellId]) -> Result<CalculationResult> {
        self.config.validate()?;
        let plan = self.plan(sheet, members)?;
        self.execute(sheet, &plan)
    }

    /// Runs passes over a plan built for this sheet.
    pub fn execute(&self, sheet: &mut Sheet, plan: &EvaluationPlan) -> Result<CalculationResult> {
        self.config.validate()?;
        sheet.dependency_graph(&plan.members)?;

        let threshold = self.config.convergence_threshold;
        let limit = self.config.calculation_limit;
        let mut counts = vec![0usize; sheet.len()];
        let mut passes = 0usize;
        let mut max_change = 0.0f64;
        let mut converged = plan.units.is_empty();
        let mut limit_reached = false;

        while !converged {
            passes += 1;
            max_change = 0.0;
            let mut groups_converged = true;

            for unit in &plan.units {
                match unit {
                    Unit::Single { cell } => {
                        let change = sheet.recalculate(*cell);
                        counts[*cell] += 1;
                        max_change = widen(max_change, change);
                    }
                    Unit::Group { cells } => {
                        let outcome = sweep_until_stable(sheet, cells, &mut counts, &self.config);
                        max_change = widen(max_change, outcome.max_change);
                        groups_converged &= outcome.converged;
                    }
                }
            }
            trace!("pass {}: max change {}", passes, max_change);

            if groups_converged && max_change < threshold {
                converged = true;
            } else if plan.members.iter().any(|&id| counts[id] >= limit) {
                warn!(
                    "calculation limit {} reached after {} passes (last change {})",
                    limit, passes, max_change
                );
                limit_reached = true;
                break;
            }
        }

        Ok(CalculationResult::new(
            counts,
            converged,
            limit_reached,
            &self.config,
            passes,
            max_change,
        ))
    }
}

/// Evaluates every cell of `sheet` with the given limits.
pub fn evaluate(
    sheet: &mut Sheet,
    calculation_limit: usize,
    convergence_threshold: f64,
) -> Result<CalculationResult> {
    Evaluator::new(EvalConfig::new(calculation_limit, convergence_threshold)).evaluate(sheet)
}
