pub mod cell;
pub mod config;
pub mod cycle;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod group;
pub mod meta;
pub mod scc;
pub mod topo;
pub mod workbook;

pub use cell::{Cell, CellId, Formula, Sheet};
pub use config::EvalConfig;
pub use cycle::{DirectedCycle, find_cycle, has_cycle};
pub use error::{Error, Result};
pub use evaluate::{CalculationResult, EvaluationPlan, Evaluator, Unit, evaluate};
pub use graph::{Digraph, Edge, NodeId};
pub use group::{GroupOutcome, evaluate_group, sweep_order};
pub use meta::{DEFAULT_MERGE_LIMIT, MetaGraph, MetaNode};
pub use scc::{StronglyConnected, cyclic_components};
pub use topo::Topological;
pub use workbook::{FormulaDef, SheetFile, load_sheet, parse_sheet};
