pub mod cycles;
pub mod eval;
pub mod order;

use anyhow::{Context, Result};
use cellgraph::{CellId, EvalConfig, Sheet};
use std::path::Path;

/// Loads a sheet file, attaching the path to any error.
pub fn load_sheet(path: &Path) -> Result<(Sheet, EvalConfig)> {
    cellgraph::load_sheet(path).with_context(|| format!("Failed to load sheet {}", path.display()))
}

/// Cell names for a list of ids.
pub fn names(sheet: &Sheet, cells: &[CellId]) -> Vec<String> {
    cells
        .iter()
        .map(|&id| {
            sheet
                .get(id)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .collect()
}
