use anyhow::{Context, Result, bail};
use cellgraph::{CalculationResult, CellId, EvalConfig, Evaluator, Sheet};
use std::path::Path;

pub fn run(
    path: &Path,
    limit: Option<usize>,
    threshold: Option<f64>,
    only: &[String],
    json: bool,
) -> Result<()> {
    let (mut sheet, mut config) = super::load_sheet(path)?;
    if let Some(limit) = limit {
        config.calculation_limit = limit;
    }
    if let Some(threshold) = threshold {
        config.convergence_threshold = threshold;
    }
    config.validate().context("Invalid evaluation settings")?;

    let members = resolve_members(&sheet, only)?;
    let result = Evaluator::new(config)
        .evaluate_cells(&mut sheet, &members)
        .context("Evaluation failed")?;

    if json {
        print_json(&sheet, &members, &result, &config)?;
    } else {
        print_human(&sheet, &members, &result);
    }

    Ok(())
}

/// Cells named by `--only`, or every cell when none are given.
fn resolve_members(sheet: &Sheet, only: &[String]) -> Result<Vec<CellId>> {
    if only.is_empty() {
        return Ok(sheet.all_ids());
    }
    let mut members = Vec::with_capacity(only.len());
    for name in only {
        let Some(id) = sheet.id_of(name.trim()) else {
            bail!("Unknown cell '{}'", name.trim());
        };
        if members.contains(&id) {
            bail!("Cell '{}' listed more than once", name.trim());
        }
        members.push(id);
    }
    Ok(members)
}

fn print_json(
    sheet: &Sheet,
    members: &[CellId],
    result: &CalculationResult,
    config: &EvalConfig,
) -> Result<()> {
    let cells: Vec<_> = members
        .iter()
        .filter_map(|&id| sheet.get(id).map(|cell| (id, cell)))
        .map(|(id, cell)| {
            serde_json::json!({
                "name": cell.name(),
                "value": cell.value(),
                "calculations": result.calculations_of(id),
            })
        })
        .collect();

    let output = serde_json::json!({
        "cells": cells,
        "converged": result.converged,
        "calculation_limit_reached": result.calculation_limit_reached,
        "total_calculations": result.total_calculations,
        "passes": result.passes,
        "max_change": result.max_change,
        "settings": config,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_human(sheet: &Sheet, members: &[CellId], result: &CalculationResult) {
    let width = members
        .iter()
        .filter_map(|&id| sheet.get(id))
        .map(|c| c.name().len())
        .max()
        .unwrap_or(0);

    for &id in members {
        let Some(cell) = sheet.get(id) else { continue };
        println!(
            "  {:<width$}  {:>14}  ({} calc{})",
            cell.name(),
            format_value(cell.value()),
            result.calculations_of(id),
            if result.calculations_of(id) == 1 { "" } else { "s" },
            width = width,
        );
    }
    println!();

    if result.converged {
        println!(
            "Converged after {} pass{} ({} calculations).",
            result.passes,
            if result.passes == 1 { "" } else { "es" },
            result.total_calculations
        );
    } else {
        eprintln!(
            "Warning: calculation limit {} reached after {} passes; values did not converge (last change {}).",
            result.calculation_limit,
            result.passes,
            format_value(result.max_change)
        );
        println!("Total calculations: {}", result.total_calculations);
    }
}

fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.is_finite() {
        format!("{:.6}", value)
    } else {
        format!("{}", value)
    }
}

