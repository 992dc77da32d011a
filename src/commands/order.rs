use anyhow::{Context, Result};
use cellgraph::{EvaluationPlan, Evaluator, Sheet, Unit};
use std::path::Path;

pub fn run(path: &Path, json: bool) -> Result<()> {
    let (sheet, config) = super::load_sheet(path)?;
    let plan = Evaluator::new(config)
        .plan(&sheet, &sheet.all_ids())
        .context("Failed to plan evaluation")?;

    if json {
        print_json(&sheet, &plan)?;
    } else {
        print_human(&sheet, &plan);
    }

    Ok(())
}

fn unit_kind(unit: &Unit) -> &'static str {
    match unit {
        Unit::Single { .. } => "single",
        Unit::Group { .. } => "group",
    }
}

fn print_json(sheet: &Sheet, plan: &EvaluationPlan) -> Result<()> {
    let units: Vec<_> = plan
        .units()
        .iter()
        .map(|unit| {
            serde_json::json!({
                "kind": unit_kind(unit),
                "cells": super::names(sheet, unit.cells()),
            })
        })
        .collect();

    let output = serde_json::json!({
        "unit_count": units.len(),
        "units": units,
        "levels": plan.levels(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_human(sheet: &Sheet, plan: &EvaluationPlan) {
    if plan.units().is_empty() {
        println!("Nothing to evaluate.");
        return;
    }

    println!("Evaluation order:\n");
    for (i, unit) in plan.units().iter().enumerate() {
        let names = super::names(sheet, unit.cells());
        match unit {
            Unit::Single { .. } => println!("  {:>3}. {}", i + 1, names.join(", ")),
            Unit::Group { .. } => println!("  {:>3}. [{}] (cyclic)", i + 1, names.join(", ")),
        }
    }

    let levels = plan.levels();
    println!("\nLevels: {}", levels.len());
    for (depth, units) in levels.iter().enumerate() {
        let shown: Vec<String> = units.iter().map(|u| (u + 1).to_string()).collect();
        println!("  {}: {}", depth, shown.join(" "));
    }
}
