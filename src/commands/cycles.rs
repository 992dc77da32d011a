use anyhow::{Context, Result};
use cellgraph::{CellId, Evaluator, Sheet, find_cycle};
use std::path::Path;

/// A cyclic group with one concrete cycle through it.
struct GroupReport {
    sweep: Vec<CellId>,
    path: Vec<CellId>,
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let (sheet, config) = super::load_sheet(path)?;
    let plan = Evaluator::new(config)
        .plan(&sheet, &sheet.all_ids())
        .context("Failed to plan evaluation")?;

    let mut reports = Vec::new();
    for cells in plan.groups() {
        let graph = sheet.dependency_graph(cells)?;
        let path = find_cycle(&graph)
            .unwrap_or_default()
            .into_iter()
            .map(|local| cells[local])
            .collect();
        reports.push(GroupReport {
            sweep: cells.to_vec(),
            path,
        });
    }

    if json {
        print_json(&sheet, &reports)?;
    } else {
        print_human(&sheet, &reports);
    }

    Ok(())
}

fn print_json(sheet: &Sheet, reports: &[GroupReport]) -> Result<()> {
    let groups: Vec<_> = reports
        .iter()
        .map(|r| {
            serde_json::json!({
                "cells": super::names(sheet, &r.sweep),
                "cell_count": r.sweep.len(),
                "cycle": super::names(sheet, &r.path),
            })
        })
        .collect();

    let output = serde_json::json!({
        "group_count": reports.len(),
        "groups": groups,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_human(sheet: &Sheet, reports: &[GroupReport]) {
    if reports.is_empty() {
        println!("No circular references.");
        return;
    }

    println!("Cyclic groups: {}\n", reports.len());
    for (i, report) in reports.iter().enumerate() {
        println!(
            "  {}. {} cell{}",
            i + 1,
            report.sweep.len(),
            if report.sweep.len() == 1 { "" } else { "s" }
        );
        println!("     sweep: {}", super::names(sheet, &report.sweep).join(", "));
        if !report.path.is_empty() {
            println!("     cycle: {}", super::names(sheet, &report.path).join(" -> "));
        }
    }
}
