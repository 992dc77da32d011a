//! TOML sheet files.
//!
//! A sheet file lists cells by name, each with optional initial value,
//! dependencies (by name) and a formula, plus optional evaluation settings:
//!
//! ```toml
//! [settings]
//! calculation_limit = 50
//!
//! [[cells]]
//! name = "x"
//! value = 10.0
//! depends_on = ["y"]
//! formula = { op = "linear", constant = 0.0, coefficients = [0.9] }
//!
//! [[cells]]
//! name = "y"
//! depends_on = ["x"]
//! formula = { op = "linear", coefficients = [0.9] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::cell::{Cell, CellId, Formula, Sheet};
use crate::config::EvalConfig;
use crate::error::{Error, Result};

/// Formulas expressible in a sheet file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FormulaDef {
    /// A fixed value; inputs are ignored.
    Constant { value: f64 },
    /// `constant + Σ coefficients[i] * inputs[i]`. Missing coefficients
    /// count as zero.
    Linear {
        #[serde(default)]
        constant: f64,
        #[serde(default)]
        coefficients: Vec<f64>,
    },
    Sum,
    Product,
    Mean,
    Min,
    Max,
}

impl Formula for FormulaDef {
    fn compute(&self, inputs: &[f64]) -> f64 {
        match self {
            FormulaDef::Constant { value } => *value,
            FormulaDef::Linear {
                constant,
                coefficients,
            } => {
                constant
                    + coefficients
                        .iter()
                        .zip(inputs)
                        .map(|(k, x)| k * x)
                        .sum::<f64>()
            }
            FormulaDef::Sum => inputs.iter().sum(),
            FormulaDef::Product => inputs.iter().product(),
            FormulaDef::Mean => {
                if inputs.is_empty() {
                    0.0
                } else {
                    inputs.iter().sum::<f64>() / inputs.len() as f64
                }
            }
            FormulaDef::Min => inputs.iter().copied().reduce(f64::min).unwrap_or(0.0),
            FormulaDef::Max => inputs.iter().copied().reduce(f64::max).unwrap_or(0.0),
        }
    }
}

/// One `[[cells]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub formula: FormulaDef,
}

/// A parsed sheet file, before names are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFile {
    #[serde(default = "EvalConfig::default")]
    pub settings: EvalConfig,
    #[serde(default)]
    pub cells: Vec<CellDef>,
}

impl SheetFile {
    /// Resolves dependency names and builds the sheet. Cell ids follow
    /// file order.
    pub fn into_sheet(self) -> Result<Sheet> {
        let mut ids: HashMap<&str, CellId> = HashMap::new();
        for (id, def) in self.cells.iter().enumerate() {
            if ids.insert(def.name.as_str(), id).is_some() {
                return Err(Error::Sheet(format!("Duplicate cell name '{}'", def.name)));
            }
        }

        let mut resolved = Vec::with_capacity(self.cells.len());
        for def in &self.cells {
            let deps = def
                .depends_on
                .iter()
                .map(|dep| {
                    ids.get(dep.as_str()).copied().ok_or_else(|| {
                        Error::Sheet(format!(
                            "Cell '{}' depends on unknown cell '{}'",
                            def.name, dep
                        ))
                    })
                })
                .collect::<Result<Vec<CellId>>>()?;
            resolved.push(deps);
        }

        let mut sheet = Sheet::new();
        for (def, deps) in self.cells.into_iter().zip(resolved) {
            let mut cell = Cell::new(def.name, deps, def.formula);
            if let Some(value) = def.value {
                cell = cell.with_value(value);
            }
            sheet.add(cell);
        }
        Ok(sheet)
    }
}

/// Parses sheet-file text into a sheet and its settings.
pub fn parse_sheet(text: &str) -> Result<(Sheet, EvalConfig)> {
    let file: SheetFile = toml::from_str(text)?;
    file.settings.validate()?;
    let settings = file.settings;
    Ok((file.into_sheet()?, settings))
}

/// Reads and parses a sheet file.
pub fn load_sheet(path: &Path) -> Result<(Sheet, EvalConfig)> {
    let text = fs::read_to_string(path)?;
    parse_sheet(&text)
}
