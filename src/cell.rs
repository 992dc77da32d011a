//! Computational cells and the sheet that owns them.
//!
//! A [`Cell`] holds a current value, the ids of the cells it reads, and a
//! [`Formula`] that recomputes the value from those inputs. A [`Sheet`] is
//! the arena of cells; a cell's id is its position in the sheet.

use std::fmt;

use crate::error::{Error, Result};
use crate::graph::Digraph;

/// Position of a cell in its [`Sheet`].
pub type CellId = usize;

/// Recomputes a cell's value from its inputs.
///
/// `inputs[i]` is the current value of the cell's `i`-th dependency.
pub trait Formula {
    fn compute(&self, inputs: &[f64]) -> f64;
}

impl<F> Formula for F
where
    F: Fn(&[f64]) -> f64,
{
    fn compute(&self, inputs: &[f64]) -> f64 {
        self(inputs)
    }
}

/// A value with dependencies and a recomputation rule.
///
/// A cell starts *uncalculated* unless given an initial value. An
/// uncalculated cell reads as `0.0`, and its first recomputation counts as
/// an unbounded change.
pub struct Cell {
    name: String,
    value: Option<f64>,
    depends_on: Vec<CellId>,
    formula: Box<dyn Formula>,
}

impl Cell {
    pub fn new(
        name: impl Into<String>,
        depends_on: Vec<CellId>,
        formula: impl Formula + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            depends_on,
            formula: Box::new(formula),
        }
    }

    /// A cell with no inputs whose formula always yields `value`.
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Vec::new(), move |_: &[f64]| value)
    }

    /// Sets the initial value, marking the cell as calculated.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, `0.0` while uncalculated.
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn current(&self) -> Option<f64> {
        self.value
    }

    pub fn is_calculated(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }

    /// Forgets the current value.
    pub fn reset(&mut self) {
        self.value = None;
    }

    pub fn depends_on(&self) -> &[CellId] {
        &self.depends_on
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Owns cells; [`CellId`]s index into it.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: Vec<Cell>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cell and returns its id. Dependencies may point at cells
    /// added later; they are checked when the sheet is evaluated.
    pub fn add(&mut self, cell: Cell) -> CellId {
        self.cells.push(cell);
        self.cells.len() - 1
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    /// Like [`Sheet::get`], but an unknown id is an error.
    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells.get(id).ok_or(Error::UnknownCell {
            cell: id,
            len: self.cells.len(),
        })
    }

    /// First cell with the given name.
    pub fn id_of(&self, name: &str) -> Option<CellId> {
        self.cells.iter().position(|c| c.name == name)
    }

    /// Current value of `id`, `None` if the cell does not exist.
    pub fn value(&self, id: CellId) -> Option<f64> {
        self.cells.get(id).map(Cell::value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.cells.iter().map(Cell::value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }

    pub fn all_ids(&self) -> Vec<CellId> {
        (0..self.cells.len()).collect()
    }

    /// Dependency graph over `members`, where node `i` is `members[i]` and
    /// an edge runs from each dependency to the cell that reads it.
    ///
    /// Dependencies outside `members` are external inputs and get no edge.
    /// Ids that are not in the sheet at all, or members listed twice, are
    /// an error.
    pub fn dependency_graph(&self, members: &[CellId]) -> Result<Digraph> {
        let len = self.cells.len();
        let mut local = vec![None; len];
        for (i, &id) in members.iter().enumerate() {
            self.cell(id)?;
            if local[id].replace(i).is_some() {
                return Err(Error::DuplicateCell { cell: id });
            }
        }

        let mut graph = Digraph::new(members.len());
        for (i, &id) in members.iter().enumerate() {
            for &dep in &self.cells[id].depends_on {
                if dep >= len {
                    return Err(Error::UnknownCell { cell: dep, len });
                }
                if let Some(from) = local[dep] {
                    graph.add_edge(from, i)?;
                }
            }
        }
        Ok(graph)
    }

    /// Recomputes `id` from its inputs' current values and returns the
    /// signed change (infinite for a previously uncalculated cell).
    ///
    /// Ids must have been validated by [`Sheet::dependency_graph`].
    pub(crate) fn recalculate(&mut self, id: CellId) -> f64 {
        let inputs: Vec<f64> = self.cells[id]
            .depends_on
            .iter()
            .map(|&dep| self.cells[dep].value())
            .collect();
        let cell = &mut self.cells[id];
        let next = cell.formula.compute(&inputs);
        let change = match cell.value {
            Some(previous) => next - previous,
            None => f64::INFINITY,
        };
        cell.value = Some(next);
        change
    }
}
