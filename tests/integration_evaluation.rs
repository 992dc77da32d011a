//! Integration tests for cycle-tolerant sheet evaluation.
//!
//! Tests cover:
//! 1. Acyclic chains and cycles that are acyclic in effect
//! 2. Contracting cycles that converge, and diverging cells
//! 3. Calculation-limit accounting and downstream cells of a limited group
//! 4. Subset evaluation with external inputs
//! 5. Structural errors

use std::cell::Cell as Counter;

use cellgraph::{
    Cell, CellId, EvalConfig, Error, Evaluator, Sheet, Unit, evaluate, evaluate_group,
};

// ===========================================================================
// Helpers
// ===========================================================================

/// `a = 0`, `b = 0 (reads a)`, `c = 0 (reads b)`, optionally with `a`
/// reading `c` to close a 3-cycle.
fn zero_chain(close_cycle: bool) -> Sheet {
    let mut sheet = Sheet::new();
    let a_deps = if close_cycle { vec![2] } else { vec![] };
    sheet.add(Cell::new("a", a_deps, |_: &[f64]| 0.0));
    sheet.add(Cell::new("b", vec![0], |_: &[f64]| 0.0));
    sheet.add(Cell::new("c", vec![1], |_: &[f64]| 0.0));
    sheet
}

/// `x = k * y`, `y = k * x`, both starting at 10.
fn mutual(k: f64) -> (Sheet, CellId, CellId) {
    let mut sheet = Sheet::new();
    let x = sheet.add(Cell::new("x", vec![1], move |v: &[f64]| k * v[0]).with_value(10.0));
    let y = sheet.add(Cell::new("y", vec![0], move |v: &[f64]| k * v[0]).with_value(10.0));
    (sheet, x, y)
}

fn assert_exclusive(converged: bool, limit_reached: bool) {
    assert!(
        !(converged && limit_reached),
        "converged and calculation_limit_reached are both set"
    );
}

// ===========================================================================
// Acyclic evaluation
// ===========================================================================

#[test]
fn linear_chain_converges_in_two_passes() {
    let mut sheet = zero_chain(false);
    let result = evaluate(&mut sheet, 100, 1e-3).unwrap();

    assert!(result.converged);
    assert!(!result.calculation_limit_reached);
    assert_eq!(result.total_calculations, 6);
    assert_eq!(result.passes, 2);
    assert_eq!(result.num_calculations, vec![2, 2, 2]);
    assert_eq!(sheet.values(), vec![0.0, 0.0, 0.0]);
}

#[test]
fn cycle_that_is_acyclic_in_effect_matches_the_chain() {
    let mut chain = zero_chain(false);
    let mut cyclic = zero_chain(true);
    let evaluator = Evaluator::default();

    let plain = evaluator.evaluate(&mut chain).unwrap();
    let looped = evaluator.evaluate(&mut cyclic).unwrap();

    assert!(looped.converged);
    assert_eq!(looped.total_calculations, 6);
    assert_eq!(looped.converged, plain.converged);
    assert_eq!(looped.total_calculations, plain.total_calculations);
    assert_eq!(cyclic.values(), chain.values());
}

#[test]
fn constant_sheet_with_settled_values_takes_one_pass() {
    let mut sheet = Sheet::new();
    let a = sheet.add(Cell::constant("a", 1.0).with_value(1.0));
    let b = sheet.add(Cell::new("b", vec![a], |_: &[f64]| 2.0).with_value(2.0));
    sheet.add(Cell::new("c", vec![a, b], |_: &[f64]| 3.0).with_value(3.0));
    sheet.add(Cell::constant("d", 4.0).with_value(4.0));

    let result = Evaluator::default().evaluate(&mut sheet).unwrap();
    assert!(result.converged);
    assert_eq!(result.passes, 1);
    assert_eq!(result.total_calculations, sheet.len());
    assert_eq!(sheet.values(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn diamond_values_flow_through_dependencies() {
    let mut sheet = Sheet::new();
    let top = sheet.add(Cell::constant("top", 3.0));
    let left = sheet.add(Cell::new("left", vec![top], |v: &[f64]| v[0] + 1.0));
    let right = sheet.add(Cell::new("right", vec![top], |v: &[f64]| v[0] * 2.0));
    let bottom = sheet.add(Cell::new("bottom", vec![left, right], |v: &[f64]| v[0] + v[1]));

    let result = Evaluator::default().evaluate(&mut sheet).unwrap();
    assert!(result.converged);
    assert_eq!(sheet.value(bottom), Some(10.0));
}

// ===========================================================================
// Convergence and divergence
// ===========================================================================

#[test]
fn contracting_cycle_converges_within_default_limit() {
    for k in [0.1, 0.5, 0.9] {
        let (mut sheet, x, y) = mutual(k);
        let result = Evaluator::default().evaluate(&mut sheet).unwrap();

        assert!(result.converged, "k = {} did not converge", k);
        assert!(!result.calculation_limit_reached);
        assert!(result.calculations_of(x) < result.calculation_limit);
        assert!(sheet.value(x).unwrap().abs() < 1e-2);
        assert!(sheet.value(y).unwrap().abs() < 1e-2);
    }
}

#[test]
fn mutual_cycle_hits_limit_and_downstream_runs_once() {
    let (mut sheet, x, y) = mutual(0.9);
    let z = sheet.add(Cell::new("z", vec![y], |v: &[f64]| v[0]));

    let result = evaluate(&mut sheet, 10, 1e-3).unwrap();

    assert!(result.calculation_limit_reached);
    assert!(!result.converged);
    assert!(result.calculations_of(x) >= 9);
    assert!(result.calculations_of(y) >= 9);
    assert_eq!(result.calculations_of(z), 1);
    assert_eq!(result.passes, 1);
    assert_eq!(sheet.value(z), sheet.value(y));
}

#[test]
fn ever_increasing_single_cell_uses_exact_limit() {
    let mut sheet = Sheet::new();
    let calls = Counter::new(0.0);
    let n = sheet.add(Cell::new("n", vec![], move |_: &[f64]| {
        calls.set(calls.get() + 1.0);
        calls.get()
    }));

    let result = evaluate(&mut sheet, 25, 1e-3).unwrap();
    assert!(result.calculation_limit_reached);
    assert!(!result.converged);
    assert_eq!(result.total_calculations, 25);
    assert_eq!(result.calculations_of(n), 25);
    assert_eq!(sheet.value(n), Some(25.0));
}

#[test]
fn self_referencing_increment_uses_exact_limit() {
    let mut sheet = Sheet::new();
    sheet.add(Cell::new("n", vec![0], |v: &[f64]| v[0] + 1.0));

    let result = Evaluator::default().evaluate(&mut sheet).unwrap();
    assert!(result.calculation_limit_reached);
    assert!(!result.converged);
    assert_eq!(result.total_calculations, result.calculation_limit);
}

#[test]
fn nan_formula_never_converges() {
    let mut sheet = Sheet::new();
    sheet.add(Cell::new("bad", vec![], |_: &[f64]| f64::NAN));

    let result = evaluate(&mut sheet, 5, 1e-3).unwrap();
    assert!(result.calculation_limit_reached);
    assert!(!result.converged);
    assert_eq!(result.total_calculations, 5);
}

#[test]
fn outcome_flags_are_exclusive() {
    let sheets: Vec<Sheet> = vec![zero_chain(false), zero_chain(true), mutual(0.5).0, mutual(1.5).0];
    for mut sheet in sheets {
        for limit in [1, 3, 100] {
            let result = evaluate(&mut sheet, limit, 1e-3).unwrap();
            assert_exclusive(result.converged, result.calculation_limit_reached);
            assert!(result.converged || result.calculation_limit_reached);
        }
    }
}

#[test]
fn group_evaluated_alone_reports_sweeps() {
    let (mut sheet, x, y) = mutual(0.5);
    let result = evaluate_group(&mut sheet, &[x, y], &EvalConfig::default()).unwrap();

    assert!(result.converged);
    assert_eq!(result.calculations_of(x), result.passes);
    assert_eq!(result.calculations_of(y), result.passes);
}

// ===========================================================================
// Subsets and plans
// ===========================================================================

#[test]
fn subset_reads_outside_cells_as_inputs() {
    let mut sheet = Sheet::new();
    let a = sheet.add(Cell::constant("a", 99.0).with_value(5.0));
    let b = sheet.add(Cell::new("b", vec![a], |v: &[f64]| v[0] * 2.0));
    let c = sheet.add(Cell::new("c", vec![b], |v: &[f64]| v[0] + 1.0));

    let result = Evaluator::default().evaluate_cells(&mut sheet, &[c, b]).unwrap();

    assert!(result.converged);
    assert_eq!(result.calculations_of(a), 0);
    assert_eq!(sheet.value(a), Some(5.0));
    assert_eq!(sheet.value(b), Some(10.0));
    assert_eq!(sheet.value(c), Some(11.0));
    assert_eq!(result.num_calculations.len(), sheet.len());
}

#[test]
fn plan_puts_groups_between_their_inputs_and_readers() {
    let mut sheet = Sheet::new();
    let input = sheet.add(Cell::constant("input", 1.0));
    let p = sheet.add(Cell::new("p", vec![input, 2], |v: &[f64]| v[0] + 0.5 * v[1]));
    let q = sheet.add(Cell::new("q", vec![p], |v: &[f64]| 0.5 * v[0]));
    let out = sheet.add(Cell::new("out", vec![q], |v: &[f64]| v[0]));

    let evaluator = Evaluator::default();
    let plan = evaluator.plan(&sheet, &sheet.all_ids()).unwrap();

    assert_eq!(plan.units().len(), 3);
    assert_eq!(plan.units()[0], Unit::Single { cell: input });
    let mut group = plan.units()[1].cells().to_vec();
    group.sort_unstable();
    assert_eq!(group, vec![p, q]);
    assert_eq!(plan.units()[2], Unit::Single { cell: out });
    assert_eq!(plan.levels(), vec![vec![0], vec![1], vec![2]]);

    let result = evaluator.execute(&mut sheet, &plan).unwrap();
    assert!(result.converged);
    // p = 1 + 0.25 p  =>  p = 4/3
    assert!((sheet.value(p).unwrap() - 4.0 / 3.0).abs() < 1e-2);
    assert!((sheet.value(out).unwrap() - 2.0 / 3.0).abs() < 1e-2);
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn dangling_dependency_is_an_error() {
    let mut sheet = Sheet::new();
    sheet.add(Cell::new("a", vec![7], |v: &[f64]| v[0]));

    let err = Evaluator::default().evaluate(&mut sheet).unwrap_err();
    assert!(matches!(err, Error::UnknownCell { cell: 7, len: 1 }), "{:?}", err);
}

#[test]
fn unknown_and_duplicate_members_are_errors() {
    let mut sheet = zero_chain(false);
    let evaluator = Evaluator::default();

    assert!(matches!(
        evaluator.evaluate_cells(&mut sheet, &[0, 9]),
        Err(Error::UnknownCell { cell: 9, .. })
    ));
    assert!(matches!(
        evaluator.evaluate_cells(&mut sheet, &[1, 1]),
        Err(Error::DuplicateCell { cell: 1 })
    ));
}

#[test]
fn invalid_settings_are_rejected_before_any_work() {
    let mut sheet = zero_chain(false);
    let err = evaluate(&mut sheet, 0, 1e-3).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(sheet.iter().all(|c| !c.is_calculated()));
}
