//! End-to-end behaviour of the solvers across a sweep.

use std::sync::Arc;

use approx::assert_relative_eq;
use tfmr_core::dsl;
use tfmr_core::linalg::RMatrix;
use tfmr_core::params::{AnalyticSource, ParameterSource, SnapshotSource};
use tfmr_core::solver::{log_spaced, FrequencyResponseSolver, PointOutcome};
use tfmr_core::{
    build_source, FrequencySweep, LumpedSolver, MtlSolver, Result, SourceKind, SweepConfig,
    TfmrError, Winding,
};

/// Source whose every matrix is zero, so no circuit can be solved.
struct Dead {
    n: usize,
}

impl ParameterSource for Dead {
    fn num_turns(&self) -> usize {
        self.n
    }
    fn calc_l_matrix(&self, _f: f64) -> Result<RMatrix> {
        Ok(RMatrix::zeros(self.n, self.n))
    }
    fn calc_c_matrix(&self) -> Result<RMatrix> {
        Ok(RMatrix::zeros(self.n, self.n))
    }
    fn calc_r_matrix(&self, _f: f64) -> Result<RMatrix> {
        Ok(RMatrix::zeros(self.n, self.n))
    }
    fn calc_turn_radii(&self) -> Result<Vec<f64>> {
        Ok(vec![0.5; self.n])
    }
}

fn analytic(discs: usize, turns_per_disc: usize) -> (Winding, Arc<dyn ParameterSource>) {
    let winding = Winding::new(discs, turns_per_disc);
    let source = build_source(&SourceKind::Analytic, &winding).unwrap();
    (winding, source)
}

#[test]
fn test_models_agree_at_low_frequency() {
    for (discs, tpd) in [(2, 3), (3, 4)] {
        let (winding, source) = analytic(discs, tpd);
        let mtl = MtlSolver::new(Arc::clone(&source), winding.terminals).unwrap();
        let lumped = LumpedSolver::new(source, winding.terminals).unwrap();

        let a = mtl.calc_response_at_freq(10e3).unwrap();
        let b = lumped.calc_response_at_freq(10e3).unwrap();
        assert_relative_eq!(
            a.input_impedance.norm(),
            b.input_impedance.norm(),
            max_relative = 0.10
        );
        assert_eq!(a.transfer_db.len(), winding.num_turns() - 1);
        assert_eq!(b.transfer_db.len(), winding.num_turns() - 1);
    }
}

#[test]
fn test_models_agree_on_reference_winding() {
    let winding = Winding::default();
    let source = build_source(&SourceKind::Analytic, &winding).unwrap();
    let mtl = MtlSolver::new(Arc::clone(&source), winding.terminals).unwrap();
    let lumped = LumpedSolver::new(source, winding.terminals).unwrap();

    let a = mtl.calc_response_at_freq(10e3).unwrap();
    let b = lumped.calc_response_at_freq(10e3).unwrap();
    assert_eq!(winding.num_turns(), 280);
    assert!(a.input_impedance.norm() > 1e3);
    assert_relative_eq!(
        a.input_impedance.norm(),
        b.input_impedance.norm(),
        max_relative = 0.01
    );
}

#[test]
fn test_sweep_grid_matches_log_spacing() {
    let (winding, source) = analytic(2, 3);
    let solver = MtlSolver::new(source, winding.terminals).unwrap();
    let config = SweepConfig::new().with_range(10e3, 1e6).with_points(25);
    let result = FrequencySweep::new(config).unwrap().run(&solver, None).unwrap();

    let expected = log_spaced(10e3, 1e6, 25);
    assert_eq!(result.len(), 25);
    assert_eq!(result.frequencies, expected);
    for (i, f) in result.frequencies.iter().enumerate() {
        let exact = 10f64.powf(4.0 + 2.0 * i as f64 / 24.0);
        assert_relative_eq!(*f, exact, max_relative = 1e-12);
    }
    assert_eq!(result.input_impedance().len(), 25);
    assert_eq!(result.transfer_db(0).len(), 25);
}

#[test]
fn test_singular_points_are_flagged_not_dropped() {
    let source: Arc<dyn ParameterSource> = Arc::new(Dead { n: 3 });
    let terminals = Winding::default().terminals;
    let solvers: Vec<Box<dyn FrequencyResponseSolver>> = vec![
        Box::new(MtlSolver::new(Arc::clone(&source), terminals).unwrap()),
        Box::new(LumpedSolver::new(source, terminals).unwrap()),
    ];
    let sweep = FrequencySweep::new(SweepConfig::new().with_points(8)).unwrap();

    for solver in &solvers {
        let result = sweep.run(solver.as_ref(), None).unwrap();
        assert_eq!(result.len(), 8);
        assert_eq!(result.valid_count(), 0);
        assert!(result.input_impedance().iter().all(Option::is_none));
        for (i, point) in result.points.iter().enumerate() {
            match point {
                PointOutcome::Invalid(invalid) => {
                    assert_eq!(invalid.index, i);
                    assert!(invalid.error.is_per_frequency());
                }
                PointOutcome::Solved(_) => panic!("{} solved a dead winding", solver.name()),
            }
        }
    }
}

#[test]
fn test_empty_source_rejected_before_sweep() {
    let source: Arc<dyn ParameterSource> = Arc::new(Dead { n: 0 });
    assert!(matches!(
        MtlSolver::new(source, Winding::default().terminals),
        Err(TfmrError::InvalidWinding { .. })
    ));
}

#[test]
fn test_analytic_matrices_symmetric() {
    let (_, source) = analytic(3, 5);
    assert!(source.calc_l_matrix(1e5).unwrap().is_symmetric(1e-12));
    assert!(source.calc_c_matrix().unwrap().is_symmetric(1e-12));
}

#[test]
fn test_resistance_at_dc_is_dc_term() {
    let (winding, source) = analytic(2, 4);
    let r = source.calc_r_matrix(0.0).unwrap();
    let r_dc = winding.material.resistivity / (winding.conductor.height * winding.conductor.width);
    assert_eq!(r[(0, 0)], 0.0);
    for t in 1..winding.num_turns() {
        assert_relative_eq!(r[(t, t)], r_dc, max_relative = 1e-12);
    }
    // Skin effect only ever adds resistance
    let r_hf = source.calc_r_matrix(1e6).unwrap();
    assert!((0..winding.num_turns()).all(|t| r_hf[(t, t)] > r[(t, t)]));
}

#[test]
fn test_snapshot_matches_base_at_reference() {
    let winding = Winding::new(2, 3);
    let base = AnalyticSource::new(&winding).unwrap();
    let snapshot: Arc<dyn ParameterSource> = Arc::new(SnapshotSource::new(&base, 1e5).unwrap());
    let base: Arc<dyn ParameterSource> = Arc::new(base);

    let a = LumpedSolver::new(base, winding.terminals)
        .unwrap()
        .calc_response_at_freq(1e5)
        .unwrap();
    let b = LumpedSolver::new(snapshot, winding.terminals)
        .unwrap()
        .calc_response_at_freq(1e5)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_description_file_to_sweep() {
    let ast = dsl::parse(
        "# two small discs\n\
         .winding discs=2 turns_per_disc=2\n\
         .terminals load=10\n\
         .sweep fmin=1k fmax=100k points=5\n",
    )
    .unwrap();
    let winding = Winding::from_ast(&ast).unwrap();
    let config = SweepConfig::from_ast(&ast).unwrap().sequential();
    let source = build_source(&SourceKind::Analytic, &winding).unwrap();
    let solver = LumpedSolver::new(source, winding.terminals).unwrap();

    let result = FrequencySweep::new(config).unwrap().run(&solver, None).unwrap();
    assert_eq!(result.frequencies, log_spaced(1e3, 1e5, 5));
    assert_relative_eq!(result.frequencies[2], 1e4, max_relative = 1e-12);
    assert_eq!(result.valid_count(), 5);
    // Four turns: three interior junctions, plus the load node
    let sample = result.points[0].sample().unwrap();
    assert_eq!(sample.transfer_db.len(), 3);
    assert_eq!(sample.node_voltages.len(), 5);
}
