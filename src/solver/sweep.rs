//! Frequency sweep orchestration.
//!
//! Every frequency is an independent solve, so points are spread over a
//! rayon pool and collected back in index order. A point whose solve hits a
//! per-frequency numerical failure is recorded as invalid and the sweep goes
//! on; any other error aborts the whole sweep.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use super::{FrequencyResponseSolver, ResponseSample};
use crate::dsl::{DirectiveKind, WindingAst};
use crate::error::{Result, TfmrError};
use num_complex::Complex64;

/// Default lower sweep bound (Hz).
pub const DEFAULT_FMIN: f64 = 10e3;
/// Default upper sweep bound (Hz).
pub const DEFAULT_FMAX: f64 = 1e6;
pub const DEFAULT_POINTS: usize = 100;
/// Below this many points the sweep stays on the calling thread.
pub const DEFAULT_MIN_POINTS_FOR_PARALLEL: usize = 4;

/// Progress callback, called with a percentage in `0..=100`. It may borrow
/// caller state for the duration of a sweep.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// How sweep frequencies are distributed between the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepSpacing {
    /// Evenly spaced in log10(f)
    #[default]
    Log,
    Linear,
}

impl SweepSpacing {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "log" | "logarithmic" => Some(Self::Log),
            "lin" | "linear" => Some(Self::Linear),
            _ => None,
        }
    }
}

/// `points` frequencies evenly spaced in log10 between `fmin` and `fmax`.
pub fn log_spaced(fmin: f64, fmax: f64, points: usize) -> Vec<f64> {
    let (lo, hi) = (fmin.log10(), fmax.log10());
    spaced(points, fmin, fmax, |step| 10f64.powf(lo + (hi - lo) * step))
}

/// `points` frequencies evenly spaced between `fmin` and `fmax`.
pub fn linear_spaced(fmin: f64, fmax: f64, points: usize) -> Vec<f64> {
    spaced(points, fmin, fmax, |step| fmin + (fmax - fmin) * step)
}

fn spaced(points: usize, fmin: f64, fmax: f64, at: impl Fn(f64) -> f64) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![fmin],
        _ => {
            let last = (points - 1) as f64;
            let mut out: Vec<f64> = (0..points).map(|i| at(i as f64 / last)).collect();
            // Pin the ends so they match the requested bounds exactly
            out[0] = fmin;
            out[points - 1] = fmax;
            out
        }
    }
}

/// Configuration for a frequency sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub fmin: f64,
    pub fmax: f64,
    pub points: usize,
    pub spacing: SweepSpacing,
    /// Worker count for a dedicated pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Run points on the worker pool at all.
    pub parallel: bool,
    pub min_points_for_parallel: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            fmin: DEFAULT_FMIN,
            fmax: DEFAULT_FMAX,
            points: DEFAULT_POINTS,
            spacing: SweepSpacing::Log,
            threads: None,
            parallel: true,
            min_points_for_parallel: DEFAULT_MIN_POINTS_FOR_PARALLEL,
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `.sweep` directive, falling back to defaults for missing keys.
    pub fn from_ast(ast: &WindingAst) -> Result<Self> {
        let mut config = Self::default();
        let Some(d) = ast.get(DirectiveKind::Sweep) else {
            return Ok(config);
        };
        if let Some(fmin) = d.number("fmin")? {
            config.fmin = fmin;
        }
        if let Some(fmax) = d.number("fmax")? {
            config.fmax = fmax;
        }
        if let Some(points) = d.count("points")? {
            config.points = points;
        }
        if let Some(word) = d.word("spacing")? {
            config.spacing = SweepSpacing::from_name(word).ok_or_else(|| {
                TfmrError::invalid_parameter(
                    d.kind.name(),
                    "spacing",
                    format!("expected 'log' or 'linear', got '{word}'"),
                )
            })?;
        }
        Ok(config)
    }

    pub fn with_range(mut self, fmin: f64, fmax: f64) -> Self {
        self.fmin = fmin;
        self.fmax = fmax;
        self
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_spacing(mut self, spacing: SweepSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    /// Run on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Solve every point on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Reject configurations that cannot describe a sweep.
    pub fn validate(&self) -> Result<()> {
        if !(self.fmin.is_finite() && self.fmin > 0.0) {
            return Err(TfmrError::invalid_sweep(format!(
                "fmin must be positive, got {}",
                self.fmin
            )));
        }
        if !(self.fmax.is_finite() && self.fmax > 0.0) {
            return Err(TfmrError::invalid_sweep(format!(
                "fmax must be positive, got {}",
                self.fmax
            )));
        }
        if self.fmax < self.fmin {
            return Err(TfmrError::invalid_sweep(format!(
                "fmax ({}) is below fmin ({})",
                self.fmax, self.fmin
            )));
        }
        if self.points == 0 {
            return Err(TfmrError::invalid_sweep("at least one point is required"));
        }
        if self.threads == Some(0) {
            return Err(TfmrError::invalid_sweep("thread count must be at least 1"));
        }
        Ok(())
    }

    /// The frequency grid this configuration describes.
    pub fn frequencies(&self) -> Vec<f64> {
        match self.spacing {
            SweepSpacing::Log => log_spaced(self.fmin, self.fmax, self.points),
            SweepSpacing::Linear => linear_spaced(self.fmin, self.fmax, self.points),
        }
    }
}

/// A frequency whose solve failed numerically.
#[derive(Debug)]
pub struct InvalidPoint {
    pub index: usize,
    pub frequency: f64,
    pub error: TfmrError,
}

/// Result slot for one sweep frequency.
#[derive(Debug)]
pub enum PointOutcome {
    Solved(ResponseSample),
    Invalid(InvalidPoint),
}

impl PointOutcome {
    pub fn sample(&self) -> Option<&ResponseSample> {
        match self {
            PointOutcome::Solved(sample) => Some(sample),
            PointOutcome::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PointOutcome::Solved(_))
    }
}

/// Output of a sweep, one slot per frequency in grid order.
#[derive(Debug)]
pub struct SweepResult {
    pub frequencies: Vec<f64>,
    pub points: Vec<PointOutcome>,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Input impedance per frequency; `None` where the point is invalid.
    pub fn input_impedance(&self) -> Vec<Option<Complex64>> {
        self.points
            .iter()
            .map(|p| p.sample().map(|s| s.input_impedance))
            .collect()
    }

    /// Transfer ratio (dB) of interior junction `turn` per frequency.
    pub fn transfer_db(&self, turn: usize) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| p.sample().and_then(|s| s.transfer_db.get(turn).copied()))
            .collect()
    }

    pub fn invalid_points(&self) -> impl Iterator<Item = &InvalidPoint> {
        self.points.iter().filter_map(|p| match p {
            PointOutcome::Invalid(invalid) => Some(invalid),
            PointOutcome::Solved(_) => None,
        })
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }
}

/// Drives a solver across a validated frequency grid.
#[derive(Debug, Clone)]
pub struct FrequencySweep {
    config: SweepConfig,
    frequencies: Vec<f64>,
}

impl FrequencySweep {
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let frequencies = config.frequencies();
        Ok(Self {
            config,
            frequencies,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Solve every frequency and collect the outcomes in grid order.
    pub fn run(
        &self,
        solver: &dyn FrequencyResponseSolver,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<SweepResult> {
        let total = self.frequencies.len();
        let _span = info_span!("frequency_sweep", solver = solver.name(), points = total).entered();
        let use_parallel = self.config.parallel && total >= self.config.min_points_for_parallel;
        debug!(parallel = use_parallel, threads = ?self.config.threads, "starting sweep");

        if let Some(report) = progress {
            report(0);
        }
        let completed = AtomicUsize::new(0);
        let solve = |(index, &frequency): (usize, &f64)| -> Result<PointOutcome> {
            let outcome = solve_point(solver, index, frequency);
            if let Some(report) = progress {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                report(((done * 100) / total).min(99) as u8);
            }
            outcome
        };

        let points: Vec<PointOutcome> = if !use_parallel {
            self.frequencies
                .iter()
                .enumerate()
                .map(solve)
                .collect::<Result<_>>()?
        } else if let Some(threads) = self.config.threads {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| TfmrError::ThreadPool {
                    message: e.to_string(),
                })?;
            pool.install(|| {
                self.frequencies
                    .par_iter()
                    .enumerate()
                    .map(solve)
                    .collect::<Result<_>>()
            })?
        } else {
            self.frequencies
                .par_iter()
                .enumerate()
                .map(solve)
                .collect::<Result<_>>()?
        };

        if let Some(report) = progress {
            report(100);
        }
        let result = SweepResult {
            frequencies: self.frequencies.clone(),
            points,
        };
        info!(
            valid = result.valid_count(),
            invalid = total - result.valid_count(),
            "sweep complete"
        );
        Ok(result)
    }
}

fn solve_point(
    solver: &dyn FrequencyResponseSolver,
    index: usize,
    frequency: f64,
) -> Result<PointOutcome> {
    match solver.calc_response_at_freq(frequency) {
        Ok(sample) => {
            debug!(index, frequency, z_in = %sample.input_impedance, "solved");
            Ok(PointOutcome::Solved(sample))
        }
        Err(error) if error.is_per_frequency() => {
            warn!(index, frequency, %error, "frequency marked invalid");
            Ok(PointOutcome::Invalid(InvalidPoint {
                index,
                frequency,
                error,
            }))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;
    use crate::params::{AnalyticSource, ParameterSource};
    use crate::solver::LumpedSolver;
    use crate::winding::{Terminals, Winding};
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};

    /// Returns a flat response, failing numerically above `fail_above` and
    /// fatally at exactly `fatal_at`.
    struct Scripted {
        fail_above: f64,
        fatal_at: Option<f64>,
    }

    impl FrequencyResponseSolver for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn num_turns(&self) -> usize {
            2
        }
        fn calc_response_at_freq(&self, frequency: f64) -> Result<ResponseSample> {
            if self.fatal_at.is_some_and(|f| (f - frequency).abs() < 1e-9) {
                return Err(TfmrError::invalid_winding("broken"));
            }
            if frequency > self.fail_above {
                return Err(TfmrError::SingularSystem {
                    frequency,
                    stage: "boundary system",
                });
            }
            let one = Complex64::new(1.0, 0.0);
            ResponseSample::from_junctions(
                frequency,
                Complex64::new(frequency, 0.0),
                &[one, one * 0.5, one * 0.0],
                "test",
            )
        }
    }

    #[test]
    fn test_log_spaced_grid() {
        let f = log_spaced(10e3, 1e6, 5);
        assert_eq!(f.len(), 5);
        assert_eq!(f[0], 10e3);
        assert_eq!(f[4], 1e6);
        assert_relative_eq!(f[2], 1e5, max_relative = 1e-12);
        assert_relative_eq!(f[1], 10f64.powf(4.5), max_relative = 1e-12);
    }

    #[test]
    fn test_linear_spaced_grid() {
        let f = linear_spaced(100.0, 500.0, 5);
        assert_eq!(f, vec![100.0, 200.0, 300.0, 400.0, 500.0]);
        assert_eq!(linear_spaced(100.0, 500.0, 1), vec![100.0]);
    }

    #[test]
    fn test_config_validation() {
        assert!(SweepConfig::default().validate().is_ok());
        assert!(SweepConfig::new().with_range(0.0, 1e6).validate().is_err());
        assert!(SweepConfig::new().with_range(1e6, 1e3).validate().is_err());
        assert!(SweepConfig::new().with_points(0).validate().is_err());
        assert!(SweepConfig::new().with_threads(0).validate().is_err());
        assert!(matches!(
            FrequencySweep::new(SweepConfig::new().with_range(-1.0, 10.0)),
            Err(TfmrError::InvalidSweep { .. })
        ));
    }

    #[test]
    fn test_config_from_ast() {
        let ast = dsl::parse(".sweep fmin=1k fmax=10k points=7 spacing=linear").unwrap();
        let config = SweepConfig::from_ast(&ast).unwrap();
        assert_eq!(config.fmin, 1e3);
        assert_eq!(config.fmax, 10e3);
        assert_eq!(config.points, 7);
        assert_eq!(config.spacing, SweepSpacing::Linear);

        let ast = dsl::parse(".sweep spacing=cubic").unwrap();
        assert!(SweepConfig::from_ast(&ast).is_err());

        let defaults = SweepConfig::from_ast(&dsl::parse("").unwrap()).unwrap();
        assert_eq!(defaults, SweepConfig::default());
    }

    #[test]
    fn test_failed_points_marked_invalid() {
        let sweep = FrequencySweep::new(
            SweepConfig::new()
                .with_range(1.0, 10.0)
                .with_points(10)
                .with_spacing(SweepSpacing::Linear),
        )
        .unwrap();
        let solver = Scripted {
            fail_above: 7.5,
            fatal_at: None,
        };
        let result = sweep.run(&solver, None).unwrap();
        assert_eq!(result.len(), 10);
        assert_eq!(result.valid_count(), 7);
        let invalid: Vec<usize> = result.invalid_points().map(|p| p.index).collect();
        assert_eq!(invalid, vec![7, 8, 9]);

        let z = result.input_impedance();
        assert_relative_eq!(z[2].unwrap().re, 3.0, epsilon = 1e-12);
        assert_eq!(z[8], None);
        let t = result.transfer_db(0);
        assert_relative_eq!(t[0].unwrap(), 20.0 * 0.5f64.log10(), epsilon = 1e-12);
        assert_eq!(t[9], None);
        // Past the last interior junction
        assert!(result.transfer_db(5).iter().all(Option::is_none));
    }

    #[test]
    fn test_fatal_error_aborts() {
        let sweep = FrequencySweep::new(
            SweepConfig::new()
                .with_range(1.0, 4.0)
                .with_points(4)
                .with_spacing(SweepSpacing::Linear),
        )
        .unwrap();
        let solver = Scripted {
            fail_above: f64::INFINITY,
            fatal_at: Some(3.0),
        };
        assert!(matches!(
            sweep.run(&solver, None),
            Err(TfmrError::InvalidWinding { .. })
        ));
    }

    #[test]
    fn test_progress_reported() {
        let seen = Mutex::new(Vec::new());
        let progress = |p: u8| seen.lock().unwrap().push(p);
        let sweep = FrequencySweep::new(SweepConfig::new().with_points(20)).unwrap();
        let solver = Scripted {
            fail_above: f64::INFINITY,
            fatal_at: None,
        };
        sweep.run(&solver, Some(&progress)).unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(seen.len(), 22);
        assert!(seen[..21].iter().all(|&p| p <= 99));
    }

    #[test]
    fn test_progress_borrows_caller_state_sequentially() {
        let calls = AtomicUsize::new(0);
        let last = AtomicUsize::new(0);
        let progress = |p: u8| {
            calls.fetch_add(1, Ordering::Relaxed);
            last.store(p as usize, Ordering::Relaxed);
        };
        let sweep = FrequencySweep::new(SweepConfig::new().with_points(3).sequential()).unwrap();
        let solver = Scripted {
            fail_above: f64::INFINITY,
            fatal_at: None,
        };
        sweep.run(&solver, Some(&progress)).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 5);
        assert_eq!(last.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let source: Arc<dyn ParameterSource> =
            Arc::new(AnalyticSource::new(&Winding::new(2, 4)).unwrap());
        let solver = LumpedSolver::new(source, Terminals::default()).unwrap();
        let config = SweepConfig::new().with_points(16);

        let sequential = FrequencySweep::new(config.clone().sequential())
            .unwrap()
            .run(&solver, None)
            .unwrap();
        let pooled = FrequencySweep::new(config.with_threads(3))
            .unwrap()
            .run(&solver, None)
            .unwrap();

        assert_eq!(sequential.frequencies, pooled.frequencies);
        assert_eq!(sequential.input_impedance(), pooled.input_impedance());
        assert_eq!(sequential.transfer_db(3), pooled.transfer_db(3));
    }
}
