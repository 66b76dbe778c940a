//! tfmr - Transformer Winding Frequency Response
//!
//! Sweeps a disc winding across frequency with the MTL and/or lumped model
//! and writes the terminal impedance and per-junction transfer ratios as CSV.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info tfmr winding.wdg --model both --points 200 > response.csv
//! ```

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tfmr_core::{
    dsl,
    error::{Result, TfmrError},
    params::{build_source, ParameterSource, SourceKind},
    report::CsvReport,
    solver::{
        FrequencyResponseSolver, FrequencySweep, LumpedSolver, MtlSolver, SweepConfig,
        SweepSpacing,
    },
    validate_winding, Winding,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Model {
    Mtl,
    Lumped,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Analytic,
    Tabulated,
    Snapshot,
}

/// Disc winding frequency-response solver
#[derive(Parser, Debug)]
#[command(name = "tfmr", author, version, about, long_about = None)]
struct Args {
    /// Path to the winding description file (.wdg)
    #[arg(value_name = "WINDING_FILE")]
    winding_file: PathBuf,

    /// Which model to sweep
    #[arg(long, value_enum, default_value_t = Model::Mtl)]
    model: Model,

    /// Where the electrical parameters come from
    #[arg(long, value_enum, default_value_t = Source::Analytic)]
    source: Source,

    /// Directory with C.csv and L_<freq>.csv (tabulated source, or the base
    /// of a snapshot)
    #[arg(long, value_name = "DIR")]
    tables: Option<PathBuf>,

    /// Frequency at which the snapshot source freezes L and R
    #[arg(long, value_name = "HZ", default_value_t = 1e3)]
    snapshot_frequency: f64,

    /// Lowest sweep frequency in Hz (overrides the file)
    #[arg(long)]
    fmin: Option<f64>,

    /// Highest sweep frequency in Hz (overrides the file)
    #[arg(long)]
    fmax: Option<f64>,

    /// Number of sweep points (overrides the file)
    #[arg(long)]
    points: Option<usize>,

    /// Space points linearly instead of logarithmically
    #[arg(long)]
    linear: bool,

    /// Worker threads for a dedicated pool
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Solve every point on the main thread
    #[arg(long)]
    sequential: bool,
}

impl Args {
    fn source_kind(&self) -> Result<SourceKind> {
        let tabulated = || {
            self.tables
                .clone()
                .map(|dir| SourceKind::Tabulated { dir })
                .ok_or_else(|| {
                    TfmrError::invalid_parameter("cli", "tables", "--tables DIR is required")
                })
        };
        Ok(match self.source {
            Source::Analytic => SourceKind::Analytic,
            Source::Tabulated => tabulated()?,
            Source::Snapshot => SourceKind::Snapshot {
                base: Box::new(if self.tables.is_some() {
                    tabulated()?
                } else {
                    SourceKind::Analytic
                }),
                frequency: self.snapshot_frequency,
            },
        })
    }

    /// Sweep settings from the file with command-line overrides applied.
    fn sweep_config(&self, ast: &dsl::WindingAst) -> Result<SweepConfig> {
        let mut config = SweepConfig::from_ast(ast)?;
        let (fmin, fmax) = (
            self.fmin.unwrap_or(config.fmin),
            self.fmax.unwrap_or(config.fmax),
        );
        config = config.with_range(fmin, fmax);
        if let Some(points) = self.points {
            config = config.with_points(points);
        }
        if self.linear {
            config = config.with_spacing(SweepSpacing::Linear);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if self.sequential {
            config = config.sequential();
        }
        Ok(config)
    }
}

fn build_solvers(
    model: Model,
    source: &Arc<dyn ParameterSource>,
    winding: &Winding,
) -> Result<Vec<Box<dyn FrequencyResponseSolver>>> {
    let mut solvers: Vec<Box<dyn FrequencyResponseSolver>> = Vec::new();
    if matches!(model, Model::Mtl | Model::Both) {
        solvers.push(Box::new(MtlSolver::new(Arc::clone(source), winding.terminals)?));
    }
    if matches!(model, Model::Lumped | Model::Both) {
        solvers.push(Box::new(LumpedSolver::new(Arc::clone(source), winding.terminals)?));
    }
    Ok(solvers)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse the winding file
    let ast = dsl::parse_file(&args.winding_file)?;

    // Build and validate the winding
    let winding = Winding::from_ast(&ast)?;
    validate_winding(&winding)?;
    info!(
        discs = winding.num_discs,
        turns = winding.num_turns(),
        "winding loaded"
    );

    let sweep = FrequencySweep::new(args.sweep_config(&ast)?)?;
    let source = build_source(&args.source_kind()?, &winding)?;
    let solvers = build_solvers(args.model, &source, &winding)?;

    let progress = |percent: u8| info!(percent, "sweep progress");
    let mut report = CsvReport::new(BufWriter::new(io::stdout().lock()), winding.num_turns());
    for solver in &solvers {
        let result = sweep.run(solver.as_ref(), Some(&progress))?;
        report.write_sweep(solver.name(), &result)?;
    }
    report.finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tfmr", "winding.wdg"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_sweep_overrides_applied() {
        let ast = dsl::parse(".sweep fmin=1k fmax=10k points=7").unwrap();

        let config = args(&["--fmax", "50000", "--linear", "--sequential"])
            .sweep_config(&ast)
            .unwrap();
        assert_eq!(config.fmin, 1e3);
        assert_eq!(config.fmax, 5e4);
        assert_eq!(config.points, 7);
        assert_eq!(config.spacing, SweepSpacing::Linear);
        assert!(!config.parallel);

        let config = args(&["--fmin", "100", "--points", "3", "--threads", "2"])
            .sweep_config(&ast)
            .unwrap();
        assert_eq!((config.fmin, config.fmax), (100.0, 1e4));
        assert_eq!(config.points, 3);
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_file_bounds_kept_without_overrides() {
        let ast = dsl::parse(".sweep fmin=2k fmax=20k").unwrap();
        let config = args(&[]).sweep_config(&ast).unwrap();
        assert_eq!((config.fmin, config.fmax), (2e3, 2e4));
        assert_eq!(config.spacing, SweepSpacing::Log);
    }

    #[test]
    fn test_tabulated_source_needs_tables() {
        assert!(args(&["--source", "tabulated"]).source_kind().is_err());
        assert_eq!(
            args(&["--source", "snapshot", "--snapshot-frequency", "5000"])
                .source_kind()
                .unwrap(),
            SourceKind::Snapshot {
                base: Box::new(SourceKind::Analytic),
                frequency: 5e3,
            }
        );
    }
}
