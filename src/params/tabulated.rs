//! Parameter matrices precomputed by an external field solver.
//!
//! A table directory holds `C.csv` and one `L_<freq>.csv` per solved
//! frequency (`L_1k.csv`, `L_100000.csv`, ...). Files are plain
//! comma-separated rows of per-unit-length values. Inductance between
//! tabulated frequencies is interpolated linearly in log-frequency and held
//! constant beyond the ends of the table.

use std::path::Path;

use tracing::{debug, info};

use super::resistance::ResistanceModel;
use super::{check_matrix, check_radii, ParameterSource};
use crate::dsl::parse_value;
use crate::error::{Result, TfmrError};
use crate::linalg::RMatrix;
use crate::winding::{validate_winding, Winding};

/// Parameter source backed by tabulated matrices.
#[derive(Debug, Clone)]
pub struct TabulatedSource {
    radii: Vec<f64>,
    c: RMatrix,
    /// Inductance tables sorted by frequency
    l_tables: Vec<(f64, RMatrix)>,
    resistance: ResistanceModel,
}

impl TabulatedSource {
    /// Read tables for `winding` from `dir`.
    pub fn load(dir: &Path, winding: &Winding) -> Result<Self> {
        validate_winding(winding)?;
        let c = read_matrix_csv(&dir.join("C.csv"))?;

        let entries = std::fs::read_dir(dir).map_err(|e| TfmrError::FileReadError {
            path: dir.display().to_string(),
            source: e,
        })?;
        let mut l_tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TfmrError::FileReadError {
                path: dir.display().to_string(),
                source: e,
            })?;
            let name = entry.file_name();
            let Some(frequency) = name.to_str().and_then(table_frequency) else {
                continue;
            };
            l_tables.push((frequency, read_matrix_csv(&entry.path())?));
        }
        info!(
            dir = %dir.display(),
            tables = l_tables.len(),
            "loaded inductance tables"
        );

        Self::from_tables(
            c,
            l_tables,
            winding.turn_radii(),
            ResistanceModel::from_winding(winding),
        )
    }

    /// Assemble a source from matrices already in memory.
    pub fn from_tables(
        c: RMatrix,
        mut l_tables: Vec<(f64, RMatrix)>,
        radii: Vec<f64>,
        resistance: ResistanceModel,
    ) -> Result<Self> {
        let n = radii.len();
        check_radii(&radii, n)?;
        check_matrix("C", &c, n)?;
        if l_tables.is_empty() {
            return Err(TfmrError::InvalidParameterMatrix {
                what: "L".to_string(),
                message: "no inductance tables".to_string(),
            });
        }
        for (f, l) in &l_tables {
            if !(f.is_finite() && *f > 0.0) {
                return Err(TfmrError::InvalidParameterMatrix {
                    what: "L".to_string(),
                    message: format!("table frequency {f} is not positive"),
                });
            }
            check_matrix(&format!("L at {f} Hz"), l, n)?;
        }
        l_tables.sort_by(|a, b| a.0.total_cmp(&b.0));
        if l_tables.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(TfmrError::InvalidParameterMatrix {
                what: "L".to_string(),
                message: "two tables share a frequency".to_string(),
            });
        }
        debug!(turns = n, tables = l_tables.len(), "tabulated source ready");

        Ok(Self {
            radii,
            c,
            l_tables,
            resistance,
        })
    }

    /// Frequencies with a stored inductance table.
    pub fn table_frequencies(&self) -> Vec<f64> {
        self.l_tables.iter().map(|(f, _)| *f).collect()
    }
}

impl ParameterSource for TabulatedSource {
    fn num_turns(&self) -> usize {
        self.radii.len()
    }

    fn calc_l_matrix(&self, frequency: f64) -> Result<RMatrix> {
        let (first, last) = match (self.l_tables.first(), self.l_tables.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(TfmrError::InvalidParameterMatrix {
                    what: "L".to_string(),
                    message: "no inductance tables".to_string(),
                })
            }
        };
        if frequency <= first.0 {
            return Ok(first.1.clone());
        }
        if frequency >= last.0 {
            return Ok(last.1.clone());
        }

        let upper = self.l_tables.partition_point(|(f, _)| *f <= frequency);
        let (f0, l0) = &self.l_tables[upper - 1];
        let (f1, l1) = &self.l_tables[upper];
        let t = (frequency.ln() - f0.ln()) / (f1.ln() - f0.ln());
        Ok(&l0.scale(1.0 - t) + &l1.scale(t))
    }

    fn calc_c_matrix(&self) -> Result<RMatrix> {
        Ok(self.c.clone())
    }

    fn calc_r_matrix(&self, frequency: f64) -> Result<RMatrix> {
        Ok(self.resistance.calc_r_matrix(frequency))
    }

    fn calc_turn_radii(&self) -> Result<Vec<f64>> {
        Ok(self.radii.clone())
    }
}

/// Frequency encoded in an `L_<freq>.csv` file name.
fn table_frequency(name: &str) -> Option<f64> {
    let stem = name.strip_prefix("L_")?.strip_suffix(".csv")?;
    parse_value(stem).filter(|f| *f > 0.0)
}

/// Read a comma-separated matrix file.
pub fn read_matrix_csv(path: &Path) -> Result<RMatrix> {
    let text = std::fs::read_to_string(path).map_err(|e| TfmrError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_matrix_csv(&text, &path.display().to_string())
}

/// Parse comma-separated rows; blank lines are skipped.
pub fn parse_matrix_csv(text: &str, path: &str) -> Result<RMatrix> {
    let format_error = |line: usize, message: String| TfmrError::MatrixFormat {
        path: path.to_string(),
        line,
        message,
    };

    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|cell| {
                let cell = cell.trim();
                cell.parse::<f64>()
                    .map_err(|_| format_error(idx + 1, format!("'{cell}' is not a number")))
            })
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first().map(Vec::len) {
            if row.len() != first {
                return Err(format_error(
                    idx + 1,
                    format!("row has {} values, expected {}", row.len(), first),
                ));
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(format_error(0, "file is empty".to_string()));
    }
    RMatrix::from_rows(rows)
}
