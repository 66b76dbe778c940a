//! CSV output for the CLI frontend.
//!
//! One row per (model, frequency). Invalid points keep their row with
//! `valid=false` and empty value cells so the frequency grid stays intact.

use std::io::Write;

use crate::error::{Result, TfmrError};
use crate::solver::{PointOutcome, SweepResult};

/// Writes sweep results as comma-separated rows.
pub struct CsvReport<W: Write> {
    out: W,
    /// Interior junction count (`num_turns - 1`)
    interior: usize,
    header_written: bool,
}

impl<W: Write> CsvReport<W> {
    pub fn new(out: W, num_turns: usize) -> Self {
        Self {
            out,
            interior: num_turns.saturating_sub(1),
            header_written: false,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        let mut line = String::from("frequency_hz,model,z_mag_ohm,z_phase_deg,valid");
        for k in 1..=self.interior {
            line.push_str(&format!(",turn_{k}_db"));
        }
        self.write_line(&line)?;
        self.header_written = true;
        Ok(())
    }

    /// Append every point of `result` under the model name `model`.
    pub fn write_sweep(&mut self, model: &str, result: &SweepResult) -> Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        for (frequency, point) in result.frequencies.iter().zip(&result.points) {
            let line = match point {
                PointOutcome::Solved(sample) => {
                    let z = sample.input_impedance;
                    let mut line = format!(
                        "{frequency:e},{model},{:e},{:.4},true",
                        z.norm(),
                        z.arg().to_degrees()
                    );
                    for k in 0..self.interior {
                        match sample.transfer_db.get(k) {
                            Some(db) => line.push_str(&format!(",{db:.6}")),
                            None => line.push(','),
                        }
                    }
                    line
                }
                PointOutcome::Invalid(_) => {
                    format!("{frequency:e},{model},,,false{}", ",".repeat(self.interior))
                }
            };
            self.write_line(&line)?;
        }
        Ok(())
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().map_err(output_error)?;
        Ok(self.out)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").map_err(output_error)
    }
}

fn output_error(e: std::io::Error) -> TfmrError {
    TfmrError::OutputError {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{InvalidPoint, ResponseSample};
    use num_complex::Complex64;

    fn result() -> SweepResult {
        let one = Complex64::new(1.0, 0.0);
        let sample = ResponseSample::from_junctions(
            1e3,
            Complex64::new(0.0, 10.0),
            &[one, one * 0.1, one * 0.01, one * 0.0],
            "test",
        )
        .unwrap();
        SweepResult {
            frequencies: vec![1e3, 2e3],
            points: vec![
                PointOutcome::Solved(sample),
                PointOutcome::Invalid(InvalidPoint {
                    index: 1,
                    frequency: 2e3,
                    error: TfmrError::SingularSystem {
                        frequency: 2e3,
                        stage: "boundary system",
                    },
                }),
            ],
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut report = CsvReport::new(Vec::new(), 3);
        report.write_sweep("mtl", &result()).unwrap();
        let text = String::from_utf8(report.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "frequency_hz,model,z_mag_ohm,z_phase_deg,valid,turn_1_db,turn_2_db"
        );
        assert_eq!(lines[1], "1e3,mtl,1e1,90.0000,true,-20.000000,-40.000000");
        assert_eq!(lines[2], "2e3,mtl,,,false,,");
    }

    #[test]
    fn test_header_written_once() {
        let mut report = CsvReport::new(Vec::new(), 3);
        report.write_sweep("mtl", &result()).unwrap();
        report.write_sweep("lumped", &result()).unwrap();
        let text = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert_eq!(text.matches("frequency_hz").count(), 1);
    }
}
