use crate::error::{ChartError, Result};
use crate::identity::CanonicalIdentity;
use serde::Deserialize;
use std::path::Path;

/// Accuracy logs store error as a fraction; charts show percent.
pub const PERCENT: f64 = 100.0;

const ACCURACY_COLUMNS: usize = 4;

/// The part of Criterion's `estimates.json` this crate reads.
#[derive(Debug, Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Debug, Deserialize)]
struct Estimate {
    point_estimate: f64,
}

/// Mean time of one benchmark, in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEstimateRecord {
    pub identity: CanonicalIdentity,
    pub value: f64,
    pub benchmark_group: String,
}

/// One row of an accuracy log, already scaled to percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracySample {
    /// True number of distinct elements inserted
    pub input_size: u64,
    pub mean_error_pct: f64,
    pub min_error_pct: f64,
    pub max_error_pct: f64,
}

impl AccuracySample {
    /// Whether `min <= mean <= max` holds.
    pub fn is_ordered(&self) -> bool {
        self.min_error_pct <= self.mean_error_pct && self.mean_error_pct <= self.max_error_pct
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ChartError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `mean.point_estimate` from a Criterion estimates file.
///
/// A missing file or field means the benchmark run is incomplete, which is
/// always an error.
pub fn parse_point_estimate(path: &Path) -> Result<f64> {
    let contents = read(path)?;
    let estimates: Estimates =
        serde_json::from_str(&contents).map_err(|source| ChartError::Estimate {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(estimates.mean.point_estimate)
}

/// Read an accuracy log of `input_size,mean,min,max` rows.
///
/// Rows with a `NaN` error column are dropped. A row without exactly four
/// columns fails the whole file.
pub fn parse_accuracy_series(path: &Path) -> Result<Vec<AccuracySample>> {
    let contents = read(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut samples = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|source| ChartError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() < ACCURACY_COLUMNS {
            return Err(ChartError::ShortRow {
                path: path.to_path_buf(),
                line,
                found: record.len(),
            });
        }
        if record.len() > ACCURACY_COLUMNS {
            return Err(ChartError::LongRow {
                path: path.to_path_buf(),
                line,
                found: record.len(),
            });
        }

        let field = |index: usize, column: &'static str| -> Result<f64> {
            record[index]
                .parse::<f64>()
                .map_err(|_| ChartError::InvalidField {
                    path: path.to_path_buf(),
                    line,
                    column,
                    value: record[index].to_string(),
                })
        };

        // A NaN mean marks a failed trial; the rest of the row is not read.
        let mean = field(1, "mean error")?;
        if !mean.is_finite() {
            dropped += 1;
            continue;
        }

        let input_size = record[0]
            .parse::<u64>()
            .map_err(|_| ChartError::InvalidField {
                path: path.to_path_buf(),
                line,
                column: "input size",
                value: record[0].to_string(),
            })?;
        let min = field(2, "min error")?;
        let max = field(3, "max error")?;

        if min.is_nan() || max.is_nan() {
            dropped += 1;
            continue;
        }

        let sample = AccuracySample {
            input_size,
            mean_error_pct: mean * PERCENT,
            min_error_pct: min * PERCENT,
            max_error_pct: max * PERCENT,
        };
        if !sample.is_ordered() {
            tracing::warn!(
                path = %path.display(),
                line,
                "error bounds do not enclose the mean"
            );
        }
        samples.push(sample);
    }

    if dropped > 0 {
        tracing::debug!(path = %path.display(), dropped, "dropped NaN rows");
    }
    Ok(samples)
}
