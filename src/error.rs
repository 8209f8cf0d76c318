use std::path::PathBuf;
use thiserror::Error;

use crate::identity::CanonicalIdentity;

/// Fatal conditions for a chart build. Anything that can be skipped is
/// logged where it happens and never becomes one of these.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read `mean.point_estimate` from {}", path.display())]
    Estimate {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: expected 4 columns, found {found}", path.display())]
    ShortRow {
        path: PathBuf,
        line: u64,
        found: usize,
    },
    #[error("{}:{line}: expected 4 columns, found {found}", path.display())]
    LongRow {
        path: PathBuf,
        line: u64,
        found: usize,
    },
    #[error("{}:{line}: invalid {column} value {value:?}", path.display())]
    InvalidField {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("malformed CSV in {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("`{identity}` has data but no entry in the series registry")]
    Unstyled { identity: CanonicalIdentity },
    #[error("`{identity}` has conflicting values at x = {x}")]
    DuplicatePoint { identity: CanonicalIdentity, x: u64 },
    #[error("invalid series registry: {0}")]
    Registry(String),
    #[error("chart has no data: {0}")]
    Empty(String),
    #[error("drawing failed: {0}")]
    Draw(String),
}

/// A directory name that none of the sized-name strategies could split.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot split {raw:?} into item count and implementation")]
pub struct NameError {
    pub raw: String,
}

pub type Result<T, E = ChartError> = std::result::Result<T, E>;
