use crate::error::{ChartError, NameError, Result};
use std::path::{Path, PathBuf};

/// Criterion's HTML summary directory, present next to every benchmark.
pub const REPORT_DIR: &str = "report";

/// Where Criterion keeps the estimates of the saved baseline, relative to a
/// benchmark directory.
pub const ESTIMATES_FILE: &str = "base/estimates.json";

/// A result file found on disk, before its identifier has been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifactRef {
    /// Directory name or file stem, exactly as found
    pub raw_identifier: String,
    pub artifact_path: PathBuf,
    /// Criterion group, or the accuracy directory name
    pub benchmark_group: String,
}

/// Find the point estimate file of every benchmark in `root/group`.
///
/// Every subdirectory except [`REPORT_DIR`] yields one reference, whether or
/// not its estimates file exists; reading a missing file later is fatal.
/// Entries come back in directory enumeration order.
pub fn locate_point_estimates(root: &Path, group: &str) -> Result<Vec<RawArtifactRef>> {
    let group_dir = root.join(group);
    let mut refs = Vec::new();

    for entry in read_dir(&group_dir)? {
        let entry = entry.map_err(|source| io_error(&group_dir, source))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == REPORT_DIR {
            continue;
        }
        refs.push(RawArtifactRef {
            artifact_path: path.join(ESTIMATES_FILE),
            raw_identifier: name,
            benchmark_group: group.to_string(),
        });
    }

    tracing::debug!(group, found = refs.len(), "located point estimates");
    Ok(refs)
}

/// Find `dir/<label>.csv` for each allowed label. Labels without a file are
/// left out.
pub fn locate_accuracy<'a, I>(dir: &Path, labels: I) -> Vec<RawArtifactRef>
where
    I: IntoIterator<Item = &'a str>,
{
    let group = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    labels
        .into_iter()
        .filter_map(|label| {
            let path = dir.join(format!("{label}.csv"));
            if path.is_file() {
                Some(RawArtifactRef {
                    raw_identifier: label.to_string(),
                    artifact_path: path,
                    benchmark_group: group.clone(),
                })
            } else {
                tracing::debug!(label, path = %path.display(), "no accuracy log");
                None
            }
        })
        .collect()
}

fn read_dir(dir: &Path) -> Result<std::fs::ReadDir> {
    std::fs::read_dir(dir).map_err(|source| io_error(dir, source))
}

fn io_error(path: &Path, source: std::io::Error) -> ChartError {
    ChartError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A benchmark directory named after an item count and an implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedName {
    pub items: u64,
    pub name: String,
}

/// Layouts seen for sized benchmark ids, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizedLayout {
    /// `items-4096-hyperloglogplus__hyperloglogpf`
    CountFirst,
    /// `items-hyperloglogplus__hyperloglogpf-4096`
    CountLast,
}

impl SizedLayout {
    const ALL: [SizedLayout; 2] = [SizedLayout::CountFirst, SizedLayout::CountLast];

    fn parse(&self, raw: &str) -> Option<SizedName> {
        let (_, rest) = raw.split_once('-')?;
        let (count, name) = match self {
            SizedLayout::CountFirst => rest.split_once('-')?,
            SizedLayout::CountLast => {
                let (name, count) = rest.rsplit_once('-')?;
                (count, name)
            }
        };
        if name.is_empty() {
            return None;
        }
        Some(SizedName {
            items: count.parse().ok()?,
            name: name.to_string(),
        })
    }
}

/// Split a sized benchmark directory name into its item count and the raw
/// implementation name.
pub fn parse_sized_name(raw: &str) -> Result<SizedName, NameError> {
    let error = || NameError {
        raw: raw.to_string(),
    };
    if raw.split('-').count() < 3 {
        return Err(error());
    }
    SizedLayout::ALL
        .iter()
        .find_map(|layout| layout.parse(raw))
        .ok_or_else(error)
}
