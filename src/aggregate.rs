use crate::error::{ChartError, Result};
use crate::identity::CanonicalIdentity;
use crate::parse::{AccuracySample, PointEstimateRecord};
use std::collections::BTreeMap;

/// A single measurement waiting to be grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identity: CanonicalIdentity,
    pub x: u64,
    pub y: f64,
    /// `(min, max)` around `y`, when the source has one
    pub band: Option<(f64, f64)>,
}

impl Observation {
    pub fn accuracy(identity: CanonicalIdentity, sample: &AccuracySample) -> Self {
        Self {
            identity,
            x: sample.input_size,
            y: sample.mean_error_pct,
            band: Some((sample.min_error_pct, sample.max_error_pct)),
        }
    }

    /// A point estimate placed at category `x` (its position in the chart's
    /// group list, or its item count).
    pub fn estimate(record: PointEstimateRecord, x: u64) -> Self {
        Self {
            identity: record.identity,
            x,
            y: record.value,
            band: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: u64,
    pub y: f64,
    pub band: Option<(f64, f64)>,
}

/// Points of one implementation, strictly ascending by `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub identity: CanonicalIdentity,
    pub points: Vec<Point>,
}

impl Series {
    pub fn get(&self, x: u64) -> Option<&Point> {
        self.points
            .binary_search_by_key(&x, |p| p.x)
            .ok()
            .map(|i| &self.points[i])
    }
}

/// Keeps points with `lo < x < hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainFilter {
    pub lo: u64,
    pub hi: u64,
}

impl DomainFilter {
    pub fn new(lo: u64, hi: u64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, x: u64) -> bool {
        self.lo < x && x < self.hi
    }
}

/// What to do when one implementation has several values at the same `x`,
/// which happens when a benchmark is re-run under a second directory name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DuplicatePolicy {
    /// The value seen last in discovery order wins. Discovery order is not
    /// stable, so a warning is logged for every conflict.
    #[default]
    KeepLast,
    /// Mean of all values (and of the band bounds).
    Average,
    /// Conflicting values abort the chart.
    Reject,
}

/// Group observations by identity and sort each group by `x`.
///
/// The domain filter runs after sorting and merging; it only hides points
/// from the chart.
pub fn aggregate<I>(
    observations: I,
    filter: Option<DomainFilter>,
    policy: DuplicatePolicy,
) -> Result<BTreeMap<CanonicalIdentity, Series>>
where
    I: IntoIterator<Item = Observation>,
{
    let mut groups: BTreeMap<CanonicalIdentity, Vec<Point>> = BTreeMap::new();
    for obs in observations {
        groups.entry(obs.identity).or_default().push(Point {
            x: obs.x,
            y: obs.y,
            band: obs.band,
        });
    }

    let mut series = BTreeMap::new();
    for (identity, mut points) in groups {
        // Stable, so equal x keep discovery order for KeepLast.
        points.sort_by_key(|p| p.x);
        let mut points = merge_duplicates(&identity, points, policy)?;
        if let Some(filter) = filter {
            points.retain(|p| filter.contains(p.x));
        }
        series.insert(identity.clone(), Series { identity, points });
    }
    Ok(series)
}

fn merge_duplicates(
    identity: &CanonicalIdentity,
    points: Vec<Point>,
    policy: DuplicatePolicy,
) -> Result<Vec<Point>> {
    let mut merged: Vec<Point> = Vec::with_capacity(points.len());
    let mut run = 1usize;

    for point in points {
        let Some(last) = merged.last_mut().filter(|last| last.x == point.x) else {
            merged.push(point);
            run = 1;
            continue;
        };
        match policy {
            DuplicatePolicy::KeepLast => {
                if *last != point {
                    tracing::warn!(%identity, x = point.x, "duplicate point, keeping the last one");
                }
                *last = point;
            }
            DuplicatePolicy::Average => {
                run += 1;
                let n = run as f64;
                last.y += (point.y - last.y) / n;
                last.band = match (last.band, point.band) {
                    (Some((lo, hi)), Some((plo, phi))) => {
                        Some((lo + (plo - lo) / n, hi + (phi - hi) / n))
                    }
                    _ => None,
                };
            }
            DuplicatePolicy::Reject if *last == point => {}
            DuplicatePolicy::Reject => {
                return Err(ChartError::DuplicatePoint {
                    identity: identity.clone(),
                    x: point.x,
                });
            }
        }
    }
    Ok(merged)
}
