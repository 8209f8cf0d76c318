//! One function per chart: find the artifacts, turn them into series, lay
//! the chart out and draw it.

use crate::aggregate::{aggregate, DomainFilter, DuplicatePolicy, Observation, Series};
use crate::chart::{
    render_bar_chart, render_line_chart, AxisClamp, BarChart, BarPlan, LegendCorner, LineChart,
    LinePlan, Scale,
};
use crate::error::{ChartError, Result};
use crate::identity::{normalize, CanonicalIdentity};
use crate::locate::{locate_accuracy, locate_point_estimates, parse_sized_name, RawArtifactRef};
use crate::parse::{parse_accuracy_series, parse_point_estimate, PointEstimateRecord};
use crate::registry::{SeriesRegistry, StyleLookup};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Nanoseconds per microsecond.
const NANOS_PER_MICRO: f64 = 1000.0;

/// Point estimates of every recognized benchmark in `refs`, placed at `x`.
/// Unrecognized directory names are skipped.
pub fn point_observations(refs: &[RawArtifactRef], x: u64) -> Result<Vec<Observation>> {
    let mut observations = Vec::with_capacity(refs.len());
    for artifact in refs {
        let Some(identity) = normalize(&artifact.raw_identifier) else {
            tracing::debug!(raw = %artifact.raw_identifier, "skipping unrecognized benchmark");
            continue;
        };
        let record = read_estimate(artifact, identity)?;
        observations.push(Observation::estimate(record, x));
    }
    Ok(observations)
}

/// Point estimates of sized benchmarks (`items-<n>-<name>`), placed at their
/// item count. Names that do not parse are skipped.
pub fn sized_observations(refs: &[RawArtifactRef]) -> Result<Vec<Observation>> {
    let mut observations = Vec::with_capacity(refs.len());
    for artifact in refs {
        let sized = match parse_sized_name(&artifact.raw_identifier) {
            Ok(sized) => sized,
            Err(e) => {
                tracing::debug!(error = %e, "skipping benchmark");
                continue;
            }
        };
        let Some(identity) = normalize(&sized.name) else {
            tracing::debug!(raw = %artifact.raw_identifier, "skipping unrecognized benchmark");
            continue;
        };
        let record = read_estimate(artifact, identity)?;
        observations.push(Observation::estimate(record, sized.items));
    }
    Ok(observations)
}

/// Accuracy samples of every log in `refs` whose name the registry knows.
pub fn accuracy_observations(
    refs: &[RawArtifactRef],
    registry: &SeriesRegistry,
) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for artifact in refs {
        let identity = match registry.lookup_artifact(&artifact.raw_identifier) {
            StyleLookup::Found(style) => style.identity.clone(),
            StyleLookup::Unrecognized => {
                tracing::debug!(raw = %artifact.raw_identifier, "skipping unlisted accuracy log");
                continue;
            }
        };
        let samples = parse_accuracy_series(&artifact.artifact_path)?;
        tracing::debug!(%identity, rows = samples.len(), "read accuracy log");
        observations.extend(
            samples
                .iter()
                .map(|sample| Observation::accuracy(identity.clone(), sample)),
        );
    }
    Ok(observations)
}

fn read_estimate(artifact: &RawArtifactRef, identity: CanonicalIdentity) -> Result<PointEstimateRecord> {
    let value = parse_point_estimate(&artifact.artifact_path)?;
    Ok(PointEstimateRecord {
        identity,
        value,
        benchmark_group: artifact.benchmark_group.clone(),
    })
}

fn summarize(chart: &str, refs: usize, data: &BTreeMap<CanonicalIdentity, Series>) {
    let points: usize = data.values().map(|s| s.points.len()).sum();
    tracing::info!(
        chart,
        artifacts = refs,
        series = data.len(),
        points,
        "aggregated"
    );
}

fn output_file(output_dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|source| ChartError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    Ok(output_dir.join(name))
}

/// Mean time per benchmark group as bars; one cluster per group.
#[derive(Debug, Clone)]
pub struct BarsReport {
    pub criterion_dir: PathBuf,
    pub groups: Vec<String>,
    /// Operations per measured iteration
    pub divisor: f64,
    pub log_y: bool,
    pub title: Option<String>,
    pub y_desc: String,
    pub clamp: AxisClamp,
}

impl BarsReport {
    pub fn plan(&self, registry: &SeriesRegistry, policy: DuplicatePolicy) -> Result<BarPlan> {
        let mut observations = Vec::new();
        let mut found = 0;
        for (index, group) in self.groups.iter().enumerate() {
            let refs = locate_point_estimates(&self.criterion_dir, group)?;
            found += refs.len();
            observations.extend(point_observations(&refs, index as u64)?);
        }
        let data = aggregate(observations, None, policy)?;
        summarize("bars", found, &data);

        let title = self.title.clone().unwrap_or_else(|| match self.groups.as_slice() {
            [group] => format!("HyperLogLog {group} Time (Precision = 14)"),
            _ => "HyperLogLog Latency (Lower is Better)".to_string(),
        });
        BarChart {
            title,
            y_desc: self.y_desc.clone(),
            categories: self.groups.clone(),
            divisor: self.divisor,
            unit: "µs".to_string(),
            log_y: self.log_y,
            clamp: self.clamp,
        }
        .plan(registry, &data)
    }

    pub fn run(
        &self,
        registry: &SeriesRegistry,
        policy: DuplicatePolicy,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let plan = self.plan(registry, policy)?;
        let name = format!("bars_{}.svg", self.groups.join("_").to_lowercase());
        let path = output_file(output_dir, &name)?;
        render_bar_chart(&plan, &path)?;
        Ok(path)
    }
}

/// Insert-then-count time against item count.
#[derive(Debug, Clone)]
pub struct FillReport {
    pub criterion_dir: PathBuf,
    pub group: String,
    pub window: DomainFilter,
    pub title: String,
    pub clamp: AxisClamp,
}

impl FillReport {
    pub fn plan(&self, registry: &SeriesRegistry, policy: DuplicatePolicy) -> Result<LinePlan> {
        let refs = locate_point_estimates(&self.criterion_dir, &self.group)?;
        let data = aggregate(sized_observations(&refs)?, Some(self.window), policy)?;
        summarize("fill", refs.len(), &data);

        LineChart {
            title: self.title.clone(),
            x_desc: "Number of Items".to_string(),
            y_desc: "Mean Execution Time (µs)".to_string(),
            x_scale: Scale::LOG2,
            y_scale: Scale::LOG10,
            clamp: self.clamp,
            divisor: NANOS_PER_MICRO,
            band: false,
            markers: true,
            legend_corner: LegendCorner::LowerRight,
        }
        .plan(registry, &data)
    }

    pub fn run(
        &self,
        registry: &SeriesRegistry,
        policy: DuplicatePolicy,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let plan = self.plan(registry, policy)?;
        let path = output_file(output_dir, &format!("{}.svg", self.group.to_lowercase()))?;
        render_line_chart(&plan, &path)?;
        Ok(path)
    }
}

/// Relative error against true cardinality, with the min/max band.
#[derive(Debug, Clone)]
pub struct AccuracyReport {
    pub accuracy_dir: PathBuf,
    pub title: String,
    pub clamp: AxisClamp,
}

impl AccuracyReport {
    pub fn plan(&self, registry: &SeriesRegistry, policy: DuplicatePolicy) -> Result<LinePlan> {
        let refs = locate_accuracy(&self.accuracy_dir, registry.artifacts());
        let data = aggregate(accuracy_observations(&refs, registry)?, None, policy)?;
        summarize("accuracy", refs.len(), &data);

        LineChart {
            title: self.title.clone(),
            x_desc: "True Number of Distinct Elements".to_string(),
            y_desc: "Error %".to_string(),
            x_scale: Scale::LOG10,
            y_scale: Scale::LOG10,
            clamp: self.clamp,
            divisor: 1.0,
            band: true,
            markers: false,
            legend_corner: LegendCorner::UpperLeft,
        }
        .plan(registry, &data)
    }

    pub fn run(
        &self,
        registry: &SeriesRegistry,
        policy: DuplicatePolicy,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let plan = self.plan(registry, policy)?;
        let path = output_file(output_dir, "accuracy.svg")?;
        render_line_chart(&plan, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::BarPlan;
    use crate::locate::ESTIMATES_FILE;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::TempDir;

    fn write_estimate(root: &Path, group: &str, dir: &str, mean_ns: f64) {
        let path = root.join(group).join(dir).join(ESTIMATES_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(r#"{{"mean":{{"point_estimate":{mean_ns:?},"standard_error":1.0}}}}"#),
        )
        .unwrap();
    }

    fn id(s: &str) -> CanonicalIdentity {
        normalize(s).unwrap()
    }

    fn bars(root: &Path, groups: &[&str]) -> BarsReport {
        BarsReport {
            criterion_dir: root.to_path_buf(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            divisor: 1.0,
            log_y: false,
            title: None,
            y_desc: "Speed (ns)".into(),
            clamp: AxisClamp::default(),
        }
    }

    fn bar_order(plan: &BarPlan) -> Vec<CanonicalIdentity> {
        plan.bars.iter().map(|b| b.identity.clone()).collect()
    }

    #[test]
    fn test_bars_end_to_end() {
        let dir = TempDir::new().unwrap();
        write_estimate(dir.path(), "Insert", "hyperloglockless__hyperloglog", 123400.0);
        write_estimate(dir.path(), "Insert", "hyperloglogplus_hyperloglogpf", 42.7);
        write_estimate(dir.path(), "Insert", "not-a-crate", 1.0);
        fs::create_dir_all(dir.path().join("Insert/report")).unwrap();

        let registry = SeriesRegistry::latency_preset().unwrap();
        let plan = bars(dir.path(), &["Insert"])
            .plan(&registry, DuplicatePolicy::KeepLast)
            .unwrap();

        assert_eq!(plan.title, "HyperLogLog Insert Time (Precision = 14)");
        let labels: Vec<&str> = plan.bars.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, ["123 µs", "42.70"]);
        assert_eq!(
            bar_order(&plan),
            [
                id("hyperloglockless::HyperLogLog"),
                id("hyperloglogplus::HyperLogLogPF")
            ]
        );
    }

    #[test]
    fn test_bars_incomplete_run_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_estimate(dir.path(), "Count", "hyperloglockless__hyperloglog", 10.0);
        fs::create_dir_all(dir.path().join("Count/hyperloglogplus__hyperloglogpf")).unwrap();

        let registry = SeriesRegistry::latency_preset().unwrap();
        let err = bars(dir.path(), &["Count"])
            .plan(&registry, DuplicatePolicy::KeepLast)
            .unwrap_err();
        assert!(matches!(err, ChartError::Io { .. }));
    }

    #[test]
    fn test_bars_unstyled_identity_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_estimate(dir.path(), "Insert", "hyperloglockless__hyperloglog", 10.0);
        write_estimate(dir.path(), "Insert", "hyperloglog__hyperloglog", 12.0);

        let registry = SeriesRegistry::latency_preset().unwrap();
        let err = bars(dir.path(), &["Insert"])
            .plan(&registry, DuplicatePolicy::KeepLast)
            .unwrap_err();
        assert!(matches!(
            err,
            ChartError::Unstyled { identity } if identity == id("hyperloglog::HyperLogLog")
        ));
    }

    #[test]
    fn test_registry_order_survives_shuffled_discovery() {
        let dir = TempDir::new().unwrap();
        let registry = SeriesRegistry::latency_preset().unwrap();
        for (i, style) in registry.styles().iter().enumerate() {
            write_estimate(dir.path(), "Insert", &style.identity.encode(), 10.0 + i as f64);
            write_estimate(dir.path(), "Count", &style.identity.encode(), 20.0 + i as f64);
        }
        let expected: Vec<CanonicalIdentity> = registry
            .styles()
            .iter()
            .map(|s| s.identity.clone())
            .collect();

        let insert = locate_point_estimates(dir.path(), "Insert").unwrap();
        let count = locate_point_estimates(dir.path(), "Count").unwrap();
        let chart = BarChart {
            title: "t".into(),
            y_desc: "ns".into(),
            categories: vec!["Insert".into(), "Count".into()],
            divisor: 1.0,
            unit: "µs".into(),
            log_y: false,
            clamp: AxisClamp::default(),
        };

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut insert = insert.clone();
            let mut count = count.clone();
            insert.shuffle(&mut rng);
            count.shuffle(&mut rng);

            let mut observations = point_observations(&insert, 0).unwrap();
            observations.extend(point_observations(&count, 1).unwrap());
            observations.shuffle(&mut rng);

            let data = aggregate(observations, None, DuplicatePolicy::KeepLast).unwrap();
            let plan = chart.plan(&registry, &data).unwrap();

            let order = bar_order(&plan);
            assert_eq!(order[..expected.len()], expected[..], "seed {seed}");
            assert_eq!(order[expected.len()..], expected[..], "seed {seed}");
        }
    }

    #[test]
    fn test_fill_end_to_end() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for items in [64u64, 128, 4096, 1 << 20] {
            write_estimate(
                root,
                "Fill",
                &format!("items-{items}-hyperloglockless__hyperloglog"),
                items as f64 * 10.0,
            );
        }
        write_estimate(root, "Fill", "items-hyperloglogplus__hyperloglogpf-4096", 81920.0);
        write_estimate(root, "Fill", "items-many-things", 1.0);

        let report = FillReport {
            criterion_dir: root.to_path_buf(),
            group: "Fill".into(),
            window: DomainFilter::new(64, 1 << 20),
            title: "Fill".into(),
            clamp: AxisClamp::default(),
        };
        let plan = report
            .plan(&SeriesRegistry::fill_preset().unwrap(), DuplicatePolicy::Reject)
            .unwrap();

        // Registry order draws hyperloglogplus first.
        assert_eq!(plan.lines[0].identity, id("hyperloglogplus::HyperLogLogPF"));
        assert_eq!(plan.lines[0].points, [(4096.0, 81.92)]);
        assert_eq!(plan.lines[1].points, [(128.0, 1.28), (4096.0, 40.96)]);
        // Legend puts the highlighted implementation first.
        assert_eq!(plan.legend[0].label, "hyperloglockless::HyperLogLog");
    }

    #[test]
    fn test_accuracy_end_to_end() {
        let dir = TempDir::new().unwrap();
        let acc = dir.path().join("Acc");
        fs::create_dir_all(&acc).unwrap();
        fs::write(
            acc.join("hyperloglockless (Precision = 16).csv"),
            "1000,0.02,0.01,0.03\n1000000,NaN,0.0,0.0\n",
        )
        .unwrap();

        let report = AccuracyReport {
            accuracy_dir: acc,
            title: "Error".into(),
            clamp: AxisClamp::default(),
        };
        let plan = report
            .plan(&SeriesRegistry::accuracy_preset().unwrap(), DuplicatePolicy::KeepLast)
            .unwrap();

        assert_eq!(plan.lines.len(), 1);
        let line = &plan.lines[0];
        assert_eq!(line.identity, id("hyperloglockless::HyperLogLog"));
        assert_eq!(line.points.len(), 1);
        assert_eq!(line.points[0].0, 1000.0);
        assert!((line.points[0].1 - 2.0).abs() < 1e-9);
        assert_eq!(plan.legend[0].label, "hyperloglockless (Precision = 16)");
    }

    #[test]
    fn test_accuracy_short_row_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("hyperloglogplus (Precision = 16).csv"),
            "1000,0.02,0.01\n",
        )
        .unwrap();

        let report = AccuracyReport {
            accuracy_dir: dir.path().to_path_buf(),
            title: "Error".into(),
            clamp: AxisClamp::default(),
        };
        let err = report
            .plan(&SeriesRegistry::accuracy_preset().unwrap(), DuplicatePolicy::KeepLast)
            .unwrap_err();
        assert!(matches!(err, ChartError::ShortRow { .. }));
    }
}
