use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hll_bench_charts::aggregate::{DomainFilter, DuplicatePolicy};
use hll_bench_charts::chart::AxisClamp;
use hll_bench_charts::registry::SeriesRegistry;
use hll_bench_charts::report::{AccuracyReport, BarsReport, FillReport};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "hll-bench-charts")]
#[command(about = "Charts for HyperLogLog benchmark and accuracy results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Output directory for charts
    #[arg(short, long, default_value = "./charts")]
    output: PathBuf,

    /// JSON file listing the series to draw, in draw order
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// How to resolve several values for one implementation at one x
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::KeepLast)]
    duplicates: DuplicatePolicy,

    /// Enable debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bar chart of mean time per Criterion group
    Bars {
        /// Criterion output directory
        #[arg(long, default_value = "target/criterion")]
        criterion_dir: PathBuf,

        /// Benchmark group to include; repeat for a grouped chart
        #[arg(short, long = "group", default_value = "Insert")]
        groups: Vec<String>,

        /// Operations per measured iteration
        #[arg(long, default_value = "1.0")]
        divisor: f64,

        /// Logarithmic y axis
        #[arg(long, default_value = "false")]
        log_y: bool,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, default_value = "Speed (ns)")]
        y_label: String,

        #[command(flatten)]
        common: Common,
    },

    /// Line chart of insert-then-count time against item count
    Fill {
        /// Criterion output directory
        #[arg(long, default_value = "target/criterion")]
        criterion_dir: PathBuf,

        #[arg(short, long, default_value = "Fill")]
        group: String,

        /// Item counts at or below this are hidden
        #[arg(long, default_value = "64")]
        min_items: u64,

        /// Item counts at or above this are hidden
        #[arg(long, default_value = "1048576")]
        max_items: u64,

        #[arg(
            long,
            default_value = "HyperLogLog Performance (Lower is Better): Insert then Count"
        )]
        title: String,

        #[command(flatten)]
        common: Common,
    },

    /// Line chart of relative error against true cardinality
    Accuracy {
        /// Directory holding one `<label>.csv` per implementation
        #[arg(long, default_value = "Acc")]
        dir: PathBuf,

        #[arg(long, default_value = "1e6")]
        x_min: f64,

        #[arg(long, default_value = "1e10")]
        x_max: f64,

        #[arg(long, default_value = "0.01")]
        y_min: f64,

        #[arg(long, default_value = "250")]
        y_max: f64,

        #[arg(long, default_value = "HyperLogLog Error (Lower is Better)")]
        title: String,

        #[command(flatten)]
        common: Common,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bars {
            criterion_dir,
            groups,
            divisor,
            log_y,
            title,
            y_label,
            common,
        } => {
            setup_logger(common.verbose);
            if !(divisor.is_finite() && divisor > 0.0) {
                anyhow::bail!("--divisor must be a positive number, got {divisor}");
            }
            let registry = load_registry(common.registry.as_deref(), SeriesRegistry::latency_preset)?;
            let report = BarsReport {
                criterion_dir,
                groups,
                divisor,
                log_y,
                title,
                y_desc: y_label,
                clamp: AxisClamp::default(),
            };
            let path = report
                .run(&registry, common.duplicates, &common.output)
                .with_context(|| format!("Failed to chart groups {:?}", report.groups))?;
            println!("Generated: {}", path.display());
        }
        Commands::Fill {
            criterion_dir,
            group,
            min_items,
            max_items,
            title,
            common,
        } => {
            setup_logger(common.verbose);
            let registry = load_registry(common.registry.as_deref(), SeriesRegistry::fill_preset)?;
            let report = FillReport {
                criterion_dir,
                group,
                window: DomainFilter::new(min_items, max_items),
                title,
                clamp: AxisClamp::default(),
            };
            let path = report
                .run(&registry, common.duplicates, &common.output)
                .with_context(|| format!("Failed to chart group {}", report.group))?;
            println!("Generated: {}", path.display());
        }
        Commands::Accuracy {
            dir,
            x_min,
            x_max,
            y_min,
            y_max,
            title,
            common,
        } => {
            setup_logger(common.verbose);
            let registry =
                load_registry(common.registry.as_deref(), SeriesRegistry::accuracy_preset)?;
            let report = AccuracyReport {
                accuracy_dir: dir,
                title,
                clamp: AxisClamp {
                    x_min: Some(x_min),
                    x_max: Some(x_max),
                    y_min: Some(y_min),
                    y_max: Some(y_max),
                },
            };
            let path = report
                .run(&registry, common.duplicates, &common.output)
                .with_context(|| {
                    format!("Failed to chart {}", report.accuracy_dir.display())
                })?;
            println!("Generated: {}", path.display());
        }
    }

    Ok(())
}

fn load_registry(
    path: Option<&Path>,
    preset: fn() -> hll_bench_charts::Result<SeriesRegistry>,
) -> Result<SeriesRegistry> {
    let registry = match path {
        Some(path) => SeriesRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => preset().context("Built-in registry is invalid")?,
    };
    tracing::debug!(series = registry.styles().len(), "registry loaded");
    Ok(registry)
}

fn setup_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = Targets::new().with_default(level);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
