use crate::error::{ChartError, Result};
use crate::identity::CanonicalIdentity;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_LINE_WEIGHT: f64 = 2.5;

/// An sRGB color, written `#rrggbb` in registry files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);

    /// Exchange two of the r/g/b channels, giving a related but distinct
    /// color for a sibling implementation.
    pub fn swap(self, i: usize, j: usize) -> Color {
        let mut c = [self.0, self.1, self.2];
        let t = c[i];
        c[i] = c[j];
        c[j] = t;
        Color(c[0], c[1], c[2])
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| format!("expected #rrggbb, got {s:?}"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("bad color {s:?}"))
        };
        Ok(Color(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Matplotlib's Set2 palette, the default for implementation colors.
pub const SET2: [Color; 8] = [
    Color(102, 194, 165),
    Color(252, 141, 98),
    Color(141, 160, 203),
    Color(231, 138, 195),
    Color(166, 216, 84),
    Color(255, 217, 47),
    Color(229, 196, 148),
    Color(179, 179, 179),
];

/// Midpoint of viridis.
pub const VIRIDIS_MID: Color = Color(33, 145, 140);
/// Darkest end of magma.
pub const MAGMA_LOW: Color = Color(0, 0, 4);

/// How one implementation is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub identity: CanonicalIdentity,
    pub label: String,
    pub color: Color,
    pub line_weight: f64,
    /// Position in the registry; series are drawn in this order
    pub draw_order: usize,
    /// Lower values come first in the legend
    pub legend_priority: i32,
    /// File stem of the accuracy log for this implementation
    pub artifact: String,
}

/// Result of looking an identity up in a [`SeriesRegistry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleLookup<'a> {
    Found(&'a SeriesStyle),
    Unrecognized,
}

/// One entry of a registry file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleEntry {
    pub identity: CanonicalIdentity,
    #[serde(default)]
    pub label: Option<String>,
    pub color: Color,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub legend_priority: i32,
    #[serde(default)]
    pub artifact: Option<String>,
}

impl StyleEntry {
    pub fn new(identity: CanonicalIdentity, color: Color) -> Self {
        Self {
            identity,
            label: None,
            color,
            weight: None,
            legend_priority: 0,
            artifact: None,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Move this series to the front of the legend.
    pub fn highlight(mut self) -> Self {
        self.legend_priority = -1;
        self
    }
}

/// Ordered styling table for one chart invocation.
///
/// The order of entries decides draw order. Legend order is draw order with
/// lower `legend_priority` entries moved first.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRegistry {
    styles: Vec<SeriesStyle>,
}

impl SeriesRegistry {
    pub fn new(entries: Vec<StyleEntry>) -> Result<Self> {
        let mut styles: Vec<SeriesStyle> = Vec::with_capacity(entries.len());
        for (draw_order, entry) in entries.into_iter().enumerate() {
            if styles.iter().any(|s| s.identity == entry.identity) {
                return Err(ChartError::Registry(format!(
                    "`{}` is listed twice",
                    entry.identity
                )));
            }
            let line_weight = entry.weight.unwrap_or(DEFAULT_LINE_WEIGHT);
            if !(line_weight.is_finite() && line_weight > 0.0) {
                return Err(ChartError::Registry(format!(
                    "`{}` has invalid weight {line_weight}",
                    entry.identity
                )));
            }
            let label = entry.label.unwrap_or_else(|| entry.identity.to_string());
            let artifact = entry.artifact.unwrap_or_else(|| label.clone());
            if styles.iter().any(|s| s.artifact == artifact) {
                return Err(ChartError::Registry(format!(
                    "`{}` reuses the artifact name {artifact:?}",
                    entry.identity
                )));
            }
            styles.push(SeriesStyle {
                artifact,
                identity: entry.identity,
                label,
                color: entry.color,
                line_weight,
                draw_order,
                legend_priority: entry.legend_priority,
            });
        }
        if styles.is_empty() {
            return Err(ChartError::Registry("no series configured".into()));
        }
        Ok(Self { styles })
    }

    /// Load an ordered JSON array of [`StyleEntry`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ChartError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<StyleEntry> = serde_json::from_str(&contents)
            .map_err(|e| ChartError::Registry(format!("{}: {e}", path.display())))?;
        Self::new(entries)
    }

    pub fn lookup(&self, identity: &CanonicalIdentity) -> StyleLookup<'_> {
        match self.styles.iter().find(|s| &s.identity == identity) {
            Some(style) => StyleLookup::Found(style),
            None => StyleLookup::Unrecognized,
        }
    }

    /// Like [`lookup`](Self::lookup), but an unknown identity is an error.
    pub fn require(&self, identity: &CanonicalIdentity) -> Result<&SeriesStyle> {
        match self.lookup(identity) {
            StyleLookup::Found(style) => Ok(style),
            StyleLookup::Unrecognized => Err(ChartError::Unstyled {
                identity: identity.clone(),
            }),
        }
    }

    /// The style whose accuracy log is named `artifact`.
    pub fn lookup_artifact(&self, artifact: &str) -> StyleLookup<'_> {
        match self.styles.iter().find(|s| s.artifact == artifact) {
            Some(style) => StyleLookup::Found(style),
            None => StyleLookup::Unrecognized,
        }
    }

    /// Styles in draw order.
    pub fn styles(&self) -> &[SeriesStyle] {
        &self.styles
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.artifact.as_str())
    }

    /// Styles in legend order: by `(legend_priority, draw_order)`.
    pub fn legend_order(&self) -> Vec<&SeriesStyle> {
        let mut order: Vec<&SeriesStyle> = self.styles.iter().collect();
        order.sort_by_key(|s| (s.legend_priority, s.draw_order));
        order
    }

    /// Every implementation in the insert/count comparisons.
    pub fn latency_preset() -> Result<Self> {
        let hll = SET2[0];
        Self::new(vec![
            entry("hyperloglockless::HyperLogLog", hll)?.highlight(),
            entry("hyperloglockless::AtomicHyperLogLog", hll)?.highlight(),
            entry("hyperloglockless::HyperLogLogPlus", hll)?.highlight(),
            entry("cardinality_estimator::CardinalityEstimator", Color::BLACK)?,
            entry("hyperloglogplus::HyperLogLogPF", Color::BLACK)?,
            entry("hyperloglogplus::HyperLogLogPlus", Color::BLACK)?,
            entry("amadeus_streaming::HyperLogLog", Color::BLACK)?,
            entry("probabilistic_collections::HyperLogLog", Color::BLACK)?,
            entry("apache_datafusion::HyperLogLog", Color::BLACK)?,
        ])
    }

    /// Insert-then-count over growing item counts; hyperloglockless is drawn
    /// last but listed first.
    pub fn fill_preset() -> Result<Self> {
        Self::new(vec![
            entry("hyperloglogplus::HyperLogLogPlus", SET2[1])?,
            entry("hyperloglogplus::HyperLogLogPF", SET2[2])?,
            entry("cardinality_estimator::CardinalityEstimator", SET2[3])?,
            entry("probabilistic_collections::HyperLogLog", SET2[4])?,
            entry("amadeus_streaming::HyperLogLog", SET2[5])?,
            entry("apache_datafusion::HyperLogLog", SET2[5].swap(1, 2))?,
            entry("hyperloglockless::HyperLogLog", SET2[0])?.highlight(),
            entry("hyperloglockless::HyperLogLogPlus", SET2[0].swap(1, 2))?.highlight(),
        ])
    }

    /// Error against true cardinality at precision 16.
    pub fn accuracy_preset() -> Result<Self> {
        Self::new(vec![
            entry("hyperloglogplus::HyperLogLogPlus", MAGMA_LOW)?
                .label("hyperloglogplus (Precision = 16)"),
            entry("hyperloglockless::HyperLogLog", VIRIDIS_MID)?
                .label("hyperloglockless (Precision = 16)")
                .highlight(),
        ])
    }
}

fn entry(identity: &str, color: Color) -> Result<StyleEntry> {
    let identity = identity.parse().map_err(ChartError::Registry)?;
    Ok(StyleEntry::new(identity, color))
}
