use crate::aggregate::Series;
use crate::error::{ChartError, Result};
use crate::identity::CanonicalIdentity;
use crate::registry::{Color, SeriesRegistry, SeriesStyle};
use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::Color as _;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeMap;
use std::path::Path;

// Font sizes
const TITLE_FONT_SIZE: u32 = 36;
const AXIS_LABEL_FONT_SIZE: u32 = 26;
const TICK_LABEL_FONT_SIZE: u32 = 20;
const LEGEND_FONT_SIZE: u32 = 20;
const DATA_LABEL_FONT_SIZE: u32 = 16;

// Layout tuning
const DEFAULT_MARGIN_BOTTOM: u32 = 55;
const DEFAULT_X_LABEL_AREA_SIZE: u32 = 60;

/// Values above this are shown in the next larger unit.
pub const UNIT_THRESHOLD: f64 = 1000.0;

/// Gap in pixels between a bar and its value label.
const VALUE_LABEL_OFFSET: i32 = 3;

/// Share of a category slot taken up by its bars.
const CLUSTER_WIDTH: f64 = 0.85;

/// Opacity of the min/max band around a line.
const BAND_ALPHA: f64 = 0.15;

const MARKER_SIZE: u32 = 4;

/// Text drawn above a bar. Anything over [`UNIT_THRESHOLD`] is divided by
/// 1000 and shown without decimals plus `unit`.
pub fn format_bar_label(value: f64, unit: &str) -> String {
    if value > UNIT_THRESHOLD {
        format!("{:.0} {unit}", value / UNIT_THRESHOLD)
    } else {
        format!("{value:.2}")
    }
}

/// Y axis tick text for line charts: whole numbers from 1 up, otherwise up
/// to three decimals with trailing zeros dropped.
pub fn format_tick(value: f64) -> String {
    if value >= 1.0 {
        format!("{}", value as i64)
    } else {
        let fixed = format!("{value:.3}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// X axis tick text for item counts.
pub fn format_count(value: f64) -> String {
    if value >= 1e5 {
        format!("{value:.0e}")
    } else {
        format!("{}", value.round() as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Linear,
    Log { base: f64 },
}

impl Scale {
    pub const LOG10: Scale = Scale::Log { base: 10.0 };
    pub const LOG2: Scale = Scale::Log { base: 2.0 };

    fn is_log(&self) -> bool {
        matches!(self, Scale::Log { .. })
    }

    /// Give a range with no span some room, so one x or one y value can
    /// still be placed on the axis.
    fn widen(&self, (lo, hi): (f64, f64)) -> (f64, f64) {
        if lo < hi {
            return (lo, hi);
        }
        match self {
            Scale::Log { .. } => (lo / 2.0, hi * 2.0),
            Scale::Linear if lo == 0.0 => (0.0, 1.0),
            Scale::Linear => (lo - lo.abs() / 2.0, hi + hi.abs() / 2.0),
        }
    }
}

/// Fixed axis limits that override the ones derived from the data. Points
/// outside are still part of the series, just not visible.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisClamp {
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl AxisClamp {
    fn apply_x(&self, (lo, hi): (f64, f64)) -> (f64, f64) {
        (self.x_min.unwrap_or(lo), self.x_max.unwrap_or(hi))
    }

    fn apply_y(&self, (lo, hi): (f64, f64)) -> (f64, f64) {
        (self.y_min.unwrap_or(lo), self.y_max.unwrap_or(hi))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegendCorner {
    #[default]
    UpperLeft,
    LowerRight,
}

impl From<LegendCorner> for SeriesLabelPosition {
    fn from(corner: LegendCorner) -> Self {
        match corner {
            LegendCorner::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendCorner::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    pub line_weight: f64,
}

impl From<&SeriesStyle> for LegendEntry {
    fn from(style: &SeriesStyle) -> Self {
        Self {
            label: style.label.clone(),
            color: style.color,
            line_weight: style.line_weight,
        }
    }
}

/// Every aggregated identity must have a style, and the chart must end up
/// with something to draw. Returns the styles to draw, in registry order.
fn styled_series<'a>(
    registry: &'a SeriesRegistry,
    data: &BTreeMap<CanonicalIdentity, Series>,
) -> Result<Vec<&'a SeriesStyle>> {
    for identity in data.keys() {
        registry.require(identity)?;
    }
    Ok(registry
        .styles()
        .iter()
        .filter(|s| data.get(&s.identity).is_some_and(|d| !d.points.is_empty()))
        .collect())
}

fn legend_for(registry: &SeriesRegistry, drawn: &[&SeriesStyle]) -> Vec<LegendEntry> {
    registry
        .legend_order()
        .into_iter()
        .filter(|s| drawn.iter().any(|d| d.identity == s.identity))
        .map(LegendEntry::from)
        .collect()
}

/// Grouped bar chart of one value per (category, implementation).
///
/// The aggregated series are expected to use the category index as `x`.
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub y_desc: String,
    pub categories: Vec<String>,
    /// Each value is divided by this before display
    pub divisor: f64,
    /// Suffix for values past [`UNIT_THRESHOLD`]
    pub unit: String,
    pub log_y: bool,
    pub clamp: AxisClamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub identity: CanonicalIdentity,
    pub left: f64,
    pub right: f64,
    pub value: f64,
    pub text: String,
    pub color: Color,
}

impl Bar {
    pub fn center(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

/// Everything needed to draw a bar chart, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct BarPlan {
    pub title: String,
    pub y_desc: String,
    /// Tick text for x = 0, 1, 2, ...
    pub ticks: Vec<String>,
    pub bars: Vec<Bar>,
    pub legend: Vec<LegendEntry>,
    pub y_range: (f64, f64),
    pub log_y: bool,
}

impl BarChart {
    /// Lay the bars out. Fails before anything is drawn when the data holds
    /// an identity the registry has no style for.
    pub fn plan(
        &self,
        registry: &SeriesRegistry,
        data: &BTreeMap<CanonicalIdentity, Series>,
    ) -> Result<BarPlan> {
        let drawn = styled_series(registry, data)?;
        if drawn.is_empty() {
            return Err(ChartError::Empty(self.title.clone()));
        }

        let mut bars = Vec::new();
        let ticks;
        let legend;

        if self.categories.len() == 1 {
            // One bar per implementation, named on the axis.
            ticks = drawn.iter().map(|s| s.label.clone()).collect();
            legend = Vec::new();
            for (slot, style) in drawn.iter().enumerate() {
                if let Some(point) = data[&style.identity].get(0) {
                    bars.push(self.bar(style, slot as f64, 0, 1, point.y));
                }
            }
        } else {
            ticks = self.categories.clone();
            legend = legend_for(registry, &drawn);
            for (category, _) in self.categories.iter().enumerate() {
                for (index, style) in drawn.iter().enumerate() {
                    if let Some(point) = data[&style.identity].get(category as u64) {
                        bars.push(self.bar(style, category as f64, index, drawn.len(), point.y));
                    }
                }
            }
        }

        if bars.is_empty() {
            return Err(ChartError::Empty(self.title.clone()));
        }

        let y_scale = if self.log_y { Scale::LOG10 } else { Scale::Linear };
        let max = bars.iter().map(|b| b.value).fold(f64::MIN, f64::max);
        let data_range = if self.log_y {
            let min = bars
                .iter()
                .map(|b| b.value)
                .filter(|v| *v > 0.0)
                .fold(f64::MAX, f64::min);
            (min.min(max) / 2.0, max * 3.0)
        } else {
            (0.0, max * 1.15)
        };

        Ok(BarPlan {
            title: self.title.clone(),
            y_desc: self.y_desc.clone(),
            ticks,
            bars,
            legend,
            y_range: self.clamp.apply_y(y_scale.widen(data_range)),
            log_y: self.log_y,
        })
    }

    /// Bar `index` of `n` in the slot centered on `center`; its left edge
    /// sits at `(index - n/2) * width` from the center.
    fn bar(&self, style: &SeriesStyle, center: f64, index: usize, n: usize, raw: f64) -> Bar {
        let width = CLUSTER_WIDTH / n as f64;
        let left = center + (index as f64 - n as f64 / 2.0) * width;
        let value = raw / self.divisor;
        Bar {
            identity: style.identity.clone(),
            left,
            right: left + width,
            value,
            text: format_bar_label(value, &self.unit),
            color: style.color,
        }
    }
}

/// One line per implementation, with an optional shaded min/max band.
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub clamp: AxisClamp,
    /// Divide every y (and band bound) by this
    pub divisor: f64,
    pub band: bool,
    pub markers: bool,
    pub legend_corner: LegendCorner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub identity: CanonicalIdentity,
    pub color: Color,
    pub line_weight: f64,
    pub points: Vec<(f64, f64)>,
    /// `(x, min, max)`; empty when bands are off
    pub band: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlan {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub lines: Vec<Line>,
    pub legend: Vec<LegendEntry>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub markers: bool,
    pub legend_corner: LegendCorner,
}

impl LineChart {
    /// Build the lines in registry order. Fails before anything is drawn
    /// when the data holds an identity the registry has no style for.
    pub fn plan(
        &self,
        registry: &SeriesRegistry,
        data: &BTreeMap<CanonicalIdentity, Series>,
    ) -> Result<LinePlan> {
        let drawn = styled_series(registry, data)?;

        let mut lines = Vec::with_capacity(drawn.len());
        for style in &drawn {
            let series = &data[&style.identity];
            let points: Vec<(f64, f64)> = series
                .points
                .iter()
                .map(|p| (p.x as f64, p.y / self.divisor))
                .filter(|&(x, y)| self.visible(x, y))
                .collect();
            if points.is_empty() {
                tracing::debug!(identity = %style.identity, "nothing to plot on this scale");
                continue;
            }
            let band = if self.band {
                series
                    .points
                    .iter()
                    .filter_map(|p| {
                        let (lo, hi) = p.band?;
                        Some((p.x as f64, lo / self.divisor, hi / self.divisor))
                    })
                    .filter(|&(x, _, hi)| self.visible(x, hi))
                    .collect()
            } else {
                Vec::new()
            };
            lines.push(Line {
                identity: style.identity.clone(),
                color: style.color,
                line_weight: style.line_weight,
                points,
                band,
            });
        }

        if lines.is_empty() {
            return Err(ChartError::Empty(self.title.clone()));
        }

        let xs = lines.iter().flat_map(|l| l.points.iter().map(|p| p.0));
        let x_range = self.clamp.apply_x(self.x_scale.widen(min_max(xs)));

        let ys = lines.iter().flat_map(|l| {
            l.points
                .iter()
                .map(|p| p.1)
                .chain(l.band.iter().flat_map(|b| [b.1, b.2]))
        });
        let (y_lo, y_hi) = min_max(ys.filter(|y| !self.y_scale.is_log() || *y > 0.0));
        let y_range = self.clamp.apply_y(self.y_scale.widen(match self.y_scale {
            Scale::Linear => (y_lo.min(0.0), y_hi * 1.1),
            Scale::Log { .. } => (y_lo / 1.5, y_hi * 1.5),
        }));

        // Band edges can reach zero, which a log axis cannot show.
        if self.y_scale.is_log() {
            for line in &mut lines {
                for b in &mut line.band {
                    b.1 = b.1.max(y_range.0);
                }
            }
        }

        let drawn_lines: Vec<&SeriesStyle> = drawn
            .into_iter()
            .filter(|s| lines.iter().any(|l| l.identity == s.identity))
            .collect();

        Ok(LinePlan {
            title: self.title.clone(),
            x_desc: self.x_desc.clone(),
            y_desc: self.y_desc.clone(),
            legend: legend_for(registry, &drawn_lines),
            lines,
            x_scale: self.x_scale,
            y_scale: self.y_scale,
            x_range,
            y_range,
            markers: self.markers,
            legend_corner: self.legend_corner,
        })
    }

    fn visible(&self, x: f64, y: f64) -> bool {
        (!self.x_scale.is_log() || x > 0.0) && (!self.y_scale.is_log() || y > 0.0) && y.is_finite()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn rgb(color: Color) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

fn stroke(weight: f64) -> u32 {
    weight.round().max(1.0) as u32
}

/// Draw a bar plan to an SVG file.
pub fn render_bar_chart(plan: &BarPlan, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (lo, hi) = plan.y_range;
    if plan.log_y {
        draw_bars(&root, plan, (lo..hi).log_scale())?;
    } else {
        draw_bars(&root, plan, lo..hi)?;
    }

    root.present().map_err(draw_err)?;
    tracing::info!(path = %path.display(), "generated bar chart");
    Ok(())
}

fn draw_bars<DB, Y>(root: &DrawingArea<DB, Shift>, plan: &BarPlan, y: Y) -> Result<()>
where
    DB: DrawingBackend,
    Y: AsRangedCoord<Value = f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    let slots = plan.ticks.len();
    let baseline = plan.y_range.0;

    let mut chart = ChartBuilder::on(root)
        .caption(&plan.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(slots as f64 - 0.5), y)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            if (x - idx as f64).abs() < 0.3 {
                plan.ticks.get(idx).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .y_desc(plan.y_desc.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()
        .map_err(draw_err)?;

    for bar in &plan.bars {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(bar.left, baseline), (bar.right, bar.value)],
                rgb(bar.color).filled(),
            )))
            .map_err(draw_err)?;

        chart
            .draw_series(std::iter::once(
                EmptyElement::at((bar.center(), bar.value))
                    + Text::new(
                        bar.text.clone(),
                        (0, -VALUE_LABEL_OFFSET),
                        ("sans-serif", DATA_LABEL_FONT_SIZE)
                            .into_font()
                            .color(&BLACK)
                            .pos(Pos::new(HPos::Center, VPos::Bottom)),
                    ),
            ))
            .map_err(draw_err)?;
    }

    if plan.legend.is_empty() {
        return Ok(());
    }

    // Legend entries are zero-size anchors, drawn in legend order.
    for entry in &plan.legend {
        let color = rgb(entry.color);
        chart
            .draw_series(std::iter::once(Circle::new(
                (0.0, plan.y_range.1),
                0,
                color.filled(),
            )))
            .map_err(draw_err)?
            .label(entry.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()
        .map_err(draw_err)?;

    Ok(())
}

/// Draw a line plan to an SVG file.
pub fn render_line_chart(plan: &LinePlan, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let x = plan.x_range.0..plan.x_range.1;
    let y = plan.y_range.0..plan.y_range.1;
    match (plan.x_scale, plan.y_scale) {
        (Scale::Linear, Scale::Linear) => draw_lines(&root, plan, x, y)?,
        (Scale::Linear, Scale::Log { base }) => {
            draw_lines(&root, plan, x, y.log_scale().base(base))?
        }
        (Scale::Log { base }, Scale::Linear) => {
            draw_lines(&root, plan, x.log_scale().base(base), y)?
        }
        (Scale::Log { base: bx }, Scale::Log { base: by }) => {
            draw_lines(&root, plan, x.log_scale().base(bx), y.log_scale().base(by))?
        }
    }

    root.present().map_err(draw_err)?;
    tracing::info!(path = %path.display(), "generated line chart");
    Ok(())
}

fn draw_lines<DB, X, Y>(root: &DrawingArea<DB, Shift>, plan: &LinePlan, x: X, y: Y) -> Result<()>
where
    DB: DrawingBackend,
    X: AsRangedCoord<Value = f64>,
    X::CoordDescType: ValueFormatter<f64>,
    Y: AsRangedCoord<Value = f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    let mut chart = ChartBuilder::on(root)
        .caption(&plan.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(x, y)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| format_count(*x))
        .y_label_formatter(&|y| format_tick(*y))
        .x_desc(plan.x_desc.as_str())
        .y_desc(plan.y_desc.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()
        .map_err(draw_err)?;

    for line in &plan.lines {
        let color = rgb(line.color);

        if !line.band.is_empty() {
            let outline: Vec<(f64, f64)> = line
                .band
                .iter()
                .map(|&(x, _, hi)| (x, hi))
                .chain(line.band.iter().rev().map(|&(x, lo, _)| (x, lo)))
                .collect();
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline,
                    color.mix(BAND_ALPHA).filled(),
                )))
                .map_err(draw_err)?;
        }

        chart
            .draw_series(LineSeries::new(
                line.points.iter().copied(),
                color.stroke_width(stroke(line.line_weight)),
            ))
            .map_err(draw_err)?;

        if plan.markers {
            chart
                .draw_series(PointSeries::of_element(
                    line.points.iter().copied(),
                    MARKER_SIZE,
                    color.filled(),
                    &|coord, size, style| {
                        EmptyElement::at(coord) + Circle::new((0, 0), size, style)
                    },
                ))
                .map_err(draw_err)?;
        }
    }

    // Legend entries are zero-size anchors, drawn in legend order.
    for entry in &plan.legend {
        let color = rgb(entry.color);
        let width = stroke(entry.line_weight);
        chart
            .draw_series(std::iter::once(Circle::new(
                (plan.x_range.0, plan.y_range.0),
                0,
                color.filled(),
            )))
            .map_err(draw_err)?
            .label(entry.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width))
            });
    }

    chart
        .configure_series_labels()
        .position(plan.legend_corner.into())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()
        .map_err(draw_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, DuplicatePolicy, Observation};
    use crate::identity::normalize;
    use crate::registry::{StyleEntry, SET2};

    fn id(s: &str) -> CanonicalIdentity {
        normalize(s).unwrap()
    }

    fn obs(name: &str, x: u64, y: f64) -> Observation {
        Observation {
            identity: id(name),
            x,
            y,
            band: None,
        }
    }

    fn data(observations: Vec<Observation>) -> BTreeMap<CanonicalIdentity, Series> {
        aggregate(observations, None, DuplicatePolicy::KeepLast).unwrap()
    }

    fn bar_chart(categories: &[&str]) -> BarChart {
        BarChart {
            title: "Insert".into(),
            y_desc: "ns".into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            divisor: 1.0,
            unit: "µs".into(),
            log_y: false,
            clamp: AxisClamp::default(),
        }
    }

    fn line_chart() -> LineChart {
        LineChart {
            title: "Error".into(),
            x_desc: "n".into(),
            y_desc: "%".into(),
            x_scale: Scale::LOG10,
            y_scale: Scale::LOG10,
            clamp: AxisClamp::default(),
            divisor: 1.0,
            band: true,
            markers: false,
            legend_corner: LegendCorner::UpperLeft,
        }
    }

    #[test]
    fn test_bar_labels() {
        assert_eq!(format_bar_label(123400.0, "µs"), "123 µs");
        assert_eq!(format_bar_label(42.7, "µs"), "42.70");
        assert_eq!(format_bar_label(1000.0, "µs"), "1000.00");
        assert_eq!(format_bar_label(1000.6, "µs"), "1 µs");
    }

    #[test]
    fn test_ticks() {
        assert_eq!(format_tick(250.0), "250");
        assert_eq!(format_tick(1.0), "1");
        assert_eq!(format_tick(7.9), "7");
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(0.01), "0.01");
        assert_eq!(format_tick(0.125), "0.125");
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_count(4096.0), "4096");
        assert_eq!(format_count(1e6), "1e6");
    }

    #[test]
    fn test_bar_plan_single_group() {
        let registry = SeriesRegistry::latency_preset().unwrap();
        let data = data(vec![
            obs("hyperloglogplus__hyperloglogpf", 0, 42.7),
            obs("hyperloglockless__hyperloglog", 0, 123400.0),
        ]);
        let plan = bar_chart(&["Insert"]).plan(&registry, &data).unwrap();

        assert_eq!(
            plan.ticks,
            ["hyperloglockless::HyperLogLog", "hyperloglogplus::HyperLogLogPF"]
        );
        assert_eq!(plan.bars[0].text, "123 µs");
        assert_eq!(plan.bars[1].text, "42.70");
        assert!((plan.bars[1].center() - 1.0).abs() < 1e-12);
        assert!(plan.legend.is_empty());
        assert_eq!(plan.y_range.0, 0.0);
    }

    #[test]
    fn test_bar_plan_clusters() {
        let registry = SeriesRegistry::latency_preset().unwrap();
        let data = data(vec![
            obs("hyperloglogplus::HyperLogLogPlus", 0, 12.3),
            obs("hyperloglockless::HyperLogLog", 0, 4.7),
            obs("hyperloglogplus::HyperLogLogPlus", 1, 39.87),
            obs("hyperloglockless::HyperLogLog", 1, 4.83),
        ]);
        let plan = bar_chart(&["1 Thread", "2 Threads"])
            .plan(&registry, &data)
            .unwrap();

        assert_eq!(plan.ticks, ["1 Thread", "2 Threads"]);
        assert_eq!(plan.bars.len(), 4);
        let width = CLUSTER_WIDTH / 2.0;
        // Registry order inside each cluster, left edge at (i - n/2) * width.
        assert_eq!(plan.bars[0].identity, id("hyperloglockless::HyperLogLog"));
        assert!((plan.bars[0].left - (0.0 - width)).abs() < 1e-12);
        assert!((plan.bars[1].left - 0.0).abs() < 1e-12);
        assert!((plan.bars[3].right - (1.0 + width)).abs() < 1e-12);
        assert_eq!(plan.legend[0].label, "hyperloglockless::HyperLogLog");
    }

    #[test]
    fn test_bar_plan_divisor_and_clamp() {
        let registry = SeriesRegistry::latency_preset().unwrap();
        let data = data(vec![obs("hyperloglockless::HyperLogLog", 0, 2070.0)]);
        let mut chart = bar_chart(&["Insert"]);
        chart.divisor = 1000.0;
        chart.clamp.y_max = Some(10.0);
        let plan = chart.plan(&registry, &data).unwrap();

        assert_eq!(plan.bars[0].text, "2.07");
        assert_eq!(plan.y_range, (0.0, 10.0));
    }

    #[test]
    fn test_unstyled_identity_fails_before_drawing() {
        let registry = SeriesRegistry::accuracy_preset().unwrap();
        let data = data(vec![
            obs("hyperloglockless::HyperLogLog", 1000, 2.0),
            obs("amadeus_streaming::HyperLogLog", 1000, 3.0),
        ]);

        let err = line_chart().plan(&registry, &data).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Unstyled { identity } if identity == id("amadeus_streaming::HyperLogLog")
        ));
        assert!(matches!(
            bar_chart(&["x"]).plan(&registry, &data),
            Err(ChartError::Unstyled { .. })
        ));
    }

    #[test]
    fn test_line_plan_band_and_clamp() {
        let registry = SeriesRegistry::accuracy_preset().unwrap();
        let observations = vec![
            Observation {
                band: Some((0.0, 3.0)),
                ..obs("hyperloglockless::HyperLogLog", 1000, 2.0)
            },
            Observation {
                band: Some((0.5, 1.5)),
                ..obs("hyperloglockless::HyperLogLog", 1_000_000, 1.0)
            },
        ];
        let mut chart = line_chart();
        chart.clamp = AxisClamp {
            x_min: Some(1e6),
            x_max: Some(1e10),
            y_min: Some(0.01),
            y_max: Some(250.0),
        };
        let plan = chart.plan(&registry, &data(observations)).unwrap();

        assert_eq!(plan.x_range, (1e6, 1e10));
        assert_eq!(plan.y_range, (0.01, 250.0));
        let line = &plan.lines[0];
        // Clamping hides points, it does not drop them.
        assert_eq!(line.points, [(1000.0, 2.0), (1e6, 1.0)]);
        assert_eq!(line.band[0], (1000.0, 0.01, 3.0));
        assert_eq!(plan.legend[0].label, "hyperloglockless (Precision = 16)");
    }

    #[test]
    fn test_line_plan_order_and_legend() {
        let registry = SeriesRegistry::new(vec![
            StyleEntry::new(id("hyperloglogplus::HyperLogLogPlus"), SET2[1]),
            StyleEntry::new(id("amadeus_streaming::HyperLogLog"), SET2[5]),
            StyleEntry::new(id("hyperloglockless::HyperLogLog"), SET2[0]).highlight(),
        ])
        .unwrap();
        let data = data(vec![
            obs("hyperloglockless::HyperLogLog", 128, 5.0),
            obs("hyperloglogplus::HyperLogLogPlus", 128, 9.0),
        ]);
        let mut chart = line_chart();
        chart.band = false;
        let plan = chart.plan(&registry, &data).unwrap();

        let drawn: Vec<String> = plan.lines.iter().map(|l| l.identity.to_string()).collect();
        assert_eq!(
            drawn,
            ["hyperloglogplus::HyperLogLogPlus", "hyperloglockless::HyperLogLog"]
        );
        let legend: Vec<&str> = plan.legend.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(
            legend,
            ["hyperloglockless::HyperLogLog", "hyperloglogplus::HyperLogLogPlus"]
        );
        assert!(plan.lines.iter().all(|l| l.band.is_empty()));
    }

    #[test]
    fn test_line_plan_single_x_gets_a_span() {
        let registry = SeriesRegistry::fill_preset().unwrap();
        let data = data(vec![
            obs("hyperloglockless::HyperLogLog", 4096, 40.0),
            obs("hyperloglogplus::HyperLogLogPF", 4096, 80.0),
        ]);
        let mut chart = line_chart();
        chart.x_scale = Scale::LOG2;
        chart.band = false;
        let plan = chart.plan(&registry, &data).unwrap();

        assert_eq!(plan.x_range, (2048.0, 8192.0));
        assert!(plan.y_range.0 < 40.0 && plan.y_range.1 > 80.0);
    }

    #[test]
    fn test_widen_degenerate_ranges() {
        assert_eq!(Scale::Linear.widen((0.0, 0.0)), (0.0, 1.0));
        assert_eq!(Scale::Linear.widen((4.0, 4.0)), (2.0, 6.0));
        assert_eq!(Scale::Linear.widen((1.0, 3.0)), (1.0, 3.0));
        assert_eq!(Scale::LOG10.widen((10.0, 10.0)), (5.0, 20.0));
    }

    #[test]
    fn test_bar_plan_all_zero_has_height() {
        let registry = SeriesRegistry::latency_preset().unwrap();
        let data = data(vec![obs("hyperloglockless::HyperLogLog", 0, 0.0)]);
        let plan = bar_chart(&["Insert"]).plan(&registry, &data).unwrap();
        assert_eq!(plan.y_range, (0.0, 1.0));
    }

    #[test]
    fn test_empty_chart() {
        let registry = SeriesRegistry::accuracy_preset().unwrap();
        assert!(matches!(
            line_chart().plan(&registry, &BTreeMap::new()),
            Err(ChartError::Empty(_))
        ));
    }
}
