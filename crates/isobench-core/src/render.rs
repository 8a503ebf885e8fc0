//! Runtime-vs-size figures.
//!
//! Failed, skipped and non-positive runs are dropped from a series before
//! drawing; a series left without points gets no line and no legend entry.

use std::ops::Range;
use std::path::Path;

use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::error::RenderError;
use crate::invoker::RunOutcome;
use crate::sweep::{ResultTable, StopPolicy, SweepAxis, Variant};

const FIGURE_SIZE: (u32, u32) = (1600, 1000);

/// Text needs a font backend; without one only geometry is drawn.
const TEXT: bool = cfg!(feature = "fonts");

/// Matplotlib's `tab:red`.
const TAB_RED: RGBColor = RGBColor(214, 39, 40);
/// Matplotlib's `tab:blue`.
const TAB_BLUE: RGBColor = RGBColor(31, 119, 180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    pub color: RGBColor,
    pub marker: Marker,
}

impl SeriesStyle {
    pub const EXACT: Self = Self {
        color: TAB_RED,
        marker: Marker::Circle,
    };
    pub const APPROX: Self = Self {
        color: TAB_BLUE,
        marker: Marker::Square,
    };
}

/// One line of the figure, already masked.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub style: SeriesStyle,
    pub points: Vec<(usize, f64)>,
}

impl PlotSeries {
    /// Pairs sizes with outcomes, keeping only strictly positive timings.
    pub fn from_outcomes(
        label: impl Into<String>,
        style: SeriesStyle,
        sizes: &[usize],
        outcomes: &[RunOutcome],
    ) -> Self {
        Self::from_seconds(
            label,
            style,
            sizes,
            &outcomes.iter().map(RunOutcome::seconds).collect::<Vec<_>>(),
        )
    }

    pub fn from_seconds(
        label: impl Into<String>,
        style: SeriesStyle,
        sizes: &[usize],
        seconds: &[Option<f64>],
    ) -> Self {
        let points = sizes
            .iter()
            .zip(seconds)
            .filter_map(|(&size, secs)| match secs {
                Some(s) if *s > 0.0 && s.is_finite() => Some((size, *s)),
                _ => None,
            })
            .collect();
        Self {
            label: label.into(),
            style,
            points,
        }
    }
}

/// A complete figure description.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_scale: bool,
    /// Full sweep, used for the horizontal extent.
    pub sizes: Vec<usize>,
    pub series: Vec<PlotSeries>,
}

impl Figure {
    /// Standard figure for a finished sweep.
    pub fn for_sweep(
        axis: SweepAxis,
        k: u32,
        variants: &[Variant],
        table: &ResultTable,
        log_scale: bool,
    ) -> Self {
        let (title, x_label) = match axis {
            SweepAxis::N1 { n2 } => (
                format!("Execution Time vs |VG| (|VH|={n2} fixed, k={k})"),
                "|VG| (n1)",
            ),
            SweepAxis::N2 { n1 } => (
                format!("Approximation Runtime vs |VH| (fixed |VG|={n1}, k={k})"),
                "|VH| (n2)",
            ),
        };
        let y_label = if log_scale {
            "Execution time (seconds, log scale)"
        } else {
            "Execution time (seconds)"
        };

        let sizes = table.sizes();
        let series = variants
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                let style = match v.policy {
                    StopPolicy::StopOnFirstFailure => SeriesStyle::EXACT,
                    StopPolicy::AlwaysRun => SeriesStyle::APPROX,
                };
                PlotSeries::from_outcomes(v.label.clone(), style, &sizes, &table.column(idx))
            })
            .collect();

        Self {
            title,
            x_label: x_label.into(),
            y_label: y_label.into(),
            log_scale,
            sizes,
            series,
        }
    }

    /// Labels that will appear in the legend.
    pub fn legend_labels(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter(|s| !s.points.is_empty())
            .map(|s| s.label.as_str())
            .collect()
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    fn x_range(&self) -> Range<f64> {
        let lo = self.sizes.iter().copied().min().unwrap_or(0) as f64;
        let hi = self.sizes.iter().copied().max().unwrap_or(1) as f64;
        let pad = ((hi - lo) * 0.05).max(0.5);
        (lo - pad)..(hi + pad)
    }

    fn y_range(&self) -> Range<f64> {
        let values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let (lo, hi) = values.fold((f64::INFINITY, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() {
            return if self.log_scale { 1e-3..1.0 } else { 0.0..1.0 };
        }
        if self.log_scale {
            (lo / 2.0)..(hi * 2.0)
        } else {
            0.0..(hi * 1.1)
        }
    }

    /// Writes a PNG to `path`, replacing any existing file.
    pub fn render(&self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        if self.log_scale {
            self.draw(&root, self.y_range().log_scale())?;
        } else {
            self.draw(&root, self.y_range())?;
        }
        root.present().map_err(draw_err)?;

        info!(path = %path.display(), points = self.point_count(), "saved figure");
        Ok(())
    }

    fn draw<Y>(&self, root: &DrawingArea<BitMapBackend<'_>, Shift>, y: Y) -> Result<(), RenderError>
    where
        Y: AsRangedCoord<Value = f64>,
        Y::CoordDescType: ValueFormatter<f64>,
    {
        let mut builder = ChartBuilder::on(root);
        builder.margin(16).x_label_area_size(56).y_label_area_size(90);
        if TEXT {
            builder.caption(&self.title, ("sans-serif", 28));
        }
        let mut chart = builder
            .build_cartesian_2d(self.x_range(), y)
            .map_err(draw_err)?;

        if TEXT {
            chart
                .configure_mesh()
                .x_desc(self.x_label.as_str())
                .y_desc(self.y_label.as_str())
                .light_line_style(BLACK.mix(0.08))
                .draw()
                .map_err(draw_err)?;
        }

        for series in self.series.iter().filter(|s| !s.points.is_empty()) {
            let color = series.style.color;
            let points: Vec<(f64, f64)> = series
                .points
                .iter()
                .map(|&(size, secs)| (size as f64, secs))
                .collect();

            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                .map_err(draw_err)?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(2)));

            match series.style.marker {
                Marker::Circle => chart.draw_series(
                    points
                        .iter()
                        .map(|&p| EmptyElement::at(p) + Circle::new((0, 0), 5, color.filled())),
                ),
                Marker::Square => chart.draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p) + Rectangle::new([(-5, -5), (5, 5)], color.filled())
                })),
            }
            .map_err(draw_err)?;
        }

        if TEXT && !self.legend_labels().is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.3))
                .draw()
                .map_err(draw_err)?;
        }
        Ok(())
    }
}

fn draw_err<E: std::error::Error>(e: E) -> RenderError {
    RenderError::Draw {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::FailureReason;
    use std::time::Duration;

    fn ok(ms: u64) -> RunOutcome {
        RunOutcome::Success(Duration::from_millis(ms))
    }

    #[test]
    fn test_masking_drops_missing_and_non_positive() {
        let s = PlotSeries::from_seconds(
            "Exact",
            SeriesStyle::EXACT,
            &[2, 3, 4, 5, 6],
            &[Some(0.01), None, Some(0.0), Some(-1.0), Some(0.5)],
        );
        assert_eq!(s.points, vec![(2, 0.01), (6, 0.5)]);
    }

    #[test]
    fn test_all_masked_series_leaves_legend() {
        let fig = Figure {
            title: "t".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            log_scale: true,
            sizes: vec![2, 3],
            series: vec![
                PlotSeries::from_outcomes(
                    "Exact",
                    SeriesStyle::EXACT,
                    &[2, 3],
                    &[
                        RunOutcome::Failure(FailureReason::Timeout),
                        RunOutcome::Failure(FailureReason::Skipped),
                    ],
                ),
                PlotSeries::from_outcomes("Approximation", SeriesStyle::APPROX, &[2, 3], &[ok(1), ok(2)]),
            ],
        };
        assert!(fig.series[0].points.is_empty());
        assert_eq!(fig.legend_labels(), vec!["Approximation"]);
        assert_eq!(fig.point_count(), 2);
    }

    #[test]
    fn test_five_positive_points_in_order() {
        let sizes = [10, 15, 20, 25, 30];
        let outcomes: Vec<_> = [3, 1, 4, 1, 5].iter().map(|&ms| ok(ms)).collect();
        let s = PlotSeries::from_outcomes("Approximation", SeriesStyle::APPROX, &sizes, &outcomes);

        assert_eq!(s.points.len(), 5);
        let xs: Vec<usize> = s.points.iter().map(|p| p.0).collect();
        assert_eq!(xs, sizes);
    }

    #[test]
    fn test_y_range_is_positive_for_log_scale() {
        let fig = Figure {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            log_scale: true,
            sizes: vec![1],
            series: vec![],
        };
        let r = fig.y_range();
        assert!(r.start > 0.0 && r.end > r.start);
    }

    #[test]
    fn test_render_writes_png_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/figs/runtime.png");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        std::fs::write(&out, b"stale").unwrap();

        let fig = Figure {
            title: "runtime".into(),
            x_label: "|VG| (n1)".into(),
            y_label: "seconds".into(),
            log_scale: true,
            sizes: vec![2, 3, 4],
            series: vec![PlotSeries::from_seconds(
                "Exact",
                SeriesStyle::EXACT,
                &[2, 3, 4],
                &[Some(0.01), Some(0.05), None],
            )],
        };
        fig.render(&out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_render_linear_scale_without_points() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.png");
        let fig = Figure {
            title: "empty".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            log_scale: false,
            sizes: vec![4, 5],
            series: vec![PlotSeries::from_seconds("Exact", SeriesStyle::EXACT, &[4, 5], &[None, None])],
        };
        fig.render(&out).unwrap();
        assert!(out.exists());
    }
}
