use std::ops::Range;
use std::panic;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use crash_trace::columns::{FPS, GPU_CLOCK, GPU_TEMP, GPU_USAGE, MEM_USAGE, POWER, TIMESTAMP};
use crash_trace::{CrashWindow, Frame};
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};

use crate::text_guard::TextGuard;

pub const DEFAULT_OUTPUT: &str = "deadlock_crash_analysis.png";

const FIGURE_SIZE: (u32, u32) = (1680, 2400);
const TITLE: &str = "DEADLOCK CRASH ANALYSIS - GPU METRICS";
const X_AXIS_LABEL: &str = "Time (s)";
const CRASH_WINDOW_LABEL: &str = "Crash Window (20s)";

const FIGURE_BG: RGBColor = RGBColor(0x12, 0x12, 0x12);
const AXES_BG: RGBColor = RGBColor(0x1e, 0x1e, 0x1e);
const GRID_COLOR: RGBColor = RGBColor(0x33, 0x33, 0x33);
const TITLE_COLOR: RGBColor = RGBColor(0xbb, 0x86, 0xfc);
const CRASH_BAND: RGBColor = RGBColor(0xcf, 0x66, 0x79);

#[derive(Clone, Copy, Debug)]
pub struct Metric {
    pub column: &'static str,
    pub label: &'static str,
    pub color: RGBColor,
}

/// Panels in top-to-bottom order.
pub const METRICS: [Metric; 6] = [
    Metric {
        column: FPS,
        label: "FPS",
        color: RGBColor(0xb3, 0x88, 0xff),
    },
    Metric {
        column: GPU_USAGE,
        label: "GPU Usage (%)",
        color: RGBColor(0x4f, 0xc3, 0xf7),
    },
    Metric {
        column: GPU_CLOCK,
        label: "GPU Clock (MHz)",
        color: RGBColor(0x81, 0xc7, 0x84),
    },
    Metric {
        column: GPU_TEMP,
        label: "GPU Temp (°C)",
        color: RGBColor(0xff, 0x8a, 0x65),
    },
    Metric {
        column: POWER,
        label: "Power (W)",
        color: RGBColor(0xff, 0xf1, 0x76),
    },
    Metric {
        column: MEM_USAGE,
        label: "VRAM Usage (MB)",
        color: RGBColor(0xf0, 0x62, 0x92),
    },
];

#[derive(Clone, Debug)]
pub struct Panel {
    pub metric: Metric,
    /// Contiguous stretches of present samples; a missing value ends a run.
    pub runs: Vec<Vec<(f64, f64)>>,
    pub last: Option<(f64, f64)>,
    pub y_range: Range<f64>,
}

pub enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartKind::Svg,
            _ => ChartKind::Png,
        }
    }
}

/// One slot per entry of [`METRICS`]; `None` where the log lacks the column.
pub fn plan_panels(frame: &Frame) -> Vec<Option<Panel>> {
    METRICS
        .iter()
        .map(|metric| {
            let values = frame.column(metric.column)?.values()?;
            let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
            let mut current = Vec::new();
            for (row, value) in values.iter().enumerate() {
                let x = frame.value(TIMESTAMP, row).unwrap_or(row as f64);
                match value {
                    Some(y) => current.push((x, *y)),
                    None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                    None => {}
                }
            }
            if !current.is_empty() {
                runs.push(current);
            }
            let last = runs.last().and_then(|run| run.last()).copied();
            let y_range = padded_range(runs.iter().flatten().map(|(_, y)| *y));
            Some(Panel {
                metric: *metric,
                runs,
                last,
                y_range,
            })
        })
        .collect()
}

/// Index of the lowest panel that is actually drawn; it carries the x-axis label.
fn bottom_panel(panels: &[Option<Panel>]) -> Option<usize> {
    panels.iter().rposition(Option::is_some)
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span < 1e-6 { 1.0 } else { span * 0.08 };
    (min - pad)..(max + pad)
}

/// Render the stacked metric chart. Any drawing failure, including a panic
/// inside the backend, is reported as an error naming `path`.
pub fn render_chart(frame: &Frame, window: &CrashWindow, path: &Path) -> Result<()> {
    let panels = plan_panels(frame);
    let x_max = (window.end as f64).max(1.0);
    let kind = ChartKind::from_path(path);

    let render = || -> Result<()> {
        match kind {
            ChartKind::Png => {
                let backend = BitMapBackend::new(path, FIGURE_SIZE);
                draw_figure(TextGuard::new(backend).into_drawing_area(), &panels, window, x_max)
            }
            ChartKind::Svg => {
                let backend = SVGBackend::new(path, FIGURE_SIZE);
                draw_figure(TextGuard::new(backend).into_drawing_area(), &panels, window, x_max)
            }
        }
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| anyhow!("plotting backend panicked while writing {}", path.display()))?
        .with_context(|| format!("failed to write chart {}", path.display()))
}

fn draw_figure<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    panels: &[Option<Panel>],
    window: &CrashWindow,
    x_max: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&FIGURE_BG)?;
    let title_font = FontDesc::new(FontFamily::SansSerif, 44.0, FontStyle::Bold);
    let body = root.titled(TITLE, title_font.color(&TITLE_COLOR))?;
    let areas = body.margin(10, 20, 60, 40).split_evenly((panels.len(), 1));

    let label_font = FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal);
    let desc_font = FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Bold);

    let bottom = bottom_panel(panels);
    for (idx, (area, panel)) in areas.iter().zip(panels).enumerate() {
        let Some(panel) = panel else {
            continue;
        };
        let is_bottom = Some(idx) == bottom;
        let y_range = panel.y_range.clone();

        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .set_label_area_size(LabelAreaPosition::Left, 90)
            .set_label_area_size(LabelAreaPosition::Bottom, if is_bottom { 60 } else { 30 })
            .build_cartesian_2d(0.0..x_max, y_range.clone())?;
        chart.plotting_area().fill(&AXES_BG)?;

        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(&GRID_COLOR)
            .axis_style(&WHITE.mix(0.6))
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .label_style(label_font.clone().color(&WHITE))
            .axis_desc_style(desc_font.clone().color(&WHITE))
            .x_desc(if is_bottom { X_AXIS_LABEL } else { "" })
            .y_desc(panel.metric.label)
            .draw()?;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [
                    (window.start as f64, y_range.start),
                    (window.end as f64, y_range.end),
                ],
                CRASH_BAND.mix(0.3).filled(),
            )))?
            .label(CRASH_WINDOW_LABEL)
            .legend(|(x, y)| {
                Rectangle::new([(x, y - 6), (x + 24, y + 6)], CRASH_BAND.mix(0.3).filled())
            });

        let color = panel.metric.color;
        for (run_idx, run) in panel.runs.iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(
                run.iter().copied(),
                color.stroke_width(3),
            ))?;
            if run_idx == 0 {
                series.label(panel.metric.label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(3))
                });
            }
        }

        if let Some((x, y)) = panel.last {
            let annotation = desc_font.clone().color(&WHITE);
            chart.draw_series(std::iter::once(
                EmptyElement::at((x, y))
                    + Circle::new((0, 0), 6, WHITE.filled())
                    + Text::new(format!("{:.1}", y), (8, -26), annotation),
            ))?;
        }

        chart
            .configure_series_labels()
            .background_style(&AXES_BG.mix(0.85))
            .border_style(&GRID_COLOR)
            .label_font(label_font.clone().color(&WHITE))
            .position(SeriesLabelPosition::UpperLeft)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
