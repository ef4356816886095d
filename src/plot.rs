//! PNG charts of reduced series
//!
//! Time is drawn as days since the first plotted time step; axis labels are
//! converted back to calendar dates.

use crate::config::Thresholds;
use crate::dataset::ReducedSeries;
use crate::diagnostics::{ChlorophyllSummary, ForecastRow, Metric, ProfileReport};
use crate::errors::{BgcError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::info;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;
type Area<'b> = DrawingArea<BitMapBackend<'b>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const ORANGE: RGBColor = RGBColor(255, 140, 0);
const DARK_RED: RGBColor = RGBColor(139, 0, 0);
const GRAY: RGBColor = RGBColor(128, 128, 128);
const ZONE_COLORS: [RGBColor; 6] = [BLUE, ORANGE, GREEN, MAGENTA, CYAN, BLACK];

struct TimeAxis {
    origin: NaiveDateTime,
    span: f64,
}

impl TimeAxis {
    fn spanning<'s>(series: impl IntoIterator<Item = &'s ReducedSeries>) -> Option<Self> {
        let mut bounds: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for s in series {
            for &t in &s.times {
                bounds = Some(match bounds {
                    None => (t, t),
                    Some((lo, hi)) => (lo.min(t), hi.max(t)),
                });
            }
        }
        bounds.map(|(origin, end)| {
            let axis = Self { origin, span: 0.0 };
            let span = axis.to_x(end).max(1.0);
            Self { span, ..axis }
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_x(&self, t: NaiveDateTime) -> f64 {
        (t - self.origin).num_seconds() as f64 / 86_400.0
    }

    fn date_x(&self, date: NaiveDate) -> f64 {
        self.to_x(date.and_time(NaiveTime::MIN))
    }

    fn range(&self) -> Range<f64> {
        0.0..self.span
    }

    #[allow(clippy::cast_possible_truncation)]
    fn label(&self, x: f64) -> String {
        (self.origin + Duration::seconds((x * 86_400.0).round() as i64))
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Runs of consecutive valid points; a missing value breaks the line.
fn segments(series: &ReducedSeries, axis: &TimeAxis) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (&t, &v) in series.times.iter().zip(&series.values) {
        if v.is_finite() {
            current.push((axis.to_x(t), v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn value_range<'s>(series: impl IntoIterator<Item = &'s ReducedSeries>, extras: &[f64]) -> Range<f64> {
    let values = series
        .into_iter()
        .flat_map(|s| s.values.iter().copied())
        .chain(extras.iter().copied())
        .filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.1;
    (lo - pad)..(hi + pad)
}

fn line_chart<'a, 'b>(
    area: &'a Area<'b>,
    title: &str,
    y_desc: &str,
    axis: &TimeAxis,
    y: Range<f64>,
) -> DrawResult<Chart<'a, 'b>> {
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(axis.range(), y)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(y_desc)
        .x_labels(8)
        .x_label_formatter(&|x| axis.label(*x))
        .draw()?;
    Ok(chart)
}

fn draw_line(
    chart: &mut Chart<'_, '_>,
    axis: &TimeAxis,
    series: &ReducedSeries,
    color: RGBColor,
    label: &str,
) -> DrawResult<()> {
    let segments = segments(series, axis);
    if segments.is_empty() {
        return Ok(());
    }
    chart
        .draw_series(
            segments
                .iter()
                .map(|seg| PathElement::new(seg.clone(), color.stroke_width(2))),
        )?
        .label(label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    chart.draw_series(
        segments
            .iter()
            .flatten()
            .map(|&p| Circle::new(p, 3, color.filled())),
    )?;
    Ok(())
}

fn draw_level(
    chart: &mut Chart<'_, '_>,
    axis: &TimeAxis,
    y: f64,
    color: RGBColor,
    label: &str,
) -> DrawResult<()> {
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, y), (axis.span, y)],
            color.stroke_width(2),
        )))?
        .label(label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    Ok(())
}

fn shade_window(
    chart: &mut Chart<'_, '_>,
    axis: &TimeAxis,
    window: (NaiveDate, NaiveDate),
    y: &Range<f64>,
) -> DrawResult<()> {
    let start = axis.date_x(window.0).max(0.0);
    let end = axis.date_x(window.1).min(axis.span);
    if start >= end {
        return Ok(());
    }
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(start, y.start), (end, y.end)],
            GREEN.mix(0.1).filled(),
        )))?
        .label("Expected Bloom Period")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], GREEN.mix(0.3).filled()));
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>) -> DrawResult<()> {
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn unavailable_panel(area: &Area<'_>, title: &str, message: &str) -> DrawResult<()> {
    let inner = area.titled(title, ("sans-serif", 22))?;
    let (width, height) = inner.dim_in_pixel();
    let style = ("sans-serif", 20).into_font().color(&RED);
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let center = ((width / 2) as i32 - 120, (height / 2) as i32);
    inner.draw_text(message, &style, center)?;
    Ok(())
}

fn finish(result: DrawResult<()>, path: &Path) -> Result<()> {
    result.map_err(|e| BgcError::PlotError(format!("{}: {}", path.display(), e)))?;
    info!("Saved chart to {}", path.display());
    Ok(())
}

/// Weekly chlorophyll of every zone with the bloom window shaded.
pub fn plot_chlorophyll(
    summaries: &[ChlorophyllSummary],
    window: (NaiveDate, NaiveDate),
    year: i32,
    path: &Path,
) -> Result<()> {
    let draw = || -> DrawResult<()> {
        let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
        root.fill(&WHITE)?;

        let series: Vec<(&str, &ReducedSeries)> = summaries
            .iter()
            .filter_map(|s| s.series.available().map(|series| (s.zone.as_str(), series)))
            .collect();
        let title = format!("Weekly Chlorophyll-a Concentration ({year})");
        let Some(axis) = TimeAxis::spanning(series.iter().map(|(_, s)| *s)) else {
            unavailable_panel(&root, &title, "DATA UNAVAILABLE")?;
            return Ok(root.present()?);
        };

        let y = value_range(series.iter().map(|(_, s)| *s), &[0.0]);
        let mut chart = line_chart(&root, &title, "Chlorophyll-a (mg/m³)", &axis, y.clone())?;
        shade_window(&mut chart, &axis, window, &y)?;
        for (i, (zone, s)) in series.iter().enumerate() {
            draw_line(&mut chart, &axis, s, ZONE_COLORS[i % ZONE_COLORS.len()], zone)?;
        }
        draw_legend(&mut chart)?;
        root.present()?;
        Ok(())
    };
    finish(draw(), path)
}

/// Observed chlorophyll against the healthy baseline and the failure band.
pub fn plot_forecast(
    rows: &[ForecastRow],
    thresholds: &Thresholds,
    year: i32,
    path: &Path,
) -> Result<()> {
    let draw = || -> DrawResult<()> {
        let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
        root.fill(&WHITE)?;

        let series: Vec<(&str, &ReducedSeries)> = rows
            .iter()
            .filter_map(|r| r.series.available().map(|series| (r.zone.as_str(), series)))
            .collect();
        let title = format!("Eco-Economic Prediction: Productivity Gap Analysis ({year})");
        let Some(axis) = TimeAxis::spanning(series.iter().map(|(_, s)| *s)) else {
            unavailable_panel(&root, &title, "DATA UNAVAILABLE")?;
            return Ok(root.present()?);
        };

        let y = value_range(
            series.iter().map(|(_, s)| *s),
            &[0.0, thresholds.baseline_chl, thresholds.failure_band],
        );
        let mut chart = line_chart(&root, &title, "Chlorophyll-a (mg/m³)", &axis, y)?;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, 0.0), (axis.span, thresholds.failure_band)],
                RED.mix(0.1).filled(),
            )))?
            .label("Critical Failure Zone")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], RED.mix(0.3).filled()));
        draw_level(
            &mut chart,
            &axis,
            thresholds.baseline_chl,
            RED,
            &format!("Healthy Baseline ({} mg/m³)", thresholds.baseline_chl),
        )?;
        for (i, (zone, s)) in series.iter().enumerate() {
            draw_line(
                &mut chart,
                &axis,
                s,
                ZONE_COLORS[i % ZONE_COLORS.len()],
                &format!("{zone} (Observed)"),
            )?;
        }
        draw_legend(&mut chart)?;
        root.present()?;
        Ok(())
    };
    finish(draw(), path)
}

/// Three stacked panels: production, nitrate, oxygen.
pub fn plot_profile(report: &ProfileReport, thresholds: &Thresholds, path: &Path) -> Result<()> {
    let draw = || -> DrawResult<()> {
        let root = BitMapBackend::new(path, (1400, 1400)).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((3, 1));

        let title = "Water Column Productivity (Integrated NPP)";
        match &report.production {
            Metric::Available(p) => {
                if let Some(axis) = TimeAxis::spanning([&p.series]) {
                    let mean = p.series.mean();
                    let y = value_range([&p.series], &mean.into_iter().collect::<Vec<_>>());
                    let units = p.series.units.as_deref().unwrap_or("mg C m⁻² day⁻¹");
                    let mut chart = line_chart(&panels[0], title, units, &axis, y.clone())?;
                    shade_window(&mut chart, &axis, report.window, &y)?;
                    let label = match &p.proxy {
                        Some(proxy) => format!("{proxy} (proxy)"),
                        None => p.series.label.clone(),
                    };
                    draw_line(&mut chart, &axis, &p.series, GREEN, &label)?;
                    if let Some(mean) = mean {
                        draw_level(&mut chart, &axis, mean, GRAY, &format!("Mean: {mean:.1}"))?;
                    }
                    draw_legend(&mut chart)?;
                } else {
                    unavailable_panel(&panels[0], title, "NO NPP DATA")?;
                }
            }
            Metric::Unavailable(_) => {
                unavailable_panel(&panels[0], &format!("{title} - DATA UNAVAILABLE"), "NO NPP DATA")?;
            }
        }

        let title = "Upwelling Diagnostics (Nutrient Gradient)";
        match &report.nutrients {
            Metric::Available(n) => {
                if let Some(axis) = TimeAxis::spanning([&n.surface, &n.deep]) {
                    let y = value_range([&n.surface, &n.deep], &[0.0]);
                    let mut chart = line_chart(&panels[1], title, "Nitrate (mmol m⁻³)", &axis, y)?;
                    let surface = match n.surface_depth {
                        Some(d) => format!("Surface NO₃ ({d:.0} m)"),
                        None => "Surface NO₃".to_string(),
                    };
                    let deep = match n.deep_depth {
                        Some(d) => format!("Deep NO₃ ({d:.0} m)"),
                        None => "Deep NO₃".to_string(),
                    };
                    draw_line(&mut chart, &axis, &n.surface, GREEN, &surface)?;
                    draw_line(&mut chart, &axis, &n.deep, BLUE, &deep)?;
                    draw_legend(&mut chart)?;
                } else {
                    unavailable_panel(&panels[1], title, "NO NITRATE DATA")?;
                }
            }
            Metric::Unavailable(_) => {
                unavailable_panel(&panels[1], &format!("{title} - DATA UNAVAILABLE"), "NO NITRATE DATA")?;
            }
        }

        let title = "Habitat Oxygen Levels";
        match &report.oxygen {
            Metric::Available(o) => {
                if let Some(axis) = TimeAxis::spanning([&o.series]) {
                    let y = value_range([&o.series], &[thresholds.hypoxia, thresholds.oxygen_stress]);
                    let title = match o.depth {
                        Some(d) => format!("{title} ({d:.0}m Depth)"),
                        None => title.to_string(),
                    };
                    let mut chart = line_chart(&panels[2], &title, "Dissolved O₂ (mmol m⁻³)", &axis, y)?;
                    draw_line(&mut chart, &axis, &o.series, BLUE, "Oxygen")?;
                    draw_level(
                        &mut chart,
                        &axis,
                        thresholds.hypoxia,
                        DARK_RED,
                        &format!("Hypoxia Threshold ({})", thresholds.hypoxia),
                    )?;
                    draw_level(
                        &mut chart,
                        &axis,
                        thresholds.oxygen_stress,
                        ORANGE,
                        &format!("Stress Threshold ({})", thresholds.oxygen_stress),
                    )?;
                    draw_legend(&mut chart)?;
                } else {
                    unavailable_panel(&panels[2], title, "NO OXYGEN DATA")?;
                }
            }
            Metric::Unavailable(_) => {
                unavailable_panel(&panels[2], &format!("{title} - DATA UNAVAILABLE"), "NO OXYGEN DATA")?;
            }
        }

        root.present()?;
        Ok(())
    };
    finish(draw(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn missing_values_split_lines() {
        let series = ReducedSeries::new(
            "chl",
            (1..=5).map(at).collect(),
            vec![1.0, 2.0, f64::NAN, 3.0, 4.0],
        );
        let axis = TimeAxis::spanning([&series]).unwrap();
        let parts = segments(&series, &axis);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(parts[1], vec![(3.0, 3.0), (4.0, 4.0)]);
        assert_eq!(axis.label(3.0), "2025-01-04");
    }

    #[test]
    fn flat_series_gets_a_usable_range() {
        let series = ReducedSeries::new("o2", vec![at(1), at(2)], vec![5.0, 5.0]);
        let range = value_range([&series], &[]);
        assert!(range.start < 5.0 && range.end > 5.0);
    }
}
