//! Text reports
//!
//! Renderers return the report as a `String`; the binary prints it.

use crate::config::Thresholds;
use crate::dataset::ReducedSeries;
use crate::diagnostics::{
    ChlorophyllSummary, ForecastRow, Metric, Nutrients, Oxygen, Production, ProfileReport, Status,
};
use std::fmt::Write;

const WIDE: usize = 70;
const NARROW: usize = 50;

fn rule(out: &mut String, ch: char, width: usize) {
    let _ = writeln!(out, "{}", ch.to_string().repeat(width));
}

fn banner(out: &mut String, title: &str, width: usize) {
    let _ = writeln!(out);
    rule(out, '=', width);
    let _ = writeln!(out, "{title}");
    rule(out, '=', width);
}

fn units_of(series: &ReducedSeries, fallback: &str) -> String {
    series.units.clone().unwrap_or_else(|| fallback.to_string())
}

/// Weekly chlorophyll overview per zone.
pub fn render_chlorophyll_report(summaries: &[ChlorophyllSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- ANALYSIS REPORT ---");

    for summary in summaries {
        let _ = writeln!(out, "\nZONE: {}", summary.zone);
        match (&summary.series, summary.mean, summary.peak, summary.status) {
            (Metric::Unavailable(reason), ..) => {
                let _ = writeln!(out, "  - STATUS: UNAVAILABLE ({reason})");
            }
            (Metric::Available(series), Some(mean), Some((date, peak)), Some(status)) => {
                let units = units_of(series, "mg/m³");
                let _ = writeln!(out, "  - Average Productivity: {mean:.2} {units}");
                let _ = writeln!(
                    out,
                    "  - Peak Productivity: {peak:.2} {units} (on {})",
                    date.format("%Y-%m-%d")
                );
                let note = match status {
                    Status::LowProductivity => " (Potential Fisheries Risk)",
                    Status::VeryHigh => " (Potential Algal Bloom Risk)",
                    _ => "",
                };
                let _ = writeln!(out, "  - STATUS: {status}{note}");
            }
            _ => {
                let _ = writeln!(
                    out,
                    "  - STATUS: NO DATA (Check cloud cover or file selection)"
                );
            }
        }
    }

    let _ = writeln!(out, "\nProcessing Complete.");
    out
}

/// Fisheries prediction table.
pub fn render_forecast_report(rows: &[ForecastRow], thresholds: &Thresholds) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- RUNNING FISHERIES PREDICTION SIMULATION ---");
    let _ = writeln!(
        out,
        "Model Baseline (Healthy Ecosystem): {} mg/m³",
        thresholds.baseline_chl
    );
    let _ = writeln!(
        out,
        "Trophic Sensitivity Factor: {}",
        thresholds.trophic_sensitivity
    );

    banner(&mut out, "PREDICTIVE GOVERNANCE REPORT: NEXT-SEASON FORECAST", NARROW);
    let _ = writeln!(
        out,
        "{:<15} | {:<18} | {:<18} | {:<20}",
        "ZONE", "OBSERVED (mg/m³)", "ECO-HEALTH (PPI)", "FISH CATCH FORECAST"
    );
    rule(&mut out, '-', 75);

    for row in rows {
        match (&row.anomaly, row.health, row.yield_forecast) {
            (Metric::Available(anomaly), Some(health), Some(forecast)) => {
                let forecast_str = if forecast > 0.0 {
                    format!("+{forecast:.1}% Growth")
                } else {
                    format!("{forecast:.1}% Decline")
                };
                let ppi = format!("{:>6.1}% ({health})", anomaly.anomaly_pct);
                let _ = writeln!(
                    out,
                    "{:<15} | {:<18.2} | {:<18} | {:<20}",
                    row.zone, anomaly.bloom_mean, ppi, forecast_str
                );
            }
            (Metric::Unavailable(reason), ..) => {
                let _ = writeln!(
                    out,
                    "{:<15} | {:<18} | {:<18} | {:<20}",
                    row.zone, "n/a", "UNAVAILABLE", "n/a"
                );
                let _ = writeln!(out, "{:<15}   -> {reason}", "");
            }
            _ => {
                let _ = writeln!(out, "{:<15} | incomplete diagnostics", row.zone);
            }
        }
    }

    rule(&mut out, '-', 75);
    let _ = writeln!(out, "INTERPRETATION:");
    let _ = writeln!(
        out,
        "1. PPI Anomaly: % deviation from healthy ecosystem baseline."
    );
    let _ = writeln!(
        out,
        "2. Catch Forecast: Estimated impact on fisheries volume for next season."
    );
    let _ = writeln!(
        out,
        "   (Based on trophic transfer sensitivity of {})",
        thresholds.trophic_sensitivity
    );
    rule(&mut out, '=', NARROW);
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    rule(out, '-', WIDE);
    let _ = writeln!(out, "{title}");
    rule(out, '-', WIDE);
}

fn render_production(out: &mut String, production: &Production) {
    section(out, "1. PRIMARY PRODUCTION ASSESSMENT");
    let units = units_of(&production.series, "mg C m⁻² day⁻¹");
    if let Some(proxy) = &production.proxy {
        let _ = writeln!(out, "   Note: {proxy} used as productivity proxy");
    }
    match (&production.bloom, production.status) {
        (Metric::Available(bloom), Some(status)) => {
            let _ = writeln!(out, "   Bloom Period:            {:.2} {units}", bloom.bloom_mean);
            let _ = writeln!(out, "   Annual Mean:             {:.2} {units}", bloom.reference);
            let _ = writeln!(out, "   Bloom Anomaly:           {:+.1}%", bloom.anomaly_pct);
            let _ = writeln!(out, "\n   STATUS: {status}");
            match status {
                Status::StrongBloom => {
                    let _ = writeln!(out, "      -> Favorable for fish recruitment");
                }
                Status::BloomFailure => {
                    let _ = writeln!(out, "      -> Below-average productivity");
                }
                _ => {}
            }
        }
        (Metric::Unavailable(reason), _) => {
            let _ = writeln!(out, "   Could not analyze bloom period: {reason}");
        }
        _ => {}
    }
}

fn render_nutrients(out: &mut String, nutrients: &Nutrients) {
    section(out, "2. UPWELLING & NUTRIENT STATUS");
    match &nutrients.upwelling {
        Metric::Available(u) => {
            let _ = writeln!(out, "   Surface NO₃ (Bloom):     {:.3} mmol m⁻³", u.surface);
            let _ = writeln!(out, "   Deep NO₃ (Bloom):        {:.3} mmol m⁻³", u.deep);
            let _ = writeln!(out, "   Upwelling Gradient:      {:.3} mmol m⁻³", u.gradient);
            let _ = writeln!(out, "\n   DIAGNOSIS: {}", u.status);
            let note = match u.status {
                Status::EfficientUtilization => "Strong upwelling with active consumption",
                Status::VeryStrongUpwelling => "Deep reserve far above the surface",
                Status::NutrientLimitation => "Upwelling failed to breach the surface",
                _ => "Failure, if any, due to other factors (temperature/light)",
            };
            let _ = writeln!(out, "      -> {note}");
        }
        Metric::Unavailable(reason) => {
            let _ = writeln!(out, "   Could not analyze nutrients: {reason}");
        }
    }
}

fn render_oxygen(out: &mut String, oxygen: &Oxygen) {
    section(out, "3. HABITAT OXYGEN ASSESSMENT");
    match &oxygen.check {
        Metric::Available(check) => {
            if let Some(depth) = oxygen.depth {
                let _ = writeln!(out, "   Depth:                   {depth:.0} m");
            }
            let _ = writeln!(
                out,
                "   Minimum O₂:              {:.2} mmol m⁻³ (on {})",
                check.minimum,
                check.minimum_at.format("%Y-%m-%d")
            );
            let _ = writeln!(out, "   Mean O₂:                 {:.2} mmol m⁻³", check.mean);
            match check.status {
                Status::Hypoxic => {
                    let _ = writeln!(out, "\n   ALERT: {} events detected", Status::Hypoxic);
                    let _ = writeln!(out, "      -> Fish mortality/displacement likely");
                }
                Status::Caution => {
                    let _ = writeln!(out, "\n   {}: Oxygen stress periods", Status::Caution);
                    let _ = writeln!(out, "      -> Sub-optimal for sensitive species");
                }
                status => {
                    let _ = writeln!(out, "\n   OXYGEN: {status} levels throughout");
                }
            }
        }
        Metric::Unavailable(reason) => {
            let _ = writeln!(out, "   Could not analyze oxygen: {reason}");
        }
    }
}

/// Three-section water-column report.
pub fn render_profile_report(report: &ProfileReport) -> String {
    let mut out = String::new();
    banner(
        &mut out,
        &format!(
            "BIOGEOCHEMICAL ANALYSIS REPORT - {} ZONE ({})",
            report.zone.to_uppercase(),
            report.year
        ),
        WIDE,
    );
    let _ = writeln!(
        out,
        "Bloom window: {} to {}",
        report.window.0, report.window.1
    );

    match &report.production {
        Metric::Available(p) => render_production(&mut out, p),
        Metric::Unavailable(reason) => {
            let _ = writeln!(out, "\n1. PRIMARY PRODUCTION: No data available ({reason})");
        }
    }
    match &report.nutrients {
        Metric::Available(n) => render_nutrients(&mut out, n),
        Metric::Unavailable(reason) => {
            let _ = writeln!(out, "\n2. UPWELLING STATUS: No data available ({reason})");
        }
    }
    match &report.oxygen {
        Metric::Available(o) => render_oxygen(&mut out, o),
        Metric::Unavailable(reason) => {
            let _ = writeln!(out, "\n3. OXYGEN STATUS: No data available ({reason})");
        }
    }

    let _ = writeln!(out);
    rule(&mut out, '=', WIDE);
    out
}
