//! A single parameter plotted along the pipeline, with dashed reference lines
//! at the active thresholds.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::Thresholds;
use crate::models::{RiskAssessment, StationRecord};
use crate::scoring::normalize;

pub const DEFAULT_SIZE: (u32, u32) = (1200, 600);

/// Number of dash/gap pairs across a reference line.
const DASHES: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartParameter {
    OffPsp,
    HoopStress,
    SoilResistivity,
    Distance,
    Temperature,
    PipeAge,
}

impl ChartParameter {
    pub fn column(&self) -> &'static str {
        match self {
            ChartParameter::OffPsp => normalize::OFF_PSP,
            ChartParameter::HoopStress => normalize::HOOP_STRESS,
            ChartParameter::SoilResistivity => normalize::SOIL_RESISTIVITY,
            ChartParameter::Distance => normalize::DISTANCE_FROM_PUMP,
            ChartParameter::Temperature => normalize::TEMPERATURE,
            ChartParameter::PipeAge => normalize::PIPE_AGE,
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            ChartParameter::OffPsp => "|OFF PSP| (V)",
            ChartParameter::HoopStress => "Hoop stress (% SMYS)",
            ChartParameter::SoilResistivity => "Soil resistivity (Ω·cm)",
            ChartParameter::Distance => "Distance from pump (km)",
            ChartParameter::Temperature => "Temperature (°C)",
            ChartParameter::PipeAge => "Pipe age (years)",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            ChartParameter::OffPsp => "off_psp",
            ChartParameter::HoopStress => "hoop_stress",
            ChartParameter::SoilResistivity => "soil_resistivity",
            ChartParameter::Distance => "distance",
            ChartParameter::Temperature => "temperature",
            ChartParameter::PipeAge => "pipe_age",
        }
    }

    pub fn value(&self, r: &StationRecord) -> f64 {
        match self {
            ChartParameter::OffPsp => r.off_psp_v,
            ChartParameter::HoopStress => r.hoop_stress_pct,
            ChartParameter::SoilResistivity => r.soil_resistivity_ohm_cm,
            ChartParameter::Distance => r.distance_from_pump_km,
            ChartParameter::Temperature => r.temperature_c,
            ChartParameter::PipeAge => r.pipe_age_years,
        }
    }

    /// Values substituted for missing cells that would swamp the y axis.
    fn is_sentinel(&self, value: f64) -> bool {
        match self {
            ChartParameter::SoilResistivity => value >= normalize::FALLBACK_SOIL_RESISTIVITY,
            ChartParameter::Distance => value >= normalize::FALLBACK_DISTANCE,
            _ => false,
        }
    }

    pub fn reference_lines(&self, t: &Thresholds) -> Vec<f64> {
        match self {
            ChartParameter::OffPsp => vec![t.protection_criterion_v, t.over_protection_v],
            ChartParameter::HoopStress => vec![t.hoop_stress_pct],
            ChartParameter::SoilResistivity => vec![t.soil_resistivity_ohm_cm],
            ChartParameter::Distance => vec![t.near_pump_km],
            ChartParameter::Temperature => vec![t.temperature_c],
            ChartParameter::PipeAge => vec![t.pipe_age_years],
        }
    }

    /// `<param>_plot.png` in the working directory.
    pub fn default_output(&self) -> PathBuf {
        PathBuf::from(format!("{}_plot.png", self.slug()))
    }
}

impl std::fmt::Display for ChartParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Points and reference lines ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub parameter: ChartParameter,
    pub title: String,
    /// `(stationing, value)`, sorted by stationing.
    pub points: Vec<(f64, f64)>,
    pub reference_lines: Vec<f64>,
}

impl ChartSeries {
    pub fn new(
        parameter: ChartParameter,
        title: &str,
        stations: &[RiskAssessment],
        thresholds: &Thresholds,
    ) -> Self {
        let mut points: Vec<(f64, f64)> = stations
            .iter()
            .map(|s| (s.record.stationing_m, parameter.value(&s.record)))
            .filter(|(x, y)| x.is_finite() && y.is_finite() && !parameter.is_sentinel(*y))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        ChartSeries {
            parameter,
            title: title.to_string(),
            points,
            reference_lines: parameter.reference_lines(thresholds),
        }
    }

    pub fn x_range(&self) -> (f64, f64) {
        padded(self.points.iter().map(|p| p.0))
    }

    /// Covers both the data and every reference line.
    pub fn y_range(&self) -> (f64, f64) {
        padded(
            self.points
                .iter()
                .map(|p| p.1)
                .chain(self.reference_lines.iter().copied()),
        )
    }
}

fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Write the chart to `path`: SVG for a `.svg` extension, PNG otherwise.
pub fn render_file(series: &ChartSeries, path: &Path, size: (u32, u32)) -> Result<()> {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    let drawn = if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw(&root, series)
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw(&root, series)
    };
    drawn.with_context(|| format!("Failed to render chart to {}", path.display()))?;

    tracing::info!(path = %path.display(), parameter = %series.parameter, "chart written");
    Ok(())
}

/// Render into a packed RGB8 buffer of `width * height * 3` bytes.
pub fn render_rgb(series: &ChartSeries, (width, height): (u32, u32)) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        draw(&root, series).context("Failed to render chart image")?;
    }
    Ok(buf)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, series: &ChartSeries) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (x0, x1) = series.x_range();
    let (y0, y1) = series.y_range();

    let mut chart = ChartBuilder::on(root)
        .caption(&series.title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("Stationing (m)")
        .y_desc(series.parameter.axis_label())
        .draw()?;

    chart.draw_series(LineSeries::new(
        series.points.iter().copied(),
        BLUE.stroke_width(2),
    ))?;
    chart.draw_series(
        series
            .points
            .iter()
            .map(|&p| Circle::new(p, 3, BLUE.filled())),
    )?;

    let step = (x1 - x0) / (DASHES * 2) as f64;
    for &y in &series.reference_lines {
        chart.draw_series((0..DASHES).map(|i| {
            let start = x0 + step * (2 * i) as f64;
            PathElement::new(vec![(start, y), (start + step, y)], RED.stroke_width(2))
        }))?;
    }

    root.present()?;
    Ok(())
}
