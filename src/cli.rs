use std::path::PathBuf;

use clap::Parser;

use crate::config::HoopStressScale;
use crate::models::ScoringScheme;
use crate::report::chart::ChartParameter;

#[derive(Parser, Debug)]
#[command(
    name = "scc-risk",
    about = "Score and rank pipeline stations by stress corrosion cracking risk",
    version
)]
pub struct Cli {
    /// Station tables to assess: CSV, XLSX or JSON paths, or http(s) URLs [default: data.default_source from config]
    #[arg(value_name = "SOURCES")]
    pub sources: Vec<String>,

    /// Config file [default: ./.scc-risk/config.toml, fallback ~/.config/scc-risk/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scoring scheme used to categorize and rank stations
    #[arg(long, value_name = "SCHEME")]
    pub scheme: Option<SchemeArg>,

    /// Number of stations in the ranked list
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// How hoop stress values are interpreted
    #[arg(long, value_name = "SCALE")]
    pub hoop_stress_scale: Option<ScaleArg>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// PDF output path; use without value to default to scc-risk-report.pdf
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "scc-risk-report.pdf")]
    pub pdf: Option<PathBuf>,

    /// Write <label>_full_results.csv and <label>_top_ranked.csv into this directory
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Plot a parameter against stationing
    #[arg(long, value_name = "PARAM")]
    pub chart: Option<ChartArg>,

    /// Chart output path (.png or .svg) [default: <param>_plot.png]
    #[arg(long, value_name = "FILE", requires = "chart")]
    pub chart_out: Option<PathBuf>,

    /// Skip the on-disk assessment cache
    #[arg(long)]
    pub no_cache: bool,

    /// Exit with status 2 when any station is High risk
    #[arg(long)]
    pub fail_on_high: bool,

    /// Show every station, not just the ranked list; enables debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print one summary line per source
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    Pdf,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum SchemeArg {
    Weighted,
    FlagCount,
    FixedPoint,
}

impl From<&SchemeArg> for ScoringScheme {
    fn from(arg: &SchemeArg) -> Self {
        match arg {
            SchemeArg::Weighted => ScoringScheme::Weighted,
            SchemeArg::FlagCount => ScoringScheme::FlagCount,
            SchemeArg::FixedPoint => ScoringScheme::FixedPoint,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ScaleArg {
    Auto,
    Percent,
    Fraction,
}

impl From<&ScaleArg> for HoopStressScale {
    fn from(arg: &ScaleArg) -> Self {
        match arg {
            ScaleArg::Auto => HoopStressScale::Auto,
            ScaleArg::Percent => HoopStressScale::Percent,
            ScaleArg::Fraction => HoopStressScale::Fraction,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ChartArg {
    OffPsp,
    HoopStress,
    SoilResistivity,
    Distance,
    Temperature,
    PipeAge,
}

impl From<&ChartArg> for ChartParameter {
    fn from(arg: &ChartArg) -> Self {
        match arg {
            ChartArg::OffPsp => ChartParameter::OffPsp,
            ChartArg::HoopStress => ChartParameter::HoopStress,
            ChartArg::SoilResistivity => ChartParameter::SoilResistivity,
            ChartArg::Distance => ChartParameter::Distance,
            ChartArg::Temperature => ChartParameter::Temperature,
            ChartArg::PipeAge => ChartParameter::PipeAge,
        }
    }
}
