//! `scc-risk` — score pipeline stations for stress corrosion cracking risk and rank them.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and initialise logging.
//! 2. Load config ([`config::load_config`]) and apply CLI overrides.
//! 3. Load every data source, fetching URLs concurrently ([`source`]).
//! 4. Per source: reuse a cached assessment ([`cache`]) or read the table
//!    ([`table`]) and run the scoring pipeline ([`scoring`]).
//! 5. Render the requested report, CSV exports and chart ([`report`]).
//! 6. Exit `0`, `1` when any source failed, or `2` with `--fail-on-high`
//!    when any station is High risk.

mod cache;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scoring;
mod source;
mod table;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cache::{AssessmentCache, CacheKey};
use cli::{Cli, ReportFormat};
use config::{load_config, Config};
use error::AssessError;
use models::{Assessment, NormalizationReport, RiskCategory};
use report::chart::{ChartParameter, ChartSeries};
use scoring::Scorer;
use source::DataSource;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let mut config = load_config(&working_dir, cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);

    let scorer = Scorer::new(&config)?;

    let sources = resolve_sources(&cli, &config);
    if sources.is_empty() {
        eprintln!("No data source given. Pass a path or URL, or set data.default_source in the config.");
        std::process::exit(1);
    }

    let cache = match AssessmentCache::from_config(&config.cache) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(error = %e, "assessment cache unavailable");
            None
        }
    };
    if let Some(cache) = &cache {
        tracing::debug!(
            dir = %cache.dir().display(),
            entries = cache.len(),
            "assessment cache enabled"
        );
    }

    let timeout = Duration::from_secs(config.data.timeout_secs);
    let loaded = source::load_all(&sources, timeout, cli.quiet).await?;

    let fingerprint = config.fingerprint();
    let mut assessed: Vec<(DataSource, Assessment)> = Vec::new();
    let mut failed = false;

    for (source, bytes) in sources.into_iter().zip(loaded) {
        let outcome = bytes
            .map_err(anyhow::Error::from)
            .and_then(|bytes| assess_source(&scorer, cache.as_ref(), &fingerprint, &source, &bytes));
        match outcome {
            Ok(assessment) => {
                if !cli.quiet && assessment.is_empty() {
                    eprintln!(
                        "  {} {}: 0 stations with stationing",
                        "→".cyan(),
                        source
                    );
                }
                assessed.push((source, assessment));
            }
            Err(e) => {
                eprintln!("{} {:#}", "error:".red().bold(), e);
                failed = true;
            }
        }
    }

    let (assessed_sources, assessments): (Vec<DataSource>, Vec<Assessment>) =
        assessed.into_iter().unzip();
    let labels = unique_labels(assessed_sources.iter());
    let chart_param: Option<ChartParameter> = cli.chart.as_ref().map(Into::into);

    // --pdf implies PDF format
    let report_format = match &cli.pdf {
        Some(_) => ReportFormat::Pdf,
        None => cli.report.clone(),
    };
    let pdf_path = cli
        .pdf
        .clone()
        .unwrap_or_else(|| PathBuf::from("scc-risk-report.pdf"));

    if !assessments.is_empty() {
        match report_format {
            ReportFormat::Terminal => {
                report::terminal::render(&assessments, &config.thresholds, cli.verbose, cli.quiet)?;
            }
            ReportFormat::Json => {
                println!("{}", report::export::to_json(&assessments)?);
            }
            ReportFormat::Pdf => {
                report::pdf::render(&assessments, &config, chart_param, &pdf_path)?;
            }
        }
    }

    if let Some(dir) = &cli.export_dir {
        for (a, label) in assessments.iter().zip(&labels) {
            let (full, top) = report::export::export_csv(a, dir, label)?;
            if !cli.quiet {
                eprintln!("  {} {} / {}", "→".cyan(), full.display(), top.display());
            }
        }
    }

    if let Some(parameter) = chart_param {
        let base = cli
            .chart_out
            .clone()
            .unwrap_or_else(|| parameter.default_output());
        let multi = assessments.len() > 1;
        for (a, label) in assessments.iter().zip(&labels) {
            if a.is_empty() {
                continue;
            }
            let path = chart_path(&base, label, multi);
            let series = ChartSeries::new(parameter, &a.source, &a.stations, &config.thresholds);
            match report::chart::render_file(&series, &path, report::chart::DEFAULT_SIZE) {
                Ok(()) if !cli.quiet => eprintln!("  {} {}", "→".cyan(), path.display()),
                Ok(()) => {}
                Err(e) => {
                    eprintln!("{} {:#}", "error:".red().bold(), e);
                    failed = true;
                }
            }
        }
    }

    if failed {
        std::process::exit(1);
    }

    let any_high = assessments
        .iter()
        .any(|a| a.count(RiskCategory::High) > 0);
    if cli.fail_on_high && any_high {
        std::process::exit(2);
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `debug` under `--verbose`, else `warn`. Logs go to stderr.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(scheme) = &cli.scheme {
        config.scoring.scheme = scheme.into();
    }
    if let Some(top) = cli.top {
        config.scoring.top_n = top;
    }
    if let Some(scale) = &cli.hoop_stress_scale {
        config.normalization.hoop_stress_scale = scale.into();
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
}

fn resolve_sources(cli: &Cli, config: &Config) -> Vec<DataSource> {
    if cli.sources.is_empty() {
        config
            .data
            .default_source
            .iter()
            .map(|s| DataSource::parse(s))
            .collect()
    } else {
        cli.sources.iter().map(|s| DataSource::parse(s)).collect()
    }
}

/// Cached assessment for these exact bytes and config, or a fresh pass.
///
/// A table with no stationed rows becomes an empty assessment, not an error.
fn assess_source(
    scorer: &Scorer,
    cache: Option<&AssessmentCache>,
    fingerprint: &str,
    source: &DataSource,
    bytes: &[u8],
) -> Result<Assessment> {
    let name = source.name();
    let key = CacheKey::new(bytes, table::detect_format(&name, bytes), fingerprint);

    if let Some(mut hit) = cache.and_then(|c| c.get(&key)) {
        hit.source = name;
        return Ok(hit);
    }

    let table = table::read_table(&name, bytes).with_context(|| format!("Failed to read {}", name))?;

    let assessment = match scorer.assess(&name, &table) {
        Ok(assessment) => assessment,
        Err(AssessError::EmptyDataset { rows_read }) => {
            tracing::warn!(source = %name, rows_read, "no stations with stationing");
            Assessment::empty(
                &name,
                scorer.scheme(),
                NormalizationReport {
                    rows_read,
                    rows_dropped: rows_read,
                    ..Default::default()
                },
            )
        }
        Err(e) => return Err(e).with_context(|| format!("Cannot assess {}", name)),
    };

    if let Some(cache) = cache {
        if let Err(e) = cache.insert(&key, &assessment) {
            tracing::warn!(error = %e, "failed to write cache entry");
        }
    }

    Ok(assessment)
}

/// File-name labels per source, suffixed with `_2`, `_3`… on collision.
fn unique_labels<'a>(sources: impl Iterator<Item = &'a DataSource>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    sources
        .map(|s| {
            let label = s.label();
            let n = seen.entry(label.clone()).or_insert(0);
            *n += 1;
            if *n == 1 {
                label
            } else {
                format!("{}_{}", label, n)
            }
        })
        .collect()
}

/// With several sources, `<label>_` is prefixed to the chart file name.
fn chart_path(base: &Path, label: &str, multi: bool) -> PathBuf {
    if !multi {
        return base.to_path_buf();
    }
    let file_name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plot.png".to_string());
    base.with_file_name(format!("{}_{}", label, file_name))
}
