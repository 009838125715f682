use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::config::Thresholds;
use crate::models::{Assessment, RiskAssessment, RiskCategory, ScoringScheme};

use super::{criteria_rows, format_score};

/// Render a colored terminal report for every assessed source.
pub fn render(assessments: &[Assessment], thresholds: &Thresholds, verbose: bool, quiet: bool) -> Result<()> {
    if quiet {
        for a in assessments {
            println!("{}", summary_line(a));
        }
        return Ok(());
    }

    println!("\n {} v{}", "scc-risk".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Stress corrosion cracking risk assessment\n");

    println!(" {} Risk criteria:\n", "[CRITERIA]".cyan().bold());
    render_criteria(thresholds);
    println!();

    for a in assessments {
        render_assessment(a, verbose);
    }

    Ok(())
}

/// One line per source, used by `--quiet`.
pub fn summary_line(a: &Assessment) -> String {
    if a.is_empty() {
        return format!("{}: 0 stations with stationing", a.source);
    }
    format!(
        "{}: Total: {}  High: {}  Medium: {}  Low: {}  Ranked: {}",
        a.source,
        a.stations.len(),
        a.count(RiskCategory::High).to_string().red(),
        a.count(RiskCategory::Medium).to_string().yellow(),
        a.count(RiskCategory::Low).to_string().green(),
        a.ranked.len(),
    )
}

fn render_assessment(a: &Assessment, verbose: bool) {
    println!(" Assessing: {}  (scheme: {})\n", a.source.bold(), a.scheme);

    if a.is_empty() {
        println!(
            " {} 0 stations with stationing ({} rows read)\n",
            "[EMPTY]".yellow().bold(),
            a.normalization.rows_read
        );
        return;
    }

    let n = &a.normalization;
    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Stations assessed  : {}", a.stations.len()));
    println!(
        " │  {:<48} │",
        format!("{}  High            : {:>5}", "✗".red(), a.count(RiskCategory::High))
    );
    println!(
        " │  {:<48} │",
        format!("{}  Medium          : {:>5}", "⚠".yellow(), a.count(RiskCategory::Medium))
    );
    println!(
        " │  {:<48} │",
        format!("{}  Low             : {:>5}", "✓".green(), a.count(RiskCategory::Low))
    );
    println!(" │  {:<48} │", format!("Rows dropped       : {}", n.rows_dropped));
    println!(" │  {:<48} │", format!("Cells recovered    : {}", n.total_recoveries()));
    if n.hoop_stress_rescaled {
        println!(" │  {:<48} │", "Hoop stress rescaled from fractions");
    }
    println!(" └────────────────────────────────────────────────────┘\n");

    if a.ranked.is_empty() {
        println!(" {} No high-risk stations to rank.\n", "[OK]".green().bold());
    } else {
        println!(
            " {} Top {} stations by risk:\n",
            "[RANKED]".red().bold(),
            a.ranked.len()
        );
        render_table(a.top(), a.scheme, true);
        println!();
    }

    if verbose {
        println!(" {} All stations:\n", "[ALL]".bold());
        render_table(a.stations.iter(), a.scheme, false);
        println!();
    }
}

fn render_criteria(thresholds: &Thresholds) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Criterion").add_attribute(Attribute::Bold),
            Cell::new("Threshold").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

    for (flag, threshold) in criteria_rows(thresholds) {
        table.add_row(vec![
            Cell::new(flag.label()),
            Cell::new(threshold),
            Cell::new(flag.description()),
        ]);
    }

    println!("{}", table);
}

fn render_table<'a>(
    stations: impl Iterator<Item = &'a RiskAssessment>,
    scheme: ScoringScheme,
    numbered: bool,
) {
    let mut header = Vec::new();
    if numbered {
        header.push(Cell::new("Rank").add_attribute(Attribute::Bold));
    }
    for title in [
        "Stationing (m)",
        "Score",
        "Flags",
        "Category",
        "Hoop %",
        "|PSP| V",
        "Pump km",
        "Age",
        "Temp °C",
        "Coating",
    ] {
        header.push(Cell::new(title).add_attribute(Attribute::Bold));
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for (i, s) in stations.enumerate() {
        let r = &s.record;
        let mut row = Vec::new();
        if numbered {
            row.push(Cell::new(i + 1).set_alignment(CellAlignment::Right));
        }
        row.extend([
            Cell::new(format!("{:.1}", r.stationing_m)).set_alignment(CellAlignment::Right),
            Cell::new(format_score(scheme, s.composite_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} [{}]", s.flag_count, s.flags.summary())),
            Cell::new(s.risk_category.to_string())
                .fg(category_color(s.risk_category))
                .set_alignment(CellAlignment::Center),
            Cell::new(format!("{:.1}", r.hoop_stress_pct)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", r.off_psp_v)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", r.distance_from_pump_km)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}", r.pipe_age_years)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", r.temperature_c)).set_alignment(CellAlignment::Right),
            Cell::new(&r.coating_type),
        ]);
        table.add_row(row);
    }

    println!("{}", table);
}

fn category_color(category: RiskCategory) -> Color {
    match category {
        RiskCategory::High => Color::Red,
        RiskCategory::Medium => Color::Yellow,
        RiskCategory::Low => Color::Green,
    }
}
