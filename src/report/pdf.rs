use std::path::Path;

use anyhow::{Context, Result};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Polygon, Rgb,
};
use printpdf::path::{PaintMode, WindingOrder};

use crate::config::Config;
use crate::models::{Assessment, RiskCategory, ScoringScheme};

use super::chart::{self, ChartParameter, ChartSeries};
use super::{criteria_rows, format_score};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 18.0;
const COVER_HDR_H: f32 = 72.0; // gradient header height on cover page

// ── Light Liquid Glass colour palette ─────────────────────────────────────────
const BG:           (f32, f32, f32) = (1.00, 1.00, 1.00); // pure white page
const PANEL:        (f32, f32, f32) = (1.00, 1.00, 1.00); // pure white
const PANEL_ALT:    (f32, f32, f32) = (0.95, 0.96, 0.99); // subtle alternating tint
const PANEL_BORDER: (f32, f32, f32) = (0.85, 0.87, 0.92); // subtle border
const ACCENT_BLU:   (f32, f32, f32) = (0.20, 0.46, 0.95); // vivid blue
const ACCENT_PUR:   (f32, f32, f32) = (0.52, 0.30, 0.95); // vivid purple
const TEXT_PRI:     (f32, f32, f32) = (0.07, 0.08, 0.14); // near-black
const TEXT_SEC:     (f32, f32, f32) = (0.36, 0.40, 0.52); // medium grey-blue
const TEXT_MUT:     (f32, f32, f32) = (0.58, 0.63, 0.72); // muted grey
const WHITE:        (f32, f32, f32) = (1.00, 1.00, 1.00);
const WHITE_DIM:    (f32, f32, f32) = (0.82, 0.89, 1.00); // dimmed white for header

const LOW_BG:  (f32, f32, f32) = (0.90, 0.98, 0.92);
const LOW_FG:  (f32, f32, f32) = (0.07, 0.52, 0.22);
const MED_BG:  (f32, f32, f32) = (1.00, 0.95, 0.87);
const MED_FG:  (f32, f32, f32) = (0.70, 0.40, 0.02);
const HIGH_BG: (f32, f32, f32) = (1.00, 0.91, 0.91);
const HIGH_FG: (f32, f32, f32) = (0.76, 0.09, 0.13);

// Corner radius constants
const R_PANEL: f32 = 2.5;
const R_BADGE: f32 = 1.5;

// ── Category summary table layout ─────────────────────────────────────────────
const C1_X: f32 = MARGIN;
const C2_X: f32 = MARGIN + 44.0;
const C3_X: f32 = MARGIN + 118.0;
const T_END: f32 = PAGE_W - MARGIN;

const HDR_H: f32 = 9.0;
const LINE_H: f32 = 4.8;
const ROW_PAD: f32 = 4.5;

const BADGE_W: f32 = 37.0;
const BADGE_H: f32 = 6.5;
const DOT_SIZE: f32 = 2.5;

const DESC_WRAP: usize = 36;
const STATIONS_WRAP: usize = 28;
const STATIONS_MAX_LINES: usize = 4;

// ── Public entry point ────────────────────────────────────────────────────────

/// Render a PDF report: one cover for every source, then per source a
/// category summary, the ranked table and, when requested, a chart page.
pub fn render(
    assessments: &[Assessment],
    config: &Config,
    chart: Option<ChartParameter>,
    output_path: &Path,
) -> Result<()> {
    let doc = PdfDocument::empty("SCC Risk Report");

    add_cover_page(&doc, assessments)?;

    let multi = assessments.len() > 1;
    for a in assessments {
        let label = multi.then_some(a.source.as_str());
        add_category_summary_page(&doc, a, config, label)?;
        add_ranked_pages(&doc, a, label)?;
        if let Some(parameter) = chart {
            if !a.is_empty() {
                let series = ChartSeries::new(parameter, &a.source, &a.stations, &config.thresholds);
                add_chart_page(&doc, &series, label)?;
            }
        }
    }

    let bytes = doc.save_to_bytes()?;
    std::fs::write(output_path, &bytes)
        .with_context(|| format!("Failed to write PDF to {}", output_path.display()))?;

    println!("PDF report written to: {}", output_path.display());
    Ok(())
}

// ── Cover page ────────────────────────────────────────────────────────────────

fn add_cover_page(doc: &PdfDocumentReference, assessments: &[Assessment]) -> Result<()> {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Cover");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    let font_b = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_r = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    let total: usize = assessments.iter().map(|a| a.stations.len()).sum();
    let count = |c: RiskCategory| assessments.iter().map(|a| a.count(c)).sum::<usize>();
    let (high, medium, low) = (
        count(RiskCategory::High),
        count(RiskCategory::Medium),
        count(RiskCategory::Low),
    );
    let scheme = assessments
        .first()
        .map(|a| a.scheme)
        .unwrap_or_default();

    // Background + gradient header
    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    let hdr_bot = PAGE_H - COVER_HDR_H;
    fill_gradient_h(&layer, 0.0, hdr_bot, PAGE_W, COVER_HDR_H, ACCENT_BLU, ACCENT_PUR, 28);

    set_color(&layer, WHITE_DIM);
    layer.use_text(
        format!("scc-risk v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(PAGE_W - MARGIN - 30.0), Mm(PAGE_H - 10.5), &font_r,
    );

    set_color(&layer, WHITE);
    layer.use_text("Stress Corrosion", 28.0, Mm(MARGIN), Mm(PAGE_H - 26.0), &font_b);
    set_color(&layer, WHITE_DIM);
    layer.use_text("Cracking Risk Report", 28.0, Mm(MARGIN), Mm(PAGE_H - 41.0), &font_b);

    // Source chip
    let chip_y = hdr_bot - 18.0;
    let chip_h = 12.0f32;
    let chip_w = 106.0f32;
    fill_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL);
    stroke_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL_BORDER);
    fill_rect(&layer, MARGIN, chip_y, 2.5, chip_h, ACCENT_BLU);

    let chip_text = match assessments {
        [single] => truncate(&single.source, 34),
        many => format!("{} source{}", many.len(), if many.len() == 1 { "" } else { "s" }),
    };
    set_color(&layer, TEXT_MUT);
    layer.use_text("DATA SOURCE", 6.0, Mm(MARGIN + 5.0), Mm(chip_y + chip_h - 3.8), &font_b);
    set_color(&layer, TEXT_PRI);
    layer.use_text(chip_text, 9.5, Mm(MARGIN + 5.0), Mm(chip_y + 2.8), &font_b);

    // Scheme chip
    let scheme_x = MARGIN + chip_w + 4.0;
    let scheme_w = T_END - scheme_x;
    fill_rounded_rect(&layer, scheme_x, chip_y, scheme_w, chip_h, R_BADGE, PANEL);
    stroke_rounded_rect(&layer, scheme_x, chip_y, scheme_w, chip_h, R_BADGE, PANEL_BORDER);
    fill_rect(&layer, scheme_x, chip_y, 2.5, chip_h, ACCENT_PUR);
    set_color(&layer, TEXT_MUT);
    layer.use_text("SCORING SCHEME", 6.0, Mm(scheme_x + 5.0), Mm(chip_y + chip_h - 3.8), &font_b);
    set_color(&layer, TEXT_PRI);
    layer.use_text(scheme.to_string(), 9.5, Mm(scheme_x + 5.0), Mm(chip_y + 2.8), &font_b);

    // Assessment date
    set_color(&layer, TEXT_SEC);
    layer.use_text(
        format!("Assessed  {}", today()),
        9.0, Mm(MARGIN), Mm(chip_y - 8.0), &font_r,
    );

    // Divider + OVERVIEW
    let rule_y = chip_y - 16.5;
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, rule_y, PANEL_BORDER);
    set_color(&layer, TEXT_MUT);
    layer.use_text("OVERVIEW", 6.5, Mm(MARGIN), Mm(rule_y - 7.0), &font_b);

    // Stat cards
    let card_y  = rule_y - 42.0;
    let card_h  = 26.0f32;
    let gap     = 4.0f32;
    let total_w = T_END - MARGIN;
    let card_w  = (total_w - gap * 3.0) / 4.0;

    let cards: [(&str, String, (f32, f32, f32)); 4] = [
        ("STATIONS", total.to_string(),  ACCENT_BLU),
        ("HIGH",     high.to_string(),   HIGH_FG),
        ("MEDIUM",   medium.to_string(), MED_FG),
        ("LOW",      low.to_string(),    LOW_FG),
    ];

    for (i, (label, value, accent)) in cards.iter().enumerate() {
        let cx = MARGIN + (card_w + gap) * i as f32;
        draw_stat_card(&layer, cx, card_y, card_w, card_h, label, value, *accent,
                       &font_r, &font_b);
    }

    // Sources assessed table
    let section_y = card_y - 13.0;
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, section_y, PANEL_BORDER);
    set_color(&layer, TEXT_MUT);
    layer.use_text("SOURCES ASSESSED", 6.5, Mm(MARGIN), Mm(section_y - 7.5), &font_b);

    let tbl_hdr_y = section_y - 14.0;
    let col_src  = MARGIN + 2.0;
    let col_tot  = MARGIN + 88.0;
    let col_high = MARGIN + 106.0;
    let col_med  = MARGIN + 124.0;
    let col_low  = MARGIN + 142.0;
    let col_rank = MARGIN + 158.0;

    set_color(&layer, TEXT_MUT);
    layer.use_text("SOURCE",   6.5, Mm(col_src),  Mm(tbl_hdr_y), &font_b);
    layer.use_text("STATIONS", 6.5, Mm(col_tot),  Mm(tbl_hdr_y), &font_b);
    layer.use_text("HIGH",     6.5, Mm(col_high), Mm(tbl_hdr_y), &font_b);
    layer.use_text("MEDIUM",   6.5, Mm(col_med),  Mm(tbl_hdr_y), &font_b);
    layer.use_text("LOW",      6.5, Mm(col_low),  Mm(tbl_hdr_y), &font_b);
    layer.use_text("RANKED",   6.5, Mm(col_rank), Mm(tbl_hdr_y), &font_b);
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, tbl_hdr_y - 2.0, PANEL_BORDER);

    const MAX_ROWS: usize = 12;
    let show = assessments.len().min(MAX_ROWS);

    for (i, a) in assessments.iter().take(show).enumerate() {
        let row_y = tbl_hdr_y - 7.5 - i as f32 * 6.5;
        let a_high = a.count(RiskCategory::High);

        if i % 2 == 0 {
            fill_rect(&layer, MARGIN, row_y - 1.5, T_END - MARGIN, 6.5, PANEL_ALT);
        }

        set_color(&layer, TEXT_PRI);
        layer.use_text(truncate(&a.source, 40), 8.0, Mm(col_src), Mm(row_y), &font_r);
        set_color(&layer, TEXT_SEC);
        layer.use_text(a.stations.len().to_string(), 8.0, Mm(col_tot), Mm(row_y), &font_r);
        layer.use_text(a.count(RiskCategory::Medium).to_string(), 8.0, Mm(col_med), Mm(row_y), &font_r);
        layer.use_text(a.count(RiskCategory::Low).to_string(),    8.0, Mm(col_low), Mm(row_y), &font_r);
        layer.use_text(a.ranked.len().to_string(), 8.0, Mm(col_rank), Mm(row_y), &font_r);

        if a_high > 0 {
            fill_rounded_rect(&layer, col_high - 0.5, row_y - 1.2, 14.0, 4.5, R_BADGE, HIGH_BG);
            set_color(&layer, HIGH_FG);
            layer.use_text(a_high.to_string(), 8.0, Mm(col_high + 1.0), Mm(row_y), &font_b);
        } else {
            set_color(&layer, TEXT_MUT);
            layer.use_text("0", 8.0, Mm(col_high), Mm(row_y), &font_r);
        }
    }

    if assessments.len() > MAX_ROWS {
        let more_y = tbl_hdr_y - 7.5 - show as f32 * 6.5;
        set_color(&layer, TEXT_MUT);
        layer.use_text(
            format!("+ {} more…", assessments.len() - MAX_ROWS),
            7.5, Mm(col_src), Mm(more_y), &font_r,
        );
    }

    // What's in this report
    let bullet_y = tbl_hdr_y - 7.5 - (show as f32 + 1.0) * 6.5 - 4.0;
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, bullet_y, PANEL_BORDER);
    set_color(&layer, TEXT_MUT);
    layer.use_text("WHAT'S IN THIS REPORT", 6.5, Mm(MARGIN), Mm(bullet_y - 7.5), &font_b);
    fill_rounded_rect(&layer, MARGIN, bullet_y - 14.5, 2.0, 2.0, 1.0, ACCENT_PUR);
    set_color(&layer, TEXT_SEC);
    layer.use_text(
        "For each source: Category Summary + Ranked Stations + optional chart",
        8.0, Mm(MARGIN + 5.0), Mm(bullet_y - 14.5), &font_r,
    );

    draw_footer(&layer, &font_r, true);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_stat_card(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    label: &str,
    value: &str,
    accent: (f32, f32, f32),
    font_r: &IndirectFontRef,
    font_b: &IndirectFontRef,
) {
    fill_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL);
    stroke_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL_BORDER);

    // Thin accent top strip
    fill_rect(layer, x, y + h - 2.0, w, 2.0, accent);

    set_color(layer, accent);
    layer.use_text(value, 20.0, Mm(x + 5.0), Mm(y + h * 0.38), font_b);

    set_color(layer, TEXT_MUT);
    layer.use_text(label, 6.5, Mm(x + 5.0), Mm(y + 3.5), font_r);
}

// ── Category summary page ─────────────────────────────────────────────────────

struct RenderedRow {
    name: &'static str,
    bg: (f32, f32, f32),
    fg: (f32, f32, f32),
    desc_lines: Vec<String>,
    station_lines: Vec<String>,
    height: f32,
}

fn category_description(category: RiskCategory, scheme: ScoringScheme, config: &Config) -> String {
    if scheme == ScoringScheme::FixedPoint {
        let fp = &config.fixed_point;
        return match category {
            RiskCategory::High => format!("{} points or more across the fixed-point rules.", fp.high_from),
            RiskCategory::Medium => format!(
                "Moderate: {} to {} points; monitor at the next survey.",
                fp.moderate_from, fp.high_from
            ),
            RiskCategory::Low => format!("Fewer than {} points.", fp.moderate_from),
        };
    }
    match category {
        RiskCategory::High => "Four or more criteria met; prioritise for dig verification.",
        RiskCategory::Medium => "Two or three criteria met; monitor at the next survey.",
        RiskCategory::Low => "At most one criterion met.",
    }
    .to_string()
}

fn add_category_summary_page(
    doc: &PdfDocumentReference,
    a: &Assessment,
    config: &Config,
    source_label: Option<&str>,
) -> Result<()> {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Category Summary");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    let font_b = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_r = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_BLU, ACCENT_PUR, 21);

    let defs = [
        ("High",   RiskCategory::High,   HIGH_BG, HIGH_FG),
        ("Medium", RiskCategory::Medium, MED_BG,  MED_FG),
        ("Low",    RiskCategory::Low,    LOW_BG,  LOW_FG),
    ];

    let rows: Vec<RenderedRow> = defs.iter().map(|&(name, category, bg, fg)| {
        let stationings: Vec<String> = a.stations.iter()
            .filter(|s| s.risk_category == category)
            .map(|s| format!("{:.0}", s.record.stationing_m))
            .collect();
        let desc_lines = wrap_text(&category_description(category, a.scheme, config), DESC_WRAP);
        // Stationings first (capped to STATIONS_MAX_LINES), count line at the bottom
        let station_lines = {
            let mut lines = format_station_list(&stationings, STATIONS_WRAP);
            if lines.len() > STATIONS_MAX_LINES {
                let count_line = lines.last().cloned().unwrap_or_default();
                lines.truncate(STATIONS_MAX_LINES - 1);
                lines.push(count_line);
            }
            lines
        };
        let n = desc_lines.len().max(station_lines.len()).max(2) as f32;
        RenderedRow {
            name, bg, fg, desc_lines, station_lines,
            height: n * LINE_H + ROW_PAD * 2.0,
        }
    }).collect();

    const TABLE_TOP: f32 = 258.0;
    let total_h = HDR_H + rows.iter().map(|r| r.height).sum::<f32>();
    let table_bot = TABLE_TOP - total_h;
    let table_w = T_END - C1_X;

    // Page header
    set_color(&layer, TEXT_PRI);
    let heading = match source_label {
        Some(name) => format!("Category Summary — {}", name),
        None => "Category Summary".to_string(),
    };
    layer.use_text(truncate(&heading, 44), 20.0, Mm(MARGIN), Mm(278.5), &font_b);
    set_color(&layer, TEXT_SEC);
    let subtitle = if a.is_empty() {
        format!("0 stations with stationing ({} rows read)", a.normalization.rows_read)
    } else {
        format!(
            "{} stations, {} rows dropped, {} cells recovered",
            a.stations.len(),
            a.normalization.rows_dropped,
            a.normalization.total_recoveries()
        )
    };
    layer.use_text(subtitle, 9.0, Mm(MARGIN), Mm(271.5), &font_r);
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, 267.5, PANEL_BORDER);

    // Table panel background (white, rounded)
    fill_rounded_rect(&layer, C1_X, table_bot, table_w, total_h, R_PANEL, PANEL);
    stroke_rounded_rect(&layer, C1_X, table_bot, table_w, total_h, R_PANEL, PANEL_BORDER);

    set_color(&layer, TEXT_SEC);
    layer.use_text("CATEGORY",      7.0, Mm(C1_X + 4.0), Mm(TABLE_TOP - 6.2), &font_b);
    layer.use_text("WHAT IT MEANS", 7.0, Mm(C2_X + 2.0), Mm(TABLE_TOP - 6.2), &font_b);
    layer.use_text("STATIONINGS",   7.0, Mm(C3_X + 2.0), Mm(TABLE_TOP - 6.2), &font_b);
    draw_hline(&layer, C1_X + R_PANEL, T_END - R_PANEL, TABLE_TOP - HDR_H, PANEL_BORDER);

    let mut y_top = TABLE_TOP - HDR_H;

    for (i, row) in rows.iter().enumerate() {
        let y_bot = y_top - row.height;

        if i % 2 == 1 {
            fill_rect(&layer, C1_X, y_bot, table_w, row.height, PANEL_ALT);
        }

        let badge_x = C1_X + 3.0;
        let badge_y = y_top - ROW_PAD - BADGE_H;
        fill_rounded_rect(&layer, badge_x, badge_y, BADGE_W, BADGE_H, R_BADGE, row.bg);
        fill_rounded_rect(&layer,
            badge_x + 2.5, badge_y + (BADGE_H - DOT_SIZE) / 2.0,
            DOT_SIZE, DOT_SIZE, DOT_SIZE / 2.0, row.fg);

        set_color(&layer, row.fg);
        layer.use_text(row.name, 8.0, Mm(badge_x + 7.5), Mm(badge_y + 1.5), &font_b);

        set_color(&layer, TEXT_SEC);
        for (j, line) in row.desc_lines.iter().enumerate() {
            let ly = y_top - ROW_PAD - (j as f32 + 0.9) * LINE_H;
            layer.use_text(line.as_str(), 8.0, Mm(C2_X + 2.0), Mm(ly), &font_r);
        }

        let last_idx = row.station_lines.len().saturating_sub(1);
        for (j, line) in row.station_lines.iter().enumerate() {
            let ly = y_top - ROW_PAD - (j as f32 + 0.9) * LINE_H;
            if j == last_idx {
                set_color(&layer, TEXT_PRI);
                layer.use_text(line.as_str(), 9.0, Mm(C3_X + 2.0), Mm(ly), &font_b);
            } else {
                set_color(&layer, TEXT_MUT);
                layer.use_text(line.as_str(), 7.0, Mm(C3_X + 2.0), Mm(ly), &font_r);
            }
        }

        if i < rows.len() - 1 {
            draw_hline(&layer, C1_X + R_PANEL, T_END - R_PANEL, y_bot, PANEL_BORDER);
        }
        y_top = y_bot;
    }

    // Criteria panel under the category table
    let crit_top = table_bot - 12.0;
    set_color(&layer, TEXT_MUT);
    layer.use_text("RISK CRITERIA", 6.5, Mm(MARGIN), Mm(crit_top), &font_b);
    for (i, (flag, threshold)) in criteria_rows(&config.thresholds).iter().enumerate() {
        let ry = crit_top - 7.0 - i as f32 * 5.5;
        if i % 2 == 0 {
            fill_rect(&layer, MARGIN, ry - 1.5, T_END - MARGIN, 5.5, PANEL_ALT);
        }
        set_color(&layer, TEXT_PRI);
        layer.use_text(flag.label(), 8.0, Mm(MARGIN + 2.0), Mm(ry), &font_b);
        set_color(&layer, TEXT_SEC);
        layer.use_text(truncate(threshold, 30), 8.0, Mm(MARGIN + 30.0), Mm(ry), &font_r);
        layer.use_text(flag.description(), 8.0, Mm(MARGIN + 90.0), Mm(ry), &font_r);
    }

    draw_footer(&layer, &font_r, false);
    Ok(())
}

// ── Ranked station table pages ────────────────────────────────────────────────

fn add_ranked_pages(
    doc: &PdfDocumentReference,
    a: &Assessment,
    source_label: Option<&str>,
) -> Result<()> {
    let font_b = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_r = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    const BASE_ROW_H: f32 = 7.0;
    const EXTRA_LINE_H: f32 = 3.5;
    const HDR_Y: f32 = 268.5;
    const FIRST_Y: f32 = 259.5;
    const BOT_MARGIN: f32 = 25.0;
    const FLAGS_WRAP: usize = 32;

    //  RANK  STATIONING  SCORE  FLAGS     HOOP %  |PSP|   CATEGORY
    //  18…30 30…54       54…72  72…136    136…152 152…168 168…192  (mm)
    let col_x = [
        MARGIN, MARGIN + 12.0, MARGIN + 36.0, MARGIN + 54.0,
        MARGIN + 118.0, MARGIN + 134.0, MARGIN + 150.0,
    ];
    let headers = ["RANK", "STATIONING", "SCORE", "FLAGS", "HOOP %", "|PSP| V", "CATEGORY"];

    let heading = match source_label {
        Some(name) => format!("Ranked Stations — {}", name),
        None => "Ranked Stations".to_string(),
    };

    let new_page = |page_num: u32| -> (PdfPageIndex, PdfLayerIndex) {
        let (pi, li) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Ranked");
        let layer = doc.get_page(pi).get_layer(li);

        fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
        fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_BLU, ACCENT_PUR, 21);

        set_color(&layer, TEXT_PRI);
        layer.use_text(truncate(&heading, 46), 14.0, Mm(MARGIN), Mm(282.5), &font_b);
        set_color(&layer, TEXT_MUT);
        layer.use_text(
            format!("Page {}", page_num),
            8.0, Mm(PAGE_W - MARGIN - 14.0), Mm(283.0), &font_r,
        );
        draw_hline(&layer, MARGIN, PAGE_W - MARGIN, 277.5, PANEL_BORDER);

        fill_rounded_rect(&layer, MARGIN, HDR_Y - 7.5, PAGE_W - 2.0 * MARGIN, 9.5, R_BADGE, PANEL);
        stroke_rounded_rect(&layer, MARGIN, HDR_Y - 7.5, PAGE_W - 2.0 * MARGIN, 9.5, R_BADGE, PANEL_BORDER);
        set_color(&layer, TEXT_MUT);
        for (i, h) in headers.iter().enumerate() {
            layer.use_text(*h, 7.0, Mm(col_x[i] + 1.5), Mm(HDR_Y - 4.0), &font_b);
        }

        draw_footer(&layer, &font_r, false);
        (pi, li)
    };

    if a.ranked.is_empty() {
        let (pi, li) = new_page(1);
        let layer = doc.get_page(pi).get_layer(li);
        set_color(&layer, TEXT_SEC);
        let note = if a.is_empty() {
            "0 stations with stationing; nothing to rank."
        } else {
            "No high-risk stations to rank."
        };
        layer.use_text(note, 9.0, Mm(MARGIN + 1.5), Mm(FIRST_Y - 4.0), &font_r);
        return Ok(());
    }

    let mut cur_y = FIRST_Y;
    let mut page: Option<(PdfPageIndex, PdfLayerIndex)> = None;
    let mut page_num: u32 = 0;

    for (row_idx, s) in a.top().enumerate() {
        let flag_lines = wrap_text(&format!("{} · {}", s.flag_count, s.flags.summary()), FLAGS_WRAP);
        let row_h = BASE_ROW_H + flag_lines.len().saturating_sub(1) as f32 * EXTRA_LINE_H;

        let (pi, li) = match page {
            Some(current) if cur_y - row_h >= BOT_MARGIN => current,
            _ => {
                page_num += 1;
                cur_y = FIRST_Y;
                let fresh = new_page(page_num);
                page = Some(fresh);
                fresh
            }
        };
        let layer = doc.get_page(pi).get_layer(li);

        let (cat_fg, cat_bg) = category_colors(s.risk_category);

        if row_idx % 2 == 0 {
            fill_rect(&layer, MARGIN, cur_y - row_h + 1.5, PAGE_W - 2.0 * MARGIN, row_h, PANEL_ALT);
        }

        let text_y = cur_y - 4.0;
        let r = &s.record;

        set_color(&layer, TEXT_PRI);
        layer.use_text((row_idx + 1).to_string(), 8.0, Mm(col_x[0] + 1.5), Mm(text_y), &font_b);
        layer.use_text(format!("{:.1}", r.stationing_m), 8.0, Mm(col_x[1] + 1.5), Mm(text_y), &font_r);
        set_color(&layer, TEXT_SEC);
        layer.use_text(format_score(a.scheme, s.composite_score), 8.0, Mm(col_x[2] + 1.5), Mm(text_y), &font_r);
        for (j, line) in flag_lines.iter().enumerate() {
            let line_y = text_y - j as f32 * EXTRA_LINE_H;
            layer.use_text(line.as_str(), 8.0, Mm(col_x[3] + 1.5), Mm(line_y), &font_r);
        }
        layer.use_text(format!("{:.1}", r.hoop_stress_pct), 8.0, Mm(col_x[4] + 1.5), Mm(text_y), &font_r);
        layer.use_text(format!("{:.2}", r.off_psp_v), 8.0, Mm(col_x[5] + 1.5), Mm(text_y), &font_r);

        let badge_x = col_x[6] + 1.5;
        let badge_y = cur_y - row_h + 2.2;
        fill_rounded_rect(&layer, badge_x, badge_y, 20.0, 4.8, R_BADGE, cat_bg);
        set_color(&layer, cat_fg);
        layer.use_text(
            s.risk_category.to_string().to_uppercase(),
            7.0, Mm(badge_x + 3.0), Mm(badge_y + 1.1), &font_b,
        );

        draw_hline(&layer, MARGIN, T_END, cur_y - row_h + 1.5, PANEL_BORDER);

        cur_y -= row_h;
    }

    Ok(())
}

fn category_colors(category: RiskCategory) -> ((f32, f32, f32), (f32, f32, f32)) {
    match category {
        RiskCategory::High   => (HIGH_FG, HIGH_BG),
        RiskCategory::Medium => (MED_FG,  MED_BG),
        RiskCategory::Low    => (LOW_FG,  LOW_BG),
    }
}

// ── Chart page ────────────────────────────────────────────────────────────────

fn add_chart_page(
    doc: &PdfDocumentReference,
    series: &ChartSeries,
    source_label: Option<&str>,
) -> Result<()> {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Chart");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    let font_b = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_r = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_BLU, ACCENT_PUR, 21);

    set_color(&layer, TEXT_PRI);
    let heading = match source_label {
        Some(name) => format!("{} — {}", series.parameter.axis_label(), name),
        None => series.parameter.axis_label().to_string(),
    };
    layer.use_text(truncate(&heading, 44), 20.0, Mm(MARGIN), Mm(278.5), &font_b);
    set_color(&layer, TEXT_SEC);
    let lines: Vec<String> = series.reference_lines.iter().map(|v| v.to_string()).collect();
    layer.use_text(
        format!("Against stationing; dashed lines at {}", lines.join(", ")),
        9.0, Mm(MARGIN), Mm(271.5), &font_r,
    );
    draw_hline(&layer, MARGIN, PAGE_W - MARGIN, 267.5, PANEL_BORDER);

    let (px_w, px_h) = chart::DEFAULT_SIZE;
    let rgb = chart::render_rgb(series, (px_w, px_h))?;
    let buffer = image::RgbImage::from_raw(px_w, px_h, rgb)
        .context("Chart buffer does not match its dimensions")?;
    let image = Image::from_dynamic_image(&image::DynamicImage::ImageRgb8(buffer));

    let target_w = PAGE_W - 2.0 * MARGIN;
    let dpi = px_w as f32 * 25.4 / target_w;
    let target_h = px_h as f32 * 25.4 / dpi;
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(260.0 - target_h)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    stroke_rounded_rect(&layer, MARGIN, 260.0 - target_h, target_w, target_h, R_PANEL, PANEL_BORDER);

    draw_footer(&layer, &font_r, false);
    Ok(())
}

// ── Drawing helpers ───────────────────────────────────────────────────────────

fn draw_footer(layer: &PdfLayerReference, font_r: &IndirectFontRef, dated: bool) {
    draw_hline(layer, MARGIN, PAGE_W - MARGIN, 22.0, PANEL_BORDER);
    set_color(layer, TEXT_MUT);
    layer.use_text(
        format!("Generated by scc-risk v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(MARGIN), Mm(15.0), font_r,
    );
    if dated {
        layer.use_text(today(), 7.5, Mm(PAGE_W - MARGIN - 22.0), Mm(15.0), font_r);
    }
}

fn set_color(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
             (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![vec![
            (Point::new(Mm(x),     Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x),     Mm(y + h)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

/// Clockwise polygon ring approximating a rounded rectangle, 8 segments per corner.
fn rounded_rect_ring(x: f32, y: f32, w: f32, h: f32, r: f32) -> Vec<(Point, bool)> {
    let r = r.min(w / 2.0).min(h / 2.0);
    const SEGS: usize = 8;
    let mut pts = Vec::with_capacity(4 * (SEGS + 1));

    // (corner_cx, corner_cy, arc_start_deg, arc_end_deg)
    let corners = [
        (x + w - r, y + r,     270.0f32, 360.0f32), // bottom-right
        (x + w - r, y + h - r, 0.0f32,   90.0f32),  // top-right
        (x + r,     y + h - r, 90.0f32,  180.0f32), // top-left
        (x + r,     y + r,     180.0f32, 270.0f32), // bottom-left
    ];

    for (cx, cy, start, end) in &corners {
        for i in 0..=SEGS {
            let t = i as f32 / SEGS as f32;
            let angle = (start + (end - start) * t).to_radians();
            pts.push((
                Point::new(Mm(cx + r * angle.cos()), Mm(cy + r * angle.sin())),
                false,
            ));
        }
    }
    pts
}

fn fill_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                     r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

fn stroke_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                       r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.set_outline_thickness(0.4);
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Stroke,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

fn draw_hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32,
              (r, g, b): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.set_outline_thickness(0.3);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

/// Fill a left-to-right gradient rectangle using `steps` vertical strips.
#[allow(clippy::too_many_arguments)]
fn fill_gradient_h(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    from: (f32, f32, f32),
    to: (f32, f32, f32),
    steps: usize,
) {
    let step_w = w / steps as f32;
    for i in 0..steps {
        let t = i as f32 / (steps - 1).max(1) as f32;
        let color = (
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
            from.2 + (to.2 - from.2) * t,
        );
        // Overlap strips slightly to prevent rounding gaps
        fill_rect(layer, x + i as f32 * step_w, y, step_w + 0.6, h, color);
    }
}

// ── Text helpers ──────────────────────────────────────────────────────────────

fn truncate(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max {
        format!("{}…", chars[..max - 1].iter().collect::<String>())
    } else {
        s.to_string()
    }
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Stationings wrapped into lines, then "<N> station(s)" as the final line.
fn format_station_list(stationings: &[String], max_chars: usize) -> Vec<String> {
    if stationings.is_empty() {
        return vec!["—".to_string(), "0 stations".to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for s in stationings {
        let sep = if current.is_empty() { "" } else { ", " };
        let candidate = format!("{}{}", sep, s);
        if !current.is_empty() && current.len() + candidate.len() > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(s);
        } else {
            current.push_str(&candidate);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.push(format!(
        "{} station{}",
        stationings.len(),
        if stationings.len() == 1 { "" } else { "s" }
    ));
    lines
}

// ── Date helper ───────────────────────────────────────────────────────────────

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
