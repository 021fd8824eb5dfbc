//! Text and JSON presentation of analysis reports, and the `view` command.

use std::io::{self, Write};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{OutputFormat, ViewArgs},
    diagnostic::{self, Diagnostic},
    filter::{FilterCriteria, filter_table},
    loader::LoadOutcome,
    table::{Align, render_table_aligned},
    view::{AnalysisView, PanelBody, Report, build_report},
};

const BAR_WIDTH: usize = 30;

pub fn execute(args: &ViewArgs) -> Result<()> {
    let config = crate::resolve_config(&args.source)?;
    let top = args.top.unwrap_or(config.top);
    let loader = crate::build_loader(&config)?;
    let outcome = loader.load();
    let criteria = FilterCriteria::from(&args.filters);
    let report = assemble(&outcome, &criteria, args.analysis, top);
    diagnostic::emit_all(&report.diagnostics);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Table => write_text(&mut out, &report).context("Writing report")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report).context("Serializing report")?;
            writeln!(out).context("Writing report")?;
        }
    }
    info!(
        "Rendered {} panel(s) for the {} view over {} row(s)",
        report.panels.len(),
        args.analysis,
        report.row_count
    );
    Ok(())
}

/// One render cycle: filter the loaded table, build the view, and carry the
/// load diagnostics ahead of the report's own.
pub fn assemble(
    outcome: &LoadOutcome,
    criteria: &FilterCriteria,
    view: AnalysisView,
    top: usize,
) -> Report {
    let mut report = if outcome.table.has_no_columns() {
        let mut report = build_report(&outcome.table, view, top);
        report.diagnostics = vec![Diagnostic::info(
            "No data available; check the source configuration.",
        )];
        report
    } else {
        let filtered = filter_table(&outcome.table, criteria);
        build_report(&filtered, view, top)
    };
    let mut diagnostics = outcome.diagnostics.clone();
    diagnostics.append(&mut report.diagnostics);
    report.diagnostics = diagnostics;
    report
        .with_filters(criteria.describe())
        .with_fetched_at(outcome.fetched_at)
}

pub fn write_text<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "{}", report.title)?;
    let mut summary = format!("Filters: {} | Rows: {}", report.filters, report.row_count);
    if let Some(fetched_at) = report.fetched_at {
        summary.push_str(&format!(
            " | Data as of {}",
            fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    writeln!(out, "{summary}")?;

    for panel in &report.panels {
        writeln!(out)?;
        writeln!(out, "{}", panel.title)?;
        if panel.body.is_empty() {
            writeln!(out, "(no data)")?;
            continue;
        }
        let (headers, rows, align) = panel_table(&panel.group, &panel.body);
        write!(out, "{}", render_table_aligned(&headers, &rows, &align))?;
    }
    Ok(())
}

fn panel_table(group: &str, body: &PanelBody) -> (Vec<String>, Vec<Vec<String>>, Vec<Align>) {
    match body {
        PanelBody::Ranking { metric, rows } => {
            let max = rows.iter().map(|r| r.value.abs()).fold(0.0, f64::max);
            let headers = vec![
                group.to_string(),
                metric.field().label().to_string(),
                String::new(),
            ];
            let rows = rows
                .iter()
                .map(|r| vec![r.key.clone(), format_amount(r.value), bar(r.value, max, '#')])
                .collect();
            (headers, rows, vec![Align::Left, Align::Right, Align::Left])
        }
        PanelBody::Balance { rows } => {
            let max = rows.iter().map(|r| r.balance.abs()).fold(0.0, f64::max);
            let headers = ["", "import", "export", "balance", ""]
                .iter()
                .enumerate()
                .map(|(idx, h)| if idx == 0 { group.to_string() } else { h.to_string() })
                .collect();
            let rows = rows
                .iter()
                .map(|r| {
                    let marker = if r.balance < 0.0 { '-' } else { '+' };
                    vec![
                        r.key.clone(),
                        format_amount(r.import),
                        format_amount(r.export),
                        format_amount(r.balance),
                        bar(r.balance, max, marker),
                    ]
                })
                .collect();
            (
                headers,
                rows,
                vec![Align::Left, Align::Right, Align::Right, Align::Right, Align::Left],
            )
        }
        PanelBody::Trend { rows } => {
            let headers = vec![group.to_string(), "import".to_string(), "export".to_string()];
            let rows = rows
                .iter()
                .map(|r| vec![r.key.clone(), format_amount(r.import), format_amount(r.export)])
                .collect();
            (headers, rows, vec![Align::Left, Align::Right, Align::Right])
        }
    }
}

fn bar(value: f64, max: f64, marker: char) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value.abs() / max) * BAR_WIDTH as f64).round() as usize;
    std::iter::repeat_n(marker, len).collect()
}

/// Two decimals with thousands separators; whole amounts drop the decimals.
pub fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    if frac == "00" {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{ColumnMap, Table},
        diagnostic::Level,
        loader::LoadOrigin,
    };
    use std::sync::Arc;

    fn outcome(rows: &[&[&str]]) -> LoadOutcome {
        let raw = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        LoadOutcome {
            table: Arc::new(Table::from_rows(raw, &ColumnMap::default())),
            origin: LoadOrigin::Fetched,
            fetched_at: None,
            diagnostics: vec![Diagnostic::info("Loaded")],
        }
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(1234567.0), "1,234,567");
        assert_eq!(format_amount(-1234.5), "-1,234.50");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(-0.001), "0");
    }

    #[test]
    fn bar_scales_to_the_largest_value() {
        assert_eq!(bar(10.0, 10.0, '#').len(), BAR_WIDTH);
        assert_eq!(bar(5.0, 10.0, '#').len(), BAR_WIDTH / 2);
        assert_eq!(bar(1.0, 0.0, '#'), "");
    }

    #[test]
    fn assemble_filters_before_aggregating() {
        let outcome = outcome(&[
            &["ชื่อประเทศ", "ปี พ.ศ.", "นำเข้า", "ส่งออก"],
            &["Japan", "2564", "10", "5"],
            &["China", "2565", "7", "7"],
        ]);
        let criteria = FilterCriteria {
            country: Some("JAP".to_string()),
            ..FilterCriteria::default()
        };

        let report = assemble(&outcome, &criteria, AnalysisView::Counterparties, 10);

        assert_eq!(report.row_count, 1);
        assert_eq!(report.diagnostics[0].message, "Loaded");
        let PanelBody::Balance { rows } = &report.panels[2].body else {
            panic!("expected balance panel");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].balance, -5.0);
    }

    #[test]
    fn assemble_without_data_reports_unavailable() {
        let outcome = outcome(&[]);
        let report = assemble(&outcome, &FilterCriteria::default(), AnalysisView::Overview, 10);
        assert!(report.panels.is_empty());
        assert_eq!(report.diagnostics.last().map(|d| d.level), Some(Level::Info));
        assert!(report.diagnostics.iter().any(|d| d.message.contains("No data available")));
    }

    #[test]
    fn text_output_lists_panels() {
        let outcome = outcome(&[
            &["ชื่อประเทศ", "ปี พ.ศ.", "นำเข้า", "ส่งออก"],
            &["Japan", "2564", "1500", "5"],
        ]);
        let report = assemble(&outcome, &FilterCriteria::default(), AnalysisView::Overview, 10);
        let mut buffer = Vec::new();
        write_text(&mut buffer, &report).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.starts_with("Trade overview\nFilters: no filters | Rows: 1"));
        assert!(text.contains("Top 10 trading partners by import"));
        assert!(text.contains("1,500"));
        assert!(text.contains("Yearly import and export trend"));
    }
}
