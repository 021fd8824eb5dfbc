//! Analysis views: which rankings and trends each dashboard page shows.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::{
    aggregate::{self, BalanceRow, GroupTotals, Metric, RankedGroup, SchemaMismatch},
    data::{Field, Table},
    diagnostic::Diagnostic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisView {
    #[default]
    Overview,
    Items,
    Counterparties,
    CustomsCodes,
}

impl AnalysisView {
    pub fn title(self) -> &'static str {
        match self {
            AnalysisView::Overview => "Trade overview",
            AnalysisView::Items => "Item analysis",
            AnalysisView::Counterparties => "Trading partner analysis",
            AnalysisView::CustomsCodes => "Customs code analysis",
        }
    }

    /// Column the view's rankings are grouped by.
    pub fn group_field(self) -> Field {
        match self {
            AnalysisView::Overview | AnalysisView::Counterparties => Field::Country,
            AnalysisView::Items => Field::Item,
            AnalysisView::CustomsCodes => Field::CustomsCode,
        }
    }

    fn subject(self) -> &'static str {
        match self {
            AnalysisView::Overview | AnalysisView::Counterparties => "trading partners",
            AnalysisView::Items => "items",
            AnalysisView::CustomsCodes => "customs codes",
        }
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => f.write_str(self.title()),
        }
    }
}

impl FromStr for AnalysisView {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <AnalysisView as ValueEnum>::from_str(value.trim(), true).map_err(|_| {
            let names = AnalysisView::value_variants()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            format!("unknown view '{value}' (expected one of: {})", names.join(", "))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelBody {
    Ranking {
        metric: Metric,
        rows: Vec<RankedGroup>,
    },
    Balance {
        rows: Vec<BalanceRow>,
    },
    Trend {
        rows: Vec<GroupTotals>,
    },
}

impl PanelBody {
    pub fn is_empty(&self) -> bool {
        match self {
            PanelBody::Ranking { rows, .. } => rows.is_empty(),
            PanelBody::Balance { rows } => rows.is_empty(),
            PanelBody::Trend { rows } => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    /// Header of the grouped column, as named in the source sheet.
    pub group: String,
    #[serde(flatten)]
    pub body: PanelBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub view: AnalysisView,
    pub title: String,
    pub filters: String,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    pub panels: Vec<Panel>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn with_fetched_at(mut self, fetched_at: Option<DateTime<Utc>>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    pub fn with_filters(mut self, description: impl Into<String>) -> Self {
        self.filters = description.into();
        self
    }
}

/// Computes every panel of `view` over an already filtered table. A missing
/// column yields an empty panel and a warning rather than an error.
pub fn build_report(table: &Table, view: AnalysisView, top: usize) -> Report {
    let mut report = Report {
        view,
        title: view.title().to_string(),
        filters: String::new(),
        row_count: table.len(),
        fetched_at: None,
        panels: Vec::new(),
        diagnostics: Vec::new(),
    };
    if table.is_empty() {
        report.diagnostics.push(Diagnostic::info(
            "No rows match the selected filters; try different criteria.",
        ));
        return report;
    }

    let group_field = view.group_field();
    let group = table.columns().name(group_field).to_string();
    let subject = view.subject();

    for metric in [Metric::Import, Metric::Export] {
        let title = format!("Top {top} {subject} by {}", metric.field());
        let body = aggregate::top_n(table, &group, metric, top)
            .map(|rows| PanelBody::Ranking { metric, rows });
        push_panel(&mut report, title, &group, body, || PanelBody::Ranking {
            metric,
            rows: Vec::new(),
        });
    }

    if view == AnalysisView::Overview {
        let year = table.columns().name(Field::Year).to_string();
        let body = aggregate::yearly_trend(table).map(|rows| PanelBody::Trend { rows });
        push_panel(
            &mut report,
            "Yearly import and export trend".to_string(),
            &year,
            body,
            || PanelBody::Trend { rows: Vec::new() },
        );
    } else {
        let title = format!("Top {top} {subject} by trade balance");
        let body = aggregate::top_balance(table, &group, top).map(|rows| PanelBody::Balance { rows });
        push_panel(&mut report, title, &group, body, || PanelBody::Balance {
            rows: Vec::new(),
        });
    }

    report
}

fn push_panel(
    report: &mut Report,
    title: String,
    group: &str,
    body: Result<PanelBody, SchemaMismatch>,
    empty: impl FnOnce() -> PanelBody,
) {
    let body = match body {
        Ok(body) => body,
        Err(err) => {
            report
                .diagnostics
                .push(Diagnostic::warning(format!("{title}: {err}")));
            empty()
        }
    };
    report.panels.push(Panel {
        title,
        group: group.to_string(),
        body,
    });
}
