//! Group-by-sum and top-N rankings over a [`Table`].
//!
//! Groups are keyed by the display text of the group column and kept in
//! first-appearance order. Rankings use a stable sort, so groups with equal
//! totals stay in the order they were first seen.

use std::collections::HashMap;

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::data::{Field, Table, TradeRecord, coerce_number};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("column '{column}' not found in the data")]
pub struct SchemaMismatch {
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Import,
    Export,
}

impl Metric {
    pub fn field(self) -> Field {
        match self {
            Metric::Import => Field::Import,
            Metric::Export => Field::Export,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotals {
    pub key: String,
    pub import: f64,
    pub export: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRow {
    pub key: String,
    pub import: f64,
    pub export: f64,
    /// `export - import`; positive is a surplus.
    pub balance: f64,
}

fn require_column(table: &Table, column: &str) -> Result<usize, SchemaMismatch> {
    table.column_index(column).ok_or_else(|| SchemaMismatch {
        column: column.to_string(),
    })
}

fn accumulate<T: Default>(
    table: &Table,
    group_index: usize,
    mut add: impl FnMut(&mut T, &TradeRecord),
) -> Vec<(String, T)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, T)> = Vec::new();
    for record in table.records() {
        let key = record
            .get(group_index)
            .map(|cell| cell.as_text().into_owned())
            .unwrap_or_default();
        let position = match positions.get(&key) {
            Some(position) => *position,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, T::default()));
                groups.len() - 1
            }
        };
        add(&mut groups[position].1, record);
    }
    groups
}

/// Import and export totals for every distinct value of `group_column`.
/// A missing import or export column contributes zero.
pub fn group_sum(table: &Table, group_column: &str) -> Result<Vec<GroupTotals>, SchemaMismatch> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let group_index = require_column(table, group_column)?;
    let import_index = table.field_index(Field::Import);
    let export_index = table.field_index(Field::Export);
    let sums = accumulate(table, group_index, |(import, export): &mut (f64, f64), record| {
        if let Some(idx) = import_index {
            *import += record.number_at(idx);
        }
        if let Some(idx) = export_index {
            *export += record.number_at(idx);
        }
    });
    Ok(sums
        .into_iter()
        .map(|(key, (import, export))| GroupTotals {
            key,
            import,
            export,
        })
        .collect())
}

/// The `n` groups with the largest `metric` total, descending.
pub fn top_n(
    table: &Table,
    group_column: &str,
    metric: Metric,
    n: usize,
) -> Result<Vec<RankedGroup>, SchemaMismatch> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let group_index = require_column(table, group_column)?;
    let metric_index = require_column(table, table.columns().name(metric.field()))?;
    let mut ranked = accumulate(table, group_index, |sum: &mut f64, record| {
        *sum += record.number_at(metric_index);
    })
    .into_iter()
    .map(|(key, value)| RankedGroup { key, value })
    .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked.truncate(n);
    Ok(ranked)
}

/// The `n` groups with the largest absolute trade balance. The sign of
/// `balance` is kept so surplus and deficit stay distinguishable.
pub fn top_balance(
    table: &Table,
    group_column: &str,
    n: usize,
) -> Result<Vec<BalanceRow>, SchemaMismatch> {
    let mut rows = group_sum(table, group_column)?
        .into_iter()
        .map(|totals| {
            // inf - inf is NaN; a non-finite balance counts as zero.
            let balance = totals.export - totals.import;
            BalanceRow {
                balance: if balance.is_finite() { balance } else { 0.0 },
                key: totals.key,
                import: totals.import,
                export: totals.export,
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.balance.abs().total_cmp(&a.balance.abs()));
    rows.truncate(n);
    Ok(rows)
}

/// Import and export totals per fiscal year, oldest year first.
pub fn yearly_trend(table: &Table) -> Result<Vec<GroupTotals>, SchemaMismatch> {
    let year_column = table.columns().name(Field::Year).to_string();
    let mut totals = group_sum(table, &year_column)?;
    totals.sort_by(|a, b| coerce_number(&a.key).total_cmp(&coerce_number(&b.key)));
    Ok(totals)
}
