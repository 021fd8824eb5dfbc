//! Case-insensitive substring filters over the four searchable columns.

use itertools::Itertools;
use log::debug;

use crate::data::{Cell, Field, Table};

pub const SEARCHABLE_FIELDS: [Field; 4] =
    [Field::Country, Field::CustomsCode, Field::Item, Field::Year];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub country: Option<String>,
    pub customs_code: Option<String>,
    pub item: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug)]
struct Condition {
    field: Field,
    needle: String,
}

impl FilterCriteria {
    pub fn pattern(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Country => &self.country,
            Field::CustomsCode => &self.customs_code,
            Field::Item => &self.item,
            Field::Year => &self.year,
            Field::Import | Field::Export => return None,
        };
        slot.as_deref()
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
    }

    /// Sets or clears the pattern for `field`. Non-searchable fields are ignored.
    pub fn set(&mut self, field: Field, pattern: Option<String>) {
        let slot = match field {
            Field::Country => &mut self.country,
            Field::CustomsCode => &mut self.customs_code,
            Field::Item => &mut self.item,
            Field::Year => &mut self.year,
            Field::Import | Field::Export => return,
        };
        *slot = pattern;
    }

    pub fn is_empty(&self) -> bool {
        SEARCHABLE_FIELDS
            .iter()
            .all(|field| self.pattern(*field).is_none())
    }

    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "no filters".to_string();
        }
        SEARCHABLE_FIELDS
            .iter()
            .filter_map(|field| {
                self.pattern(*field)
                    .map(|pattern| format!("{field} contains '{pattern}'"))
            })
            .join(", ")
    }

    fn conditions(&self) -> Vec<Condition> {
        SEARCHABLE_FIELDS
            .iter()
            .filter_map(|field| {
                self.pattern(*field).map(|pattern| Condition {
                    field: *field,
                    needle: pattern.to_lowercase(),
                })
            })
            .collect()
    }
}

/// Keeps the records that satisfy every non-empty criterion, in input order.
/// The result never shares storage with `table`.
pub fn filter_table(table: &Table, criteria: &FilterCriteria) -> Table {
    let conditions = criteria.conditions();
    if conditions.is_empty() {
        return table.clone();
    }

    let mut resolved = Vec::with_capacity(conditions.len());
    for condition in &conditions {
        let Some(index) = table.field_index(condition.field) else {
            debug!(
                "Column '{}' for the {} filter is not present; no rows match",
                table.columns().name(condition.field),
                condition.field
            );
            return table.with_records(Vec::new());
        };
        resolved.push((index, condition.needle.as_str()));
    }

    let records = table
        .records()
        .iter()
        .filter(|record| {
            resolved.iter().all(|(index, needle)| {
                record
                    .get(*index)
                    .is_some_and(|cell| contains_ignore_case(cell, needle))
            })
        })
        .cloned()
        .collect();
    table.with_records(records)
}

fn contains_ignore_case(cell: &Cell, lowered_needle: &str) -> bool {
    cell.as_text().to_lowercase().contains(lowered_needle)
}
