//! In-memory trade table built from raw spreadsheet rows.
//!
//! A [`Table`] keeps the source header order verbatim. Six well-known columns
//! are bound to a [`Field`] through a [`ColumnMap`]; the three numeric ones
//! (year, import, export) are coerced into [`Cell::Number`] when the table is
//! built, every other column is carried as opaque [`Cell::Text`].

use std::{borrow::Cow, fmt};

use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Country,
    CustomsCode,
    Item,
    Year,
    Import,
    Export,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Country,
        Field::CustomsCode,
        Field::Item,
        Field::Year,
        Field::Import,
        Field::Export,
    ];

    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Year | Field::Import | Field::Export)
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Country => "country",
            Field::CustomsCode => "customs code",
            Field::Item => "item",
            Field::Year => "year",
            Field::Import => "import",
            Field::Export => "export",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header names bound to each known [`Field`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub country: String,
    pub customs_code: String,
    pub item: String,
    pub year: String,
    pub import: String,
    pub export: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            country: "ชื่อประเทศ".to_string(),
            customs_code: "พิกัดศุลกากร".to_string(),
            item: "รายการสินค้า".to_string(),
            year: "ปี พ.ศ.".to_string(),
            import: "นำเข้า".to_string(),
            export: "ส่งออก".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn name(&self, field: Field) -> &str {
        match field {
            Field::Country => &self.country,
            Field::CustomsCode => &self.customs_code,
            Field::Item => &self.item,
            Field::Year => &self.year,
            Field::Import => &self.import,
            Field::Export => &self.export,
        }
    }

    pub fn field_for(&self, header: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| self.name(*field) == header)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(text) => Cow::Borrowed(text.as_str()),
            Cell::Number(value) => Cow::Owned(format_number(*value)),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Parses `raw` as a finite number; anything else (blank, text, NaN,
/// infinities) becomes `0.0`.
pub fn coerce_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Renders whole numbers without a fractional part so a year reads `2564`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    cells: Vec<Cell>,
}

impl TradeRecord {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn number_at(&self, index: usize) -> f64 {
        self.cells
            .get(index)
            .and_then(Cell::as_number)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    columns: ColumnMap,
    records: Vec<TradeRecord>,
}

impl Table {
    /// A table with no columns and no rows, used when no data is available.
    pub fn empty(columns: &ColumnMap) -> Self {
        Self {
            headers: Vec::new(),
            columns: columns.clone(),
            records: Vec::new(),
        }
    }

    /// Builds a table from raw rows where row 0 holds the column names.
    pub fn from_rows(rows: Vec<Vec<String>>, columns: &ColumnMap) -> Self {
        let mut rows = rows.into_iter();
        let Some(headers) = rows.next() else {
            return Self::empty(columns);
        };
        let numeric = headers
            .iter()
            .map(|header| columns.field_for(header).is_some_and(Field::is_numeric))
            .collect::<Vec<_>>();

        let mut records = Vec::new();
        for (row_idx, mut raw) in rows.enumerate() {
            if raw.len() > headers.len() {
                warn!(
                    "Row {} has {} cell(s) but the header has {}; extra cells dropped",
                    row_idx + 2,
                    raw.len(),
                    headers.len()
                );
                raw.truncate(headers.len());
            }
            raw.resize(headers.len(), String::new());
            let cells = raw
                .into_iter()
                .zip(&numeric)
                .map(|(value, is_numeric)| {
                    if *is_numeric {
                        Cell::Number(coerce_number(&value))
                    } else {
                        Cell::Text(value)
                    }
                })
                .collect();
            records.push(TradeRecord { cells });
        }

        Self {
            headers,
            columns: columns.clone(),
            records,
        }
    }

    /// A table sharing this table's schema but holding `records`.
    pub fn with_records(&self, records: Vec<TradeRecord>) -> Self {
        Self {
            headers: self.headers.clone(),
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when the table carries no schema at all, meaning nothing was loaded.
    pub fn has_no_columns(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn field_index(&self, field: Field) -> Option<usize> {
        self.column_index(self.columns.name(field))
    }

    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|record| {
                record
                    .cells()
                    .iter()
                    .map(|cell| cell.as_text().into_owned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn english_columns() -> ColumnMap {
        ColumnMap {
            country: "country".to_string(),
            customs_code: "hs_code".to_string(),
            item: "item".to_string(),
            year: "year".to_string(),
            import: "import".to_string(),
            export: "export".to_string(),
        }
    }

    #[test]
    fn coerce_number_accepts_decimals_and_whitespace() {
        assert_eq!(coerce_number("12.5"), 12.5);
        assert_eq!(coerce_number("  42 "), 42.0);
        assert_eq!(coerce_number("-3"), -3.0);
        assert_eq!(coerce_number("\t2564\n"), 2564.0);
    }

    #[test]
    fn coerce_number_maps_garbage_to_zero() {
        for raw in ["", "   ", "abc", "1,000", "12abc", "NaN", "inf", "-"] {
            assert_eq!(coerce_number(raw), 0.0, "input {raw:?}");
        }
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(2564.0), "2564");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn from_rows_coerces_numeric_columns_only() {
        let rows = vec![
            row(&["country", "year", "import", "export", "note"]),
            row(&["Japan", "2564", "10.5", "n/a", "42"]),
        ];
        let table = Table::from_rows(rows, &english_columns());

        assert_eq!(table.len(), 1);
        let record = &table.records()[0];
        assert_eq!(record.get(0), Some(&Cell::Text("Japan".to_string())));
        assert_eq!(record.get(1), Some(&Cell::Number(2564.0)));
        assert_eq!(record.get(2), Some(&Cell::Number(10.5)));
        assert_eq!(record.get(3), Some(&Cell::Number(0.0)));
        assert_eq!(record.get(4), Some(&Cell::Text("42".to_string())));
    }

    #[test]
    fn from_rows_pads_short_rows_and_trims_long_ones() {
        let rows = vec![
            row(&["country", "import", "export"]),
            row(&["Laos"]),
            row(&["Chile", "1", "2", "surplus"]),
        ];
        let table = Table::from_rows(rows, &english_columns());

        assert!(table.records().iter().all(|r| r.cells().len() == 3));
        assert_eq!(table.records()[0].number_at(1), 0.0);
        assert_eq!(table.records()[0].get(0).map(|c| c.as_text()), Some("Laos".into()));
        assert_eq!(table.records()[1].number_at(2), 2.0);
    }

    #[test]
    fn from_rows_without_any_row_is_empty() {
        let table = Table::from_rows(Vec::new(), &english_columns());
        assert!(table.is_empty());
        assert!(table.has_no_columns());
    }

    #[test]
    fn default_column_map_resolves_thai_headers() {
        let columns = ColumnMap::default();
        assert_eq!(columns.field_for("นำเข้า"), Some(Field::Import));
        assert_eq!(columns.field_for("ปี พ.ศ."), Some(Field::Year));
        assert_eq!(columns.field_for("หมายเหตุ"), None);
    }
}
