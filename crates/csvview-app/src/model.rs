// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use time::OffsetDateTime;

use crate::ids::*;

/// Row identity column; also the category axis of every bar chart.
pub const NAME_COLUMN: &str = "Name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub const ZERO: Self = Self::Number(0.0);

    /// Numeric reading of the cell: numbers as-is, numeric text parsed, anything else `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

/// One dataset row. Cells keep the order the provider delivered them in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    cells: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Display text of the `Name` cell, empty when the row has none.
    pub fn name(&self) -> String {
        self.get(NAME_COLUMN)
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Builds a dataset whose column order is the key order of the first record.
    pub fn from_records(rows: Vec<Record>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().map(str::to_owned).collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Every row's Name in dataset order, duplicates included.
    pub fn names(&self) -> Vec<String> {
        self.rows.iter().map(Record::name).collect()
    }

    /// Row Names with duplicates collapsed, first occurrence wins the position.
    pub fn unique_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .map(Record::name)
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Columns a chart can plot: everything except `Name`.
    pub fn value_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.as_str() != NAME_COLUMN)
            .cloned()
            .collect()
    }

    /// Column a freshly created chart starts on: the second dataset column, or empty.
    /// When `Name` sits second, the first plottable column stands in for it.
    pub fn default_chart_column(&self) -> String {
        match self.columns.get(1) {
            None => String::new(),
            Some(column) if column.as_str() != NAME_COLUMN => column.clone(),
            Some(_) => self.value_columns().into_iter().next().unwrap_or_default(),
        }
    }

    pub fn resolve_column(&self, wanted: &str) -> Option<&str> {
        let wanted = wanted.to_lowercase();
        self.columns
            .iter()
            .find(|column| column.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Table,
    Bar,
    Pie,
    Line,
    Histogram,
    Scatter,
    Box,
}

impl ChartKind {
    pub const ALL: [Self; 7] = [
        Self::Table,
        Self::Bar,
        Self::Pie,
        Self::Line,
        Self::Histogram,
        Self::Scatter,
        Self::Box,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Bar => "Bar Chart",
            Self::Pie => "Pie Chart",
            Self::Line => "Line Graph",
            Self::Histogram => "Histogram",
            Self::Scatter => "Scatter Chart",
            Self::Box => "Box Chart",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Table" => Some(Self::Table),
            "Bar Chart" => Some(Self::Bar),
            "Pie Chart" => Some(Self::Pie),
            "Line Graph" => Some(Self::Line),
            "Histogram" => Some(Self::Histogram),
            "Scatter Chart" => Some(Self::Scatter),
            "Box Chart" => Some(Self::Box),
            _ => None,
        }
    }

    pub const fn view(self) -> PlotView {
        match self {
            Self::Table => PlotView::Table,
            Self::Bar => PlotView::Bar,
            other => PlotView::Unsupported(other),
        }
    }

    pub fn rotate(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

/// What the plots screen renders for a chart kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotView {
    Table,
    Bar,
    Unsupported(ChartKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: UploadId,
    pub file_id: FileId,
    pub file_name: String,
    pub author: String,
    pub description: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::{CellValue, ChartKind, Dataset, NAME_COLUMN, PlotView, Record};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("A")),
                ("Revenue", CellValue::from(10.0)),
            ]),
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("B")),
                ("Revenue", CellValue::from(20.0)),
            ]),
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("A")),
                ("Revenue", CellValue::from(30.0)),
            ]),
        ])
    }

    #[test]
    fn columns_follow_first_record_key_order() {
        let data = dataset();
        assert_eq!(data.columns(), ["Name".to_owned(), "Revenue".to_owned()]);
        assert_eq!(data.default_chart_column(), "Revenue");
        assert_eq!(data.value_columns(), vec!["Revenue".to_owned()]);
    }

    #[test]
    fn default_chart_column_is_empty_for_single_column_dataset() {
        let data = Dataset::from_records(vec![Record::from_pairs([(NAME_COLUMN, "A")])]);
        assert_eq!(data.default_chart_column(), "");
        assert_eq!(Dataset::default().default_chart_column(), "");
    }

    #[test]
    fn default_chart_column_never_lands_on_name() {
        let data = Dataset::new(
            vec!["Revenue".to_owned(), NAME_COLUMN.to_owned(), "Cost".to_owned()],
            Vec::new(),
        );
        assert_eq!(data.default_chart_column(), "Revenue");
        assert_eq!(
            data.value_columns(),
            vec!["Revenue".to_owned(), "Cost".to_owned()]
        );
    }

    #[test]
    fn unique_names_collapse_duplicates_in_first_seen_order() {
        let data = dataset();
        assert_eq!(data.names(), vec!["A", "B", "A"]);
        assert_eq!(data.unique_names(), vec!["A", "B"]);
    }

    #[test]
    fn resolve_column_ignores_case() {
        let data = dataset();
        assert_eq!(data.resolve_column("revenue"), Some("Revenue"));
        assert_eq!(data.resolve_column("REVENUE"), Some("Revenue"));
        assert_eq!(data.resolve_column("cost"), None);
    }

    #[test]
    fn record_insert_replaces_existing_key_in_place() {
        let mut record = Record::from_pairs([("Name", "A"), ("Cost", "1")]);
        record.insert("Name", "B");
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Name", "Cost"]);
        assert_eq!(record.name(), "B");
    }

    #[test]
    fn cell_value_display_drops_integral_fraction() {
        assert_eq!(CellValue::from(42.0).to_string(), "42");
        assert_eq!(CellValue::from(2.5).to_string(), "2.5");
        assert_eq!(CellValue::from("x").to_string(), "x");
        assert_eq!(CellValue::from(" 7.5 ").as_f64(), Some(7.5));
        assert_eq!(CellValue::from("n/a").as_f64(), None);
    }

    #[test]
    fn chart_kind_labels_round_trip_and_route() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChartKind::Table.view(), PlotView::Table);
        assert_eq!(ChartKind::Bar.view(), PlotView::Bar);
        assert_eq!(
            ChartKind::Line.view(),
            PlotView::Unsupported(ChartKind::Line)
        );
        assert_eq!(ChartKind::parse("Donut"), None);
    }

    #[test]
    fn chart_kind_rotation_wraps() {
        assert_eq!(ChartKind::Box.rotate(1), ChartKind::Table);
        assert_eq!(ChartKind::Table.rotate(-1), ChartKind::Box);
        assert_eq!(ChartKind::Table.rotate(1), ChartKind::Bar);
    }
}
