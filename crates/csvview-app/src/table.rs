// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{Dataset, Record};

/// Next selection after the user picks `clicked` in a dropdown.
pub fn apply_selection(current: &[String], clicked: &str, multi: bool) -> Vec<String> {
    if !multi {
        return vec![clicked.to_owned()];
    }
    if current.iter().any(|item| item == clicked) {
        current
            .iter()
            .filter(|item| item.as_str() != clicked)
            .cloned()
            .collect()
    } else {
        let mut next = current.to_vec();
        next.push(clicked.to_owned());
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDropdown {
    Columns,
    Rows,
}

/// Column and row filters of the table view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableFilter {
    pub selected_columns: Vec<String>,
    pub selected_rows: Vec<String>,
    pub open: Option<TableDropdown>,
}

impl TableFilter {
    pub fn columns_to_show<'a>(&'a self, dataset: &'a Dataset) -> &'a [String] {
        if self.selected_columns.is_empty() {
            dataset.columns()
        } else {
            &self.selected_columns
        }
    }

    pub fn rows_to_show<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Record> {
        dataset
            .rows()
            .iter()
            .filter(|row| {
                self.selected_rows.is_empty() || self.selected_rows.contains(&row.name())
            })
            .collect()
    }

    pub fn row_candidates(dataset: &Dataset) -> Vec<String> {
        dataset.unique_names()
    }

    pub fn toggle_column(&mut self, column: &str) {
        self.selected_columns = apply_selection(&self.selected_columns, column, true);
    }

    pub fn toggle_row(&mut self, name: &str) {
        self.selected_rows = apply_selection(&self.selected_rows, name, true);
    }

    pub fn clear(&mut self) {
        self.selected_columns.clear();
        self.selected_rows.clear();
    }

    pub fn is_filtered(&self) -> bool {
        !self.selected_columns.is_empty() || !self.selected_rows.is_empty()
    }
}

/// Display text for a table cell; a missing cell renders empty.
pub fn table_cell_text(row: &Record, column: &str) -> String {
    row.get(column).map(ToString::to_string).unwrap_or_default()
}
