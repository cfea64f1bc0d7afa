// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::charts::ChartConfig;
use crate::model::{CellValue, Dataset, NAME_COLUMN};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionPoint {
    pub name: String,
    pub value: CellValue,
}

impl ProjectionPoint {
    /// Bar height: numeric value of the cell, 0 for anything non-numeric.
    pub fn magnitude(&self) -> f64 {
        self.value.as_f64().filter(|value| value.is_finite()).unwrap_or(0.0)
    }
}

/// Filtered, column-selected rows for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub category_key: &'static str,
    pub value_key: String,
    /// Dataset column the value key matched; `None` renders as all zeros.
    pub column_resolved: Option<String>,
    pub points: Vec<ProjectionPoint>,
}

impl Projection {
    pub fn is_column_available(&self) -> bool {
        self.column_resolved.is_some()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.points
            .iter()
            .map(ProjectionPoint::magnitude)
            .fold(0.0, f64::max)
    }
}

pub fn compute_projection(config: &ChartConfig, dataset: &Dataset) -> Projection {
    let resolved = dataset.resolve_column(&config.selected_column);
    let filter: Option<BTreeSet<&str>> = if config.selected_items.is_empty() {
        None
    } else {
        Some(config.selected_items.iter().map(String::as_str).collect())
    };

    let points = dataset
        .rows()
        .iter()
        .filter_map(|row| {
            let name = row.name();
            if let Some(filter) = &filter
                && !filter.contains(name.as_str())
            {
                return None;
            }
            let value = resolved
                .and_then(|column| row.get(column))
                .cloned()
                .unwrap_or(CellValue::ZERO);
            Some(ProjectionPoint { name, value })
        })
        .collect();

    Projection {
        category_key: NAME_COLUMN,
        value_key: config.selected_column.clone(),
        column_resolved: resolved.map(str::to_owned),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::compute_projection;
    use crate::charts::ChartConfig;
    use crate::model::{CellValue, Dataset, NAME_COLUMN, Record};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("A")),
                ("Revenue", CellValue::from(10.0)),
                ("Cost", CellValue::from(4.0)),
            ]),
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("B")),
                ("Revenue", CellValue::from(20.0)),
                ("Cost", CellValue::from(7.0)),
            ]),
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("C")),
                ("Revenue", CellValue::from(30.0)),
            ]),
        ])
    }

    fn names(config: &ChartConfig, data: &Dataset) -> Vec<String> {
        compute_projection(config, data)
            .points
            .into_iter()
            .map(|point| point.name)
            .collect()
    }

    #[test]
    fn projection_is_deterministic() {
        let data = dataset();
        let config = ChartConfig::with_column("Revenue");
        assert_eq!(
            compute_projection(&config, &data),
            compute_projection(&config, &data)
        );
    }

    #[test]
    fn column_match_ignores_case() {
        let data = dataset();
        let projection = compute_projection(&ChartConfig::with_column("revenue"), &data);
        let values: Vec<f64> = projection.points.iter().map(|p| p.magnitude()).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(projection.value_key, "revenue");
        assert_eq!(projection.column_resolved.as_deref(), Some("Revenue"));
        assert_eq!(projection.category_key, "Name");
    }

    #[test]
    fn unknown_column_projects_zeros() {
        let data = dataset();
        let projection = compute_projection(&ChartConfig::with_column("Profit"), &data);
        assert!(!projection.is_column_available());
        assert_eq!(projection.points.len(), 3);
        assert!(
            projection
                .points
                .iter()
                .all(|point| point.value == CellValue::ZERO)
        );
    }

    #[test]
    fn missing_cell_defaults_to_zero() {
        let data = dataset();
        let projection = compute_projection(&ChartConfig::with_column("Cost"), &data);
        assert_eq!(projection.points[2].name, "C");
        assert_eq!(projection.points[2].value, CellValue::ZERO);
    }

    #[test]
    fn selected_items_filter_by_membership() {
        let data = dataset();
        let mut config = ChartConfig::with_column("Revenue");
        config.selected_items = vec!["B".to_owned()];
        assert_eq!(names(&config, &data), vec!["B"]);

        config.selected_items = vec!["C".to_owned(), "A".to_owned()];
        assert_eq!(names(&config, &data), vec!["A", "C"]);

        config.selected_items.clear();
        assert_eq!(names(&config, &data), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_names_are_kept_in_projection() {
        let data = Dataset::from_records(vec![
            Record::from_pairs([(NAME_COLUMN, CellValue::from("A")), ("V", CellValue::from(1.0))]),
            Record::from_pairs([(NAME_COLUMN, CellValue::from("A")), ("V", CellValue::from(2.0))]),
        ]);
        let mut config = ChartConfig::with_column("V");
        config.selected_items = vec!["A".to_owned()];
        let projection = compute_projection(&config, &data);
        assert_eq!(projection.points.len(), 2);
        assert_eq!(projection.max_magnitude(), 2.0);
    }

    #[test]
    fn text_cells_have_zero_magnitude_unless_numeric() {
        let data = Dataset::from_records(vec![
            Record::from_pairs([(NAME_COLUMN, "A"), ("V", "12")]),
            Record::from_pairs([(NAME_COLUMN, "B"), ("V", "north")]),
        ]);
        let projection = compute_projection(&ChartConfig::with_column("V"), &data);
        assert_eq!(projection.points[0].magnitude(), 12.0);
        assert_eq!(projection.points[1].magnitude(), 0.0);
        assert_eq!(projection.points[1].value, CellValue::from("north"));
    }
}
