// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use csvview_app::{CellValue, Dataset, NAME_COLUMN, Record};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const PRODUCT_ADJECTIVES: [&str; 12] = [
    "Alpine", "Bright", "Coastal", "Dawn", "Ember", "Frost", "Golden", "Harbor", "Iron",
    "Juniper", "Lunar", "Maple",
];

const PRODUCT_NOUNS: [&str; 10] = [
    "Kettle", "Lamp", "Backpack", "Blender", "Chair", "Drone", "Speaker", "Tent", "Watch",
    "Bicycle",
];

const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];

pub const DEMO_COLUMNS: [&str; 5] = [NAME_COLUMN, "Revenue", "Cost", "Units", "Region"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of sales-style datasets for demos and tests.
#[derive(Debug, Clone)]
pub struct DatasetFaker {
    rng: DeterministicRng,
}

impl DatasetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn product_name(&mut self) -> String {
        let adjective = self.pick(&PRODUCT_ADJECTIVES);
        let noun = self.pick(&PRODUCT_NOUNS);
        format!("{adjective} {noun}")
    }

    pub fn record(&mut self) -> Record {
        let units = self.int_range(1, 500);
        let unit_price = self.int_range(5, 250);
        let margin = self.int_range(10, 60);
        let revenue = units * unit_price;
        let cost = revenue * (100 - margin) / 100;
        Record::from_pairs([
            (NAME_COLUMN, CellValue::from(self.product_name())),
            ("Revenue", CellValue::from(revenue)),
            ("Cost", CellValue::from(cost)),
            ("Units", CellValue::from(units)),
            ("Region", CellValue::from(self.pick(&REGIONS))),
        ])
    }

    pub fn dataset(&mut self, rows: usize) -> Dataset {
        let records = (0..rows).map(|_| self.record()).collect();
        Dataset::new(
            DEMO_COLUMNS.iter().map(|column| (*column).to_owned()).collect(),
            records,
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// Three rows, `Name`/`Revenue`/`Cost`/`Region`, Names A, B, C.
pub fn sample_dataset() -> Dataset {
    dataset_from_rows(
        &[NAME_COLUMN, "Revenue", "Cost", "Region"],
        &[
            &["A", "100", "40", "North"],
            &["B", "250", "90", "South"],
            &["C", "75", "20", "North"],
        ],
    )
}

/// Builds a dataset from text cells; cells that parse as numbers become numbers.
pub fn dataset_from_rows(columns: &[&str], rows: &[&[&str]]) -> Dataset {
    let records = rows
        .iter()
        .map(|row| {
            Record::from_pairs(columns.iter().zip(row.iter()).map(|(column, cell)| {
                let value = match cell.parse::<f64>() {
                    Ok(number) => CellValue::Number(number),
                    Err(_) => CellValue::from(*cell),
                };
                (*column, value)
            }))
        })
        .collect();
    Dataset::new(
        columns.iter().map(|column| (*column).to_owned()).collect(),
        records,
    )
}

/// Renders RFC 4180 CSV; fields holding a comma, quote or line break are quoted.
pub fn dataset_to_csv(dataset: &Dataset) -> String {
    let header: Vec<String> = dataset.columns().iter().map(|column| csv_field(column)).collect();
    let mut out = header.join(",");
    out.push('\n');
    for row in dataset.rows() {
        let cells: Vec<String> = dataset
            .columns()
            .iter()
            .map(|column| {
                let text = row.get(column).map(ToString::to_string).unwrap_or_default();
                csv_field(&text)
            })
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_owned()
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("csvview.db");
    Ok((dir, db_path))
}

pub fn temp_csv(file_name: &str, contents: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join(file_name);
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn fixture_timestamp() -> Result<OffsetDateTime> {
    OffsetDateTime::parse(fixture_datetime(), &Rfc3339).context("parse fixture datetime")
}
