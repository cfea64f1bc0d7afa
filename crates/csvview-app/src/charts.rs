// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::Dataset;
use crate::projection::{Projection, compute_projection};

pub const DEFAULT_LOADING_DELAY: Duration = Duration::from_millis(200);

/// View state for one bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    pub selected_column: String,
    /// Ordered set of row Names; empty plots every row.
    pub selected_items: Vec<String>,
    pub column_dropdown_open: bool,
    pub items_dropdown_open: bool,
}

impl ChartConfig {
    pub fn with_column(column: impl Into<String>) -> Self {
        Self {
            selected_column: column.into(),
            ..Self::default()
        }
    }

    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self::with_column(dataset.default_chart_column())
    }

    pub fn is_renderable(&self) -> bool {
        !self.selected_column.is_empty()
    }
}

/// Fields to overwrite on a [`ChartConfig`]; `None` leaves the field alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartConfigPatch {
    pub selected_column: Option<String>,
    pub selected_items: Option<Vec<String>>,
    pub column_dropdown_open: Option<bool>,
    pub items_dropdown_open: Option<bool>,
}

impl ChartConfigPatch {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            selected_column: Some(column.into()),
            ..Self::default()
        }
    }

    pub fn items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for item in items {
            let item = item.into();
            if !deduped.contains(&item) {
                deduped.push(item);
            }
        }
        Self {
            selected_items: Some(deduped),
            ..Self::default()
        }
    }

    pub fn column_dropdown(open: bool) -> Self {
        Self {
            column_dropdown_open: Some(open),
            ..Self::default()
        }
    }

    pub fn items_dropdown(open: bool) -> Self {
        Self {
            items_dropdown_open: Some(open),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_column.is_none()
            && self.selected_items.is_none()
            && self.column_dropdown_open.is_none()
            && self.items_dropdown_open.is_none()
    }

    pub fn apply_to(&self, config: &mut ChartConfig) {
        if let Some(column) = &self.selected_column {
            config.selected_column.clone_from(column);
        }
        if let Some(items) = &self.selected_items {
            config.selected_items.clone_from(items);
        }
        if let Some(open) = self.column_dropdown_open {
            config.column_dropdown_open = open;
        }
        if let Some(open) = self.items_dropdown_open {
            config.items_dropdown_open = open;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartError {
    OutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "chart index {index} out of range for {len} chart(s)")
            }
        }
    }
}

impl std::error::Error for ChartError {}

/// How completions of overlapping delayed updates to one chart are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StalePolicy {
    /// Every completion applies in expiry order; the loading flag is last-write-wins.
    #[default]
    ApplyAll,
    /// Only the most recently scheduled update for an index applies.
    LatestOnly,
}

impl StalePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApplyAll => "apply",
            Self::LatestOnly => "latest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "apply" => Some(Self::ApplyAll),
            "latest" => Some(Self::LatestOnly),
            _ => None,
        }
    }
}

/// A captured update waiting out its loading delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredUpdate {
    pub index: usize,
    pub patch: ChartConfigPatch,
    pub delay: Duration,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredOutcome {
    Applied,
    /// A newer update for the same chart was scheduled after this one.
    Superseded,
    /// The chart was removed while the update was pending.
    Dropped,
}

/// Owns the per-chart configurations and their loading flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartManager {
    default_column: String,
    configs: Vec<ChartConfig>,
    loading: Vec<bool>,
    // Latest scheduled generation per index; 0 means nothing pending.
    pending: Vec<u64>,
    // Generation counter at the time each slot was created.
    created: Vec<u64>,
    next_generation: u64,
    stale_policy: StalePolicy,
}

impl ChartManager {
    pub fn new(dataset: &Dataset) -> Self {
        Self::with_default_column(dataset.default_chart_column())
    }

    pub fn with_default_column(default_column: impl Into<String>) -> Self {
        let default_column = default_column.into();
        Self {
            configs: vec![ChartConfig::with_column(default_column.clone())],
            loading: vec![false],
            pending: vec![0],
            created: vec![0],
            default_column,
            next_generation: 0,
            stale_policy: StalePolicy::default(),
        }
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.stale_policy
    }

    pub fn chart_count(&self) -> usize {
        self.configs.len()
    }

    pub fn configs(&self) -> &[ChartConfig] {
        &self.configs
    }

    pub fn config(&self, index: usize) -> Option<&ChartConfig> {
        self.configs.get(index)
    }

    pub fn loading(&self) -> &[bool] {
        &self.loading
    }

    pub fn is_loading(&self, index: usize) -> bool {
        self.loading.get(index).copied().unwrap_or(false)
    }

    /// Resizes to `count` charts, clamped to at least one. Returns the settled count.
    pub fn set_chart_count(&mut self, count: usize) -> usize {
        let count = count.max(1);
        self.configs.truncate(count);
        self.loading.truncate(count);
        self.pending.truncate(count);
        self.created.truncate(count);
        while self.configs.len() < count {
            self.configs
                .push(ChartConfig::with_column(self.default_column.clone()));
            self.loading.push(false);
            self.pending.push(0);
            self.created.push(self.next_generation);
        }
        count
    }

    pub fn add_chart(&mut self) -> usize {
        self.set_chart_count(self.chart_count().saturating_add(1))
    }

    pub fn remove_chart(&mut self) -> usize {
        self.set_chart_count(self.chart_count().saturating_sub(1))
    }

    pub fn update_config(
        &mut self,
        index: usize,
        patch: &ChartConfigPatch,
    ) -> Result<(), ChartError> {
        let len = self.configs.len();
        let config = self
            .configs
            .get_mut(index)
            .ok_or(ChartError::OutOfRange { index, len })?;
        patch.apply_to(config);
        Ok(())
    }

    /// Raises the loading flag and hands back the update to run once `delay` has passed.
    pub fn begin_update_with_loading(
        &mut self,
        index: usize,
        patch: ChartConfigPatch,
        delay: Duration,
    ) -> Result<DeferredUpdate, ChartError> {
        let len = self.configs.len();
        if index >= len {
            return Err(ChartError::OutOfRange { index, len });
        }
        self.next_generation += 1;
        self.loading[index] = true;
        self.pending[index] = self.next_generation;
        Ok(DeferredUpdate {
            index,
            patch,
            delay,
            generation: self.next_generation,
        })
    }

    pub fn complete_deferred(&mut self, update: &DeferredUpdate) -> DeferredOutcome {
        let index = update.index;
        if self.stale_policy == StalePolicy::LatestOnly {
            let slot_outlived = self
                .created
                .get(index)
                .is_none_or(|created| update.generation <= *created);
            if slot_outlived {
                log::debug!("dropping update for removed chart {index}");
                return DeferredOutcome::Dropped;
            }
            if self.pending[index] != update.generation {
                log::debug!(
                    "dropping superseded update for chart {index} (generation {})",
                    update.generation
                );
                return DeferredOutcome::Superseded;
            }
        }

        if let Err(error) = self.update_config(index, &update.patch) {
            log::debug!("ignoring delayed update: {error}");
            return DeferredOutcome::Dropped;
        }
        self.loading[index] = false;
        if self.pending[index] == update.generation {
            self.pending[index] = 0;
        }
        DeferredOutcome::Applied
    }

    pub fn projection(&self, index: usize, dataset: &Dataset) -> Result<Projection, ChartError> {
        let config = self.configs.get(index).ok_or(ChartError::OutOfRange {
            index,
            len: self.configs.len(),
        })?;
        Ok(compute_projection(config, dataset))
    }
}
