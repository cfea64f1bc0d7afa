// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use crate::charts::{
    ChartConfigPatch, ChartError, ChartManager, DEFAULT_LOADING_DELAY, DeferredOutcome,
    DeferredUpdate, StalePolicy,
};
use crate::deferred::DeferredQueue;
use crate::model::{ChartKind, Dataset, NAME_COLUMN};
use crate::table::{TableDropdown, TableFilter, apply_selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotsOptions {
    pub default_plot: ChartKind,
    pub loading_delay: Duration,
    pub stale_policy: StalePolicy,
}

impl Default for PlotsOptions {
    fn default() -> Self {
        Self {
            default_plot: ChartKind::Table,
            loading_delay: DEFAULT_LOADING_DELAY,
            stale_policy: StalePolicy::default(),
        }
    }
}

/// View state of the plots screen for one mounted dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotsState {
    pub plot: ChartKind,
    pub charts: ChartManager,
    pub table: TableFilter,
    pub status_line: Option<String>,
    loading_delay: Duration,
    deferred: DeferredQueue<DeferredUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotCommand {
    SelectPlot(ChartKind),
    NextPlot,
    PrevPlot,
    SetChartCount(usize),
    AddChart,
    RemoveChart,
    SetColumnDropdown { index: usize, open: bool },
    SetItemsDropdown { index: usize, open: bool },
    PickColumn { index: usize, column: String },
    ToggleItem { index: usize, item: String },
    SetItems { index: usize, items: Vec<String> },
    OpenTableDropdown(Option<TableDropdown>),
    ToggleTableColumn(String),
    ToggleTableRow(String),
    ClearTableFilters,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotEvent {
    PlotChanged(ChartKind),
    ChartCountChanged(usize),
    ConfigUpdated(usize),
    LoadingStarted(usize),
    LoadingFinished(usize),
    UpdateSuperseded(usize),
    UpdateDropped(usize),
    TableDropdownChanged(Option<TableDropdown>),
    TableFilterChanged,
    StatusUpdated(String),
    StatusCleared,
}

impl PlotsState {
    pub fn mount(dataset: &Dataset, options: PlotsOptions) -> Self {
        Self {
            plot: options.default_plot,
            charts: ChartManager::new(dataset).with_stale_policy(options.stale_policy),
            table: TableFilter::default(),
            status_line: None,
            loading_delay: options.loading_delay,
            deferred: DeferredQueue::new(),
        }
    }

    pub fn loading_delay(&self) -> Duration {
        self.loading_delay
    }

    pub fn pending_updates(&self) -> usize {
        self.deferred.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.next_deadline()
    }

    pub fn dispatch(&mut self, command: PlotCommand) -> Vec<PlotEvent> {
        self.dispatch_at(command, Instant::now())
    }

    pub fn dispatch_at(&mut self, command: PlotCommand, now: Instant) -> Vec<PlotEvent> {
        match command {
            PlotCommand::SelectPlot(kind) => self.select_plot(kind),
            PlotCommand::NextPlot => self.select_plot(self.plot.rotate(1)),
            PlotCommand::PrevPlot => self.select_plot(self.plot.rotate(-1)),
            PlotCommand::SetChartCount(count) => {
                let count = self.charts.set_chart_count(count);
                vec![PlotEvent::ChartCountChanged(count)]
            }
            PlotCommand::AddChart => {
                let count = self.charts.add_chart();
                vec![PlotEvent::ChartCountChanged(count)]
            }
            PlotCommand::RemoveChart => {
                let count = self.charts.remove_chart();
                vec![PlotEvent::ChartCountChanged(count)]
            }
            PlotCommand::SetColumnDropdown { index, open } => {
                let patch = ChartConfigPatch {
                    column_dropdown_open: Some(open),
                    items_dropdown_open: open.then_some(false),
                    ..ChartConfigPatch::default()
                };
                self.update_now(index, &patch)
            }
            PlotCommand::SetItemsDropdown { index, open } => {
                let patch = ChartConfigPatch {
                    items_dropdown_open: Some(open),
                    column_dropdown_open: open.then_some(false),
                    ..ChartConfigPatch::default()
                };
                self.update_now(index, &patch)
            }
            PlotCommand::PickColumn { index, column } => {
                if column == NAME_COLUMN {
                    log::debug!("ignoring {NAME_COLUMN} as a value column for chart {index}");
                    return Vec::new();
                }
                let mut events = self.update_with_loading(index, ChartConfigPatch::column(column), now);
                if !events.is_empty() {
                    events.extend(self.update_now(index, &ChartConfigPatch::column_dropdown(false)));
                }
                events
            }
            PlotCommand::ToggleItem { index, item } => {
                let Some(config) = self.charts.config(index) else {
                    log::debug!("ignoring item toggle for missing chart {index}");
                    return Vec::new();
                };
                let items = apply_selection(&config.selected_items, &item, true);
                self.update_with_loading(index, ChartConfigPatch::items(items), now)
            }
            PlotCommand::SetItems { index, items } => {
                self.update_with_loading(index, ChartConfigPatch::items(items), now)
            }
            PlotCommand::OpenTableDropdown(dropdown) => {
                self.table.open = dropdown;
                vec![PlotEvent::TableDropdownChanged(dropdown)]
            }
            PlotCommand::ToggleTableColumn(column) => {
                self.table.toggle_column(&column);
                vec![PlotEvent::TableFilterChanged]
            }
            PlotCommand::ToggleTableRow(name) => {
                self.table.toggle_row(&name);
                vec![PlotEvent::TableFilterChanged]
            }
            PlotCommand::ClearTableFilters => {
                self.table.clear();
                vec![
                    PlotEvent::TableFilterChanged,
                    self.set_status("filters cleared"),
                ]
            }
            PlotCommand::SetStatus(message) => vec![self.set_status(&message)],
            PlotCommand::ClearStatus => {
                self.status_line = None;
                vec![PlotEvent::StatusCleared]
            }
        }
    }

    /// Runs every delayed update whose deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Vec<PlotEvent> {
        let mut events = Vec::new();
        for update in self.deferred.take_due(now) {
            let index = update.index;
            events.push(match self.charts.complete_deferred(&update) {
                DeferredOutcome::Applied => PlotEvent::LoadingFinished(index),
                DeferredOutcome::Superseded => PlotEvent::UpdateSuperseded(index),
                DeferredOutcome::Dropped => PlotEvent::UpdateDropped(index),
            });
        }
        events
    }

    fn select_plot(&mut self, kind: ChartKind) -> Vec<PlotEvent> {
        self.plot = kind;
        vec![PlotEvent::PlotChanged(kind)]
    }

    fn update_now(&mut self, index: usize, patch: &ChartConfigPatch) -> Vec<PlotEvent> {
        match self.charts.update_config(index, patch) {
            Ok(()) => vec![PlotEvent::ConfigUpdated(index)],
            Err(error) => ignore_out_of_range(error),
        }
    }

    fn update_with_loading(
        &mut self,
        index: usize,
        patch: ChartConfigPatch,
        now: Instant,
    ) -> Vec<PlotEvent> {
        match self
            .charts
            .begin_update_with_loading(index, patch, self.loading_delay)
        {
            Ok(update) => {
                self.deferred.schedule(now, update.delay, update);
                vec![PlotEvent::LoadingStarted(index)]
            }
            Err(error) => ignore_out_of_range(error),
        }
    }

    fn set_status(&mut self, message: &str) -> PlotEvent {
        self.status_line = Some(message.to_owned());
        PlotEvent::StatusUpdated(message.to_owned())
    }
}

fn ignore_out_of_range(error: ChartError) -> Vec<PlotEvent> {
    log::debug!("ignoring chart command: {error}");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::{PlotCommand, PlotEvent, PlotsOptions, PlotsState};
    use crate::charts::StalePolicy;
    use crate::model::{CellValue, ChartKind, Dataset, NAME_COLUMN, Record};
    use crate::table::TableDropdown;
    use std::time::{Duration, Instant};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("A")),
                ("Revenue", CellValue::from(10.0)),
                ("Cost", CellValue::from(3.0)),
            ]),
            Record::from_pairs([
                (NAME_COLUMN, CellValue::from("B")),
                ("Revenue", CellValue::from(20.0)),
                ("Cost", CellValue::from(6.0)),
            ]),
        ])
    }

    fn mounted() -> PlotsState {
        PlotsState::mount(&dataset(), PlotsOptions::default())
    }

    #[test]
    fn mount_uses_second_column_and_default_plot() {
        let state = PlotsState::mount(
            &dataset(),
            PlotsOptions {
                default_plot: ChartKind::Bar,
                ..PlotsOptions::default()
            },
        );
        assert_eq!(state.plot, ChartKind::Bar);
        assert_eq!(state.charts.chart_count(), 1);
        assert_eq!(state.charts.configs()[0].selected_column, "Revenue");
        assert_eq!(state.loading_delay(), Duration::from_millis(200));
    }

    #[test]
    fn plot_rotation_wraps() {
        let mut state = mounted();
        let events = state.dispatch(PlotCommand::PrevPlot);
        assert_eq!(state.plot, ChartKind::Box);
        assert_eq!(events, vec![PlotEvent::PlotChanged(ChartKind::Box)]);

        state.dispatch(PlotCommand::NextPlot);
        assert_eq!(state.plot, ChartKind::Table);
    }

    #[test]
    fn chart_count_commands_clamp_and_report() {
        let mut state = mounted();
        assert_eq!(
            state.dispatch(PlotCommand::AddChart),
            vec![PlotEvent::ChartCountChanged(2)]
        );
        assert_eq!(
            state.dispatch(PlotCommand::SetChartCount(0)),
            vec![PlotEvent::ChartCountChanged(1)]
        );
        assert_eq!(
            state.dispatch(PlotCommand::RemoveChart),
            vec![PlotEvent::ChartCountChanged(1)]
        );
        assert_eq!(state.charts.loading().len(), 1);
    }

    #[test]
    fn pick_column_shows_loading_until_delay_elapses() {
        let mut state = mounted();
        let start = Instant::now();

        let events = state.dispatch_at(
            PlotCommand::PickColumn {
                index: 0,
                column: "Cost".to_owned(),
            },
            start,
        );
        assert_eq!(
            events,
            vec![PlotEvent::LoadingStarted(0), PlotEvent::ConfigUpdated(0)]
        );
        assert!(state.charts.is_loading(0));
        assert_eq!(state.charts.configs()[0].selected_column, "Revenue");
        assert_eq!(state.next_deadline(), Some(start + Duration::from_millis(200)));

        assert!(state.tick(start + Duration::from_millis(150)).is_empty());
        assert!(state.charts.is_loading(0));

        let events = state.tick(start + Duration::from_millis(200));
        assert_eq!(events, vec![PlotEvent::LoadingFinished(0)]);
        assert!(!state.charts.is_loading(0));
        assert_eq!(state.charts.configs()[0].selected_column, "Cost");
        assert!(!state.charts.configs()[0].column_dropdown_open);
        assert_eq!(state.pending_updates(), 0);
    }

    #[test]
    fn opening_one_dropdown_closes_the_other() {
        let mut state = mounted();
        state.dispatch(PlotCommand::SetColumnDropdown {
            index: 0,
            open: true,
        });
        assert!(state.charts.configs()[0].column_dropdown_open);

        state.dispatch(PlotCommand::SetItemsDropdown {
            index: 0,
            open: true,
        });
        let config = &state.charts.configs()[0];
        assert!(config.items_dropdown_open);
        assert!(!config.column_dropdown_open);

        state.dispatch(PlotCommand::SetItemsDropdown {
            index: 0,
            open: false,
        });
        assert!(!state.charts.configs()[0].items_dropdown_open);
        assert!(!state.charts.is_loading(0));
    }

    #[test]
    fn toggling_items_goes_through_loading_path() {
        let mut state = mounted();
        let start = Instant::now();
        state.dispatch_at(
            PlotCommand::ToggleItem {
                index: 0,
                item: "B".to_owned(),
            },
            start,
        );
        state.tick(start + Duration::from_millis(200));
        assert_eq!(state.charts.configs()[0].selected_items, vec!["B".to_owned()]);

        state.dispatch_at(
            PlotCommand::ToggleItem {
                index: 0,
                item: "B".to_owned(),
            },
            start + Duration::from_millis(300),
        );
        state.tick(start + Duration::from_millis(500));
        assert!(state.charts.configs()[0].selected_items.is_empty());
    }

    #[test]
    fn commands_for_missing_chart_are_ignored() {
        let mut state = mounted();
        let before = state.clone();
        assert!(
            state
                .dispatch(PlotCommand::PickColumn {
                    index: 3,
                    column: "Cost".to_owned(),
                })
                .is_empty()
        );
        assert!(
            state
                .dispatch(PlotCommand::SetColumnDropdown {
                    index: 3,
                    open: true,
                })
                .is_empty()
        );
        assert_eq!(state, before);
    }

    #[test]
    fn picking_name_as_value_column_is_ignored() {
        let mut state = mounted();
        let before = state.clone();
        let events = state.dispatch(PlotCommand::PickColumn {
            index: 0,
            column: NAME_COLUMN.to_owned(),
        });
        assert!(events.is_empty());
        assert_eq!(state, before);
        assert_eq!(state.pending_updates(), 0);
    }

    #[test]
    fn mount_skips_name_when_it_is_the_second_column() {
        let data = Dataset::new(
            vec!["Revenue".to_owned(), NAME_COLUMN.to_owned()],
            dataset().rows().to_vec(),
        );
        let mut state = PlotsState::mount(&data, PlotsOptions::default());
        assert_eq!(state.charts.configs()[0].selected_column, "Revenue");

        state.dispatch(PlotCommand::AddChart);
        assert_eq!(state.charts.configs()[1].selected_column, "Revenue");
    }

    #[test]
    fn pending_update_after_shrink_is_dropped() {
        let mut state = mounted();
        let start = Instant::now();
        state.dispatch_at(PlotCommand::SetChartCount(2), start);
        state.dispatch_at(
            PlotCommand::SetItems {
                index: 1,
                items: vec!["A".to_owned()],
            },
            start,
        );
        state.dispatch_at(PlotCommand::RemoveChart, start);

        let events = state.tick(start + Duration::from_millis(200));
        assert_eq!(events, vec![PlotEvent::UpdateDropped(1)]);
        assert_eq!(state.charts.chart_count(), 1);
        assert_eq!(state.charts.loading(), [false]);
    }

    #[test]
    fn latest_only_policy_reports_superseded_updates() {
        let mut state = PlotsState::mount(
            &dataset(),
            PlotsOptions {
                stale_policy: StalePolicy::LatestOnly,
                ..PlotsOptions::default()
            },
        );
        let start = Instant::now();
        state.dispatch_at(
            PlotCommand::SetItems {
                index: 0,
                items: vec!["A".to_owned()],
            },
            start,
        );
        state.dispatch_at(
            PlotCommand::SetItems {
                index: 0,
                items: vec!["B".to_owned()],
            },
            start + Duration::from_millis(100),
        );

        let events = state.tick(start + Duration::from_millis(300));
        assert_eq!(
            events,
            vec![
                PlotEvent::UpdateSuperseded(0),
                PlotEvent::LoadingFinished(0)
            ]
        );
        assert_eq!(state.charts.configs()[0].selected_items, vec!["B".to_owned()]);
    }

    #[test]
    fn table_filter_commands_update_filter_state() {
        let mut state = mounted();
        assert_eq!(
            state.dispatch(PlotCommand::OpenTableDropdown(Some(TableDropdown::Rows))),
            vec![PlotEvent::TableDropdownChanged(Some(TableDropdown::Rows))]
        );
        state.dispatch(PlotCommand::ToggleTableRow("A".to_owned()));
        state.dispatch(PlotCommand::ToggleTableColumn("Cost".to_owned()));
        assert_eq!(state.table.selected_rows, vec!["A".to_owned()]);
        assert_eq!(state.table.selected_columns, vec!["Cost".to_owned()]);

        let events = state.dispatch(PlotCommand::ClearTableFilters);
        assert!(!state.table.is_filtered());
        assert_eq!(
            events,
            vec![
                PlotEvent::TableFilterChanged,
                PlotEvent::StatusUpdated("filters cleared".to_owned()),
            ]
        );
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = mounted();
        state.dispatch(PlotCommand::SetStatus("hello".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("hello"));
        assert_eq!(
            state.dispatch(PlotCommand::ClearStatus),
            vec![PlotEvent::StatusCleared]
        );
        assert!(state.status_line.is_none());
    }
}
