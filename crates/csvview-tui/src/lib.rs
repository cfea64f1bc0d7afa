// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use csvview_app::{
    ChartKind, Dataset, PlotCommand, PlotEvent, PlotView, PlotsOptions, PlotsState, Projection,
    ProjectionPoint, TableDropdown, TableFilter, Upload, UploadId, table_cell_text,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use time::macros::format_description;

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const LOADING_TEXT: &str = "Loading...";
const NO_DATA_TEXT: &str = "This file has no data...";
const NO_COLUMN_TEXT: &str = "no column selected";
const BAR_SCALE: u64 = 1000;

const PALETTE: [Color; 8] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Red,
    Color::LightCyan,
    Color::LightMagenta,
];

pub trait AppRuntime {
    fn list_uploads(&mut self) -> Result<Vec<Upload>>;
    fn delete_upload(&mut self, upload_id: UploadId) -> Result<()>;
    fn fetch_dataset(&mut self, upload: &Upload) -> Result<Dataset>;
    /// Delivers the fetch result as `InternalEvent::DatasetLoaded`. Runtimes backed by the
    /// network override this to run off the UI thread.
    fn spawn_fetch(
        &mut self,
        request_id: u64,
        upload: &Upload,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .fetch_dataset(upload)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::DatasetLoaded { request_id, result })
            .map_err(|_| anyhow::anyhow!("dataset event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    DatasetLoaded {
        request_id: u64,
        result: Result<Dataset, String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum DataLoad {
    Fetching,
    Failed(String),
    Ready { dataset: Dataset, state: PlotsState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PlotsCursor {
    focused_chart: usize,
    dropdown: usize,
    table_scroll: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct PlotsView {
    upload: Upload,
    request_id: u64,
    load: DataLoad,
    cursor: PlotsCursor,
}

impl PlotsView {
    fn new(upload: Upload, request_id: u64) -> Self {
        Self {
            upload,
            request_id,
            load: DataLoad::Fetching,
            cursor: PlotsCursor::default(),
        }
    }

    fn mounted(&self) -> Option<(&Dataset, &PlotsState)> {
        match &self.load {
            DataLoad::Ready { dataset, state } => Some((dataset, state)),
            DataLoad::Fetching | DataLoad::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
enum Screen {
    #[default]
    Home,
    Plots(PlotsView),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    options: PlotsOptions,
    uploads: Vec<Upload>,
    cursor: usize,
    screen: Screen,
    status_line: Option<String>,
    status_token: u64,
    next_request_id: u64,
}

impl ViewData {
    fn new(options: PlotsOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    fn mounted_state(&self) -> Option<&PlotsState> {
        match &self.screen {
            Screen::Plots(view) => view.mounted().map(|(_, state)| state),
            Screen::Home => None,
        }
    }

    fn mounted_state_mut(&mut self) -> Option<&mut PlotsState> {
        match &mut self.screen {
            Screen::Plots(PlotsView {
                load: DataLoad::Ready { state, .. },
                ..
            }) => Some(state),
            Screen::Plots(_) | Screen::Home => None,
        }
    }
}

#[derive(Debug, Default)]
struct KeyOutcome {
    events: Vec<PlotEvent>,
    back: bool,
}

impl KeyOutcome {
    fn events(events: Vec<PlotEvent>) -> Self {
        Self {
            events,
            back: false,
        }
    }

    fn back(back: bool) -> Self {
        Self {
            events: Vec::new(),
            back,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ChartSlot {
    Loading,
    NoColumn,
    Chart(Projection),
}

pub fn run_app<R: AppRuntime>(runtime: &mut R, options: PlotsOptions) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();
    refresh_uploads(runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_tx, &internal_rx);
        tick_plots(&mut view_data, &internal_tx, Instant::now());

        if let Err(error) = terminal.draw(|frame| render(frame, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let timeout = poll_timeout(&view_data, Instant::now());
        let has_event = match event::poll(timeout).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(&mut view_data, runtime, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Poll no longer than the next delayed chart update.
fn poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    view_data
        .mounted_state()
        .and_then(PlotsState::next_deadline)
        .map_or(POLL_INTERVAL, |deadline| {
            deadline.saturating_duration_since(now).min(POLL_INTERVAL)
        })
}

fn tick_plots(view_data: &mut ViewData, tx: &Sender<InternalEvent>, now: Instant) {
    let Some(state) = view_data.mounted_state_mut() else {
        return;
    };
    let events = state.tick(now);
    apply_plot_events(view_data, tx, events);
}

fn process_internal_events(
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
                if let Some(state) = view_data.mounted_state_mut() {
                    state.dispatch(PlotCommand::ClearStatus);
                }
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::DatasetLoaded { request_id, result } => {
                handle_dataset_loaded(view_data, tx, request_id, result);
            }
        }
    }
}

fn handle_dataset_loaded(
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request_id: u64,
    result: Result<Dataset, String>,
) {
    let options = view_data.options;
    let Screen::Plots(view) = &mut view_data.screen else {
        log::debug!("dropping dataset for request {request_id}: plots view closed");
        return;
    };
    if view.request_id != request_id || view.load != DataLoad::Fetching {
        log::debug!(
            "dropping dataset for request {request_id}: view expects {}",
            view.request_id
        );
        return;
    }

    match result {
        Ok(dataset) => {
            log::debug!(
                "mounted {} with {} rows",
                view.upload.file_name,
                dataset.len()
            );
            let state = PlotsState::mount(&dataset, options);
            view.load = DataLoad::Ready { dataset, state };
        }
        Err(error) => {
            log::warn!("fetch for {} failed: {error}", view.upload.file_name);
            view.load = DataLoad::Failed(error.clone());
            emit_status(view_data, tx, format!("load failed: {error}"));
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn bump_status_token(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    let message = message.into();
    match view_data.mounted_state_mut() {
        Some(state) => {
            state.dispatch(PlotCommand::SetStatus(message));
        }
        None => view_data.status_line = Some(message),
    }
    bump_status_token(view_data, internal_tx);
}

fn apply_plot_events(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<PlotEvent>,
) {
    for event in &events {
        log::debug!("plot event {event:?}");
    }
    if events
        .iter()
        .any(|event| matches!(event, PlotEvent::StatusUpdated(_)))
    {
        bump_status_token(view_data, internal_tx);
    }
}

fn refresh_uploads<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.list_uploads() {
        Ok(uploads) => {
            view_data.uploads = uploads;
            view_data.cursor = view_data
                .cursor
                .min(view_data.uploads.len().saturating_sub(1));
        }
        Err(error) => emit_status(
            view_data,
            internal_tx,
            format!("load failed: {error:#}"),
        ),
    }
}

fn handle_key_event<R: AppRuntime>(
    view_data: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match view_data.screen {
        Screen::Home => handle_home_key(view_data, runtime, internal_tx, key),
        Screen::Plots(_) => {
            handle_plots_key(view_data, internal_tx, key);
            false
        }
    }
}

fn handle_home_key<R: AppRuntime>(
    view_data: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.cursor = (view_data.cursor + 1).min(view_data.uploads.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.cursor = view_data.cursor.saturating_sub(1);
        }
        KeyCode::Char('r') => refresh_uploads(runtime, view_data, internal_tx),
        KeyCode::Char('d') => delete_selected_upload(view_data, runtime, internal_tx),
        KeyCode::Enter => open_selected_upload(view_data, runtime, internal_tx),
        _ => {}
    }
    false
}

fn open_selected_upload<R: AppRuntime>(
    view_data: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(upload) = view_data.uploads.get(view_data.cursor).cloned() else {
        emit_status(
            view_data,
            internal_tx,
            "no upload selected; add one with `csvview --upload <file.csv>`",
        );
        return;
    };

    view_data.next_request_id = view_data.next_request_id.saturating_add(1);
    let request_id = view_data.next_request_id;
    view_data.screen = Screen::Plots(PlotsView::new(upload.clone(), request_id));

    if let Err(error) = runtime.spawn_fetch(request_id, &upload, internal_tx.clone()) {
        if let Screen::Plots(view) = &mut view_data.screen {
            view.load = DataLoad::Failed(error.to_string());
        }
        emit_status(view_data, internal_tx, format!("load failed: {error:#}"));
    }
}

fn delete_selected_upload<R: AppRuntime>(
    view_data: &mut ViewData,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(upload) = view_data.uploads.get(view_data.cursor).cloned() else {
        return;
    };
    match runtime.delete_upload(upload.id) {
        Ok(()) => {
            refresh_uploads(runtime, view_data, internal_tx);
            emit_status(
                view_data,
                internal_tx,
                format!("removed {} from the local list", upload.file_name),
            );
        }
        Err(error) => emit_status(
            view_data,
            internal_tx,
            format!("delete failed: {error:#}"),
        ),
    }
}

fn handle_plots_key(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, key: KeyEvent) {
    let outcome = match &mut view_data.screen {
        Screen::Plots(view) => plots_key(view, key),
        Screen::Home => return,
    };
    apply_plot_events(view_data, internal_tx, outcome.events);
    if outcome.back {
        view_data.screen = Screen::Home;
    }
}

fn plots_key(view: &mut PlotsView, key: KeyEvent) -> KeyOutcome {
    let PlotsView { load, cursor, .. } = view;
    let DataLoad::Ready { dataset, state } = load else {
        return KeyOutcome::back(is_back_key(key));
    };
    if dataset.is_empty() {
        return KeyOutcome::back(is_back_key(key));
    }

    match state.plot.view() {
        PlotView::Bar => bar_key(dataset, state, cursor, key),
        PlotView::Table => table_key(dataset, state, cursor, key),
        PlotView::Unsupported(_) => plot_nav_key(state, cursor, key),
    }
}

fn is_back_key(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Esc | KeyCode::Char('b'))
}

fn plot_nav_key(state: &mut PlotsState, cursor: &mut PlotsCursor, key: KeyEvent) -> KeyOutcome {
    let command = match key.code {
        KeyCode::Tab => PlotCommand::NextPlot,
        KeyCode::BackTab => PlotCommand::PrevPlot,
        _ => return KeyOutcome::back(is_back_key(key)),
    };
    cursor.dropdown = 0;
    cursor.table_scroll = 0;
    KeyOutcome::events(state.dispatch(command))
}

fn move_cursor(position: usize, len: usize, key: KeyEvent) -> usize {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => (position + 1).min(len.saturating_sub(1)),
        KeyCode::Char('k') | KeyCode::Up => position.saturating_sub(1),
        _ => position,
    }
}

fn is_move_key(key: KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('k') | KeyCode::Up
    )
}

fn is_select_key(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter)
}

fn bar_key(
    dataset: &Dataset,
    state: &mut PlotsState,
    cursor: &mut PlotsCursor,
    key: KeyEvent,
) -> KeyOutcome {
    let index = cursor
        .focused_chart
        .min(state.charts.chart_count().saturating_sub(1));
    let Some(config) = state.charts.config(index).cloned() else {
        return plot_nav_key(state, cursor, key);
    };

    if config.column_dropdown_open {
        let candidates = dataset.value_columns();
        if is_move_key(key) {
            cursor.dropdown = move_cursor(cursor.dropdown, candidates.len(), key);
            return KeyOutcome::default();
        }
        let events = if is_select_key(key) {
            match candidates.get(cursor.dropdown) {
                Some(column) => state.dispatch(PlotCommand::PickColumn {
                    index,
                    column: column.clone(),
                }),
                None => Vec::new(),
            }
        } else if key.code == KeyCode::Esc {
            state.dispatch(PlotCommand::SetColumnDropdown { index, open: false })
        } else {
            Vec::new()
        };
        return KeyOutcome::events(events);
    }

    if config.items_dropdown_open {
        let candidates = dataset.unique_names();
        if is_move_key(key) {
            cursor.dropdown = move_cursor(cursor.dropdown, candidates.len(), key);
            return KeyOutcome::default();
        }
        let events = if is_select_key(key) {
            match candidates.get(cursor.dropdown) {
                Some(item) => state.dispatch(PlotCommand::ToggleItem {
                    index,
                    item: item.clone(),
                }),
                None => Vec::new(),
            }
        } else if key.code == KeyCode::Esc {
            state.dispatch(PlotCommand::SetItemsDropdown { index, open: false })
        } else {
            Vec::new()
        };
        return KeyOutcome::events(events);
    }

    let events = match key.code {
        KeyCode::Char('+') => state.dispatch(PlotCommand::AddChart),
        KeyCode::Char('-') => {
            let events = state.dispatch(PlotCommand::RemoveChart);
            cursor.focused_chart = cursor
                .focused_chart
                .min(state.charts.chart_count().saturating_sub(1));
            events
        }
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('k') | KeyCode::Up => {
            cursor.focused_chart = move_cursor(index, state.charts.chart_count(), key);
            Vec::new()
        }
        KeyCode::Char('c') => {
            cursor.dropdown = dataset
                .value_columns()
                .iter()
                .position(|column| column == &config.selected_column)
                .unwrap_or(0);
            state.dispatch(PlotCommand::SetColumnDropdown { index, open: true })
        }
        KeyCode::Char('i') => {
            cursor.dropdown = 0;
            state.dispatch(PlotCommand::SetItemsDropdown { index, open: true })
        }
        _ => return plot_nav_key(state, cursor, key),
    };
    KeyOutcome::events(events)
}

fn table_key(
    dataset: &Dataset,
    state: &mut PlotsState,
    cursor: &mut PlotsCursor,
    key: KeyEvent,
) -> KeyOutcome {
    if let Some(dropdown) = state.table.open {
        let candidates = table_dropdown_candidates(dataset, dropdown);
        if is_move_key(key) {
            cursor.dropdown = move_cursor(cursor.dropdown, candidates.len(), key);
            return KeyOutcome::default();
        }
        let events = if is_select_key(key) {
            match (candidates.get(cursor.dropdown), dropdown) {
                (Some(column), TableDropdown::Columns) => {
                    state.dispatch(PlotCommand::ToggleTableColumn(column.clone()))
                }
                (Some(name), TableDropdown::Rows) => {
                    state.dispatch(PlotCommand::ToggleTableRow(name.clone()))
                }
                (None, _) => Vec::new(),
            }
        } else if key.code == KeyCode::Esc {
            state.dispatch(PlotCommand::OpenTableDropdown(None))
        } else {
            Vec::new()
        };
        cursor.table_scroll = 0;
        return KeyOutcome::events(events);
    }

    let events = match key.code {
        KeyCode::Char('c') => {
            cursor.dropdown = 0;
            state.dispatch(PlotCommand::OpenTableDropdown(Some(TableDropdown::Columns)))
        }
        KeyCode::Char('r') => {
            cursor.dropdown = 0;
            state.dispatch(PlotCommand::OpenTableDropdown(Some(TableDropdown::Rows)))
        }
        KeyCode::Char('x') => {
            cursor.table_scroll = 0;
            state.dispatch(PlotCommand::ClearTableFilters)
        }
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('k') | KeyCode::Up => {
            let rows = state.table.rows_to_show(dataset).len();
            cursor.table_scroll = move_cursor(cursor.table_scroll, rows, key);
            Vec::new()
        }
        _ => return plot_nav_key(state, cursor, key),
    };
    KeyOutcome::events(events)
}

fn table_dropdown_candidates(dataset: &Dataset, dropdown: TableDropdown) -> Vec<String> {
    match dropdown {
        TableDropdown::Columns => dataset.columns().to_vec(),
        TableDropdown::Rows => TableFilter::row_candidates(dataset),
    }
}

fn chart_slot(state: &PlotsState, dataset: &Dataset, index: usize) -> ChartSlot {
    if state.charts.is_loading(index) {
        return ChartSlot::Loading;
    }
    match state.charts.config(index) {
        Some(config) if config.is_renderable() => match state.charts.projection(index, dataset) {
            Ok(projection) => ChartSlot::Chart(projection),
            Err(_) => ChartSlot::NoColumn,
        },
        _ => ChartSlot::NoColumn,
    }
}

/// Bar value on a `0..=BAR_SCALE` axis relative to the chart's tallest bar.
/// Negative or non-numeric values draw flat.
fn bar_height(point: &ProjectionPoint, max_magnitude: f64) -> u64 {
    let magnitude = point.magnitude();
    if magnitude <= 0.0 || max_magnitude <= 0.0 {
        0
    } else {
        (magnitude / max_magnitude * BAR_SCALE as f64).round() as u64
    }
}

fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

fn unsupported_text(kind: ChartKind) -> String {
    format!("{}: not implemented yet", kind.as_str())
}

fn render_dropdown_text(
    candidates: &[String],
    selected: &[String],
    cursor: usize,
    multi: bool,
) -> String {
    if candidates.is_empty() {
        return "(no items)".to_owned();
    }
    candidates
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let pointer = if index == cursor { ">" } else { " " };
            let chosen = selected.contains(item);
            let mark = match (multi, chosen) {
                (true, true) => "[x]",
                (true, false) => "[ ]",
                (false, true) => "(*)",
                (false, false) => "( )",
            };
            format!("{pointer} {mark} {item}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_uploaded_at(value: OffsetDateTime) -> String {
    value
        .format(&format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| value.to_string())
}

fn status_text(view_data: &ViewData) -> String {
    let hints = match &view_data.screen {
        Screen::Home => "j/k move | enter open | d delete | r refresh | q quit",
        Screen::Plots(view) => match view.mounted() {
            Some((_, state)) => match state.plot.view() {
                PlotView::Bar => {
                    let focused = view
                        .cursor
                        .focused_chart
                        .min(state.charts.chart_count().saturating_sub(1));
                    let dropdown_open = state.charts.config(focused).is_some_and(|config| {
                        config.column_dropdown_open || config.items_dropdown_open
                    });
                    if dropdown_open {
                        "j/k move | space/enter select | esc close"
                    } else {
                        "tab plot | +/- charts | j/k focus | c column | i items | esc back"
                    }
                }
                PlotView::Table if state.table.open.is_some() => {
                    "j/k move | space/enter toggle | esc close"
                }
                PlotView::Table => "tab plot | c columns | r rows | x clear | j/k scroll | esc back",
                PlotView::Unsupported(_) => "tab plot | esc back",
            },
            None => "esc back",
        },
    };

    let status = view_data
        .mounted_state()
        .and_then(|state| state.status_line.as_deref())
        .or(view_data.status_line.as_deref());
    match status {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    match &view_data.screen {
        Screen::Home => {
            let header = Paragraph::new(format!("{} upload(s)", view_data.uploads.len()))
                .block(Block::default().title("csvview").borders(Borders::ALL));
            frame.render_widget(header, layout[0]);
            render_home(frame, layout[1], view_data);
        }
        Screen::Plots(view) => {
            let current = view
                .mounted()
                .map_or(view_data.options.default_plot, |(_, state)| state.plot);
            let selected = ChartKind::ALL
                .iter()
                .position(|kind| *kind == current)
                .unwrap_or(0);
            let tabs = Tabs::new(ChartKind::ALL.iter().map(|kind| kind.as_str()))
                .block(
                    Block::default()
                        .title(format!("csvview | {}", view.upload.file_name))
                        .borders(Borders::ALL),
                )
                .style(Style::default().fg(Color::White))
                .highlight_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .select(selected);
            frame.render_widget(tabs, layout[0]);
            render_plots(frame, layout[1], view);
        }
    }

    let status_widget = Paragraph::new(status_text(view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);
}

fn render_home(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let block = Block::default().borders(Borders::ALL).title("uploads");
    if view_data.uploads.is_empty() {
        let empty = Paragraph::new("no uploads yet; add one with `csvview --upload <file.csv>`")
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(["File", "Author", "Uploaded", "Description"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = view_data.uploads.iter().enumerate().map(|(index, upload)| {
        let style = if index == view_data.cursor {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new([
            Cell::from(upload.file_name.clone()),
            Cell::from(upload.author.clone()),
            Cell::from(format_uploaded_at(upload.uploaded_at)),
            Cell::from(upload.description.clone()),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(16),
            Constraint::Length(17),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(block);
    frame.render_widget(table, area);
}

fn render_plots(frame: &mut ratatui::Frame<'_>, area: Rect, view: &PlotsView) {
    let message = |text: String| Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    match &view.load {
        DataLoad::Fetching => frame.render_widget(message(LOADING_TEXT.to_owned()), area),
        DataLoad::Failed(_) => frame.render_widget(message(NO_DATA_TEXT.to_owned()), area),
        DataLoad::Ready { dataset, .. } if dataset.is_empty() => {
            frame.render_widget(message(NO_DATA_TEXT.to_owned()), area);
        }
        DataLoad::Ready { dataset, state } => match state.plot.view() {
            PlotView::Table => render_data_table(frame, area, dataset, state, &view.cursor),
            PlotView::Bar => render_bar_grid(frame, area, dataset, state, &view.cursor),
            PlotView::Unsupported(kind) => {
                frame.render_widget(message(unsupported_text(kind)), area);
            }
        },
    }
}

fn render_data_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    dataset: &Dataset,
    state: &PlotsState,
    cursor: &PlotsCursor,
) {
    let filter = &state.table;
    let columns = filter.columns_to_show(dataset);
    let rows = filter.rows_to_show(dataset);
    let title = if filter.is_filtered() {
        format!(
            "table | {} of {} rows | filtered",
            rows.len(),
            dataset.len()
        )
    } else {
        format!("table | {} rows", dataset.len())
    };

    let header = Row::new(columns.iter().map(|column| {
        Cell::from(column.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let body = rows.iter().skip(cursor.table_scroll).map(|row| {
        Row::new(
            columns
                .iter()
                .map(|column| Cell::from(table_cell_text(row, column))),
        )
    });
    let widths = vec![Constraint::Min(8); columns.len().max(1)];
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);

    if let Some(dropdown) = filter.open {
        let (label, selected) = match dropdown {
            TableDropdown::Columns => ("By Column", &filter.selected_columns),
            TableDropdown::Rows => ("By Row", &filter.selected_rows),
        };
        let candidates = table_dropdown_candidates(dataset, dropdown);
        render_dropdown(
            frame,
            area,
            label,
            render_dropdown_text(&candidates, selected, cursor.dropdown, true),
        );
    }
}

fn render_bar_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    dataset: &Dataset,
    state: &PlotsState,
    cursor: &PlotsCursor,
) {
    let count = state.charts.chart_count();
    let focused = cursor.focused_chart.min(count.saturating_sub(1));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    frame.render_widget(
        Paragraph::new(format!("Add/Remove Chart: {count} | focused {}", focused + 1)),
        layout[0],
    );

    let slot_count = u32::try_from(count).unwrap_or(u32::MAX);
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, slot_count); count])
        .split(layout[1]);
    for (index, slot) in slots.iter().enumerate() {
        render_chart_slot(frame, *slot, dataset, state, index, index == focused);
    }

    let Some(config) = state.charts.config(focused) else {
        return;
    };
    if config.column_dropdown_open {
        let selected = [config.selected_column.clone()];
        render_dropdown(
            frame,
            area,
            "Column",
            render_dropdown_text(
                &dataset.value_columns(),
                &selected,
                cursor.dropdown,
                false,
            ),
        );
    } else if config.items_dropdown_open {
        render_dropdown(
            frame,
            area,
            "Items",
            render_dropdown_text(
                &dataset.unique_names(),
                &config.selected_items,
                cursor.dropdown,
                true,
            ),
        );
    }
}

fn render_chart_slot(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    dataset: &Dataset,
    state: &PlotsState,
    index: usize,
    focused: bool,
) {
    let column = state
        .charts
        .config(index)
        .map(|config| config.selected_column.as_str())
        .unwrap_or_default();
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!("{column} Bar Chart"));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let projection = match chart_slot(state, dataset, index) {
        ChartSlot::Loading => {
            frame.render_widget(Paragraph::new(LOADING_TEXT), inner);
            return;
        }
        ChartSlot::NoColumn => {
            frame.render_widget(Paragraph::new(NO_COLUMN_TEXT), inner);
            return;
        }
        ChartSlot::Chart(projection) => projection,
    };

    let marker_height = u16::from(!projection.is_column_available());
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(marker_height),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    if !projection.is_column_available() {
        frame.render_widget(
            Paragraph::new(format!("column unavailable: {}", projection.value_key))
                .style(Style::default().fg(Color::Red)),
            layout[0],
        );
    }

    let max_magnitude = projection.max_magnitude();
    let bars: Vec<Bar<'_>> = projection
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            Bar::default()
                .value(bar_height(point, max_magnitude))
                .label(Line::from(point.name.clone()))
                .text_value(point.value.to_string())
                .style(Style::default().fg(palette_color(index)))
        })
        .collect();
    let point_count = u16::try_from(projection.points.len().max(1)).unwrap_or(u16::MAX);
    let bar_width = (layout[1].width / point_count).saturating_sub(1).clamp(1, 9);
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .max(BAR_SCALE)
        .bar_width(bar_width)
        .bar_gap(1);
    frame.render_widget(chart, layout[1]);

    let legend: Vec<Span<'_>> = projection
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            Span::styled(
                format!("{} ", point.name),
                Style::default().fg(palette_color(index)),
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(legend)), layout[2]);
}

fn render_dropdown(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, text: String) {
    let popup = centered_rect(50, 60, area);
    frame.render_widget(Clear, popup);
    let dropdown = Paragraph::new(text).block(
        Block::default()
            .title(title.to_owned())
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(dropdown, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
