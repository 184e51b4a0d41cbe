// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use dongbu_app::{
    AppCommand, AppMode, AppState, CarLog, Comment, Entity, FieldKind, FormKind, Job,
    ListFormController, Outcome, Report, Resolution, RowId, StorageItem, SubmitError, TabKind,
    Ticket, ValidationError,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::macros::format_description;

const SAVING_LABEL: &str = "saving…";
const STATUS_TTL: Duration = Duration::from_secs(4);

/// A controller job tagged with the table it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum TableJob {
    Board(Job<Comment>),
    Storage(Job<StorageItem>),
    Car(Job<CarLog>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableResult {
    Board(Ticket, Outcome<Comment>),
    Storage(Ticket, Outcome<StorageItem>),
    Car(Ticket, Outcome<CarLog>),
}

/// An account request. It owns its inputs so it can run on another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthJob {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    SignOut,
    CurrentUser,
}

/// Failures are carried as display text. Signed-in results hold the user's
/// label; a sign up yields `None` while the address awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    SignedIn(std::result::Result<Option<String>, String>),
    SignedUp(std::result::Result<Option<String>, String>),
    SignedOut(std::result::Result<(), String>),
    CurrentUser(std::result::Result<Option<String>, String>),
}

pub trait AppRuntime {
    fn run_comment_job(&mut self, job: &Job<Comment>) -> Outcome<Comment>;
    fn run_storage_job(&mut self, job: &Job<StorageItem>) -> Outcome<StorageItem>;
    fn run_car_log_job(&mut self, job: &Job<CarLog>) -> Outcome<CarLog>;

    fn run_auth_job(&mut self, job: AuthJob) -> AuthResult;

    /// Runs `job` and delivers the outcome through `tx`. Runtimes that talk
    /// to the network override this to run off the UI thread.
    fn spawn_job(&mut self, job: TableJob, tx: Sender<InternalEvent>) -> Result<()> {
        let result = match job {
            TableJob::Board(job) => TableResult::Board(job.ticket(), self.run_comment_job(&job)),
            TableJob::Storage(job) => {
                TableResult::Storage(job.ticket(), self.run_storage_job(&job))
            }
            TableJob::Car(job) => TableResult::Car(job.ticket(), self.run_car_log_job(&job)),
        };
        tx.send(InternalEvent::Finished(result))
            .map_err(|_| anyhow!("job result channel closed"))?;
        Ok(())
    }

    /// Same contract as `spawn_job` for account requests. `serial` comes back
    /// with the result so superseded answers can be dropped.
    fn spawn_auth(&mut self, serial: u64, job: AuthJob, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.run_auth_job(job);
        tx.send(InternalEvent::Auth { serial, result })
            .map_err(|_| anyhow!("auth result channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Finished(TableResult),
    Auth { serial: u64, result: AuthResult },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AccountMode {
    #[default]
    SignIn,
    SignUp,
}

impl AccountMode {
    const fn label(self) -> &'static str {
        match self {
            Self::SignIn => "sign in",
            Self::SignUp => "sign up",
        }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct AccountUiState {
    mode: AccountMode,
    email: String,
    password: String,
    field: usize,
    user: Option<String>,
    /// Email of the sign in or sign up awaiting an answer.
    pending: Option<String>,
    serial: u64,
}

impl AccountUiState {
    fn active_input(&mut self) -> &mut String {
        if self.field == 0 {
            &mut self.email
        } else {
            &mut self.password
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UiState {
    car_numbers: Vec<String>,
    car_index: usize,
    selected: [usize; 3],
    form_field: usize,
    search_input: String,
    account: AccountUiState,
    alert: Option<String>,
    status_token: u64,
}

impl UiState {
    fn selected_car(&self) -> Option<&str> {
        self.car_numbers.get(self.car_index).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct ViewData {
    board: ListFormController<Comment>,
    storage: ListFormController<StorageItem>,
    car: ListFormController<CarLog>,
    ui: UiState,
}

impl ViewData {
    fn new(car_numbers: Vec<String>) -> Self {
        let car = match car_numbers.first() {
            Some(first) => ListFormController::with_scope(first.clone()),
            None => ListFormController::new(),
        };
        Self {
            board: ListFormController::new(),
            storage: ListFormController::new(),
            car,
            ui: UiState {
                car_numbers,
                ..UiState::default()
            },
        }
    }
}

const fn tab_slot(tab: TabKind) -> Option<usize> {
    match tab {
        TabKind::Board => Some(0),
        TabKind::Storage => Some(1),
        TabKind::Car => Some(2),
        TabKind::Account => None,
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    car_numbers: Vec<String>,
) -> Result<()> {
    if car_numbers.is_empty() {
        return Err(anyhow!(
            "no cars configured; add [cars].numbers to the config file"
        ));
    }
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(car_numbers);
    let (internal_tx, internal_rx) = mpsc::channel();
    mount_tab(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && key.kind == KeyEventKind::Press
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.ui.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Finished(result) => apply_result(state, runtime, view_data, tx, result),
            InternalEvent::Auth { serial, result } => {
                apply_auth_result(state, &mut view_data.ui, tx, serial, result);
            }
        }
    }
}

fn apply_result<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    result: TableResult,
) {
    match result {
        TableResult::Board(ticket, outcome) => {
            let resolution = view_data.board.resolve(ticket, outcome);
            clamp_cursor(&mut view_data.ui, 0, view_data.board.rows().len());
            finish_resolution(state, runtime, &mut view_data.ui, tx, resolution, TableJob::Board);
        }
        TableResult::Storage(ticket, outcome) => {
            let resolution = view_data.storage.resolve(ticket, outcome);
            clamp_cursor(&mut view_data.ui, 1, view_data.storage.rows().len());
            finish_resolution(
                state,
                runtime,
                &mut view_data.ui,
                tx,
                resolution,
                TableJob::Storage,
            );
        }
        TableResult::Car(ticket, outcome) => {
            let resolution = view_data.car.resolve(ticket, outcome);
            clamp_cursor(&mut view_data.ui, 2, view_data.car.rows().len());
            finish_resolution(state, runtime, &mut view_data.ui, tx, resolution, TableJob::Car);
        }
    }
}

fn finish_resolution<E: Entity, R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    resolution: Resolution<E>,
    wrap: fn(Job<E>) -> TableJob,
) {
    match resolution.report {
        Some(Report::Info(message)) => emit_status(state, ui, tx, message),
        Some(Report::Error(message)) => ui.alert = Some(message),
        None => {}
    }
    if let Some(job) = resolution.follow_up {
        send_job(runtime, ui, tx, wrap(job));
    }
}

fn clamp_cursor(ui: &mut UiState, slot: usize, len: usize) {
    ui.selected[slot] = ui.selected[slot].min(len.saturating_sub(1));
}

fn send_job<R: AppRuntime>(
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    job: TableJob,
) {
    if let Err(error) = runtime.spawn_job(job, tx.clone()) {
        tracing::warn!(%error, "could not start request");
        ui.alert = Some(format!("could not start request: {error}"));
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    ui: &mut UiState,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    ui.status_token = ui.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, ui.status_token);
}

fn mount_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match state.active_tab {
        TabKind::Board => {
            let job = view_data.board.mount();
            send_job(runtime, &mut view_data.ui, tx, TableJob::Board(job));
        }
        TabKind::Storage => {
            let job = view_data.storage.mount();
            send_job(runtime, &mut view_data.ui, tx, TableJob::Storage(job));
        }
        TabKind::Car => {
            if view_data.ui.selected_car().is_none() {
                emit_status(state, &mut view_data.ui, tx, "no car selected");
            }
            let job = view_data.car.mount();
            send_job(runtime, &mut view_data.ui, tx, TableJob::Car(job));
        }
        TabKind::Account => refresh_account(runtime, &mut view_data.ui, tx),
    }
}

fn unmount_tab(view_data: &mut ViewData, tab: TabKind) {
    match tab {
        TabKind::Board => view_data.board.unmount(),
        TabKind::Storage => view_data.storage.unmount(),
        TabKind::Car => view_data.car.unmount(),
        TabKind::Account => {}
    }
}

fn switch_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let before = state.active_tab;
    state.dispatch(command);
    if state.active_tab == before {
        return;
    }
    unmount_tab(view_data, before);
    mount_tab(state, runtime, view_data, tx);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.ui.alert.take().is_some() {
        return false;
    }

    let confirming = match state.active_tab {
        TabKind::Board => handle_confirm_key(
            state,
            runtime,
            &mut view_data.board,
            &mut view_data.ui,
            internal_tx,
            key,
            TableJob::Board,
        ),
        TabKind::Storage => handle_confirm_key(
            state,
            runtime,
            &mut view_data.storage,
            &mut view_data.ui,
            internal_tx,
            key,
            TableJob::Storage,
        ),
        TabKind::Car => handle_confirm_key(
            state,
            runtime,
            &mut view_data.car,
            &mut view_data.ui,
            internal_tx,
            key,
            TableJob::Car,
        ),
        TabKind::Account => false,
    };
    if confirming {
        return false;
    }

    match state.mode {
        AppMode::Search => {
            handle_search_key(state, runtime, view_data, internal_tx, key);
            return false;
        }
        AppMode::Form(FormKind::Account) => {
            handle_account_form_key(state, runtime, &mut view_data.ui, internal_tx, key);
            return false;
        }
        AppMode::Form(_) => {
            match state.active_tab {
                TabKind::Board => handle_form_key(
                    state,
                    runtime,
                    &mut view_data.board,
                    &mut view_data.ui,
                    internal_tx,
                    key,
                    TableJob::Board,
                ),
                TabKind::Storage => handle_form_key(
                    state,
                    runtime,
                    &mut view_data.storage,
                    &mut view_data.ui,
                    internal_tx,
                    key,
                    TableJob::Storage,
                ),
                TabKind::Car => handle_form_key(
                    state,
                    runtime,
                    &mut view_data.car,
                    &mut view_data.ui,
                    internal_tx,
                    key,
                    TableJob::Car,
                ),
                TabKind::Account => {
                    state.dispatch(AppCommand::CloseForm);
                }
            }
            return false;
        }
        AppMode::Nav => {}
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('f'), KeyModifiers::NONE) | (KeyCode::Right, _) => {
            switch_tab(state, runtime, view_data, internal_tx, AppCommand::NextTab);
            return false;
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::Left, _) => {
            switch_tab(state, runtime, view_data, internal_tx, AppCommand::PrevTab);
            return false;
        }
        (KeyCode::Esc, _) => {
            state.dispatch(AppCommand::ClearStatus);
            return false;
        }
        _ => {}
    }

    match state.active_tab {
        TabKind::Board => handle_list_nav_key(
            state,
            runtime,
            &mut view_data.board,
            &mut view_data.ui,
            internal_tx,
            key,
            TableJob::Board,
        ),
        TabKind::Storage => {
            if key.code == KeyCode::Char('/') {
                view_data.ui.search_input = view_data
                    .storage
                    .query()
                    .search
                    .clone()
                    .unwrap_or_default();
                state.dispatch(AppCommand::EnterSearch);
            } else {
                handle_list_nav_key(
                    state,
                    runtime,
                    &mut view_data.storage,
                    &mut view_data.ui,
                    internal_tx,
                    key,
                    TableJob::Storage,
                );
            }
        }
        TabKind::Car => {
            if key.code == KeyCode::Char('c') {
                cycle_car(state, runtime, view_data, internal_tx);
            } else {
                handle_list_nav_key(
                    state,
                    runtime,
                    &mut view_data.car,
                    &mut view_data.ui,
                    internal_tx,
                    key,
                    TableJob::Car,
                );
            }
        }
        TabKind::Account => {
            handle_account_nav_key(state, runtime, &mut view_data.ui, internal_tx, key);
        }
    }
    false
}

/// Consumes the key while a delete confirmation is open.
fn handle_confirm_key<E: Entity, R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    controller: &mut ListFormController<E>,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    wrap: fn(Job<E>) -> TableJob,
) -> bool {
    if controller.pending_delete().is_none() {
        return false;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(job) = controller.resolve_delete(true) {
                send_job(runtime, ui, tx, wrap(job));
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            controller.resolve_delete(false);
            emit_status(state, ui, tx, "delete canceled");
        }
        _ => {}
    }
    true
}

fn handle_list_nav_key<E: Entity, R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    controller: &mut ListFormController<E>,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    wrap: fn(Job<E>) -> TableJob,
) {
    let Some(slot) = tab_slot(state.active_tab) else {
        return;
    };
    let len = controller.rows().len();
    let selected = ui.selected[slot].min(len.saturating_sub(1));
    let form_kind = FormKind::for_tab(state.active_tab);
    let noun = E::SPEC.noun;

    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
            if len > 0 {
                ui.selected[slot] = (selected + 1).min(len - 1);
            }
        }
        (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
            ui.selected[slot] = selected.saturating_sub(1);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            controller.cancel_edit();
            ui.form_field = 0;
            state.dispatch(AppCommand::OpenForm(form_kind));
        }
        (KeyCode::Char('e'), KeyModifiers::NONE) | (KeyCode::Enter, _) => {
            match controller.rows().get(selected).cloned() {
                Some(row) => {
                    controller.begin_edit(&row);
                    ui.form_field = 0;
                    state.dispatch(AppCommand::OpenForm(form_kind));
                    emit_status(
                        state,
                        ui,
                        tx,
                        format!("editing {noun} #{}", row.id().raw()),
                    );
                }
                None => emit_status(state, ui, tx, format!("no {noun} to edit")),
            }
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            match controller.rows().get(selected).map(Entity::id) {
                Some(id) if controller.is_deleting(id) => {
                    emit_status(state, ui, tx, format!("{noun} #{} is being deleted", id.raw()));
                }
                Some(id) => controller.request_delete(id),
                None => emit_status(state, ui, tx, format!("no {noun} to delete")),
            }
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            let job = controller.load_list();
            send_job(runtime, ui, tx, wrap(job));
            emit_status(state, ui, tx, "reloading");
        }
        _ => {}
    }
}

fn handle_form_key<E: Entity, R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    controller: &mut ListFormController<E>,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    wrap: fn(Job<E>) -> TableJob,
) {
    let field_count = controller.draft().len().max(1);
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            let was_editing = controller.is_editing();
            controller.cancel_edit();
            state.dispatch(AppCommand::CloseForm);
            let message = if was_editing {
                "edit canceled"
            } else {
                "form closed"
            };
            emit_status(state, ui, tx, message);
        }
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            submit_form(state, runtime, controller, ui, tx, wrap);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => {
            ui.form_field = (ui.form_field + 1) % field_count;
        }
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            ui.form_field = (ui.form_field + field_count - 1) % field_count;
        }
        (KeyCode::Enter, _) => {
            if ui.form_field + 1 >= field_count {
                submit_form(state, runtime, controller, ui, tx, wrap);
            } else {
                ui.form_field += 1;
            }
        }
        (KeyCode::Backspace, _) => controller.draft_mut().pop_char(ui.form_field),
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            controller.draft_mut().push_char(ui.form_field, ch);
        }
        _ => {}
    }
}

fn submit_form<E: Entity, R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    controller: &mut ListFormController<E>,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    wrap: fn(Job<E>) -> TableJob,
) {
    match controller.submit() {
        Ok(job) => {
            emit_status(state, ui, tx, SAVING_LABEL);
            send_job(runtime, ui, tx, wrap(job));
        }
        Err(SubmitError::Busy) => {
            emit_status(state, ui, tx, "still saving; wait for the current save");
        }
        Err(SubmitError::Invalid(error)) => {
            let label = match &error {
                ValidationError::Required { label } | ValidationError::NotANumber { label, .. } => {
                    Some(*label)
                }
                ValidationError::NoScope { .. } => None,
            };
            if let Some(index) = label.and_then(|label| {
                E::SPEC.fields.iter().position(|field| field.label == label)
            }) {
                ui.form_field = index;
            }
            emit_status(state, ui, tx, error.to_string());
        }
    }
}

fn handle_search_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.ui.search_input.clear();
            let job = view_data.storage.clear_search();
            send_job(runtime, &mut view_data.ui, tx, TableJob::Storage(job));
            state.dispatch(AppCommand::ExitSearch);
            emit_status(state, &mut view_data.ui, tx, "전체");
        }
        (KeyCode::Enter, _) => {
            let job = view_data.storage.set_search(&view_data.ui.search_input);
            send_job(runtime, &mut view_data.ui, tx, TableJob::Storage(job));
            state.dispatch(AppCommand::ExitSearch);
            view_data.ui.selected[1] = 0;
            let message = match &view_data.storage.query().search {
                Some(needle) => format!("search {needle:?}"),
                None => "전체".to_owned(),
            };
            emit_status(state, &mut view_data.ui, tx, message);
        }
        (KeyCode::Backspace, _) => {
            view_data.ui.search_input.pop();
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.ui.search_input.push(ch);
        }
        _ => {}
    }
}

fn cycle_car<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let ui = &mut view_data.ui;
    if ui.car_numbers.is_empty() {
        emit_status(
            state,
            ui,
            tx,
            "no cars configured; add [cars].numbers to the config file",
        );
        return;
    }
    ui.car_index = (ui.car_index + 1) % ui.car_numbers.len();
    ui.selected[2] = 0;
    let car = ui.car_numbers[ui.car_index].clone();
    if let Some(job) = view_data.car.set_scope(car.clone()) {
        send_job(runtime, ui, tx, TableJob::Car(job));
    }
    emit_status(state, ui, tx, format!("car {car}"));
}

fn handle_account_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('a'), KeyModifiers::NONE) | (KeyCode::Enter, _) => {
            ui.account.field = 0;
            state.dispatch(AppCommand::OpenForm(FormKind::Account));
        }
        (KeyCode::Char('m'), KeyModifiers::NONE) => {
            ui.account.mode = ui.account.mode.toggled();
            let message = format!("{} mode", ui.account.mode.label());
            emit_status(state, ui, tx, message);
        }
        (KeyCode::Char('o'), KeyModifiers::NONE) => sign_out(runtime, ui, tx),
        (KeyCode::Char('r'), KeyModifiers::NONE) => refresh_account(runtime, ui, tx),
        _ => {}
    }
}

fn handle_account_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            state.dispatch(AppCommand::CloseForm);
        }
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            submit_account(state, runtime, ui, tx);
        }
        (KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down, _) => {
            ui.account.field = 1 - ui.account.field.min(1);
        }
        (KeyCode::Enter, _) => {
            if ui.account.field == 0 {
                ui.account.field = 1;
            } else {
                submit_account(state, runtime, ui, tx);
            }
        }
        (KeyCode::Backspace, _) => {
            ui.account.active_input().pop();
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            ui.account.active_input().push(ch);
        }
        _ => {}
    }
}

fn send_auth<R: AppRuntime>(
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    job: AuthJob,
    pending: Option<String>,
) {
    ui.account.serial = ui.account.serial.wrapping_add(1);
    ui.account.pending = pending;
    if let Err(error) = runtime.spawn_auth(ui.account.serial, job, tx.clone()) {
        ui.account.pending = None;
        tracing::warn!(%error, "could not start account request");
        ui.alert = Some(format!("could not start request: {error}"));
    }
}

fn submit_account<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
) {
    if ui.account.pending.is_some() {
        emit_status(state, ui, tx, "still waiting for the last account request");
        return;
    }
    let mode = ui.account.mode;
    let email = ui.account.email.trim().to_owned();
    let password = ui.account.password.clone();
    let job = match mode {
        AccountMode::SignIn => AuthJob::SignIn {
            email: email.clone(),
            password,
        },
        AccountMode::SignUp => AuthJob::SignUp {
            email: email.clone(),
            password,
        },
    };
    emit_status(state, ui, tx, format!("{}…", mode.label()));
    send_auth(runtime, ui, tx, job, Some(email));
}

fn sign_out<R: AppRuntime>(runtime: &mut R, ui: &mut UiState, tx: &Sender<InternalEvent>) {
    ui.account.user = None;
    send_auth(runtime, ui, tx, AuthJob::SignOut, None);
}

fn refresh_account<R: AppRuntime>(runtime: &mut R, ui: &mut UiState, tx: &Sender<InternalEvent>) {
    send_auth(runtime, ui, tx, AuthJob::CurrentUser, None);
}

fn apply_auth_result(
    state: &mut AppState,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    serial: u64,
    result: AuthResult,
) {
    if serial != ui.account.serial {
        tracing::debug!(serial, latest = ui.account.serial, "dropping superseded account result");
        return;
    }
    match result {
        AuthResult::SignedIn(outcome) => {
            finish_account_submit(state, ui, tx, AccountMode::SignIn, outcome);
        }
        AuthResult::SignedUp(outcome) => {
            finish_account_submit(state, ui, tx, AccountMode::SignUp, outcome);
        }
        AuthResult::SignedOut(Ok(())) => emit_status(state, ui, tx, "signed out"),
        AuthResult::SignedOut(Err(error)) => {
            tracing::warn!(%error, "sign out failed");
            ui.alert = Some(format!("sign out failed: {error}; the local session was cleared"));
        }
        AuthResult::CurrentUser(Ok(user)) => ui.account.user = user,
        AuthResult::CurrentUser(Err(error)) => {
            tracing::warn!(%error, "could not load the current user");
            emit_status(state, ui, tx, format!("could not load the current user: {error}"));
        }
    }
}

fn finish_account_submit(
    state: &mut AppState,
    ui: &mut UiState,
    tx: &Sender<InternalEvent>,
    mode: AccountMode,
    outcome: std::result::Result<Option<String>, String>,
) {
    let Some(email) = ui.account.pending.take() else {
        return;
    };
    match outcome {
        Ok(user) => {
            ui.account.password.clear();
            ui.account.field = 0;
            if state.mode == AppMode::Form(FormKind::Account) {
                state.dispatch(AppCommand::CloseForm);
            }
            match user {
                Some(user) => {
                    emit_status(state, ui, tx, format!("signed in as {user}"));
                    ui.account.user = Some(user);
                }
                None => {
                    ui.account.mode = AccountMode::SignIn;
                    emit_status(
                        state,
                        ui,
                        tx,
                        format!("check {email} to confirm the account, then sign in"),
                    );
                }
            }
        }
        Err(error) => {
            tracing::warn!(%error, mode = mode.label(), "account request failed");
            ui.alert = Some(format!("{} failed: {error}", mode.label()));
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| tab.label().to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("dongbu").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let ui = &view_data.ui;
    let focused = matches!(state.mode, AppMode::Form(_)).then_some(ui.form_field);
    match state.active_tab {
        TabKind::Board => render_list(
            frame,
            layout[1],
            &view_data.board,
            ui.selected[0],
            board_title(&view_data.board),
            focused,
        ),
        TabKind::Storage => render_list(
            frame,
            layout[1],
            &view_data.storage,
            ui.selected[1],
            storage_title(state, &view_data.storage, ui),
            focused,
        ),
        TabKind::Car => render_list(
            frame,
            layout[1],
            &view_data.car,
            ui.selected[2],
            car_title(&view_data.car, ui),
            focused,
        ),
        TabKind::Account => {
            let body = Paragraph::new(render_account_text(state, &ui.account))
                .block(Block::default().borders(Borders::ALL).title("account"));
            frame.render_widget(body, layout[1]);
        }
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(prompt) = confirm_prompt(state, view_data) {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new(prompt)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("confirm").borders(Borders::ALL));
        frame.render_widget(confirm, area);
    }

    if let Some(message) = &ui.alert {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let alert = Paragraph::new(format!("{message}\n\npress any key"))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("error")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(alert, area);
    }
}

fn board_title(controller: &ListFormController<Comment>) -> String {
    with_loading(
        format!("총 {}개의 댓글", controller.rows().len()),
        controller.is_loading(),
    )
}

fn storage_title(
    state: &AppState,
    controller: &ListFormController<StorageItem>,
    ui: &UiState,
) -> String {
    let filter = if state.mode == AppMode::Search {
        format!("search: {}_", ui.search_input)
    } else {
        match &controller.query().search {
            Some(needle) => format!("search {needle:?}"),
            None => "전체".to_owned(),
        }
    };
    with_loading(
        format!("{} items · {filter}", controller.rows().len()),
        controller.is_loading(),
    )
}

fn car_title(controller: &ListFormController<CarLog>, ui: &UiState) -> String {
    let car = ui.selected_car().unwrap_or("no car selected");
    with_loading(
        format!("{car} · {} trips", controller.rows().len()),
        controller.is_loading(),
    )
}

fn with_loading(title: String, loading: bool) -> String {
    if loading {
        format!("{title} · loading…")
    } else {
        title
    }
}

fn format_created(row: &impl Entity) -> String {
    row.created_at()
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]"
        ))
        .unwrap_or_default()
}

fn row_cells<E: Entity>(controller: &ListFormController<E>, row: &E) -> Vec<String> {
    let id = row.id();
    let marker = if controller.is_deleting(id) {
        "… "
    } else if controller.edit_target() == Some(id) {
        "✎ "
    } else {
        ""
    };
    let mut cells = vec![format!("{marker}{}", format_created(row))];
    cells.extend(
        E::SPEC
            .fields
            .iter()
            .map(|field| row.field_text(field.column).replace('\n', " ")),
    );
    cells
}

fn render_list<E: Entity>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    controller: &ListFormController<E>,
    selected: usize,
    title: String,
    focused: Option<usize>,
) {
    let (table_area, form_area) = if let Some(focused) = focused {
        let form_height = u16::try_from(controller.draft().len()).unwrap_or(8) + 3;
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(form_height)])
            .split(area);
        (parts[0], Some((parts[1], focused)))
    } else {
        (area, None)
    };

    let spec = E::SPEC;
    let mut widths = vec![Constraint::Length(18)];
    widths.extend(spec.fields.iter().map(|field| match field.kind {
        FieldKind::Number => Constraint::Length(10),
        FieldKind::Multiline => Constraint::Min(20),
        FieldKind::Text => Constraint::Min(10),
    }));

    let header_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let mut header_cells = vec![Cell::from("created").style(header_style)];
    header_cells.extend(
        spec.fields
            .iter()
            .map(|field| Cell::from(field.label).style(header_style)),
    );

    let rows = controller.rows().iter().enumerate().map(|(index, row)| {
        let mut style = Style::default();
        if controller.is_deleting(row.id()) {
            style = style.fg(Color::DarkGray);
        }
        if index == selected {
            style = style.bg(Color::DarkGray);
        }
        Row::new(row_cells(controller, row).into_iter().map(Cell::from)).style(style)
    });

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, table_area);

    if let Some((form_area, focused)) = form_area {
        let title = match controller.edit_target() {
            Some(id) => format!("edit {} #{}", spec.noun, id.raw()),
            None => format!("new {}", spec.noun),
        };
        let form = Paragraph::new(render_form_text(controller, focused))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(form, form_area);
    }
}

fn render_form_text<E: Entity>(controller: &ListFormController<E>, focused: usize) -> String {
    let hint = if controller.is_submitting() {
        SAVING_LABEL
    } else {
        "ctrl+s save · esc cancel"
    };
    let draft = controller.draft();
    let mut lines = draft
        .spec()
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let cursor = if index == focused { ">" } else { " " };
            let required = if field.required { "*" } else { "" };
            format!("{cursor} {}{required}: {}", field.label, draft.value(index))
        })
        .collect::<Vec<_>>();
    if let Some(car) = controller.scope_value() {
        lines.insert(0, format!("  car: {car}"));
    }
    lines.push(hint.to_owned());
    lines.join("\n")
}

fn render_account_text(state: &AppState, account: &AccountUiState) -> String {
    let user = match (&account.user, &account.pending) {
        (_, Some(email)) => format!("waiting for the server ({email})"),
        (Some(user), None) => format!("signed in as {user}"),
        (None, None) => "not signed in".to_owned(),
    };
    let editing = state.mode == AppMode::Form(FormKind::Account);
    let cursor = |index: usize| if editing && account.field == index { ">" } else { " " };
    let masked = "*".repeat(account.password.chars().count());
    [
        user,
        String::new(),
        format!("mode: {} (m to switch)", account.mode.label()),
        format!("{} email: {}", cursor(0), account.email),
        format!("{} password: {masked}", cursor(1)),
        String::new(),
        if editing {
            format!("ctrl+s {} · esc cancel", account.mode.label())
        } else {
            "a edit · o sign out · r refresh".to_owned()
        },
    ]
    .join("\n")
}

fn confirm_prompt(state: &AppState, view_data: &ViewData) -> Option<String> {
    fn prompt<E: Entity>(controller: &ListFormController<E>) -> Option<String> {
        controller
            .pending_delete()
            .map(|id| format!("delete {} #{}? y/n", E::SPEC.noun, id.raw()))
    }
    match state.active_tab {
        TabKind::Board => prompt(&view_data.board),
        TabKind::Storage => prompt(&view_data.storage),
        TabKind::Car => prompt(&view_data.car),
        TabKind::Account => None,
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Form(_) => "FORM",
        AppMode::Search => "SEARCH",
    };
    let hints = match (state.mode, state.active_tab) {
        (AppMode::Form(FormKind::Account), _) => {
            "tab field | enter next/submit | ctrl+s submit | esc close".to_owned()
        }
        (AppMode::Form(_), _) => format!(
            "field {} | tab/shift+tab move | ctrl+s save | esc cancel",
            view_data.ui.form_field + 1
        ),
        (AppMode::Search, _) => "enter apply | esc 전체".to_owned(),
        (AppMode::Nav, TabKind::Account) => {
            "b/f tabs | a sign in | m mode | o sign out | r refresh | ctrl+q".to_owned()
        }
        (AppMode::Nav, TabKind::Storage) => {
            "b/f tabs | j/k | a add | e edit | d delete | r reload | / search | ctrl+q".to_owned()
        }
        (AppMode::Nav, TabKind::Car) => {
            "b/f tabs | j/k | a add | e edit | d delete | r reload | c car | ctrl+q".to_owned()
        }
        (AppMode::Nav, TabKind::Board) => {
            "b/f tabs | j/k | a add | e edit | d delete | r reload | ctrl+q".to_owned()
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
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
