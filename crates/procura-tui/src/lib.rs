// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Terminal frontend for the procurement portal: a sign-in form, the
//! per-role screen rotation, and the list screens with their search,
//! filter, sort, and pagination controls. All portal I/O goes through
//! the [`PortalRuntime`] seam so the whole flow is testable without a
//! server or a terminal.

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use procura_app::{
    AccountStatus, AppCommand, AppEvent, AppMode, AppState, ListController, ListRecord,
    OfferRecord, OfferSortKey, OfferStatus, PortalCounts, RowAction, ScreenKind, SessionContext,
    SortDirection, UserRecord, UserSortKey, VerificationRecord, VerificationSortKey,
    VerificationStatus,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const DEFAULT_PAGE_SIZE: usize = 10;
const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

/// One screen's worth of freshly fetched portal records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenData {
    Users(Vec<UserRecord>),
    Offers(Vec<OfferRecord>),
    Verifications(Vec<VerificationRecord>),
}

/// The single-record change a row action makes when the server accepts
/// it. Computed up front so the confirm prompt, the request, and the
/// optimistic patch all agree on what is about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPatch {
    UserStatus(AccountStatus),
    UserDeleted,
    OfferStatus(OfferStatus),
    VerificationStatus(VerificationStatus),
}

impl RowPatch {
    const fn screen(self) -> ScreenKind {
        match self {
            Self::UserStatus(_) | Self::UserDeleted => ScreenKind::Users,
            Self::OfferStatus(_) => ScreenKind::Offers,
            Self::VerificationStatus(_) => ScreenKind::Verifications,
        }
    }
}

/// Results delivered back to the UI thread over the internal channel.
/// Error arms carry the finished error text; by the time a failure
/// reaches the status line there is nothing left to retry.
#[derive(Debug, Clone)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    LoginFinished {
        request_id: u64,
        result: Result<SessionContext, String>,
    },
    DatasetLoaded {
        screen: ScreenKind,
        request_id: u64,
        result: Result<ScreenData, String>,
    },
    CountsLoaded {
        result: Result<PortalCounts, String>,
    },
    ActionFinished {
        record_id: i64,
        patch: RowPatch,
        result: Result<(), String>,
    },
}

/// Side effects the portal UI needs: the HTTP API, local persistence,
/// and config-supplied defaults. The `spawn_*` variants may run the
/// work on a background thread; the default implementations run it
/// inline and deliver the result over the channel, which keeps tests
/// deterministic.
pub trait PortalRuntime {
    fn login(&mut self, email: &str, password: &str) -> Result<SessionContext>;
    fn logout(&mut self) -> Result<()>;
    fn restore_session(&mut self) -> Result<Option<SessionContext>>;
    fn fetch_dataset(&mut self, screen: ScreenKind, token: &str) -> Result<ScreenData>;
    fn fetch_counts(&mut self, token: &str) -> Result<PortalCounts>;
    fn run_row_action(&mut self, record_id: i64, patch: RowPatch, token: &str) -> Result<()>;

    fn save_session(&mut self, session: &SessionContext) -> Result<()>;
    fn save_page(&mut self, screen: ScreenKind, page: usize) -> Result<()>;
    fn load_page(&mut self, screen: ScreenKind) -> Result<Option<usize>>;
    fn save_show_deleted(&mut self, show_deleted: bool) -> Result<()>;
    fn save_page_size(&mut self, page_size: usize) -> Result<()>;
    fn initial_page_size(&mut self) -> usize;
    fn initial_show_deleted(&mut self) -> bool;

    fn spawn_login(
        &mut self,
        request_id: u64,
        email: &str,
        password: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .login(email, password)
            .map_err(|error| format!("{error:#}"));
        internal_tx
            .send(InternalEvent::LoginFinished { request_id, result })
            .map_err(|_| anyhow!("internal event channel closed"))
    }

    fn spawn_fetch(
        &mut self,
        screen: ScreenKind,
        request_id: u64,
        token: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .fetch_dataset(screen, token)
            .map_err(|error| format!("{error:#}"));
        internal_tx
            .send(InternalEvent::DatasetLoaded {
                screen,
                request_id,
                result,
            })
            .map_err(|_| anyhow!("internal event channel closed"))
    }

    fn spawn_counts(&mut self, token: &str, internal_tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .fetch_counts(token)
            .map_err(|error| format!("{error:#}"));
        internal_tx
            .send(InternalEvent::CountsLoaded { result })
            .map_err(|_| anyhow!("internal event channel closed"))
    }

    fn spawn_row_action(
        &mut self,
        record_id: i64,
        patch: RowPatch,
        token: &str,
        internal_tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .run_row_action(record_id, patch, token)
            .map_err(|error| format!("{error:#}"));
        internal_tx
            .send(InternalEvent::ActionFinished {
                record_id,
                patch,
                result,
            })
            .map_err(|_| anyhow!("internal event channel closed"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoginField {
    #[default]
    Email,
    Password,
}

impl LoginField {
    const fn other(self) -> Self {
        match self {
            Self::Email => Self::Password,
            Self::Password => Self::Email,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LoginUiState {
    email: String,
    password: String,
    field: LoginField,
    busy: bool,
}

#[derive(Debug, Clone, Default)]
struct FilterPickerUiState {
    visible: bool,
    cursor: usize,
    selected: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct PendingAction {
    record_id: i64,
    patch: RowPatch,
    prompt: String,
}

#[derive(Debug, Clone)]
struct ViewData {
    counts: PortalCounts,
    users: ListController<UserRecord>,
    offers: ListController<OfferRecord>,
    verifications: ListController<VerificationRecord>,
    /// Row selection within the visible page.
    cursor: usize,
    login: LoginUiState,
    filter_picker: FilterPickerUiState,
    confirm: Option<PendingAction>,
    /// Rows with a request on the wire; a second action on the same row
    /// is refused until the first resolves.
    in_flight: BTreeSet<(ScreenKind, i64)>,
    /// Newest outstanding fetch per screen. Responses carrying any other
    /// request id are stale and get dropped.
    active_fetches: BTreeMap<ScreenKind, u64>,
    /// Saved page positions waiting for their dataset to arrive.
    pending_pages: BTreeMap<ScreenKind, usize>,
    fetch_seq: u64,
    login_seq: u64,
    status_token: u64,
    help_visible: bool,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            counts: PortalCounts::default(),
            users: ListController::new(DEFAULT_PAGE_SIZE),
            offers: ListController::new(DEFAULT_PAGE_SIZE),
            verifications: ListController::new(DEFAULT_PAGE_SIZE),
            cursor: 0,
            login: LoginUiState::default(),
            filter_picker: FilterPickerUiState::default(),
            confirm: None,
            in_flight: BTreeSet::new(),
            active_fetches: BTreeMap::new(),
            pending_pages: BTreeMap::new(),
            fetch_seq: 0,
            login_seq: 0,
            status_token: 0,
            help_visible: false,
        }
    }
}

pub fn run_app(state: &mut AppState, runtime: &mut impl PortalRuntime) -> Result<()> {
    enable_raw_mode().context("enable raw terminal mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let mut view_data = ViewData::default();
    restore_saved_session(state, runtime, &mut view_data, &internal_tx);

    let result = event_loop(
        &mut terminal,
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        &internal_rx,
    );

    disable_raw_mode().context("disable raw terminal mode")?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)
        .context("leave alternate screen")?;
    terminal.show_cursor().context("show terminal cursor")?;
    result
}

fn event_loop<R: PortalRuntime>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) -> Result<()> {
    loop {
        process_internal_events(state, runtime, view_data, internal_tx, internal_rx);
        terminal
            .draw(|frame| render(frame, state, view_data))
            .context("draw frame")?;
        if event::poll(Duration::from_millis(120)).context("poll terminal events")?
            && let Event::Key(key) = event::read().context("read terminal event")?
            && handle_key_event(state, runtime, view_data, internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = internal_rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } => {
                // A newer status re-armed the timer; only the latest one
                // may wipe the line.
                if token == view_data.status_token {
                    state.dispatch(AppCommand::ClearStatus);
                }
            }
            InternalEvent::LoginFinished { request_id, result } => {
                handle_login_finished(state, runtime, view_data, internal_tx, request_id, result);
            }
            InternalEvent::DatasetLoaded {
                screen,
                request_id,
                result,
            } => {
                handle_dataset_loaded(state, view_data, internal_tx, screen, request_id, result);
            }
            InternalEvent::CountsLoaded { result } => match result {
                Ok(counts) => view_data.counts = counts,
                Err(text) => {
                    emit_status(state, view_data, internal_tx, format!("load failed: {text}"));
                }
            },
            InternalEvent::ActionFinished {
                record_id,
                patch,
                result,
            } => {
                handle_action_finished(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    record_id,
                    patch,
                    result,
                );
            }
        }
    }
}

fn handle_login_finished<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    request_id: u64,
    result: Result<SessionContext, String>,
) {
    if request_id != view_data.login_seq {
        return;
    }
    view_data.login.busy = false;
    match result {
        Ok(session) => {
            view_data.login = LoginUiState::default();
            if let Err(error) = runtime.save_session(&session) {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("session save failed: {error:#}"),
                );
            }
            begin_session(state, runtime, view_data, internal_tx, session);
        }
        Err(text) => {
            emit_status(state, view_data, internal_tx, format!("sign in failed: {text}"));
        }
    }
}

fn handle_dataset_loaded(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    screen: ScreenKind,
    request_id: u64,
    result: Result<ScreenData, String>,
) {
    if view_data.active_fetches.get(&screen) != Some(&request_id) {
        return;
    }
    view_data.active_fetches.remove(&screen);
    match result {
        Ok(data) => {
            match data {
                ScreenData::Users(rows) => view_data.users.replace_records(rows),
                ScreenData::Offers(rows) => view_data.offers.replace_records(rows),
                ScreenData::Verifications(rows) => view_data.verifications.replace_records(rows),
            }
            if let Some(page) = view_data.pending_pages.remove(&screen) {
                match screen {
                    ScreenKind::Users => view_data.users.set_page(page),
                    ScreenKind::Offers => view_data.offers.set_page(page),
                    ScreenKind::Verifications => view_data.verifications.set_page(page),
                    ScreenKind::Dashboard | ScreenKind::Profile => {}
                }
            }
            clamp_cursor(state, view_data);
        }
        Err(text) => {
            emit_status(state, view_data, internal_tx, format!("load failed: {text}"));
        }
    }
}

fn handle_action_finished<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    record_id: i64,
    patch: RowPatch,
    result: Result<(), String>,
) {
    view_data.in_flight.remove(&(patch.screen(), record_id));
    match result {
        Ok(()) => {
            apply_row_patch(view_data, record_id, patch);
            clamp_cursor(state, view_data);
            emit_status(state, view_data, internal_tx, success_status(record_id, patch));
            spawn_counts_fetch(state, runtime, view_data, internal_tx);
        }
        // The dataset stays untouched; the server's own words go on the
        // status line.
        Err(text) => emit_status(state, view_data, internal_tx, text),
    }
}

fn apply_row_patch(view_data: &mut ViewData, record_id: i64, patch: RowPatch) {
    match patch {
        RowPatch::UserStatus(status) => {
            view_data.users.patch_record(record_id, |user| user.status = status);
        }
        RowPatch::UserDeleted => {
            view_data.users.patch_record(record_id, |user| user.deleted = true);
        }
        RowPatch::OfferStatus(status) => {
            view_data.offers.patch_record(record_id, |offer| offer.status = status);
        }
        RowPatch::VerificationStatus(status) => {
            view_data
                .verifications
                .patch_record(record_id, |verification| verification.status = status);
        }
    }
}

fn success_status(record_id: i64, patch: RowPatch) -> String {
    match patch {
        RowPatch::UserStatus(AccountStatus::Active) => format!("user {record_id} activated"),
        RowPatch::UserStatus(AccountStatus::Inactive) => format!("user {record_id} deactivated"),
        RowPatch::UserDeleted => format!("user {record_id} deleted"),
        RowPatch::OfferStatus(status) => format!("offer {record_id} {}", status.as_str()),
        RowPatch::VerificationStatus(status) => {
            format!("verification {record_id} {}", status.as_str())
        }
    }
}

fn restore_saved_session<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.restore_session() {
        Ok(Some(session)) => begin_session(state, runtime, view_data, internal_tx, session),
        Ok(None) => {}
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("session restore failed: {error:#}"),
            );
        }
    }
}

fn begin_session<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    session: SessionContext,
) {
    let page_size = runtime.initial_page_size().max(1);
    let show_deleted = runtime.initial_show_deleted();
    view_data.users = ListController::new(page_size);
    view_data.offers = ListController::new(page_size);
    view_data.verifications = ListController::new(page_size);
    view_data.users.set_show_deleted(show_deleted);
    view_data.offers.set_show_deleted(show_deleted);
    view_data.verifications.set_show_deleted(show_deleted);
    view_data.cursor = 0;
    view_data.counts = PortalCounts::default();
    state.show_deleted = show_deleted;
    dispatch_command(
        state,
        runtime,
        view_data,
        internal_tx,
        AppCommand::StartSession(session),
    );
}

fn submit_login<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.login.busy {
        return;
    }
    let email = view_data.login.email.trim().to_owned();
    let password = view_data.login.password.clone();
    if email.is_empty() || password.is_empty() {
        emit_status(
            state,
            view_data,
            internal_tx,
            "email and password are required".to_owned(),
        );
        return;
    }
    view_data.login.busy = true;
    view_data.login_seq += 1;
    let request_id = view_data.login_seq;
    if let Err(error) = runtime.spawn_login(request_id, &email, &password, internal_tx.clone()) {
        view_data.login.busy = false;
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("sign in failed: {error:#}"),
        );
    }
}

fn sign_out<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Err(error) = runtime.logout() {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("sign out failed: {error:#}"),
        );
        return;
    }
    // Keep the token so clears scheduled before sign-out stay stale.
    let status_token = view_data.status_token;
    *view_data = ViewData::default();
    view_data.status_token = status_token;
    dispatch_command(state, runtime, view_data, internal_tx, AppCommand::EndSession);
}

fn enter_screen<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    screen: ScreenKind,
) {
    view_data.cursor = 0;
    view_data.filter_picker = FilterPickerUiState::default();
    view_data.confirm = None;
    match screen {
        ScreenKind::Dashboard => spawn_counts_fetch(state, runtime, view_data, internal_tx),
        ScreenKind::Profile => {}
        ScreenKind::Users | ScreenKind::Offers | ScreenKind::Verifications => {
            // Search, filter, and sort are per-visit; the page position
            // survives through the store.
            match screen {
                ScreenKind::Users => view_data.users.reset_transient(),
                ScreenKind::Offers => view_data.offers.reset_transient(),
                ScreenKind::Verifications => view_data.verifications.reset_transient(),
                ScreenKind::Dashboard | ScreenKind::Profile => {}
            }
            match runtime.load_page(screen) {
                Ok(Some(page)) => {
                    view_data.pending_pages.insert(screen, page);
                }
                Ok(None) => {
                    view_data.pending_pages.remove(&screen);
                }
                Err(error) => {
                    emit_status(
                        state,
                        view_data,
                        internal_tx,
                        format!("saved page load failed: {error:#}"),
                    );
                }
            }
            spawn_dataset_fetch(state, runtime, view_data, internal_tx, screen);
        }
    }
}

fn spawn_dataset_fetch<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    screen: ScreenKind,
) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    let token = session.token.clone();
    view_data.fetch_seq += 1;
    let request_id = view_data.fetch_seq;
    view_data.active_fetches.insert(screen, request_id);
    if let Err(error) = runtime.spawn_fetch(screen, request_id, &token, internal_tx.clone()) {
        view_data.active_fetches.remove(&screen);
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error:#}"),
        );
    }
}

fn spawn_counts_fetch<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    let token = session.token.clone();
    if let Err(error) = runtime.spawn_counts(&token, internal_tx.clone()) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error:#}"),
        );
    }
}

fn refresh_active_screen<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match state.active_screen {
        ScreenKind::Dashboard => spawn_counts_fetch(state, runtime, view_data, internal_tx),
        ScreenKind::Profile => {}
        ScreenKind::Users | ScreenKind::Offers | ScreenKind::Verifications => {
            spawn_dataset_fetch(state, runtime, view_data, internal_tx, state.active_screen);
        }
    }
}

/// Runs a state command and performs the side effects its events call
/// for: screen entry fetches, restriction fan-out, status timers.
fn dispatch_command<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    let mut status_updated = false;
    for event in &events {
        match event {
            AppEvent::ScreenChanged(screen) => {
                enter_screen(state, runtime, view_data, internal_tx, *screen);
            }
            AppEvent::DeletedFilterChanged(show_deleted) => {
                view_data.users.set_show_deleted(*show_deleted);
                view_data.offers.set_show_deleted(*show_deleted);
                view_data.verifications.set_show_deleted(*show_deleted);
                clamp_cursor(state, view_data);
                if let Err(error) = runtime.save_show_deleted(*show_deleted) {
                    emit_status(
                        state,
                        view_data,
                        internal_tx,
                        format!("preference save failed: {error:#}"),
                    );
                }
            }
            AppEvent::StatusUpdated(_) => status_updated = true,
            AppEvent::ModeChanged(_)
            | AppEvent::SessionStarted
            | AppEvent::SessionEnded
            | AppEvent::StatusCleared => {}
        }
    }
    if status_updated {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: String,
) {
    state.dispatch(AppCommand::SetStatus(message));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

/// Returns true when the app should quit.
fn handle_key_event<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }
    if view_data.confirm.is_some() {
        handle_confirm_key(state, runtime, view_data, internal_tx, key);
        return false;
    }
    if view_data.filter_picker.visible {
        handle_filter_picker_key(state, view_data, internal_tx, key);
        return false;
    }
    match state.mode {
        AppMode::Login => handle_login_key(state, runtime, view_data, internal_tx, key),
        AppMode::Search => handle_search_key(state, view_data, key),
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_login_key<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            view_data.login.field = view_data.login.field.other();
        }
        KeyCode::Backspace => {
            match view_data.login.field {
                LoginField::Email => view_data.login.email.pop(),
                LoginField::Password => view_data.login.password.pop(),
            };
        }
        KeyCode::Enter => match view_data.login.field {
            LoginField::Email => view_data.login.field = LoginField::Password,
            LoginField::Password => submit_login(state, runtime, view_data, internal_tx),
        },
        KeyCode::Char(ch)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            match view_data.login.field {
                LoginField::Email => view_data.login.email.push(ch),
                LoginField::Password => view_data.login.password.push(ch),
            }
        }
        _ => {}
    }
}

fn handle_search_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            let mut term = active_search(state, view_data);
            term.pop();
            apply_search(state, view_data, &term);
        }
        KeyCode::Char(ch)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            let mut term = active_search(state, view_data);
            term.push(ch);
            apply_search(state, view_data, &term);
        }
        _ => {}
    }
}

fn handle_nav_key<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Char('f'), KeyModifiers::NONE) | (KeyCode::Right, _) => {
            dispatch_command(state, runtime, view_data, internal_tx, AppCommand::NextScreen);
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) | (KeyCode::Left, _) => {
            dispatch_command(state, runtime, view_data, internal_tx, AppCommand::PrevScreen);
        }
        (KeyCode::Char('/'), _) if state.active_screen.is_list() => {
            dispatch_command(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::EnterSearchMode,
            );
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) if state.active_screen.is_list() => {
            clear_restrictions(state, view_data);
            emit_status(state, view_data, internal_tx, "restrictions cleared".to_owned());
        }
        (KeyCode::Char('F'), _) if state.active_screen.is_list() => {
            open_filter_picker(state, view_data);
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) if state.active_screen.is_list() => {
            let status = cycle_sort(state, view_data);
            emit_status(state, view_data, internal_tx, status);
        }
        (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
            move_cursor(state, view_data, 1);
        }
        (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
            move_cursor(state, view_data, -1);
        }
        (KeyCode::Char('h'), KeyModifiers::NONE) => {
            step_page(state, runtime, view_data, internal_tx, -1);
        }
        (KeyCode::Char('l'), KeyModifiers::NONE) => {
            step_page(state, runtime, view_data, internal_tx, 1);
        }
        (KeyCode::Char('g'), KeyModifiers::NONE) => {
            jump_page(state, runtime, view_data, internal_tx, PageJump::First);
        }
        (KeyCode::Char('G'), _) => {
            jump_page(state, runtime, view_data, internal_tx, PageJump::Last);
        }
        (KeyCode::Char('z'), KeyModifiers::NONE) => {
            cycle_page_size(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('x'), KeyModifiers::NONE) => {
            dispatch_command(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::ToggleDeleted,
            );
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            refresh_active_screen(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('t'), KeyModifiers::NONE) if state.active_screen == ScreenKind::Users => {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::ToggleStatus);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) if state.active_screen == ScreenKind::Offers => {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::Accept);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE)
            if state.active_screen == ScreenKind::Verifications =>
        {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::Verify);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) if state.active_screen == ScreenKind::Users => {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::Delete);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) if state.active_screen == ScreenKind::Offers => {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::Decline);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE)
            if state.active_screen == ScreenKind::Verifications =>
        {
            request_row_action(state, runtime, view_data, internal_tx, RowAction::Reject);
        }
        (KeyCode::Char('L'), _) => sign_out(state, runtime, view_data, internal_tx),
        _ => {}
    }
}

fn handle_confirm_key<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
            if let Some(pending) = view_data.confirm.take() {
                dispatch_row_action(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    pending.record_id,
                    pending.patch,
                );
            }
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc => {
            view_data.confirm = None;
            emit_status(state, view_data, internal_tx, "action cancelled".to_owned());
        }
        _ => {}
    }
}

fn handle_filter_picker_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let values = state.active_screen.filter_values();
    match key.code {
        KeyCode::Esc => view_data.filter_picker = FilterPickerUiState::default(),
        KeyCode::Char('j') | KeyCode::Down => {
            if !values.is_empty() {
                view_data.filter_picker.cursor =
                    (view_data.filter_picker.cursor + 1).min(values.len() - 1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.filter_picker.cursor = view_data.filter_picker.cursor.saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            if let Some(value) = values.get(view_data.filter_picker.cursor) {
                let value = (*value).to_owned();
                if !view_data.filter_picker.selected.remove(&value) {
                    view_data.filter_picker.selected.insert(value);
                }
            }
        }
        KeyCode::Char('a') => view_data.filter_picker.selected.clear(),
        KeyCode::Enter => {
            let selected = std::mem::take(&mut view_data.filter_picker.selected);
            view_data.filter_picker = FilterPickerUiState::default();
            let summary = if selected.is_empty() {
                "filter cleared".to_owned()
            } else {
                format!(
                    "filter: {}",
                    selected
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            apply_filter(state, view_data, selected);
            emit_status(state, view_data, internal_tx, summary);
        }
        _ => {}
    }
}

fn request_row_action<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: RowAction,
) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    if !session.role.may_invoke(action) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("your role cannot {}", action.label()),
        );
        return;
    }
    match resolve_row_action(state, view_data, action) {
        Err(message) => emit_status(state, view_data, internal_tx, message),
        Ok((record_id, subject, patch)) => {
            if view_data.in_flight.contains(&(patch.screen(), record_id)) {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("an action for {subject} is already running"),
                );
                return;
            }
            if action.needs_confirm() {
                view_data.confirm = Some(PendingAction {
                    record_id,
                    patch,
                    prompt: format!("{} {}?", action.label(), subject),
                });
            } else {
                dispatch_row_action(state, runtime, view_data, internal_tx, record_id, patch);
            }
        }
    }
}

/// Maps the selected row and the requested action to the record id, a
/// human subject for prompts, and the patch a success will apply.
fn resolve_row_action(
    state: &AppState,
    view_data: &ViewData,
    action: RowAction,
) -> Result<(i64, String, RowPatch), String> {
    match (state.active_screen, action) {
        (ScreenKind::Users, RowAction::ToggleStatus) => {
            let user = selected_user(view_data).ok_or_else(|| "no row selected".to_owned())?;
            if user.deleted {
                return Err(format!("user {} is deleted", user.name));
            }
            Ok((
                user.id.get(),
                user.name.clone(),
                RowPatch::UserStatus(user.status.toggled()),
            ))
        }
        (ScreenKind::Users, RowAction::Delete) => {
            let user = selected_user(view_data).ok_or_else(|| "no row selected".to_owned())?;
            if user.deleted {
                return Err(format!("user {} is already deleted", user.name));
            }
            Ok((user.id.get(), user.name.clone(), RowPatch::UserDeleted))
        }
        (ScreenKind::Offers, RowAction::Accept | RowAction::Decline) => {
            let offer = selected_offer(view_data).ok_or_else(|| "no row selected".to_owned())?;
            if offer.status != OfferStatus::Pending {
                return Err(format!(
                    "offer {} is already {}",
                    offer.tender,
                    offer.status.as_str()
                ));
            }
            let status = if action == RowAction::Accept {
                OfferStatus::Accepted
            } else {
                OfferStatus::Declined
            };
            Ok((offer.id.get(), offer.tender.clone(), RowPatch::OfferStatus(status)))
        }
        (ScreenKind::Verifications, RowAction::Verify | RowAction::Reject) => {
            let verification =
                selected_verification(view_data).ok_or_else(|| "no row selected".to_owned())?;
            if verification.status != VerificationStatus::Pending {
                return Err(format!(
                    "verification {} is already {}",
                    verification.company,
                    verification.status.as_str()
                ));
            }
            let status = if action == RowAction::Verify {
                VerificationStatus::Verified
            } else {
                VerificationStatus::Rejected
            };
            Ok((
                verification.id.get(),
                verification.company.clone(),
                RowPatch::VerificationStatus(status),
            ))
        }
        _ => Err(format!("cannot {} here", action.label())),
    }
}

fn dispatch_row_action<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    record_id: i64,
    patch: RowPatch,
) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    let token = session.token.clone();
    view_data.in_flight.insert((patch.screen(), record_id));
    if let Err(error) = runtime.spawn_row_action(record_id, patch, &token, internal_tx.clone()) {
        view_data.in_flight.remove(&(patch.screen(), record_id));
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("action failed to start: {error:#}"),
        );
    }
}

fn cycle_sort(state: &AppState, view_data: &mut ViewData) -> String {
    view_data.cursor = 0;
    match state.active_screen {
        ScreenKind::Users => advance_sort(&mut view_data.users, &UserSortKey::ALL, |key| {
            key.label()
        }),
        ScreenKind::Offers => advance_sort(&mut view_data.offers, &OfferSortKey::ALL, |key| {
            key.label()
        }),
        ScreenKind::Verifications => {
            advance_sort(&mut view_data.verifications, &VerificationSortKey::ALL, |key| {
                key.label()
            })
        }
        ScreenKind::Dashboard | ScreenKind::Profile => String::new(),
    }
}

/// Walks the cycle none -> first key asc -> desc -> next key asc -> ...
/// -> unsorted, one step per call.
fn advance_sort<R: ListRecord>(
    controller: &mut ListController<R>,
    keys: &[R::SortKey],
    label_of: impl Fn(R::SortKey) -> &'static str,
) -> String {
    match controller.sort() {
        None => match keys.first() {
            Some(&first) => {
                controller.set_sort(first);
                format!("sort: {} asc", label_of(first))
            }
            None => String::new(),
        },
        Some(spec) if spec.direction == SortDirection::Asc => {
            // Same key toggles to descending.
            controller.set_sort(spec.key);
            format!("sort: {} desc", label_of(spec.key))
        }
        Some(spec) => {
            let position = keys.iter().position(|key| *key == spec.key);
            match position {
                Some(index) if index + 1 < keys.len() => {
                    let next = keys[index + 1];
                    controller.set_sort(next);
                    format!("sort: {} asc", label_of(next))
                }
                _ => {
                    controller.clear_sort();
                    "sort cleared".to_owned()
                }
            }
        }
    }
}

fn open_filter_picker(state: &AppState, view_data: &mut ViewData) {
    let values = state.active_screen.filter_values();
    if values.is_empty() {
        return;
    }
    view_data.filter_picker = FilterPickerUiState {
        visible: true,
        cursor: 0,
        selected: active_filter(state, view_data),
    };
}

fn active_filter(state: &AppState, view_data: &ViewData) -> BTreeSet<String> {
    match state.active_screen {
        ScreenKind::Users => view_data.users.filter().clone(),
        ScreenKind::Offers => view_data.offers.filter().clone(),
        ScreenKind::Verifications => view_data.verifications.filter().clone(),
        ScreenKind::Dashboard | ScreenKind::Profile => BTreeSet::new(),
    }
}

fn apply_filter(state: &AppState, view_data: &mut ViewData, values: BTreeSet<String>) {
    match state.active_screen {
        ScreenKind::Users => view_data.users.set_filter(values),
        ScreenKind::Offers => view_data.offers.set_filter(values),
        ScreenKind::Verifications => view_data.verifications.set_filter(values),
        ScreenKind::Dashboard | ScreenKind::Profile => {}
    }
    view_data.cursor = 0;
}

fn active_search(state: &AppState, view_data: &ViewData) -> String {
    match state.active_screen {
        ScreenKind::Users => view_data.users.search().to_owned(),
        ScreenKind::Offers => view_data.offers.search().to_owned(),
        ScreenKind::Verifications => view_data.verifications.search().to_owned(),
        ScreenKind::Dashboard | ScreenKind::Profile => String::new(),
    }
}

fn apply_search(state: &AppState, view_data: &mut ViewData, term: &str) {
    match state.active_screen {
        ScreenKind::Users => view_data.users.set_search(term),
        ScreenKind::Offers => view_data.offers.set_search(term),
        ScreenKind::Verifications => view_data.verifications.set_search(term),
        ScreenKind::Dashboard | ScreenKind::Profile => {}
    }
    view_data.cursor = 0;
}

fn clear_restrictions(state: &AppState, view_data: &mut ViewData) {
    match state.active_screen {
        ScreenKind::Users => view_data.users.reset_transient(),
        ScreenKind::Offers => view_data.offers.reset_transient(),
        ScreenKind::Verifications => view_data.verifications.reset_transient(),
        ScreenKind::Dashboard | ScreenKind::Profile => {}
    }
    view_data.cursor = 0;
}

enum PageJump {
    First,
    Last,
}

fn step_page<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    if !state.active_screen.is_list() {
        return;
    }
    let current = active_page(state, view_data);
    let target = current.saturating_add_signed(delta).max(1);
    set_active_page(state, runtime, view_data, internal_tx, target);
}

fn jump_page<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    jump: PageJump,
) {
    if !state.active_screen.is_list() {
        return;
    }
    let target = match jump {
        PageJump::First => 1,
        PageJump::Last => active_page_count(state, view_data).max(1),
    };
    set_active_page(state, runtime, view_data, internal_tx, target);
}

fn active_page(state: &AppState, view_data: &ViewData) -> usize {
    match state.active_screen {
        ScreenKind::Users => view_data.users.page(),
        ScreenKind::Offers => view_data.offers.page(),
        ScreenKind::Verifications => view_data.verifications.page(),
        ScreenKind::Dashboard | ScreenKind::Profile => 1,
    }
}

fn active_page_count(state: &AppState, view_data: &ViewData) -> usize {
    match state.active_screen {
        ScreenKind::Users => view_data.users.project().page_count,
        ScreenKind::Offers => view_data.offers.project().page_count,
        ScreenKind::Verifications => view_data.verifications.project().page_count,
        ScreenKind::Dashboard | ScreenKind::Profile => 0,
    }
}

fn set_active_page<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: usize,
) {
    let before = active_page(state, view_data);
    match state.active_screen {
        ScreenKind::Users => view_data.users.set_page(target),
        ScreenKind::Offers => view_data.offers.set_page(target),
        ScreenKind::Verifications => view_data.verifications.set_page(target),
        ScreenKind::Dashboard | ScreenKind::Profile => return,
    }
    let after = active_page(state, view_data);
    if after == before {
        return;
    }
    view_data.cursor = 0;
    if let Err(error) = runtime.save_page(state.active_screen, after) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("page save failed: {error:#}"),
        );
    }
}

fn cycle_page_size<R: PortalRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let current = view_data.users.page_size();
    let next = match PAGE_SIZES.iter().position(|size| *size == current) {
        Some(index) => PAGE_SIZES[(index + 1) % PAGE_SIZES.len()],
        None => PAGE_SIZES[0],
    };
    view_data.users.set_page_size(next);
    view_data.offers.set_page_size(next);
    view_data.verifications.set_page_size(next);
    clamp_cursor(state, view_data);
    if let Err(error) = runtime.save_page_size(next) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("preference save failed: {error:#}"),
        );
        return;
    }
    emit_status(state, view_data, internal_tx, format!("page size {next}"));
}

fn visible_row_count(state: &AppState, view_data: &ViewData) -> usize {
    match state.active_screen {
        ScreenKind::Users => view_data.users.project().rows.len(),
        ScreenKind::Offers => view_data.offers.project().rows.len(),
        ScreenKind::Verifications => view_data.verifications.project().rows.len(),
        ScreenKind::Dashboard | ScreenKind::Profile => 0,
    }
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData) {
    let rows = visible_row_count(state, view_data);
    view_data.cursor = view_data.cursor.min(rows.saturating_sub(1));
}

fn move_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let rows = visible_row_count(state, view_data);
    if rows == 0 {
        view_data.cursor = 0;
        return;
    }
    let current = view_data.cursor as isize;
    view_data.cursor = (current + delta).clamp(0, rows as isize - 1) as usize;
}

fn selected_user(view_data: &ViewData) -> Option<UserRecord> {
    view_data
        .users
        .project()
        .rows
        .get(view_data.cursor)
        .map(|user| (*user).clone())
}

fn selected_offer(view_data: &ViewData) -> Option<OfferRecord> {
    view_data
        .offers
        .project()
        .rows
        .get(view_data.cursor)
        .map(|offer| (*offer).clone())
}

fn selected_verification(view_data: &ViewData) -> Option<VerificationRecord> {
    view_data
        .verifications
        .project()
        .rows
        .get(view_data.cursor)
        .map(|verification| (*verification).clone())
}

fn render(frame: &mut Frame, state: &AppState, view_data: &ViewData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0], state);
    render_body(frame, chunks[1], state, view_data);
    render_status_bar(frame, chunks[2], state, view_data);

    if view_data.filter_picker.visible {
        render_filter_overlay(frame, state, view_data);
    }
    if let Some(pending) = &view_data.confirm {
        render_confirm_overlay(frame, pending);
    }
    if view_data.help_visible {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("procura");
    match &state.session {
        Some(session) => {
            let screens = session.role.screens();
            let titles = screens.iter().map(|screen| screen.label());
            let selected = screens
                .iter()
                .position(|screen| *screen == state.active_screen)
                .unwrap_or(0);
            let tabs = Tabs::new(titles)
                .block(block)
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .select(selected);
            frame.render_widget(tabs, area);
        }
        None => {
            frame.render_widget(Paragraph::new("sign in").block(block), area);
        }
    }
}

fn render_body(frame: &mut Frame, area: Rect, state: &AppState, view_data: &ViewData) {
    if state.session.is_none() {
        let paragraph = Paragraph::new(login_text(view_data))
            .block(Block::default().borders(Borders::ALL).title("sign in"));
        frame.render_widget(paragraph, area);
        return;
    }
    match state.active_screen {
        ScreenKind::Dashboard => {
            let paragraph = Paragraph::new(dashboard_text(state, view_data))
                .block(Block::default().borders(Borders::ALL).title("dashboard"));
            frame.render_widget(paragraph, area);
        }
        ScreenKind::Profile => {
            let paragraph = Paragraph::new(profile_text(state))
                .block(Block::default().borders(Borders::ALL).title("profile"));
            frame.render_widget(paragraph, area);
        }
        ScreenKind::Users | ScreenKind::Offers | ScreenKind::Verifications => {
            if let Some(table) = screen_table(state, view_data) {
                render_table(frame, area, view_data, table);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, view_data: &ViewData) {
    let paragraph = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(paragraph, area);
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if state.mode == AppMode::Search {
        return format!("[search] {}_", active_search(state, view_data));
    }
    let mode = match state.mode {
        AppMode::Login => "login",
        AppMode::Nav => "nav",
        AppMode::Search => "search",
    };
    match &state.status_line {
        Some(status) => format!("[{mode}] {status}"),
        None if state.mode == AppMode::Login => format!("[{mode}] enter your portal credentials"),
        None => format!("[{mode}] ? help · ctrl-q quit"),
    }
}

fn login_text(view_data: &ViewData) -> String {
    let login = &view_data.login;
    let email_marker = if login.field == LoginField::Email { ">" } else { " " };
    let password_marker = if login.field == LoginField::Password { ">" } else { " " };
    let password_mask = "\u{2022}".repeat(login.password.chars().count());
    let footer = if login.busy {
        "signing in..."
    } else {
        "enter submits · tab switches fields"
    };
    format!(
        "\n {email_marker} email     {}\n {password_marker} password  {password_mask}\n\n {footer}",
        login.email
    )
}

fn dashboard_text(state: &AppState, view_data: &ViewData) -> String {
    let Some(session) = &state.session else {
        return String::new();
    };
    format!(
        "signed in as {} ({})\n\nusers: {}\npending offers: {}\npending verifications: {}",
        session.name,
        session.role.as_str(),
        view_data.counts.users,
        view_data.counts.offers_pending,
        view_data.counts.verifications_pending
    )
}

fn profile_text(state: &AppState) -> String {
    let Some(session) = &state.session else {
        return String::new();
    };
    let mut text = format!(
        "name   {}\nemail  {}\nrole   {}",
        session.name,
        session.email,
        session.role.as_str()
    );
    if let Some(company) = &session.company {
        text.push_str(&format!("\ncompany  {company}"));
    }
    text
}

struct ScreenTable {
    title: String,
    columns: &'static [&'static str],
    rows: Vec<TableRow>,
}

struct TableRow {
    cells: Vec<String>,
    deleted: bool,
}

fn screen_table(state: &AppState, view_data: &ViewData) -> Option<ScreenTable> {
    let mut table = match state.active_screen {
        ScreenKind::Users => users_table(&view_data.users),
        ScreenKind::Offers => offers_table(&view_data.offers),
        ScreenKind::Verifications => verifications_table(&view_data.verifications),
        ScreenKind::Dashboard | ScreenKind::Profile => return None,
    };
    if view_data.active_fetches.contains_key(&state.active_screen) {
        table.title.push_str(" · loading");
    }
    Some(table)
}

fn users_table(controller: &ListController<UserRecord>) -> ScreenTable {
    let sort = controller
        .sort()
        .map(|spec| format!("{} {}", spec.key.label(), spec.direction.label()));
    let rows = controller
        .project()
        .rows
        .iter()
        .map(|user| TableRow {
            cells: vec![
                user.id.get().to_string(),
                user.name.clone(),
                user.email.clone(),
                user.role.as_str().to_owned(),
                user.status.label().to_owned(),
                user.company.clone().unwrap_or_default(),
            ],
            deleted: user.deleted,
        })
        .collect();
    ScreenTable {
        title: table_title("users", controller, sort),
        columns: &["id", "name", "email", "role", "status", "company"],
        rows,
    }
}

fn offers_table(controller: &ListController<OfferRecord>) -> ScreenTable {
    let sort = controller
        .sort()
        .map(|spec| format!("{} {}", spec.key.label(), spec.direction.label()));
    let rows = controller
        .project()
        .rows
        .iter()
        .map(|offer| TableRow {
            cells: vec![
                offer.id.get().to_string(),
                offer.tender.clone(),
                offer.company.clone(),
                offer.price.clone().unwrap_or_default(),
                offer.status.as_str().to_owned(),
                offer.submitted_at.clone().unwrap_or_default(),
            ],
            deleted: offer.deleted,
        })
        .collect();
    ScreenTable {
        title: table_title("offers", controller, sort),
        columns: &["id", "tender", "company", "price", "status", "submitted"],
        rows,
    }
}

fn verifications_table(controller: &ListController<VerificationRecord>) -> ScreenTable {
    let sort = controller
        .sort()
        .map(|spec| format!("{} {}", spec.key.label(), spec.direction.label()));
    let rows = controller
        .project()
        .rows
        .iter()
        .map(|verification| TableRow {
            cells: vec![
                verification.id.get().to_string(),
                verification.company.clone(),
                verification.email.clone().unwrap_or_default(),
                verification.status.as_str().to_owned(),
                verification.submitted_at.clone().unwrap_or_default(),
            ],
            deleted: verification.deleted,
        })
        .collect();
    ScreenTable {
        title: table_title("verifications", controller, sort),
        columns: &["id", "company", "email", "status", "submitted"],
        rows,
    }
}

fn table_title<R: ListRecord>(
    label: &str,
    controller: &ListController<R>,
    sort: Option<String>,
) -> String {
    let projection = controller.project();
    let mut title = if projection.filtered_count == 0 {
        format!("{label} · no rows")
    } else {
        let start = (projection.page - 1) * controller.page_size() + 1;
        let end = (start + projection.rows.len()).saturating_sub(1);
        format!(
            "{label} {start}-{end} of {} · page {}/{}",
            projection.filtered_count, projection.page, projection.page_count
        )
    };
    if !controller.search().is_empty() {
        title.push_str(&format!(" · search \"{}\"", controller.search()));
    }
    if !controller.filter().is_empty() {
        title.push_str(&format!(" · filter {}", controller.filter().len()));
    }
    if let Some(sort) = sort {
        title.push_str(&format!(" · sort {sort}"));
    }
    if controller.show_deleted() {
        title.push_str(" · deleted shown");
    }
    title
}

fn render_table(frame: &mut Frame, area: Rect, view_data: &ViewData, table: ScreenTable) {
    let header = Row::new(table.columns.iter().map(|column| {
        Cell::from(*column).style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
    }));
    let rows = table.rows.iter().enumerate().map(|(index, row)| {
        let selected = index == view_data.cursor;
        let mut style = Style::default();
        if selected {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
        }
        if row.deleted {
            style = style.add_modifier(Modifier::CROSSED_OUT);
            if !selected {
                style = style.fg(Color::DarkGray);
            }
        }
        Row::new(row.cells.iter().map(|cell| Cell::from(cell.as_str()))).style(style)
    });
    let mut widths = vec![Constraint::Min(8); table.columns.len()];
    widths[0] = Constraint::Length(6);
    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(table.title.as_str()),
        );
    frame.render_widget(widget, area);
}

fn render_confirm_overlay(frame: &mut Frame, pending: &PendingAction) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(format!("{}\n\ny confirms, n cancels", pending.prompt))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("confirm"));
    frame.render_widget(paragraph, area);
}

fn render_filter_overlay(frame: &mut Frame, state: &AppState, view_data: &ViewData) {
    let area = centered_rect(40, 40, frame.area());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(filter_picker_text(state, view_data))
        .block(Block::default().borders(Borders::ALL).title("filter"));
    frame.render_widget(paragraph, area);
}

fn filter_picker_text(state: &AppState, view_data: &ViewData) -> String {
    let values = state.active_screen.filter_values();
    let mut lines = Vec::with_capacity(values.len() + 2);
    for (index, value) in values.iter().enumerate() {
        let cursor = if index == view_data.filter_picker.cursor { ">" } else { " " };
        let mark = if view_data.filter_picker.selected.contains(*value) { "x" } else { " " };
        lines.push(format!("{cursor} [{mark}] {value}"));
    }
    lines.push(String::new());
    lines.push("space toggles, a clears, enter applies, esc cancels".to_owned());
    lines.join("\n")
}

const HELP_TEXT: &str = "\
f/b  next / previous screen
j/k  move row selection
h/l  previous / next page
g/G  first / last page
/    search the visible list
F    filter by role or status
s    cycle sort column and direction
c    clear search, filter, and sort
z    cycle page size
x    show or hide deleted rows
r    reload the current screen
t    toggle a user between active and inactive
a    accept an offer or verify a company
d    delete, decline, or reject
L    sign out
ctrl-q  quit";

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("keys"));
    frame.render_widget(paragraph, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100 - height_percent) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_app::{OfferId, Role, UserId};

    #[derive(Default)]
    struct TestRuntime {
        users: Vec<UserRecord>,
        offers: Vec<OfferRecord>,
        verifications: Vec<VerificationRecord>,
        counts: PortalCounts,
        login_error: Option<String>,
        restore_error: Option<String>,
        fetch_error: Option<String>,
        action_error: Option<String>,
        restorable: Option<SessionContext>,
        login_count: usize,
        fetch_count: usize,
        counts_count: usize,
        action_count: usize,
        logout_count: usize,
        page_saves: usize,
        last_action: Option<(i64, RowPatch)>,
        saved_pages: BTreeMap<ScreenKind, usize>,
        saved_session: Option<SessionContext>,
        saved_show_deleted: Option<bool>,
        saved_page_size: Option<usize>,
        config_page_size: usize,
        config_show_deleted: bool,
    }

    impl PortalRuntime for TestRuntime {
        fn login(&mut self, email: &str, _password: &str) -> Result<SessionContext> {
            self.login_count += 1;
            if let Some(error) = self.login_error.take() {
                return Err(anyhow!("{error}"));
            }
            Ok(SessionContext {
                token: "tok-test".to_owned(),
                name: "Dana".to_owned(),
                email: email.to_owned(),
                role: Role::Admin,
                company: None,
            })
        }

        fn logout(&mut self) -> Result<()> {
            self.logout_count += 1;
            self.saved_session = None;
            Ok(())
        }

        fn restore_session(&mut self) -> Result<Option<SessionContext>> {
            if let Some(error) = self.restore_error.take() {
                return Err(anyhow!("{error}"));
            }
            Ok(self.restorable.clone())
        }

        fn fetch_dataset(&mut self, screen: ScreenKind, _token: &str) -> Result<ScreenData> {
            self.fetch_count += 1;
            if let Some(error) = self.fetch_error.take() {
                return Err(anyhow!("{error}"));
            }
            match screen {
                ScreenKind::Users => Ok(ScreenData::Users(self.users.clone())),
                ScreenKind::Offers => Ok(ScreenData::Offers(self.offers.clone())),
                ScreenKind::Verifications => {
                    Ok(ScreenData::Verifications(self.verifications.clone()))
                }
                ScreenKind::Dashboard | ScreenKind::Profile => Err(anyhow!("not a list screen")),
            }
        }

        fn fetch_counts(&mut self, _token: &str) -> Result<PortalCounts> {
            self.counts_count += 1;
            Ok(self.counts)
        }

        fn run_row_action(&mut self, record_id: i64, patch: RowPatch, _token: &str) -> Result<()> {
            self.action_count += 1;
            self.last_action = Some((record_id, patch));
            if let Some(error) = self.action_error.take() {
                return Err(anyhow!("{error}"));
            }
            Ok(())
        }

        fn save_session(&mut self, session: &SessionContext) -> Result<()> {
            self.saved_session = Some(session.clone());
            Ok(())
        }

        fn save_page(&mut self, screen: ScreenKind, page: usize) -> Result<()> {
            self.page_saves += 1;
            self.saved_pages.insert(screen, page);
            Ok(())
        }

        fn load_page(&mut self, screen: ScreenKind) -> Result<Option<usize>> {
            Ok(self.saved_pages.get(&screen).copied())
        }

        fn save_show_deleted(&mut self, show_deleted: bool) -> Result<()> {
            self.saved_show_deleted = Some(show_deleted);
            Ok(())
        }

        fn save_page_size(&mut self, page_size: usize) -> Result<()> {
            self.saved_page_size = Some(page_size);
            Ok(())
        }

        fn initial_page_size(&mut self) -> usize {
            if self.config_page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                self.config_page_size
            }
        }

        fn initial_show_deleted(&mut self) -> bool {
            self.config_show_deleted
        }
    }

    fn session_for(role: Role) -> SessionContext {
        SessionContext {
            token: "tok-1".to_owned(),
            name: "Dana".to_owned(),
            email: "dana@example.com".to_owned(),
            role,
            company: None,
        }
    }

    fn test_user(id: i64, name: &str, role: Role, status: AccountStatus) -> UserRecord {
        UserRecord {
            id: UserId::new(id),
            name: name.to_owned(),
            email: format!("user{id}@example.com"),
            role,
            status,
            company: None,
            deleted: false,
        }
    }

    fn user_batch(count: i64) -> Vec<UserRecord> {
        (1..=count)
            .map(|id| {
                test_user(
                    id,
                    &format!("User {id:02}"),
                    Role::Supplier,
                    AccountStatus::Active,
                )
            })
            .collect()
    }

    fn test_offer(id: i64, tender: &str, status: OfferStatus) -> OfferRecord {
        OfferRecord {
            id: OfferId::new(id),
            tender: tender.to_owned(),
            company: "Sanoh Indonesia".to_owned(),
            price: Some("1200.50".to_owned()),
            status,
            submitted_at: Some("2026-03-14T09:30:00Z".to_owned()),
            deleted: false,
        }
    }

    fn channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
        mpsc::channel()
    }

    fn pump(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
    ) {
        process_internal_events(state, runtime, view_data, tx, rx);
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) {
        handle_key_event(state, runtime, view_data, tx, KeyEvent::new(code, modifiers));
        pump(state, runtime, view_data, tx, rx);
    }

    fn press_char(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
        ch: char,
    ) {
        press(state, runtime, view_data, tx, rx, KeyCode::Char(ch), KeyModifiers::NONE);
    }

    fn signed_in(
        runtime: &mut TestRuntime,
        role: Role,
    ) -> (AppState, ViewData, Sender<InternalEvent>, Receiver<InternalEvent>) {
        let (tx, rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();
        begin_session(&mut state, runtime, &mut view_data, &tx, session_for(role));
        pump(&mut state, runtime, &mut view_data, &tx, &rx);
        (state, view_data, tx, rx)
    }

    fn visible_user_ids(view_data: &ViewData) -> Vec<i64> {
        view_data
            .users
            .project()
            .rows
            .iter()
            .map(|user| user.id.get())
            .collect()
    }

    #[test]
    fn typed_credentials_sign_in_and_persist_the_session() {
        let mut runtime = TestRuntime::default();
        let (tx, rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        for ch in "dana@example.com".chars() {
            press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, ch);
        }
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);
        for ch in "secret".chars() {
            press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, ch);
        }
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(runtime.login_count, 1);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(state.active_screen, ScreenKind::Dashboard);
        let session = state.session.as_ref().expect("session should be set");
        assert_eq!(session.email, "dana@example.com");
        assert!(runtime.saved_session.is_some());
        assert_eq!(runtime.counts_count, 1);
    }

    #[test]
    fn failed_sign_in_keeps_the_login_screen_and_shows_the_text() {
        let mut runtime = TestRuntime {
            login_error: Some("invalid credentials".to_owned()),
            ..TestRuntime::default()
        };
        let (tx, rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'a');
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'b');
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(state.mode, AppMode::Login);
        assert!(state.session.is_none());
        assert_eq!(
            state.status_line.as_deref(),
            Some("sign in failed: invalid credentials")
        );
        assert!(!view_data.login.busy);
    }

    #[test]
    fn empty_credentials_never_reach_the_runtime() {
        let mut runtime = TestRuntime::default();
        let (tx, rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(runtime.login_count, 0);
        assert_eq!(
            state.status_line.as_deref(),
            Some("email and password are required")
        );
    }

    #[test]
    fn saved_session_restores_without_a_login() {
        let mut runtime = TestRuntime {
            restorable: Some(session_for(Role::Admin)),
            ..TestRuntime::default()
        };
        let (tx, rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        restore_saved_session(&mut state, &mut runtime, &mut view_data, &tx);
        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);

        assert_eq!(state.mode, AppMode::Nav);
        assert!(state.session.is_some());
        assert_eq!(runtime.counts_count, 1);
        assert_eq!(runtime.login_count, 0);
    }

    #[test]
    fn broken_saved_session_reports_and_stays_at_login() {
        let mut runtime = TestRuntime {
            restore_error: Some("saved session has unknown role `root`".to_owned()),
            ..TestRuntime::default()
        };
        let (tx, _rx) = channel();
        let mut state = AppState::default();
        let mut view_data = ViewData::default();

        restore_saved_session(&mut state, &mut runtime, &mut view_data, &tx);

        assert_eq!(state.mode, AppMode::Login);
        let status = state.status_line.as_deref().unwrap_or_default();
        assert!(status.starts_with("session restore failed:"), "{status}");
    }

    #[test]
    fn entering_users_fetches_and_restores_the_saved_page() {
        let mut runtime = TestRuntime {
            users: user_batch(25),
            ..TestRuntime::default()
        };
        runtime.saved_pages.insert(ScreenKind::Users, 2);
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        assert_eq!(state.active_screen, ScreenKind::Users);
        assert_eq!(runtime.fetch_count, 1);
        assert_eq!(view_data.users.page(), 2);
        assert_eq!(visible_user_ids(&view_data), (11..=20).collect::<Vec<_>>());
    }

    #[test]
    fn page_keys_clamp_at_the_edges_and_persist_changes() {
        let mut runtime = TestRuntime {
            users: user_batch(25),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        assert_eq!(view_data.users.project().page_count, 3);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'l');
        assert_eq!(view_data.users.page(), 2);
        assert_eq!(runtime.saved_pages.get(&ScreenKind::Users), Some(&2));

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(view_data.users.page(), 3);
        assert_eq!(runtime.page_saves, 2);

        // Already on the last page; no save happens for a no-op move.
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'l');
        assert_eq!(view_data.users.page(), 3);
        assert_eq!(runtime.page_saves, 2);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'g');
        assert_eq!(view_data.users.page(), 1);
        assert_eq!(runtime.page_saves, 3);
    }

    #[test]
    fn search_applies_as_typed_and_survives_leaving_search_mode() {
        let mut runtime = TestRuntime {
            users: vec![
                test_user(1, "PT Sanoh Indonesia", Role::Supplier, AccountStatus::Active),
                test_user(2, "Borneo Steel", Role::Supplier, AccountStatus::Active),
                test_user(3, "Sanoh Logistics", Role::Supplier, AccountStatus::Active),
            ],
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, '/');
        assert_eq!(state.mode, AppMode::Search);
        for ch in "sanoh".chars() {
            press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, ch);
        }

        assert_eq!(visible_user_ids(&view_data), vec![1, 3]);
        assert_eq!(view_data.users.project().filtered_count, 2);

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(view_data.users.search(), "sanoh");
    }

    #[test]
    fn clear_key_drops_search_filter_and_sort_together() {
        let mut runtime = TestRuntime {
            users: user_batch(5),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 's');
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, '/');
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'u');
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Esc, KeyModifiers::NONE);
        assert!(view_data.users.sort().is_some());
        assert_eq!(view_data.users.search(), "u");

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'c');
        assert!(view_data.users.sort().is_none());
        assert_eq!(view_data.users.search(), "");
        assert!(view_data.users.filter().is_empty());
        assert_eq!(state.status_line.as_deref(), Some("restrictions cleared"));
    }

    #[test]
    fn filter_picker_narrows_to_the_chosen_roles() {
        let mut runtime = TestRuntime {
            users: vec![
                test_user(1, "Ana", Role::Admin, AccountStatus::Active),
                test_user(2, "Pia", Role::Purchasing, AccountStatus::Active),
                test_user(3, "Sam", Role::Supplier, AccountStatus::Active),
            ],
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Char('F'), KeyModifiers::SHIFT);
        assert!(view_data.filter_picker.visible);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'j');
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, ' ');
        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Enter, KeyModifiers::NONE);

        assert!(!view_data.filter_picker.visible);
        assert!(view_data.users.filter().contains("purchasing"));
        assert_eq!(visible_user_ids(&view_data), vec![2]);
        assert_eq!(state.status_line.as_deref(), Some("filter: purchasing"));
    }

    #[test]
    fn sort_key_walks_direction_then_column_then_clears() {
        let mut runtime = TestRuntime {
            users: vec![
                test_user(1, "Cedar", Role::Supplier, AccountStatus::Active),
                test_user(2, "Alder", Role::Supplier, AccountStatus::Active),
                test_user(3, "Birch", Role::Supplier, AccountStatus::Active),
            ],
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 's');
        assert_eq!(visible_user_ids(&view_data), vec![2, 3, 1]);
        assert_eq!(state.status_line.as_deref(), Some("sort: name asc"));

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 's');
        assert_eq!(visible_user_ids(&view_data), vec![1, 3, 2]);
        assert_eq!(state.status_line.as_deref(), Some("sort: name desc"));

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 's');
        assert_eq!(state.status_line.as_deref(), Some("sort: email asc"));
        assert_eq!(visible_user_ids(&view_data), vec![1, 2, 3]);

        // Four more steps: email desc, role asc, role desc, then unsorted.
        for _ in 0..4 {
            press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 's');
        }
        assert!(view_data.users.sort().is_none());
        assert_eq!(state.status_line.as_deref(), Some("sort cleared"));
    }

    #[test]
    fn page_size_cycle_applies_to_every_list_and_persists() {
        let mut runtime = TestRuntime {
            users: user_batch(30),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'z');

        assert_eq!(view_data.users.page_size(), 25);
        assert_eq!(view_data.offers.page_size(), 25);
        assert_eq!(view_data.verifications.page_size(), 25);
        assert_eq!(runtime.saved_page_size, Some(25));
        assert_eq!(state.status_line.as_deref(), Some("page size 25"));
        assert_eq!(view_data.users.project().rows.len(), 25);
    }

    #[test]
    fn deleted_rows_stay_hidden_until_toggled_on() {
        let mut users = user_batch(3);
        users[1].deleted = true;
        let mut runtime = TestRuntime {
            users,
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        assert_eq!(visible_user_ids(&view_data), vec![1, 3]);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'x');
        assert_eq!(visible_user_ids(&view_data), vec![1, 2, 3]);
        assert_eq!(runtime.saved_show_deleted, Some(true));
        assert_eq!(state.status_line.as_deref(), Some("deleted shown"));

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'x');
        assert_eq!(visible_user_ids(&view_data), vec![1, 3]);
        assert_eq!(runtime.saved_show_deleted, Some(false));
    }

    #[test]
    fn status_toggle_patches_one_record_and_refreshes_counts() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        let counts_before = runtime.counts_count;

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 't');

        assert_eq!(runtime.action_count, 1);
        assert_eq!(
            runtime.last_action,
            Some((1, RowPatch::UserStatus(AccountStatus::Inactive)))
        );
        let records = view_data.users.records();
        assert_eq!(records[0].status, AccountStatus::Inactive);
        assert_eq!(records[1].status, AccountStatus::Active);
        assert_eq!(state.status_line.as_deref(), Some("user 1 deactivated"));
        assert_eq!(runtime.counts_count, counts_before + 1);
    }

    #[test]
    fn rejected_action_changes_nothing_and_shows_the_exact_server_text() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            action_error: Some("forbidden".to_owned()),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        let before = view_data.users.records().to_vec();

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 't');

        assert_eq!(runtime.action_count, 1);
        assert_eq!(view_data.users.records(), before.as_slice());
        assert_eq!(state.status_line.as_deref(), Some("forbidden"));
        assert!(view_data.in_flight.is_empty());
    }

    #[test]
    fn delete_asks_first_and_cancelling_runs_nothing() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'd');
        let prompt = view_data.confirm.as_ref().map(|pending| pending.prompt.clone());
        assert_eq!(prompt.as_deref(), Some("delete User 01?"));

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'n');
        assert!(view_data.confirm.is_none());
        assert_eq!(runtime.action_count, 0);
        assert_eq!(state.status_line.as_deref(), Some("action cancelled"));

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'd');
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'y');
        assert_eq!(runtime.action_count, 1);
        assert_eq!(runtime.last_action, Some((1, RowPatch::UserDeleted)));
        assert!(view_data.users.records()[0].deleted);
        assert_eq!(visible_user_ids(&view_data), vec![2, 3]);
    }

    #[test]
    fn a_second_action_on_a_busy_row_is_refused() {
        let mut runtime = TestRuntime {
            users: user_batch(1),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        // No pump between the presses, so the first request is still on
        // the wire when the second arrives.
        handle_key_event(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE),
        );
        assert!(view_data.in_flight.contains(&(ScreenKind::Users, 1)));
        handle_key_event(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE),
        );

        assert_eq!(runtime.action_count, 1);
        let status = state.status_line.clone().unwrap_or_default();
        assert!(status.contains("already running"), "{status}");

        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(view_data.in_flight.is_empty());
        assert_eq!(view_data.users.records()[0].status, AccountStatus::Inactive);
    }

    #[test]
    fn stale_dataset_responses_are_dropped() {
        let mut runtime = TestRuntime {
            users: user_batch(25),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        assert_eq!(view_data.users.records().len(), 25);

        view_data.active_fetches.insert(ScreenKind::Users, 7);
        tx.send(InternalEvent::DatasetLoaded {
            screen: ScreenKind::Users,
            request_id: 6,
            result: Ok(ScreenData::Users(Vec::new())),
        })
        .expect("send stale response");
        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert_eq!(view_data.users.records().len(), 25);

        tx.send(InternalEvent::DatasetLoaded {
            screen: ScreenKind::Users,
            request_id: 7,
            result: Ok(ScreenData::Users(Vec::new())),
        })
        .expect("send current response");
        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(view_data.users.records().is_empty());
    }

    #[test]
    fn sign_out_clears_the_session_and_the_view() {
        let mut runtime = TestRuntime {
            users: user_batch(5),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        assert!(!view_data.users.records().is_empty());

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Char('L'), KeyModifiers::SHIFT);

        assert_eq!(runtime.logout_count, 1);
        assert_eq!(state.mode, AppMode::Login);
        assert!(state.session.is_none());
        assert!(view_data.users.records().is_empty());
        assert_eq!(state.status_line.as_deref(), Some("signed out"));
    }

    #[test]
    fn suppliers_see_offers_but_cannot_decide_them() {
        let mut runtime = TestRuntime {
            offers: vec![test_offer(1, "Brake Line Q3", OfferStatus::Pending)],
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Supplier);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');
        assert_eq!(state.active_screen, ScreenKind::Offers);
        assert_eq!(view_data.offers.records().len(), 1);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'a');

        assert_eq!(runtime.action_count, 0);
        assert!(view_data.confirm.is_none());
        assert_eq!(state.status_line.as_deref(), Some("your role cannot accept"));
    }

    #[test]
    fn settled_offers_cannot_be_decided_again() {
        let mut runtime = TestRuntime {
            offers: vec![test_offer(1, "Brake Line Q3", OfferStatus::Accepted)],
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Purchasing);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'a');

        assert_eq!(runtime.action_count, 0);
        assert!(view_data.confirm.is_none());
        assert_eq!(
            state.status_line.as_deref(),
            Some("offer Brake Line Q3 is already accepted")
        );
    }

    #[test]
    fn load_failure_keeps_the_old_rows_and_reports() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            fetch_error: Some("cannot reach http://portal.test (timed out)".to_owned()),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        assert!(view_data.users.records().is_empty());
        assert_eq!(
            state.status_line.as_deref(),
            Some("load failed: cannot reach http://portal.test (timed out)")
        );

        // A reload after the outage succeeds and fills the list.
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'r');
        assert_eq!(view_data.users.records().len(), 3);
    }

    #[test]
    fn only_the_latest_status_clear_token_wipes_the_line() {
        let mut runtime = TestRuntime::default();
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        assert_eq!(state.status_line.as_deref(), Some("signed in as Dana"));

        tx.send(InternalEvent::ClearStatus {
            token: view_data.status_token - 1,
        })
        .expect("send stale clear");
        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(state.status_line.is_some());

        tx.send(InternalEvent::ClearStatus {
            token: view_data.status_token,
        })
        .expect("send current clear");
        pump(&mut state, &mut runtime, &mut view_data, &tx, &rx);
        assert!(state.status_line.is_none());
    }

    #[test]
    fn help_overlay_opens_and_any_key_closes_it() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press(&mut state, &mut runtime, &mut view_data, &tx, &rx, KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(view_data.help_visible);

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'j');
        assert!(!view_data.help_visible);
        // The closing key is consumed, not forwarded.
        assert_eq!(view_data.cursor, 0);
    }

    #[test]
    fn dashboard_shows_the_fetched_counts() {
        let mut runtime = TestRuntime {
            counts: PortalCounts {
                users: 4,
                offers_pending: 2,
                verifications_pending: 1,
            },
            ..TestRuntime::default()
        };
        let (state, view_data, _tx, _rx) = signed_in(&mut runtime, Role::Admin);

        let text = dashboard_text(&state, &view_data);
        assert!(text.contains("signed in as Dana (admin)"), "{text}");
        assert!(text.contains("users: 4"), "{text}");
        assert!(text.contains("pending offers: 2"), "{text}");
        assert!(text.contains("pending verifications: 1"), "{text}");
    }

    #[test]
    fn table_title_reports_range_page_and_restrictions() {
        let mut controller: ListController<UserRecord> = ListController::new(10);
        controller.replace_records(user_batch(25));

        assert_eq!(users_table(&controller).title, "users 1-10 of 25 · page 1/3");

        controller.set_page(3);
        assert_eq!(users_table(&controller).title, "users 21-25 of 25 · page 3/3");

        controller.set_search("nobody");
        let title = users_table(&controller).title;
        assert!(title.starts_with("users · no rows"), "{title}");
        assert!(title.contains("search \"nobody\""), "{title}");
    }

    #[test]
    fn table_title_marks_a_fetch_still_in_flight() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        let settled = screen_table(&state, &view_data).expect("users table");
        assert!(!settled.title.contains("loading"), "{}", settled.title);

        view_data.active_fetches.insert(ScreenKind::Users, 9);
        let pending = screen_table(&state, &view_data).expect("users table");
        assert!(pending.title.ends_with("· loading"), "{}", pending.title);
    }

    #[test]
    fn cursor_keys_stay_inside_the_visible_page() {
        let mut runtime = TestRuntime {
            users: user_batch(3),
            ..TestRuntime::default()
        };
        let (mut state, mut view_data, tx, rx) = signed_in(&mut runtime, Role::Admin);
        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'f');

        press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'k');
        assert_eq!(view_data.cursor, 0);

        for _ in 0..5 {
            press_char(&mut state, &mut runtime, &mut view_data, &tx, &rx, 'j');
        }
        assert_eq!(view_data.cursor, 2);
    }
}
