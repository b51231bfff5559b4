// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, ScreenKind, SessionContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_screen: ScreenKind,
    pub session: Option<SessionContext>,
    pub show_deleted: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Login,
            active_screen: ScreenKind::Dashboard,
            session: None,
            show_deleted: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    EnterSearchMode,
    ExitToNav,
    ToggleDeleted,
    StartSession(SessionContext),
    EndSession,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    SessionStarted,
    SessionEnded,
    DeletedFilterChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::EnterSearchMode => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                if self.session.is_none() {
                    return Vec::new();
                }
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ToggleDeleted => {
                self.show_deleted = !self.show_deleted;
                let label = if self.show_deleted {
                    "deleted shown"
                } else {
                    "deleted hidden"
                };
                vec![
                    AppEvent::DeletedFilterChanged(self.show_deleted),
                    self.set_status(label),
                ]
            }
            AppCommand::StartSession(session) => {
                let greeting = format!("signed in as {}", session.name);
                self.session = Some(session);
                self.mode = AppMode::Nav;
                self.active_screen = ScreenKind::Dashboard;
                vec![
                    AppEvent::SessionStarted,
                    AppEvent::ModeChanged(self.mode),
                    AppEvent::ScreenChanged(self.active_screen),
                    self.set_status(&greeting),
                ]
            }
            AppCommand::EndSession => {
                self.session = None;
                self.mode = AppMode::Login;
                self.active_screen = ScreenKind::Dashboard;
                vec![
                    AppEvent::SessionEnded,
                    AppEvent::ModeChanged(self.mode),
                    self.set_status("signed out"),
                ]
            }
            AppCommand::SetStatus(message) => {
                vec![self.set_status(&message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// Rotation covers only the screens the signed-in role may open.
    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let screens = session.role.screens();
        let current = screens
            .iter()
            .position(|screen| *screen == self.active_screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_screen = screens[next];
        vec![AppEvent::ScreenChanged(self.active_screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
