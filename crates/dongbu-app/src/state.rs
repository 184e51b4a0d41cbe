// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, TabKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: TabKind,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: TabKind::Board,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    SetActiveTab(TabKind),
    OpenForm(FormKind),
    CloseForm,
    EnterSearch,
    ExitSearch,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(TabKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn with_tab(active_tab: TabKind) -> Self {
        Self {
            active_tab,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.switch_tab(self.active_tab.next()),
            AppCommand::PrevTab => self.switch_tab(self.active_tab.prev()),
            AppCommand::SetActiveTab(tab) => self.switch_tab(tab),
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::CloseForm | AppCommand::ExitSearch => {
                if self.mode == AppMode::Nav {
                    return Vec::new();
                }
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::EnterSearch => {
                if self.active_tab != TabKind::Storage {
                    return vec![self.set_status("search is only available on storage")];
                }
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn switch_tab(&mut self, tab: TabKind) -> Vec<AppEvent> {
        if tab == self.active_tab {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if self.mode != AppMode::Nav {
            self.mode = AppMode::Nav;
            events.push(AppEvent::ModeChanged(self.mode));
        }
        self.active_tab = tab;
        events.push(AppEvent::TabChanged(tab));
        events
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::{AppMode, FormKind, TabKind};

    #[test]
    fn tab_rotation_wraps() {
        let mut state = AppState::with_tab(TabKind::Account);

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, TabKind::Board);
        assert_eq!(events, vec![AppEvent::TabChanged(TabKind::Board)]);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, TabKind::Account);
    }

    #[test]
    fn switching_tabs_leaves_form_mode() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenForm(FormKind::Comment));

        let events = state.dispatch(AppCommand::SetActiveTab(TabKind::Car));
        assert_eq!(
            events,
            vec![
                AppEvent::ModeChanged(AppMode::Nav),
                AppEvent::TabChanged(TabKind::Car),
            ]
        );
    }

    #[test]
    fn selecting_the_current_tab_is_a_no_op() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::SetActiveTab(TabKind::Board)).is_empty());
    }

    #[test]
    fn search_is_limited_to_storage() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::EnterSearch);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated(
                "search is only available on storage".to_owned()
            )]
        );

        state.dispatch(AppCommand::SetActiveTab(TabKind::Storage));
        state.dispatch(AppCommand::EnterSearch);
        assert_eq!(state.mode, AppMode::Search);
        state.dispatch(AppCommand::ExitSearch);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetStatus("saved comment".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("saved comment"));

        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
    }

    #[test]
    fn closing_a_form_in_nav_emits_nothing() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::CloseForm).is_empty());
    }
}
