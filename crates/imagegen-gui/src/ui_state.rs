//! UI-specific state (ephemeral)

use std::collections::VecDeque;

use chrono::Local;
use imagegen_core::ThemePreference;

pub const MAX_LOG_ENTRIES: usize = 200;

/// Host-level UI state that is not part of any panel.
pub struct UiState {
    pub theme: Theme,
    pub activity_log_expanded: bool,
    pub activity_log: ActivityLog,
}

impl UiState {
    pub fn new(theme: ThemePreference, activity_log_expanded: bool) -> Self {
        Self {
            theme: theme.into(),
            activity_log_expanded,
            activity_log: ActivityLog::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl From<ThemePreference> for Theme {
    fn from(value: ThemePreference) -> Self {
        match value {
            ThemePreference::Dark => Theme::Dark,
            ThemePreference::Light => Theme::Light,
        }
    }
}

impl From<Theme> for ThemePreference {
    fn from(value: Theme) -> Self {
        match value {
            Theme::Dark => ThemePreference::Dark,
            Theme::Light => ThemePreference::Light,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Bounded in-app log of what panels did, newest last.
#[derive(Clone, Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_log_is_bounded() {
        let mut log = ActivityLog::default();
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            log.info(format!("entry {i}"));
        }
        assert_eq!(log.len(), MAX_LOG_ENTRIES);
        assert_eq!(log.entries().next().map(|e| e.message.as_str()), Some("entry 5"));
    }

    #[test]
    fn theme_round_trips_through_preference() {
        let theme = Theme::from(ThemePreference::Light);
        assert_eq!(theme, Theme::Light);
        assert_eq!(ThemePreference::from(theme.toggled()), ThemePreference::Dark);
    }
}
