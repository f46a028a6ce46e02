mod handler;
mod ui;

use serde::{Deserialize, Serialize};

pub use handler::{handle_key_event, AppAction};
pub use ui::draw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Reading,
    Reader,
    Journal,
}

impl Tab {
    pub fn next(self) -> Self {
        match self {
            Tab::Dashboard => Tab::Reading,
            Tab::Reading => Tab::Reader,
            Tab::Reader => Tab::Journal,
            Tab::Journal => Tab::Dashboard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Reading => "Reading",
            Tab::Reader => "Reader",
            Tab::Journal => "Journal",
        }
    }
}

/// Persisted display preference; guest-local in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Sunrise,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Sunrise,
            Theme::Sunrise => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Sunrise => "sunrise",
        }
    }
}

/// Book-list narrowing on the Reading tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookFilter {
    #[default]
    All,
    OldTestament,
    NewTestament,
}

impl BookFilter {
    pub fn next(self) -> Self {
        match self {
            BookFilter::All => BookFilter::OldTestament,
            BookFilter::OldTestament => BookFilter::NewTestament,
            BookFilter::NewTestament => BookFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BookFilter::All => "all books",
            BookFilter::OldTestament => "Old Testament",
            BookFilter::NewTestament => "New Testament",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    None,
    Name,
    Email,
    Password,
    Search,
    JournalEdit,
}
