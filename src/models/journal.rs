use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One journal entry. At most one entry exists per calendar date per
/// identity; the date is the key, not a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

/// Journal entries keyed by date. BTreeMap keeps them in chronological
/// order for listing and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    entries: BTreeMap<NaiveDate, JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&JournalEntry> {
        self.entries.get(&date)
    }

    pub fn upsert(&mut self, date: NaiveDate, entry: JournalEntry) {
        self.entries.insert(date, entry);
    }

    pub fn delete(&mut self, date: NaiveDate) -> bool {
        self.entries.remove(&date).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first, optionally filtered by a case-insensitive substring
    /// match over content, title, and the ISO date.
    pub fn search(&self, term: &str) -> Vec<(NaiveDate, &JournalEntry)> {
        let term = term.to_lowercase();
        self.entries
            .iter()
            .rev()
            .filter(|(date, entry)| {
                term.is_empty()
                    || entry.content.to_lowercase().contains(&term)
                    || entry
                        .title
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&term))
                    || date.to_string().contains(&term)
            })
            .map(|(date, entry)| (*date, entry))
            .collect()
    }

    /// Markdown export, oldest entry first, one `##` section per date.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, (date, entry)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str("---\n\n");
            }
            match &entry.title {
                Some(title) => out.push_str(&format!("## {date} — {title}\n\n")),
                None => out.push_str(&format!("## {date}\n\n")),
            }
            out.push_str(entry.content.trim_end());
            out.push_str("\n\n");
        }
        out
    }
}
