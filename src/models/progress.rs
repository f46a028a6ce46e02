use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Chapters marked read, keyed by book name. Chapter lists are always
/// sorted ascending and contain no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingProgress {
    books: BTreeMap<String, Vec<u32>>,
}

impl ReadingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, book: &str, chapter: u32) -> bool {
        self.books
            .get(book)
            .is_some_and(|chapters| chapters.binary_search(&chapter).is_ok())
    }

    /// Insert keeping the list sorted. Returns false if already present.
    pub fn insert(&mut self, book: &str, chapter: u32) -> bool {
        let chapters = self.books.entry(book.to_string()).or_default();
        match chapters.binary_search(&chapter) {
            Ok(_) => false,
            Err(pos) => {
                chapters.insert(pos, chapter);
                true
            }
        }
    }

    /// Returns false if the chapter was not marked read.
    pub fn remove(&mut self, book: &str, chapter: u32) -> bool {
        let Some(chapters) = self.books.get_mut(book) else {
            return false;
        };
        match chapters.binary_search(&chapter) {
            Ok(pos) => {
                chapters.remove(pos);
                if chapters.is_empty() {
                    self.books.remove(book);
                }
                true
            }
            Err(_) => false,
        }
    }

    pub fn chapters(&self, book: &str) -> &[u32] {
        self.books.get(book).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn read_count(&self) -> usize {
        self.books.values().map(Vec::len).sum()
    }

    /// Rebuild from individual (book, chapter) rows, e.g. a remote result
    /// set. Rows may arrive in any order; lists come out sorted and deduped.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut progress = Self::new();
        for (book, chapter) in rows {
            progress.insert(&book, chapter);
        }
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_chapters_sorted() {
        let mut progress = ReadingProgress::new();
        progress.insert("Genesis", 5);
        progress.insert("Genesis", 3);
        assert_eq!(progress.chapters("Genesis"), &[3, 5]);
    }

    #[test]
    fn insert_is_set_like() {
        let mut progress = ReadingProgress::new();
        assert!(progress.insert("John", 3));
        assert!(!progress.insert("John", 3));
        assert_eq!(progress.chapters("John"), &[3]);
    }

    #[test]
    fn remove_drops_empty_books() {
        let mut progress = ReadingProgress::new();
        progress.insert("Jude", 1);
        assert!(progress.remove("Jude", 1));
        assert!(!progress.remove("Jude", 1));
        assert_eq!(progress.read_count(), 0);
    }

    #[test]
    fn toggle_parity() {
        // Final membership is true iff the number of toggles is odd.
        let mut progress = ReadingProgress::new();
        for n in 1..=5 {
            if progress.contains("Psalms", 23) {
                progress.remove("Psalms", 23);
            } else {
                progress.insert("Psalms", 23);
            }
            assert_eq!(progress.contains("Psalms", 23), n % 2 == 1);
        }
    }

    #[test]
    fn from_rows_sorts_and_dedupes() {
        let rows = vec![
            ("Romans".to_string(), 8),
            ("Romans".to_string(), 1),
            ("Romans".to_string(), 8),
        ];
        let progress = ReadingProgress::from_rows(rows);
        assert_eq!(progress.chapters("Romans"), &[1, 8]);
        assert_eq!(progress.read_count(), 2);
    }

    #[test]
    fn round_trips_as_plain_map() {
        let mut progress = ReadingProgress::new();
        progress.insert("Acts", 2);
        let json = serde_json::to_string(&progress).unwrap();
        assert_eq!(json, r#"{"Acts":[2]}"#);
    }
}
