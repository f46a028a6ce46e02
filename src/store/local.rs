use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Journal, JournalEntry, ReadingProgress, StreakState};
use crate::session::Session;

use super::UserStore;

/// Stable keys for the guest-mode documents, one JSON file each.
pub mod keys {
    pub const READ_CHAPTERS: &str = "read-chapters";
    pub const STREAK: &str = "streak";
    pub const JOURNAL: &str = "journal";
    pub const THEME: &str = "theme";
    pub const USER_NAME: &str = "user-name";
}

/// Guest-mode persistence: a typed key-value store where each key is one
/// JSON document on disk. A missing or corrupt file yields the type's
/// default value.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub async fn get<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Corrupt state file {path:?}, using default: {e}");
                    T::default()
                }
            },
            Err(_) => T::default(),
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(key);
        let content = serde_json::to_string_pretty(value)?;
        // Whole-file rewrite through a temp file so readers never see a
        // half-written document.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write failures (quota, permissions) are reported but never block
    /// the caller: for a guest session the in-memory state stays the
    /// source of truth.
    async fn set_non_fatal<T>(&self, key: &str, value: &T)
    where
        T: Serialize + Sync,
    {
        if let Err(e) = self.set(key, value).await {
            tracing::warn!("Could not persist local key '{key}': {e}");
        }
    }
}

#[async_trait]
impl UserStore for LocalStore {
    async fn load_progress(&self, _session: &Session) -> Result<ReadingProgress> {
        Ok(self.get(keys::READ_CHAPTERS).await)
    }

    async fn insert_chapter(&self, _session: &Session, book: &str, chapter: u32) -> Result<()> {
        let mut progress: ReadingProgress = self.get(keys::READ_CHAPTERS).await;
        progress.insert(book, chapter);
        self.set_non_fatal(keys::READ_CHAPTERS, &progress).await;
        Ok(())
    }

    async fn remove_chapter(&self, _session: &Session, book: &str, chapter: u32) -> Result<()> {
        let mut progress: ReadingProgress = self.get(keys::READ_CHAPTERS).await;
        progress.remove(book, chapter);
        self.set_non_fatal(keys::READ_CHAPTERS, &progress).await;
        Ok(())
    }

    async fn load_streak(&self, _session: &Session) -> Result<StreakState> {
        Ok(self.get(keys::STREAK).await)
    }

    async fn save_streak(&self, _session: &Session, state: StreakState) -> Result<()> {
        // One document holds both fields, so they always land together.
        self.set_non_fatal(keys::STREAK, &state).await;
        Ok(())
    }

    async fn load_journal(&self, _session: &Session) -> Result<Journal> {
        Ok(self.get(keys::JOURNAL).await)
    }

    async fn save_journal_entry(
        &self,
        _session: &Session,
        date: NaiveDate,
        entry: &JournalEntry,
    ) -> Result<()> {
        let mut journal: Journal = self.get(keys::JOURNAL).await;
        journal.upsert(date, entry.clone());
        self.set_non_fatal(keys::JOURNAL, &journal).await;
        Ok(())
    }

    async fn delete_journal_entry(&self, _session: &Session, date: NaiveDate) -> Result<()> {
        let mut journal: Journal = self.get(keys::JOURNAL).await;
        journal.delete(date);
        self.set_non_fatal(keys::JOURNAL, &journal).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn missing_key_yields_default() {
        let (_dir, store) = store();
        let progress: ReadingProgress = store.get(keys::READ_CHAPTERS).await;
        assert_eq!(progress.read_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_file_yields_default() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("streak.json"), "not json").unwrap();
        let streak: StreakState = store.get(keys::STREAK).await;
        assert_eq!(streak, StreakState::default());
    }

    #[tokio::test]
    async fn chapter_rows_survive_reload() {
        let (_dir, store) = store();
        let session = Session::guest();
        store.insert_chapter(&session, "Genesis", 5).await.unwrap();
        store.insert_chapter(&session, "Genesis", 3).await.unwrap();
        store.remove_chapter(&session, "Genesis", 5).await.unwrap();

        let progress = store.load_progress(&session).await.unwrap();
        assert_eq!(progress.chapters("Genesis"), &[3]);
    }

    #[tokio::test]
    async fn streak_fields_land_together() {
        let (_dir, store) = store();
        let session = Session::guest();
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        store
            .save_streak(&session, StreakState::new(3, Some(date)))
            .await
            .unwrap();

        let loaded = store.load_streak(&session).await.unwrap();
        assert_eq!(loaded.current, 3);
        assert_eq!(loaded.last_read, Some(date));
    }

    #[tokio::test]
    async fn journal_round_trip() {
        let (_dir, store) = store();
        let session = Session::guest();
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let entry = JournalEntry {
            title: Some("Psalm 23".into()),
            content: "He restores my soul.".into(),
        };
        store
            .save_journal_entry(&session, date, &entry)
            .await
            .unwrap();

        let journal = store.load_journal(&session).await.unwrap();
        assert_eq!(journal.get(date), Some(&entry));

        store.delete_journal_entry(&session, date).await.unwrap();
        let journal = store.load_journal(&session).await.unwrap();
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn typed_keys_are_independent() {
        let (_dir, store) = store();
        store.set(keys::USER_NAME, &"Miriam".to_string()).await.unwrap();
        let name: String = store.get(keys::USER_NAME).await;
        assert_eq!(name, "Miriam");
        let progress: ReadingProgress = store.get(keys::READ_CHAPTERS).await;
        assert_eq!(progress.read_count(), 0);
    }
}
