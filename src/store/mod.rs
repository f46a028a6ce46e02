mod local;
mod remote;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Journal, JournalEntry, ReadingProgress, StreakState};
use crate::session::Session;

pub use local::{keys, LocalStore};
pub use remote::RemoteStore;

/// The dual-backend seam: everything above this trait behaves identically
/// whether state lives in local JSON files (guest) or the hosted backend
/// (signed in). Exactly one implementation is authoritative per session.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load_progress(&self, session: &Session) -> Result<ReadingProgress>;
    async fn insert_chapter(&self, session: &Session, book: &str, chapter: u32) -> Result<()>;
    async fn remove_chapter(&self, session: &Session, book: &str, chapter: u32) -> Result<()>;

    async fn load_streak(&self, session: &Session) -> Result<StreakState>;
    /// Persists counter and date together; implementations must never land
    /// one field without the other.
    async fn save_streak(&self, session: &Session, state: StreakState) -> Result<()>;

    async fn load_journal(&self, session: &Session) -> Result<Journal>;
    async fn save_journal_entry(
        &self,
        session: &Session,
        date: NaiveDate,
        entry: &JournalEntry,
    ) -> Result<()>;
    async fn delete_journal_entry(&self, session: &Session, date: NaiveDate) -> Result<()>;
}
