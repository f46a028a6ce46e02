use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::data;
use crate::error::{AppError, Result};
use crate::models::{display_streak, next_streak, ReadingProgress, StreakState};
use crate::session::Session;
use crate::store::UserStore;

type InFlightSet = Arc<Mutex<HashSet<(String, u32)>>>;

fn lock(set: &InFlightSet) -> MutexGuard<'_, HashSet<(String, u32)>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds one `(book, chapter)` key while its toggle is pending. Releasing
/// happens in `Drop`, so a toggle future cancelled at an await point still
/// frees the key instead of blocking the chapter until the next reload.
struct InFlightGuard {
    set: InFlightSet,
    key: (String, u32),
}

impl InFlightGuard {
    fn acquire(set: &InFlightSet, key: (String, u32)) -> Option<Self> {
        if lock(set).insert(key.clone()) {
            Some(Self {
                set: Arc::clone(set),
                key,
            })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

/// Reading-progress and streak state machine. Holds the in-memory view for
/// the current identity; every mutation is persisted to the session's
/// authoritative store before the view changes, so the view never drifts
/// from what was actually saved.
pub struct ProgressTracker {
    progress: ReadingProgress,
    streak: StreakState,
    in_flight: InFlightSet,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            progress: ReadingProgress::new(),
            streak: StreakState::default(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the in-memory view with whatever the given store holds.
    /// Called on startup and after every identity change.
    pub async fn load(&mut self, store: &dyn UserStore, session: &Session) -> Result<()> {
        self.progress = store.load_progress(session).await?;
        self.streak = store.load_streak(session).await?;
        lock(&self.in_flight).clear();
        Ok(())
    }

    pub fn progress(&self) -> &ReadingProgress {
        &self.progress
    }

    pub fn streak(&self) -> StreakState {
        self.streak
    }

    /// The streak to show right now; recomputed from the date gap, never
    /// trusted blindly from the stored counter.
    pub fn displayed_streak(&self, today: NaiveDate) -> u32 {
        display_streak(self.streak.last_read, self.streak.current, today)
    }

    /// Flip the read state of one chapter and return the membership after
    /// the flip. On a persistence error nothing is applied and the caller
    /// sees the error; the in-memory state stays at its pre-toggle value.
    pub async fn toggle_chapter(
        &mut self,
        store: &dyn UserStore,
        session: &Session,
        book: &str,
        chapter: u32,
        today: NaiveDate,
    ) -> Result<bool> {
        let max = data::chapter_count(book)
            .ok_or_else(|| AppError::UnknownBook(book.to_string()))?;
        if chapter == 0 || chapter > max {
            return Err(AppError::ChapterOutOfRange {
                book: book.to_string(),
                chapter,
                max,
            });
        }

        let key = (book.to_string(), chapter);
        let _guard =
            InFlightGuard::acquire(&self.in_flight, key).ok_or(AppError::SaveInFlight)?;
        self.toggle_inner(store, session, book, chapter, today).await
    }

    async fn toggle_inner(
        &mut self,
        store: &dyn UserStore,
        session: &Session,
        book: &str,
        chapter: u32,
        today: NaiveDate,
    ) -> Result<bool> {
        let was_read = self.progress.contains(book, chapter);
        let epoch = session.epoch();

        if was_read {
            store.remove_chapter(session, book, chapter).await?;
            if session.epoch() != epoch {
                // Identity changed while the delete was in flight; the row
                // is gone from the old store but this view no longer owns
                // that data.
                return Ok(was_read);
            }
            self.progress.remove(book, chapter);
            return Ok(false);
        }

        store.insert_chapter(session, book, chapter).await?;
        if session.epoch() != epoch {
            return Ok(was_read);
        }

        // Unread -> read drives the streak. Counter and date are persisted
        // through a single store call; if that fails the whole toggle is
        // unwound so no partial state survives.
        let next = next_streak(self.streak.last_read, self.streak.current, today);
        let new_streak = StreakState::new(next, Some(today));
        if let Err(e) = store.save_streak(session, new_streak).await {
            if let Err(undo) = store.remove_chapter(session, book, chapter).await {
                tracing::error!("Could not undo chapter insert after streak save failure: {undo}");
            }
            return Err(e);
        }
        if session.epoch() != epoch {
            return Ok(was_read);
        }

        self.progress.insert(book, chapter);
        self.streak = new_streak;
        Ok(true)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::models::{Journal, JournalEntry};

    /// In-memory store double. `fail_writes` makes every mutation return
    /// an API error, like a remote backend losing the network;
    /// `hang_writes` parks the write forever so a caller can cancel it
    /// mid-flight; the `sign_out_after_*` slots flip a captured session to
    /// guest right after the named write lands, like the user signing out
    /// while the request is on the wire.
    #[derive(Default)]
    struct MemoryStore {
        progress: Mutex<ReadingProgress>,
        streak: Mutex<StreakState>,
        journal: Mutex<Journal>,
        fail_writes: AtomicBool,
        fail_streak_writes: AtomicBool,
        hang_writes: AtomicBool,
        sign_out_after_insert: Mutex<Option<Session>>,
        sign_out_after_streak_save: Mutex<Option<Session>>,
    }

    impl MemoryStore {
        fn check_write(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::Relaxed) {
                Err(AppError::Api("network down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn load_progress(&self, _s: &Session) -> Result<ReadingProgress> {
            Ok(self.progress.lock().unwrap().clone())
        }

        async fn insert_chapter(&self, _s: &Session, book: &str, chapter: u32) -> Result<()> {
            if self.hang_writes.load(Ordering::Relaxed) {
                std::future::pending::<()>().await;
            }
            self.check_write()?;
            self.progress.lock().unwrap().insert(book, chapter);
            if let Some(mut session) = self.sign_out_after_insert.lock().unwrap().take() {
                session.sign_out();
            }
            Ok(())
        }

        async fn remove_chapter(&self, _s: &Session, book: &str, chapter: u32) -> Result<()> {
            self.check_write()?;
            self.progress.lock().unwrap().remove(book, chapter);
            Ok(())
        }

        async fn load_streak(&self, _s: &Session) -> Result<StreakState> {
            Ok(*self.streak.lock().unwrap())
        }

        async fn save_streak(&self, _s: &Session, state: StreakState) -> Result<()> {
            self.check_write()?;
            if self.fail_streak_writes.load(Ordering::Relaxed) {
                return Err(AppError::Api("streak write rejected".to_string()));
            }
            *self.streak.lock().unwrap() = state;
            if let Some(mut session) = self.sign_out_after_streak_save.lock().unwrap().take() {
                session.sign_out();
            }
            Ok(())
        }

        async fn load_journal(&self, _s: &Session) -> Result<Journal> {
            Ok(self.journal.lock().unwrap().clone())
        }

        async fn save_journal_entry(
            &self,
            _s: &Session,
            date: NaiveDate,
            entry: &JournalEntry,
        ) -> Result<()> {
            self.check_write()?;
            self.journal.lock().unwrap().upsert(date, entry.clone());
            Ok(())
        }

        async fn delete_journal_entry(&self, _s: &Session, date: NaiveDate) -> Result<()> {
            self.check_write()?;
            self.journal.lock().unwrap().delete(date);
            Ok(())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn first_read_starts_streak_at_one() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        let now_read = tracker
            .toggle_chapter(&store, &session, "Genesis", 1, date(10))
            .await
            .unwrap();
        assert!(now_read);
        assert_eq!(tracker.streak(), StreakState::new(1, Some(date(10))));
        // Persisted state matches the view exactly.
        assert_eq!(
            store.load_streak(&session).await.unwrap(),
            tracker.streak()
        );
        assert!(store
            .load_progress(&session)
            .await
            .unwrap()
            .contains("Genesis", 1));
    }

    #[tokio::test]
    async fn consecutive_day_read_increments_and_persists() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        tracker.streak = StreakState::new(5, Some(date(9)));

        assert_eq!(tracker.displayed_streak(date(10)), 5);
        tracker
            .toggle_chapter(&store, &session, "John", 3, date(10))
            .await
            .unwrap();
        assert_eq!(tracker.streak(), StreakState::new(6, Some(date(10))));
        assert_eq!(
            store.load_streak(&session).await.unwrap(),
            StreakState::new(6, Some(date(10)))
        );
    }

    #[tokio::test]
    async fn broken_streak_displays_zero_then_restarts_at_one() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        tracker.streak = StreakState::new(5, Some(date(7)));

        assert_eq!(tracker.displayed_streak(date(10)), 0);
        tracker
            .toggle_chapter(&store, &session, "John", 3, date(10))
            .await
            .unwrap();
        assert_eq!(tracker.streak(), StreakState::new(1, Some(date(10))));
    }

    #[tokio::test]
    async fn second_chapter_same_day_does_not_double_count() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        tracker.streak = StreakState::new(4, Some(date(10)));

        tracker
            .toggle_chapter(&store, &session, "Mark", 2, date(10))
            .await
            .unwrap();
        assert_eq!(tracker.streak().current, 4);
    }

    #[tokio::test]
    async fn unmark_leaves_streak_untouched() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        tracker
            .toggle_chapter(&store, &session, "Luke", 15, date(10))
            .await
            .unwrap();
        let after_read = tracker.streak();
        let now_read = tracker
            .toggle_chapter(&store, &session, "Luke", 15, date(10))
            .await
            .unwrap();
        assert!(!now_read);
        assert!(!tracker.progress().contains("Luke", 15));
        assert_eq!(tracker.streak(), after_read);
    }

    #[tokio::test]
    async fn toggles_keep_chapters_sorted() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        tracker
            .toggle_chapter(&store, &session, "Romans", 5, date(10))
            .await
            .unwrap();
        tracker
            .toggle_chapter(&store, &session, "Romans", 3, date(10))
            .await
            .unwrap();
        assert_eq!(tracker.progress().chapters("Romans"), &[3, 5]);
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_to_pre_toggle_state() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        store.fail_writes.store(true, Ordering::Relaxed);

        let err = tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
        assert!(!tracker.progress().contains("Acts", 2));
        assert_eq!(tracker.streak(), StreakState::default());

        // Recovery: the next attempt after the backend returns succeeds.
        store.fail_writes.store(false, Ordering::Relaxed);
        assert!(tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_streak_save_unwinds_the_chapter_insert() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();
        store.fail_streak_writes.store(true, Ordering::Relaxed);

        let err = tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
        assert!(!tracker.progress().contains("Acts", 2));
        assert!(!store
            .load_progress(&session)
            .await
            .unwrap()
            .contains("Acts", 2));
        assert_eq!(tracker.streak(), StreakState::default());
    }

    #[tokio::test]
    async fn cancelled_toggle_releases_its_in_flight_key() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        store.hang_writes.store(true, Ordering::Relaxed);
        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            tracker.toggle_chapter(&store, &session, "Acts", 2, date(10)),
        )
        .await;
        assert!(cancelled.is_err());

        // The dropped toggle must not leave the chapter stuck behind a
        // phantom pending save.
        store.hang_writes.store(false, Ordering::Relaxed);
        assert!(tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn overlapping_toggle_on_the_same_key_is_rejected() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        let pending =
            InFlightGuard::acquire(&tracker.in_flight, ("Acts".to_string(), 2)).unwrap();
        let err = tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SaveInFlight));

        drop(pending);
        assert!(tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn sign_out_during_chapter_save_discards_the_result() {
        let store = MemoryStore::default();
        let session = Session::guest();
        *store.sign_out_after_insert.lock().unwrap() = Some(session.clone());
        let mut tracker = ProgressTracker::new();

        let now_read = tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap();
        // The row landed in the old identity's store, but the view now
        // belongs to someone else: report the pre-toggle membership and
        // apply nothing.
        assert!(!now_read);
        assert!(!tracker.progress().contains("Acts", 2));
        assert_eq!(tracker.streak(), StreakState::default());
    }

    #[tokio::test]
    async fn sign_out_during_streak_save_discards_the_result() {
        let store = MemoryStore::default();
        let session = Session::guest();
        *store.sign_out_after_streak_save.lock().unwrap() = Some(session.clone());
        let mut tracker = ProgressTracker::new();

        let now_read = tracker
            .toggle_chapter(&store, &session, "Acts", 2, date(10))
            .await
            .unwrap();
        assert!(!now_read);
        assert!(!tracker.progress().contains("Acts", 2));
        assert_eq!(tracker.streak(), StreakState::default());
    }

    #[tokio::test]
    async fn rejects_unknown_book_and_out_of_range_chapter() {
        let store = MemoryStore::default();
        let session = Session::guest();
        let mut tracker = ProgressTracker::new();

        let err = tracker
            .toggle_chapter(&store, &session, "Hezekiah", 1, date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownBook(_)));

        let err = tracker
            .toggle_chapter(&store, &session, "Jude", 2, date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ChapterOutOfRange { max: 1, .. }));
    }

    #[tokio::test]
    async fn load_replaces_the_view() {
        let store = MemoryStore::default();
        let session = Session::guest();
        store.insert_chapter(&session, "Esther", 4).await.unwrap();
        store
            .save_streak(&session, StreakState::new(2, Some(date(9))))
            .await
            .unwrap();

        let mut tracker = ProgressTracker::new();
        tracker.load(&store, &session).await.unwrap();
        assert!(tracker.progress().contains("Esther", 4));
        assert_eq!(tracker.streak(), StreakState::new(2, Some(date(9))));
    }
}
