mod chapter;
mod journal;
mod progress;
mod streak;

pub use chapter::{BibleChapter, FetchStatus, Verse};
pub use journal::{Journal, JournalEntry};
pub use progress::ReadingProgress;
pub use streak::{display_streak, next_streak, StreakState};
