use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted streak state. `current` only changes through a chapter-read
/// event; the value shown to the user always goes through [`display_streak`]
/// so a stale counter can never inflate a broken streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub last_read: Option<NaiveDate>,
}

impl StreakState {
    pub fn new(current: u32, last_read: Option<NaiveDate>) -> Self {
        Self { current, last_read }
    }
}

/// Streak to display right now, given what is stored.
///
/// A last read of yesterday still shows the stored streak (today's reading
/// just hasn't happened yet); a gap of two or more calendar days means the
/// streak is broken regardless of what the stored counter says.
pub fn display_streak(last_read: Option<NaiveDate>, stored: u32, today: NaiveDate) -> u32 {
    let Some(last) = last_read else {
        return 0;
    };
    match (today - last).num_days() {
        0 | 1 => stored,
        d if d >= 2 => 0,
        // last_read in the future (clock moved back); trust the counter
        _ => stored,
    }
}

/// Streak value after a new chapter-read event today. The caller persists
/// `(next_streak, today)` together as the new state.
///
/// Comparisons are calendar days, not elapsed hours: 23:59 and 00:01 the
/// next minute are consecutive days.
pub fn next_streak(last_read: Option<NaiveDate>, stored: u32, today: NaiveDate) -> u32 {
    let Some(last) = last_read else {
        return 1;
    };
    match (today - last).num_days() {
        // Second chapter the same day never double-counts.
        0 => stored,
        1 => stored + 1,
        d if d >= 2 => 1,
        _ => stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_last_read_means_zero() {
        let today = date(2025, 6, 10);
        assert_eq!(display_streak(None, 7, today), 0);
    }

    #[test]
    fn read_yesterday_keeps_stored_streak() {
        let today = date(2025, 6, 10);
        assert_eq!(display_streak(Some(date(2025, 6, 9)), 5, today), 5);
    }

    #[test]
    fn read_today_keeps_stored_streak() {
        let today = date(2025, 6, 10);
        assert_eq!(display_streak(Some(today), 5, today), 5);
    }

    #[test]
    fn gap_of_two_days_breaks_streak() {
        let today = date(2025, 6, 10);
        assert_eq!(display_streak(Some(date(2025, 6, 8)), 5, today), 0);
        assert_eq!(display_streak(Some(date(2025, 6, 7)), 5, today), 0);
    }

    #[test]
    fn display_is_idempotent() {
        let today = date(2025, 6, 10);
        let last = Some(date(2025, 6, 9));
        let first = display_streak(last, 5, today);
        assert_eq!(display_streak(last, 5, today), first);
        assert_eq!(display_streak(last, 5, today), first);
    }

    #[test]
    fn consecutive_day_increments() {
        let today = date(2025, 6, 10);
        assert_eq!(next_streak(Some(date(2025, 6, 9)), 5, today), 6);
    }

    #[test]
    fn second_read_same_day_does_not_double_count() {
        let today = date(2025, 6, 10);
        assert_eq!(next_streak(Some(today), 4, today), 4);
    }

    #[test]
    fn broken_streak_restarts_at_one() {
        let today = date(2025, 6, 10);
        assert_eq!(next_streak(Some(date(2025, 6, 7)), 5, today), 1);
        assert_eq!(next_streak(None, 5, today), 1);
    }

    #[test]
    fn midnight_boundary_counts_as_consecutive_days() {
        // A read late on the 9th followed by one just after midnight on
        // the 10th is a one-day gap even though under 24h elapsed.
        let before_midnight = date(2025, 6, 9);
        let after_midnight = date(2025, 6, 10);
        assert_eq!(next_streak(Some(before_midnight), 2, after_midnight), 3);
    }
}
