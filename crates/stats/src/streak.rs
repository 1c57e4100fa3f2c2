use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakSummary {
    /// Consecutive active days ending today or yesterday.
    pub current: u32,
    /// Longest run of consecutive active days ever recorded.
    pub best: u32,
    pub active_days: u32,
}

/// Distinct UTC calendar dates, most recent first.
fn active_dates(timestamps: &[OffsetDateTime]) -> Vec<Date> {
    let mut dates: Vec<Date> = timestamps
        .iter()
        .map(|ts| ts.to_offset(UtcOffset::UTC).date())
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    dates
}

fn days_between(later: Date, earlier: Date) -> i64 {
    (later - earlier).whole_days()
}

pub fn current_streak(timestamps: &[OffsetDateTime], today: Date) -> u32 {
    let dates = active_dates(timestamps);
    let Some(&most_recent) = dates.first() else {
        return 0;
    };
    if days_between(today, most_recent) > 1 {
        return 0;
    }
    let mut streak = 1;
    for pair in dates.windows(2) {
        if days_between(pair[0], pair[1]) == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

pub fn summarize(timestamps: &[OffsetDateTime], today: Date) -> StreakSummary {
    let dates = active_dates(timestamps);
    if dates.is_empty() {
        return StreakSummary::default();
    }
    let mut best = 1u32;
    let mut run = 1u32;
    for pair in dates.windows(2) {
        if days_between(pair[0], pair[1]) == 1 {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }
    StreakSummary {
        current: current_streak(timestamps, today),
        best,
        active_days: dates.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};
    use time::Duration;

    const TODAY: Date = date!(2024 - 06 - 15);

    fn days_ago(days: i64) -> OffsetDateTime {
        datetime!(2024-06-15 18:30 UTC) - Duration::days(days)
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let stamps = [days_ago(0), days_ago(1), days_ago(2)];
        assert_eq!(current_streak(&stamps, TODAY), 3);
    }

    #[test]
    fn broken_when_last_activity_two_days_ago() {
        assert_eq!(current_streak(&[days_ago(2)], TODAY), 0);
    }

    #[test]
    fn yesterday_keeps_streak_alive() {
        assert_eq!(current_streak(&[days_ago(1)], TODAY), 1);
    }

    #[test]
    fn empty_history() {
        assert_eq!(current_streak(&[], TODAY), 0);
        assert_eq!(summarize(&[], TODAY), StreakSummary::default());
    }

    #[test]
    fn same_day_timestamps_collapse() {
        let stamps = [
            datetime!(2024-06-15 08:00 UTC),
            datetime!(2024-06-15 21:00 UTC),
            datetime!(2024-06-14 23:59 UTC),
            days_ago(4),
        ];
        assert_eq!(current_streak(&stamps, TODAY), 2);
    }

    #[test]
    fn dates_are_taken_in_utc() {
        // 01:00 on the 15th at +03:00 is still the 14th in UTC.
        let stamp = datetime!(2024-06-15 01:00).assume_offset(offset!(+3));
        assert_eq!(current_streak(&[stamp], TODAY), 1);
        assert_eq!(current_streak(&[stamp], date!(2024 - 06 - 16)), 0);
    }

    #[test]
    fn summary_tracks_best_run() {
        let stamps = [
            days_ago(0),
            days_ago(5),
            days_ago(6),
            days_ago(7),
            days_ago(8),
            days_ago(20),
        ];
        let summary = summarize(&stamps, TODAY);
        assert_eq!(summary.current, 1);
        assert_eq!(summary.best, 4);
        assert_eq!(summary.active_days, 6);
    }
}
