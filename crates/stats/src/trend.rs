use std::collections::{BTreeMap, HashSet};

use quizden_domain::{truncate_to_millis, QuizAttempt};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
}

impl Period {
    /// First day of the bucket holding `at`: the Monday of its UTC week, or
    /// the first of its UTC month.
    pub fn bucket_start(&self, at: OffsetDateTime) -> Date {
        let date = at.to_offset(UtcOffset::UTC).date();
        match self {
            Period::Week => {
                date - Duration::days(i64::from(date.weekday().number_days_from_monday()))
            }
            Period::Month => Date::from_calendar_date(date.year(), date.month(), 1).unwrap_or(date),
        }
    }
}

/// Half-open time range `[start, end)` bucketed by `period`.
///
/// Membership is decided at millisecond precision, the precision attempts
/// are stored at, so filtering here agrees with a store-side range query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendWindow {
    pub period: Period,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl TrendWindow {
    /// Weekly buckets over the `lookback_days` days before `now`.
    pub fn weekly(now: OffsetDateTime, lookback_days: u32) -> Self {
        let end = truncate_to_millis(now);
        Self {
            period: Period::Week,
            start: end - Duration::days(i64::from(lookback_days)),
            end,
        }
    }

    /// Monthly buckets over the `lookback_months` calendar months before `now`.
    pub fn monthly(now: OffsetDateTime, lookback_months: u32) -> Self {
        let end = truncate_to_millis(now);
        Self {
            period: Period::Month,
            start: months_before(end, lookback_months),
            end,
        }
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        let at = truncate_to_millis(at);
        at >= truncate_to_millis(self.start) && at < truncate_to_millis(self.end)
    }
}

/// Same wall-clock instant `months` calendar months earlier, clamping the
/// day to the length of the target month.
fn months_before(at: OffsetDateTime, months: u32) -> OffsetDateTime {
    let date = at.date();
    let mut year = date.year();
    let mut month = date.month();
    for _ in 0..months {
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }
    let day = date.day().min(time::util::days_in_year_month(year, month));
    let target = Date::from_calendar_date(year, month, day).unwrap_or(Date::MIN);
    at.replace_date(target)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    pub period_start: Date,
    pub attempts: u32,
    pub completed: u32,
    /// `None` when no attempt in the bucket carries a score.
    pub average_score: Option<f64>,
    pub unique_categories: u32,
}

#[derive(Default)]
struct Accumulator {
    attempts: u32,
    completed: u32,
    score_sum: f64,
    scored: u32,
    categories: HashSet<String>,
}

/// Buckets raw attempts in memory. Used when the store cannot group
/// natively; produces the same buckets as the grouped query.
pub fn bucket_attempts(window: &TrendWindow, attempts: &[QuizAttempt]) -> Vec<TrendBucket> {
    let mut buckets: BTreeMap<Date, Accumulator> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| window.contains(a.created_at)) {
        let acc = buckets
            .entry(window.period.bucket_start(attempt.created_at))
            .or_default();
        acc.attempts += 1;
        if attempt.completed {
            acc.completed += 1;
        }
        if let Some(score) = attempt.score {
            acc.score_sum += score;
            acc.scored += 1;
        }
        acc.categories.insert(attempt.category_id.clone());
    }
    buckets
        .into_iter()
        .map(|(period_start, acc)| TrendBucket {
            period_start,
            attempts: acc.attempts,
            completed: acc.completed,
            average_score: (acc.scored > 0).then(|| acc.score_sum / acc.scored as f64),
            unique_categories: acc.categories.len() as u32,
        })
        .collect()
}
