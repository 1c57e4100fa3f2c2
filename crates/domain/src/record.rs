use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Drops sub-millisecond digits. Records are persisted at millisecond
/// precision, so every timestamp that is stored or compared against stored
/// data goes through here first.
pub fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    let nanos = at.nanosecond();
    at.replace_nanosecond(nanos - nanos % 1_000_000).unwrap_or(at)
}

/// The user's latest choice for one question of a session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub question_id: String,
    pub option_id: String,
    pub is_correct: bool,
}

impl Response {
    pub fn new(
        question_id: impl Into<String>,
        option_id: impl Into<String>,
        is_correct: bool,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            option_id: option_id.into(),
            is_correct,
        }
    }
}

/// Running per-user, per-category aggregate. Derived from [`QuizAttempt`]
/// history and rebuilt from it when the two disagree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub attempts: u32,
    pub completed: u32,
    pub average_score: Option<f64>,
    pub best_score: Option<f64>,
    /// Seconds spent across all attempts.
    pub total_time: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_attempt: Option<OffsetDateTime>,
    pub last_attempt_id: Option<String>,
    /// Optimistic concurrency token, bumped by every successful write.
    pub version: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CategoryStat {
    pub fn completion_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.completed as f64 / self.attempts as f64 * 100.0
    }
}

/// Append-only log entry for one finished session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub category_id: String,
    pub score: Option<f64>,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub completed: bool,
    /// Seconds from session start to finish.
    pub time_spent: Option<f64>,
    pub answers: Vec<Response>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl QuizAttempt {
    /// Score counted towards aggregates; only completed attempts carry one.
    pub fn counted_score(&self) -> Option<f64> {
        if self.completed {
            self.score
        } else {
            None
        }
    }
}
