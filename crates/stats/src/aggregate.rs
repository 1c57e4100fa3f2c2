use quizden_domain::{CategoryStat, QuizAttempt};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;
use ulid::Ulid;

/// Result of folding an attempt into a category aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatUpdate {
    pub stat: CategoryStat,
    /// Version the stored row must still have for the write to apply;
    /// `None` means the row must not exist yet.
    pub expected_version: Option<u64>,
}

impl StatUpdate {
    pub fn is_create(&self) -> bool {
        self.expected_version.is_none()
    }
}

pub struct StatsAggregator;

impl StatsAggregator {
    /// Folds one attempt into the prior aggregate for its (user, category)
    /// pair using the incremental mean and a running max.
    pub fn apply(
        &self,
        prior: Option<&CategoryStat>,
        attempt: &QuizAttempt,
        now: OffsetDateTime,
    ) -> StatUpdate {
        let score = attempt.counted_score();
        let spent = attempt.time_spent.unwrap_or(0.0);

        match prior {
            None => StatUpdate {
                stat: CategoryStat {
                    id: Ulid::new().to_string(),
                    user_id: attempt.user_id.clone(),
                    category_id: attempt.category_id.clone(),
                    attempts: 1,
                    completed: u32::from(score.is_some()),
                    average_score: score,
                    best_score: score,
                    total_time: Some(spent),
                    last_attempt: Some(now),
                    last_attempt_id: Some(attempt.id.clone()),
                    version: 0,
                    created_at: now,
                    updated_at: now,
                },
                expected_version: None,
            },
            Some(prior) => {
                let mut stat = prior.clone();
                stat.attempts = prior.attempts + 1;
                if let Some(score) = score {
                    let completed = prior.completed + 1;
                    let previous = prior.average_score.unwrap_or(0.0);
                    stat.average_score =
                        Some((previous * prior.completed as f64 + score) / completed as f64);
                    stat.best_score = Some(prior.best_score.unwrap_or(0.0).max(score));
                    stat.completed = completed;
                }
                stat.total_time = Some(prior.total_time.unwrap_or(0.0) + spent);
                stat.last_attempt = Some(now);
                stat.last_attempt_id = Some(attempt.id.clone());
                stat.updated_at = now;
                StatUpdate {
                    stat,
                    expected_version: Some(prior.version),
                }
            }
        }
    }

    /// Recomputes the aggregate for one (user, category) pair from its full
    /// attempt history. The result depends only on the set of attempts, so
    /// replaying the same history twice yields the same row.
    pub fn rebuild(
        &self,
        user_id: &str,
        category_id: &str,
        history: &[QuizAttempt],
        existing: Option<&CategoryStat>,
        now: OffsetDateTime,
    ) -> Option<StatUpdate> {
        let mut attempts: Vec<&QuizAttempt> = history
            .iter()
            .filter(|a| a.user_id == user_id && a.category_id == category_id)
            .collect();
        if attempts.is_empty() {
            return None;
        }
        attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let scores: Vec<f64> = attempts.iter().filter_map(|a| a.counted_score()).collect();
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        let best_score = scores.iter().copied().reduce(f64::max);
        let total_time = attempts.iter().filter_map(|a| a.time_spent).sum::<f64>();
        let last_attempt = attempts
            .iter()
            .map(|a| a.completed_at.unwrap_or(a.created_at))
            .max();
        let newest = attempts.last().map(|a| a.id.clone());
        let first_seen = attempts.first().map(|a| a.created_at).unwrap_or(now);

        let stat = CategoryStat {
            id: existing
                .map(|s| s.id.clone())
                .unwrap_or_else(|| Ulid::new().to_string()),
            user_id: user_id.to_string(),
            category_id: category_id.to_string(),
            attempts: attempts.len() as u32,
            completed: scores.len() as u32,
            average_score,
            best_score,
            total_time: Some(total_time),
            last_attempt,
            last_attempt_id: newest,
            version: existing.map(|s| s.version).unwrap_or(0),
            created_at: existing.map(|s| s.created_at).unwrap_or(first_seen),
            updated_at: now,
        };
        debug!(
            user_id,
            category_id,
            attempts = stat.attempts,
            completed = stat.completed,
            "rebuilt category aggregate from history"
        );
        Some(StatUpdate {
            stat,
            expected_version: existing.map(|s| s.version),
        })
    }

    /// True when the aggregate has not absorbed every attempt in `history`,
    /// which happens when a finish was interrupted between its two writes.
    /// Order within `history` does not matter: finishes landing in the same
    /// millisecond may fold in either order.
    pub fn is_stale(&self, stat: Option<&CategoryStat>, history: &[QuizAttempt]) -> bool {
        let Some(stat) = stat else {
            return !history.is_empty();
        };
        let mut folded = history
            .iter()
            .filter(|a| a.user_id == stat.user_id && a.category_id == stat.category_id);
        let count = folded.clone().count();
        let last_known = match &stat.last_attempt_id {
            Some(id) => folded.any(|a| &a.id == id),
            None => count == 0,
        };
        stat.attempts as usize != count || !last_known
    }
}
