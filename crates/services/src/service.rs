use std::sync::{Arc, Mutex};

use quizden_domain::{truncate_to_millis, CategoryStat, QuizAttempt};
use quizden_session::{ResultTier, ScoreCalculator, ScoreReport, Submission};
use quizden_stats::{
    bucket_attempts, summarize, StatsAggregator, StatsOverview, StreakSummary, TrendBucket,
    TrendWindow,
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, error, info, instrument, warn};
use ulid::{Generator, Ulid};

use crate::error::{ServiceError, StoreError};
use crate::repository::QuizRepository;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Extra read-modify-write rounds after the first conflicting stat write.
    pub max_write_retries: u32,
    pub weekly_lookback_days: u32,
    pub monthly_lookback_months: u32,
    pub recent_attempts_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_write_retries: 3,
            weekly_lookback_days: 84,
            monthly_lookback_months: 6,
            recent_attempts_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishOutcome {
    pub attempt_id: String,
    pub score: ScoreReport,
    pub tier: ResultTier,
    pub stat: CategoryStat,
    /// True when this attempt created the category aggregate.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub category_stats: Vec<CategoryStat>,
    pub streak: StreakSummary,
    pub weekly_trend: Vec<TrendBucket>,
    pub monthly_trend: Vec<TrendBucket>,
    pub overview: StatsOverview,
    pub recent_attempts: Vec<QuizAttempt>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "stat")]
pub enum ReconcileOutcome {
    /// The stored aggregate already matches the attempt history.
    Unchanged,
    Repaired(CategoryStat),
    /// No attempts exist for the pair; nothing was written.
    NoHistory,
}

pub struct QuizService {
    repo: Arc<dyn QuizRepository>,
    config: ServiceConfig,
    /// Attempt ids increase within a millisecond, keeping history order
    /// equal to finish order for attempts stored at the same instant.
    ids: Mutex<Generator>,
}

impl QuizService {
    pub fn new(repo: Arc<dyn QuizRepository>, config: ServiceConfig) -> Self {
        Self {
            repo,
            config,
            ids: Mutex::new(Generator::new()),
        }
    }

    fn next_attempt_id(&self) -> String {
        self.ids
            .lock()
            .ok()
            .and_then(|mut ids| ids.generate().ok())
            .unwrap_or_else(Ulid::new)
            .to_string()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn max_rounds(&self) -> u32 {
        self.config.max_write_retries.saturating_add(1)
    }

    /// Persists a finished session: one QuizAttempt plus the folded category
    /// aggregate. The score is recomputed from the submitted responses.
    #[instrument(skip(self, submission), fields(quiz_id = %submission.quiz_id, category_id = %submission.category_id))]
    pub async fn finish_session(
        &self,
        user_id: &str,
        submission: &Submission,
    ) -> Result<FinishOutcome, ServiceError> {
        if submission.category_id.trim().is_empty() {
            return Err(ServiceError::UnknownCategory(submission.category_id.clone()));
        }
        let score = ScoreCalculator.score(&submission.responses)?;
        let attempt = build_attempt(self.next_attempt_id(), user_id, submission, &score);

        let (stat, created) = if self.repo.supports_transactions() {
            self.finish_in_transaction(&attempt).await?
        } else {
            self.finish_attempt_first(&attempt).await?
        };

        info!(
            user_id,
            attempt_id = %attempt.id,
            percentage = score.percentage,
            attempts = stat.attempts,
            "quiz attempt recorded"
        );
        Ok(FinishOutcome {
            attempt_id: attempt.id,
            score,
            tier: score.tier(),
            stat,
            created,
        })
    }

    async fn finish_in_transaction(
        &self,
        attempt: &QuizAttempt,
    ) -> Result<(CategoryStat, bool), ServiceError> {
        let now = attempt.created_at;
        for round in 1..=self.max_rounds() {
            let prior = self
                .repo
                .find_category_stat(&attempt.user_id, &attempt.category_id)
                .await?;
            let update = StatsAggregator.apply(prior.as_ref(), attempt, now);
            match self.repo.finish_atomically(attempt, &update).await {
                Ok(stat) => return Ok((stat, update.is_create())),
                Err(err) if err.is_conflict() => {
                    debug!(round, "stat changed during finish, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        warn!(
            user_id = %attempt.user_id,
            category_id = %attempt.category_id,
            rounds = self.max_rounds(),
            "giving up on conflicting stat writes"
        );
        Err(ServiceError::AggregateWriteConflict {
            user_id: attempt.user_id.clone(),
            category_id: attempt.category_id.clone(),
            attempts: self.max_rounds(),
        })
    }

    async fn finish_attempt_first(
        &self,
        attempt: &QuizAttempt,
    ) -> Result<(CategoryStat, bool), ServiceError> {
        self.repo.insert_quiz_attempt(attempt).await?;
        match self.fold_into_stat(attempt).await {
            Ok(done) => Ok(done),
            Err(source) => {
                error!(
                    user_id = %attempt.user_id,
                    category_id = %attempt.category_id,
                    attempt_id = %attempt.id,
                    error = %source,
                    "attempt saved but category stat was not updated"
                );
                Err(ServiceError::PartialPersistenceFailure {
                    user_id: attempt.user_id.clone(),
                    category_id: attempt.category_id.clone(),
                    attempt_id: attempt.id.clone(),
                    source,
                })
            }
        }
    }

    /// Read-modify-write on the aggregate alone. Returns the last conflict
    /// once every round has lost.
    async fn fold_into_stat(
        &self,
        attempt: &QuizAttempt,
    ) -> Result<(CategoryStat, bool), StoreError> {
        let now = attempt.created_at;
        let mut last_conflict = None;
        for round in 1..=self.max_rounds() {
            let prior = self
                .repo
                .find_category_stat(&attempt.user_id, &attempt.category_id)
                .await?;
            let update = StatsAggregator.apply(prior.as_ref(), attempt, now);
            match self.repo.save_category_stat(&update).await {
                Ok(stat) => return Ok((stat, update.is_create())),
                Err(err) if err.is_conflict() => {
                    debug!(round, "stat changed during update, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_conflict
            .unwrap_or_else(|| StoreError::conflict(&attempt.user_id, &attempt.category_id)))
    }

    /// Buckets the user's attempts in `window`, grouping in the store when it
    /// can and in memory otherwise.
    #[instrument(skip(self, window), fields(period = ?window.period))]
    pub async fn trend(
        &self,
        user_id: &str,
        window: &TrendWindow,
    ) -> Result<Vec<TrendBucket>, ServiceError> {
        if self.repo.supports_grouping() {
            match self.repo.grouped_trend(user_id, window).await {
                Ok(buckets) => return Ok(buckets),
                Err(err) => {
                    warn!(error = %err, "grouped trend query failed, bucketing in memory")
                }
            }
        }
        let attempts = self
            .repo
            .list_attempts_in_range(user_id, window.start, window.end)
            .await?;
        Ok(bucket_attempts(window, &attempts))
    }

    #[instrument(skip(self))]
    pub async fn user_stats(
        &self,
        user_id: &str,
        now: OffsetDateTime,
    ) -> Result<UserStats, ServiceError> {
        let category_stats = self.repo.list_category_stats(user_id).await?;
        let timestamps = self.repo.activity_timestamps(user_id).await?;
        let streak = summarize(&timestamps, now.to_offset(UtcOffset::UTC).date());

        let weekly = TrendWindow::weekly(now, self.config.weekly_lookback_days);
        let monthly = TrendWindow::monthly(now, self.config.monthly_lookback_months);
        let weekly_trend = self.trend(user_id, &weekly).await?;
        let monthly_trend = self.trend(user_id, &monthly).await?;

        let recent_attempts = self
            .repo
            .recent_attempts(user_id, self.config.recent_attempts_limit)
            .await?;
        let overview = StatsOverview::from_stats(&category_stats);

        Ok(UserStats {
            category_stats,
            streak,
            weekly_trend,
            monthly_trend,
            overview,
            recent_attempts,
        })
    }

    /// Rebuilds the (user, category) aggregate from its attempt history and
    /// stores it if it differs. Running it again over the same history is a
    /// no-op.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        user_id: &str,
        category_id: &str,
        now: OffsetDateTime,
    ) -> Result<ReconcileOutcome, ServiceError> {
        let now = truncate_to_millis(now);
        for round in 1..=self.max_rounds() {
            let existing = self.repo.find_category_stat(user_id, category_id).await?;
            let history = self
                .repo
                .list_attempts_for_category(user_id, category_id)
                .await?;
            let Some(update) =
                StatsAggregator.rebuild(user_id, category_id, &history, existing.as_ref(), now)
            else {
                return Ok(ReconcileOutcome::NoHistory);
            };
            if existing
                .as_ref()
                .is_some_and(|stored| same_aggregate(stored, &update.stat))
            {
                return Ok(ReconcileOutcome::Unchanged);
            }
            match self.repo.save_category_stat(&update).await {
                Ok(stat) => {
                    info!(attempts = stat.attempts, "category stat rebuilt from history");
                    return Ok(ReconcileOutcome::Repaired(stat));
                }
                Err(err) if err.is_conflict() => {
                    debug!(round, "stat changed during reconcile, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::AggregateWriteConflict {
            user_id: user_id.to_string(),
            category_id: category_id.to_string(),
            attempts: self.max_rounds(),
        })
    }

    /// True when the stored aggregate has not absorbed every attempt of the
    /// pair.
    pub async fn needs_reconcile(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<bool, ServiceError> {
        let stat = self.repo.find_category_stat(user_id, category_id).await?;
        let history = self
            .repo
            .list_attempts_for_category(user_id, category_id)
            .await?;
        Ok(StatsAggregator.is_stale(stat.as_ref(), &history))
    }
}

fn build_attempt(
    id: String,
    user_id: &str,
    submission: &Submission,
    score: &ScoreReport,
) -> QuizAttempt {
    let finished = truncate_to_millis(submission.finished_at);
    QuizAttempt {
        id,
        user_id: user_id.to_string(),
        quiz_id: submission.quiz_id.clone(),
        category_id: submission.category_id.clone(),
        score: Some(score.percentage),
        total_questions: score.total,
        correct_answers: score.correct,
        completed: true,
        time_spent: Some(submission.time_spent_secs()),
        answers: submission.responses.clone(),
        started_at: truncate_to_millis(submission.started_at),
        completed_at: Some(finished),
        created_at: finished,
        updated_at: finished,
    }
}

fn close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
        _ => false,
    }
}

fn same_aggregate(stored: &CategoryStat, rebuilt: &CategoryStat) -> bool {
    stored.attempts == rebuilt.attempts
        && stored.completed == rebuilt.completed
        && close(stored.average_score, rebuilt.average_score)
        && close(stored.best_score, rebuilt.best_score)
        && close(stored.total_time, rebuilt.total_time)
        && stored.last_attempt == rebuilt.last_attempt
        && stored.last_attempt_id == rebuilt.last_attempt_id
}
