use async_trait::async_trait;
use quizden_domain::{CategoryStat, QuizAttempt};
use quizden_stats::{StatUpdate, TrendBucket, TrendWindow};
use time::OffsetDateTime;

use crate::error::StoreError;

/// Persistence seam for the quiz core. Category stats are only ever
/// written through [`QuizRepository::save_category_stat`] or
/// [`QuizRepository::finish_atomically`], both conditional on the version
/// the caller read.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_category_stat(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Option<CategoryStat>, StoreError>;

    /// Applies `update` if the stored row still has `update.expected_version`
    /// (or, for a create, does not exist yet). Returns the stored row with
    /// its new version; a mismatch is [`StoreError::Conflict`].
    async fn save_category_stat(&self, update: &StatUpdate) -> Result<CategoryStat, StoreError>;

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError>;

    fn supports_transactions(&self) -> bool {
        false
    }

    /// Inserts `attempt` and applies `update` in one transaction.
    async fn finish_atomically(
        &self,
        _attempt: &QuizAttempt,
        _update: &StatUpdate,
    ) -> Result<CategoryStat, StoreError> {
        Err(StoreError::TransactionsUnsupported)
    }

    /// Attempts created in `[start, end)`, oldest first.
    async fn list_attempts_in_range(
        &self,
        user_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<QuizAttempt>, StoreError>;

    /// Full history for one (user, category) pair, oldest first.
    async fn list_attempts_for_category(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Vec<QuizAttempt>, StoreError>;

    /// Every aggregate of the user, most recently attempted first.
    async fn list_category_stats(&self, user_id: &str) -> Result<Vec<CategoryStat>, StoreError>;

    /// Newest attempts first.
    async fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<QuizAttempt>, StoreError>;

    async fn activity_timestamps(&self, user_id: &str) -> Result<Vec<OffsetDateTime>, StoreError>;

    fn supports_grouping(&self) -> bool {
        false
    }

    /// Buckets attempts in `window` with the store's own grouping.
    async fn grouped_trend(
        &self,
        _user_id: &str,
        _window: &TrendWindow,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        Err(StoreError::AggregationUnsupported)
    }
}
