use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use quizden_domain::{CategoryStat, QuizAttempt};
use quizden_stats::StatUpdate;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::StoreError;
use crate::repository::QuizRepository;

#[derive(Default)]
struct Tables {
    stats: HashMap<(String, String), CategoryStat>,
    attempts: Vec<QuizAttempt>,
}

/// Document-style store kept in process memory. Single writes are atomic,
/// but it offers neither multi-write transactions nor grouped queries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn sorted_oldest_first(mut attempts: Vec<QuizAttempt>) -> Vec<QuizAttempt> {
    attempts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    attempts
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn find_category_stat(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Option<CategoryStat>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .stats
            .get(&(user_id.to_string(), category_id.to_string()))
            .cloned())
    }

    async fn save_category_stat(&self, update: &StatUpdate) -> Result<CategoryStat, StoreError> {
        let mut tables = self.lock()?;
        let key = (
            update.stat.user_id.clone(),
            update.stat.category_id.clone(),
        );
        let current = tables.stats.get(&key).map(|s| s.version);
        if current != update.expected_version {
            debug!(
                user_id = %key.0,
                category_id = %key.1,
                ?current,
                expected = ?update.expected_version,
                "category stat version mismatch"
            );
            return Err(StoreError::conflict(&key.0, &key.1));
        }
        let mut stored = update.stat.clone();
        stored.version = current.map_or(1, |v| v + 1);
        tables.stats.insert(key, stored.clone());
        Ok(stored)
    }

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.attempts.iter().any(|a| a.id == attempt.id) {
            return Err(StoreError::DuplicateAttempt(attempt.id.clone()));
        }
        tables.attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_attempts_in_range(
        &self,
        user_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let tables = self.lock()?;
        let attempts = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.created_at >= start && a.created_at < end)
            .cloned()
            .collect();
        Ok(sorted_oldest_first(attempts))
    }

    async fn list_attempts_for_category(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let tables = self.lock()?;
        let attempts = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.category_id == category_id)
            .cloned()
            .collect();
        Ok(sorted_oldest_first(attempts))
    }

    async fn list_category_stats(&self, user_id: &str) -> Result<Vec<CategoryStat>, StoreError> {
        let tables = self.lock()?;
        let mut stats: Vec<CategoryStat> = tables
            .stats
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        stats.sort_by(|a, b| {
            b.last_attempt
                .cmp(&a.last_attempt)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        Ok(stats)
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let tables = self.lock()?;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn activity_timestamps(&self, user_id: &str) -> Result<Vec<OffsetDateTime>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.created_at)
            .collect())
    }
}
