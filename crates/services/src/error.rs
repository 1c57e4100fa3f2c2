use quizden_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stats for {user_id}/{category_id} changed concurrently")]
    Conflict {
        user_id: String,
        category_id: String,
    },
    #[error("grouped aggregation is not supported by this store")]
    AggregationUnsupported,
    #[error("multi-write transactions are not supported by this store")]
    TransactionsUnsupported,
    #[error("attempt {0} already exists")]
    DuplicateAttempt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt row: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn conflict(user_id: &str, category_id: &str) -> Self {
        Self::Conflict {
            user_id: user_id.to_string(),
            category_id: category_id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("gave up updating stats for {user_id}/{category_id} after {attempts} conflicting writes")]
    AggregateWriteConflict {
        user_id: String,
        category_id: String,
        attempts: u32,
    },
    #[error("attempt {attempt_id} was saved but stats for {user_id}/{category_id} were not updated: {source}")]
    PartialPersistenceFailure {
        user_id: String,
        category_id: String,
        attempt_id: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
