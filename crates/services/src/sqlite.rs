use std::str::FromStr;

use async_trait::async_trait;
use quizden_domain::{CategoryStat, QuizAttempt, Response};
use quizden_stats::{Period, StatUpdate, TrendBucket, TrendWindow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::repository::QuizRepository;

struct Migration {
    version: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "V1",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS category_stats (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                average_score REAL,
                best_score REAL,
                total_time REAL,
                last_attempt INTEGER,
                last_attempt_id TEXT,
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (user_id, category_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                quiz_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                score REAL,
                total_questions INTEGER NOT NULL,
                correct_answers INTEGER NOT NULL,
                completed BOOLEAN NOT NULL,
                time_spent REAL,
                answers TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                completed_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS quiz_attempts_user_created ON quiz_attempts (user_id, created_at)",
            "CREATE INDEX IF NOT EXISTS quiz_attempts_user_category ON quiz_attempts (user_id, category_id)",
        ],
    },
];

/// Timestamps are stored as UTC milliseconds since the Unix epoch.
fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(millis: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|err| StoreError::Decode(format!("timestamp {millis}: {err}")))
}

fn to_count(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{column} out of range: {value}")))
}

#[derive(FromRow)]
struct StatRow {
    id: String,
    user_id: String,
    category_id: String,
    attempts: i64,
    completed: i64,
    average_score: Option<f64>,
    best_score: Option<f64>,
    total_time: Option<f64>,
    last_attempt: Option<i64>,
    last_attempt_id: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<StatRow> for CategoryStat {
    type Error = StoreError;

    fn try_from(row: StatRow) -> Result<Self, Self::Error> {
        Ok(CategoryStat {
            id: row.id,
            user_id: row.user_id,
            category_id: row.category_id,
            attempts: to_count(row.attempts, "attempts")?,
            completed: to_count(row.completed, "completed")?,
            average_score: row.average_score,
            best_score: row.best_score,
            total_time: row.total_time,
            last_attempt: row.last_attempt.map(from_millis).transpose()?,
            last_attempt_id: row.last_attempt_id,
            version: u64::try_from(row.version)
                .map_err(|_| StoreError::Decode(format!("negative version {}", row.version)))?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: String,
    user_id: String,
    quiz_id: String,
    category_id: String,
    score: Option<f64>,
    total_questions: i64,
    correct_answers: i64,
    completed: bool,
    time_spent: Option<f64>,
    answers: String,
    started_at: i64,
    completed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let answers: Vec<Response> = serde_json::from_str(&row.answers)?;
        Ok(QuizAttempt {
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            category_id: row.category_id,
            score: row.score,
            total_questions: to_count(row.total_questions, "total_questions")?,
            correct_answers: to_count(row.correct_answers, "correct_answers")?,
            completed: row.completed,
            time_spent: row.time_spent,
            answers,
            started_at: from_millis(row.started_at)?,
            completed_at: row.completed_at.map(from_millis).transpose()?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct BucketRow {
    period_start: String,
    attempts: i64,
    completed: i64,
    average_score: Option<f64>,
    unique_categories: i64,
}

impl TryFrom<BucketRow> for TrendBucket {
    type Error = StoreError;

    fn try_from(row: BucketRow) -> Result<Self, Self::Error> {
        let period_start = Date::parse(&row.period_start, format_description!("[year]-[month]-[day]"))
            .map_err(|err| StoreError::Decode(format!("bucket '{}': {err}", row.period_start)))?;
        Ok(TrendBucket {
            period_start,
            attempts: to_count(row.attempts, "attempts")?,
            completed: to_count(row.completed, "completed")?,
            average_score: row.average_score,
            unique_categories: to_count(row.unique_categories, "unique_categories")?,
        })
    }
}

const ATTEMPT_COLUMNS: &str = "id, user_id, quiz_id, category_id, score, total_questions, correct_answers, completed, time_spent, answers, started_at, completed_at, created_at, updated_at";

const STAT_COLUMNS: &str = "id, user_id, category_id, attempts, completed, average_score, best_score, total_time, last_attempt, last_attempt_id, version, created_at, updated_at";

/// SQLite-backed store. Supports transactions and grouped trend queries.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            // Every connection to `:memory:` is its own database; keep one alive.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };
        let store = Self { pool };
        store.migrate().await?;
        info!(url, "sqlite store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for migration in MIGRATIONS {
            let applied: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?)",
            )
            .bind(migration.version)
            .fetch_one(&self.pool)
            .await?;
            if applied {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            for statement in migration.statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
                .bind(migration.version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!(version = migration.version, "applied database migration");
        }
        Ok(())
    }

    async fn write_stat(
        conn: &mut SqliteConnection,
        update: &StatUpdate,
    ) -> Result<CategoryStat, StoreError> {
        let stat = &update.stat;
        let mut stored = stat.clone();
        match update.expected_version {
            None => {
                stored.version = 1;
                let result = sqlx::query(
                    r#"
                    INSERT INTO category_stats (id, user_id, category_id, attempts, completed,
                        average_score, best_score, total_time, last_attempt, last_attempt_id,
                        version, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&stat.id)
                .bind(&stat.user_id)
                .bind(&stat.category_id)
                .bind(i64::from(stat.attempts))
                .bind(i64::from(stat.completed))
                .bind(stat.average_score)
                .bind(stat.best_score)
                .bind(stat.total_time)
                .bind(stat.last_attempt.map(to_millis))
                .bind(&stat.last_attempt_id)
                .bind(1_i64)
                .bind(to_millis(stat.created_at))
                .bind(to_millis(stat.updated_at))
                .execute(&mut *conn)
                .await;
                match result {
                    Ok(_) => {}
                    Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                        return Err(StoreError::conflict(&stat.user_id, &stat.category_id));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Some(expected) => {
                stored.version = expected + 1;
                let result = sqlx::query(
                    r#"
                    UPDATE category_stats
                    SET attempts = ?, completed = ?, average_score = ?, best_score = ?,
                        total_time = ?, last_attempt = ?, last_attempt_id = ?,
                        version = version + 1, updated_at = ?
                    WHERE user_id = ? AND category_id = ? AND version = ?
                    "#,
                )
                .bind(i64::from(stat.attempts))
                .bind(i64::from(stat.completed))
                .bind(stat.average_score)
                .bind(stat.best_score)
                .bind(stat.total_time)
                .bind(stat.last_attempt.map(to_millis))
                .bind(&stat.last_attempt_id)
                .bind(to_millis(stat.updated_at))
                .bind(&stat.user_id)
                .bind(&stat.category_id)
                .bind(expected as i64)
                .execute(&mut *conn)
                .await?;
                if result.rows_affected() == 0 {
                    debug!(user_id = %stat.user_id, category_id = %stat.category_id, expected, "category stat version mismatch");
                    return Err(StoreError::conflict(&stat.user_id, &stat.category_id));
                }
            }
        }
        Ok(stored)
    }

    async fn write_attempt(
        conn: &mut SqliteConnection,
        attempt: &QuizAttempt,
    ) -> Result<(), StoreError> {
        let answers = serde_json::to_string(&attempt.answers)?;
        let sql = format!(
            "INSERT INTO quiz_attempts ({ATTEMPT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        let result = sqlx::query(&sql)
            .bind(&attempt.id)
            .bind(&attempt.user_id)
            .bind(&attempt.quiz_id)
            .bind(&attempt.category_id)
            .bind(attempt.score)
            .bind(i64::from(attempt.total_questions))
            .bind(i64::from(attempt.correct_answers))
            .bind(attempt.completed)
            .bind(attempt.time_spent)
            .bind(answers)
            .bind(to_millis(attempt.started_at))
            .bind(attempt.completed_at.map(to_millis))
            .bind(to_millis(attempt.created_at))
            .bind(to_millis(attempt.updated_at))
            .execute(&mut *conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::DuplicateAttempt(attempt.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_attempts(
        &self,
        sql: &str,
        binds: &[&str],
        range: Option<(i64, i64)>,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let mut query = sqlx::query_as::<_, AttemptRow>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        if let Some((start, end)) = range {
            query = query.bind(start).bind(end);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(QuizAttempt::try_from)
            .collect()
    }
}

#[async_trait]
impl QuizRepository for SqliteStore {
    async fn find_category_stat(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Option<CategoryStat>, StoreError> {
        let sql =
            format!("SELECT {STAT_COLUMNS} FROM category_stats WHERE user_id = ? AND category_id = ?");
        sqlx::query_as::<_, StatRow>(&sql)
            .bind(user_id)
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?
            .map(CategoryStat::try_from)
            .transpose()
    }

    async fn save_category_stat(&self, update: &StatUpdate) -> Result<CategoryStat, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::write_stat(&mut conn, update).await
    }

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::write_attempt(&mut conn, attempt).await
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn finish_atomically(
        &self,
        attempt: &QuizAttempt,
        update: &StatUpdate,
    ) -> Result<CategoryStat, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::write_attempt(&mut tx, attempt).await?;
        let stored = Self::write_stat(&mut tx, update).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn list_attempts_in_range(
        &self,
        user_id: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE user_id = ? AND created_at >= ? AND created_at < ? ORDER BY created_at, id"
        );
        self.fetch_attempts(&sql, &[user_id], Some((to_millis(start), to_millis(end))))
            .await
    }

    async fn list_attempts_for_category(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE user_id = ? AND category_id = ? ORDER BY created_at, id"
        );
        self.fetch_attempts(&sql, &[user_id, category_id], None).await
    }

    async fn list_category_stats(&self, user_id: &str) -> Result<Vec<CategoryStat>, StoreError> {
        let sql = format!(
            "SELECT {STAT_COLUMNS} FROM category_stats WHERE user_id = ? ORDER BY last_attempt DESC, category_id"
        );
        sqlx::query_as::<_, StatRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(CategoryStat::try_from)
            .collect()
    }

    async fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(user_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(QuizAttempt::try_from)
            .collect()
    }

    async fn activity_timestamps(&self, user_id: &str) -> Result<Vec<OffsetDateTime>, StoreError> {
        let millis: Vec<i64> = sqlx::query_scalar(
            "SELECT created_at FROM quiz_attempts WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        millis.into_iter().map(from_millis).collect()
    }

    fn supports_grouping(&self) -> bool {
        true
    }

    async fn grouped_trend(
        &self,
        user_id: &str,
        window: &TrendWindow,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        // Same keys as `Period::bucket_start`: Monday of the UTC week, or the
        // first of the UTC month.
        let bucket = match window.period {
            Period::Week => "date(created_at / 1000, 'unixepoch', 'weekday 0', '-6 days')",
            Period::Month => "strftime('%Y-%m-01', created_at / 1000, 'unixepoch')",
        };
        let sql = format!(
            r#"
            SELECT {bucket} AS period_start,
                   COUNT(*) AS attempts,
                   SUM(CASE WHEN completed THEN 1 ELSE 0 END) AS completed,
                   AVG(score) AS average_score,
                   COUNT(DISTINCT category_id) AS unique_categories
            FROM quiz_attempts
            WHERE user_id = ? AND created_at >= ? AND created_at < ?
            GROUP BY period_start
            ORDER BY period_start
            "#
        );
        sqlx::query_as::<_, BucketRow>(&sql)
            .bind(user_id)
            .bind(to_millis(window.start))
            .bind(to_millis(window.end))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TrendBucket::try_from)
            .collect()
    }
}
