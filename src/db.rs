use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use r2d2::{ManageConnection, Pool};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Emotion, FeedbackAction, FeedbackRecord, StoredFeedback};
use crate::schema::feedback;

/// Opens SQLite connections for the r2d2 pool.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteManager {
    /// Manager for the database at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> std::result::Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, _conn: &mut Connection) -> bool {
        false
    }
}

/// Pool of feedback database connections
pub type DbPool = Pool<SqliteManager>;
/// Connection checked out of [`DbPool`]
pub type DbConnection = r2d2::PooledConnection<SqliteManager>;

/// Feedback persistence boundary, keyed uniquely by message id.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Insert, or replace the record with the same message id. All or
    /// nothing.
    async fn upsert(&self, record: &FeedbackRecord) -> Result<FeedbackAction>;

    /// Stored record for a message id
    async fn get(&self, message_id: i64) -> Result<Option<StoredFeedback>>;
}

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub fn open(path: &Path, config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::Persistence(format!("creating {}: {e}", parent.display()))
                })?;
            }
        }

        let manager = SqliteManager::new(path, Duration::from_millis(config.busy_timeout_ms));
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        info!(path = %path.display(), "Feedback database ready");

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2026-10-01-000000_create_feedback/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Blocking upsert inside an IMMEDIATE transaction. The write lock is
    /// taken before the existence check, so concurrent writers for one
    /// message id serialize.
    pub fn upsert_blocking(&self, record: &FeedbackRecord) -> Result<FeedbackAction> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().naive_utc();

        let existing: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    feedback::ID,
                    feedback::TABLE,
                    feedback::MESSAGE_ID
                ),
                params![record.message_id],
                |row| row.get(0),
            )
            .optional()?;

        let action = if let Some(id) = existing {
            tx.execute(
                &format!(
                    "UPDATE {} SET {} = ?1, {} = ?2, {} = ?3, {} = ?4, {} = ?5, {} = ?6, {} = ?7 WHERE {} = ?8",
                    feedback::TABLE,
                    feedback::USER_ID,
                    feedback::TEXT,
                    feedback::INITIAL_SPAM_PREDICTION,
                    feedback::INITIAL_SENTIMENT_PREDICTION,
                    feedback::REAL_SPAM,
                    feedback::REAL_EMOTION,
                    feedback::UPDATED_AT,
                    feedback::ID
                ),
                params![
                    record.user_id,
                    record.text,
                    record.initial_spam_prediction,
                    record.initial_sentiment_prediction,
                    record.real_spam,
                    record.real_emotion.as_str(),
                    now,
                    id
                ],
            )?;
            FeedbackAction::Updated
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    feedback::TABLE,
                    feedback::MESSAGE_ID,
                    feedback::USER_ID,
                    feedback::TEXT,
                    feedback::INITIAL_SPAM_PREDICTION,
                    feedback::INITIAL_SENTIMENT_PREDICTION,
                    feedback::REAL_SPAM,
                    feedback::REAL_EMOTION,
                    feedback::CREATED_AT,
                    feedback::UPDATED_AT
                ),
                params![
                    record.message_id,
                    record.user_id,
                    record.text,
                    record.initial_spam_prediction,
                    record.initial_sentiment_prediction,
                    record.real_spam,
                    record.real_emotion.as_str(),
                    now
                ],
            )?;
            FeedbackAction::Created
        };

        tx.commit()?;
        debug!(message_id = record.message_id, action = %action, "Feedback written");
        Ok(action)
    }

    /// Blocking read of one feedback row
    pub fn get_blocking(&self, message_id: i64) -> Result<Option<StoredFeedback>> {
        let conn = self.get_connection()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {}, {}, {}, {}, {}, {}, {}, {}, {} FROM {} WHERE {} = ?1",
                    feedback::MESSAGE_ID,
                    feedback::USER_ID,
                    feedback::TEXT,
                    feedback::INITIAL_SPAM_PREDICTION,
                    feedback::INITIAL_SENTIMENT_PREDICTION,
                    feedback::REAL_SPAM,
                    feedback::REAL_EMOTION,
                    feedback::CREATED_AT,
                    feedback::UPDATED_AT,
                    feedback::TABLE,
                    feedback::MESSAGE_ID
                ),
                params![message_id],
                |row| {
                    Ok(FeedbackRow {
                        message_id: row.get(0)?,
                        user_id: row.get(1)?,
                        text: row.get(2)?,
                        initial_spam_prediction: row.get(3)?,
                        initial_sentiment_prediction: row.get(4)?,
                        real_spam: row.get(5)?,
                        real_emotion: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                },
            )
            .optional()?;

        row.map(FeedbackRow::into_stored).transpose()
    }

    /// Number of stored feedback rows
    pub fn count(&self) -> Result<i64> {
        let conn = self.get_connection()?;
        Ok(conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", feedback::TABLE),
            [],
            |row| row.get(0),
        )?)
    }
}

struct FeedbackRow {
    message_id: i64,
    user_id: i64,
    text: String,
    initial_spam_prediction: f64,
    initial_sentiment_prediction: String,
    real_spam: bool,
    real_emotion: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl FeedbackRow {
    fn into_stored(self) -> Result<StoredFeedback> {
        let real_emotion = self.real_emotion.parse::<Emotion>().map_err(|_| {
            PipelineError::Persistence(format!("stored label '{}' is invalid", self.real_emotion))
        })?;
        Ok(StoredFeedback {
            record: FeedbackRecord {
                message_id: self.message_id,
                user_id: self.user_id,
                text: self.text,
                initial_spam_prediction: self.initial_spam_prediction,
                initial_sentiment_prediction: self.initial_sentiment_prediction,
                real_spam: self.real_spam,
                real_emotion,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl FeedbackStore for Database {
    async fn upsert(&self, record: &FeedbackRecord) -> Result<FeedbackAction> {
        let db = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || db.upsert_blocking(&record))
            .await
            .map_err(|e| PipelineError::Persistence(format!("upsert task failed: {e}")))?
    }

    async fn get(&self, message_id: i64) -> Result<Option<StoredFeedback>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.get_blocking(message_id))
            .await
            .map_err(|e| PipelineError::Persistence(format!("read task failed: {e}")))?
    }
}
