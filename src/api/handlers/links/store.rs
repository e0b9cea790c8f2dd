//! Token persistence for access links.
//!
//! The store is a plain persistence seam: lookups, creation, saves, and the
//! ordered listing. It enforces no uniqueness on `email`; the submission
//! flow performs its own check-then-create, and a raced duplicate is
//! tolerated (lookups return the newest row).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// One issued access link.
///
/// `last_visited` is refreshed by the store on every save, so it tracks the
/// latest mutation, not only visits.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct EmailToken {
    pub token: Uuid,
    pub email: String,
    pub created: DateTime<Utc>,
    pub visit_count: i64,
    pub last_visited: DateTime<Utc>,
    pub active: bool,
}

/// Persistence contract for [`EmailToken`] records.
///
/// All errors are storage failures and propagate; business rules live in the
/// lifecycle layer.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Newest record for the address, if any, regardless of `active`.
    async fn find_by_email(&self, email: &str) -> Result<Option<EmailToken>>;

    async fn find_by_id(&self, token: Uuid) -> Result<Option<EmailToken>>;

    /// Insert a fresh record: random token, `visit_count = 0`, `active`.
    async fn create(&self, email: &str) -> Result<EmailToken>;

    /// Persist a mutated record and return the stored state. The store
    /// refreshes `last_visited`.
    async fn save(&self, record: &EmailToken) -> Result<EmailToken>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<EmailToken>>;

    /// Cheap connectivity check for health reporting.
    async fn ping(&self) -> Result<()>;
}

/// PostgreSQL-backed store; see `sql/schema.sql` for the table.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TOKEN_COLUMNS: &str = "token, email, created, visit_count, last_visited, active";

fn token_from_row(row: &PgRow) -> EmailToken {
    EmailToken {
        token: row.get("token"),
        email: row.get("email"),
        created: row.get("created"),
        visit_count: row.get("visit_count"),
        last_visited: row.get("last_visited"),
        active: row.get("active"),
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<EmailToken>> {
        let query = format!(
            "SELECT {TOKEN_COLUMNS} FROM email_tokens WHERE email = $1 ORDER BY created DESC LIMIT 1"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup token by email")?;

        Ok(row.as_ref().map(token_from_row))
    }

    async fn find_by_id(&self, token: Uuid) -> Result<Option<EmailToken>> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM email_tokens WHERE token = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup token by id")?;

        Ok(row.as_ref().map(token_from_row))
    }

    async fn create(&self, email: &str) -> Result<EmailToken> {
        let query = format!(
            "INSERT INTO email_tokens (token, email) VALUES ($1, $2) RETURNING {TOKEN_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert email token")?;

        Ok(token_from_row(&row))
    }

    async fn save(&self, record: &EmailToken) -> Result<EmailToken> {
        let query = format!(
            r"
            UPDATE email_tokens
            SET email = $2,
                visit_count = $3,
                active = $4,
                last_visited = NOW()
            WHERE token = $1
            RETURNING {TOKEN_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(record.token)
            .bind(&record.email)
            .bind(record.visit_count)
            .bind(record.active)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to save email token")?;

        Ok(token_from_row(&row))
    }

    async fn list_all(&self) -> Result<Vec<EmailToken>> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM email_tokens ORDER BY created DESC");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list email tokens")?;

        Ok(rows.iter().map(token_from_row).collect())
    }

    async fn ping(&self) -> Result<()> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .context("failed to acquire database connection")?;
            conn.ping().await.context("failed to ping database")
        }
        .instrument(span)
        .await
    }
}
