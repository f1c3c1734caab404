//! Attempt storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use tracing::info;

use super::model::{Attempt, AttemptId};
use crate::db::{Database, parse_timestamp};
use crate::newsletters::{NewsletterId, Status};
use crate::recipients::RecipientId;
use crate::users::UserId;
use crate::{Error, Result};

const ATTEMPT_COLUMNS: &str = r"
    SELECT id, attempted_at, status, server_response, newsletter_id, owner_id
    FROM attempts
";

const LISTING_ORDER: &str = "ORDER BY status ASC, attempted_at ASC, id ASC";

/// Repository for send attempts.
#[derive(Debug, Clone)]
pub struct AttemptRepository {
    pool: SqlitePool,
}

impl AttemptRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Open an attempt for `newsletter` run by `owner`.
    ///
    /// The response is empty until the outcome is recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn open(
        &self,
        newsletter: NewsletterId,
        owner: UserId,
        status: Status,
    ) -> Result<AttemptId> {
        let result = sqlx::query(
            r"
            INSERT INTO attempts (attempted_at, status, newsletter_id, owner_id)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(status.as_str())
        .bind(newsletter.0)
        .bind(owner.0)
        .execute(&self.pool)
        .await?;

        Ok(AttemptId(result.last_insert_rowid()))
    }

    /// Store the outcome of a run inside the caller's transaction.
    pub(crate) async fn record_outcome(
        conn: &mut SqliteConnection,
        id: AttemptId,
        status: Status,
        server_response: &str,
        delivered: &[RecipientId],
    ) -> Result<()> {
        for recipient in delivered {
            sqlx::query("INSERT INTO attempt_recipients (attempt_id, recipient_id) VALUES (?, ?)")
                .bind(id.0)
                .bind(recipient.0)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query("UPDATE attempts SET status = ?, server_response = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(server_response)
            .bind(id.0)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Get attempt by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AttemptId) -> Result<Option<Attempt>> {
        let row = sqlx::query(&format!("{ATTEMPT_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Get attempt by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such attempt.
    pub async fn require(&self, id: AttemptId) -> Result<Attempt> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("Attempt", id.0))
    }

    /// Attempts run by `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_owned(&self, owner: UserId) -> Result<Vec<Attempt>> {
        let rows = sqlx::query(&format!(
            "{ATTEMPT_COLUMNS} WHERE owner_id = ? {LISTING_ORDER}"
        ))
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in &rows {
            attempts.push(self.hydrate(row).await?);
        }
        Ok(attempts)
    }

    /// Every attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<Attempt>> {
        let rows = sqlx::query(&format!("{ATTEMPT_COLUMNS} {LISTING_ORDER}"))
            .fetch_all(&self.pool)
            .await?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in &rows {
            attempts.push(self.hydrate(row).await?);
        }
        Ok(attempts)
    }

    /// Attempts recorded for one newsletter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for(&self, newsletter: NewsletterId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM attempts WHERE newsletter_id = ?")
            .bind(newsletter.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Delete every attempt regardless of owner.
    ///
    /// Returns the number of attempts removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM attempts")
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected();
        info!("Cleared {removed} attempts");
        Ok(removed)
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<Attempt> {
        let id = AttemptId(row.get("id"));
        let recipient_ids = sqlx::query(
            "SELECT recipient_id FROM attempt_recipients WHERE attempt_id = ? ORDER BY recipient_id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| RecipientId(r.get("recipient_id")))
        .collect();

        let attempted_at: String = row.get("attempted_at");
        let status: String = row.get("status");
        Ok(Attempt {
            id,
            attempted_at: parse_timestamp(&attempted_at),
            status: Status::parse(&status),
            server_response: row.get("server_response"),
            newsletter_id: NewsletterId(row.get("newsletter_id")),
            recipient_ids,
            owner_id: UserId(row.get("owner_id")),
        })
    }
}
