//! Recipient storage repository.

use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, info};

use super::model::{Recipient, RecipientForm, RecipientId, validate_recipient};
use crate::cache::RecipientCache;
use crate::db::{Database, is_unique_violation};
use crate::users::UserId;
use crate::validation::ValidationError;
use crate::{Error, Result};

/// Repository for recipients.
///
/// The unscoped listing is served from a [`RecipientCache`] that every
/// write through this repository invalidates.
#[derive(Debug, Clone)]
pub struct RecipientRepository {
    pool: SqlitePool,
    cache: RecipientCache,
}

impl RecipientRepository {
    /// Create a repository with the default cache lifetime.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            cache: RecipientCache::default(),
        }
    }

    /// Create a repository whose listing cache expires after `ttl`.
    #[must_use]
    pub fn with_cache_ttl(db: &Database, ttl: Duration) -> Self {
        Self {
            pool: db.pool().clone(),
            cache: RecipientCache::with_ttl(ttl),
        }
    }

    /// Create a recipient owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form is invalid or the email is
    /// already used, or an error if the database query fails.
    pub async fn create(&self, form: &RecipientForm, owner: UserId) -> Result<Recipient> {
        validate_recipient(form)?;

        let result = sqlx::query(
            "INSERT INTO recipients (email, full_name, comment, owner_id) VALUES (?, ?, ?, ?)",
        )
        .bind(form.normalized_email())
        .bind(form.full_name.trim())
        .bind(form.comment.trim())
        .bind(owner.0)
        .execute(&self.pool)
        .await
        .map_err(map_duplicate)?;

        let id = RecipientId(result.last_insert_rowid());
        self.cache.invalidate().await;
        debug!(recipient_id = %id, "Created recipient");
        self.require(id).await
    }

    /// Get recipient by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: RecipientId) -> Result<Option<Recipient>> {
        let row = sqlx::query(
            "SELECT id, email, full_name, comment, owner_id FROM recipients WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_recipient))
    }

    /// Get recipient by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such recipient.
    pub async fn require(&self, id: RecipientId) -> Result<Recipient> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("Recipient", id.0))
    }

    /// Replace a recipient's fields. The owner is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form is invalid or the email is
    /// used by another recipient, [`Error::NotFound`] if there is no such
    /// recipient, or an error if the database query fails.
    pub async fn update(&self, id: RecipientId, form: &RecipientForm) -> Result<Recipient> {
        validate_recipient(form)?;

        let result =
            sqlx::query("UPDATE recipients SET email = ?, full_name = ?, comment = ? WHERE id = ?")
                .bind(form.normalized_email())
                .bind(form.full_name.trim())
                .bind(form.comment.trim())
                .bind(id.0)
                .execute(&self.pool)
                .await
                .map_err(map_duplicate)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Recipient", id.0));
        }

        self.cache.invalidate().await;
        self.require(id).await
    }

    /// Delete a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such recipient, or an error
    /// if the database query fails.
    pub async fn delete(&self, id: RecipientId) -> Result<()> {
        let result = sqlx::query("DELETE FROM recipients WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Recipient", id.0));
        }

        self.cache.invalidate().await;
        info!(recipient_id = %id, "Deleted recipient");
        Ok(())
    }

    /// Recipients owned by `owner`, by name then email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_owned(&self, owner: UserId) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, full_name, comment, owner_id
            FROM recipients
            WHERE owner_id = ?
            ORDER BY full_name ASC, email ASC
            ",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_recipient).collect())
    }

    /// Every recipient, read through the listing cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is cold and the database query fails.
    pub async fn list_all(&self) -> Result<Arc<Vec<Recipient>>> {
        if let Some(hit) = self.cache.get().await {
            return Ok(hit);
        }

        let rows = sqlx::query(
            r"
            SELECT id, email, full_name, comment, owner_id
            FROM recipients
            ORDER BY full_name ASC, email ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let all = Arc::new(rows.iter().map(row_to_recipient).collect::<Vec<_>>());
        self.cache.put(Arc::clone(&all)).await;
        debug!("Refreshed recipient cache with {} entries", all.len());
        Ok(all)
    }

    /// Total number of recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM recipients")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

fn map_duplicate(err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        Error::Validation(vec![ValidationError::DuplicateEmail])
    } else {
        Error::Database(err)
    }
}

pub(crate) fn row_to_recipient(row: &SqliteRow) -> Recipient {
    Recipient {
        id: RecipientId(row.get("id")),
        email: row.get("email"),
        full_name: row.get("full_name"),
        comment: row.get("comment"),
        owner_id: row.get::<Option<i64>, _>("owner_id").map(UserId),
    }
}
