//! Message storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, info};

use super::model::{Message, MessageForm, MessageId, validate_message};
use crate::db::Database;
use crate::users::UserId;
use crate::{Error, Result};

/// Repository for messages.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Create a message owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form is rejected, or an error if
    /// the database query fails.
    pub async fn create(&self, form: &MessageForm, owner: UserId) -> Result<Message> {
        validate_message(form)?;

        let result = sqlx::query("INSERT INTO messages (subject, body, owner_id) VALUES (?, ?, ?)")
            .bind(form.subject.trim())
            .bind(form.body.trim())
            .bind(owner.0)
            .execute(&self.pool)
            .await?;

        let id = MessageId(result.last_insert_rowid());
        debug!(message_id = %id, "Created message");
        self.require(id).await
    }

    /// Get message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        let row = sqlx::query("SELECT id, subject, body, owner_id FROM messages WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_message))
    }

    /// Get message by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such message.
    pub async fn require(&self, id: MessageId) -> Result<Message> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("Message", id.0))
    }

    /// Replace a message's subject and body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form is rejected,
    /// [`Error::NotFound`] if there is no such message, or an error if the
    /// database query fails.
    pub async fn update(&self, id: MessageId, form: &MessageForm) -> Result<Message> {
        validate_message(form)?;

        let result = sqlx::query("UPDATE messages SET subject = ?, body = ? WHERE id = ?")
            .bind(form.subject.trim())
            .bind(form.body.trim())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Message", id.0));
        }
        self.require(id).await
    }

    /// Delete a message, and with it any newsletter built on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such message, or an error
    /// if the database query fails.
    pub async fn delete(&self, id: MessageId) -> Result<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Message", id.0));
        }
        info!(message_id = %id, "Deleted message");
        Ok(())
    }

    /// Messages owned by `owner`, by subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_owned(&self, owner: UserId) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, subject, body, owner_id FROM messages WHERE owner_id = ? ORDER BY subject ASC, id ASC",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Every message, by subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, subject, body, owner_id FROM messages ORDER BY subject ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }
}

fn row_to_message(row: &SqliteRow) -> Message {
    Message {
        id: MessageId(row.get("id")),
        subject: row.get("subject"),
        body: row.get("body"),
        owner_id: row.get::<Option<i64>, _>("owner_id").map(UserId),
    }
}
