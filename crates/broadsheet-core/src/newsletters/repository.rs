//! Newsletter storage repository.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

use super::model::{Newsletter, NewsletterForm, NewsletterId, Status};
use crate::db::{Database, is_unique_violation, parse_timestamp};
use crate::messages::MessageId;
use crate::policy::{Entity, sees_all};
use crate::recipients::{Recipient, RecipientId, row_to_recipient};
use crate::users::{User, UserId};
use crate::validation::{ValidationError, finish};
use crate::{Error, Result};

const NEWSLETTER_COLUMNS: &str = r"
    SELECT id, sent_date, end_of_sending, status, message_id, owner_id, is_blocked, success
    FROM newsletters
";

const LISTING_ORDER: &str = "ORDER BY status ASC, sent_date ASC, end_of_sending ASC, id ASC";

/// Repository for newsletters and their recipient sets.
#[derive(Debug, Clone)]
pub struct NewsletterRepository {
    pool: SqlitePool,
}

impl NewsletterRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Create a newsletter owned by `actor`.
    ///
    /// Status starts at `created`; both dates are stamped with the current
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the message or any recipient is
    /// unknown or not visible to `actor`, the message already belongs to a
    /// newsletter, or no recipients are given. Returns an error if the
    /// database query fails.
    pub async fn create(&self, form: &NewsletterForm, actor: &User) -> Result<Newsletter> {
        let recipients = self.check_form(form, actor, None).await?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            INSERT INTO newsletters (sent_date, end_of_sending, status, message_id, owner_id)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(&now)
        .bind(&now)
        .bind(Status::Created.as_str())
        .bind(form.message_id.0)
        .bind(actor.id.0)
        .execute(&mut *tx)
        .await
        .map_err(map_message_in_use)?;

        let id = NewsletterId(result.last_insert_rowid());
        replace_recipients(&mut tx, id, &recipients).await?;
        tx.commit().await?;

        info!(newsletter_id = %id, owner = %actor.id, "Created newsletter");
        self.require(id).await
    }

    /// Get newsletter by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: NewsletterId) -> Result<Option<Newsletter>> {
        let row = sqlx::query(&format!("{NEWSLETTER_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Get newsletter by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such newsletter.
    pub async fn require(&self, id: NewsletterId) -> Result<Newsletter> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("Newsletter", id.0))
    }

    /// Replace the message and recipient set.
    ///
    /// Status, flags and dates are left alone.
    ///
    /// # Errors
    ///
    /// Same as [`NewsletterRepository::create`], plus [`Error::NotFound`] if
    /// there is no such newsletter.
    pub async fn update(
        &self,
        id: NewsletterId,
        form: &NewsletterForm,
        actor: &User,
    ) -> Result<Newsletter> {
        self.require(id).await?;
        let recipients = self.check_form(form, actor, Some(id)).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE newsletters SET message_id = ? WHERE id = ?")
            .bind(form.message_id.0)
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_message_in_use)?;
        replace_recipients(&mut tx, id, &recipients).await?;
        tx.commit().await?;

        debug!(newsletter_id = %id, "Updated newsletter");
        self.require(id).await
    }

    /// Delete a newsletter and its attempts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such newsletter, or an
    /// error if the database query fails.
    pub async fn delete(&self, id: NewsletterId) -> Result<()> {
        let result = sqlx::query("DELETE FROM newsletters WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Newsletter", id.0));
        }
        info!(newsletter_id = %id, "Deleted newsletter");
        Ok(())
    }

    /// Newsletters owned by `owner`, by status then dates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_owned(&self, owner: UserId) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(&format!(
            "{NEWSLETTER_COLUMNS} WHERE owner_id = ? {LISTING_ORDER}"
        ))
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(&rows).await
    }

    /// Every newsletter, by status then dates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(&format!("{NEWSLETTER_COLUMNS} {LISTING_ORDER}"))
            .fetch_all(&self.pool)
            .await?;

        self.hydrate_all(&rows).await
    }

    /// Block or unblock a newsletter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such newsletter, or an
    /// error if the database query fails.
    pub async fn set_blocked(&self, id: NewsletterId, is_blocked: bool) -> Result<Newsletter> {
        let result = sqlx::query("UPDATE newsletters SET is_blocked = ? WHERE id = ?")
            .bind(is_blocked)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Newsletter", id.0));
        }
        self.require(id).await
    }

    /// Move a newsletter to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such newsletter, or an
    /// error if the database query fails.
    pub async fn set_status(&self, id: NewsletterId, status: Status) -> Result<()> {
        let result = sqlx::query("UPDATE newsletters SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Newsletter", id.0));
        }
        Ok(())
    }

    /// Recipients of a newsletter, in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recipients_of(&self, id: NewsletterId) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            r"
            SELECT r.id, r.email, r.full_name, r.comment, r.owner_id
            FROM recipients r
            JOIN newsletter_recipients nr ON nr.recipient_id = r.id
            WHERE nr.newsletter_id = ?
            ORDER BY r.full_name ASC, r.email ASC
            ",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_recipient).collect())
    }

    /// Total number of newsletters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM newsletters")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Number of newsletters in `status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_with_status(&self, status: Status) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM newsletters WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Record the end of a send inside the caller's transaction.
    pub(crate) async fn complete_send(
        conn: &mut SqliteConnection,
        id: NewsletterId,
        status: Status,
        success: bool,
    ) -> Result<()> {
        sqlx::query("UPDATE newsletters SET status = ?, success = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(success)
            .bind(id.0)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Check form references against what `actor` can see.
    ///
    /// Returns the de-duplicated recipient set.
    async fn check_form(
        &self,
        form: &NewsletterForm,
        actor: &User,
        current: Option<NewsletterId>,
    ) -> Result<BTreeSet<RecipientId>> {
        let mut errors = Vec::new();

        let message_owner = sqlx::query("SELECT owner_id FROM messages WHERE id = ?")
            .bind(form.message_id.0)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get::<Option<i64>, _>("owner_id").map(UserId));

        match message_owner {
            Some(owner) if visible(actor, Entity::Message, owner) => {
                if self.message_taken(form.message_id, current).await? {
                    errors.push(ValidationError::MessageInUse);
                }
            }
            _ => errors.push(ValidationError::UnknownMessage),
        }

        let recipients: BTreeSet<RecipientId> = form.recipient_ids.iter().copied().collect();
        if recipients.is_empty() {
            errors.push(ValidationError::EmptyRecipients);
        }
        for id in &recipients {
            let owner = sqlx::query("SELECT owner_id FROM recipients WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.get::<Option<i64>, _>("owner_id").map(UserId));

            if !owner.is_some_and(|owner| visible(actor, Entity::Recipient, owner)) {
                errors.push(ValidationError::UnknownRecipient);
                break;
            }
        }

        finish(errors)?;
        Ok(recipients)
    }

    async fn message_taken(
        &self,
        message_id: MessageId,
        current: Option<NewsletterId>,
    ) -> Result<bool> {
        let row = sqlx::query("SELECT id FROM newsletters WHERE message_id = ? AND id != ?")
            .bind(message_id.0)
            .bind(current.map_or(-1, |id| id.0))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn hydrate_all(&self, rows: &[SqliteRow]) -> Result<Vec<Newsletter>> {
        let mut newsletters = Vec::with_capacity(rows.len());
        for row in rows {
            newsletters.push(self.hydrate(row).await?);
        }
        Ok(newsletters)
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<Newsletter> {
        let id = NewsletterId(row.get("id"));
        let recipient_ids = self
            .recipients_of(id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        let sent_date: String = row.get("sent_date");
        let end_of_sending: String = row.get("end_of_sending");
        let status: String = row.get("status");
        Ok(Newsletter {
            id,
            sent_date: parse_timestamp(&sent_date),
            end_of_sending: parse_timestamp(&end_of_sending),
            status: Status::parse(&status),
            message_id: MessageId(row.get("message_id")),
            recipient_ids,
            owner_id: row.get::<Option<i64>, _>("owner_id").map(UserId),
            is_blocked: row.get("is_blocked"),
            success: row.get("success"),
        })
    }
}

fn visible(actor: &User, entity: Entity, owner: Option<UserId>) -> bool {
    owner == Some(actor.id) || sees_all(actor, entity)
}

async fn replace_recipients(
    tx: &mut Transaction<'_, Sqlite>,
    id: NewsletterId,
    recipients: &BTreeSet<RecipientId>,
) -> Result<()> {
    sqlx::query("DELETE FROM newsletter_recipients WHERE newsletter_id = ?")
        .bind(id.0)
        .execute(&mut **tx)
        .await?;
    for recipient in recipients {
        sqlx::query("INSERT INTO newsletter_recipients (newsletter_id, recipient_id) VALUES (?, ?)")
            .bind(id.0)
            .bind(recipient.0)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn map_message_in_use(err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        Error::Validation(vec![ValidationError::MessageInUse])
    } else {
        Error::Database(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::messages::{MessageForm, MessageRepository};
    use crate::recipients::{RecipientForm, RecipientRepository};
    use crate::users::{NewUser, Permission, UserRepository};

    struct Fixture {
        db: Database,
        users: UserRepository,
        newsletters: NewsletterRepository,
        ann: User,
        bob: User,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(&db);
        let ann = users
            .register(&NewUser {
                email: "ann@example.com".into(),
                username: "ann".into(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let bob = users
            .register(&NewUser {
                email: "bob@example.com".into(),
                username: "bob".into(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        Fixture {
            newsletters: NewsletterRepository::new(&db),
            db,
            users,
            ann,
            bob,
        }
    }

    async fn message(db: &Database, owner: &User, subject: &str) -> MessageId {
        MessageRepository::new(db)
            .create(
                &MessageForm {
                    subject: subject.into(),
                    body: "Hello".into(),
                },
                owner.id,
            )
            .await
            .unwrap()
            .id
    }

    async fn recipient(db: &Database, owner: &User, email: &str) -> RecipientId {
        RecipientRepository::new(db)
            .create(
                &RecipientForm {
                    email: email.into(),
                    full_name: email.into(),
                    comment: "c".into(),
                },
                owner.id,
            )
            .await
            .unwrap()
            .id
    }

    fn errors(err: Error) -> Vec<ValidationError> {
        match err {
            Error::Validation(errors) => errors,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_stamps_dates_and_status() {
        let f = fixture().await;
        let m = message(&f.db, &f.ann, "Hi").await;
        let r1 = recipient(&f.db, &f.ann, "a@example.com").await;
        let r2 = recipient(&f.db, &f.ann, "b@example.com").await;

        let n = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: m,
                    recipient_ids: vec![r2, r1, r2],
                },
                &f.ann,
            )
            .await
            .unwrap();

        assert_eq!(n.status, Status::Created);
        assert_eq!(n.sent_date, n.end_of_sending);
        assert_eq!(n.recipient_ids, vec![r1, r2]);
        assert_eq!(n.owner_id, Some(f.ann.id));
        assert!(!n.is_blocked);
        assert!(!n.success);
    }

    #[tokio::test]
    async fn test_message_is_one_to_one() {
        let f = fixture().await;
        let m = message(&f.db, &f.ann, "Hi").await;
        let r = recipient(&f.db, &f.ann, "a@example.com").await;
        let form = NewsletterForm {
            message_id: m,
            recipient_ids: vec![r],
        };

        let first = f.newsletters.create(&form, &f.ann).await.unwrap();
        let err = f.newsletters.create(&form, &f.ann).await.unwrap_err();
        assert_eq!(errors(err), vec![ValidationError::MessageInUse]);

        // Re-saving the same newsletter keeps its own message.
        f.newsletters.update(first.id, &form, &f.ann).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_references_are_rejected() {
        let f = fixture().await;
        let m = message(&f.db, &f.ann, "Hi").await;
        let r = recipient(&f.db, &f.ann, "a@example.com").await;

        let err = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: m,
                    recipient_ids: vec![r],
                },
                &f.bob,
            )
            .await
            .unwrap_err();
        assert_eq!(
            errors(err),
            vec![ValidationError::UnknownMessage, ValidationError::UnknownRecipient]
        );

        let err = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: MessageId(404),
                    recipient_ids: vec![],
                },
                &f.ann,
            )
            .await
            .unwrap_err();
        assert_eq!(
            errors(err),
            vec![ValidationError::UnknownMessage, ValidationError::EmptyRecipients]
        );
    }

    #[tokio::test]
    async fn test_view_all_grants_widen_references() {
        let f = fixture().await;
        let m = message(&f.db, &f.ann, "Hi").await;
        let r = recipient(&f.db, &f.ann, "a@example.com").await;
        let grants = BTreeSet::from([Permission::ViewAllMessages, Permission::ViewAllRecipients]);
        let bob = f.users.set_permissions(f.bob.id, &grants).await.unwrap();

        let n = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: m,
                    recipient_ids: vec![r],
                },
                &bob,
            )
            .await
            .unwrap();
        assert_eq!(n.owner_id, Some(bob.id));
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_flags() {
        let f = fixture().await;
        let m1 = message(&f.db, &f.ann, "One").await;
        let m2 = message(&f.db, &f.ann, "Two").await;
        let r1 = recipient(&f.db, &f.ann, "a@example.com").await;
        let r2 = recipient(&f.db, &f.ann, "b@example.com").await;

        let n = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: m1,
                    recipient_ids: vec![r1],
                },
                &f.ann,
            )
            .await
            .unwrap();
        f.newsletters.set_blocked(n.id, true).await.unwrap();
        f.newsletters.set_status(n.id, Status::Completed).await.unwrap();

        let updated = f
            .newsletters
            .update(
                n.id,
                &NewsletterForm {
                    message_id: m2,
                    recipient_ids: vec![r2],
                },
                &f.ann,
            )
            .await
            .unwrap();
        assert_eq!(updated.message_id, m2);
        assert_eq!(updated.recipient_ids, vec![r2]);
        assert_eq!(updated.status, Status::Completed);
        assert!(updated.is_blocked);
        assert_eq!(updated.sent_date, n.sent_date);
    }

    #[tokio::test]
    async fn test_deleting_message_cascades() {
        let f = fixture().await;
        let m = message(&f.db, &f.ann, "Hi").await;
        let r = recipient(&f.db, &f.ann, "a@example.com").await;
        let n = f
            .newsletters
            .create(
                &NewsletterForm {
                    message_id: m,
                    recipient_ids: vec![r],
                },
                &f.ann,
            )
            .await
            .unwrap();

        MessageRepository::new(&f.db).delete(m).await.unwrap();
        assert!(f.newsletters.get(n.id).await.unwrap().is_none());
        assert_eq!(f.newsletters.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listing_and_counts() {
        let f = fixture().await;
        let r = recipient(&f.db, &f.ann, "a@example.com").await;
        let mut ids = Vec::new();
        for subject in ["a", "b", "c"] {
            let m = message(&f.db, &f.ann, subject).await;
            let n = f
                .newsletters
                .create(
                    &NewsletterForm {
                        message_id: m,
                        recipient_ids: vec![r],
                    },
                    &f.ann,
                )
                .await
                .unwrap();
            ids.push(n.id);
        }
        f.newsletters.set_status(ids[0], Status::Started).await.unwrap();

        assert_eq!(f.newsletters.count().await.unwrap(), 3);
        assert_eq!(
            f.newsletters.count_with_status(Status::Started).await.unwrap(),
            1
        );
        assert_eq!(f.newsletters.list_owned(f.ann.id).await.unwrap().len(), 3);
        assert!(f.newsletters.list_owned(f.bob.id).await.unwrap().is_empty());

        let statuses: Vec<_> = f
            .newsletters
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.status)
            .collect();
        assert_eq!(
            statuses,
            vec![Status::Created, Status::Created, Status::Started]
        );
    }
}
