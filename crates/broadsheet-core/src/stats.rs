//! Per-user mailing statistics and the public dashboard counters.

use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::Result;
use crate::db::Database;
use crate::newsletters::Status;
use crate::users::UserId;

/// Newsletter counts for one user, as of the last recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStatistics {
    /// User the counts belong to.
    pub user_id: UserId,
    /// Newsletters owned.
    pub total_mailings: i64,
    /// Owned newsletters whose last send reached every recipient.
    pub successful_mailings: i64,
    /// Owned newsletters that have not fully succeeded.
    pub failed_mailings: i64,
}

/// Site-wide counters shown on the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Every newsletter.
    pub total_campaigns: i64,
    /// Newsletters currently being sent.
    pub active_campaigns: i64,
    /// Every recipient.
    pub unique_recipients: i64,
}

/// Repository for statistics.
#[derive(Debug, Clone)]
pub struct StatisticsRepository {
    pool: SqlitePool,
}

impl StatisticsRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Recount the user's newsletters and overwrite their stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recompute(&self, user: UserId) -> Result<UserStatistics> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(success = 1), 0) AS successful,
                   COALESCE(SUM(success = 0), 0) AS failed
            FROM newsletters
            WHERE owner_id = ?
            ",
        )
        .bind(user.0)
        .fetch_one(&self.pool)
        .await?;

        let stats = UserStatistics {
            user_id: user,
            total_mailings: row.get("total"),
            successful_mailings: row.get("successful"),
            failed_mailings: row.get("failed"),
        };

        sqlx::query(
            r"
            INSERT INTO user_statistics (user_id, total_mailings, successful_mailings, failed_mailings)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                total_mailings = excluded.total_mailings,
                successful_mailings = excluded.successful_mailings,
                failed_mailings = excluded.failed_mailings
            ",
        )
        .bind(user.0)
        .bind(stats.total_mailings)
        .bind(stats.successful_mailings)
        .bind(stats.failed_mailings)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user, "Recomputed statistics: {stats:?}");
        Ok(stats)
    }

    /// Last stored statistics for the user, without recounting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn stored(&self, user: UserId) -> Result<Option<UserStatistics>> {
        let row = sqlx::query(
            r"
            SELECT total_mailings, successful_mailings, failed_mailings
            FROM user_statistics
            WHERE user_id = ?
            ",
        )
        .bind(user.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserStatistics {
            user_id: user,
            total_mailings: row.get("total_mailings"),
            successful_mailings: row.get("successful_mailings"),
            failed_mailings: row.get("failed_mailings"),
        }))
    }

    /// Site-wide dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let row = sqlx::query(
            r"
            SELECT (SELECT COUNT(*) FROM newsletters) AS total,
                   (SELECT COUNT(*) FROM newsletters WHERE status = ?) AS active,
                   (SELECT COUNT(*) FROM recipients) AS recipients
            ",
        )
        .bind(Status::Started.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Dashboard {
            total_campaigns: row.get("total"),
            active_campaigns: row.get("active"),
            unique_recipients: row.get("recipients"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::messages::{MessageForm, MessageRepository};
    use crate::newsletters::{NewsletterForm, NewsletterRepository};
    use crate::recipients::{RecipientForm, RecipientRepository};
    use crate::users::{NewUser, UserRepository};

    #[tokio::test]
    async fn test_recompute_counts_success_flags() {
        let db = Database::in_memory().await.unwrap();
        let ann = UserRepository::new(&db)
            .register(&NewUser {
                email: "ann@example.com".into(),
                username: "ann".into(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let stats = StatisticsRepository::new(&db);
        assert!(stats.stored(ann.id).await.unwrap().is_none());

        let r = RecipientRepository::new(&db)
            .create(
                &RecipientForm {
                    email: "r@example.com".into(),
                    full_name: "R".into(),
                    comment: "c".into(),
                },
                ann.id,
            )
            .await
            .unwrap();
        let messages = MessageRepository::new(&db);
        let newsletters = NewsletterRepository::new(&db);
        for (i, success) in [true, false, true].into_iter().enumerate() {
            let m = messages
                .create(
                    &MessageForm {
                        subject: format!("m{i}"),
                        body: "b".into(),
                    },
                    ann.id,
                )
                .await
                .unwrap();
            let n = newsletters
                .create(
                    &NewsletterForm {
                        message_id: m.id,
                        recipient_ids: vec![r.id],
                    },
                    &ann,
                )
                .await
                .unwrap();
            sqlx::query("UPDATE newsletters SET success = ? WHERE id = ?")
                .bind(success)
                .bind(n.id.0)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let computed = stats.recompute(ann.id).await.unwrap();
        assert_eq!(
            (
                computed.total_mailings,
                computed.successful_mailings,
                computed.failed_mailings
            ),
            (3, 2, 1)
        );
        assert_eq!(stats.stored(ann.id).await.unwrap(), Some(computed));

        // A second recompute overwrites rather than accumulates.
        let again = stats.recompute(ann.id).await.unwrap();
        assert_eq!(again, computed);

        let dashboard = stats.dashboard().await.unwrap();
        assert_eq!(dashboard.total_campaigns, 3);
        assert_eq!(dashboard.active_campaigns, 0);
        assert_eq!(dashboard.unique_recipients, 1);
    }

    #[tokio::test]
    async fn test_recompute_with_no_newsletters() {
        let db = Database::in_memory().await.unwrap();
        let ann = UserRepository::new(&db)
            .register(&NewUser {
                email: "ann@example.com".into(),
                username: "ann".into(),
                ..NewUser::default()
            })
            .await
            .unwrap();

        let computed = StatisticsRepository::new(&db).recompute(ann.id).await.unwrap();
        assert_eq!(computed.total_mailings, 0);
        assert_eq!(computed.failed_mailings, 0);
    }
}
