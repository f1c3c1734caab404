//! User storage repository.

use std::collections::BTreeSet;

use chrono::Utc;
use rand::RngCore;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, info};

use super::model::{NewUser, Permission, User, UserId};
use super::validation::{decode_avatar, validate_registration};
use crate::db::{Database, parse_timestamp};
use crate::validation::ValidationError;
use crate::{Error, Result};

const USER_COLUMNS: &str = r"
    SELECT id, email, username, first_name, phone_number, country, avatar_name,
           token, is_staff, is_superuser, created_at
    FROM users
";

/// Repository for users and their permission grants.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a repository over the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Register a new user from a validated form.
    ///
    /// A fresh API token is generated for the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the form is invalid or the email or
    /// username is taken, or an error if the database query fails.
    pub async fn register(&self, form: &NewUser) -> Result<User> {
        validate_registration(form)?;

        let email = form.email.trim().to_lowercase();
        let username = form.username.trim().to_string();

        let mut taken = Vec::new();
        if self.exists("email", &email).await? {
            taken.push(ValidationError::DuplicateEmail);
        }
        if self.exists("username", &username).await? {
            taken.push(ValidationError::DuplicateUsername);
        }
        if !taken.is_empty() {
            return Err(Error::Validation(taken));
        }

        let avatar = form
            .avatar
            .as_ref()
            .map(|a| decode_avatar(a).map(|bytes| (a.name.clone(), bytes)))
            .transpose()
            .map_err(|e| Error::Validation(vec![e]))?;
        let (avatar_name, avatar_data) = avatar.unzip();

        let phone = form
            .phone_number
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let result = sqlx::query(
            r"
            INSERT INTO users (
                email, username, first_name, phone_number, country,
                avatar_name, avatar_data, token, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&email)
        .bind(&username)
        .bind(form.first_name.trim())
        .bind(phone)
        .bind(form.country.trim())
        .bind(avatar_name)
        .bind(avatar_data)
        .bind(generate_token())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = UserId::new(result.last_insert_rowid());
        info!(user_id = %id, "Registered user {username}");
        self.require(id).await
    }

    /// Get user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Get user by ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user.
    pub async fn require(&self, id: UserId) -> Result<User> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::not_found("User", id.0))
    }

    /// Resolve an API token to its user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{USER_COLUMNS} WHERE token = ?"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Replace the user's permission grants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user, or an error if
    /// the database query fails.
    pub async fn set_permissions(
        &self,
        id: UserId,
        permissions: &BTreeSet<Permission>,
    ) -> Result<User> {
        self.require(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        for permission in permissions {
            sqlx::query("INSERT INTO user_permissions (user_id, permission) VALUES (?, ?)")
                .bind(id.0)
                .bind(permission.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(user_id = %id, "Permissions set to {permissions:?}");
        self.require(id).await
    }

    /// Set or clear the staff flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user, or an error if
    /// the database query fails.
    pub async fn set_staff(&self, id: UserId, is_staff: bool) -> Result<User> {
        let result = sqlx::query("UPDATE users SET is_staff = ? WHERE id = ?")
            .bind(is_staff)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("User", id.0));
        }
        self.require(id).await
    }

    /// Delete a user.
    ///
    /// Owned recipients, messages and newsletters are kept with no owner;
    /// the user's attempts and statistics go with them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user, or an error if
    /// the database query fails.
    pub async fn delete(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("User", id.0));
        }
        info!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Make sure a superuser with this email exists and answers to `token`.
    ///
    /// An existing user with the email is promoted and gets the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn ensure_superuser(&self, email: &str, token: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        let id = if let Some(row) = existing {
            let id = UserId::new(row.get("id"));
            sqlx::query(
                "UPDATE users SET is_superuser = 1, is_staff = 1, token = ? WHERE id = ?",
            )
            .bind(token)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
            id
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO users (email, username, token, is_staff, is_superuser, created_at)
                VALUES (?, ?, ?, 1, 1, ?)
                ",
            )
            .bind(&email)
            .bind(&email)
            .bind(token)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
            UserId::new(result.last_insert_rowid())
        };

        info!(user_id = %id, "Superuser {email} is ready");
        self.require(id).await
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool> {
        let row = sqlx::query(&format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE {column} = ?) AS found"
        ))
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<User> {
        let id = UserId::new(row.get("id"));
        let permissions = sqlx::query("SELECT permission FROM user_permissions WHERE user_id = ?")
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .filter_map(|r| Permission::parse(r.get::<&str, _>("permission")))
            .collect();

        let created_at: String = row.get("created_at");
        Ok(User {
            id,
            email: row.get("email"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            phone_number: row.get("phone_number"),
            country: row.get("country"),
            avatar: row.get("avatar_name"),
            token: row.get("token"),
            is_staff: row.get("is_staff"),
            is_superuser: row.get("is_superuser"),
            permissions,
            created_at: parse_timestamp(&created_at),
        })
    }
}

/// Random 32-byte token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn repo() -> UserRepository {
        UserRepository::new(&Database::in_memory().await.unwrap())
    }

    fn form(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: username.into(),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn test_register_and_find_by_token() {
        let repo = repo().await;
        let user = repo.register(&form("Ann@Example.com", "ann")).await.unwrap();

        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.token.len(), 64);
        assert!(!user.is_staff);

        let found = repo.find_by_token(&user.token).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username() {
        let repo = repo().await;
        repo.register(&form("ann@example.com", "ann")).await.unwrap();

        let err = repo
            .register(&form("ann@example.com", "ann"))
            .await
            .unwrap_err();
        match err {
            Error::Validation(errors) => {
                assert_eq!(
                    errors,
                    vec![
                        ValidationError::DuplicateEmail,
                        ValidationError::DuplicateUsername
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_set_permissions_replaces_grants() {
        let repo = repo().await;
        let user = repo.register(&form("ann@example.com", "ann")).await.unwrap();

        let grants = BTreeSet::from([Permission::ViewAllRecipients, Permission::DeleteMessage]);
        let user = repo.set_permissions(user.id, &grants).await.unwrap();
        assert_eq!(user.permissions, grants);

        let grants = BTreeSet::from([Permission::DisableNewsletters]);
        let user = repo.set_permissions(user.id, &grants).await.unwrap();
        assert!(user.has_permission(Permission::DisableNewsletters));
        assert!(!user.has_permission(Permission::DeleteMessage));
    }

    #[tokio::test]
    async fn test_set_staff_and_delete() {
        let repo = repo().await;
        let user = repo.register(&form("ann@example.com", "ann")).await.unwrap();

        let user = repo.set_staff(user.id, true).await.unwrap();
        assert!(user.is_staff);

        repo.delete(user.id).await.unwrap();
        assert!(repo.get(user.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(user.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_superuser_is_idempotent() {
        let repo = repo().await;
        let first = repo.ensure_superuser("root@example.com", "abc").await.unwrap();
        assert!(first.is_superuser);

        let second = repo.ensure_superuser("root@example.com", "def").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.token, "def");
    }

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
