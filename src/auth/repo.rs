use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{User, UserRole};

impl User {
    /// Create a new user with an already-hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token_hash, password_reset_expires, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find the user holding an unexpired reset secret with this
    /// fingerprint. Expiry is checked in the query, so an elapsed secret is
    /// indistinguishable from an unknown one.
    pub async fn find_by_reset_fingerprint(
        db: &PgPool,
        fingerprint: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, created_at
            FROM users
            WHERE password_reset_token_hash = $1
              AND password_reset_expires > now()
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Store a new reset fingerprint and expiry. A single UPDATE writes
    /// both fields, replacing any outstanding pair.
    pub async fn set_password_reset(
        db: &PgPool,
        id: Uuid,
        fingerprint: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = $2, password_reset_expires = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fingerprint)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Clear the reset pair, e.g. after a failed email dispatch.
    pub async fn clear_password_reset(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = NULL, password_reset_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Install a new password hash, stamp the change time and consume any
    /// outstanding reset secret, all in one statement.
    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = now(),
                password_reset_token_hash = NULL,
                password_reset_expires = NULL
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token_hash, password_reset_expires, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token_hash, password_reset_expires, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}
