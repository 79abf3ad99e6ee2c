//!
//! # Session Model
//!
//! Server-side record of every issued token. A JWT is only accepted while a
//! matching row exists, which is what makes logout an actual revocation
//! rather than a client-side courtesy.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::User;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Records a freshly signed token for the user.
    pub async fn issue(pool: &PgPool, user_id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO sessions (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Resolves a decoded token to its user, in one round trip.
    ///
    /// The join ensures both that the user still exists and that this exact
    /// token has not been revoked. Any miss is an authentication failure;
    /// callers never learn which condition failed.
    pub async fn verify(pool: &PgPool, user_id: Uuid, token: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.password_hash, u.age, u.created_at, u.updated_at
             FROM users u
             INNER JOIN sessions s ON s.user_id = u.id
             WHERE u.id = $1 AND s.token = $2",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(pool)
        .await?;

        user.ok_or_else(|| AppError::Authentication("Please authenticate".into()))
    }

    /// Revokes a single session. Tokens carry a random identifier, so the
    /// token string pins down exactly one row.
    pub async fn revoke(pool: &PgPool, user_id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Revokes every session the user holds, on this and any other device.
    pub async fn revoke_all(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Lists a user's sessions oldest first. Insertion order is the login
    /// order, which the sequential primary key preserves.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token, created_at FROM sessions WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }
}
