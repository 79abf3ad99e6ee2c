//!
//! # User Model
//!
//! Defines the `User` entity, its request payloads, and the database operations
//! on the `users` table. Passwords are stored as bcrypt hashes and never leave
//! this module in plain form; API responses use [`UserBody`], which carries no
//! credential material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;

/// A user row as stored in the database.
///
/// Deliberately does not implement `Serialize`: handlers convert to
/// [`UserBody`] instead, so the password hash cannot leak into a response.
/// The avatar bytes live in the same table but are only fetched by the
/// dedicated avatar operations.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public representation of a user returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Payload for creating an account.
///
/// Unknown fields are ignored here, unlike profile updates, so clients may
/// post extra bookkeeping keys without being rejected.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: i32,
}

impl CreateUser {
    /// Trims whitespace and lowercases the email, mirroring what happens on
    /// every other write path. Runs before validation.
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
    }
}

/// Payload for updating a profile. Every field is optional, but any field
/// outside this set fails deserialization and the request is rejected.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password"
    )]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UpdateUser {
    fn normalize(&mut self) {
        if let Some(name) = &self.name {
            self.name = Some(name.trim().to_string());
        }
        if let Some(email) = &self.email {
            self.email = Some(email.trim().to_lowercase());
        }
        if let Some(password) = &self.password {
            self.password = Some(password.trim().to_string());
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.age.is_none()
    }
}

/// Payload for a login request. Not validated beyond deserialization: any
/// credential pair that does not match a stored user fails uniformly.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("password");
        error.message = Some(Cow::from("Password cannot contain \"password\""));
        return Err(error);
    }
    Ok(())
}

impl User {
    /// Creates a new user with a bcrypt-hashed password.
    ///
    /// Hashing runs on the blocking thread pool so it does not stall the
    /// async executor. A duplicate email fails validation; the unique index
    /// on `users.email` backstops the check under concurrent signups.
    pub async fn create(pool: &PgPool, mut input: CreateUser) -> Result<User, AppError> {
        input.normalize();
        input.validate()?;

        if User::find_by_email(pool, &input.email).await?.is_some() {
            return Err(AppError::Validation("Email is already in use".into()));
        }

        let password = input.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash, age)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, email, password_hash, age, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(input.age)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, age, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, age, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks a credential pair against the stored hash.
    ///
    /// Fails with the same `Unable to login` error whether the email is
    /// unknown or the password is wrong. The email is normalized the same
    /// way signups are, so the address a user registered with always works.
    pub async fn authenticate(
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();
        let user = User::find_by_email(pool, &email)
            .await?
            .ok_or(AppError::LoginFailed)?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
        if !matches {
            return Err(AppError::LoginFailed);
        }

        Ok(user)
    }

    /// Applies a partial update, hashing the password if one is supplied.
    ///
    /// The `SET` clause is built from the fields actually present so an
    /// omitted field is never written. An empty patch is a no-op that
    /// returns the current row.
    pub async fn update(pool: &PgPool, id: Uuid, mut patch: UpdateUser) -> Result<User, AppError> {
        patch.normalize();
        patch.validate()?;

        if patch.is_empty() {
            return User::find_by_id(pool, id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()));
        }

        if let Some(email) = &patch.email {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(pool)
            .await?;
            if taken {
                return Err(AppError::Validation("Email is already in use".into()));
            }
        }

        let password_hash = match patch.password.take() {
            Some(password) => {
                Some(tokio::task::spawn_blocking(move || hash_password(&password)).await??)
            }
            None => None,
        };

        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;
        if patch.name.is_some() {
            sets.push(format!("name = ${}", idx));
            idx += 1;
        }
        if patch.email.is_some() {
            sets.push(format!("email = ${}", idx));
            idx += 1;
        }
        if password_hash.is_some() {
            sets.push(format!("password_hash = ${}", idx));
            idx += 1;
        }
        if patch.age.is_some() {
            sets.push(format!("age = ${}", idx));
            idx += 1;
        }
        sets.push("updated_at = now()".to_string());

        let sql = format!(
            "UPDATE users SET {} WHERE id = ${}
             RETURNING id, name, email, password_hash, age, created_at, updated_at",
            sets.join(", "),
            idx
        );

        let mut query = sqlx::query_as::<_, User>(&sql);
        if let Some(name) = patch.name {
            query = query.bind(name);
        }
        if let Some(email) = patch.email {
            query = query.bind(email);
        }
        if let Some(hash) = password_hash {
            query = query.bind(hash);
        }
        if let Some(age) = patch.age {
            query = query.bind(age);
        }

        let user = query.bind(id).fetch_one(pool).await?;
        Ok(user)
    }

    /// Deletes the account along with its tasks and sessions.
    ///
    /// Runs in one transaction so a failure partway leaves everything in
    /// place. Returns the deleted row, which the handler echoes back.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let user = sqlx::query_as::<_, User>(
            "DELETE FROM users WHERE id = $1
             RETURNING id, name, email, password_hash, age, created_at, updated_at",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn set_avatar(
        pool: &PgPool,
        id: Uuid,
        image: Vec<u8>,
        mime: &str,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET avatar = $1, avatar_mime = $2, updated_at = now() WHERE id = $3")
                .bind(image)
                .bind(mime)
                .bind(id)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    pub async fn clear_avatar(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET avatar = NULL, avatar_mime = NULL, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Fetches the stored avatar and its MIME type.
    ///
    /// Returns `None` when the user does not exist or has no avatar; callers
    /// treat both as a missing resource.
    pub async fn avatar(pool: &PgPool, id: Uuid) -> Result<Option<(Vec<u8>, String)>, AppError> {
        let row = sqlx::query_as::<_, (Option<Vec<u8>>, Option<String>)>(
            "SELECT avatar, avatar_mime FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some((Some(image), Some(mime))) => Ok(Some((image, mime))),
            _ => Ok(None),
        }
    }
}
