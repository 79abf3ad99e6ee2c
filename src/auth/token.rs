use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: Uuid,
    /// Timestamp (seconds since epoch) at which the token was issued.
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
    /// Random token identifier. Two logins in the same second still produce
    /// distinct tokens, which keeps single-session logout unambiguous.
    pub jti: Uuid,
}

/// Generates a JWT for a given user ID.
///
/// The token is set to expire in 24 hours.
/// It requires the `JWT_SECRET` environment variable to be set for signing the token.
///
/// # Returns
/// A `Result` containing the JWT string if successful.
/// Returns `AppError::Server` if `JWT_SECRET` is not set or if token encoding fails.
pub fn generate_token(user_id: Uuid) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::hours(24))
        .ok_or_else(|| AppError::Server("Token expiry overflowed".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: expiration,
        jti: Uuid::new_v4(),
    };

    let secret = match std::env::var("JWT_SECRET") {
        Ok(val) => val,
        Err(_) => return Err(AppError::Server("JWT_SECRET not set".into())),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Server(format!("Failed to generate token: {}", e)))
}

/// Verifies a JWT string and decodes its claims.
///
/// It requires the `JWT_SECRET` environment variable to be set for verifying the token signature.
/// Default validation checks are applied (signature and expiration).
///
/// # Returns
/// A `Result` containing the decoded `Claims` if the token is valid.
/// Returns `AppError::Server` if `JWT_SECRET` is not set.
/// Returns `AppError::Authentication` if the token is malformed, its signature is
/// invalid, or it has expired. Callers that answer HTTP requests replace the
/// detailed message with a uniform "Please authenticate" body.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = match std::env::var("JWT_SECRET") {
        Ok(val) => val,
        Err(_) => return Err(AppError::Server("JWT_SECRET not set".into())),
    };
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
}
