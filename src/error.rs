//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! various error conditions that can occur, from database issues to validation failures.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies of the form
//! `{"error": "..."}`. It also provides `From` trait implementations for common error
//! types like `sqlx::Error`, `validator::ValidationErrors`, and `bcrypt::BcryptError`,
//! allowing for easy conversion using the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, often carrying a message
/// detailing the issue. These errors are then converted into appropriate HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Represents a client-side error due to malformed or disallowed input,
    /// including unknown patch fields and rejected avatar uploads (HTTP 400).
    Validation(String),
    /// Represents a failed login attempt (HTTP 400).
    ///
    /// Carries no detail on purpose: the response is the same whether the email
    /// is unknown or the password is wrong, so registered addresses cannot be
    /// probed through the login endpoint.
    LoginFailed,
    /// Represents a missing, invalid, or revoked bearer token (HTTP 401).
    Authentication(String),
    /// Represents a situation where a requested resource was not found (HTTP 404).
    ///
    /// Also used for resources owned by another user, which are deliberately
    /// indistinguishable from absent ones.
    NotFound(String),
    /// Represents an error originating from database operations (HTTP 500).
    /// Wraps errors from the `sqlx` crate.
    Database(String),
    /// Represents an unexpected server-side error (HTTP 500).
    /// This can be used for generic internal errors not covered by more specific types.
    Server(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::LoginFailed => write!(f, "Unable to login"),
            AppError::Authentication(msg) => write!(f, "Authentication Error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Database(msg) => write!(f, "Database Error: {}", msg),
            AppError::Server(msg) => write!(f, "Server Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// This implementation allows Actix Web to automatically translate `AppError`
/// results from handlers into the correct HTTP status codes and JSON error responses.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::LoginFailed => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Validation(msg)
            | AppError::Authentication(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::LoginFailed => "Unable to login".to_string(),
            // Internal details go to the logs, not to the client.
            AppError::Database(msg) | AppError::Server(msg) => {
                log::error!("internal error: {}", msg);
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` is mapped to `AppError::NotFound`, and unique
/// constraint violations (the email index) to `AppError::Validation`, so a
/// duplicate signup stays a 400 even when two requests race past the
/// application-level check. Other database errors become `AppError::Database`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Validation("Email is already in use".into())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// Surfaces the messages declared on the payload structs ("Email is
/// invalid") rather than the default field-prefixed rendering.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        let messages: Vec<String> = error
            .field_errors()
            .iter()
            .flat_map(|(_, errors)| errors.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .collect();
        if messages.is_empty() {
            AppError::Validation(error.to_string())
        } else {
            AppError::Validation(messages.join(", "))
        }
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::Server`.
///
/// This handles errors during password hashing or verification.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Server(error.to_string())
    }
}

/// Converts `actix_multipart::MultipartError` into `AppError::Validation`.
///
/// Raised when an avatar upload stream is malformed or truncated.
impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::Validation(format!("Invalid upload: {}", error))
    }
}

/// Converts `tokio::task::JoinError` into `AppError::Server`.
///
/// Raised if a blocking password-hashing task panics or is cancelled.
impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> AppError {
        AppError::Server(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn test_error_responses() {
        // Test Validation
        let error = AppError::Validation("Name is required".into());
        let response = error.error_response();
        assert_eq!(response.status(), 400);

        // Test LoginFailed
        let error = AppError::LoginFailed;
        let response = error.error_response();
        assert_eq!(response.status(), 400);

        // Test Authentication
        let error = AppError::Authentication("Please authenticate".into());
        let response = error.error_response();
        assert_eq!(response.status(), 401);

        // Test NotFound
        let error = AppError::NotFound("Task not found".into());
        let response = error.error_response();
        assert_eq!(response.status(), 404);

        // Test Database
        let error = AppError::Database("connection reset".into());
        let response = error.error_response();
        assert_eq!(response.status(), 500);

        // Test Server
        let error = AppError::Server("boom".into());
        let response = error.error_response();
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn test_validation_messages_drop_field_prefix() {
        let mut errors = ValidationErrors::new();
        let mut length = ValidationError::new("length");
        length.message = Some("Description is required".into());
        errors.add("description", length);

        let error: AppError = errors.into();
        assert!(matches!(error, AppError::Validation(msg) if msg == "Description is required"));
    }

    #[test]
    fn test_login_failure_message_is_fixed() {
        // The message must not reveal whether the email exists.
        assert_eq!(AppError::LoginFailed.to_string(), "Unable to login");
    }
}
