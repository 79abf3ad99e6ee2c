use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The authenticated caller, extracted from request extensions.
///
/// `AuthMiddleware` resolves the bearer token to a user and inserts this
/// before the handler runs. The token rides along with the user so that
/// single-session logout knows exactly which session to revoke.
///
/// If the value is missing (the middleware did not run, or the route was
/// registered outside it), extraction fails with the same 401 the middleware
/// itself produces.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: User,
    pub token: String,
}

impl FromRequest for CurrentSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CurrentSession>().cloned() {
            Some(session) => ready(Ok(session)),
            None => {
                let err = AppError::Authentication("Please authenticate".into());
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Mike".to_string(),
            email: "mike@example.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            age: 27,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[actix_rt::test]
    async fn test_current_session_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let user = sample_user();
        let user_id = user.id;
        req.extensions_mut().insert(CurrentSession {
            user,
            token: "token-123".to_string(),
        });

        let mut payload = Payload::None;
        let session = CurrentSession::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(session.user.id, user_id);
        assert_eq!(session.token, "token-123");
    }

    #[actix_rt::test]
    async fn test_current_session_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();
        // Nothing inserted into extensions.

        let mut payload = Payload::None;
        let result = CurrentSession::from_request(&req, &mut payload).await;
        assert!(result.is_err());

        let response = result.unwrap_err().error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
