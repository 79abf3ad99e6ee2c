use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;

use crate::auth::extractors::CurrentSession;
use crate::auth::token::verify_token;
use crate::error::AppError;
use crate::models::Session;

/// Routes reachable without a token: signup, login, the health check, and
/// serving stored avatars.
fn is_public(method: &Method, path: &str) -> bool {
    if *method == Method::POST {
        return path == "/users" || path == "/users/login";
    }
    if *method == Method::GET {
        return path == "/health" || (path.starts_with("/users/") && path.ends_with("/avatar"));
    }
    false
}

fn please_authenticate() -> AppError {
    AppError::Authentication("Please authenticate".into())
}

/// Middleware guarding every non-public route.
///
/// A request must carry `Authorization: Bearer <token>` where the token both
/// passes signature/expiry checks and still has a row in the session store.
/// On success the resolved [`CurrentSession`] is placed in request extensions
/// for handlers to extract. Every failure mode produces the same 401 body.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    // Rc so the service handle can move into the boxed future while the
    // session lookup awaits the database.
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned)
                .ok_or_else(please_authenticate)?;

            // Signature or expiry failures carry internal detail; the client
            // only ever sees the uniform message. A missing JWT_SECRET stays
            // a server error.
            let claims = verify_token(&token).map_err(|err| match err {
                AppError::Server(_) => err,
                _ => please_authenticate(),
            })?;

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| AppError::Server("Database pool is not configured".into()))?;

            let user = Session::verify(pool.get_ref(), claims.sub, &token).await?;

            req.extensions_mut().insert(CurrentSession { user, token });
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, App, HttpResponse};

    #[test]
    fn test_public_route_table() {
        assert!(is_public(&Method::POST, "/users"));
        assert!(is_public(&Method::POST, "/users/login"));
        assert!(is_public(&Method::GET, "/health"));
        assert!(is_public(
            &Method::GET,
            "/users/b2d9f1f0-4c11-4f5c-9a05-9d2a6cf24b2e/avatar"
        ));

        assert!(!is_public(&Method::GET, "/users/me"));
        assert!(!is_public(&Method::GET, "/tasks"));
        assert!(!is_public(&Method::POST, "/tasks"));
        assert!(!is_public(&Method::POST, "/users/logout"));
        assert!(!is_public(&Method::DELETE, "/users/me/avatar"));
    }

    #[actix_rt::test]
    async fn test_missing_token_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware)
                .route("/tasks", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/tasks").to_request();
        // Middleware rejections surface as service-level errors in tests.
        let err = app.call(req).await.unwrap_err();
        let res = HttpResponse::from_error(err);
        assert_eq!(res.status(), 401);
    }

    #[actix_rt::test]
    async fn test_public_route_skips_auth() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware)
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
    }
}
