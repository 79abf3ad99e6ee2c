//! Shared helpers for the integration tests.
//!
//! The tests exercise the full app against a real Postgres database. When
//! `DATABASE_URL` is not set they skip themselves, so the rest of the suite
//! stays runnable without one.

#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::{to_bytes, MessageBody};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::web::Bytes;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use taskpad::auth::AuthMiddleware;
use taskpad::mailer::Mailer;
use taskpad::routes;

/// Connects to the test database, running migrations first.
///
/// Returns `None` when `DATABASE_URL` is unset so callers can skip. A set
/// but unreachable database is a configuration error and fails loudly.
pub async fn try_pool() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "taskpad-integration-tests");
    }

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Builds the app exactly as `main.rs` wires it, minus the socket.
pub async fn spawn_app(
    pool: PgPool,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool))
            .app_data(web::Data::new(Mailer::from_env()))
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .app_data(routes::path_config())
            .wrap(AuthMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

/// Drives a request through the app and returns status plus parsed JSON
/// body (`Value::Null` when the body is empty or not JSON).
///
/// Middleware rejections surface as service-level errors rather than
/// responses; those are folded back into the response they would produce
/// on a real server.
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match app.call(req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
        Err(err) => {
            let res = actix_web::HttpResponse::from_error(err);
            let status = res.status();
            let body = to_bytes(res.into_body()).await.unwrap_or_default();
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }
}

/// Like [`send`] but keeps the raw bytes and content type, for non-JSON
/// responses such as served avatars.
pub async fn send_raw<S, B>(app: &S, req: Request) -> (StatusCode, Option<String>, Bytes)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match app.call(req).await {
        Ok(res) => {
            let status = res.status();
            let content_type = res
                .headers()
                .get(actix_web::http::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = test::read_body(res).await;
            (status, content_type, body)
        }
        Err(err) => {
            let res = actix_web::HttpResponse::from_error(err);
            let status = res.status();
            let content_type = res
                .headers()
                .get(actix_web::http::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = to_bytes(res.into_body()).await.unwrap_or_default();
            (status, content_type, body)
        }
    }
}

/// Unique per-run email so parallel tests never collide on the unique index.
pub fn unique_email(tag: &str) -> String {
    format!("{}+{}@example.com", tag, Uuid::new_v4().simple())
}

/// Registers a user through the API and returns the profile and token.
pub async fn signup<S, B>(app: &S, name: &str, email: &str, password: &str) -> (Value, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, 201, "signup failed: {}", body);

    let token = body["token"].as_str().expect("token missing").to_string();
    (body["user"].clone(), token)
}

/// Builds a multipart request body with a single file field.
/// Returns the content-type header value and the encoded payload.
pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "taskpad-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Removes a user and their rows directly, for end-of-test cleanup.
pub async fn remove_user(pool: &PgPool, email: &str) {
    let row = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .expect("cleanup lookup failed");

    if let Some((id,)) = row {
        sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(id)
            .execute(pool)
            .await
            .expect("cleanup tasks failed");
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(id)
            .execute(pool)
            .await
            .expect("cleanup sessions failed");
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .expect("cleanup user failed");
    }
}
