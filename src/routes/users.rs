use crate::{
    auth::{generate_token, CurrentSession},
    error::AppError,
    mailer::Mailer,
    models::{CreateUser, Credentials, Session, UpdateUser, User, UserBody},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::TryStreamExt;
use lazy_static::lazy_static;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Avatar uploads are capped at 1 MB.
const AVATAR_MAX_BYTES: usize = 1_000_000;

lazy_static! {
    // Accepted avatar filename extensions, case-insensitive.
    static ref AVATAR_FILENAME: regex::Regex = regex::Regex::new(r"(?i)\.(jpe?g|png)$").unwrap();
}

/// Body returned by signup and login: the public profile plus the token that
/// identifies this session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserBody,
    pub token: String,
}

/// Create an account
///
/// Registers a new user, opens their first session, and sends the welcome
/// email in the background.
#[post("")]
pub async fn signup(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    input: web::Json<CreateUser>,
) -> Result<impl Responder, AppError> {
    let user = User::create(pool.get_ref(), input.into_inner()).await?;
    let token = generate_token(user.id)?;
    Session::issue(pool.get_ref(), user.id, &token).await?;

    mailer.send_welcome(&user.email, &user.name);
    log::info!("user {} signed up", user.id);

    Ok(HttpResponse::Created().json(SessionResponse {
        user: user.into(),
        token,
    }))
}

/// Log in
///
/// Verifies the credentials and opens a new session alongside any existing
/// ones, so other devices stay logged in.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    credentials: web::Json<Credentials>,
) -> Result<impl Responder, AppError> {
    let credentials = credentials.into_inner();
    let user =
        User::authenticate(pool.get_ref(), &credentials.email, &credentials.password).await?;
    let token = generate_token(user.id)?;
    Session::issue(pool.get_ref(), user.id, &token).await?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        user: user.into(),
        token,
    }))
}

/// Log out the session the request was made with. The token stops working
/// immediately; sessions on other devices are untouched.
#[post("/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    Session::revoke(pool.get_ref(), session.user.id, &session.token).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Log out everywhere by revoking every session the user holds.
#[post("/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let revoked = Session::revoke_all(pool.get_ref(), session.user.id).await?;
    log::info!("user {} revoked {} sessions", session.user.id, revoked);
    Ok(HttpResponse::Ok().finish())
}

/// Return the caller's own profile.
#[get("/me")]
pub async fn me(session: CurrentSession) -> impl Responder {
    HttpResponse::Ok().json(UserBody::from(session.user))
}

/// Update the caller's profile. Only name, email, password, and age may be
/// patched; anything else rejects the whole request.
#[patch("/me")]
pub async fn update_me(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    patch: web::Json<UpdateUser>,
) -> Result<impl Responder, AppError> {
    let user = User::update(pool.get_ref(), session.user.id, patch.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserBody::from(user)))
}

/// Delete the caller's account together with their tasks and sessions, then
/// send the cancellation email in the background. Echoes the deleted profile.
#[delete("/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let user = User::delete(pool.get_ref(), session.user.id).await?;

    mailer.send_cancellation(&user.email, &user.name);
    log::info!("user {} deleted their account", user.id);

    Ok(HttpResponse::Ok().json(UserBody::from(user)))
}

/// Upload an avatar as a multipart field named `avatar`.
///
/// The filename must end in jpg, jpeg, or png, and the file may not exceed
/// 1 MB. The image is buffered chunk by chunk and the size limit enforced
/// while streaming, so an oversized upload is cut off early.
#[post("/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "avatar" {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .unwrap_or_default();
        if !AVATAR_FILENAME.is_match(&filename) {
            return Err(AppError::Validation("Please upload an image".into()));
        }

        let mut image: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if image.len() + chunk.len() > AVATAR_MAX_BYTES {
                return Err(AppError::Validation("File too large".into()));
            }
            image.extend_from_slice(&chunk);
        }
        if image.is_empty() {
            return Err(AppError::Validation("Please upload an image".into()));
        }

        let mime = if filename.to_lowercase().ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        };
        User::set_avatar(pool.get_ref(), session.user.id, image, mime).await?;
        return Ok(HttpResponse::Ok().finish());
    }

    Err(AppError::Validation("Please upload an image".into()))
}

/// Remove the caller's avatar. Succeeds even when no avatar was set.
#[delete("/me/avatar")]
pub async fn remove_avatar(
    pool: web::Data<PgPool>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    User::clear_avatar(pool.get_ref(), session.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Serve a user's avatar publicly, with the MIME type recorded at upload.
#[get("/{id}/avatar")]
pub async fn serve_avatar(
    pool: web::Data<PgPool>,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let (image, mime) = User::avatar(pool.get_ref(), id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;

    Ok(HttpResponse::Ok().content_type(mime).body(image))
}
