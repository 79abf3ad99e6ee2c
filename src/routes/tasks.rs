use crate::{
    auth::CurrentSession,
    error::AppError,
    models::{CreateTask, Task, TaskFilter, UpdateTask},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a task owned by the caller.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    input: web::Json<CreateTask>,
) -> Result<impl Responder, AppError> {
    let task = Task::create(pool.get_ref(), session.user.id, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// List the caller's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): keep only finished or unfinished tasks.
/// - `limit` / `skip` (optional): page through the results.
/// - `sortBy` (optional): `field:direction`, e.g. `createdAt:desc`. Sortable
///   fields are `createdAt`, `updatedAt`, `description`, and `completed`;
///   the direction defaults to ascending.
#[get("")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    filter: web::Query<TaskFilter>,
) -> Result<impl Responder, AppError> {
    let filter = filter.into_inner();
    let tasks = Task::list_for_owner(pool.get_ref(), session.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Fetch one of the caller's tasks by id. A task owned by someone else is
/// reported as not found.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = Task::find_for_owner(pool.get_ref(), session.user.id, id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}

/// Patch one of the caller's tasks. Only `description` and `completed` are
/// accepted; unknown fields reject the request.
#[patch("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    id: web::Path<Uuid>,
    patch: web::Json<UpdateTask>,
) -> Result<impl Responder, AppError> {
    let task =
        Task::update_for_owner(pool.get_ref(), session.user.id, id.into_inner(), patch.into_inner())
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}

/// Delete one of the caller's tasks, echoing the removed task back.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    session: CurrentSession,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = Task::delete_for_owner(pool.get_ref(), session.user.id, id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    Ok(HttpResponse::Ok().json(task))
}
