pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{error::InternalError, web, HttpResponse};
use serde_json::json;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(
            web::scope("/users")
                .service(users::signup)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::me)
                .service(users::update_me)
                .service(users::delete_me)
                .service(users::upload_avatar)
                .service(users::remove_avatar)
                .service(users::serve_avatar),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}

/// Malformed JSON bodies, including unknown fields on the patch routes,
/// come back as a 400 with the usual `{"error": ...}` envelope instead of
/// actix's plain-text default.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "error": message })),
        )
        .into()
    })
}

/// Unparseable query parameters, e.g. `?completed=banana`, are a 400 rather
/// than a silently ignored filter.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "error": message })),
        )
        .into()
    })
}

/// Path segments that fail to parse, e.g. a task id that is not a UUID.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "error": message })),
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateTask, TaskFilter};
    use actix_web::{test, App};
    use uuid::Uuid;

    #[actix_rt::test]
    async fn test_invalid_json_body_yields_error_envelope() {
        let app = test::init_service(
            App::new().app_data(json_config()).route(
                "/tasks",
                web::post().to(|_: web::Json<CreateTask>| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        // Missing required description field.
        let req = test::TestRequest::post()
            .uri("/tasks")
            .set_json(serde_json::json!({ "completed": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body.get("error").is_some());
    }

    #[actix_rt::test]
    async fn test_invalid_query_param_yields_error_envelope() {
        let app = test::init_service(
            App::new().app_data(query_config()).route(
                "/tasks",
                web::get().to(|_: web::Query<TaskFilter>| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/tasks?completed=banana")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body.get("error").is_some());
    }

    #[actix_rt::test]
    async fn test_invalid_path_segment_yields_error_envelope() {
        let app = test::init_service(
            App::new().app_data(path_config()).route(
                "/tasks/{id}",
                web::get().to(|_: web::Path<Uuid>| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/tasks/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body.get("error").is_some());
    }
}
