use std::sync::Arc;

use actix_web::web;

use crate::bottle::{BottlePolicy, BottleService};
use crate::error::ApiError;
use crate::repo::Repo;
use crate::storage::ObjectStore;

pub mod analytics;
pub mod bottle;
pub mod files;
pub mod games;
pub mod messages;
pub mod sports;
pub mod users;

pub fn config(cfg: &mut web::ServiceConfig) {
    // malformed bodies / query strings get the same JSON envelope as handler errors
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("invalid request body: {err}")).into()
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("invalid query string: {err}")).into()
    }));
    cfg.service(
        web::scope("/api")
            .service(web::resource("/bottle/throw").route(web::post().to(bottle::throw)))
            .service(
                web::resource("/bottle/pick")
                    .route(web::get().to(bottle::pick))
                    .route(web::post().to(bottle::pick)),
            )
            .service(web::resource("/bottle/close").route(web::post().to(bottle::close)))
            .service(web::resource("/bottle/throwback").route(web::post().to(bottle::throw_back)))
            .service(
                web::resource("/messages")
                    .route(web::get().to(messages::list_messages))
                    .route(web::post().to(messages::create_message))
                    .route(web::delete().to(messages::delete_message)),
            )
            .service(web::resource("/sport-types").route(web::get().to(sports::list_sport_types)))
            .service(
                web::resource("/sports/users")
                    .route(web::get().to(sports::list_users))
                    .route(web::post().to(sports::create_user)),
            )
            .service(
                web::resource("/sports/records")
                    .route(web::get().to(sports::list_records))
                    .route(web::post().to(sports::create_record)),
            )
            // fixed file routes must precede the catch-all key route
            .service(web::resource("/files/upload").route(web::post().to(files::upload)))
            .service(web::resource("/files/list").route(web::get().to(files::list)))
            .service(
                web::resource("/files/delete")
                    .route(web::post().to(files::delete))
                    .route(web::delete().to(files::delete)),
            )
            .service(
                web::resource("/files/{key:.+}")
                    .route(web::get().to(files::get_file))
                    .route(web::head().to(files::get_file)),
            )
            .service(web::resource("/users/register").route(web::post().to(users::register)))
            .service(web::resource("/users/login").route(web::post().to(users::login)))
            .service(
                web::resource("/users/{id}")
                    .route(web::get().to(users::get_user))
                    .route(web::put().to(users::update_user)),
            )
            .service(web::resource("/users/{id}/password").route(web::put().to(users::change_password)))
            .service(
                web::resource("/games/scores")
                    .route(web::get().to(games::list_scores))
                    .route(web::post().to(games::save_score)),
            )
            .service(
                web::resource("/games/locations")
                    .route(web::get().to(games::list_locations))
                    .route(web::post().to(games::save_location)),
            )
            .service(web::resource("/pageview").route(web::get().to(analytics::pageview))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub bottles: BottleService,
    pub object_store: Arc<dyn ObjectStore>,
    pub admin_secret: Option<String>,
}

impl AppState {
    pub fn new<R: Repo + 'static>(
        repo: R,
        object_store: Arc<dyn ObjectStore>,
        policy: BottlePolicy,
        admin_secret: Option<String>,
    ) -> Self {
        let repo = Arc::new(repo);
        Self {
            bottles: BottleService::new(repo.clone(), policy),
            repo,
            object_store,
            admin_secret,
        }
    }
}

/// Trims an optional text field, treating blank as absent.
pub(crate) fn trimmed(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
