use actix_web::{web, HttpResponse};
use serde_json::json;

use super::AppState;
use crate::error::ApiError;
use crate::repo::PAGEVIEWS;

#[utoipa::path(
    get,
    path = "/api/pageview",
    responses(
        (status = 200, description = "Counter value after this visit"),
        (status = 500, description = "Counter update failed")
    )
)]
pub async fn pageview(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let count = data.repo.increment_counter(PAGEVIEWS).await?;
    Ok(HttpResponse::Ok().json(json!({ "pageview": count })))
}
