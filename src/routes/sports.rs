use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{trimmed, AppState};
use crate::error::ApiError;
use crate::models::{Id, NewSportsRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSportsUserRequest {
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub user_id: Option<Id>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub user_id: Option<Id>,
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Seconds; must be positive.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/sport-types",
    responses((status = 200, description = "Sport types", body = [crate::models::SportType]))
)]
pub async fn list_sport_types(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let types = data.repo.list_sport_types().await?;
    Ok(HttpResponse::Ok().json(json!({ "results": types })))
}

#[utoipa::path(
    get,
    path = "/api/sports/users",
    responses((status = 200, description = "Sports users", body = [crate::models::SportsUser]))
)]
pub async fn list_users(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = data.repo.list_sports_users().await?;
    Ok(HttpResponse::Ok().json(json!({ "results": users })))
}

#[utoipa::path(
    post,
    path = "/api/sports/users",
    request_body = CreateSportsUserRequest,
    responses(
        (status = 201, description = "Sports user created", body = [crate::models::SportsUser]),
        (status = 400, description = "Missing nickname")
    )
)]
pub async fn create_user(
    data: web::Data<AppState>,
    payload: web::Json<CreateSportsUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let nickname = trimmed(&payload.nickname).ok_or_else(|| ApiError::bad_request("nickname must not be empty"))?;
    let user = data.repo.create_sports_user(nickname).await?;
    Ok(HttpResponse::Created().json(json!({ "results": [user] })))
}

#[utoipa::path(
    get,
    path = "/api/sports/records",
    params(("userId" = Id, Query, description = "Sports user id")),
    responses(
        (status = 200, description = "Records of one user, newest first", body = [crate::models::SportsRecord]),
        (status = 400, description = "Missing userId")
    )
)]
pub async fn list_records(
    data: web::Data<AppState>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = query.user_id.ok_or_else(|| ApiError::bad_request("userId is required"))?;
    let records = data.repo.list_sports_records(user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "results": records })))
}

#[utoipa::path(
    post,
    path = "/api/sports/records",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created", body = [crate::models::SportsRecord]),
        (status = 400, description = "Missing userId, sportType or duration")
    )
)]
pub async fn create_record(
    data: web::Data<AppState>,
    payload: web::Json<CreateRecordRequest>,
) -> Result<HttpResponse, ApiError> {
    let (Some(user_id), Some(sport_type), Some(duration)) =
        (payload.user_id, trimmed(&payload.sport_type), payload.duration.filter(|d| *d > 0))
    else {
        return Err(ApiError::bad_request("missing required parameters: userId, sportType, duration"));
    };
    let record = data
        .repo
        .create_sports_record(NewSportsRecord {
            user_id,
            sport_type: sport_type.to_string(),
            duration,
            count: payload.count,
        })
        .await?;
    tracing::info!(record_id = record.id, user_id, "sports record created");
    Ok(HttpResponse::Created().json(json!({ "results": [record] })))
}
