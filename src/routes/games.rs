use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{trimmed, AppState};
use crate::error::ApiError;
use crate::models::{Id, NewGameScore, NewPlayerLocation};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveScoreRequest {
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub play_count: Option<i64>,
    #[serde(default)]
    pub user_id: Option<Id>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveLocationRequest {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub user_id: Option<Id>,
}

#[utoipa::path(
    get,
    path = "/api/games/scores",
    responses((status = 200, description = "All scores, newest first", body = [crate::models::GameScore]))
)]
pub async fn list_scores(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let scores = data.repo.list_scores().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "scores": scores })))
}

#[utoipa::path(
    post,
    path = "/api/games/scores",
    request_body = SaveScoreRequest,
    responses(
        (status = 200, description = "Score saved"),
        (status = 400, description = "Missing gameName, playerName or score")
    )
)]
pub async fn save_score(
    data: web::Data<AppState>,
    payload: web::Json<SaveScoreRequest>,
) -> Result<HttpResponse, ApiError> {
    let (Some(game_name), Some(player_name), Some(score)) =
        (trimmed(&payload.game_name), trimmed(&payload.player_name), payload.score)
    else {
        return Err(ApiError::bad_request("gameName, playerName and score are required"));
    };
    // play date and time are stamped by the server, not the client
    let now = Utc::now();
    data.repo
        .save_score(NewGameScore {
            game_name: game_name.to_string(),
            player_name: player_name.to_string(),
            score,
            play_count: payload.play_count.unwrap_or(1),
            play_date: now.format("%Y-%m-%d").to_string(),
            play_time: now.format("%H:%M:%S").to_string(),
            user_id: payload.user_id,
        })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[utoipa::path(
    get,
    path = "/api/games/locations",
    responses((status = 200, description = "Player locations, newest first", body = [crate::models::PlayerLocation]))
)]
pub async fn list_locations(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let locations = data.repo.list_locations().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "locations": locations })))
}

#[utoipa::path(
    post,
    path = "/api/games/locations",
    request_body = SaveLocationRequest,
    responses(
        (status = 200, description = "Location saved"),
        (status = 400, description = "Missing or out-of-range fields")
    )
)]
pub async fn save_location(
    data: web::Data<AppState>,
    payload: web::Json<SaveLocationRequest>,
) -> Result<HttpResponse, ApiError> {
    let (Some(city), Some(country), Some(latitude), Some(longitude)) = (
        trimmed(&payload.city),
        trimmed(&payload.country),
        payload.latitude.filter(|v| (-90.0..=90.0).contains(v)),
        payload.longitude.filter(|v| (-180.0..=180.0).contains(v)),
    ) else {
        return Err(ApiError::bad_request("city, country, latitude and longitude are required"));
    };
    data.repo
        .save_location(NewPlayerLocation {
            city: city.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
            user_id: payload.user_id,
        })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
