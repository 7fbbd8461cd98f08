use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use super::AppState;
use crate::bottle::{CloseOutcome, PickOutcome, ThrowBack, ThrowBackOutcome};
use crate::error::ApiError;
use crate::models::Id;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThrowRequest {
    #[serde(default)]
    pub content: Option<String>,
    /// Optional author reference; bottles default to "anonymous".
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    #[serde(default)]
    pub bottle_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThrowBackRequest {
    #[serde(default)]
    pub bottle_id: Option<Id>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Envelope shared by throw, close and throwback. Failures are reported with
/// `success: false` and HTTP 200.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BottleReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottle_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BottleReply {
    fn ok(message: &str) -> Self {
        Self { success: true, message: Some(message.into()), ..Default::default() }
    }
    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }
    fn with_id(mut self, id: Id) -> Self {
        self.bottle_id = Some(id);
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PickReply {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottle_id: Option<Id>,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/bottle/throw",
    request_body = ThrowRequest,
    responses(
        (status = 200, description = "Bottle thrown, or success=false with the reason", body = BottleReply)
    )
)]
pub async fn throw(data: web::Data<AppState>, body: Option<web::Json<ThrowRequest>>) -> HttpResponse {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let content = req.content.as_deref().unwrap_or_default();
    let reply = match data.bottles.throw(content, req.user_id.as_deref()).await {
        Ok(id) => BottleReply::ok("Your bottle has been thrown into the sea!").with_id(id),
        Err(e) if e.is_validation() => BottleReply::failed(e.to_string()),
        Err(e) => {
            error!(error = %e, "throw failed");
            BottleReply::failed("Throwing failed, please try again later")
        }
    };
    HttpResponse::Ok().json(reply)
}

#[utoipa::path(
    get,
    path = "/api/bottle/pick",
    responses(
        (status = 200, description = "A bottle, or a fallback message with isDefault=true", body = PickReply),
        (status = 500, description = "Storage failure (only when the pick policy propagates)")
    )
)]
pub async fn pick(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reply = match data.bottles.pick().await? {
        PickOutcome::Found(bottle) => PickReply {
            success: true,
            content: bottle.content,
            bottle_id: Some(bottle.id),
            is_default: false,
            found_at: Some(bottle.created_at),
            error: None,
        },
        PickOutcome::Fallback { message, degraded } => PickReply {
            success: true,
            content: message.to_string(),
            bottle_id: None,
            is_default: true,
            found_at: None,
            error: degraded.then(|| "Something went wrong while fishing, but the ocean is still beautiful...".to_string()),
        },
    };
    Ok(HttpResponse::Ok().json(reply))
}

#[utoipa::path(
    post,
    path = "/api/bottle/close",
    request_body = CloseRequest,
    responses(
        (status = 200, description = "Always succeeds under the default close policy", body = BottleReply)
    )
)]
pub async fn close(data: web::Data<AppState>, body: Option<web::Json<CloseRequest>>) -> Result<HttpResponse, ApiError> {
    let Some(id) = body.and_then(|b| b.bottle_id) else {
        return Ok(HttpResponse::Ok().json(BottleReply::ok("Operation complete")));
    };
    let reply = match data.bottles.close(id).await? {
        CloseOutcome::Closed => BottleReply::ok("The bottle has been closed safely"),
        CloseOutcome::Masked => BottleReply {
            note: Some("A small hiccup occurred while closing, it does not affect anything".into()),
            ..BottleReply::ok("Operation complete")
        },
    };
    Ok(HttpResponse::Ok().json(reply))
}

#[utoipa::path(
    post,
    path = "/api/bottle/throwback",
    request_body = ThrowBackRequest,
    responses(
        (status = 200, description = "Bottle reopened or created, or success=false with the reason", body = BottleReply)
    )
)]
pub async fn throw_back(data: web::Data<AppState>, body: Option<web::Json<ThrowBackRequest>>) -> HttpResponse {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let input = match ThrowBack::resolve(req.bottle_id, req.content) {
        Ok(input) => input,
        Err(e) => return HttpResponse::Ok().json(BottleReply::failed(e.to_string())),
    };
    let reply = match data.bottles.throw_back(input, req.user_id.as_deref()).await {
        Ok(ThrowBackOutcome::Reopened(id)) => {
            BottleReply::ok("The bottle is back in the sea, waiting for its next finder").with_id(id)
        }
        Ok(ThrowBackOutcome::Created(id)) => BottleReply::ok("Your bottle is out in the sea").with_id(id),
        Err(e) if e.is_validation() => BottleReply::failed(e.to_string()),
        Err(e) => {
            error!(error = %e, "throwback failed");
            BottleReply::failed("Operation failed, please try again later")
        }
    };
    HttpResponse::Ok().json(reply)
}
