use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{trimmed, AppState};
use crate::error::ApiError;
use crate::models::{Id, NewMessage};
use crate::repo::RepoError;

pub const MAX_NICKNAME_CHARS: usize = 50;
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub id: Option<Id>,
}

fn validate(req: &CreateMessageRequest) -> Result<NewMessage, ApiError> {
    let (Some(nickname), Some(content)) = (trimmed(&req.nickname), trimmed(&req.content)) else {
        return Err(ApiError::bad_request("nickname and content must not be empty"));
    };
    if nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(ApiError::bad_request(format!("nickname must not exceed {MAX_NICKNAME_CHARS} characters")));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!("content must not exceed {MAX_MESSAGE_CHARS} characters")));
    }
    Ok(NewMessage { nickname: nickname.to_string(), content: content.to_string() })
}

#[utoipa::path(
    get,
    path = "/api/messages",
    responses((status = 200, description = "Guestbook, newest first", body = [crate::models::Message]))
)]
pub async fn list_messages(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let messages = data.repo.list_messages().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "messages": messages })))
}

#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message created", body = crate::models::Message),
        (status = 400, description = "Missing or oversized nickname/content")
    )
)]
pub async fn create_message(
    data: web::Data<AppState>,
    payload: web::Json<CreateMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let new = validate(&payload)?;
    let message = data.repo.create_message(new).await?;
    tracing::info!(message_id = message.id, "guestbook message created");
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "message": message })))
}

#[utoipa::path(
    delete,
    path = "/api/messages",
    request_body = DeleteMessageRequest,
    responses(
        (status = 200, description = "Message deleted"),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn delete_message(
    data: web::Data<AppState>,
    payload: web::Json<DeleteMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = payload.id.ok_or_else(|| ApiError::bad_request("message id must not be empty"))?;
    data.repo.delete_message(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::not_found("message does not exist"),
        other => other.into(),
    })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "message": "message deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(nickname: &str, content: &str) -> CreateMessageRequest {
        CreateMessageRequest { nickname: Some(nickname.into()), content: Some(content.into()) }
    }

    #[test]
    fn validation_trims_and_counts_chars() {
        let ok = validate(&req("  sam ", " hello there ")).unwrap();
        assert_eq!(ok.nickname, "sam");
        assert_eq!(ok.content, "hello there");
        assert!(validate(&req("", "x")).is_err());
        assert!(validate(&req("x", "   ")).is_err());
        assert!(validate(&req(&"名".repeat(50), "x")).is_ok());
        assert!(validate(&req(&"名".repeat(51), "x")).is_err());
        assert!(validate(&req("x", &"a".repeat(501))).is_err());
    }
}
