use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::{trimmed, AppState};
use crate::error::ApiError;
use crate::models::{Id, NewUser, UpdateUser};
use crate::password::{hash_password, verify_password};
use crate::repo::RepoError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUser {
    pub id: Id,
    pub username: String,
    pub nickname: Option<String>,
}

fn digest(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ApiError::Internal
    })
}

fn user_not_found(e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::not_found("user does not exist"),
        other => other.into(),
    }
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered"),
        (status = 400, description = "Missing fields, username taken or email in use")
    )
)]
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let password = payload.password.as_deref().filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (trimmed(&payload.username), password) else {
        return Err(ApiError::bad_request("username and password are required"));
    };
    if data.repo.find_user_by_username(username).await?.is_some() {
        return Err(ApiError::bad_request("username already exists"));
    }
    let email = trimmed(&payload.email);
    if let Some(email) = email {
        if data.repo.email_in_use(email, None).await? {
            return Err(ApiError::bad_request("email is already in use"));
        }
    }
    let new = NewUser {
        username: username.to_string(),
        password: digest(password)?,
        nickname: trimmed(&payload.nickname).map(str::to_string),
        email: email.map(str::to_string),
    };
    let id = data.repo.create_user(new).await.map_err(|e| match e {
        // lost a race with a concurrent registration
        RepoError::Conflict => ApiError::bad_request("username already exists"),
        other => other.into(),
    })?;
    tracing::info!(user_id = id, "user registered");
    Ok(HttpResponse::Ok().json(json!({ "success": true, "userId": id })))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginUser),
        (status = 401, description = "Wrong username or password"),
        (status = 403, description = "Account disabled")
    )
)]
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = data
        .repo
        .find_user_by_username(payload.username.trim())
        .await?
        .filter(|u| verify_password(&payload.password, &u.password))
        .ok_or_else(|| ApiError::Unauthorized("wrong username or password".into()))?;
    if user.status == 0 {
        return Err(ApiError::Forbidden("account is disabled".into()));
    }
    data.repo.touch_last_login(user.id).await?;
    let body = LoginUser { id: user.id, username: user.username, nickname: user.nickname };
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": body })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = crate::models::User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(path.into_inner()).await.map_err(user_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user })))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    request_body = UpdateUser,
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Email in use by another user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let upd = UpdateUser {
        nickname: trimmed(&payload.nickname).map(str::to_string),
        email: trimmed(&payload.email).map(str::to_string),
    };
    if let Some(email) = upd.email.as_deref() {
        if data.repo.email_in_use(email, Some(id)).await? {
            return Err(ApiError::bad_request("email is already in use"));
        }
    }
    data.repo.update_user(id, upd).await.map_err(user_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/password",
    request_body = ChangePasswordRequest,
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password does not match")
    )
)]
pub async fn change_password(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if payload.new_password.is_empty() {
        return Err(ApiError::bad_request("new password must not be empty"));
    }
    let matches = match data.repo.get_user(id).await {
        Ok(user) => verify_password(&payload.old_password, &user.password),
        Err(RepoError::NotFound) => false,
        Err(e) => return Err(e.into()),
    };
    if !matches {
        return Err(ApiError::bad_request("old password is incorrect"));
    }
    data.repo.set_password(id, &digest(&payload.new_password)?).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
