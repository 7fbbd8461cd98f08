use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Always Postgres backed (BIGSERIAL keys)
pub type Id = i64;

/// Author recorded for bottles thrown without an identity.
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Bottle {
    pub id: Id,
    pub content: String,
    pub user_id: String, // author reference, informational only
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Message {
    pub id: Id,
    pub nickname: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMessage {
    pub nickname: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct SportType {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct SportsUser {
    pub id: Id,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct SportsRecord {
    pub id: Id,
    pub user_id: Id,
    pub sport_type: String,
    pub duration: i64,
    pub count: Option<i64>,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewSportsRecord {
    pub user_id: Id,
    pub sport_type: String,
    pub duration: i64,
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String, // salted digest, see password.rs
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub status: i32, // 1 active, 0 disabled
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String, // already digested
    pub nickname: Option<String>,
    pub email: Option<String>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub nickname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct GameScore {
    pub id: Id,
    pub game_name: String,
    pub player_name: String,
    pub score: i64,
    pub play_count: i64,
    pub play_date: String,
    pub play_time: String,
    pub user_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewGameScore {
    pub game_name: String,
    pub player_name: String,
    pub score: i64,
    pub play_count: i64,
    pub play_date: String,
    pub play_time: String,
    pub user_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PlayerLocation {
    pub id: Id,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPlayerLocation {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub user_id: Option<Id>,
}
