use std::sync::Arc;

use actix_web::{test, web, App};
use async_trait::async_trait;
use driftpost::bottle::BottlePolicy;
use driftpost::models::*;
use driftpost::repo::inmem::InMemRepo;
use driftpost::repo::{AnalyticsRepo, BottleRepo, GameRepo, MessageRepo, RepoResult, SportsRepo, UserRepo};
use driftpost::{config, AppState};
use serde_json::json;

mod common;
use common::json as body_json;

macro_rules! app {
    () => {
        test::init_service(App::new().app_data(web::Data::new(common::state())).configure(config)).await
    };
}

#[actix_web::test]
async fn register_login_profile_password() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(json!({ "username": "mariner", "password": "s3cret", "nickname": "Mari", "email": "m@sea.test" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let id = body_json(&test::read_body(resp).await)["userId"].as_i64().unwrap();

    // duplicate username / email
    for body in [
        json!({ "username": "mariner", "password": "x" }),
        json!({ "username": "other", "password": "x", "email": "m@sea.test" }),
        json!({ "username": "", "password": "x" }),
    ] {
        let req = test::TestRequest::post().uri("/api/users/register").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "mariner", "password": "wrong" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "mariner", "password": "s3cret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(&test::read_body(resp).await);
    assert_eq!(v["user"]["id"].as_i64(), Some(id));
    assert_eq!(v["user"]["nickname"], "Mari");

    let req = test::TestRequest::get().uri(&format!("/api/users/{id}")).to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["user"]["username"], "mariner");
    assert!(v["user"]["last_login"].is_string());
    assert!(v["user"].get("password").is_none());

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{id}"))
        .set_json(json!({ "nickname": "Captain" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    // keeping one's own email is not a conflict
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{id}"))
        .set_json(json!({ "email": "m@sea.test" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{id}/password"))
        .set_json(json!({ "oldPassword": "nope", "newPassword": "n3w" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{id}/password"))
        .set_json(json!({ "oldPassword": "s3cret", "newPassword": "n3w" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "mariner", "password": "n3w" }))
        .to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["user"]["nickname"], "Captain");

    let req = test::TestRequest::get().uri("/api/users/424242").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

/// In-memory store where every account reads back as disabled.
struct SuspendedAccounts(InMemRepo);

#[async_trait]
impl UserRepo for SuspendedAccounts {
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self.0.find_user_by_username(username).await?;
        Ok(user.map(|u| User { status: 0, ..u }))
    }
    async fn email_in_use(&self, email: &str, except: Option<Id>) -> RepoResult<bool> { self.0.email_in_use(email, except).await }
    async fn create_user(&self, new: NewUser) -> RepoResult<Id> { self.0.create_user(new).await }
    async fn get_user(&self, id: Id) -> RepoResult<User> { self.0.get_user(id).await }
    async fn touch_last_login(&self, id: Id) -> RepoResult<()> { self.0.touch_last_login(id).await }
    async fn update_user(&self, id: Id, upd: UpdateUser) -> RepoResult<()> { self.0.update_user(id, upd).await }
    async fn set_password(&self, id: Id, digest: &str) -> RepoResult<()> { self.0.set_password(id, digest).await }
}

#[async_trait]
impl BottleRepo for SuspendedAccounts {
    async fn insert_bottle(&self, content: &str, author: &str) -> RepoResult<Id> { self.0.insert_bottle(content, author).await }
    async fn select_unread_recent(&self, limit: usize) -> RepoResult<Vec<Bottle>> { self.0.select_unread_recent(limit).await }
    async fn mark_read(&self, id: Id) -> RepoResult<()> { self.0.mark_read(id).await }
    async fn mark_unread(&self, id: Id) -> RepoResult<()> { self.0.mark_unread(id).await }
}

#[async_trait]
impl MessageRepo for SuspendedAccounts {
    async fn list_messages(&self) -> RepoResult<Vec<Message>> { self.0.list_messages().await }
    async fn create_message(&self, new: NewMessage) -> RepoResult<Message> { self.0.create_message(new).await }
    async fn delete_message(&self, id: Id) -> RepoResult<()> { self.0.delete_message(id).await }
}

#[async_trait]
impl SportsRepo for SuspendedAccounts {
    async fn list_sport_types(&self) -> RepoResult<Vec<SportType>> { self.0.list_sport_types().await }
    async fn list_sports_users(&self) -> RepoResult<Vec<SportsUser>> { self.0.list_sports_users().await }
    async fn create_sports_user(&self, nickname: &str) -> RepoResult<SportsUser> { self.0.create_sports_user(nickname).await }
    async fn list_sports_records(&self, user_id: Id) -> RepoResult<Vec<SportsRecord>> { self.0.list_sports_records(user_id).await }
    async fn create_sports_record(&self, new: NewSportsRecord) -> RepoResult<SportsRecord> { self.0.create_sports_record(new).await }
}

#[async_trait]
impl GameRepo for SuspendedAccounts {
    async fn list_scores(&self) -> RepoResult<Vec<GameScore>> { self.0.list_scores().await }
    async fn save_score(&self, new: NewGameScore) -> RepoResult<GameScore> { self.0.save_score(new).await }
    async fn list_locations(&self) -> RepoResult<Vec<PlayerLocation>> { self.0.list_locations().await }
    async fn save_location(&self, new: NewPlayerLocation) -> RepoResult<PlayerLocation> { self.0.save_location(new).await }
}

#[async_trait]
impl AnalyticsRepo for SuspendedAccounts {
    async fn increment_counter(&self, key: &str) -> RepoResult<i64> { self.0.increment_counter(key).await }
}

#[actix_web::test]
async fn disabled_account_cannot_log_in() {
    let state = AppState::new(
        SuspendedAccounts(InMemRepo::new()),
        Arc::new(common::MockObjectStore::default()),
        BottlePolicy::default(),
        None,
    );
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(json!({ "username": "drifter", "password": "s3cret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "drifter", "password": "s3cret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(body_json(&test::read_body(resp).await)["success"], false);

    // the right password is still required before the account state is revealed
    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "username": "drifter", "password": "wrong" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn game_scores_and_locations() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/games/scores")
        .set_json(json!({ "gameName": "snake", "playerName": "ana", "score": 120 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/games/scores")
        .set_json(json!({ "gameName": "snake", "score": 3 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/games/scores").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    let score = &v["scores"][0];
    assert_eq!(score["score"], 120);
    assert_eq!(score["play_count"], 1);
    // server stamped date and time
    assert_eq!(score["play_date"].as_str().unwrap().len(), 10);
    assert_eq!(score["play_time"].as_str().unwrap().len(), 8);

    let req = test::TestRequest::post()
        .uri("/api/games/locations")
        .set_json(json!({ "city": "Lisbon", "country": "PT", "latitude": 38.72, "longitude": -9.14 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/games/locations")
        .set_json(json!({ "city": "Nowhere", "country": "XX", "latitude": 123.0, "longitude": 0.0 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/games/locations").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["locations"].as_array().unwrap().len(), 1);
    assert_eq!(v["locations"][0]["city"], "Lisbon");
}

#[actix_web::test]
async fn pageview_counts_up() {
    let app = app!();
    for expected in 1..=3 {
        let req = test::TestRequest::get().uri("/api/pageview").to_request();
        let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
        assert_eq!(v["pageview"], expected);
    }
}
