use actix_web::{test, web, App};
use driftpost::bottle::FALLBACK_MESSAGES;
use driftpost::{config, CorsHeaders};
use serde_json::json;

mod common;
use common::json as body_json;

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .wrap(CorsHeaders::default())
                .app_data(web::Data::new(common::state()))
                .configure(config),
        )
        .await
    };
}

#[actix_web::test]
async fn throw_then_pick_then_exhausted() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/bottle/throw")
        .set_json(json!({ "content": "  hello from the shore  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(&test::read_body(resp).await);
    assert_eq!(v["success"], true);
    let id = v["bottleId"].as_i64().unwrap();

    let req = test::TestRequest::get().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
    assert_eq!(v["isDefault"], false);
    assert_eq!(v["bottleId"].as_i64(), Some(id));
    assert_eq!(v["content"], "hello from the shore");
    assert!(v["foundAt"].is_string());

    // the only bottle is now read; POST is accepted too
    let req = test::TestRequest::post().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
    assert_eq!(v["isDefault"], true);
    assert!(v.get("bottleId").is_none());
    assert!(v.get("error").is_none());
    assert!(FALLBACK_MESSAGES.contains(&v["content"].as_str().unwrap()));
}

#[actix_web::test]
async fn throw_rejects_empty_and_oversized_content() {
    let app = app!();

    for body in [json!({ "content": "   " }), json!({}), json!({ "content": "x".repeat(501) })] {
        let req = test::TestRequest::post().uri("/api/bottle/throw").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let v = body_json(&test::read_body(resp).await);
        assert_eq!(v["success"], false);
        assert!(v["error"].is_string());
    }

    // exactly 500 characters (multi-byte) is accepted
    let req = test::TestRequest::post()
        .uri("/api/bottle/throw")
        .set_json(json!({ "content": "海".repeat(500) }))
        .to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
}

#[actix_web::test]
async fn throwback_reopens_picked_bottle() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/bottle/throw")
        .set_json(json!({ "content": "message in a bottle" }))
        .to_request();
    let id = body_json(&test::read_body(test::call_service(&app, req).await).await)["bottleId"]
        .as_i64()
        .unwrap();

    let req = test::TestRequest::get().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["bottleId"].as_i64(), Some(id));

    // id wins over content when both are sent
    let req = test::TestRequest::post()
        .uri("/api/bottle/throwback")
        .set_json(json!({ "bottleId": id, "content": "ignored" }))
        .to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
    assert_eq!(v["bottleId"].as_i64(), Some(id));

    let req = test::TestRequest::get().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["isDefault"], false);
    assert_eq!(v["bottleId"].as_i64(), Some(id));
    assert_eq!(v["content"], "message in a bottle");
}

#[actix_web::test]
async fn throwback_with_content_creates_and_without_input_fails() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/bottle/throwback")
        .set_json(json!({ "content": "a new one" }))
        .to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
    assert!(v["bottleId"].is_i64());

    let req = test::TestRequest::post()
        .uri("/api/bottle/throwback")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v = body_json(&test::read_body(resp).await);
    assert_eq!(v["success"], false);
}

#[actix_web::test]
async fn throwback_of_unknown_id_is_a_quiet_success() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/bottle/throwback")
        .set_json(json!({ "bottleId": 999_999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(&test::read_body(resp).await)["success"], true);

    // nothing came into circulation
    let req = test::TestRequest::get().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["isDefault"], true);
    assert!(FALLBACK_MESSAGES.contains(&v["content"].as_str().unwrap()));
}

#[actix_web::test]
async fn close_is_idempotent_and_tolerates_unknown_ids() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/bottle/throw")
        .set_json(json!({ "content": "close me" }))
        .to_request();
    let id = body_json(&test::read_body(test::call_service(&app, req).await).await)["bottleId"]
        .as_i64()
        .unwrap();

    for body in [json!({ "bottleId": id }), json!({ "bottleId": id }), json!({ "bottleId": 999_999 }), json!({})] {
        let req = test::TestRequest::post().uri("/api/bottle/close").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let v = body_json(&test::read_body(resp).await);
        assert_eq!(v["success"], true);
    }

    // closed bottle is no longer pickable
    let req = test::TestRequest::get().uri("/api/bottle/pick").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["isDefault"], true);
}

#[actix_web::test]
async fn preflight_and_wrong_method() {
    let app = app!();

    let req = test::TestRequest::default()
        .method(actix_web::http::Method::OPTIONS)
        .uri("/api/bottle/throw")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");

    let req = test::TestRequest::get().uri("/api/bottle/throw").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers().get("Access-Control-Allow-Origin").unwrap(), "*");
}
