use actix_web::{test, web, App};
use driftpost::config;
use serde_json::json;

mod common;
use common::json as body_json;

macro_rules! app {
    () => {
        test::init_service(App::new().app_data(web::Data::new(common::state())).configure(config)).await
    };
}

#[actix_web::test]
async fn guestbook_create_list_delete() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/messages")
        .set_json(json!({ "nickname": " sam ", "content": "first!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let first = body_json(&test::read_body(resp).await)["message"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/messages")
        .set_json(json!({ "nickname": "kim", "content": "second" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::get().uri("/api/messages").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["success"], true);
    let messages = v["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    // newest first
    assert_eq!(messages[0]["content"], "second");
    assert_eq!(messages[1]["nickname"], "sam");

    let req = test::TestRequest::delete()
        .uri("/api/messages")
        .set_json(json!({ "id": first }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::delete()
        .uri("/api/messages")
        .set_json(json!({ "id": first }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(body_json(&test::read_body(resp).await)["success"], false);
}

#[actix_web::test]
async fn guestbook_rejects_bad_input() {
    let app = app!();

    for body in [
        json!({ "nickname": "", "content": "x" }),
        json!({ "content": "x" }),
        json!({ "nickname": "n".repeat(51), "content": "x" }),
        json!({ "nickname": "n", "content": "c".repeat(501) }),
    ] {
        let req = test::TestRequest::post().uri("/api/messages").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    let req = test::TestRequest::delete().uri("/api/messages").set_json(json!({})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // malformed JSON gets the JSON error envelope
    let req = test::TestRequest::post()
        .uri("/api/messages")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(body_json(&test::read_body(resp).await)["success"], false);
}

#[actix_web::test]
async fn sport_types_are_seeded() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/sport-types").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    let names: Vec<&str> = v["results"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in ["running", "cycling", "swimming", "rope skipping"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[actix_web::test]
async fn sports_users_and_records() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/sports/users")
        .set_json(json!({ "nickname": "runner" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let user_id = body_json(&test::read_body(resp).await)["results"][0]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/sports/users")
        .set_json(json!({ "nickname": "  " }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/sports/users").to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    assert_eq!(v["results"].as_array().unwrap().len(), 1);

    for (sport, duration) in [("running", 1800), ("cycling", 3600)] {
        let req = test::TestRequest::post()
            .uri("/api/sports/records")
            .set_json(json!({ "userId": user_id, "sportType": sport, "duration": duration }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    // zero duration and missing fields are rejected
    for body in [
        json!({ "userId": user_id, "sportType": "running", "duration": 0 }),
        json!({ "sportType": "running", "duration": 10 }),
        json!({ "userId": user_id, "duration": 10 }),
    ] {
        let req = test::TestRequest::post().uri("/api/sports/records").set_json(body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/sports/records?userId={user_id}"))
        .to_request();
    let v = body_json(&test::read_body(test::call_service(&app, req).await).await);
    let records = v["results"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["sport_type"], "cycling");

    let req = test::TestRequest::get().uri("/api/sports/records").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/sports/records?userId=abc").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}
