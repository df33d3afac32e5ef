mod common;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::json;
use todo_api::repository::MemoryStore;

use common::{bearer, init_app, register, send};

#[actix_rt::test]
async fn test_profile_read_and_update() {
    let store = MemoryStore::new();
    let app = init_app(&store).await;
    let alice = register(&app, "alice", "secret1").await;
    register(&app, "bob", "secret1").await;
    let token = alice.access_token.as_str();

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(bearer(token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@x.com");
    assert!(body["data"].get("password_hash").is_none());

    let req = test::TestRequest::put()
        .uri("/api/users/me")
        .insert_header(bearer(token))
        .set_json(json!({"avatar_url": "https://cdn.example.com/alice.png"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "Update failed. Body: {}", body);
    assert_eq!(body["data"]["avatar_url"], "https://cdn.example.com/alice.png");
    assert_eq!(body["data"]["email"], "alice@x.com");

    let req = test::TestRequest::put()
        .uri("/api/users/me")
        .insert_header(bearer(token))
        .set_json(json!({"email": "alice@new.com"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@new.com");

    // bob's address is taken.
    let req = test::TestRequest::put()
        .uri("/api/users/me")
        .insert_header(bearer(token))
        .set_json(json!({"email": "bob@x.com"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "email already exists");

    for payload in [json!({"email": "nope"}), json!({"avatar_url": "not a url"})] {
        let req = test::TestRequest::put()
            .uri("/api/users/me")
            .insert_header(bearer(token))
            .set_json(&payload)
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
    }
}

#[actix_rt::test]
async fn test_profile_requires_token() {
    let store = MemoryStore::new();
    let app = init_app(&store).await;

    let req = test::TestRequest::get().uri("/api/users/me").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "missing authorization header");
}

#[actix_rt::test]
async fn test_change_password() {
    let store = MemoryStore::new();
    let app = init_app(&store).await;
    let alice = register(&app, "alice", "secret1").await;
    let token = alice.access_token.as_str();

    let rejected = vec![
        json!({"old_password": "wrong1", "new_password": "secret2", "confirm_password": "secret2"}),
        json!({"old_password": "secret1", "new_password": "secret2", "confirm_password": "secret3"}),
        json!({"old_password": "secret1", "new_password": "abc", "confirm_password": "abc"}),
    ];
    for payload in rejected {
        let req = test::TestRequest::put()
            .uri("/api/users/me/password")
            .insert_header(bearer(token))
            .set_json(&payload)
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
    }

    let req = test::TestRequest::put()
        .uri("/api/users/me/password")
        .insert_header(bearer(token))
        .set_json(json!({
            "old_password": "secret1",
            "new_password": "secret2",
            "confirm_password": "secret2"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "Password change failed. Body: {}", body);

    let login = |password: &str| {
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "alice", "password": password}))
            .to_request()
    };
    let (status, _) = send(&app, login("secret1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, login("secret2")).await;
    assert_eq!(status, StatusCode::OK);
}
