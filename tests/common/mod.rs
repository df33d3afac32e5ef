#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header, StatusCode},
    test, App, Error,
};
use serde_json::{json, Value};
use todo_api::{
    auth::{AuthResponse, PasswordHasher, TokenEngine},
    config::JwtConfig,
    repository::MemoryStore,
    routes, Services,
};

pub const SECRET: &str = "integration_test_secret";
pub const ISSUER: &str = "todo-api-tests";
pub const ACCESS_TTL: i64 = 900;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: SECRET.to_string(),
        access_ttl_secs: ACCESS_TTL,
        refresh_ttl_secs: 86_400,
        issuer: ISSUER.to_string(),
    }
}

/// Full application over an in-memory store. Bcrypt cost is the minimum so the
/// suite stays fast.
pub async fn init_app(
    store: &MemoryStore,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let services = Services::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        TokenEngine::new(&jwt_config()).unwrap(),
        PasswordHasher::new(4),
    );

    test::init_service(
        App::new()
            .configure(move |cfg| services.configure(cfg))
            .configure(routes::config),
    )
    .await
}

/// Sends the request and returns the status together with the parsed envelope.
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub async fn register<S, B>(app: &S, username: &str, password: &str) -> AuthResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": format!("{}@x.com", username),
            "password": password
        }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "registration failed: {}", body);
    serde_json::from_value(body["data"].clone()).unwrap()
}

/// Creates a todo from `payload` and returns its id.
pub async fn create_todo<S, B>(app: &S, token: &str, payload: Value) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/todos")
        .insert_header(bearer(token))
        .set_json(payload)
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    body["data"]["id"].as_i64().unwrap()
}
