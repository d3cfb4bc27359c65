#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode, header},
};
use reelgate::clock::ManualClock;
use reelgate::db::{AdminRole, Database};
use reelgate::password::hash_password;
use reelgate::rate_limit::RateLimitConfig;
use reelgate::session::{SessionManager, SessionPolicy};
use reelgate::{ServerConfig, create_app};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const HOUR: Duration = Duration::from_secs(60 * 60);

pub const PASSWORD: &str = "correct horse battery";

/// Peer address attached to every request, as `into_make_service_with_connect_info` would.
pub const CLIENT_ADDR: &str = "192.0.2.10:41000";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: ManualClock,
    pub sessions: SessionManager,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_login_quota(1000).await
}

pub async fn create_test_app_with_login_quota(login_attempts_per_minute: u32) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = ManualClock::new(1_700_000_000_000);
    let config = ServerConfig {
        db: db.clone(),
        clock: Arc::new(clock.clone()),
        session_policy: SessionPolicy::default(),
        rate_limit: Arc::new(RateLimitConfig::new(login_attempts_per_minute, false)),
    };
    TestApp {
        app: create_app(&config),
        sessions: config.session_manager(),
        db,
        clock,
    }
}

impl TestApp {
    pub async fn create_user(&self, username: &str) -> i64 {
        let hash = hash_password(PASSWORD).unwrap();
        self.db.users().create(username, &hash).await.unwrap()
    }

    pub async fn create_admin(&self, username: &str, role: AdminRole) -> i64 {
        let hash = hash_password(PASSWORD).unwrap();
        self.db.admins().create(username, &hash, role).await.unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Log in through the API and return the bearer secret.
    pub async fn login(&self, kind: &str, username: &str, password: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                &format!("/api/sessions/{}", kind),
                None,
                serde_json::json!({ "username": username, "password": password }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        json["token"].as_str().unwrap().to_string()
    }

    pub async fn login_user(&self, username: &str) -> String {
        self.login("user", username, PASSWORD).await
    }

    pub async fn login_admin(&self, username: &str) -> String {
        self.login("admin", username, PASSWORD).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request("GET", uri, token)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(json_request("POST", uri, token, body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request("DELETE", uri, token)).await
    }
}

fn builder(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let addr: SocketAddr = CLIENT_ADDR.parse().unwrap();
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(addr));
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
