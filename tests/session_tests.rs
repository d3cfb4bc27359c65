mod common;

use axum::http::{StatusCode, header};
use common::{
    DAY, HOUR, PASSWORD, create_test_app, create_test_app_with_login_quota, json_body,
};
use reelgate::clock::Clock;
use reelgate::db::AdminRole;
use serde_json::json;
use std::time::Duration;

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_user() {
    let app = create_test_app().await;

    let response = app
        .post(
            "/api/users",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json_body(response).await;
    assert_eq!(json["username"], "alice");
    assert!(json["id"].as_i64().is_some());

    // The new account can log in right away.
    app.login_user("alice").await;
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = create_test_app().await;
    app.create_user("alice").await;

    let response = app
        .post(
            "/api/users",
            None,
            json!({ "username": "ALICE", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let app = create_test_app().await;

    for body in [
        json!({ "username": "", "password": PASSWORD }),
        json!({ "username": "alice@bob", "password": PASSWORD }),
        json!({ "username": "a".repeat(33), "password": PASSWORD }),
        json!({ "username": "alice", "password": "short" }),
    ] {
        let response = app.post("/api/users", None, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_returns_token() {
    let app = create_test_app().await;
    let id = app.create_user("alice").await;

    let response = app
        .post(
            "/api/sessions/user",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json_body(response).await;
    let token = json["token"].as_str().unwrap();
    assert_eq!(token.len(), 512);
    assert_eq!(json["tokenType"], "User");
    assert_eq!(json["owner"], id);
    assert_eq!(json["timesExtended"], 0);
    assert_eq!(json["lastTouched"], app.clock.now_millis());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_test_app().await;
    let disabled = app.create_user("bob").await;
    app.db.users().set_active(disabled, false).await.unwrap();
    app.create_user("alice").await;

    for (username, password) in [
        ("nobody", PASSWORD),
        ("alice", "wrong password"),
        ("bob", PASSWORD),
    ] {
        let response = app
            .post(
                "/api/sessions/user",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_user_cannot_log_in_as_admin() {
    let app = create_test_app().await;
    app.create_user("alice").await;

    let response = app
        .post(
            "/api/sessions/admin",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_ip() {
    let app = create_test_app_with_login_quota(2).await;
    app.create_user("alice").await;

    for _ in 0..2 {
        let response = app
            .post(
                "/api/sessions/user",
                None,
                json!({ "username": "alice", "password": "wrong password" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .post(
            "/api/sessions/user",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_login_without_client_ip_rejected() {
    let app = create_test_app().await;
    app.create_user("alice").await;

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/sessions/user")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    json!({ "username": "alice", "password": PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_verify_valid_token() {
    let app = create_test_app().await;
    let id = app.create_user("alice").await;
    let token = app.login_user("alice").await;

    let response = app.get("/api/sessions/verify", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["tokenType"], "User");
    assert_eq!(json["owner"], id);
}

#[tokio::test]
async fn test_missing_or_malformed_token() {
    let app = create_test_app().await;

    let response = app.get("/api/sessions/verify", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Not authenticated");

    let response = app.get("/api/sessions/verify", Some("not-a-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/api/sessions/verify")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_expires_after_seven_idle_days() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let token = app.login_user("alice").await;

    app.clock.advance(7 * DAY);
    let response = app.get("/api/sessions/verify", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // That request extended the token, so another 7 days are needed.
    app.clock.advance(7 * DAY + Duration::from_millis(1));
    let response = app.get("/api/sessions/verify", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn test_idle_token_expires() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let token = app.login_user("alice").await;

    app.clock.advance(7 * DAY + Duration::from_millis(1));
    let response = app.get("/api/sessions/verify", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extension_is_throttled() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let token = app.login_user("alice").await;

    app.clock.advance(HOUR - Duration::from_millis(1));
    let json = json_body(app.get("/api/sessions/verify", Some(&token)).await).await;
    assert_eq!(json["timesExtended"], 0);

    app.clock.advance(Duration::from_millis(1));
    let json = json_body(app.get("/api/sessions/verify", Some(&token)).await).await;
    assert_eq!(json["timesExtended"], 1);
    assert_eq!(json["lastTouched"], app.clock.now_millis());

    let json = json_body(app.get("/api/sessions/verify", Some(&token)).await).await;
    assert_eq!(json["timesExtended"], 1);
}

#[tokio::test]
async fn test_disabled_user_token_rejected() {
    let app = create_test_app().await;
    let id = app.create_user("alice").await;
    let token = app.login_user("alice").await;

    app.db.users().set_active(id, false).await.unwrap();

    let response = app.get("/api/sessions/verify", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_token_rejected_on_admin_routes() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let token = app.login_user("alice").await;

    let response = app.get("/api/admin/users", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_profile_reports_level() {
    let app = create_test_app().await;
    let id = app.create_user("alice").await;
    app.db.users().add_experience(id, 100).await.unwrap();
    let token = app.login_user("alice").await;

    let response = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["experience"], 100);
    assert_eq!(json["level"], 1);
    assert_eq!(json["next_level_experience"], 174);
    assert_eq!(json["experience_to_next_level"], 74);
}

#[tokio::test]
async fn test_profile_requires_user_token() {
    let app = create_test_app().await;
    app.create_admin("root", AdminRole::Super).await;
    let token = app.login_admin("root").await;

    let response = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Session management
// =============================================================================

#[tokio::test]
async fn test_logout_ends_only_current_session() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let first = app.login_user("alice").await;
    let second = app.login_user("alice").await;

    let response = app.delete("/api/sessions/current", Some(&first)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get("/api/sessions/verify", Some(&first)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.get("/api/sessions/verify", Some(&second)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_sessions_marks_current() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    app.create_user("bob").await;
    let first = app.login_user("alice").await;
    app.clock.advance(Duration::from_secs(1));
    let second = app.login_user("alice").await;
    app.login_user("bob").await;

    let response = app.get("/api/sessions", Some(&first)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let sessions = json["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);

    // Most recently touched first; secrets are never listed.
    assert_eq!(sessions[0]["isCurrent"], false);
    assert_eq!(sessions[1]["isCurrent"], true);
    for session in sessions {
        assert!(session.get("token").is_none());
        assert_eq!(session["tokenType"], "User");
    }
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_revoke_own_session() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    let current = app.login_user("alice").await;
    let other = app.login_user("alice").await;

    let other_id = app.sessions.find(&other).await.unwrap().unwrap().id.unwrap();

    let response = app
        .delete(&format!("/api/sessions/{}", other_id), Some(&current))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["revoked"], true);

    let response = app.get("/api/sessions/verify", Some(&other)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Already gone.
    let response = app
        .delete(&format!("/api/sessions/{}", other_id), Some(&current))
        .await;
    assert_eq!(json_body(response).await["revoked"], false);
}

#[tokio::test]
async fn test_cannot_revoke_other_users_session() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    app.create_user("bob").await;
    let alice = app.login_user("alice").await;
    let bob = app.login_user("bob").await;

    let bob_id = app.sessions.find(&bob).await.unwrap().unwrap().id.unwrap();

    let response = app
        .delete(&format!("/api/sessions/{}", bob_id), Some(&alice))
        .await;
    assert_eq!(json_body(response).await["revoked"], false);

    let response = app.get("/api/sessions/verify", Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_end_all_sessions() {
    let app = create_test_app().await;
    app.create_user("alice").await;
    app.create_user("bob").await;
    let first = app.login_user("alice").await;
    let second = app.login_user("alice").await;
    let bob = app.login_user("bob").await;

    let response = app.delete("/api/sessions", Some(&first)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["revoked"], 2);

    for token in [&first, &second] {
        let response = app.get("/api/sessions/verify", Some(token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app.get("/api/sessions/verify", Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
