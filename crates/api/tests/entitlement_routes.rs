//! Router-level tests over the in-memory store.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_bytes, empty_request, json_request, parse_response_body, TestApp};
use serde_json::json;
use shared::jwt::Role;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Health & authentication
// ============================================================================

#[tokio::test]
async fn test_health_reports_store_clock() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["connected"], true);
    assert!(body["store"]["clock"].is_string());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/subscriptions", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_user_token_on_admin_route_is_forbidden() {
    let app = TestApp::new();
    let token = app.token_for(Uuid::new_v4(), Role::User);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/invite-codes",
            json!({ "count": 1 }),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/health", None))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// License keys & subscriptions
// ============================================================================

#[tokio::test]
async fn test_license_key_generate_and_activate() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;
    let user = app.store.add_user("alice").await;
    let admin_token = app.admin_token();
    let user_token = app.token_for(user.id, Role::User);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/license-keys",
            json!({ "product_id": product.id, "duration_days": 30, "count": 2 }),
            &admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    let code = keys[0]["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("FATALITY-"));

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/license-keys/activate",
            json!({ "code": code.to_lowercase() }),
            &user_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["product_name"], "fatality");
    assert_eq!(body["display_name"], "Fatality");
    assert_eq!(body["duration_days"], 30);
    assert_eq!(body["extended"], false);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/subscriptions",
            Some(&user_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reused_license_key_conflicts() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;
    let first = app.store.add_user("alice").await;
    let second = app.store.add_user("bob").await;
    let key = app.mint_key(product.id).await;

    let activate = |user_id: Uuid| {
        json_request(
            Method::POST,
            "/api/v1/license-keys/activate",
            json!({ "code": key }),
            &app.token_for(user_id, Role::User),
        )
    };

    let response = app.router.clone().oneshot(activate(first.id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.clone().oneshot(activate(second.id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "already_used");
    assert!(body["details"]["used_at"].is_string());
}

#[tokio::test]
async fn test_license_key_validation_error() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/license-keys",
            json!({ "product_id": product.id, "duration_days": 0 }),
            &app.admin_token(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_unknown_license_key_not_found() {
    let app = TestApp::new();
    let user = app.store.add_user("alice").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/license-keys/activate",
            json!({ "code": "FATALITY-0123456789ABCDEF" }),
            &app.token_for(user.id, Role::User),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_subscription_lifecycle() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;
    let user = app.store.add_user("alice").await;
    let admin_token = app.admin_token();
    let target = json!({ "user_id": user.id, "product_id": product.id, "days": 10 });

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/subscriptions/grant",
            target.clone(),
            &admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let granted = parse_response_body(response).await;
    assert_eq!(granted["is_active"], true);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/subscriptions/extend",
            target.clone(),
            &admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let extended = parse_response_body(response).await;
    assert_ne!(extended["end_date"], granted["end_date"]);

    let revoke = json!({ "user_id": user.id, "product_id": product.id });
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/subscriptions/revoke",
            revoke.clone(),
            &admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.activity.actions("subscription.revoked").len(), 1);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/subscriptions/revoke",
            json!({ "user_id": Uuid::new_v4(), "product_id": product.id }),
            &admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// HWID
// ============================================================================

#[tokio::test]
async fn test_hwid_reset_then_throttled() {
    let app = TestApp::new();
    let user = app.store.add_user("alice").await;
    let token = app.token_for(user.id, Role::User);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::POST, "/api/v1/hwid/reset", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = parse_response_body(response).await;
    assert_eq!(status["can_reset"], false);
    assert_eq!(status["reset_count"], 1);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::POST, "/api/v1/hwid/reset", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "throttled");
    assert!(body["details"]["retry_after"].is_string());

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/hwid/status", Some(&token)))
        .await
        .unwrap();
    let status = parse_response_body(response).await;
    assert!(status["next_eligible_at"].is_string());
}

#[tokio::test]
async fn test_admin_force_hwid_reset() {
    let app = TestApp::new();
    let user = app.store.add_user("alice").await;
    let admin_token = app.admin_token();

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/hwid/reset", user.id),
            Some(&admin_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/hwid/reset", Uuid::new_v4()),
            Some(&admin_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Invite codes
// ============================================================================

#[tokio::test]
async fn test_invite_code_create_validate_consume() {
    let app = TestApp::new();
    let user_token = app.token_for(Uuid::new_v4(), Role::User);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/invite-codes",
            json!({ "count": 3 }),
            &app.admin_token(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    let codes = body["codes"].as_array().unwrap();
    assert_eq!(codes.len(), 3);
    let code = codes[0]["code"].as_str().unwrap().to_string();

    let validate_uri = format!("/api/v1/invite-codes/{}", code);
    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, &validate_uri, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["valid"], true);

    let consume_uri = format!("/api/v1/invite-codes/{}/consume", code);
    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::POST, &consume_uri, Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(parse_response_body(response).await["consumed"], true);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::POST, &consume_uri, Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["consumed"], false);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, &validate_uri, None))
        .await
        .unwrap();
    assert_eq!(parse_response_body(response).await["valid"], false);
}

#[tokio::test]
async fn test_invite_code_batch_too_large() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/invite-codes",
            json!({ "count": 101 }),
            &app.admin_token(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn test_download_token_issue_reuse_and_consume() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;
    app.store
        .add_loader(product.id, "fatality", "fatality.exe", Some(vec![7u8; 16]))
        .await;
    let owner = app.store.add_user("alice").await;
    let intruder = app.store.add_user("mallory").await;
    let owner_token = app.token_for(owner.id, Role::User);
    let intruder_token = app.token_for(intruder.id, Role::User);

    let issue = || {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/v1/downloads/fatality/token")
            .header(header::AUTHORIZATION, format!("Bearer {}", owner_token))
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header(header::USER_AGENT, "Loader/2.1")
            .body(axum::body::Body::empty())
            .unwrap()
    };

    let response = app.router.clone().oneshot(issue()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let issued = parse_response_body(response).await;
    assert_eq!(issued["reused"], false);
    assert_eq!(issued["filename"], "fatality.exe");
    assert_eq!(issued["size"], 16);
    let token = issued["token"].as_str().unwrap().to_string();

    let response = app.router.clone().oneshot(issue()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reissued = parse_response_body(response).await;
    assert_eq!(reissued["reused"], true);
    assert_eq!(reissued["token"], token.as_str());

    let consume_uri = format!("/api/v1/downloads/token/{}", token);
    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, &consume_uri, Some(&intruder_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        parse_response_body(response).await["error"],
        "security_violation"
    );
    assert_eq!(
        app.activity
            .actions("download_token.identity_mismatch")
            .len(),
        1
    );

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, &consume_uri, Some(&owner_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"fatality.exe\""
    );
    assert_eq!(body_bytes(response).await, vec![7u8; 16]);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(Method::GET, &consume_uri, Some(&owner_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(
        parse_response_body(response).await["error"],
        "invalid_or_expired"
    );
}

#[tokio::test]
async fn test_download_token_for_unknown_cheat() {
    let app = TestApp::new();
    let user = app.store.add_user("alice").await;

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            "/api/v1/downloads/nothing/token",
            Some(&app.token_for(user.id, Role::User)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_download_token_is_gone() {
    let app = TestApp::new();
    let product = app.store.add_product("fatality", "Fatality").await;
    app.store
        .add_loader(product.id, "fatality", "fatality.exe", Some(vec![1, 2, 3]))
        .await;
    let user = app.store.add_user("alice").await;
    let token = app.token_for(user.id, Role::User);

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            "/api/v1/downloads/fatality/token",
            Some(&token),
        ))
        .await
        .unwrap();
    let download = parse_response_body(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    app.store.advance_clock(chrono::Duration::minutes(31));

    let response = app
        .router
        .clone()
        .oneshot(empty_request(
            Method::GET,
            &format!("/api/v1/downloads/token/{}", download),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
}
