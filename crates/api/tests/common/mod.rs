//! Router test fixtures.
//!
//! The app is wired to the in-memory store and an HS256 test secret, so these
//! tests run without PostgreSQL or RSA keys.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::services::{EntitlementPolicy, RecordingActivityLog};
use domain::store::InMemoryStore;
use domain::EntitlementEngine;
use entitlement_api::{
    app::{create_app, AppState},
    config::Config,
};
use shared::jwt::{JwtConfig, Role};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "router_test_secret_key_0123456789";

pub struct TestApp {
    pub router: Router,
    pub engine: EntitlementEngine,
    pub store: InMemoryStore,
    pub activity: Arc<RecordingActivityLog>,
    jwt: JwtConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let activity = Arc::new(RecordingActivityLog::new());
        let engine = EntitlementEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            activity.clone(),
            EntitlementPolicy::default(),
        );
        let config = Config::load_for_test(&[]).expect("Failed to load test config");
        let jwt = JwtConfig::new_for_testing(TEST_JWT_SECRET);

        Self {
            router: create_app(AppState::new(config, engine.clone(), jwt.clone())),
            engine,
            store,
            activity,
            jwt,
        }
    }

    pub fn token_for(&self, user_id: Uuid, role: Role) -> String {
        self.jwt
            .issue(user_id, role, 900)
            .expect("Failed to issue test token")
            .0
    }

    pub fn admin_token(&self) -> String {
        self.token_for(Uuid::new_v4(), Role::Admin)
    }

    /// Mints a 30-day key directly through the engine.
    pub async fn mint_key(&self, product_id: Uuid) -> String {
        self.engine
            .license_keys
            .generate(product_id, 30, Uuid::new_v4())
            .await
            .expect("Failed to mint test key")
            .code
    }
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap_or(serde_json::Value::Null)
}
