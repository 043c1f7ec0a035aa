//! Shared harness for the HTTP integration tests.
//!
//! Every test gets its own router over a fresh `MemoryStore`; requests are
//! driven straight through the service with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use puzzle_service::{
    build_router,
    config::{
        CorsConfig, DatabaseConfig, Environment, PuzzleConfig, RateLimitConfig, TokenConfig,
    },
    models::{NewUser, PermissionCode, Token, TokenScope, User},
    services::{MemoryStore, Store},
    utils::{token::generate_token, Credential},
    AppState,
};
use service_core::pagination::PageBounds;
use service_core::tasks::TaskSupervisor;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "pa55word-for-tests";

pub fn test_config() -> PuzzleConfig {
    PuzzleConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "puzzle-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout_seconds: 60,
            query_timeout_seconds: 3,
        },
        rate_limit: RateLimitConfig {
            enabled: false,
            requests_per_second: 2.0,
            burst: 4,
        },
        cors: CorsConfig::default(),
        pagination: PageBounds::default(),
        token: TokenConfig { ttl_hours: 24 },
    }
}

/// A router over an empty in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone(), TaskSupervisor::new());
        let router = build_router(state.clone());
        Self {
            router,
            store,
            state,
        }
    }

    /// Insert a user directly, bypassing the HTTP surface.
    pub async fn create_user(
        &self,
        name: &str,
        activated: bool,
        permissions: &[PermissionCode],
    ) -> User {
        let user = self
            .store
            .insert_user(&NewUser {
                email: format!("{}@example.com", name),
                full_name: format!("{} Tester", name),
                display_name: name.to_string(),
                credential: Credential::set(PASSWORD).expect("hash password"),
                activated,
            })
            .await
            .expect("insert user");
        if !permissions.is_empty() {
            self.store
                .add_permissions_for_user(user.id, permissions)
                .await
                .expect("grant permissions");
        }
        user
    }

    /// Issue a live authentication token for `user`, returning the plaintext.
    pub async fn token_for(&self, user: &User) -> String {
        let (issued, token) =
            generate_token(user.id, Duration::hours(1), TokenScope::Authentication);
        self.store.insert_token(&token).await.expect("insert token");
        issued.token
    }

    /// A token whose expiry has already passed.
    pub async fn expired_token_for(&self, user: &User) -> String {
        let (issued, token) =
            generate_token(user.id, Duration::hours(1), TokenScope::Authentication);
        self.store
            .insert_token(&Token {
                expiry: Utc::now() - Duration::minutes(1),
                ..token
            })
            .await
            .expect("insert token");
        issued.token
    }

    /// An activated user holding the standard grant, plus a token.
    pub async fn editor(&self, name: &str) -> (User, String) {
        let user = self.create_user(name, true, &PermissionCode::STANDARD).await;
        let token = self.token_for(&user).await;
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response {
        self.send(request(method, uri, token, Some(body.to_string())))
            .await
    }

    /// Create a puzzle through the API and return its JSON.
    pub async fn create_puzzle(&self, token: &str, title: &str, published: bool) -> serde_json::Value {
        let res = self
            .json(
                Method::POST,
                "/v1/puzzles",
                Some(token),
                puzzle_body(title, published),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await["puzzle"].clone()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

pub fn puzzle_body(title: &str, published: bool) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "description": "A small themed grid",
        "width": 5,
        "height": 5,
        "published": published,
        "content": {
            "across": {
                "1": { "row": 0, "col": 0, "clue": "Feline", "answer": "CAT" }
            },
            "down": {
                "1": { "row": 0, "col": 0, "clue": "Taxi", "answer": "CAB" }
            }
        }
    })
}

pub async fn body_json(res: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
