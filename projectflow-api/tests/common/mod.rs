//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-process router over the in-memory store
//! - A manual clock for expiry tests
//! - A recording mailer for confirmation links
//! - Request helpers returning status, headers and JSON body

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use projectflow_api::app::{build_router, AppState};
use projectflow_api::config::{AccountConfig, ApiConfig, Config, JwtConfig};
use projectflow_shared::auth::clock::ManualClock;
use projectflow_shared::service::mail::MemoryMailer;
use projectflow_shared::store::memory::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

/// Response parts the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Set-Cookie` header values
    pub fn cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Value of the cookie `name` as set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().into_iter().find_map(|c| {
            c.split(';')
                .next()
                .and_then(|pair| pair.split_once('='))
                .filter(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<MemoryMailer>,
    pub config: Config,
}

pub fn test_config(require_email_verification: bool) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: None,
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            expiration_ms: 900_000,
            refresh_expiration_ms: 604_800_000,
            verification_expiration_ms: 21_600_000,
        },
        accounts: AccountConfig {
            require_email_verification,
            client_url: "http://localhost:3000".to_string(),
        },
    }
}

impl TestContext {
    /// Accounts are enabled on registration
    pub fn new() -> Self {
        Self::with_config(test_config(false))
    }

    /// Accounts must confirm their email before logging in
    pub fn with_verification() -> Self {
        Self::with_config(test_config(true))
    }

    pub fn with_config(config: Config) -> Self {
        let clock = Arc::new(ManualClock::default());
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            mailer.clone(),
            clock.clone(),
            config.clone(),
        );

        Self {
            app: build_router(state),
            clock,
            mailer,
            config,
        }
    }

    /// Sends a request, with an optional Bearer token and JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a prepared request
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers an account (verification off) and returns the login response
    pub async fn signup(&self, name: &str, email: &str) -> TestResponse {
        let registered = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await
    }

    /// Registers, logs in and returns `(access token, user id)`
    pub async fn user(&self, name: &str, email: &str) -> (String, String) {
        let login = self.signup(name, email).await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);

        (
            login.body["access_token"].as_str().unwrap().to_string(),
            login.body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a project and returns its JSON
    pub async fn project(&self, token: &str, title: &str) -> Value {
        let response = self
            .post("/api/projects", token, json!({ "title": title }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Creates a task and returns its JSON
    pub async fn task(&self, token: &str, project_id: &str, title: &str) -> Value {
        let response = self
            .post(
                "/api/tasks",
                token,
                json!({ "project_id": project_id, "title": title }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}
