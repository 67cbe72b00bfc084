// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request helpers around `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use project_feed::{
    config::{Config, SignatureConfig},
    AppState, MemoryStore, RecordStore, SignatureVerifier,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// A response with its body fully read.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

/// Router plus handles to its state and store.
pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub store: Arc<dyn RecordStore>,
}

impl TestApp {
    /// Service backed by a fresh in-memory store.
    pub fn new(config: Config) -> Self {
        let page_size = config.store.page_size;
        Self::with_store(config, Arc::new(MemoryStore::new(page_size)))
    }

    pub fn with_store(config: Config, store: Arc<dyn RecordStore>) -> Self {
        let state = AppState::new(config, store.clone()).expect("application state");
        let app = project_feed::router(state.clone());
        Self { app, state, store }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = tokio_test::assert_ok!(self.app.clone().oneshot(request).await);
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post_webhook(&self, body: &str) -> TestResponse {
        self.send(webhook_request(body, None)).await
    }

    pub async fn post_signed(&self, body: &str, signature: &str) -> TestResponse {
        let header = self.state.config.signature.header.clone();
        self.send(webhook_request(body, Some((&header, signature)))).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("GET")
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn feed(&self) -> Value {
        let response = self.get("/projects.geojson").await;
        assert_eq!(response.status, StatusCode::OK);
        response.json()
    }

    /// Run a regeneration to completion, independent of background triggers.
    pub async fn regenerate(&self) {
        self.state
            .regenerator
            .regenerate()
            .await
            .expect("regeneration succeeds");
    }

    /// Poll the feed until `predicate` holds, giving background work time to land.
    pub async fn wait_for_feed<F>(&self, predicate: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        for _ in 0..100 {
            let feed = self.feed().await;
            if predicate(&feed) {
                return feed;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("feed never satisfied predicate");
    }
}

pub fn webhook_request(body: &str, signature: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some((name, value)) = signature {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

/// Sign a body the way a sender configured with `secret` would.
pub fn sign(secret: &str, body: &str) -> String {
    SignatureVerifier::new(&SignatureConfig {
        secret: secret.to_string(),
        ..Default::default()
    })
    .sign(body.as_bytes())
    .expect("secret is set")
}

/// Ids of all features in a feed document.
pub fn feature_ids(feed: &Value) -> Vec<String> {
    feed["features"]
        .as_array()
        .map(|features| {
            features
                .iter()
                .filter_map(|f| f["properties"]["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
