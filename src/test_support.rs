//! Drives the real router against an in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use crate::{build_router, db::MemoryStore, AppState};

pub struct TestApp {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    /// Unique names enforced, as in the default configuration.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(true))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let state = AppState {
            store: Arc::new(store),
        };
        Self {
            router: build_router(state),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => Request::builder().method(method).uri(uri).body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse { status, body }
    }

    /// Creates a product and returns its id.
    pub async fn create(&self, product: Value) -> String {
        let response = self.request(Method::POST, "/products", Some(product)).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        response.json()["insertedId"]
            .as_str()
            .expect("insertedId")
            .to_string()
    }

    pub async fn list(&self, query: Option<Value>) -> Vec<Value> {
        let response = self.request(Method::GET, "/products", query).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        match response.json() {
            Value::Array(items) => items,
            other => panic!("expected array, got {other}"),
        }
    }
}
