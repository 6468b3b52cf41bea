//! Integration tests for the OPS cost tracker.
//!
//! Everything runs in-process: the router is driven with
//! `tower::ServiceExt::oneshot` over a [`MemoryStore`], and the Firestore
//! client is pointed at a `wiremock` server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ops-cost-integration-tests
//! ```

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use ops_cost_core::Document;
use ops_cost_tracker::config::{FirestoreConfig, TrackerConfig};
use ops_cost_tracker::middleware::{JsonSessionStore, create_session_layer};
use ops_cost_tracker::state::AppState;
use ops_cost_tracker::store::MemoryStore;
use serde_json::{Value, json};

pub const ORDERS: &str = "ops_no";
pub const COSTS: &str = "ops_costs";

/// Unwrap a JSON object literal into a document.
#[must_use]
pub fn document(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// Three orders, costs for OPS-1, and one overlay with no order.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    for (ops_no, buyer, code, po) in [
        ("OPS-1", "Acme Rugs", "AR", 300),
        ("OPS-2", "Bayside Home", "BH", 1000),
        ("OPS-10", "Acme Rugs", "AR", 0),
    ] {
        store
            .insert(
                ORDERS,
                ops_no,
                document(json!({
                    "opsNo": ops_no,
                    "buyerName": buyer,
                    "buyerCode": code,
                    "poValue": po,
                    "poNumber": format!("PO-{ops_no}"),
                    "shipDate": "2026-11-02",
                    "status": "in_production",
                })),
            )
            .await;
    }

    store
        .insert(
            COSTS,
            "OPS-1",
            document(json!({
                "opsNo": "OPS-1",
                "buyerName": "Old Name",
                "buyerCode": "AR",
                "poValue": 300,
                "materialPurchase": 100,
                "dyeing": 50,
                "weaving": 0,
                "finishing": 0,
                "rework": 0,
                "packingLabels": 25,
                "shipping": 25,
                "updatedAt": "2026-10-01T08:00:00.000Z",
            })),
        )
        .await;
    store
        .insert(COSTS, "OPS-99", document(json!({"opsNo": "OPS-99", "dyeing": 5})))
        .await;

    store
}

/// Local configuration over a placeholder project.
#[must_use]
pub fn test_config() -> TrackerConfig {
    TrackerConfig::local(FirestoreConfig::new("test-project"))
}

/// Router and state over `store`, loaded and ready.
pub async fn test_app(store: Arc<MemoryStore>) -> (Router, AppState) {
    let config = test_config();
    let session_layer = create_session_layer(JsonSessionStore::in_memory(), &config);
    let state = AppState::new(config, store);
    state.costs().load().await;
    (ops_cost_tracker::app(state.clone(), session_layer), state)
}

/// `name=value` of the session cookie set by a response, if any.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("ops_cost_session="))
        .and_then(|value| value.split(';').next())
        .map(ToString::to_string)
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Build a request, attaching `cookie` when given.
#[must_use]
pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some((content_type, body)) => builder
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
