//! HTTP behavior of the tracker router: gate, table, cell edits and API.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::{StatusCode, header};
use ops_cost_integration_tests::{
    COSTS, body_text, request, seeded_store, session_cookie, test_app,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

/// Unlock through the PIN form and return the session cookie.
async fn unlock(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/auth/pin",
            None,
            Some((FORM, "d0=1&d1=2&d2=3&d3=4".to_string())),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    session_cookie(&response).unwrap()
}

#[tokio::test]
async fn test_health_is_open() {
    let (app, _) = test_app(seeded_store().await).await;
    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_locked_requests_are_turned_away() {
    let (app, _) = test_app(seeded_store().await).await;

    let page = app.clone().oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
    assert_eq!(page.headers()[header::LOCATION], "/auth/pin");

    let api = app
        .clone()
        .oneshot(request("GET", "/api/costs", None, None))
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);

    let pin_page = app.oneshot(request("GET", "/auth/pin", None, None)).await.unwrap();
    assert_eq!(pin_page.status(), StatusCode::OK);
    assert!(body_text(pin_page).await.contains("name=\"d0\""));
}

#[tokio::test]
async fn test_wrong_pin_is_rejected() {
    let (app, _) = test_app(seeded_store().await).await;

    let response = app
        .clone()
        .oneshot(request("POST", "/auth/pin", None, Some((FORM, "pin=9999".to_string()))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A rejected attempt sets no unlock flag, so any cookie it produced is useless.
    let cookie = session_cookie(&response);
    assert!(body_text(response).await.contains("Incorrect PIN"));

    let page = app
        .oneshot(request("GET", "/", cookie.as_deref(), None))
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_unlock_then_browse_and_lock() {
    let (app, _) = test_app(seeded_store().await).await;
    let cookie = unlock(&app).await;

    let page = app
        .clone()
        .oneshot(request("GET", "/", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_text(page).await;
    assert!(html.contains("OPS-1"));
    assert!(html.contains("Bayside Home"));

    // The PIN page bounces an unlocked session back to the table.
    let pin_page = app
        .clone()
        .oneshot(request("GET", "/auth/pin", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(pin_page.status(), StatusCode::SEE_OTHER);

    let logout = app
        .clone()
        .oneshot(request("POST", "/auth/logout", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(logout.headers()[header::LOCATION], "/auth/pin");

    let page = app.oneshot(request("GET", "/", Some(&cookie), None)).await.unwrap();
    assert_eq!(page.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_search_filters_rows() {
    let (app, _) = test_app(seeded_store().await).await;
    let cookie = unlock(&app).await;

    let html = body_text(
        app.oneshot(request("GET", "/?q=bayside", Some(&cookie), None))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("Bayside Home"));
    assert!(!html.contains("Acme Rugs"));
}

#[tokio::test]
async fn test_cell_edit_saves_row() {
    let store = seeded_store().await;
    let (app, _) = test_app(std::sync::Arc::clone(&store)).await;
    let cookie = unlock(&app).await;

    let response = app
        .oneshot(request(
            "POST",
            "/costs/OPS-2/dyeing",
            Some(&cookie),
            Some((FORM, "value=%E2%82%B91%2C500".to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("hx-swap-oob=\"true\""));
    assert!(!html.contains("<input"));
    assert!(html.contains("₹1,500"));
    assert!(html.contains("-₹500"));

    let stored = store.get(COSTS, "OPS-2").await.unwrap();
    assert_eq!(stored["dyeing"], json!(1500));
    assert_eq!(stored["margin"], json!(-500));
}

#[tokio::test]
async fn test_cell_edit_errors() {
    let (app, _) = test_app(seeded_store().await).await;
    let cookie = unlock(&app).await;

    let unknown_field = app
        .clone()
        .oneshot(request(
            "POST",
            "/costs/OPS-2/packaging",
            Some(&cookie),
            Some((FORM, "value=1".to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_field.status(), StatusCode::BAD_REQUEST);

    let unknown_order = app
        .clone()
        .oneshot(request(
            "POST",
            "/costs/OPS-404/dyeing",
            Some(&cookie),
            Some((FORM, "value=1".to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_order.status(), StatusCode::NOT_FOUND);

    let detail = app
        .oneshot(request("GET", "/orders/OPS-404", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_detail_panel() {
    let (app, _) = test_app(seeded_store().await).await;
    let cookie = unlock(&app).await;

    let response = app
        .oneshot(request("GET", "/orders/OPS-1", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("PO-OPS-1"));
    assert!(html.contains("02 Nov 2026"));
    assert!(html.contains("33.3%"));
}

#[tokio::test]
async fn test_api_update_then_save() {
    let store = seeded_store().await;
    let (app, _) = test_app(std::sync::Arc::clone(&store)).await;
    let cookie = unlock(&app).await;

    let updated = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/costs/OPS-2/shipping",
            Some(&cookie),
            Some(("application/json", json!({"value": 75}).to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let row: Value = serde_json::from_str(&body_text(updated).await).unwrap();
    assert_eq!(row["shipping"], json!(75));
    assert_eq!(row["totalCost"], json!(75));
    assert_eq!(row["hasCosts"], json!(true));

    // In memory only until saved.
    assert!(store.get(COSTS, "OPS-2").await.is_none());

    let saved = app
        .clone()
        .oneshot(request("POST", "/api/costs/OPS-2/save", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(saved).await).unwrap();
    assert_eq!(body["status"], json!("saved"));
    assert_eq!(store.get(COSTS, "OPS-2").await.unwrap()["shipping"], json!(75));

    let missing = app
        .oneshot(request("POST", "/api/costs/OPS-404/save", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_save_failure_is_bad_gateway() {
    let store = seeded_store().await;
    let (app, _) = test_app(std::sync::Arc::clone(&store)).await;
    let cookie = unlock(&app).await;

    store.set_fail_on_upsert(true);
    let response = app
        .oneshot(request("POST", "/api/costs/OPS-1/save", Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], json!("failed"));
}

#[tokio::test]
async fn test_api_lists_rows_and_stats() {
    let (app, _) = test_app(seeded_store().await).await;
    let cookie = unlock(&app).await;

    let rows: Value = serde_json::from_str(
        &body_text(
            app.clone()
                .oneshot(request("GET", "/api/costs?q=acme", Some(&cookie), None))
                .await
                .unwrap(),
        )
        .await,
    )
    .unwrap();
    let ops: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["opsNo"].as_str().unwrap())
        .collect();
    assert_eq!(ops, ["OPS-10", "OPS-1"]);

    let stats: Value = serde_json::from_str(
        &body_text(
            app.oneshot(request("GET", "/api/stats", Some(&cookie), None))
                .await
                .unwrap(),
        )
        .await,
    )
    .unwrap();
    assert_eq!(stats["totalOrders"], json!(3));
    assert_eq!(stats["ordersWithCosts"], json!(1));
    assert_eq!(stats["totalCosts"], json!(200));
    assert_eq!(stats["grandTotal"], json!(200));
    assert_eq!(stats["topCategory"], json!("materialPurchase"));
    assert_eq!(stats["breakdown"].as_array().unwrap().len(), 7);
    assert_eq!(stats["breakdown"][0]["percentage"], json!(50));
}
