mod common;

use axum::http::Method;
use serde_json::json;
use supply_ledger::config::LedgerConfig;

use common::{response_json, TestApp};

#[tokio::test]
async fn items_are_listed_in_creation_order() {
    let app = TestApp::new().await;
    let gauze = app.create_item("Gauze").await;
    let saline = app.create_item("  Saline 0.9% ").await;

    let response = app.request(Method::GET, "/inventory-items", None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(
        body,
        json!([
            { "id": gauze, "name": "Gauze" },
            { "id": saline, "name": "Saline 0.9%" },
        ])
    );
}

#[tokio::test]
async fn blank_item_name_is_rejected() {
    let app = TestApp::new().await;
    for name in ["", "   "] {
        let response = app
            .request(Method::POST, "/inventory-items", Some(json!({ "name": name })))
            .await;
        assert_eq!(response.status(), 400);
        let body = response_json(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn duplicate_names_follow_configuration() {
    let app = TestApp::new().await;
    app.create_item("Masks").await;
    app.create_item("Masks").await;

    let strict = TestApp::with_ledger(LedgerConfig {
        enforce_unique_item_names: true,
        ..LedgerConfig::default()
    })
    .await;
    strict.create_item("Masks").await;
    let response = strict
        .request(Method::POST, "/inventory-items", Some(json!({ "name": "masks" })))
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn unknown_item_returns_404() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/inventory-items/6f1c1f1e-8f53-4a5e-9d69-1f6b0c1c2d3e",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::GET, "/inventory-items/not-a-uuid", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn entries_build_the_history() {
    let app = TestApp::new().await;
    let item = app.create_item("Gloves").await;

    let response = app.replenish_to(item, 50, "2024-06-01", "08:00").await;
    assert_eq!(response.status(), 201);
    assert_eq!(
        response_json(response).await,
        json!({
            "date": "2024-06-01",
            "time": "08:00:00",
            "quantity": 50,
            "spent": 0,
            "isBase": true,
        })
    );

    let response = app.consume(item, 20, "2024-06-01", "09:15").await;
    assert_eq!(response.status(), 201);

    let response = app.consume(item, 40, "2024-06-01", "10:00").await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient stock"));

    let history = app.history(item).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["quantity"], 30);
    assert_eq!(history[1]["spent"], 20);
    assert_eq!(history[1]["isBase"], false);
}

#[tokio::test]
async fn base_entry_must_raise_the_total() {
    let app = TestApp::new().await;
    let item = app.create_item("Gloves").await;
    app.replenish_to(item, 10, "2024-06-01", "08:00").await;

    let response = app.replenish_to(item, 10, "2024-06-01", "09:00").await;
    assert_eq!(response.status(), 400);

    let response = app.replenish_to(item, 25, "2024-06-01", "09:00").await;
    assert_eq!(response.status(), 201);
    let projection = response_json(
        app.request(
            Method::GET,
            &format!("/inventory-items/{item}/projection"),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(projection["currentQuantity"], 25);
    assert_eq!(projection["totalUsage"], 25);
    assert_eq!(projection["entryCount"], 2);
}

#[tokio::test]
async fn usage_past_the_quantity_range_is_rejected() {
    let app = TestApp::new().await;
    let item = app.create_item("Gloves").await;
    let max = i64::MAX;

    assert_eq!(app.replenish_to(item, max, "2024-06-01", "08:00").await.status(), 201);
    assert_eq!(app.consume(item, max, "2024-06-01", "09:00").await.status(), 201);
    assert_eq!(app.replenish_to(item, 5, "2024-06-01", "10:00").await.status(), 400);

    let response = app
        .request(
            Method::GET,
            &format!("/inventory-items/{item}/projection"),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let projection = response_json(response).await;
    assert_eq!(projection["totalUsage"], max);
    assert_eq!(projection["currentQuantity"], 0);
    assert_eq!(projection["entryCount"], 2);
}

#[tokio::test]
async fn stale_quantity_is_a_conflict() {
    let app = TestApp::new().await;
    let item = app.create_item("Swabs").await;
    app.replenish_to(item, 10, "2024-06-01", "08:00").await;

    let response = app
        .request(
            Method::POST,
            "/inventory-entries",
            Some(json!({
                "item": item,
                "quantity": 9,
                "spent": 2,
                "isBase": false,
                "date": "2024-06-01",
                "time": "09:00",
            })),
        )
        .await;
    assert_eq!(response.status(), 409);
    assert_eq!(app.history(item).await.len(), 1);
}

#[tokio::test]
async fn malformed_entries_are_rejected_explicitly() {
    let app = TestApp::new().await;
    let item = app.create_item("Swabs").await;

    let cases = [
        json!({ "item": item, "spent": "five", "isBase": false, "date": "2024-06-01", "time": "09:00" }),
        json!({ "item": item, "spent": 0, "isBase": false, "date": "2024-06-01", "time": "09:00" }),
        json!({ "item": item, "quantity": 5, "isBase": true, "date": "06/01/2024", "time": "09:00" }),
        json!({ "item": item, "quantity": 5, "isBase": true, "date": "2024-06-01", "time": "late" }),
        json!({ "item": item, "quantity": 5, "spent": 2, "isBase": true, "date": "2024-06-01", "time": "09:00" }),
    ];
    for case in cases {
        let response = app
            .request(Method::POST, "/inventory-entries", Some(case.clone()))
            .await;
        assert_eq!(response.status(), 400, "{case}");
    }

    let response = app
        .request_raw(Method::POST, "/inventory-entries", "{not json")
        .await;
    assert_eq!(response.status(), 400);
    assert!(app.history(item).await.is_empty());
}

#[tokio::test]
async fn backdated_entry_is_rejected() {
    let app = TestApp::new().await;
    let item = app.create_item("Syringes").await;
    app.replenish_to(item, 10, "2024-06-02", "08:00").await;

    let response = app.consume(item, 1, "2024-06-01", "23:00").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn patch_corrects_only_the_last_consumption() {
    let app = TestApp::new().await;
    let item = app.create_item("Syringes").await;
    app.replenish_to(item, 50, "2024-06-01", "08:00").await;
    app.consume(item, 20, "2024-06-01", "09:00").await;
    let before = app.history(item).await;

    let uri = format!("/inventory-items/{item}");
    let response = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "historyIndex": 0, "spent": 5 })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "historyIndex": 1, "spent": 60 })),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(app.history(item).await, before);

    let response = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "historyIndex": 1, "spent": 10 })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let corrected = response_json(response).await;
    assert_eq!(corrected["quantity"], 40);
    assert_eq!(corrected["spent"], 10);

    let after = app.history(item).await;
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1]["quantity"], 40);
}

#[tokio::test]
async fn patch_on_replenishment_tail_is_rejected() {
    let app = TestApp::new().await;
    let item = app.create_item("Syringes").await;
    app.replenish_to(item, 5, "2024-06-01", "08:00").await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/inventory-items/{item}"),
            Some(json!({ "historyIndex": 0, "spent": 1 })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid operation"));
}

#[tokio::test]
async fn runs_group_consumptions_under_their_base() {
    let app = TestApp::new().await;
    let item = app.create_item("Masks").await;
    app.replenish_to(item, 100, "2024-06-01", "08:00").await;
    app.consume(item, 30, "2024-06-01", "09:00").await;
    app.replenish_to(item, 120, "2024-06-01", "10:00").await;

    let response = app
        .request(Method::GET, &format!("/inventory-items/{item}/runs"), None)
        .await;
    assert_eq!(response.status(), 200);
    let runs = response_json(response).await;
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["base"]["quantity"], 100);
    assert_eq!(runs[0]["entries"][0]["spent"], 30);
    assert_eq!(runs[1]["base"]["quantity"], 120);
    assert!(runs[1]["entries"].as_array().unwrap().is_empty());

    let projection = response_json(
        app.request(
            Method::GET,
            &format!("/inventory-items/{item}/projection"),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(projection["totalUsage"], 150);
    assert_eq!(projection["currentQuantity"], 120);
}

#[tokio::test]
async fn health_reports_storage_backend() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["storage"], "memory");
}
