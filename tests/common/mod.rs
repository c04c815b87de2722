#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use supply_ledger::{
    config::{AppConfig, LedgerConfig},
    db,
    events::{self, EventSender},
    repositories::create_repository,
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness wrapping the full router with in-process storage.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new("127.0.0.1".to_string(), 18_080, "test".to_string());
    cfg.cors_allow_any_origin = true;
    cfg
}

impl TestApp {
    /// Memory-backed application with default ledger settings.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_ledger(ledger: LedgerConfig) -> Self {
        let mut cfg = test_config();
        cfg.ledger = ledger;
        Self::with_config(cfg).await
    }

    /// Application backed by a private in-memory SQLite database.
    pub async fn sqlite() -> Self {
        let mut cfg = test_config();
        cfg.storage_backend = "database".to_string();
        cfg.database_url = "sqlite::memory:".to_string();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        Self::with_config(cfg).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let db = if cfg.uses_database() {
            let pool = db::establish_connection_from_app_config(&cfg)
                .await
                .expect("failed to create test database");
            db::run_migrations(&pool)
                .await
                .expect("failed to run migrations in tests");
            Some(Arc::new(pool))
        } else {
            None
        };

        let repository = create_repository(&cfg, db).expect("repository");
        let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(cfg, repository, event_sender);
        let router = supply_ledger::app(state.clone()).expect("router");

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a raw body with a JSON content type, for malformed-input cases.
    pub async fn request_raw(&self, method: Method, uri: &str, raw: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(raw.to_string()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn create_item(&self, name: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/inventory-items",
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status(), 201, "create item {name}");
        let body = response_json(response).await;
        body["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("item id")
    }

    pub async fn replenish_to(&self, item: Uuid, total: i64, date: &str, time: &str) -> Response {
        self.request(
            Method::POST,
            "/inventory-entries",
            Some(json!({
                "item": item,
                "quantity": total,
                "spent": 0,
                "isBase": true,
                "date": date,
                "time": time,
            })),
        )
        .await
    }

    pub async fn consume(&self, item: Uuid, spent: i64, date: &str, time: &str) -> Response {
        self.request(
            Method::POST,
            "/inventory-entries",
            Some(json!({
                "item": item,
                "spent": spent,
                "isBase": false,
                "date": date,
                "time": time,
            })),
        )
        .await
    }

    pub async fn history(&self, item: Uuid) -> Vec<Value> {
        let response = self
            .request(Method::GET, &format!("/inventory-items/{item}"), None)
            .await;
        assert_eq!(response.status(), 200);
        response_json(response).await["history"]
            .as_array()
            .cloned()
            .expect("history array")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
