//! Supply Ledger library
//!
//! Append-only stock ledger for medical supplies: item registry, ledger
//! store, quantity projection and tail-entry correction behind a JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod telemetry;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::repositories::LedgerRepository;
use crate::services::SupplyLedgerService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<SupplyLedgerService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn LedgerRepository>,
        event_sender: EventSender,
    ) -> Self {
        let ledger = SupplyLedgerService::new(repository, event_sender, config.ledger.clone());
        Self {
            config: Arc::new(config),
            ledger: Arc::new(ledger),
        }
    }
}

/// Ledger routes, without middleware
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventory-items",
            get(handlers::inventory_items::list_items).post(handlers::inventory_items::create_item),
        )
        .route(
            "/inventory-items/:id",
            get(handlers::inventory_items::get_item).patch(handlers::inventory_items::correct_entry),
        )
        .route(
            "/inventory-items/:id/projection",
            get(handlers::inventory_items::get_projection),
        )
        .route(
            "/inventory-items/:id/runs",
            get(handlers::inventory_items::get_runs),
        )
        .route(
            "/inventory-entries",
            post(handlers::inventory_entries::create_entry),
        )
        .route("/health", get(health::health_check))
        .route("/status", get(health::version_info))
}

/// CORS policy from configuration; refuses to guess outside development.
pub fn cors_layer(cfg: &AppConfig) -> Result<CorsLayer, ServiceError> {
    let configured_origins = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|origins| {
            origins
                .split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        warn!("Missing CORS configuration detected");
        Err(ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// Full application router: API, Swagger UI and the middleware stack.
pub fn app(state: AppState) -> Result<Router, ServiceError> {
    let cors = cors_layer(&state.config)?;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Ok(Router::new()
        .merge(api_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(telemetry::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state))
}
