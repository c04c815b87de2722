use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::HistoryEntry;
use crate::errors::ServiceError;
use crate::models::EntryTimestamp;
use crate::services::RecordEntryCommand;
use crate::AppState;

/// A ledger entry as submitted by the inventory page.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    /// Item id
    pub item: Uuid,
    /// New running total; required when `isBase` is true
    pub quantity: Option<i64>,
    /// Units consumed; required when `isBase` is false
    pub spent: Option<i64>,
    pub is_base: bool,
    /// `YYYY-MM-DD`
    #[schema(example = "2024-06-01")]
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    #[schema(example = "14:30")]
    pub time: String,
}

#[utoipa::path(
    post,
    path = "/inventory-entries",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry appended", body = HistoryEntry),
        (status = 400, description = "Invalid input or stock would go negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Submitted quantity is stale", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-entries"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(payload) = payload?;
    let timestamp = EntryTimestamp::parse(&payload.date, &payload.time)?;

    let entry = state
        .ledger
        .record_entry(RecordEntryCommand {
            item_id: payload.item,
            is_base: payload.is_base,
            quantity: payload.quantity,
            spent: payload.spent,
            timestamp,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(HistoryEntry::from(&entry))))
}
