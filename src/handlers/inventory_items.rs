use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::HistoryEntry;
use crate::errors::ServiceError;
use crate::models::Item;
use crate::services::group_runs;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<Item> for ItemSummary {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
}

/// Item with its full history in replay order
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemDetail {
    pub id: Uuid,
    pub name: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorrectEntryRequest {
    /// Position in `history`; must be the last entry
    pub history_index: usize,
    /// New consumed amount
    pub spent: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub item_id: Uuid,
    pub current_quantity: i64,
    /// Cumulative replenishment volume
    pub total_usage: i64,
    pub entry_count: usize,
}

/// One replenishment and the consumptions that followed it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub base: Option<HistoryEntry>,
    pub entries: Vec<HistoryEntry>,
}

#[utoipa::path(
    get,
    path = "/inventory-items",
    responses(
        (status = 200, description = "Items in creation order", body = [ItemSummary]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemSummary>>, ServiceError> {
    let items = state.ledger.list_items().await?;
    Ok(Json(items.into_iter().map(ItemSummary::from).collect()))
}

#[utoipa::path(
    post,
    path = "/inventory-items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemSummary),
        (status = 400, description = "Empty or invalid name", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let item = state.ledger.create_item(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(ItemSummary::from(item))))
}

#[utoipa::path(
    get,
    path = "/inventory-items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item with history", body = ItemDetail),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ItemDetail>, ServiceError> {
    let Path(id) = id?;
    let item = state.ledger.get_item(id).await?;
    let history = state.ledger.get_history(id).await?;

    Ok(Json(ItemDetail {
        id: item.id,
        name: item.name,
        history: history.iter().map(HistoryEntry::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/inventory-items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = CorrectEntryRequest,
    responses(
        (status = 200, description = "Corrected tail entry", body = HistoryEntry),
        (status = 400, description = "Not the last entry, not a consumption, or stock would go negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn correct_entry(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CorrectEntryRequest>, JsonRejection>,
) -> Result<Json<HistoryEntry>, ServiceError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let entry = state
        .ledger
        .correct_entry(id, payload.history_index, payload.spent)
        .await?;
    Ok(Json(HistoryEntry::from(&entry)))
}

#[utoipa::path(
    get,
    path = "/inventory-items/{id}/projection",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Derived totals", body = ProjectionResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn get_projection(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProjectionResponse>, ServiceError> {
    let Path(id) = id?;
    let projection = state.ledger.projection(id).await?;

    Ok(Json(ProjectionResponse {
        item_id: id,
        current_quantity: projection.current_quantity,
        total_usage: projection.total_usage,
        entry_count: projection.entry_count,
    }))
}

#[utoipa::path(
    get,
    path = "/inventory-items/{id}/runs",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "History grouped by replenishment", body = [RunResponse]),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory-items"
)]
pub async fn get_runs(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<RunResponse>>, ServiceError> {
    let Path(id) = id?;
    let history = state.ledger.get_history(id).await?;

    let runs = group_runs(&history)
        .into_iter()
        .map(|run| RunResponse {
            base: run.base.map(HistoryEntry::from),
            entries: run.consumptions.into_iter().map(HistoryEntry::from).collect(),
        })
        .collect();
    Ok(Json(runs))
}
