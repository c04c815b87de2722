use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Supply Ledger API",
        version = "0.1.0",
        description = r#"
# Supply Ledger API

Append-only stock ledger for medical supplies. Each item keeps an ordered
history of replenishments ("base" entries) and consumptions; the on-hand
quantity is the quantity recorded by the last entry.

Only the last entry of an item can be corrected, and only when it is a
consumption.

## Error Handling

Every failure returns the same envelope:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock: cannot consume 40 units, only 30 on hand",
  "request_id": "5f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "inventory-items", description = "Item registry, history and corrections"),
        (name = "inventory-entries", description = "Ledger appends"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::inventory_items::list_items,
        crate::handlers::inventory_items::create_item,
        crate::handlers::inventory_items::get_item,
        crate::handlers::inventory_items::correct_entry,
        crate::handlers::inventory_items::get_projection,
        crate::handlers::inventory_items::get_runs,
        crate::handlers::inventory_entries::create_entry,
        crate::health::health_check,
    ),
    components(
        schemas(
            crate::handlers::HistoryEntry,
            crate::handlers::inventory_items::ItemSummary,
            crate::handlers::inventory_items::CreateItemRequest,
            crate::handlers::inventory_items::ItemDetail,
            crate::handlers::inventory_items::CorrectEntryRequest,
            crate::handlers::inventory_items::ProjectionResponse,
            crate::handlers::inventory_items::RunResponse,
            crate::handlers::inventory_entries::CreateEntryRequest,
            crate::health::HealthInfo,
            crate::health::HealthStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_ledger_routes() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Supply Ledger API"));
        assert!(json.contains("/inventory-items/{id}"));
        assert!(json.contains("/inventory-entries"));
        assert!(json.contains("HistoryEntry"));
    }
}
