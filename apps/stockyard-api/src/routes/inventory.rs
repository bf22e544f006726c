//! Inventory endpoints: catalogue reads, registration, receipts and
//! cycle-count adjustments.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use stockyard_core::validation::validate_search_query;
use stockyard_core::{InventoryItem, MovementRecord, NewInventoryItem, Page};

use super::PageQuery;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Actor, ApiJson, ApiQuery};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub search: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub counted: i64,
    pub reason: Option<String>,
}

/// `GET /inventory?search=&limit=&offset=`
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListItemsQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let search = validate_search_query(&query.search)?;
    let page = Page::new(query.limit, query.offset);
    Ok(Json(state.db.inventory().list(&search, page).await?))
}

/// `POST /inventory`
pub async fn register_item(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiJson(item): ApiJson<NewInventoryItem>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let item = state
        .db
        .reservations()
        .register_item(actor.as_str(), item)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /inventory/{sku}`
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    state
        .db
        .inventory()
        .get_by_sku(&sku)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("SKU not found: {}", sku)))
}

/// `GET /inventory/{sku}/movements`
pub async fn movements(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<MovementRecord>>> {
    Ok(Json(state.db.inventory().movements(&sku, query.page()).await?))
}

/// `POST /inventory/{sku}/receive`
pub async fn receive_stock(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(sku): Path<String>,
    ApiJson(req): ApiJson<ReceiveRequest>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .db
        .reservations()
        .receive_stock(actor.as_str(), &sku, req.quantity)
        .await?;
    Ok(Json(item))
}

/// `POST /inventory/{sku}/adjust`
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(sku): Path<String>,
    ApiJson(req): ApiJson<AdjustRequest>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .db
        .reservations()
        .adjust_stock(actor.as_str(), &sku, req.counted, req.reason.as_deref())
        .await?;
    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, call, stock};

    #[tokio::test]
    async fn test_register_and_search() {
        let (_db, router) = app().await;

        let (status, item) = call(
            &router,
            "POST",
            "/inventory",
            Some(json!({ "sku": "BOLT-M8", "product_name": "Hex bolt M8", "on_hand": 25 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["on_hand"], 25);
        assert_eq!(item["reserved"], 0);

        let (_, found) = call(&router, "GET", "/inventory?search=bolt", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);

        let (_, none) = call(&router, "GET", "/inventory?search=washer", None).await;
        assert!(none.as_array().unwrap().is_empty());

        let (status, _) = call(
            &router,
            "POST",
            "/inventory",
            Some(json!({ "sku": "BOLT-M8", "product_name": "Again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_overlong_search_is_400() {
        let (_db, router) = app().await;
        let uri = format!("/inventory?search={}", "a".repeat(101));
        let (status, body) = call(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["field"], "query");
    }

    #[tokio::test]
    async fn test_unknown_sku_is_404() {
        let (_db, router) = app().await;
        let (status, body) = call(&router, "GET", "/inventory/NOPE", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = call(
            &router,
            "POST",
            "/inventory/NOPE/receive",
            Some(json!({ "quantity": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_receive_and_movements() {
        let (db, router) = app().await;
        stock(&db, "X", 0).await;

        let (status, item) = call(
            &router,
            "POST",
            "/inventory/X/receive",
            Some(json!({ "quantity": 12 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["on_hand"], 12);

        let (_, moves) = call(&router, "GET", "/inventory/X/movements", None).await;
        assert_eq!(moves.as_array().unwrap().len(), 1);
        assert_eq!(moves[0]["movement_type"], "inbound");
        assert_eq!(moves[0]["actor"], "clerk-1");
    }

    #[tokio::test]
    async fn test_adjust_below_reserved_is_rejected() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-A", "lines": [{ "sku": "X", "quantity": 6 }] })),
        )
        .await;

        let (status, _) = call(
            &router,
            "POST",
            "/inventory/X/adjust",
            Some(json!({ "counted": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, item) = call(
            &router,
            "POST",
            "/inventory/X/adjust",
            Some(json!({ "counted": 8, "reason": "shelf recount" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["on_hand"], 8);
        assert_eq!(item["reserved"], 6);
    }
}
