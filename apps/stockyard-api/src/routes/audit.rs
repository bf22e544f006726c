//! Audit trail reads.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use stockyard_core::{AuditEntity, AuditEntry, Page};

use super::PageQuery;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListAuditQuery {
    pub entity_type: Option<AuditEntity>,
    pub entity_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// `GET /audit?entity_type=&entity_id=&limit=&offset=`
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListAuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let page = Page::new(query.limit, query.offset);
    let entries = state
        .db
        .audit()
        .list(query.entity_type, query.entity_id.as_deref(), page)
        .await?;
    Ok(Json(entries))
}

/// `GET /audit/anomalies` - cancellations and deletions after stock left the shelf.
pub async fn anomalies(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    Ok(Json(state.db.audit().anomalies(query.page()).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, call, stock};

    #[tokio::test]
    async fn test_cancel_after_pick_shows_as_anomaly() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        let (_, order) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-AU", "lines": [{ "sku": "X", "quantity": 2 }] })),
        )
        .await;
        call(
            &router,
            "POST",
            "/scanner/confirm",
            Some(json!({ "sku": "X", "quantity": 2, "action": "pick", "order_id": order["id"] })),
        )
        .await;
        let (status, _) = call(
            &router,
            "PATCH",
            &format!("/orders/{}/status", order["id"]),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, anomalies) = call(&router, "GET", "/audit/anomalies", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(anomalies.as_array().unwrap().len(), 1);
        assert_eq!(anomalies[0]["action"], "order_cancelled_after_pick");
        assert_eq!(anomalies[0]["actor"], "clerk-1");

        let uri = format!("/audit?entity_type=order&entity_id={}", order["id"]);
        let (_, entries) = call(&router, "GET", &uri, None).await;
        assert!(entries.as_array().unwrap().len() >= 3);

        let (_, item) = call(&router, "GET", "/inventory/X", None).await;
        assert_eq!(item["on_hand"], 8);
    }

    #[tokio::test]
    async fn test_bad_entity_filter_is_400() {
        let (_db, router) = app().await;
        let (status, _) = call(&router, "GET", "/audit?entity_type=warehouse", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
