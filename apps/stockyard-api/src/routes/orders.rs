//! Order endpoints.
//!
//! Every write goes through the order state machine; the handlers only
//! translate JSON.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use stockyard_core::{LineRequest, Order, OrderDetail, OrderStatus, Page, Task};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{Actor, ApiJson, ApiQuery};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_number: String,
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// `POST /orders`
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let detail = state
        .db
        .order_machine()
        .create_order(actor.as_str(), &req.order_number, &req.lines)
        .await?;

    info!(order_id = detail.order.id, actor = %actor.as_str(), "Order created via API");
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /orders?status=&limit=&offset=`
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let page = Page::new(query.limit, query.offset);
    let orders = state.db.orders().list(status, page).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    state
        .db
        .orders()
        .get_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Order not found: {}", id)))
}

/// `PATCH /orders/{id}/status`
pub async fn transition_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Order>> {
    let to: OrderStatus = req.status.parse()?;
    let order = state
        .db
        .order_machine()
        .transition_order_status(actor.as_str(), id, to)
        .await?;
    Ok(Json(order))
}

/// `DELETE /orders/{id}`
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .db
        .order_machine()
        .delete_order(actor.as_str(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /orders/{id}/tasks`
pub async fn order_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.db.tasks().for_order(id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, call, call_anonymous, stock};

    #[tokio::test]
    async fn test_create_order_reserves_and_emits_tasks() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;

        let (status, body) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-1", "lines": [{ "sku": "X", "quantity": 3 }] })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["lines"][0]["quantity"], 3);

        let id = body["id"].as_i64().unwrap();
        let (status, tasks) = call(&router, "GET", &format!("/orders/{}/tasks", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["payload"]["kind"], "pick");

        let (_, item) = call(&router, "GET", "/inventory/X", None).await;
        assert_eq!(item["reserved"], 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_422_with_details() {
        let (db, router) = app().await;
        stock(&db, "X", 100).await;
        stock(&db, "Y", 40).await;

        let (status, body) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({
                "order_number": "SO-2",
                "lines": [{ "sku": "X", "quantity": 10 }, { "sku": "Y", "quantity": 50 }]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
        assert_eq!(body["details"]["sku"], "Y");
        assert_eq!(body["details"]["available"], 40);

        let (_, item) = call(&router, "GET", "/inventory/X", None).await;
        assert_eq!(item["reserved"], 0);
        let (_, orders) = call(&router, "GET", "/orders", None).await;
        assert!(orders.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_actor_is_401() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;

        let (status, body) = call_anonymous(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-3", "lines": [{ "sku": "X", "quantity": 1 }] })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (_db, router) = app().await;

        let (status, body) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-4", "lines": [{ "sku": "X", "quantity": 2.5 }] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_409() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        let body = json!({ "order_number": "SO-5", "lines": [{ "sku": "X", "quantity": 1 }] });

        let (first, _) = call(&router, "POST", "/orders", Some(body.clone())).await;
        let (second, err) = call(&router, "POST", "/orders", Some(body)).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(err["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_ship_then_cancel_is_rejected() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        let (_, order) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-6", "lines": [{ "sku": "X", "quantity": 4 }] })),
        )
        .await;
        let uri = format!("/orders/{}/status", order["id"]);

        let (status, shipped) =
            call(&router, "PATCH", &uri, Some(json!({ "status": "shipped" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(shipped["status"], "shipped");

        let (status, err) =
            call(&router, "PATCH", &uri, Some(json!({ "status": "cancelled" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["code"], "ILLEGAL_STATE_TRANSITION");
        assert_eq!(err["details"]["from"], "shipped");

        let (_, item) = call(&router, "GET", "/inventory/X", None).await;
        assert_eq!(item["on_hand"], 6);
        assert_eq!(item["reserved"], 0);
    }

    #[tokio::test]
    async fn test_unknown_status_is_400() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        let (_, order) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-7", "lines": [{ "sku": "X", "quantity": 1 }] })),
        )
        .await;

        let (status, _) = call(
            &router,
            "PATCH",
            &format!("/orders/{}/status", order["id"]),
            Some(json!({ "status": "teleported" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_releases_and_404s_afterwards() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        let (_, order) = call(
            &router,
            "POST",
            "/orders",
            Some(json!({ "order_number": "SO-8", "lines": [{ "sku": "X", "quantity": 5 }] })),
        )
        .await;
        let uri = format!("/orders/{}", order["id"]);

        let (status, _) = call(&router, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (_, item) = call(&router, "GET", "/inventory/X", None).await;
        assert_eq!(item["reserved"], 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (db, router) = app().await;
        stock(&db, "X", 10).await;
        for n in 1..=2 {
            call(
                &router,
                "POST",
                "/orders",
                Some(json!({ "order_number": format!("SO-L{}", n), "lines": [{ "sku": "X", "quantity": 1 }] })),
            )
            .await;
        }
        call(&router, "PATCH", "/orders/1/status", Some(json!({ "status": "cancelled" }))).await;

        let (_, pending) = call(&router, "GET", "/orders?status=pending", None).await;
        let (_, cancelled) = call(&router, "GET", "/orders?status=cancelled&limit=10", None).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(cancelled.as_array().unwrap().len(), 1);
        assert_eq!(cancelled[0]["order_number"], "SO-L1");
    }
}
