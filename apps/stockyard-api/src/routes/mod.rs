//! Route table and shared request types.

pub mod audit;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod scanner;
pub mod tasks;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use stockyard_core::Page;

use crate::AppState;

/// Builds the router without middleware (tests drive this directly).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Orders
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route(
            "/orders/{id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/orders/{id}/status", patch(orders::transition_status))
        .route("/orders/{id}/tasks", get(orders::order_tasks))
        // Inventory
        .route(
            "/inventory",
            get(inventory::list_items).post(inventory::register_item),
        )
        .route("/inventory/{sku}", get(inventory::get_item))
        .route("/inventory/{sku}/movements", get(inventory::movements))
        .route("/inventory/{sku}/receive", post(inventory::receive_stock))
        .route("/inventory/{sku}/adjust", post(inventory::adjust_stock))
        // Scanner
        .route("/scanner/confirm", post(scanner::confirm))
        .route("/scanner/lookup/{sku}", get(scanner::lookup))
        // Tasks
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task).patch(tasks::update_task))
        .route("/tasks/{id}/assign", post(tasks::assign_task))
        // Audit
        .route("/audit", get(audit::list_entries))
        .route("/audit/anomalies", get(audit::anomalies))
        .with_state(state)
}

/// `?limit=&offset=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}
