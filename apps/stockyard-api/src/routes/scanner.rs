//! Handheld scanner endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use stockyard_core::{ScanAction, ScanConfirmation, ScanLookup};

use crate::error::ApiResult;
use crate::extract::{Actor, ApiJson};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub sku: String,
    pub quantity: i64,
    pub action: ScanAction,
    #[serde(default)]
    pub order_id: Option<i64>,
}

/// `POST /scanner/confirm`
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiJson(req): ApiJson<ScanRequest>,
) -> ApiResult<Json<ScanConfirmation>> {
    let confirmation = state
        .db
        .scanner()
        .record_scan_event(actor.as_str(), &req.sku, req.quantity, req.action, req.order_id)
        .await?;
    Ok(Json(confirmation))
}

/// `GET /scanner/lookup/{sku}`
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> ApiResult<Json<ScanLookup>> {
    Ok(Json(state.db.scanner().lookup(&sku).await?))
}
