use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::continuity::Continuity;
use crate::models::Node;
use crate::AppState;

use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    pub equip_a: String,
    pub port_a: String,
    pub equip_b: String,
    pub port_b: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRequest {
    pub equip_id: String,
    pub port_id: String,
}

/// Cross-connect two ports in the node's rack
pub async fn patch_ports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<Node>, ApiError> {
    let node = Continuity::patch_ports(
        &state.store,
        &id,
        &req.equip_a,
        &req.port_a,
        &req.equip_b,
        &req.port_b,
    )
    .await?;
    Ok(Json(node))
}

/// Disconnect a patched port (and its peer)
pub async fn unpatch_port(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PortRequest>,
) -> Result<Json<Node>, ApiError> {
    let node = Continuity::unpatch_port(&state.store, &id, &req.equip_id, &req.port_id).await?;
    Ok(Json(node))
}

/// Flag a port as faulted
pub async fn report_port(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PortRequest>,
) -> Result<Json<Node>, ApiError> {
    let node = Continuity::report_port(&state.store, &id, &req.equip_id, &req.port_id).await?;
    Ok(Json(node))
}

/// Clear a port fault flag
pub async fn resolve_port_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PortRequest>,
) -> Result<Json<Node>, ApiError> {
    let node =
        Continuity::resolve_port_report(&state.store, &id, &req.equip_id, &req.port_id).await?;
    Ok(Json(node))
}
