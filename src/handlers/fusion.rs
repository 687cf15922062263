use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::continuity::Continuity;
use crate::models::Node;
use crate::AppState;

use super::{ApiError, MessageResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseRequest {
    pub connection_a: String,
    pub fiber_a: u32,
    pub connection_b: String,
    pub fiber_b: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakFusionRequest {
    pub connection_id: String,
    pub fiber_number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdfConnectRequest {
    pub equip_id: String,
    pub odf_port: u32,
    pub connection_id: String,
    pub fiber_number: u32,
}

/// Release an ODF splice from either side: name the panel position
/// (equipId + odfPort) or the strand (connectionId + fiberNumber).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdfDisconnectRequest {
    #[serde(default)]
    pub equip_id: Option<String>,
    #[serde(default)]
    pub odf_port: Option<u32>,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub fiber_number: Option<u32>,
}

/// Splice two strands meeting at this node
pub async fn fuse_fibers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<FuseRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Continuity::fuse_fibers(
        &state.store,
        &id,
        &req.connection_a,
        req.fiber_a,
        &req.connection_b,
        req.fiber_b,
    )
    .await?;
    Ok(MessageResponse::new("fibers fused"))
}

/// Undo a fusion from either side
pub async fn break_fusion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<BreakFusionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    Continuity::break_fusion(&state.store, &id, &req.connection_id, req.fiber_number).await?;
    Ok(MessageResponse::new("fusion removed"))
}

/// Splice a strand onto an ODF panel position
pub async fn connect_odf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OdfConnectRequest>,
) -> Result<Json<Node>, ApiError> {
    let node = Continuity::connect_odf_port(
        &state.store,
        &id,
        &req.equip_id,
        req.odf_port,
        &req.connection_id,
        req.fiber_number,
    )
    .await?;
    Ok(Json(node))
}

/// Release an ODF splice, from the panel or the strand side
pub async fn disconnect_odf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<OdfDisconnectRequest>,
) -> Result<Json<Node>, ApiError> {
    let node = match (&req.equip_id, req.odf_port, &req.connection_id, req.fiber_number) {
        (Some(equip_id), Some(odf_port), _, _) => {
            Continuity::disconnect_odf_port(&state.store, &id, equip_id, odf_port).await?
        }
        (_, _, Some(connection_id), Some(fiber_number)) => {
            Continuity::disconnect_odf_fiber(&state.store, &id, connection_id, fiber_number).await?
        }
        _ => {
            return Err(ApiError::bad_request(
                "provide equipId and odfPort, or connectionId and fiberNumber",
            ))
        }
    };
    Ok(Json(node))
}
