use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::impact::{DownstreamImpact, ImpactAnalyzer};
use crate::AppState;

use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortImpactQuery {
    pub port_id: String,
}

#[derive(Serialize)]
pub struct ConnectivityResponse {
    pub connected: bool,
}

#[derive(Serialize)]
pub struct ActiveResponse {
    pub active: bool,
}

/// Downstream impact of a fault at this node
pub async fn downstream_impact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownstreamImpact>, ApiError> {
    let impact = ImpactAnalyzer::downstream_impact(&state.store, &id).await?;
    Ok(Json(impact))
}

/// Whether the node can reach an upstream provider router
pub async fn provider_connectivity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConnectivityResponse>, ApiError> {
    let connected = ImpactAnalyzer::check_provider_connectivity(&state.store, &id).await?;
    Ok(Json(ConnectivityResponse { connected }))
}

/// Derived per call: does the node currently have an active connection
pub async fn active_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActiveResponse>, ApiError> {
    let active = ImpactAnalyzer::has_active_connection(&state.store, &id).await?;
    Ok(Json(ActiveResponse { active }))
}

/// Impact of a fault on one rack port
pub async fn port_impact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PortImpactQuery>,
) -> Result<Json<DownstreamImpact>, ApiError> {
    let impact =
        ImpactAnalyzer::propagate_port_failure(&state.store, &id, &query.port_id).await?;
    Ok(Json(impact))
}
