use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::continuity::Continuity;
use crate::models::{CreateReportRequest, DamageReport};
use crate::AppState;

use super::{created, ApiError};

/// List a node's damage reports
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DamageReport>>, ApiError> {
    let node = state
        .store
        .get_node(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("node not found: {}", id)))?;
    Ok(Json(node.damage_reports))
}

/// File a damage report against a node
pub async fn add_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(axum::http::StatusCode, Json<DamageReport>), ApiError> {
    let report = Continuity::add_damage_report(&state.store, &id, req.description).await?;
    Ok(created(report))
}

/// Resolve a damage report, stamping its resolution time
pub async fn resolve_report(
    State(state): State<Arc<AppState>>,
    Path((id, report_id)): Path<(String, String)>,
) -> Result<Json<DamageReport>, ApiError> {
    let report = Continuity::resolve_damage_report(&state.store, &id, &report_id).await?;
    Ok(Json(report))
}
