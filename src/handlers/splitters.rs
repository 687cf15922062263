use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::continuity::Continuity;
use crate::models::{CreateSplitterRequest, Splitter};
use crate::AppState;

use super::{created, ApiError, MessageResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutputRequest {
    pub output_port: u32,
    pub connection_id: String,
    pub fiber_number: u32,
}

/// Provision a splitter on a MUFLA/NAP node
pub async fn add_splitter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateSplitterRequest>,
) -> Result<(axum::http::StatusCode, Json<Splitter>), ApiError> {
    let splitter = Continuity::add_splitter(&state.store, &id, req).await?;
    Ok(created(splitter))
}

/// Remove a splitter, freeing its input strand
pub async fn delete_splitter(
    State(state): State<Arc<AppState>>,
    Path((id, splitter_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    Continuity::delete_splitter(&state.store, &id, &splitter_id).await?;
    Ok(MessageResponse::new("splitter deleted"))
}

/// Wire a splitter output port to an outgoing strand
pub async fn connect_output(
    State(state): State<Arc<AppState>>,
    Path((id, splitter_id)): Path<(String, String)>,
    Json(req): Json<ConnectOutputRequest>,
) -> Result<Json<Splitter>, ApiError> {
    let splitter = Continuity::connect_splitter_output(
        &state.store,
        &id,
        &splitter_id,
        req.output_port,
        &req.connection_id,
        req.fiber_number,
    )
    .await?;
    Ok(Json(splitter))
}
