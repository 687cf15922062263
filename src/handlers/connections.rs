use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::models::{Connection, CreateConnectionRequest};
use crate::AppState;

use super::{created, ApiError, MessageResponse};

/// List every cable in the project
pub async fn list_connections(State(state): State<Arc<AppState>>) -> Json<Vec<Connection>> {
    Json(state.store.connections().await)
}

/// Get a single cable by id
pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Connection>, ApiError> {
    let conn = state
        .store
        .get_connection(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("connection not found: {}", id)))?;
    Ok(Json(conn))
}

/// Trace a new cable between two nodes
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConnectionRequest>,
) -> Result<(axum::http::StatusCode, Json<Connection>), ApiError> {
    let conn = state.store.add_connection(req).await?;
    Ok(created(conn))
}

/// Full-record replace of a cable
pub async fn update_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut conn): Json<Connection>,
) -> Result<Json<Connection>, ApiError> {
    conn.id = id;
    let conn = state.store.update_connection(conn).await?;
    Ok(Json(conn))
}

/// Delete a cable. Terminations pointing at it are the caller's business;
/// anything left dangling is repaired by the integrity pass on next load.
pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_connection(&id).await?;
    Ok(MessageResponse::new("connection deleted"))
}
