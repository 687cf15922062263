use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::models::{CreateEquipmentRequest, CreateNodeRequest, Equipment, Node};
use crate::AppState;

use super::{created, ApiError, MessageResponse};

/// List every node in the project
pub async fn list_nodes(State(state): State<Arc<AppState>>) -> Json<Vec<Node>> {
    Json(state.store.nodes().await)
}

/// Get a single node by id
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    let node = state
        .store
        .get_node(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("node not found: {}", id)))?;
    Ok(Json(node))
}

/// Place a new node
pub async fn create_node(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<(axum::http::StatusCode, Json<Node>), ApiError> {
    let node = state.store.add_node(req).await?;
    Ok(created(node))
}

/// Full-record replace of a node
pub async fn update_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut node): Json<Node>,
) -> Result<Json<Node>, ApiError> {
    node.id = id;
    let node = state.store.update_node(node).await?;
    Ok(Json(node))
}

/// Delete a node along with every cable touching it
pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_node(&id).await?;
    Ok(MessageResponse::new("node deleted"))
}

/// Add equipment to a rack-capable node
pub async fn add_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateEquipmentRequest>,
) -> Result<(axum::http::StatusCode, Json<Equipment>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("equipment name is required"));
    }
    let equipment = state.store.add_equipment(&id, req).await?;
    Ok(created(equipment))
}

/// Remove equipment from a node's rack
pub async fn delete_equipment(
    State(state): State<Arc<AppState>>,
    Path((id, equip_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_equipment(&id, &equip_id).await?;
    Ok(MessageResponse::new("equipment deleted"))
}
