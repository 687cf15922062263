use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        // Node routes
        .route("/api/nodes", get(handlers::nodes::list_nodes))
        .route("/api/nodes", post(handlers::nodes::create_node))
        .route("/api/nodes/:id", get(handlers::nodes::get_node))
        .route("/api/nodes/:id", put(handlers::nodes::update_node))
        .route("/api/nodes/:id", delete(handlers::nodes::delete_node))
        .route("/api/nodes/:id/equipment", post(handlers::nodes::add_equipment))
        .route("/api/nodes/:id/equipment/:equip_id", delete(handlers::nodes::delete_equipment))
        // Connection routes
        .route("/api/connections", get(handlers::connections::list_connections))
        .route("/api/connections", post(handlers::connections::create_connection))
        .route("/api/connections/:id", get(handlers::connections::get_connection))
        .route("/api/connections/:id", put(handlers::connections::update_connection))
        .route("/api/connections/:id", delete(handlers::connections::delete_connection))
        // Rack patch routes
        .route("/api/nodes/:id/patches", post(handlers::rack::patch_ports))
        .route("/api/nodes/:id/patches", delete(handlers::rack::unpatch_port))
        .route("/api/nodes/:id/ports/report", post(handlers::rack::report_port))
        .route("/api/nodes/:id/ports/resolve", post(handlers::rack::resolve_port_report))
        // Splitter routes
        .route("/api/nodes/:id/splitters", post(handlers::splitters::add_splitter))
        .route("/api/nodes/:id/splitters/:splitter_id", delete(handlers::splitters::delete_splitter))
        .route("/api/nodes/:id/splitters/:splitter_id/outputs", post(handlers::splitters::connect_output))
        // Fusion routes
        .route("/api/nodes/:id/fusions", post(handlers::fusion::fuse_fibers))
        .route("/api/nodes/:id/fusions", delete(handlers::fusion::break_fusion))
        .route("/api/nodes/:id/odf", post(handlers::fusion::connect_odf))
        .route("/api/nodes/:id/odf", delete(handlers::fusion::disconnect_odf))
        // Damage report routes
        .route("/api/nodes/:id/reports", get(handlers::reports::list_reports))
        .route("/api/nodes/:id/reports", post(handlers::reports::add_report))
        .route("/api/nodes/:id/reports/:report_id/resolve", post(handlers::reports::resolve_report))
        // Impact routes
        .route("/api/nodes/:id/impact", get(handlers::impact::downstream_impact))
        .route("/api/nodes/:id/connectivity", get(handlers::impact::provider_connectivity))
        .route("/api/nodes/:id/active", get(handlers::impact::active_connection))
        .route("/api/nodes/:id/port-impact", get(handlers::impact::port_impact))
        // Health
        .route("/healthz", get(handlers::healthcheck))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
