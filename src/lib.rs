//! Dealership Catalog
//!
//! Backend del inventario de vehículos del concesionario: panel de
//! administración (borrador, imágenes, ventas) y catálogo público.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use middleware::cors::cors_layer;
use state::AppState;
use storage::StorageType;

/// Router completo de la aplicación
pub fn build_app(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .nest("/api/admin", routes::vehicle_routes::create_admin_router())
        .nest("/api/catalog", routes::catalog_routes::create_catalog_router());

    // Con almacenamiento local las imágenes se sirven desde el propio servicio
    if let StorageType::Local { path, .. } = &state.config.storage.storage_type {
        app = app.nest_service("/media", ServeDir::new(path));
    }

    app.layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store": state.store_backend(),
        "storage": state.storage_backend(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
