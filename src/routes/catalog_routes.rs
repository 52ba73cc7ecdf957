use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::dto::vehicle_dto::{ApiResponse, CatalogQuery};
use crate::services::{CatalogOptions, CatalogVehicle};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_catalog_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_catalog))
        .route("/options", get(catalog_options))
        .route("/:id", get(catalog_detail))
}

async fn list_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<ApiResponse<Vec<CatalogVehicle>>>, AppError> {
    let vehicles = state.catalog.list(&query.into_filters()).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn catalog_options(State(state): State<AppState>) -> Result<Json<ApiResponse<CatalogOptions>>, AppError> {
    Ok(Json(ApiResponse::success(state.catalog.options().await?)))
}

async fn catalog_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CatalogVehicle>>, AppError> {
    Ok(Json(ApiResponse::success(state.catalog.detail(id).await?)))
}
