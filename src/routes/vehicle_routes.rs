use axum::{
    extract::{Multipart, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use validator::Validate;

use crate::controllers::ControllerState;
use crate::dto::vehicle_dto::{
    ApiResponse, DraftSnapshot, InventoryQuery, SoldQuery, SubmitResponse, UploadResponse,
};
use crate::models::draft::PendingImage;
use crate::models::{VehicleDraft, VehicleRecord};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Campo multipart con los archivos del formulario
pub const FILES_FIELD: &str = "files";

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_inventory))
        .route("/vehicles/sold", get(list_sold))
        .route("/vehicles/:id", delete(delete_vehicle))
        .route("/vehicles/:id/sold", post(mark_as_sold))
        .route("/vehicles/:id/edit", post(start_edit))
        .route("/draft", get(get_draft).put(update_draft).delete(clear_draft))
        .route("/draft/images", post(upload_images))
        .route("/draft/images/new/:index", delete(remove_new_image))
        .route("/draft/images/existing/:index", delete(remove_existing_image))
        .route("/draft/submit", post(submit_draft))
        .route("/state", get(get_state))
        .route("/notifications", get(notifications))
}

async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<ApiResponse<Vec<VehicleRecord>>>, AppError> {
    let vehicles = if query.all {
        state.vehicles.fetch_all().await?
    } else if query.refresh {
        state.controller.load_inventory().await?
    } else {
        state.controller.inventory().await
    };
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn list_sold(
    State(state): State<AppState>,
    Query(query): Query<SoldQuery>,
) -> Result<Json<ApiResponse<Vec<VehicleRecord>>>, AppError> {
    query.validate()?;
    let vehicles = state.controller.load_sold(query.month, query.year).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<i64>>, AppError> {
    state.controller.delete(id).await?;
    Ok(Json(ApiResponse::success_with_message(id, "Vehículo eliminado.")))
}

async fn mark_as_sold(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<VehicleRecord>>, AppError> {
    let vehicle = state.controller.mark_as_sold(id).await?;
    Ok(Json(ApiResponse::success_with_message(
        vehicle,
        "Vehículo marcado como vendido.",
    )))
}

async fn start_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DraftSnapshot>>, AppError> {
    let session = state.controller.start_edit_by_id(id).await?;
    Ok(Json(ApiResponse::success(DraftSnapshot::from(&session))))
}

async fn get_draft(State(state): State<AppState>) -> Json<ApiResponse<DraftSnapshot>> {
    let session = state.controller.session().await;
    Json(ApiResponse::success(DraftSnapshot::from(&session)))
}

async fn update_draft(
    State(state): State<AppState>,
    Json(draft): Json<VehicleDraft>,
) -> Result<Json<ApiResponse<DraftSnapshot>>, AppError> {
    let session = state.controller.update_draft(draft).await?;
    Ok(Json(ApiResponse::success(DraftSnapshot::from(&session))))
}

async fn clear_draft(State(state): State<AppState>) -> Result<Json<ApiResponse<DraftSnapshot>>, AppError> {
    state.controller.clear_form().await?;
    let session = state.controller.session().await;
    Ok(Json(ApiResponse::success(DraftSnapshot::from(&session))))
}

async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Formulario multipart inválido: {}", e)))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("imagen").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "El archivo {} no es una imagen ({})",
                file_name, content_type
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("No se pudo leer {}: {}", file_name, e)))?;
        if data.is_empty() {
            warn!("⚠️ Archivo vacío ignorado: {}", file_name);
            continue;
        }

        debug!("📎 Archivo recibido: {} ({} bytes)", file_name, data.len());
        files.push(PendingImage::new(file_name, content_type, data));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No se recibieron imágenes en el campo '{}'",
            FILES_FIELD
        )));
    }

    let added = files.len();
    let total_images = state.controller.add_files(files).await?;
    Ok(Json(ApiResponse::success(UploadResponse { added, total_images })))
}

async fn remove_new_image(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ApiResponse<DraftSnapshot>>, AppError> {
    state
        .controller
        .remove_new_file(index)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No hay imagen nueva en la posición {}", index)))?;
    let session = state.controller.session().await;
    Ok(Json(ApiResponse::success(DraftSnapshot::from(&session))))
}

async fn remove_existing_image(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ApiResponse<DraftSnapshot>>, AppError> {
    state
        .controller
        .remove_existing_url(index)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No hay imagen guardada en la posición {}", index)))?;
    let session = state.controller.session().await;
    Ok(Json(ApiResponse::success(DraftSnapshot::from(&session))))
}

async fn submit_draft(State(state): State<AppState>) -> Result<Json<ApiResponse<SubmitResponse>>, AppError> {
    let outcome = state.controller.submit().await?;
    Ok(Json(ApiResponse::success(SubmitResponse::from(outcome))))
}

async fn get_state(State(state): State<AppState>) -> Json<ApiResponse<ControllerState>> {
    Json(ApiResponse::success(state.controller.state().await))
}

async fn notifications(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.controller.notifications().subscribe();

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => match Event::default().event("notification").json_data(&notification) {
                    Ok(event) => return Some((Ok(event), receiver)),
                    Err(e) => warn!("⚠️ Notificación no serializable: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Cliente SSE atrasado, {} notificaciones descartadas", skipped)
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
