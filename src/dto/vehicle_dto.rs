use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::controllers::SubmitOutcome;
use crate::models::draft::PendingImage;
use crate::models::{DraftMode, DraftSession, VehicleDraft, VehicleRecord};
use crate::services::catalog_service::{CatalogFilters, CatalogSort};
use crate::utils::parsing::{parse_non_negative_int, parse_price};

// Envoltorio común de respuestas
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

// Query del inventario
#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub refresh: bool,
    /// Incluye vendidos, leídos directamente del almacén
    #[serde(default)]
    pub all: bool,
}

// Query de vendidos; sin valores se conserva el filtro actual
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SoldQuery {
    #[validate(range(min = 1, max = 12, message = "El mes debe estar entre 1 y 12"))]
    pub month: Option<u32>,
    #[validate(range(min = 1900, max = 2100, message = "El año debe estar entre 1900 y 2100"))]
    pub year: Option<i32>,
}

// Query del catálogo público; los números llegan como texto libre
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_year: Option<String>,
    pub max_year: Option<String>,
    pub min_km: Option<String>,
    pub max_km: Option<String>,
    pub sort: Option<String>,
}

impl CatalogQuery {
    pub fn into_filters(self) -> CatalogFilters {
        let int = |value: &Option<String>| value.as_deref().and_then(parse_non_negative_int);
        let price = |value: &Option<String>| value.as_deref().and_then(parse_price);

        CatalogFilters {
            min_price: price(&self.min_price),
            max_price: price(&self.max_price),
            min_year: int(&self.min_year),
            max_year: int(&self.max_year),
            min_km: int(&self.min_km),
            max_km: int(&self.max_km),
            sort: self
                .sort
                .as_deref()
                .and_then(CatalogSort::from_query)
                .unwrap_or_default(),
            make: self.make,
            model: self.model,
        }
    }
}

// Archivo pendiente de subir, sin el contenido
#[derive(Debug, Clone, Serialize)]
pub struct PendingFileInfo {
    pub index: usize,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

// Estado del formulario para el panel
#[derive(Debug, Clone, Serialize)]
pub struct DraftSnapshot {
    pub mode: &'static str,
    pub edit_id: Option<i64>,
    pub draft: VehicleDraft,
    pub existing_urls: Vec<String>,
    pub new_files: Vec<PendingFileInfo>,
    pub pending_deletion: Vec<String>,
    pub total_images: usize,
}

impl From<&DraftSession> for DraftSnapshot {
    fn from(session: &DraftSession) -> Self {
        Self {
            mode: match session.mode() {
                DraftMode::Creating => "creating",
                DraftMode::Editing(_) => "editing",
            },
            edit_id: session.edit_id,
            draft: session.draft.clone(),
            existing_urls: session.images.existing_urls.clone(),
            new_files: session
                .images
                .new_files
                .iter()
                .enumerate()
                .map(|(index, file)| PendingFileInfo::from_pending(index, file))
                .collect(),
            pending_deletion: session.images.pending_deletion.clone(),
            total_images: session.images.total_images(),
        }
    }
}

impl PendingFileInfo {
    fn from_pending(index: usize, file: &PendingImage) -> Self {
        Self {
            index,
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            size: file.data.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub added: usize,
    pub total_images: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub skipped: bool,
    pub action: Option<&'static str>,
    pub vehicle: Option<VehicleRecord>,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Skipped => Self {
                skipped: true,
                action: None,
                vehicle: None,
            },
            SubmitOutcome::Created(vehicle) => Self {
                skipped: false,
                action: Some("created"),
                vehicle: Some(vehicle),
            },
            SubmitOutcome::Updated(vehicle) => Self {
                skipped: false,
                action: Some("updated"),
                vehicle: Some(vehicle),
            },
        }
    }
}
