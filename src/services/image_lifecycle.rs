//! Ciclo de vida de las imágenes de un vehículo
//!
//! Reconciliación al guardar: sube los archivos nuevos, concatena sus URLs a
//! las existentes y codifica el campo `imagenes`. Los borrados pendientes se
//! aplican solo después de que el registro se guardó.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::draft::{ImageSet, PendingImage};
use crate::models::{DraftMode, VehicleRecord};
use crate::storage::ImageStorage;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::image_field::{decode_optional, encode_image_field};

pub const MISSING_IMAGES_MESSAGE: &str = "Debes subir al menos una imagen del vehículo.";

/// Resultado de la reconciliación, listo para el registro
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledImages {
    /// Valor codificado del campo; `None` cuando no queda ninguna imagen
    pub field: Option<String>,
    /// Rutas subidas en este guardado, para compensar si falla el registro
    pub uploaded_paths: Vec<String>,
}

/// Nombre de archivo apto para una ruta de objeto.
///
/// Los espacios pasan a `_` y se descarta todo lo que no sea
/// `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let sanitized: String = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "imagen".to_string()
    } else {
        sanitized
    }
}

pub struct ImageLifecycleService {
    storage: Arc<dyn ImageStorage>,
    prefix: String,
}

impl ImageLifecycleService {
    pub fn new(storage: Arc<dyn ImageStorage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn storage_backend(&self) -> &'static str {
        self.storage.backend_name()
    }

    /// `<prefijo>/<ms>_<índice>_<nombre>`; el índice evita colisiones dentro de un lote
    pub fn object_path(&self, epoch_ms: i64, index: usize, file_name: &str) -> String {
        let name = format!("{}_{}_{}", epoch_ms, index, sanitize_file_name(file_name));
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    /// Convierte el conjunto de imágenes del borrador en el valor del campo.
    ///
    /// Una creación sin ninguna imagen falla con `Validation` antes de tocar
    /// la red. Si alguna subida del lote falla, las hermanas ya subidas se
    /// eliminan y se devuelve el error de almacenamiento.
    pub async fn reconcile_on_save(&self, images: &ImageSet, mode: DraftMode) -> AppResult<ReconciledImages> {
        if mode == DraftMode::Creating && images.total_images() == 0 {
            return Err(AppError::Validation(MISSING_IMAGES_MESSAGE.to_string()));
        }

        let uploaded = self.upload_batch(&images.new_files).await?;

        let mut urls = images.existing_urls.clone();
        urls.extend(uploaded.iter().map(|path| self.storage.public_url(path)));

        let field = if urls.is_empty() {
            None
        } else {
            Some(encode_image_field(&urls))
        };

        debug!(
            "Imágenes reconciliadas: {} existentes + {} nuevas",
            images.existing_urls.len(),
            uploaded.len()
        );

        Ok(ReconciledImages {
            field,
            uploaded_paths: uploaded,
        })
    }

    async fn upload_batch(&self, files: &[PendingImage]) -> AppResult<Vec<String>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let epoch_ms = Utc::now().timestamp_millis();
        let uploads = files.iter().enumerate().map(|(index, file)| {
            let path = self.object_path(epoch_ms, index, &file.file_name);
            async move {
                let result = self
                    .storage
                    .upload(&path, file.data.clone(), &file.content_type)
                    .await;
                (path, result)
            }
        });

        let mut succeeded = Vec::with_capacity(files.len());
        let mut first_error = None;
        for (path, result) in join_all(uploads).await {
            match result {
                Ok(()) => succeeded.push(path),
                Err(e) => {
                    warn!("❌ Falló la subida de {}: {}", path, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            self.compensate(&succeeded).await;
            return Err(err.into());
        }

        info!("📤 {} imágenes subidas", succeeded.len());
        Ok(succeeded)
    }

    /// Elimina objetos recién subidos cuyo guardado no llegó a completarse
    pub async fn compensate(&self, paths: &[String]) {
        if paths.is_empty() {
            return;
        }
        match self.storage.remove(paths).await {
            Ok(()) => info!("↩️ Compensadas {} imágenes huérfanas", paths.len()),
            Err(e) => warn!("⚠️ No se pudieron compensar {} imágenes: {}", paths.len(), e),
        }
    }

    /// Borra del almacenamiento las URLs marcadas para eliminación.
    ///
    /// Nunca falla: los errores quedan en el log.
    pub async fn purge_deleted(&self, urls: &[String]) {
        if urls.is_empty() {
            return;
        }

        let mut paths = Vec::with_capacity(urls.len());
        for url in urls {
            match self.storage.path_from_public_url(url) {
                Some(path) => paths.push(path),
                None => warn!("⚠️ URL ajena al almacenamiento, no se elimina: {}", url),
            }
        }
        if paths.is_empty() {
            return;
        }

        match self.storage.remove(&paths).await {
            Ok(()) => info!("🗑️ {} imágenes eliminadas del almacenamiento", paths.len()),
            Err(e) => warn!("⚠️ Error eliminando imágenes (se ignora): {}", e),
        }
    }

    /// Borra todas las imágenes de un registro eliminado
    pub async fn delete_record_images(&self, record: &VehicleRecord) {
        let urls = decode_optional(record.imagenes.as_deref());
        self.purge_deleted(&urls).await;
    }
}
