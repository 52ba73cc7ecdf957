//! Definición del trait de almacenamiento de imágenes.
//!
//! Abstrae el almacenamiento de objetos donde viven las fotos de los
//! vehículos. Las rutas son relativas al bucket (`autos/<ms>_<nombre>`) y
//! cada objeto tiene una URL pública derivable de su ruta y viceversa.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Error subiendo imagen: {0}")]
    Upload(String),

    #[error("Error eliminando imágenes: {0}")]
    Remove(String),

    #[error("La imagen ya existe: {0}")]
    AlreadyExists(String),

    #[error("Ruta de imagen inválida: {0}")]
    InvalidPath(String),

    #[error("Error de E/S en almacenamiento: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error HTTP con el almacenamiento: {0}")]
    Http(#[from] reqwest::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Nombre corto del backend para logs y health
    fn backend_name(&self) -> &'static str;

    /// Sube un objeto nuevo. Nunca sobrescribe: si la ruta existe devuelve
    /// `StorageError::AlreadyExists`.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// URL pública de una ruta
    fn public_url(&self, path: &str) -> String;

    /// Ruta dentro del bucket para una URL pública de este backend.
    /// `None` si la URL no pertenece a este almacenamiento.
    fn path_from_public_url(&self, url: &str) -> Option<String>;

    /// Elimina varias rutas en una sola operación. Las que no existen se ignoran.
    async fn remove(&self, paths: &[String]) -> StorageResult<()>;
}

/// Rechaza rutas absolutas o con `..`
pub(crate) fn validate_object_path(path: &str) -> StorageResult<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
