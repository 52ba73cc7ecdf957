//! Almacenamiento de imágenes.
//!
//! Capa intercambiable para las fotos de los vehículos:
//! - disco local (desarrollo y tests)
//! - Supabase Storage (producción)

mod backend;
mod local;
mod supabase;

pub use backend::{ImageStorage, StorageError, StorageResult};
pub use local::LocalStorage;
pub use supabase::{SupabaseConfig, SupabaseStorage};

use std::path::PathBuf;
use std::sync::Arc;

/// Backend de almacenamiento seleccionado por configuración
#[derive(Debug, Clone)]
pub enum StorageType {
    Local { path: PathBuf, public_base: String },
    Supabase(SupabaseConfig),
}

/// Configuración de almacenamiento
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub storage_type: StorageType,
    /// Prefijo de todas las rutas dentro del bucket, p. ej. `autos`
    pub prefix: String,
}

impl StorageConfig {
    pub fn build(&self) -> StorageResult<Arc<dyn ImageStorage>> {
        match &self.storage_type {
            StorageType::Local { path, public_base } => {
                std::fs::create_dir_all(path)?;
                Ok(Arc::new(LocalStorage::new(path.clone(), public_base.clone())))
            }
            StorageType::Supabase(config) => Ok(Arc::new(SupabaseStorage::new(config.clone())?)),
        }
    }
}
