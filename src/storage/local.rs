//! Almacenamiento local en disco.
//!
//! Guarda los objetos bajo un directorio raíz conservando la ruta del bucket
//! y los publica a través de `ServeDir` en `/media`.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::backend::{validate_object_path, ImageStorage, StorageError, StorageResult};

pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    /// `public_base` es la URL bajo la que se sirve `root`, p. ej. `http://localhost:3000/media`
    pub fn new(root: PathBuf, public_base: impl Into<String>) -> Self {
        Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, path: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        let full_path = self.object_path(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(path.to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!("💾 Imagen guardada en {}", full_path.display());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }

    fn path_from_public_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            validate_object_path(path)?;
            match fs::remove_file(self.object_path(path)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::Remove(format!("{}: {}", path, e))),
            }
        }
        Ok(())
    }
}
