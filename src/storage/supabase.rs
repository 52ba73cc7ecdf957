//! Almacenamiento en Supabase Storage vía su API REST.
//!
//! - subida: `POST /storage/v1/object/{bucket}/{ruta}` con `x-upsert: false`
//! - borrado: `DELETE /storage/v1/object/{bucket}` con `{"prefixes": [...]}`
//! - URL pública: `/storage/v1/object/public/{bucket}/{ruta}`

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::backend::{validate_object_path, ImageStorage, StorageError, StorageResult};
use crate::utils::errors::message_from_value;

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig) -> StorageResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key,
            bucket: config.bucket,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_path(path)
        )
    }

    fn public_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket)
    }

    async fn error_text(response: Response) -> String {
        let status = response.status();
        match response.json::<Value>().await {
            Ok(body) => message_from_value(&body),
            Err(_) => format!("HTTP {}", status),
        }
    }
}

/// Codifica cada segmento de la ruta por separado para conservar los `/`
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ImageStorage for SupabaseStorage {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        debug!("☁️ Subiendo {} bytes a {}/{}", data.len(), self.bucket, path);

        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .header("content-type", content_type)
            .body(data)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let message = Self::error_text(response).await;
        error!("❌ Supabase rechazó la subida de {} ({}): {}", path, status, message);
        if status == StatusCode::CONFLICT || message.contains("Duplicate") || message.contains("already exists") {
            Err(StorageError::AlreadyExists(path.to_string()))
        } else {
            Err(StorageError::Upload(message))
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_prefix(), encode_path(path))
    }

    fn path_from_public_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_prefix())?;
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        if rest.is_empty() {
            return None;
        }
        urlencoding::decode(rest).ok().map(|decoded| decoded.into_owned())
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        for path in paths {
            validate_object_path(path)?;
        }

        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(StorageError::Remove(Self::error_text(response).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new(SupabaseConfig {
            url: "https://abc.supabase.co/".to_string(),
            service_key: "service-key".to_string(),
            bucket: "escuderia-autos".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_public_url_round_trip() {
        let storage = storage();
        let url = storage.public_url("autos/1700000000000_mi foto.jpg");
        assert_eq!(
            url,
            "https://abc.supabase.co/storage/v1/object/public/escuderia-autos/autos/1700000000000_mi%20foto.jpg"
        );
        assert_eq!(
            storage.path_from_public_url(&url),
            Some("autos/1700000000000_mi foto.jpg".to_string())
        );
    }

    #[test]
    fn test_foreign_urls_are_not_mapped() {
        let storage = storage();
        assert_eq!(
            storage.path_from_public_url("https://abc.supabase.co/storage/v1/object/public/otro-bucket/autos/a.jpg"),
            None
        );
        assert_eq!(storage.path_from_public_url("/placeholder.png"), None);
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let storage = storage();
        assert_eq!(
            storage.object_url("autos/a b.jpg"),
            "https://abc.supabase.co/storage/v1/object/escuderia-autos/autos/a%20b.jpg"
        );
    }
}
