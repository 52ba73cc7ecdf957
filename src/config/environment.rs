//! Configuración de variables de entorno
//!
//! Este módulo lee la configuración del servicio desde el entorno. La lectura
//! pasa por `from_lookup` para poder probarla sin tocar variables globales.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::storage::{StorageConfig, StorageType, SupabaseConfig};

pub const DEFAULT_BUCKET: &str = "escuderia-autos";
pub const DEFAULT_PREFIX: &str = "autos";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Sin URL se usa el almacén en memoria
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = match var("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("PORT inválido: {}", raw))?,
            None => 3000,
        };

        let run_migrations = match var("RUN_MIGRATIONS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| anyhow!("RUN_MIGRATIONS inválido: {}", raw))?,
            None => false,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES inválido: {}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let prefix = var("STORAGE_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let storage_type = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => {
                let public_base = var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}", port));
                StorageType::Local {
                    path: PathBuf::from(var("LOCAL_STORAGE_PATH").unwrap_or_else(|| "./data/media".to_string())),
                    public_base: format!("{}/media", public_base.trim_end_matches('/')),
                }
            }
            "supabase" => StorageType::Supabase(SupabaseConfig {
                url: var("SUPABASE_URL").ok_or_else(|| anyhow!("SUPABASE_URL es obligatorio con STORAGE_BACKEND=supabase"))?,
                service_key: var("SUPABASE_SERVICE_ROLE")
                    .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE es obligatorio con STORAGE_BACKEND=supabase"))?,
                bucket: var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            }),
            other => return Err(anyhow!("STORAGE_BACKEND desconocido: {}", other)),
        };

        Ok(Self {
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            port,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            cors_origins: var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            database_url: var("DATABASE_URL"),
            run_migrations,
            storage: StorageConfig { storage_type, prefix },
            max_upload_bytes,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "si" | "sí" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
