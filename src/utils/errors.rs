//! Sistema de manejo de errores
//!
//! Este módulo define los tipos de errores del sistema, su conversión a
//! respuestas HTTP y el normalizador de mensajes que se muestran al usuario.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// Mensaje cuando no se puede extraer nada legible de un error
pub const UNKNOWN_ERROR_MESSAGE: &str = "Ocurrió un error desconocido.";

/// Mensaje cuando el error trae un campo `message` vacío
pub const EMPTY_ERROR_MESSAGE: &str = "Error con mensaje vacío.";

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    /// Campo requerido ausente o inválido; se aborta antes de cualquier I/O
    #[error("{0}")]
    Validation(String),

    #[error("Datos inválidos: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    /// Fallo de subida/borrado en el almacenamiento de imágenes
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Escritura rechazada por la base de datos o sin fila devuelta
    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Registro no encontrado".to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Conflict(format!("Registro duplicado: {}", db.message()))
            }
            other => AppError::Persistence(other.to_string()),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error", "VALIDATION_ERROR"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Validation Error", "VALIDATION_ERROR"),
            AppError::Storage(_) => (StatusCode::BAD_GATEWAY, "Storage Error", "STORAGE_ERROR"),
            AppError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Persistence Error", "PERSISTENCE_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found", "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", "CONFLICT"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request", "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, code) = self.status_and_code();
        if status.is_server_error() {
            error!("❌ {}: {}", error, self);
        }

        let details = match &self {
            AppError::InvalidInput(errors) => Some(json!(errors)),
            _ => None,
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message: user_message(&self),
            details,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Convierte cualquier error de la aplicación en un texto apto para el usuario
pub fn user_message(err: &AppError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        EMPTY_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// Extrae un mensaje legible de un cuerpo de error JSON de un servicio externo.
///
/// Acepta cadenas, objetos con `message`/`error`/`msg` y cae a un mensaje
/// genérico para cualquier otra forma.
pub fn message_from_value(value: &Value) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Object(map) => {
            for key in ["message", "error", "msg"] {
                match map.get(key) {
                    Some(Value::String(s)) if s.trim().is_empty() => {
                        return EMPTY_ERROR_MESSAGE.to_string()
                    }
                    Some(Value::String(s)) => return s.clone(),
                    Some(nested @ Value::Object(_)) => return message_from_value(nested),
                    _ => continue,
                }
            }
            UNKNOWN_ERROR_MESSAGE.to_string()
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} con ID {} no encontrado.", resource, id))
}
