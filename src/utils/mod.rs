//! Utilidades del sistema
//!
//! Manejo de errores, codificación del campo de imágenes, coerción de
//! texto de formularios y notificaciones.

pub mod errors;
pub mod image_field;
pub mod notifications;
pub mod parsing;
