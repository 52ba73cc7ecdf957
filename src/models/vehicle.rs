//! Modelo de Vehículo
//!
//! Este módulo contiene el struct del registro persistido y sus variantes
//! para escritura. Mapea exactamente a la tabla `"Autos"` de PostgreSQL,
//! cuyas columnas están en español.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::image_field;

/// Estado comercial del vehículo - se guarda como texto en `estado`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[serde(rename = "disponible")]
    Available,
    #[serde(rename = "alistamiento")]
    Prep,
    #[serde(rename = "vendido")]
    Sold,
    #[serde(rename = "en crédito")]
    Financed,
    #[serde(rename = "virtual")]
    Virtual,
    #[serde(rename = "separado")]
    Reserved,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 6] = [
        VehicleStatus::Available,
        VehicleStatus::Prep,
        VehicleStatus::Sold,
        VehicleStatus::Financed,
        VehicleStatus::Virtual,
        VehicleStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "disponible",
            VehicleStatus::Prep => "alistamiento",
            VehicleStatus::Sold => "vendido",
            VehicleStatus::Financed => "en crédito",
            VehicleStatus::Virtual => "virtual",
            VehicleStatus::Reserved => "separado",
        }
    }

    /// Reconoce el valor guardado sin importar mayúsculas ni espacios
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|status| status.as_str() == normalized)
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Vehículo persistido - fila de la tabla `"Autos"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VehicleRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub linea: Option<String>,
    pub marca: Option<String>,
    /// Año del modelo
    pub modelo: Option<i32>,
    pub km: Option<i32>,
    pub tipo_caja: Option<String>,
    pub valor_venta: Option<Decimal>,
    pub propietario_ubicacion: Option<String>,
    pub descripcion: Option<String>,
    pub vendido: bool,
    /// Vencimiento del seguro obligatorio
    pub soat: Option<NaiveDate>,
    /// Vencimiento de la revisión técnico-mecánica
    pub tecno: Option<NaiveDate>,
    pub color: Option<String>,
    pub lugar_matricula: Option<String>,
    pub reporte: Option<bool>,
    pub prenda: Option<bool>,
    pub motor: Option<String>,
    pub estado: Option<String>,
    pub imagenes: Option<String>,
    pub placa: Option<String>,
    pub fecha_venta: Option<DateTime<Utc>>,
}

impl VehicleRecord {
    /// "Marca Línea" para mensajes al usuario
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.marca.as_deref().unwrap_or("vehículo"),
            self.linea.as_deref().unwrap_or("")
        );
        name.trim().to_string()
    }

    pub fn image_urls(&self) -> Vec<String> {
        image_field::decode_optional(self.imagenes.as_deref())
    }
}

/// Campos escribibles de un vehículo, ya coercionados a sus tipos.
///
/// Nunca lleva `id` ni `created_at`; `vendido` solo se fija al crear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehiclePayload {
    pub linea: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<i32>,
    pub km: Option<i32>,
    pub tipo_caja: Option<String>,
    pub valor_venta: Option<Decimal>,
    pub propietario_ubicacion: Option<String>,
    pub descripcion: Option<String>,
    pub vendido: Option<bool>,
    pub soat: Option<NaiveDate>,
    pub tecno: Option<NaiveDate>,
    pub color: Option<String>,
    pub lugar_matricula: Option<String>,
    pub reporte: bool,
    pub prenda: bool,
    pub motor: Option<String>,
    pub estado: String,
    pub imagenes: Option<String>,
    pub placa: Option<String>,
}

impl VehiclePayload {
    /// Campos obligatorios ausentes (validación blanda: solo se reporta)
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.marca.is_none() {
            missing.push("marca");
        }
        if self.linea.is_none() {
            missing.push("linea");
        }
        if self.modelo.is_none() {
            missing.push("modelo");
        }
        if self.placa.is_none() {
            missing.push("placa");
        }
        if self.valor_venta.is_none() {
            missing.push("valor_venta");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(VehicleStatus::parse("Disponible"), Some(VehicleStatus::Available));
        assert_eq!(VehicleStatus::parse(" en crédito "), Some(VehicleStatus::Financed));
        assert_eq!(VehicleStatus::parse("separado"), Some(VehicleStatus::Reserved));
        assert_eq!(VehicleStatus::parse("chatarra"), None);
    }

    #[test]
    fn test_status_serde_uses_stored_value() {
        let json = serde_json::to_string(&VehicleStatus::Financed).unwrap();
        assert_eq!(json, "\"en crédito\"");
    }

    #[test]
    fn test_missing_required_fields() {
        let payload = VehiclePayload {
            marca: Some("Mazda".into()),
            modelo: Some(2019),
            ..Default::default()
        };
        assert_eq!(payload.missing_required_fields(), vec!["linea", "placa", "valor_venta"]);
    }
}
