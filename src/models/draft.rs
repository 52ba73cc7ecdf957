//! Borrador de edición del panel de administración
//!
//! `VehicleDraft` guarda los campos como texto, tal como llegan del
//! formulario; la coerción a tipos ocurre al enviar. `ImageSet` lleva las
//! tres colecciones de imágenes pendientes y `DraftSession` las une con el
//! modo (creación o edición de un id).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::vehicle::{VehicleRecord, VehicleStatus};
use crate::utils::image_field;

/// Campos del formulario de vehículo, sin parsear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleDraft {
    pub linea: String,
    pub marca: String,
    pub modelo: String,
    pub km: String,
    pub tipo_caja: String,
    pub valor_venta: String,
    pub propietario_ubicacion: String,
    pub descripcion: String,
    pub soat: String,
    pub tecno: String,
    pub color: String,
    pub lugar_matricula: String,
    pub reporte: bool,
    pub prenda: bool,
    pub motor: String,
    pub estado: String,
    pub placa: String,
}

impl Default for VehicleDraft {
    fn default() -> Self {
        Self {
            linea: String::new(),
            marca: String::new(),
            modelo: String::new(),
            km: String::new(),
            tipo_caja: String::new(),
            valor_venta: String::new(),
            propietario_ubicacion: String::new(),
            descripcion: String::new(),
            soat: String::new(),
            tecno: String::new(),
            color: String::new(),
            lugar_matricula: String::new(),
            reporte: false,
            prenda: false,
            motor: String::new(),
            estado: VehicleStatus::Available.as_str().to_string(),
            placa: String::new(),
        }
    }
}

impl VehicleDraft {
    /// Hidrata el formulario desde un registro persistido
    pub fn from_record(record: &VehicleRecord) -> Self {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        Self {
            linea: text(&record.linea),
            marca: text(&record.marca),
            modelo: record.modelo.map(|v| v.to_string()).unwrap_or_default(),
            km: record.km.map(|v| v.to_string()).unwrap_or_default(),
            tipo_caja: text(&record.tipo_caja),
            valor_venta: record.valor_venta.map(|v| v.normalize().to_string()).unwrap_or_default(),
            propietario_ubicacion: text(&record.propietario_ubicacion),
            descripcion: text(&record.descripcion),
            soat: record.soat.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            tecno: record.tecno.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            color: text(&record.color),
            lugar_matricula: text(&record.lugar_matricula),
            reporte: record.reporte.unwrap_or(false),
            prenda: record.prenda.unwrap_or(false),
            motor: text(&record.motor),
            estado: record
                .estado
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| VehicleStatus::Available.as_str().to_string()),
            placa: text(&record.placa),
        }
    }
}

/// Archivo recibido y aún no subido al almacenamiento
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl PendingImage {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Las tres colecciones de imágenes de una edición en curso.
///
/// La subida se difiere hasta guardar para no dejar objetos huérfanos si el
/// usuario cancela.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSet {
    /// URLs ya persistidas que siguen en el registro
    pub existing_urls: Vec<String>,
    /// Archivos pendientes de subir
    pub new_files: Vec<PendingImage>,
    /// URLs persistidas que se borrarán tras el próximo guardado exitoso
    pub pending_deletion: Vec<String>,
}

impl ImageSet {
    pub fn from_encoded(raw: Option<&str>) -> Self {
        Self {
            existing_urls: image_field::decode_optional(raw),
            ..Default::default()
        }
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = PendingImage>) {
        self.new_files.extend(files);
    }

    /// Quita un archivo pendiente por posición; fuera de rango no hace nada
    pub fn remove_new_file(&mut self, index: usize) -> Option<PendingImage> {
        if index < self.new_files.len() {
            Some(self.new_files.remove(index))
        } else {
            None
        }
    }

    /// Mueve la URL en esa posición a la lista de borrado pendiente.
    ///
    /// Los índices se refieren a la lista actual: tras una eliminación las
    /// posiciones siguientes se desplazan.
    pub fn remove_existing_url(&mut self, index: usize) -> Option<String> {
        if index >= self.existing_urls.len() {
            return None;
        }
        let url = self.existing_urls.remove(index);
        if !self.pending_deletion.contains(&url) {
            self.pending_deletion.push(url.clone());
        }
        Some(url)
    }

    pub fn total_images(&self) -> usize {
        self.existing_urls.len() + self.new_files.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Creating,
    Editing(i64),
}

/// Estado completo del formulario activo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSession {
    pub draft: VehicleDraft,
    pub images: ImageSet,
    pub edit_id: Option<i64>,
}

impl DraftSession {
    pub fn for_edit(record: &VehicleRecord) -> Self {
        Self {
            draft: VehicleDraft::from_record(record),
            images: ImageSet::from_encoded(record.imagenes.as_deref()),
            edit_id: Some(record.id),
        }
    }

    pub fn mode(&self) -> DraftMode {
        match self.edit_id {
            Some(id) => DraftMode::Editing(id),
            None => DraftMode::Creating,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn record() -> VehicleRecord {
        VehicleRecord {
            id: 7,
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
            linea: Some("Corolla".into()),
            marca: Some("Toyota".into()),
            modelo: Some(2020),
            km: Some(45000),
            tipo_caja: None,
            valor_venta: Some(Decimal::from(55_000_000)),
            propietario_ubicacion: None,
            descripcion: None,
            vendido: false,
            soat: chrono::NaiveDate::from_ymd_opt(2025, 6, 1),
            tecno: None,
            color: None,
            lugar_matricula: None,
            reporte: None,
            prenda: Some(true),
            motor: None,
            estado: None,
            imagenes: Some("{\"https://x.test/a.jpg\",\"https://x.test/b.jpg\"}".into()),
            placa: Some("ABC123".into()),
            fecha_venta: None,
        }
    }

    fn image(name: &str) -> PendingImage {
        PendingImage::new(name, "image/jpeg", Bytes::from_static(b"img"))
    }

    #[test]
    fn test_draft_from_record() {
        let draft = VehicleDraft::from_record(&record());
        assert_eq!(draft.modelo, "2020");
        assert_eq!(draft.valor_venta, "55000000");
        assert_eq!(draft.soat, "2025-06-01");
        assert_eq!(draft.estado, "disponible");
        assert!(draft.prenda);
        assert!(!draft.reporte);
        assert_eq!(draft.tipo_caja, "");
    }

    #[test]
    fn test_session_for_edit_parses_images() {
        let session = DraftSession::for_edit(&record());
        assert_eq!(session.mode(), DraftMode::Editing(7));
        assert_eq!(session.images.existing_urls.len(), 2);
        assert!(session.images.new_files.is_empty());
        assert!(session.images.pending_deletion.is_empty());
    }

    #[test]
    fn test_remove_existing_url_uses_shifted_list() {
        let mut images = ImageSet::from_encoded(record().imagenes.as_deref());

        assert_eq!(images.remove_existing_url(0), Some("https://x.test/a.jpg".to_string()));
        // El mismo índice ahora apunta a la que era la segunda
        assert_eq!(images.remove_existing_url(0), Some("https://x.test/b.jpg".to_string()));
        assert_eq!(images.remove_existing_url(0), None);

        assert!(images.existing_urls.is_empty());
        assert_eq!(images.pending_deletion, vec!["https://x.test/a.jpg", "https://x.test/b.jpg"]);
    }

    #[test]
    fn test_new_files_add_and_remove() {
        let mut images = ImageSet::default();
        images.add_files([image("a.jpg"), image("b.jpg"), image("c.jpg")]);

        let removed = images.remove_new_file(1).unwrap();
        assert_eq!(removed.file_name, "b.jpg");
        assert_eq!(images.remove_new_file(5), None);

        let names: Vec<_> = images.new_files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "c.jpg"]);
        assert_eq!(images.total_images(), 2);
    }

    #[test]
    fn test_reset_returns_to_creating() {
        let mut session = DraftSession::for_edit(&record());
        session.images.add_files([image("x.jpg")]);
        session.reset();
        assert_eq!(session.mode(), DraftMode::Creating);
        assert_eq!(session.images, ImageSet::default());
        assert_eq!(session.draft.estado, "disponible");
    }
}
