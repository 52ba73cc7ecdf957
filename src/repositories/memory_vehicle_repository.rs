//! Almacén en memoria con la misma semántica que la tabla `"Autos"`.
//!
//! Se usa cuando no hay `DATABASE_URL` (desarrollo local) y en los tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::vehicle_repository::{SaleWindow, VehicleStore};
use crate::models::{VehiclePayload, VehicleRecord};
use crate::utils::errors::{AppError, AppResult};

pub struct MemoryVehicleStore {
    rows: RwLock<Vec<VehicleRecord>>,
    next_id: AtomicI64,
}

impl MemoryVehicleStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Precarga filas existentes (p. ej. registros con formatos de imagen antiguos)
    pub async fn seed(&self, records: Vec<VehicleRecord>) {
        let mut rows = self.rows.write().await;
        for record in records {
            self.next_id.fetch_max(record.id + 1, Ordering::SeqCst);
            rows.push(record);
        }
    }

    fn check_unique_plate(rows: &[VehicleRecord], placa: Option<&str>, exclude_id: Option<i64>) -> AppResult<()> {
        let Some(placa) = placa else {
            return Ok(());
        };
        let taken = rows
            .iter()
            .any(|row| Some(row.id) != exclude_id && row.placa.as_deref() == Some(placa));
        if taken {
            return Err(AppError::Conflict(format!(
                "Registro duplicado: ya existe un vehículo con placa {}",
                placa
            )));
        }
        Ok(())
    }

    fn apply_payload(row: &mut VehicleRecord, payload: &VehiclePayload) {
        row.linea = payload.linea.clone();
        row.marca = payload.marca.clone();
        row.modelo = payload.modelo;
        row.km = payload.km;
        row.tipo_caja = payload.tipo_caja.clone();
        row.valor_venta = payload.valor_venta;
        row.propietario_ubicacion = payload.propietario_ubicacion.clone();
        row.descripcion = payload.descripcion.clone();
        if let Some(vendido) = payload.vendido {
            row.vendido = vendido;
        }
        row.soat = payload.soat;
        row.tecno = payload.tecno;
        row.color = payload.color.clone();
        row.lugar_matricula = payload.lugar_matricula.clone();
        row.reporte = Some(payload.reporte);
        row.prenda = Some(payload.prenda);
        row.motor = payload.motor.clone();
        row.estado = Some(payload.estado.clone());
        row.imagenes = payload.imagenes.clone();
        row.placa = payload.placa.clone();
    }

    fn newest_first(mut rows: Vec<VehicleRecord>) -> Vec<VehicleRecord> {
        rows.sort_by_key(|row| Reverse((row.created_at, row.id)));
        rows
    }
}

impl Default for MemoryVehicleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        let mut rows = self.rows.write().await;
        Self::check_unique_plate(&rows, payload.placa.as_deref(), None)?;

        let mut record = VehicleRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            created_at: Utc::now(),
            linea: None,
            marca: None,
            modelo: None,
            km: None,
            tipo_caja: None,
            valor_venta: None,
            propietario_ubicacion: None,
            descripcion: None,
            vendido: false,
            soat: None,
            tecno: None,
            color: None,
            lugar_matricula: None,
            reporte: None,
            prenda: None,
            motor: None,
            estado: None,
            imagenes: None,
            placa: None,
            fecha_venta: None,
        };
        Self::apply_payload(&mut record, payload);
        rows.push(record.clone());

        Ok(Some(record))
    }

    async fn fetch_all(&self) -> AppResult<Vec<VehicleRecord>> {
        let rows = self.rows.read().await.clone();
        Ok(Self::newest_first(rows))
    }

    async fn fetch_unsold(&self) -> AppResult<Vec<VehicleRecord>> {
        let rows: Vec<_> = self.rows.read().await.iter().filter(|r| !r.vendido).cloned().collect();
        Ok(Self::newest_first(rows))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<VehicleRecord>> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, id: i64, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        let mut rows = self.rows.write().await;
        Self::check_unique_plate(&rows, payload.placa.as_deref(), Some(id))?;

        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        Self::apply_payload(row, payload);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok((before - rows.len()) as u64)
    }

    async fn mark_sold(&self, id: i64, sold_at: DateTime<Utc>) -> AppResult<Option<VehicleRecord>> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        row.vendido = true;
        row.fecha_venta = Some(sold_at);
        Ok(Some(row.clone()))
    }

    async fn fetch_sold(&self, window: Option<SaleWindow>) -> AppResult<Vec<VehicleRecord>> {
        let mut sold: Vec<_> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.vendido)
            .filter(|r| match (window, r.fecha_venta) {
                (None, _) => true,
                (Some(w), Some(at)) => w.contains(at),
                (Some(_), None) => false,
            })
            .cloned()
            .collect();
        // Descendente por fecha de venta; sin fecha al final
        sold.sort_by(|a, b| b.fecha_venta.cmp(&a.fecha_venta));
        Ok(sold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload(placa: &str) -> VehiclePayload {
        VehiclePayload {
            marca: Some("Renault".into()),
            linea: Some("Logan".into()),
            placa: Some(placa.into()),
            estado: "disponible".into(),
            vendido: Some(false),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_rejects_duplicate_plate() {
        let store = MemoryVehicleStore::new();
        let first = store.insert(&payload("AAA111")).await.unwrap().unwrap();
        let second = store.insert(&payload("BBB222")).await.unwrap().unwrap();
        assert_eq!(first.id + 1, second.id);

        let dup = store.insert(&payload("AAA111")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let store = MemoryVehicleStore::new();
        assert!(store.update(99, &payload("X")).await.unwrap().is_none());
        assert_eq!(store.delete(99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_sold_window_is_half_open() {
        let store = MemoryVehicleStore::new();
        let a = store.insert(&payload("A1")).await.unwrap().unwrap();
        let b = store.insert(&payload("B1")).await.unwrap().unwrap();
        let c = store.insert(&payload("C1")).await.unwrap().unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        store.mark_sold(a.id, start).await.unwrap();
        store.mark_sold(b.id, end - chrono::Duration::microseconds(1)).await.unwrap();
        store.mark_sold(c.id, end).await.unwrap();

        let sold = store.fetch_sold(Some(SaleWindow { start, end })).await.unwrap();
        let ids: Vec<_> = sold.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        assert_eq!(store.fetch_sold(None).await.unwrap().len(), 3);
        assert!(store.fetch_unsold().await.unwrap().is_empty());
    }
}
