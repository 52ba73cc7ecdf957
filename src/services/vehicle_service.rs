//! Servicio de datos de vehículos
//!
//! Traduce el borrador del formulario a filas de la tabla y envuelve cada
//! operación del almacén. Toda la coerción y los valores por defecto de los
//! campos viven aquí; los errores se propagan, nunca se silencian.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{VehicleDraft, VehiclePayload, VehicleRecord, VehicleStatus};
use crate::repositories::{SaleWindow, VehicleStore};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::parsing::{parse_date, parse_non_negative_int, parse_price, trimmed_or_none};

/// Convierte el borrador en un payload tipado. Nunca falla.
///
/// Textos vacíos pasan a `None`, los números inválidos también, `estado`
/// vacío pasa a "disponible" y la placa se guarda en mayúsculas. Los campos
/// obligatorios ausentes solo generan una advertencia en el log.
pub fn parse_draft(draft: &VehicleDraft, imagenes: Option<String>) -> VehiclePayload {
    let estado = if draft.estado.trim().is_empty() {
        VehicleStatus::Available
    } else {
        VehicleStatus::parse(&draft.estado).unwrap_or_else(|| {
            warn!("⚠️ Estado desconocido '{}', se usa 'disponible'", draft.estado);
            VehicleStatus::Available
        })
    };

    let soat = parse_date(&draft.soat);
    if soat.is_none() && !draft.soat.trim().is_empty() {
        warn!("⚠️ Fecha SOAT inválida '{}', se guarda vacía", draft.soat);
    }
    let tecno = parse_date(&draft.tecno);
    if tecno.is_none() && !draft.tecno.trim().is_empty() {
        warn!("⚠️ Fecha tecnomecánica inválida '{}', se guarda vacía", draft.tecno);
    }

    let payload = VehiclePayload {
        linea: trimmed_or_none(&draft.linea),
        marca: trimmed_or_none(&draft.marca),
        modelo: parse_non_negative_int(&draft.modelo),
        km: parse_non_negative_int(&draft.km),
        tipo_caja: trimmed_or_none(&draft.tipo_caja),
        valor_venta: parse_price(&draft.valor_venta),
        propietario_ubicacion: trimmed_or_none(&draft.propietario_ubicacion),
        descripcion: trimmed_or_none(&draft.descripcion),
        vendido: None,
        soat,
        tecno,
        color: trimmed_or_none(&draft.color),
        lugar_matricula: trimmed_or_none(&draft.lugar_matricula),
        reporte: draft.reporte,
        prenda: draft.prenda,
        motor: trimmed_or_none(&draft.motor),
        estado: estado.as_str().to_string(),
        imagenes: imagenes.filter(|s| !s.trim().is_empty()),
        placa: trimmed_or_none(&draft.placa).map(|p| p.to_uppercase()),
    };

    let missing = payload.missing_required_fields();
    if !missing.is_empty() {
        warn!("⚠️ Campos obligatorios faltantes o inválidos: {}", missing.join(", "));
    }

    payload
}

/// Ventana de `fecha_venta` para el filtro de vendidos.
///
/// Mes y año acotan a ese mes; solo año acota al año calendario; un mes sin
/// año no filtra. El fin es el inicio del periodo siguiente, excluido.
pub fn sale_window(month: Option<u32>, year: Option<i32>) -> AppResult<Option<SaleWindow>> {
    let Some(year) = year else {
        if month.is_some() {
            debug!("Filtro de mes sin año, se ignora");
        }
        return Ok(None);
    };

    let (start, next) = match month {
        Some(month) => {
            let start = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| AppError::Validation(format!("Mes inválido: {}", month)))?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            };
            (start, next)
        }
        None => {
            let start = NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| AppError::Validation(format!("Año inválido: {}", year)))?;
            (start, NaiveDate::from_ymd_opt(year + 1, 1, 1))
        }
    };
    let next = next.ok_or_else(|| AppError::Validation(format!("Año inválido: {}", year)))?;

    let start = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap_or_default());
    let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap_or_default());

    Ok(Some(SaleWindow { start, end }))
}

/// Mes y año actuales, valores por defecto del filtro de vendidos
pub fn current_month_year() -> (u32, i32) {
    let now = Utc::now();
    (now.month(), now.year())
}

pub struct VehicleService {
    store: Arc<dyn VehicleStore>,
}

impl VehicleService {
    pub fn new(store: Arc<dyn VehicleStore>) -> Self {
        Self { store }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn create(&self, draft: &VehicleDraft, imagenes: Option<String>) -> AppResult<VehicleRecord> {
        let mut payload = parse_draft(draft, imagenes);
        payload.vendido = Some(false);
        debug!("Insertando payload: {:?}", payload);

        let vehicle = self.store.insert(&payload).await?.ok_or_else(|| {
            AppError::Persistence("No se pudo crear el vehículo, no se devolvieron datos.".to_string())
        })?;

        info!("✅ Vehículo creado ID {} ({})", vehicle.id, vehicle.display_name());
        Ok(vehicle)
    }

    pub async fn fetch_all(&self) -> AppResult<Vec<VehicleRecord>> {
        let vehicles = self.store.fetch_all().await?;
        debug!("Se encontraron {} vehículos", vehicles.len());
        Ok(vehicles)
    }

    pub async fn fetch_unsold(&self) -> AppResult<Vec<VehicleRecord>> {
        self.store.fetch_unsold().await
    }

    pub async fn find(&self, id: i64) -> AppResult<Option<VehicleRecord>> {
        self.store.find_by_id(id).await
    }

    pub async fn update(&self, id: i64, draft: &VehicleDraft, imagenes: Option<String>) -> AppResult<VehicleRecord> {
        let mut payload = parse_draft(draft, imagenes);
        // `vendido` solo cambia mediante mark_sold
        payload.vendido = None;
        debug!("Actualizando ID {} con payload: {:?}", id, payload);

        let vehicle = self.store.update(id, &payload).await?.ok_or_else(|| {
            AppError::Persistence(format!(
                "No se pudo actualizar el vehículo con ID {}, no se devolvieron datos.",
                id
            ))
        })?;

        info!("✅ Vehículo ID {} actualizado", id);
        Ok(vehicle)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let deleted = self.store.delete(id).await?;
        if deleted == 0 {
            return Err(not_found_error("Vehículo", id));
        }
        info!("🗑️ Vehículo ID {} eliminado", id);
        Ok(())
    }

    pub async fn mark_sold(&self, id: i64) -> AppResult<VehicleRecord> {
        let vehicle = self
            .store
            .mark_sold(id, Utc::now())
            .await?
            .ok_or_else(|| not_found_error("Vehículo", id))?;

        info!("💰 Vehículo ID {} marcado como vendido", id);
        Ok(vehicle)
    }

    pub async fn fetch_sold(&self, month: Option<u32>, year: Option<i32>) -> AppResult<Vec<VehicleRecord>> {
        self.fetch_sold_in(sale_window(month, year)?).await
    }

    /// Vendidos dentro de una ventana ya validada
    pub async fn fetch_sold_in(&self, window: Option<SaleWindow>) -> AppResult<Vec<VehicleRecord>> {
        if let Some(w) = &window {
            debug!("Filtrando por fecha_venta desde {} hasta antes de {}", w.start, w.end);
        }
        let vehicles = self.store.fetch_sold(window).await?;
        debug!("Vehículos vendidos encontrados: {}", vehicles.len());
        Ok(vehicles)
    }
}
