//! Catálogo público
//!
//! Solo expone vehículos no vendidos. Los filtros por rango excluyen los
//! vehículos sin ese dato en cuanto se fija cualquiera de los dos límites.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::models::VehicleRecord;
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{not_found_error, AppResult};
use crate::utils::image_field::PLACEHOLDER_IMAGE;

pub const DEFAULT_MAX_PRICE: i64 = 100_000_000;
pub const DEFAULT_MAX_KM: i32 = 500_000;
pub const DEFAULT_YEAR_SPAN: i32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    YearDesc,
    YearAsc,
    KmAsc,
    KmDesc,
}

impl CatalogSort {
    /// Valor del parámetro `sort`; desconocido devuelve `None`
    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "newest" => Some(Self::Newest),
            "price_asc" => Some(Self::PriceAsc),
            "price_desc" => Some(Self::PriceDesc),
            "year_desc" => Some(Self::YearDesc),
            "year_asc" => Some(Self::YearAsc),
            "km_asc" => Some(Self::KmAsc),
            "km_desc" => Some(Self::KmDesc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilters {
    pub make: Option<String>,
    /// Solo aplica cuando hay marca
    pub model: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_km: Option<i32>,
    pub max_km: Option<i32>,
    pub sort: CatalogSort,
}

impl CatalogFilters {
    pub fn matches(&self, vehicle: &VehicleRecord) -> bool {
        if let Some(make) = non_blank(&self.make) {
            if !same_text(vehicle.marca.as_deref(), make) {
                return false;
            }
            if let Some(model) = non_blank(&self.model) {
                if !same_text(vehicle.linea.as_deref(), model) {
                    return false;
                }
            }
        }

        in_range(vehicle.valor_venta, self.min_price, self.max_price)
            && in_range(vehicle.modelo, self.min_year, self.max_year)
            && in_range(vehicle.km, self.min_km, self.max_km)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn same_text(field: Option<&str>, wanted: &str) -> bool {
    field.is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted))
}

fn in_range<T: PartialOrd>(value: Option<T>, min: Option<T>, max: Option<T>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

/// Compara opcionales dejando los `None` al final en ambos sentidos
fn cmp_nulls_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if descending {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_vehicles(vehicles: &mut [VehicleRecord], sort: CatalogSort) {
    vehicles.sort_by(|a, b| match sort {
        CatalogSort::Newest => (b.created_at, b.id).cmp(&(a.created_at, a.id)),
        CatalogSort::PriceAsc => cmp_nulls_last(a.valor_venta, b.valor_venta, false),
        CatalogSort::PriceDesc => cmp_nulls_last(a.valor_venta, b.valor_venta, true),
        CatalogSort::YearDesc => b.modelo.unwrap_or(0).cmp(&a.modelo.unwrap_or(0)),
        CatalogSort::YearAsc => a.modelo.unwrap_or(0).cmp(&b.modelo.unwrap_or(0)),
        CatalogSort::KmAsc => cmp_nulls_last(a.km, b.km, false),
        CatalogSort::KmDesc => cmp_nulls_last(a.km, b.km, true),
    });
}

/// Vista pública de un vehículo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogVehicle {
    pub id: i64,
    pub titulo: String,
    pub marca: Option<String>,
    pub linea: Option<String>,
    pub modelo: Option<i32>,
    pub km: Option<i32>,
    pub tipo_caja: Option<String>,
    pub valor_venta: Option<Decimal>,
    pub color: Option<String>,
    pub motor: Option<String>,
    pub descripcion: Option<String>,
    pub estado: Option<String>,
    pub portada: String,
    pub imagenes: Vec<String>,
}

impl From<&VehicleRecord> for CatalogVehicle {
    fn from(record: &VehicleRecord) -> Self {
        let imagenes = record.image_urls();
        let portada = imagenes
            .first()
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

        Self {
            id: record.id,
            titulo: record.display_name(),
            marca: record.marca.clone(),
            linea: record.linea.clone(),
            modelo: record.modelo,
            km: record.km,
            tipo_caja: record.tipo_caja.clone(),
            valor_venta: record.valor_venta,
            color: record.color.clone(),
            motor: record.motor.clone(),
            descripcion: record.descripcion.clone(),
            estado: record.estado.clone(),
            portada,
            imagenes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange<T> {
    pub min: T,
    pub max: T,
}

/// Valores disponibles para los selectores de filtro
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogOptions {
    pub makes: Vec<String>,
    pub models_by_make: BTreeMap<String, Vec<String>>,
    pub price: NumericRange<Decimal>,
    pub year: NumericRange<i32>,
    pub km: NumericRange<i32>,
}

fn span<T: Ord + Copy>(values: impl Iterator<Item = T>, fallback: NumericRange<T>) -> NumericRange<T> {
    values.fold(None, |acc: Option<NumericRange<T>>, v| {
        Some(match acc {
            Some(r) => NumericRange {
                min: r.min.min(v),
                max: r.max.max(v),
            },
            None => NumericRange { min: v, max: v },
        })
    })
    .unwrap_or(fallback)
}

pub fn build_options(vehicles: &[VehicleRecord]) -> CatalogOptions {
    let mut by_make: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for vehicle in vehicles {
        let Some(make) = vehicle.marca.as_deref().map(str::trim).filter(|m| !m.is_empty()) else {
            continue;
        };
        let models = by_make.entry(make.to_string()).or_default();
        if let Some(line) = vehicle.linea.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            models.insert(line.to_string());
        }
    }

    let current_year = Utc::now().year();
    CatalogOptions {
        makes: by_make.keys().cloned().collect(),
        models_by_make: by_make
            .into_iter()
            .map(|(make, models)| (make, models.into_iter().collect()))
            .collect(),
        price: span(
            vehicles.iter().filter_map(|v| v.valor_venta),
            NumericRange {
                min: Decimal::ZERO,
                max: Decimal::from(DEFAULT_MAX_PRICE),
            },
        ),
        year: span(
            vehicles.iter().filter_map(|v| v.modelo),
            NumericRange {
                min: current_year - DEFAULT_YEAR_SPAN,
                max: current_year,
            },
        ),
        km: span(
            vehicles.iter().filter_map(|v| v.km),
            NumericRange {
                min: 0,
                max: DEFAULT_MAX_KM,
            },
        ),
    }
}

pub struct CatalogService {
    vehicles: Arc<VehicleService>,
}

impl CatalogService {
    pub fn new(vehicles: Arc<VehicleService>) -> Self {
        Self { vehicles }
    }

    pub async fn list(&self, filters: &CatalogFilters) -> AppResult<Vec<CatalogVehicle>> {
        let mut matching: Vec<_> = self
            .vehicles
            .fetch_unsold()
            .await?
            .into_iter()
            .filter(|v| filters.matches(v))
            .collect();
        sort_vehicles(&mut matching, filters.sort);

        debug!("Catálogo: {} vehículos con filtros {:?}", matching.len(), filters);
        Ok(matching.iter().map(CatalogVehicle::from).collect())
    }

    pub async fn options(&self) -> AppResult<CatalogOptions> {
        let vehicles = self.vehicles.fetch_unsold().await?;
        Ok(build_options(&vehicles))
    }

    pub async fn detail(&self, id: i64) -> AppResult<CatalogVehicle> {
        match self.vehicles.find(id).await? {
            Some(vehicle) if !vehicle.vendido => Ok(CatalogVehicle::from(&vehicle)),
            _ => Err(not_found_error("Vehículo", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vehicle(id: i64, marca: &str, linea: &str, modelo: Option<i32>, precio: Option<i64>, km: Option<i32>) -> VehicleRecord {
        VehicleRecord {
            id,
            created_at: Utc.with_ymd_and_hms(2024, 1, id as u32, 0, 0, 0).unwrap(),
            linea: Some(linea.into()),
            marca: Some(marca.into()),
            modelo,
            km,
            tipo_caja: None,
            valor_venta: precio.map(Decimal::from),
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
            estado: Some("disponible".into()),
            imagenes: None,
            placa: None,
            fecha_venta: None,
        }
    }

    fn inventory() -> Vec<VehicleRecord> {
        vec![
            vehicle(1, "Toyota", "Corolla", Some(2020), Some(55_000_000), Some(40_000)),
            vehicle(2, "Mazda", "3", Some(2018), None, Some(80_000)),
            vehicle(3, "Toyota", "Hilux", None, Some(120_000_000), None),
            vehicle(4, "Renault", "Logan", Some(2015), Some(25_000_000), Some(150_000)),
        ]
    }

    fn ids(vehicles: &[VehicleRecord]) -> Vec<i64> {
        vehicles.iter().map(|v| v.id).collect()
    }

    #[test]
    fn test_make_and_model_filters() {
        let filters = CatalogFilters {
            make: Some("toyota".into()),
            ..Default::default()
        };
        let found: Vec<_> = inventory().into_iter().filter(|v| filters.matches(v)).collect();
        assert_eq!(ids(&found), vec![1, 3]);

        // El modelo sin marca se ignora
        let filters = CatalogFilters {
            model: Some("Logan".into()),
            ..Default::default()
        };
        assert_eq!(inventory().iter().filter(|v| filters.matches(v)).count(), 4);
    }

    #[test]
    fn test_range_excludes_missing_values() {
        let filters = CatalogFilters {
            min_price: Some(Decimal::from(30_000_000)),
            ..Default::default()
        };
        let found: Vec<_> = inventory().into_iter().filter(|v| filters.matches(v)).collect();
        assert_eq!(ids(&found), vec![1, 3]);

        let filters = CatalogFilters {
            max_km: Some(100_000),
            ..Default::default()
        };
        let found: Vec<_> = inventory().into_iter().filter(|v| filters.matches(v)).collect();
        assert_eq!(ids(&found), vec![1, 2]);
    }

    #[test]
    fn test_sorting_puts_nulls_last() {
        let mut vehicles = inventory();
        sort_vehicles(&mut vehicles, CatalogSort::PriceAsc);
        assert_eq!(ids(&vehicles), vec![4, 1, 3, 2]);

        sort_vehicles(&mut vehicles, CatalogSort::PriceDesc);
        assert_eq!(ids(&vehicles), vec![3, 1, 4, 2]);

        sort_vehicles(&mut vehicles, CatalogSort::KmDesc);
        assert_eq!(ids(&vehicles), vec![4, 2, 1, 3]);

        sort_vehicles(&mut vehicles, CatalogSort::YearAsc);
        assert_eq!(ids(&vehicles), vec![3, 4, 2, 1]);

        sort_vehicles(&mut vehicles, CatalogSort::Newest);
        assert_eq!(ids(&vehicles), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_options_from_inventory() {
        let options = build_options(&inventory());
        assert_eq!(options.makes, vec!["Mazda", "Renault", "Toyota"]);
        assert_eq!(options.models_by_make["Toyota"], vec!["Corolla", "Hilux"]);
        assert_eq!(options.price.min, Decimal::from(25_000_000));
        assert_eq!(options.price.max, Decimal::from(120_000_000));
        assert_eq!(options.year, NumericRange { min: 2015, max: 2020 });
        assert_eq!(options.km, NumericRange { min: 40_000, max: 150_000 });
    }

    #[test]
    fn test_options_defaults_when_empty() {
        let options = build_options(&[]);
        assert!(options.makes.is_empty());
        assert_eq!(options.price.max, Decimal::from(DEFAULT_MAX_PRICE));
        assert_eq!(options.km, NumericRange { min: 0, max: DEFAULT_MAX_KM });
        assert_eq!(options.year.max - options.year.min, DEFAULT_YEAR_SPAN);
    }

    #[test]
    fn test_catalog_vehicle_uses_placeholder_cover() {
        let mut record = vehicle(9, "Kia", "Picanto", Some(2022), Some(40_000_000), Some(5_000));
        assert_eq!(CatalogVehicle::from(&record).portada, PLACEHOLDER_IMAGE);

        record.imagenes = Some("https://x.test/a.jpg,https://x.test/b.jpg".into());
        let view = CatalogVehicle::from(&record);
        assert_eq!(view.portada, "https://x.test/a.jpg");
        assert_eq!(view.imagenes.len(), 2);
        assert_eq!(view.titulo, record.display_name());
    }
}
