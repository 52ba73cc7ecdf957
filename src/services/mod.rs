//! Services module
//!
//! Lógica de negocio: el servicio de datos de vehículos, el ciclo de vida de
//! las imágenes y el catálogo público.

pub mod catalog_service;
pub mod image_lifecycle;
pub mod vehicle_service;

pub use catalog_service::{CatalogFilters, CatalogOptions, CatalogService, CatalogSort, CatalogVehicle};
pub use image_lifecycle::{ImageLifecycleService, ReconciledImages};
pub use vehicle_service::{parse_draft, sale_window, VehicleService};
