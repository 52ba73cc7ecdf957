//! Repositorios
//!
//! Acceso a la tabla de vehículos: PostgreSQL en producción y un almacén en
//! memoria para desarrollo y tests.

pub mod memory_vehicle_repository;
pub mod vehicle_repository;

pub use memory_vehicle_repository::MemoryVehicleStore;
pub use vehicle_repository::{PgVehicleRepository, SaleWindow, VehicleStore};
