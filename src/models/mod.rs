//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema
//! PostgreSQL y el estado de edición del panel de administración.

pub mod draft;
pub mod vehicle;

pub use draft::{DraftMode, DraftSession, VehicleDraft};
pub use vehicle::{VehiclePayload, VehicleRecord, VehicleStatus};
