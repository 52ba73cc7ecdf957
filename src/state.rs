//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El almacén de datos y el de imágenes se
//! reciben ya construidos.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::controllers::VehicleController;
use crate::repositories::VehicleStore;
use crate::services::{CatalogService, ImageLifecycleService, VehicleService};
use crate::storage::ImageStorage;
use crate::utils::notifications::NotificationBus;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub vehicles: Arc<VehicleService>,
    pub images: Arc<ImageLifecycleService>,
    pub catalog: Arc<CatalogService>,
    pub controller: Arc<VehicleController>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn VehicleStore>, storage: Arc<dyn ImageStorage>) -> Self {
        let vehicles = Arc::new(VehicleService::new(store));
        let images = Arc::new(ImageLifecycleService::new(storage, config.storage.prefix.clone()));
        let catalog = Arc::new(CatalogService::new(vehicles.clone()));
        let controller = Arc::new(VehicleController::new(
            vehicles.clone(),
            images.clone(),
            NotificationBus::default(),
        ));

        Self {
            config,
            vehicles,
            images,
            catalog,
            controller,
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.vehicles.store_backend()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.images.storage_backend()
    }
}
