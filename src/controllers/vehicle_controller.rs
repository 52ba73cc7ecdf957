//! Controlador de gestión de vehículos
//!
//! Punto único de orquestación del panel: guarda el borrador activo, las
//! listas de inventario y vendidos, y coordina los flujos de guardado,
//! borrado y venta. Es también el único lugar donde los errores se
//! traducen a mensajes para el usuario.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{error, info, warn};

use crate::models::draft::PendingImage;
use crate::models::{DraftMode, DraftSession, VehicleDraft, VehicleRecord};
use crate::services::image_lifecycle::ImageLifecycleService;
use crate::services::vehicle_service::{current_month_year, sale_window, VehicleService};
use crate::utils::errors::{not_found_error, user_message, AppError, AppResult};
use crate::utils::notifications::NotificationBus;

/// Respuesta a cambios del borrador mientras se guarda
pub const DRAFT_LOCKED_MESSAGE: &str = "Hay un guardado en curso, espera a que termine para modificar el formulario.";

/// Resultado de `submit`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Ya había un guardado en curso; no se hizo nada
    Skipped,
    Created(VehicleRecord),
    Updated(VehicleRecord),
}

/// Filtro activo de la lista de vendidos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoldFilter {
    pub month: u32,
    pub year: i32,
}

impl Default for SoldFilter {
    fn default() -> Self {
        let (month, year) = current_month_year();
        Self { month, year }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerState {
    pub edit_id: Option<i64>,
    pub submitting: bool,
    pub last_error: Option<String>,
    pub sold_filter: SoldFilter,
}

/// Libera la bandera de guardado en curso al salir, también si el futuro se cancela
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct VehicleController {
    vehicles: Arc<VehicleService>,
    images: Arc<ImageLifecycleService>,
    session: Mutex<DraftSession>,
    submitting: AtomicBool,
    inventory: RwLock<Vec<VehicleRecord>>,
    sold: RwLock<Vec<VehicleRecord>>,
    sold_filter: RwLock<SoldFilter>,
    last_error: RwLock<Option<String>>,
    notifications: NotificationBus,
}

impl VehicleController {
    pub fn new(
        vehicles: Arc<VehicleService>,
        images: Arc<ImageLifecycleService>,
        notifications: NotificationBus,
    ) -> Self {
        Self {
            vehicles,
            images,
            session: Mutex::new(DraftSession::default()),
            submitting: AtomicBool::new(false),
            inventory: RwLock::new(Vec::new()),
            sold: RwLock::new(Vec::new()),
            sold_filter: RwLock::new(SoldFilter::default()),
            last_error: RwLock::new(None),
            notifications,
        }
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> ControllerState {
        ControllerState {
            edit_id: self.session.lock().await.edit_id,
            submitting: self.is_submitting(),
            last_error: self.last_error.read().await.clone(),
            sold_filter: *self.sold_filter.read().await,
        }
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Copia del borrador activo
    pub async fn session(&self) -> DraftSession {
        self.session.lock().await.clone()
    }

    pub async fn inventory(&self) -> Vec<VehicleRecord> {
        self.inventory.read().await.clone()
    }

    pub async fn sold(&self) -> Vec<VehicleRecord> {
        self.sold.read().await.clone()
    }

    async fn report_error(&self, context: &str, err: &AppError) -> String {
        let message = user_message(err);
        error!("❌ {}: {}", context, message);
        *self.last_error.write().await = Some(message.clone());
        match err {
            AppError::NotFound(_) => self.notifications.warning(message.clone()),
            _ => self.notifications.error(message.clone()),
        }
        message
    }

    // ---- Listas ----

    pub async fn load_inventory(&self) -> AppResult<Vec<VehicleRecord>> {
        *self.last_error.write().await = None;
        match self.vehicles.fetch_unsold().await {
            Ok(vehicles) => {
                info!("📋 Inventario cargado: {} vehículos", vehicles.len());
                *self.inventory.write().await = vehicles.clone();
                Ok(vehicles)
            }
            Err(e) => {
                let message = user_message(&e);
                error!("❌ Error cargando inventario: {}", message);
                *self.last_error.write().await = Some(message.clone());
                self.notifications.error(format!("Error inventario: {}", message));
                Err(e)
            }
        }
    }

    /// Carga vendidos; los argumentos ausentes conservan el filtro actual.
    /// Un filtro inválido se rechaza sin reemplazar el vigente.
    pub async fn load_sold(&self, month: Option<u32>, year: Option<i32>) -> AppResult<Vec<VehicleRecord>> {
        let current = *self.sold_filter.read().await;
        let filter = SoldFilter {
            month: month.unwrap_or(current.month),
            year: year.unwrap_or(current.year),
        };

        let result = match sale_window(Some(filter.month), Some(filter.year)) {
            Ok(window) => {
                *self.sold_filter.write().await = filter;
                self.vehicles.fetch_sold_in(window).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(vehicles) => {
                info!(
                    "📋 Vendidos {}/{} cargados: {} vehículos",
                    filter.month,
                    filter.year,
                    vehicles.len()
                );
                *self.sold.write().await = vehicles.clone();
                Ok(vehicles)
            }
            Err(e) => {
                let message = user_message(&e);
                error!("❌ Error cargando vendidos: {}", message);
                self.notifications.error(format!("Error vendidos: {}", message));
                Err(e)
            }
        }
    }

    /// Recarga ambas listas tras una escritura; los fallos ya quedan reportados
    async fn reload(&self) {
        let _ = self.load_inventory().await;
        let _ = self.load_sold(None, None).await;
    }

    // ---- Borrador ----

    /// Toma el borrador para modificarlo. Con un guardado en curso se rechaza:
    /// el guardado trabaja sobre una copia y reinicia el borrador al terminar.
    async fn editable_session(&self) -> AppResult<MutexGuard<'_, DraftSession>> {
        let session = self.session.lock().await;
        if self.is_submitting() {
            warn!("⏳ Cambio del borrador rechazado: guardado en curso");
            return Err(AppError::Conflict(DRAFT_LOCKED_MESSAGE.to_string()));
        }
        Ok(session)
    }

    pub async fn start_edit(&self, record: &VehicleRecord) -> AppResult<()> {
        let mut session = self.editable_session().await?;
        info!("✏️ Editando vehículo ID {}", record.id);
        *session = DraftSession::for_edit(record);
        Ok(())
    }

    /// Busca el registro en el almacén y abre su edición
    pub async fn start_edit_by_id(&self, id: i64) -> AppResult<DraftSession> {
        let record = match self.vehicles.find(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                let err = not_found_error("Vehículo", id);
                self.report_error("Edición", &err).await;
                return Err(err);
            }
            Err(e) => {
                self.report_error("Edición", &e).await;
                return Err(e);
            }
        };
        self.start_edit(&record).await?;
        Ok(self.session().await)
    }

    pub async fn clear_form(&self) -> AppResult<()> {
        self.editable_session().await?.reset();
        info!("🧹 Formulario limpio");
        *self.last_error.write().await = None;
        Ok(())
    }

    pub async fn update_draft(&self, draft: VehicleDraft) -> AppResult<DraftSession> {
        let mut session = self.editable_session().await?;
        session.draft = draft;
        Ok(session.clone())
    }

    /// Devuelve el total de imágenes del borrador
    pub async fn add_files(&self, files: Vec<PendingImage>) -> AppResult<usize> {
        let mut session = self.editable_session().await?;
        session.images.add_files(files);
        Ok(session.images.total_images())
    }

    pub async fn remove_new_file(&self, index: usize) -> AppResult<Option<PendingImage>> {
        Ok(self.editable_session().await?.images.remove_new_file(index))
    }

    pub async fn remove_existing_url(&self, index: usize) -> AppResult<Option<String>> {
        Ok(self.editable_session().await?.images.remove_existing_url(index))
    }

    // ---- Flujos ----

    /// Guarda el borrador: reconcilia imágenes y luego crea o actualiza.
    ///
    /// Con otro guardado en curso devuelve `Skipped` sin tocar nada. Mientras
    /// dura, los cambios al borrador se rechazan. Si falla, el borrador queda
    /// intacto para reintentar.
    pub async fn submit(&self) -> AppResult<SubmitOutcome> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("⏳ Guardado ya en curso, se ignora el nuevo envío");
            return Ok(SubmitOutcome::Skipped);
        }
        let _in_flight = InFlight(&self.submitting);

        let session = self.session.lock().await.clone();
        let mode = session.mode();
        self.notifications.loading(match mode {
            DraftMode::Editing(_) => "Actualizando vehículo...",
            DraftMode::Creating => "Creando vehículo...",
        });

        match self.save(&session).await {
            Ok(outcome) => {
                self.session.lock().await.reset();
                *self.last_error.write().await = None;
                self.notifications.success(match outcome {
                    SubmitOutcome::Updated(_) => "Vehículo actualizado!",
                    _ => "Vehículo creado!",
                });
                self.reload().await;
                Ok(outcome)
            }
            Err(e) => {
                let context = match mode {
                    DraftMode::Editing(_) => "Error al actualizar vehículo",
                    DraftMode::Creating => "Error al crear vehículo",
                };
                self.report_error(context, &e).await;
                Err(e)
            }
        }
    }

    async fn save(&self, session: &DraftSession) -> AppResult<SubmitOutcome> {
        let mode = session.mode();
        let reconciled = self.images.reconcile_on_save(&session.images, mode).await?;

        let written = match mode {
            DraftMode::Editing(id) => self
                .vehicles
                .update(id, &session.draft, reconciled.field.clone())
                .await
                .map(SubmitOutcome::Updated),
            DraftMode::Creating => self
                .vehicles
                .create(&session.draft, reconciled.field.clone())
                .await
                .map(SubmitOutcome::Created),
        };

        match written {
            Ok(outcome) => {
                if let DraftMode::Editing(_) = mode {
                    self.images.purge_deleted(&session.images.pending_deletion).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                self.images.compensate(&reconciled.uploaded_paths).await;
                Err(e)
            }
        }
    }

    /// Elimina el registro y después, sin bloquear en errores, sus imágenes.
    /// Un fallo del almacén de datos se propaga al llamador.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let cached = self.inventory.read().await.iter().find(|v| v.id == id).cloned();
        let record = match cached {
            Some(record) => Some(record),
            None => self.vehicles.find(id).await.ok().flatten(),
        };
        let name = record
            .as_ref()
            .map(VehicleRecord::display_name)
            .unwrap_or_else(|| "vehículo".to_string());

        self.notifications.loading(format!("Eliminando {}...", name));

        if let Err(e) = self.vehicles.delete(id).await {
            self.report_error("Error al eliminar vehículo", &e).await;
            return Err(e);
        }

        if let Some(record) = &record {
            self.images.delete_record_images(record).await;
        }

        self.notifications.success("Vehículo eliminado.");
        self.reload().await;
        Ok(())
    }

    /// Marca como vendido comprobando la existencia contra el almacén
    pub async fn mark_as_sold(&self, id: i64) -> AppResult<VehicleRecord> {
        let result = self.sell(id).await;
        match &result {
            Ok(_) => {
                self.notifications.success("Vehículo marcado como vendido.");
                self.reload().await;
            }
            Err(e) => {
                self.report_error("Error al marcar como vendido", e).await;
            }
        }
        result
    }

    async fn sell(&self, id: i64) -> AppResult<VehicleRecord> {
        let record = self
            .vehicles
            .find(id)
            .await?
            .ok_or_else(|| not_found_error("Vehículo", id))?;

        if record.vendido {
            return Err(AppError::Conflict(format!(
                "{} ya está marcado como vendido.",
                record.display_name()
            )));
        }

        self.notifications
            .loading(format!("Marcando {} como vendido...", record.display_name()));
        self.vehicles.mark_sold(id).await
    }
}
