//! Flujos completos del panel contra el almacén en memoria y un
//! almacenamiento de imágenes que registra cada llamada.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dealership_catalog::controllers::{SubmitOutcome, VehicleController, DRAFT_LOCKED_MESSAGE};
use dealership_catalog::models::draft::PendingImage;
use dealership_catalog::models::{DraftMode, VehicleDraft, VehiclePayload, VehicleRecord};
use dealership_catalog::repositories::{MemoryVehicleStore, SaleWindow, VehicleStore};
use dealership_catalog::services::image_lifecycle::MISSING_IMAGES_MESSAGE;
use dealership_catalog::services::{ImageLifecycleService, VehicleService};
use dealership_catalog::storage::{ImageStorage, StorageError, StorageResult};
use dealership_catalog::utils::errors::{AppError, AppResult};
use dealership_catalog::utils::image_field::decode_optional;
use dealership_catalog::utils::notifications::{NotificationBus, NotificationLevel};

const CDN: &str = "https://cdn.test/";

type CallLog = Arc<Mutex<Vec<String>>>;

struct RecordingStorage {
    log: CallLog,
    objects: Mutex<HashSet<String>>,
    fail_marker: Mutex<Option<String>>,
    upload_delay: Option<std::time::Duration>,
}

impl RecordingStorage {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            objects: Mutex::new(HashSet::new()),
            fail_marker: Mutex::new(None),
            upload_delay: None,
        }
    }

    fn put(&self, path: &str) {
        self.objects.lock().unwrap().insert(path.to_string());
    }

    fn has(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains(path)
    }

    fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStorage for RecordingStorage {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn upload(&self, path: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let marker = self.fail_marker.lock().unwrap().clone();
        if let Some(marker) = marker {
            if path.contains(&marker) {
                return Err(StorageError::Upload(format!("rechazado {}", path)));
            }
        }
        self.log.lock().unwrap().push(format!("upload:{}", path));
        self.put(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}{}", CDN, path)
    }

    fn path_from_public_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(CDN).map(str::to_string)
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        self.log.lock().unwrap().push(format!("remove:{}", paths.join("|")));
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

/// Almacén en memoria que registra las actualizaciones y puede rechazarlas
struct RecordingStore {
    inner: MemoryVehicleStore,
    log: CallLog,
    fail_updates: AtomicBool,
}

#[async_trait]
impl VehicleStore for RecordingStore {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn insert(&self, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        let row = self.inner.insert(payload).await?;
        self.log.lock().unwrap().push("insert".to_string());
        Ok(row)
    }

    async fn fetch_all(&self) -> AppResult<Vec<VehicleRecord>> {
        self.inner.fetch_all().await
    }

    async fn fetch_unsold(&self) -> AppResult<Vec<VehicleRecord>> {
        self.inner.fetch_unsold().await
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<VehicleRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, id: i64, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("la base rechazó la actualización".to_string()));
        }
        let row = self.inner.update(id, payload).await?;
        self.log.lock().unwrap().push(format!("update:{}", id));
        Ok(row)
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        self.inner.delete(id).await
    }

    async fn mark_sold(&self, id: i64, sold_at: DateTime<Utc>) -> AppResult<Option<VehicleRecord>> {
        self.inner.mark_sold(id, sold_at).await
    }

    async fn fetch_sold(&self, window: Option<SaleWindow>) -> AppResult<Vec<VehicleRecord>> {
        self.inner.fetch_sold(window).await
    }
}

struct Harness {
    controller: Arc<VehicleController>,
    store: Arc<RecordingStore>,
    storage: Arc<RecordingStorage>,
    log: CallLog,
}

impl Harness {
    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

fn harness_with(storage: impl FnOnce(CallLog) -> RecordingStorage) -> Harness {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(RecordingStore {
        inner: MemoryVehicleStore::new(),
        log: log.clone(),
        fail_updates: AtomicBool::new(false),
    });
    let storage = Arc::new(storage(log.clone()));

    let controller = Arc::new(VehicleController::new(
        Arc::new(VehicleService::new(store.clone())),
        Arc::new(ImageLifecycleService::new(storage.clone(), "autos")),
        NotificationBus::default(),
    ));

    Harness {
        controller,
        store,
        storage,
        log,
    }
}

fn harness() -> Harness {
    harness_with(RecordingStorage::new)
}

fn toyota_draft() -> VehicleDraft {
    VehicleDraft {
        marca: "Toyota".into(),
        linea: "Corolla".into(),
        modelo: "2020".into(),
        valor_venta: "55000000".into(),
        placa: "abc123".into(),
        ..Default::default()
    }
}

fn photo(name: &str) -> PendingImage {
    PendingImage::new(name, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff"))
}

fn existing_record(id: i64, imagenes: &str) -> VehicleRecord {
    VehicleRecord {
        id,
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
        linea: Some("Sandero".into()),
        marca: Some("Renault".into()),
        modelo: Some(2019),
        km: Some(62_000),
        tipo_caja: Some("Mecánica".into()),
        valor_venta: Some(Decimal::from(38_000_000)),
        propietario_ubicacion: None,
        descripcion: None,
        vendido: false,
        soat: None,
        tecno: None,
        color: Some("Gris".into()),
        lugar_matricula: None,
        reporte: Some(false),
        prenda: Some(false),
        motor: None,
        estado: Some("disponible".into()),
        imagenes: Some(imagenes.to_string()),
        placa: Some("XYZ987".into()),
        fecha_venta: None,
    }
}

async fn seed_two_image_record(h: &Harness) -> VehicleRecord {
    h.storage.put("autos/1_a.jpg");
    h.storage.put("autos/2_b.jpg");
    let record = existing_record(
        1,
        "{\"https://cdn.test/autos/1_a.jpg\",\"https://cdn.test/autos/2_b.jpg\"}",
    );
    h.store.inner.seed(vec![record.clone()]).await;
    record
}

#[tokio::test]
async fn test_create_vehicle_end_to_end() {
    let h = harness();
    h.controller.update_draft(toyota_draft()).await.unwrap();
    h.controller.add_files(vec![photo("frente.jpg")]).await.unwrap();

    let outcome = h.controller.submit().await.unwrap();
    let SubmitOutcome::Created(vehicle) = outcome else {
        panic!("se esperaba una creación, se obtuvo {:?}", outcome);
    };

    assert_eq!(vehicle.placa.as_deref(), Some("ABC123"));
    assert_eq!(vehicle.modelo, Some(2020));
    assert_eq!(vehicle.valor_venta, Some(Decimal::from(55_000_000)));
    assert!(!vehicle.vendido);

    let urls = vehicle.image_urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://cdn.test/autos/"));
    assert!(urls[0].ends_with("_frente.jpg"));

    // Borrador reiniciado y listas recargadas
    let session = h.controller.session().await;
    assert_eq!(session.mode(), DraftMode::Creating);
    assert!(session.images.new_files.is_empty());
    assert_eq!(session.draft, VehicleDraft::default());
    assert_eq!(h.controller.inventory().await.len(), 1);
    assert!(!h.controller.is_submitting());
    assert_eq!(h.controller.last_error().await, None);
}

#[tokio::test]
async fn test_edit_replaces_first_image_and_purges_after_update() {
    let h = harness();
    let record = seed_two_image_record(&h).await;

    h.controller.start_edit(&record).await.unwrap();
    let removed = h.controller.remove_existing_url(0).await.unwrap();
    assert_eq!(removed.as_deref(), Some("https://cdn.test/autos/1_a.jpg"));
    h.controller.add_files(vec![photo("nueva.jpg")]).await.unwrap();

    let outcome = h.controller.submit().await.unwrap();
    let SubmitOutcome::Updated(vehicle) = outcome else {
        panic!("se esperaba una actualización, se obtuvo {:?}", outcome);
    };

    let urls = decode_optional(vehicle.imagenes.as_deref());
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0], "https://cdn.test/autos/2_b.jpg");
    assert!(urls[1].ends_with("_nueva.jpg"));

    let calls = h.calls();
    let removes: Vec<_> = calls.iter().filter(|c| c.starts_with("remove:")).collect();
    assert_eq!(removes, vec!["remove:autos/1_a.jpg"]);

    let update_at = calls.iter().position(|c| c == "update:1").unwrap();
    let remove_at = calls.iter().position(|c| c == "remove:autos/1_a.jpg").unwrap();
    assert!(update_at < remove_at);

    assert!(!h.storage.has("autos/1_a.jpg"));
    assert!(h.storage.has("autos/2_b.jpg"));
}

#[tokio::test]
async fn test_create_without_images_fails_before_any_io() {
    let h = harness();
    h.controller.update_draft(toyota_draft()).await.unwrap();

    let result = h.controller.submit().await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(h.calls().is_empty());

    // El borrador queda intacto para reintentar
    let session = h.controller.session().await;
    assert_eq!(session.draft.marca, "Toyota");
    assert_eq!(h.controller.last_error().await.as_deref(), Some(MISSING_IMAGES_MESSAGE));
    assert!(!h.controller.is_submitting());
}

#[tokio::test]
async fn test_failing_update_keeps_blobs_pending_deletion() {
    let h = harness();
    let record = seed_two_image_record(&h).await;

    h.controller.start_edit(&record).await.unwrap();
    h.controller.remove_existing_url(0).await.unwrap();
    h.controller.add_files(vec![photo("nueva.jpg")]).await.unwrap();
    h.store.fail_updates.store(true, Ordering::SeqCst);

    let result = h.controller.submit().await;
    assert!(matches!(result, Err(AppError::Persistence(_))));

    // Las imágenes originales siguen en el almacenamiento
    assert!(h.storage.has("autos/1_a.jpg"));
    assert!(h.storage.has("autos/2_b.jpg"));
    // La subida nueva se compensó
    assert_eq!(h.storage.object_count(), 2);
    assert!(!h.calls().iter().any(|c| c.contains("1_a.jpg") && c.starts_with("remove:")));

    let session = h.controller.session().await;
    assert_eq!(session.mode(), DraftMode::Editing(1));
    assert_eq!(session.images.pending_deletion, vec!["https://cdn.test/autos/1_a.jpg"]);
    assert_eq!(session.images.new_files.len(), 1);
    assert!(h.controller.last_error().await.is_some());
}

#[tokio::test]
async fn test_failed_upload_batch_is_compensated() {
    let h = harness();
    *h.storage.fail_marker.lock().unwrap() = Some("rota".to_string());

    h.controller.update_draft(toyota_draft()).await.unwrap();
    h.controller
        .add_files(vec![photo("buena.jpg"), photo("rota.jpg"), photo("otra.jpg")])
        .await
        .unwrap();

    let result = h.controller.submit().await;
    assert!(matches!(result, Err(AppError::Storage(_))));

    assert_eq!(h.storage.object_count(), 0);
    assert!(!h.calls().contains(&"insert".to_string()));
    assert!(h.store.fetch_all().await.unwrap().is_empty());
    assert_eq!(h.controller.session().await.images.new_files.len(), 3);
}

#[tokio::test]
async fn test_mark_as_sold_checks_the_store() {
    let h = harness();
    let record = seed_two_image_record(&h).await;

    // El inventario local está vacío: la comprobación va contra el almacén
    assert!(h.controller.inventory().await.is_empty());

    let sold = h.controller.mark_as_sold(record.id).await.unwrap();
    assert!(sold.vendido);
    assert!(sold.fecha_venta.is_some());
    assert!(h.controller.inventory().await.is_empty());

    let again = h.controller.mark_as_sold(record.id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let missing = h.controller.mark_as_sold(404).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_load_sold_filters_by_month() {
    let h = harness();
    let march_start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let april_start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

    let dates = [
        march_start - Duration::seconds(1),
        march_start,
        april_start - Duration::microseconds(1),
        april_start,
    ];
    let records = dates
        .iter()
        .enumerate()
        .map(|(i, at)| {
            let mut r = existing_record(i as i64 + 1, "https://cdn.test/autos/x.jpg");
            r.placa = Some(format!("SLD{}", i));
            r.vendido = true;
            r.fecha_venta = Some(*at);
            r
        })
        .collect();
    h.store.inner.seed(records).await;

    let sold = h.controller.load_sold(Some(3), Some(2024)).await.unwrap();
    let ids: Vec<_> = sold.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert_eq!(h.controller.sold().await.len(), 2);

    let state = h.controller.state().await;
    assert_eq!((state.sold_filter.month, state.sold_filter.year), (3, 2024));

    // Sin argumentos se conserva el filtro anterior
    assert_eq!(h.controller.load_sold(None, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_skipped() {
    let h = harness_with(|log| RecordingStorage {
        upload_delay: Some(std::time::Duration::from_millis(200)),
        ..RecordingStorage::new(log)
    });
    h.controller.update_draft(toyota_draft()).await.unwrap();
    h.controller.add_files(vec![photo("lenta.jpg")]).await.unwrap();

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.submit().await });

    wait_until_submitting(&h.controller).await;
    assert!(h.controller.state().await.submitting);

    let second = h.controller.submit().await.unwrap();
    assert_eq!(second, SubmitOutcome::Skipped);

    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, SubmitOutcome::Created(_)));
    assert!(!h.controller.is_submitting());
    assert_eq!(h.store.fetch_all().await.unwrap().len(), 1);
}

async fn wait_until_submitting(controller: &VehicleController) {
    for _ in 0..50 {
        if controller.is_submitting() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("el guardado nunca empezó");
}

#[tokio::test]
async fn test_draft_changes_are_rejected_while_saving() {
    let h = harness_with(|log| RecordingStorage {
        upload_delay: Some(std::time::Duration::from_millis(200)),
        ..RecordingStorage::new(log)
    });
    h.controller.update_draft(toyota_draft()).await.unwrap();
    h.controller.add_files(vec![photo("primera.jpg")]).await.unwrap();

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.submit().await });
    wait_until_submitting(&h.controller).await;

    let added = h.controller.add_files(vec![photo("segunda.jpg")]).await;
    assert!(matches!(added, Err(AppError::Conflict(ref m)) if m == DRAFT_LOCKED_MESSAGE));
    assert!(matches!(h.controller.update_draft(VehicleDraft::default()).await, Err(AppError::Conflict(_))));
    assert!(matches!(h.controller.remove_new_file(0).await, Err(AppError::Conflict(_))));
    assert!(matches!(h.controller.clear_form().await, Err(AppError::Conflict(_))));

    let SubmitOutcome::Created(vehicle) = first.await.unwrap().unwrap() else {
        panic!("se esperaba una creación");
    };
    let urls = vehicle.image_urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].ends_with("_primera.jpg"));
    assert_eq!(vehicle.marca.as_deref(), Some("Toyota"));

    // Terminado el guardado, el borrador vuelve a aceptar cambios
    assert_eq!(h.controller.add_files(vec![photo("segunda.jpg")]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_sold_filter_keeps_previous_one() {
    let h = harness();
    h.controller.load_sold(Some(3), Some(2024)).await.unwrap();

    let invalid = h.controller.load_sold(Some(13), Some(2024)).await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    let state = h.controller.state().await;
    assert_eq!((state.sold_filter.month, state.sold_filter.year), (3, 2024));
    assert!(h.controller.load_sold(None, None).await.is_ok());
}

#[tokio::test]
async fn test_delete_removes_record_and_every_image() {
    let h = harness();
    let record = seed_two_image_record(&h).await;
    h.controller.load_inventory().await.unwrap();

    h.controller.delete(record.id).await.unwrap();

    assert_eq!(h.storage.object_count(), 0);
    assert!(h.controller.inventory().await.is_empty());
    assert!(h.store.find_by_id(record.id).await.unwrap().is_none());

    let missing = h.controller.delete(record.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    assert!(h.controller.last_error().await.is_some());
}

#[tokio::test]
async fn test_legacy_image_field_is_rewritten_canonically() {
    let h = harness();
    let record = existing_record(5, "https://cdn.test/autos/1_a.jpg,https://cdn.test/autos/2_b.jpg");
    h.store.inner.seed(vec![record.clone()]).await;

    h.controller.start_edit(&record).await.unwrap();
    assert_eq!(h.controller.session().await.images.existing_urls.len(), 2);

    let outcome = h.controller.submit().await.unwrap();
    let SubmitOutcome::Updated(vehicle) = outcome else {
        panic!("se esperaba una actualización, se obtuvo {:?}", outcome);
    };
    assert_eq!(
        vehicle.imagenes.as_deref(),
        Some("{\"https://cdn.test/autos/1_a.jpg\",\"https://cdn.test/autos/2_b.jpg\"}")
    );
    assert!(!h.calls().iter().any(|c| c.starts_with("remove:")));
}

#[tokio::test]
async fn test_submit_publishes_notifications() {
    let h = harness();
    let mut notifications = h.controller.notifications().subscribe();

    h.controller.update_draft(toyota_draft()).await.unwrap();
    h.controller.add_files(vec![photo("frente.jpg")]).await.unwrap();
    h.controller.submit().await.unwrap();

    let loading = notifications.recv().await.unwrap();
    assert_eq!(loading.level, NotificationLevel::Loading);
    assert_eq!(loading.message, "Creando vehículo...");

    let success = notifications.recv().await.unwrap();
    assert_eq!(success.level, NotificationLevel::Success);
    assert_eq!(success.message, "Vehículo creado!");
}

#[tokio::test]
async fn test_clear_form_discards_edit() {
    let h = harness();
    let record = seed_two_image_record(&h).await;

    h.controller.start_edit(&record).await.unwrap();
    h.controller.remove_existing_url(1).await.unwrap();
    h.controller.clear_form().await.unwrap();

    let state = h.controller.state().await;
    assert_eq!(state.edit_id, None);
    let session = h.controller.session().await;
    assert!(session.images.existing_urls.is_empty());
    assert!(session.images.pending_deletion.is_empty());
    // Nada se borró del almacenamiento
    assert_eq!(h.storage.object_count(), 2);
}
