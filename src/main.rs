use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dealership_catalog::build_app;
use dealership_catalog::config::{DatabaseConfig, EnvironmentConfig};
use dealership_catalog::database::DatabaseConnection;
use dealership_catalog::repositories::{MemoryVehicleStore, PgVehicleRepository, VehicleStore};
use dealership_catalog::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dealership_catalog=debug,tower_http=info")),
        )
        .init();

    info!("🚗 Dealership Catalog - Inventario de vehículos");
    info!("==============================================");

    let config = EnvironmentConfig::from_env().context("Configuración inválida")?;

    // Almacén de datos
    let store: Arc<dyn VehicleStore> = match &config.database_url {
        Some(url) => {
            let db = DatabaseConnection::new(&DatabaseConfig::new(url.clone())).await?;
            if config.run_migrations {
                db.run_migrations().await?;
            }
            Arc::new(PgVehicleRepository::new(db.pool().clone()))
        }
        None => {
            warn!("⚠️ DATABASE_URL no definido, se usa el almacén en memoria (los datos no persisten)");
            Arc::new(MemoryVehicleStore::new())
        }
    };

    // Almacenamiento de imágenes
    let storage = config
        .storage
        .build()
        .context("No se pudo inicializar el almacenamiento de imágenes")?;
    info!("🖼️ Almacenamiento de imágenes: {}", storage.backend_name());

    let state = AppState::new(config.clone(), store, storage);

    // Precarga de listas; los errores ya quedan registrados en el controlador
    if state.controller.load_inventory().await.is_err() {
        warn!("⚠️ No se pudo precargar el inventario");
    }
    if state.controller.load_sold(None, None).await.is_err() {
        warn!("⚠️ No se pudo precargar la lista de vendidos");
    }

    let app = build_app(state);

    info!("🌐 Servidor iniciando en http://{}", config.server_url());
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio");
    info!("🛒 Catálogo público:");
    info!("   GET  /api/catalog - Vehículos disponibles (filtros y orden)");
    info!("   GET  /api/catalog/options - Opciones de filtro");
    info!("   GET  /api/catalog/:id - Detalle de vehículo");
    info!("🔧 Administración:");
    info!("   GET  /api/admin/vehicles - Inventario");
    info!("   GET  /api/admin/vehicles/sold - Vendidos por mes/año");
    info!("   POST /api/admin/vehicles/:id/sold - Marcar como vendido");
    info!("   POST /api/admin/vehicles/:id/edit - Editar vehículo");
    info!("   DELETE /api/admin/vehicles/:id - Eliminar vehículo");
    info!("   GET|PUT|DELETE /api/admin/draft - Borrador del formulario");
    info!("   POST /api/admin/draft/images - Adjuntar imágenes");
    info!("   POST /api/admin/draft/submit - Guardar borrador");
    info!("   GET  /api/admin/notifications - Notificaciones (SSE)");

    let listener = tokio::net::TcpListener::bind(config.server_url())
        .await
        .with_context(|| format!("No se pudo abrir {}", config.server_url()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
