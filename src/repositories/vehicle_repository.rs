use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{VehiclePayload, VehicleRecord};
use crate::utils::errors::AppResult;

/// Ventana semiabierta `[start, end)` sobre `fecha_venta`.
/// `end` es el inicio del periodo siguiente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SaleWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Acceso a la tabla de vehículos. Se inyecta como `Arc<dyn VehicleStore>`.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Inserta y devuelve la fila creada; `None` si la base no devolvió fila
    async fn insert(&self, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>>;

    /// Todos los vehículos, más recientes primero
    async fn fetch_all(&self) -> AppResult<Vec<VehicleRecord>>;

    /// Vehículos no vendidos, más recientes primero
    async fn fetch_unsold(&self) -> AppResult<Vec<VehicleRecord>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<VehicleRecord>>;

    /// Actualiza por id; `None` si ninguna fila coincidió
    async fn update(&self, id: i64, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>>;

    /// Devuelve el número de filas eliminadas
    async fn delete(&self, id: i64) -> AppResult<u64>;

    async fn mark_sold(&self, id: i64, sold_at: DateTime<Utc>) -> AppResult<Option<VehicleRecord>>;

    /// Vendidos, opcionalmente acotados por `fecha_venta`, ordenados por fecha de venta descendente
    async fn fetch_sold(&self, window: Option<SaleWindow>) -> AppResult<Vec<VehicleRecord>>;
}

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleStore for PgVehicleRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        let vehicle = sqlx::query_as::<_, VehicleRecord>(
            r#"
            INSERT INTO "Autos" (
                linea, marca, modelo, km, tipo_caja, valor_venta, propietario_ubicacion,
                descripcion, vendido, soat, tecno, color, lugar_matricula, reporte, prenda,
                motor, estado, imagenes, placa
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(&payload.linea)
        .bind(&payload.marca)
        .bind(payload.modelo)
        .bind(payload.km)
        .bind(&payload.tipo_caja)
        .bind(payload.valor_venta)
        .bind(&payload.propietario_ubicacion)
        .bind(&payload.descripcion)
        .bind(payload.vendido.unwrap_or(false))
        .bind(payload.soat)
        .bind(payload.tecno)
        .bind(&payload.color)
        .bind(&payload.lugar_matricula)
        .bind(payload.reporte)
        .bind(payload.prenda)
        .bind(&payload.motor)
        .bind(&payload.estado)
        .bind(&payload.imagenes)
        .bind(&payload.placa)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn fetch_all(&self) -> AppResult<Vec<VehicleRecord>> {
        let vehicles = sqlx::query_as::<_, VehicleRecord>(
            r#"SELECT * FROM "Autos" ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn fetch_unsold(&self) -> AppResult<Vec<VehicleRecord>> {
        let vehicles = sqlx::query_as::<_, VehicleRecord>(
            r#"SELECT * FROM "Autos" WHERE vendido = false ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<VehicleRecord>> {
        let vehicle = sqlx::query_as::<_, VehicleRecord>(r#"SELECT * FROM "Autos" WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn update(&self, id: i64, payload: &VehiclePayload) -> AppResult<Option<VehicleRecord>> {
        let vehicle = sqlx::query_as::<_, VehicleRecord>(
            r#"
            UPDATE "Autos"
            SET linea = $2, marca = $3, modelo = $4, km = $5, tipo_caja = $6, valor_venta = $7,
                propietario_ubicacion = $8, descripcion = $9, vendido = COALESCE($10, vendido),
                soat = $11, tecno = $12, color = $13, lugar_matricula = $14, reporte = $15,
                prenda = $16, motor = $17, estado = $18, imagenes = $19, placa = $20
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&payload.linea)
        .bind(&payload.marca)
        .bind(payload.modelo)
        .bind(payload.km)
        .bind(&payload.tipo_caja)
        .bind(payload.valor_venta)
        .bind(&payload.propietario_ubicacion)
        .bind(&payload.descripcion)
        .bind(payload.vendido)
        .bind(payload.soat)
        .bind(payload.tecno)
        .bind(&payload.color)
        .bind(&payload.lugar_matricula)
        .bind(payload.reporte)
        .bind(payload.prenda)
        .bind(&payload.motor)
        .bind(&payload.estado)
        .bind(&payload.imagenes)
        .bind(&payload.placa)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn delete(&self, id: i64) -> AppResult<u64> {
        let result = sqlx::query(r#"DELETE FROM "Autos" WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn mark_sold(&self, id: i64, sold_at: DateTime<Utc>) -> AppResult<Option<VehicleRecord>> {
        let vehicle = sqlx::query_as::<_, VehicleRecord>(
            r#"UPDATE "Autos" SET vendido = true, fecha_venta = $2 WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(sold_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn fetch_sold(&self, window: Option<SaleWindow>) -> AppResult<Vec<VehicleRecord>> {
        let vehicles = match window {
            Some(window) => {
                sqlx::query_as::<_, VehicleRecord>(
                    r#"
                    SELECT * FROM "Autos"
                    WHERE vendido = true AND fecha_venta >= $1 AND fecha_venta < $2
                    ORDER BY fecha_venta DESC
                    "#,
                )
                .bind(window.start)
                .bind(window.end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, VehicleRecord>(
                    r#"SELECT * FROM "Autos" WHERE vendido = true ORDER BY fecha_venta DESC NULLS LAST"#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(vehicles)
    }
}
