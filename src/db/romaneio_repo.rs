// src/db/romaneio_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::RomaneioTotals},
    models::romaneio::{Romaneio, RomaneioFilter, RomaneioItem, RomaneioStatus},
};

#[derive(Clone)]
pub struct RomaneioRepository {
    pool: PgPool,
}

// Linha a gravar no romaneio (snapshot da reserva)
pub struct NewRomaneioItem<'a> {
    pub product_id: Uuid,
    pub product_name: &'a str,
    pub image_url: Option<&'a str>,
    pub quantidade: i32,
    pub valor_unitario: Decimal,
    pub valor_total: Decimal,
}

impl RomaneioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Próximo número de romaneio da loja. O advisory lock vale até o fim da
    /// transação; a leitura do MAX precisa ser outro comando para enxergar
    /// o romaneio que o checkout concorrente acabou de gravar.
    pub async fn next_numero(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<i32, AppError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(tenant_id)
            .execute(&mut *conn)
            .await?;

        let numero = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(numero), 0) + 1 FROM romaneios WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(numero)
    }

    pub async fn create_romaneio<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
        numero: i32,
        totals: &RomaneioTotals,
        coupon_code: Option<&str>,
    ) -> Result<Romaneio, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let romaneio = sqlx::query_as::<_, Romaneio>(
            r#"
            INSERT INTO romaneios (
                tenant_id, lot_id, client_id, numero, subtotal, desconto, frete, total, coupon_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(client_id)
        .bind(numero)
        .bind(totals.valor_total)
        .bind(totals.desconto)
        .bind(totals.frete)
        .bind(totals.total_a_pagar)
        .bind(coupon_code)
        .fetch_one(executor)
        .await?;
        Ok(romaneio)
    }

    pub async fn add_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        romaneio_id: Uuid,
        item: &NewRomaneioItem<'_>,
    ) -> Result<RomaneioItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, RomaneioItem>(
            r#"
            INSERT INTO romaneio_items (
                tenant_id, romaneio_id, product_id, product_name, image_url,
                quantidade, valor_unitario, valor_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(romaneio_id)
        .bind(item.product_id)
        .bind(item.product_name)
        .bind(item.image_url)
        .bind(item.quantidade)
        .bind(item.valor_unitario)
        .bind(item.valor_total)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn find_romaneio<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Romaneio>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM romaneios WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM romaneios WHERE tenant_id = $1 AND id = $2"
        };
        let romaneio = sqlx::query_as::<_, Romaneio>(sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(romaneio)
    }

    pub async fn list_items<'e, E>(&self, executor: E, tenant_id: Uuid, romaneio_id: Uuid) -> Result<Vec<RomaneioItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, RomaneioItem>(
            "SELECT * FROM romaneio_items WHERE tenant_id = $1 AND romaneio_id = $2 ORDER BY product_name ASC",
        )
        .bind(tenant_id)
        .bind(romaneio_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn list_romaneios<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &RomaneioFilter,
        client_id: Option<Uuid>,
    ) -> Result<Vec<Romaneio>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let romaneios = sqlx::query_as::<_, Romaneio>(
            r#"
            SELECT * FROM romaneios
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR lot_id = $2)
              AND ($3::romaneio_status IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR client_id = $4)
            ORDER BY numero DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.lot_id)
        .bind(filter.status)
        .bind(client_id)
        .fetch_all(executor)
        .await?;
        Ok(romaneios)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        status: RomaneioStatus,
        tracking_code: Option<&str>,
    ) -> Result<Romaneio, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let romaneio = sqlx::query_as::<_, Romaneio>(
            r#"
            UPDATE romaneios SET
                status = $3,
                tracking_code = COALESCE($4, tracking_code),
                paid_at = CASE WHEN $3 = 'PAGO'::romaneio_status THEN NOW() ELSE paid_at END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .bind(tracking_code)
        .fetch_one(executor)
        .await?;
        Ok(romaneio)
    }

    /// Atualiza o frete e recalcula o total (usado depois da cotação)
    pub async fn update_frete<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        totals: &RomaneioTotals,
    ) -> Result<Romaneio, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let romaneio = sqlx::query_as::<_, Romaneio>(
            r#"
            UPDATE romaneios SET frete = $3, total = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(totals.frete)
        .bind(totals.total_a_pagar)
        .fetch_one(executor)
        .await?;
        Ok(romaneio)
    }
}
