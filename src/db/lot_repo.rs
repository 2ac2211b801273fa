// src/db/lot_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lots::{
        CatalogClickReport, CreateLotPayload, Lot, LotProduct, LotProductView, LotStatus, Reserva,
        ReservaStatus, ReservaView,
    },
};

// SELECT base das reservas com dados da cliente e do produto
const RESERVA_VIEW_SELECT: &str = r#"
    SELECT
        r.id, r.lot_id, r.client_id, c.name AS client_name,
        r.lot_product_id, lp.product_id, p.name AS product_name, p.image_url,
        r.quantidade, lp.price AS valor_unitario, r.status
    FROM reservas r
    INNER JOIN lot_products lp ON lp.id = r.lot_product_id
    INNER JOIN products p ON p.id = lp.product_id
    INNER JOIN clients c ON c.id = r.client_id
"#;

#[derive(Clone)]
pub struct LotRepository {
    pool: PgPool,
}

impl LotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LOTES
    // =========================================================================

    pub async fn create_lot<'e, E>(&self, executor: E, tenant_id: Uuid, input: &CreateLotPayload) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(
            r#"
            INSERT INTO lots (tenant_id, name, description, opens_at, closes_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.opens_at)
        .bind(input.closes_at)
        .fetch_one(executor)
        .await?;
        Ok(lot)
    }

    pub async fn list_lots<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<LotStatus>,
    ) -> Result<Vec<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, Lot>(
            r#"
            SELECT * FROM lots
            WHERE tenant_id = $1 AND ($2::lot_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    /// `for_update` trava a linha do lote (checkout e troca de status)
    pub async fn find_lot<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        for_update: bool,
    ) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM lots WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM lots WHERE tenant_id = $1 AND id = $2"
        };
        let lot = sqlx::query_as::<_, Lot>(sql)
            .bind(tenant_id)
            .bind(lot_id)
            .fetch_optional(executor)
            .await?;
        Ok(lot)
    }

    pub async fn update_lot_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        status: LotStatus,
    ) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(
            "UPDATE lots SET status = $3, updated_at = NOW() WHERE tenant_id = $1 AND id = $2 RETURNING *",
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(lot)
    }

    // =========================================================================
    //  PRODUTOS DO LOTE
    // =========================================================================

    pub async fn add_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        product_id: Uuid,
        price: Decimal,
        max_quantity: Option<i32>,
    ) -> Result<LotProduct, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LotProduct>(
            r#"
            INSERT INTO lot_products (tenant_id, lot_id, product_id, price, max_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(product_id)
        .bind(price)
        .bind(max_quantity)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, "Este produto já está no lote."))
    }

    pub async fn remove_product<'e, E>(&self, executor: E, tenant_id: Uuid, lot_product_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM lot_products WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(lot_product_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_lot_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_product_id: Uuid,
    ) -> Result<Option<LotProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lp = sqlx::query_as::<_, LotProduct>(
            "SELECT * FROM lot_products WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(lot_product_id)
        .fetch_optional(executor)
        .await?;
        Ok(lp)
    }

    /// Produtos do lote com a quantidade já reservada (reservas ativas + fechadas)
    pub async fn list_lot_products<'e, E>(&self, executor: E, tenant_id: Uuid, lot_id: Uuid) -> Result<Vec<LotProductView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, LotProductView>(
            r#"
            SELECT
                lp.id, lp.product_id, p.sku, p.name, p.description, p.image_url,
                lp.price, lp.max_quantity,
                COALESCE(SUM(r.quantidade) FILTER (WHERE r.status <> 'CANCELADA'), 0)::BIGINT AS reserved_quantity
            FROM lot_products lp
            INNER JOIN products p ON p.id = lp.product_id
            LEFT JOIN reservas r ON r.lot_product_id = lp.id
            WHERE lp.tenant_id = $1 AND lp.lot_id = $2
            GROUP BY lp.id, p.id
            ORDER BY p.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(lot_id)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    // =========================================================================
    //  RESERVAS
    // =========================================================================

    /// Quantidade reservada por outras clientes (para respeitar o max_quantity)
    pub async fn reserved_by_others<'e, E>(
        &self,
        executor: E,
        lot_product_id: Uuid,
        client_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantidade), 0)::BIGINT FROM reservas
            WHERE lot_product_id = $1 AND client_id <> $2 AND status <> 'CANCELADA'
            "#,
        )
        .bind(lot_product_id)
        .bind(client_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Cria ou atualiza a reserva ativa da cliente para aquele produto
    pub async fn upsert_reserva<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
        lot_product_id: Uuid,
        quantidade: i32,
    ) -> Result<Reserva, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reserva = sqlx::query_as::<_, Reserva>(
            r#"
            INSERT INTO reservas (tenant_id, lot_id, client_id, lot_product_id, quantidade)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (client_id, lot_product_id) WHERE status = 'ATIVA'
            DO UPDATE SET quantidade = EXCLUDED.quantidade, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(client_id)
        .bind(lot_product_id)
        .bind(quantidade)
        .fetch_one(executor)
        .await?;
        Ok(reserva)
    }

    pub async fn cancel_reserva<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reserva_id: Uuid,
        client_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reservas SET status = 'CANCELADA', updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND client_id = $3 AND status = 'ATIVA'
            "#,
        )
        .bind(tenant_id)
        .bind(reserva_id)
        .bind(client_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reservas de um lote (todas as clientes, ou só uma)
    pub async fn list_reservas<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Option<Uuid>,
        status: Option<ReservaStatus>,
    ) -> Result<Vec<ReservaView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"{}
            WHERE r.tenant_id = $1 AND r.lot_id = $2
              AND ($3::uuid IS NULL OR r.client_id = $3)
              AND ($4::reserva_status IS NULL OR r.status = $4)
            ORDER BY c.name ASC, p.name ASC
            "#,
            RESERVA_VIEW_SELECT
        );
        let reservas = sqlx::query_as::<_, ReservaView>(&sql)
            .bind(tenant_id)
            .bind(lot_id)
            .bind(client_id)
            .bind(status)
            .fetch_all(executor)
            .await?;
        Ok(reservas)
    }

    /// Trava as reservas ativas da cliente no lote (checkout)
    pub async fn lock_active_reservas<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<ReservaView>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"{}
            WHERE r.tenant_id = $1 AND r.lot_id = $2 AND r.client_id = $3 AND r.status = 'ATIVA'
            ORDER BY p.name ASC
            FOR UPDATE OF r
            "#,
            RESERVA_VIEW_SELECT
        );
        let reservas = sqlx::query_as::<_, ReservaView>(&sql)
            .bind(tenant_id)
            .bind(lot_id)
            .bind(client_id)
            .fetch_all(executor)
            .await?;
        Ok(reservas)
    }

    pub async fn close_reservas<'e, E>(&self, executor: E, reserva_ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE reservas SET status = 'FECHADA', updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(reserva_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  CLIQUES NO CATÁLOGO
    // =========================================================================

    pub async fn record_click<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Option<Uuid>,
        product_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO catalog_clicks (tenant_id, lot_id, client_id, product_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(client_id)
        .bind(product_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn click_report<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<CatalogClickReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, CatalogClickReport>(
            r#"
            SELECT
                l.id AS lot_id, l.name AS lot_name,
                COUNT(cc.id)::BIGINT AS clicks,
                COUNT(DISTINCT cc.client_id)::BIGINT AS unique_clients
            FROM lots l
            LEFT JOIN catalog_clicks cc ON cc.lot_id = l.id
            WHERE l.tenant_id = $1
            GROUP BY l.id
            ORDER BY clicks DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(report)
    }
}
