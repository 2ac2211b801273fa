// src/db/marketing_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        marketing::{
            Campaign, CampaignStatus, Coupon, CreateCouponPayload, CreateGiftCardPayload,
            CreateKitPayload, GiftCard, Kit,
        },
        whatsapp::BulkProgress,
    },
};

#[derive(Clone)]
pub struct MarketingRepository {
    pool: PgPool,
}

impl MarketingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CUPONS
    // =========================================================================

    pub async fn create_coupon<'e, E>(&self, executor: E, tenant_id: Uuid, input: &CreateCouponPayload) -> Result<Coupon, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = input.code.trim().to_uppercase();
        sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons (tenant_id, code, kind, value, min_order, usage_limit, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&code)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.min_order)
        .bind(input.usage_limit)
        .bind(input.expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O cupom '{}' já existe.", code)))
    }

    pub async fn list_coupons<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Coupon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let coupons = sqlx::query_as::<_, Coupon>(
            "SELECT * FROM coupons WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(coupons)
    }

    /// Código sem diferenciar maiúsculas. `for_update` trava o cupom no checkout.
    pub async fn find_coupon_by_code<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        code: &str,
        for_update: bool,
    ) -> Result<Option<Coupon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM coupons WHERE tenant_id = $1 AND UPPER(code) = UPPER($2) FOR UPDATE"
        } else {
            "SELECT * FROM coupons WHERE tenant_id = $1 AND UPPER(code) = UPPER($2)"
        };
        let coupon = sqlx::query_as::<_, Coupon>(sql)
            .bind(tenant_id)
            .bind(code.trim())
            .fetch_optional(executor)
            .await?;
        Ok(coupon)
    }

    pub async fn increment_coupon_usage<'e, E>(&self, executor: E, coupon_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE id = $1")
            .bind(coupon_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn deactivate_coupon<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE coupons SET is_active = FALSE WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  VALE-PRESENTE
    // =========================================================================

    pub async fn create_gift_card<'e, E>(&self, executor: E, tenant_id: Uuid, input: &CreateGiftCardPayload) -> Result<GiftCard, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = input.code.trim().to_uppercase();
        sqlx::query_as::<_, GiftCard>(
            r#"
            INSERT INTO gift_cards (tenant_id, code, initial_balance, balance, client_id, expires_at)
            VALUES ($1, $2, $3, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&code)
        .bind(input.amount)
        .bind(input.client_id)
        .bind(input.expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O vale-presente '{}' já existe.", code)))
    }

    pub async fn list_gift_cards<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<GiftCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cards = sqlx::query_as::<_, GiftCard>(
            "SELECT * FROM gift_cards WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(cards)
    }

    pub async fn find_gift_card_for_update<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<GiftCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = sqlx::query_as::<_, GiftCard>(
            "SELECT * FROM gift_cards WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(card)
    }

    pub async fn set_gift_card_balance<'e, E>(&self, executor: E, id: Uuid, balance: Decimal) -> Result<GiftCard, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = sqlx::query_as::<_, GiftCard>(
            "UPDATE gift_cards SET balance = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(balance)
        .fetch_one(executor)
        .await?;
        Ok(card)
    }

    // =========================================================================
    //  KITS
    // =========================================================================

    pub async fn create_kit<'e, E>(&self, executor: E, tenant_id: Uuid, input: &CreateKitPayload) -> Result<Kit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let kit = sqlx::query_as::<_, Kit>(
            r#"
            INSERT INTO kits (tenant_id, name, description, price, product_ids)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.product_ids)
        .fetch_one(executor)
        .await?;
        Ok(kit)
    }

    pub async fn list_kits<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Kit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let kits = sqlx::query_as::<_, Kit>(
            "SELECT * FROM kits WHERE tenant_id = $1 AND is_active ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(kits)
    }

    /// Quantos dos produtos informados existem na loja (validação do kit)
    pub async fn count_products<'e, E>(&self, executor: E, tenant_id: Uuid, ids: &[Uuid]) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // =========================================================================
    //  CAMPANHAS (histórico dos disparos)
    // =========================================================================

    pub async fn create_campaign<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        message: &str,
        total_recipients: i32,
    ) -> Result<Campaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO marketing_campaigns (tenant_id, name, channel, message, total_recipients)
            VALUES ($1, $2, 'whatsapp', $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(message)
        .bind(total_recipients)
        .fetch_one(executor)
        .await?;
        Ok(campaign)
    }

    pub async fn update_campaign_progress<'e, E>(
        &self,
        executor: E,
        campaign_id: Uuid,
        progress: &BulkProgress,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE marketing_campaigns
            SET processed = $2, success_count = $3, error_count = $4
            WHERE id = $1
            "#,
        )
        .bind(campaign_id)
        .bind(progress.processed as i32)
        .bind(progress.success as i32)
        .bind(progress.errors as i32)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn finish_campaign<'e, E>(&self, executor: E, campaign_id: Uuid, status: CampaignStatus) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE marketing_campaigns SET status = $2, finished_at = NOW() WHERE id = $1")
            .bind(campaign_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_campaigns<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaigns = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM marketing_campaigns WHERE tenant_id = $1 ORDER BY started_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(campaigns)
    }

    pub async fn find_campaign<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM marketing_campaigns WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(campaign)
    }
}
