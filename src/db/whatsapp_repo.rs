// src/db/whatsapp_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::whatsapp::{MessageKind, MessageStatus, WhatsAppMessage},
};

#[derive(Clone)]
pub struct WhatsAppRepository {
    pool: PgPool,
}

impl WhatsAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log_message<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        campaign_id: Option<Uuid>,
        phone: &str,
        message: &str,
        kind: MessageKind,
        status: MessageStatus,
        error: Option<&str>,
    ) -> Result<WhatsAppMessage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, WhatsAppMessage>(
            r#"
            INSERT INTO whatsapp_messages (tenant_id, campaign_id, phone, message, kind, status, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(campaign_id)
        .bind(phone)
        .bind(message)
        .bind(kind)
        .bind(status)
        .bind(error)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn list_messages<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        campaign_id: Option<Uuid>,
    ) -> Result<Vec<WhatsAppMessage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, WhatsAppMessage>(
            r#"
            SELECT * FROM whatsapp_messages
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR campaign_id = $2)
            ORDER BY created_at DESC
            LIMIT 200
            "#,
        )
        .bind(tenant_id)
        .bind(campaign_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
