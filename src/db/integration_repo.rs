// src/db/integration_repo.rs

use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::integrations::{Integration, Provider},
};

#[derive(Clone)]
pub struct IntegrationRepository {
    pool: PgPool,
}

impl IntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Uma linha por provedor e loja
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        provider: Provider,
        credentials: &Value,
        is_active: bool,
    ) -> Result<Integration, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let integration = sqlx::query_as::<_, Integration>(
            r#"
            INSERT INTO integrations (tenant_id, provider, credentials, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, provider)
            DO UPDATE SET
                credentials = EXCLUDED.credentials,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .bind(credentials)
        .bind(is_active)
        .fetch_one(executor)
        .await?;
        Ok(integration)
    }

    pub async fn find<'e, E>(&self, executor: E, tenant_id: Uuid, provider: Provider) -> Result<Option<Integration>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let integration = sqlx::query_as::<_, Integration>(
            "SELECT * FROM integrations WHERE tenant_id = $1 AND provider = $2",
        )
        .bind(tenant_id)
        .bind(provider)
        .fetch_optional(executor)
        .await?;
        Ok(integration)
    }

    pub async fn list<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Integration>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let integrations = sqlx::query_as::<_, Integration>(
            "SELECT * FROM integrations WHERE tenant_id = $1 ORDER BY provider",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(integrations)
    }
}
