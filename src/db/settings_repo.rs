use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::settings::{CompanySettings, UpdateSettingsRequest},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loja sem linha em company_settings devolve tudo vazio
    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<CompanySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, CompanySettings>(
            "SELECT * FROM company_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings.unwrap_or_else(|| CompanySettings::empty(tenant_id)))
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &UpdateSettingsRequest,
    ) -> Result<CompanySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let settings = sqlx::query_as::<_, CompanySettings>(
            r#"
            INSERT INTO company_settings (
                tenant_id, company_name, document_number, address, phone, email,
                pix_key, pix_city, primary_color
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                company_name = EXCLUDED.company_name,
                document_number = EXCLUDED.document_number,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                pix_key = EXCLUDED.pix_key,
                pix_city = EXCLUDED.pix_city,
                primary_color = EXCLUDED.primary_color,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.company_name)
        .bind(&input.document_number)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.pix_key)
        .bind(&input.pix_city)
        .bind(&input.primary_color)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }

    /// Grava a URL do logo ou do ícone depois do upload
    pub async fn set_asset_url<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        logo_url: Option<&str>,
        icon_url: Option<&str>,
    ) -> Result<CompanySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, CompanySettings>(
            r#"
            INSERT INTO company_settings (tenant_id, logo_url, icon_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                logo_url = COALESCE(EXCLUDED.logo_url, company_settings.logo_url),
                icon_url = COALESCE(EXCLUDED.icon_url, company_settings.icon_url),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(logo_url)
        .bind(icon_url)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
