// src/services/tenancy_service.rs

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::{CreateTenantPayload, MemberRole, Tenant},
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { tenant_repo, pool }
    }

    /// LÓGICA DE NEGÓCIO: Cria a loja e, atomicamente, torna quem a criou ADMIN.
    pub async fn create_tenant_with_owner(
        &self,
        payload: &CreateTenantPayload,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let slug = normalize_slug(&payload.slug)?;

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria a loja (Tenant)
        let new_tenant = self
            .tenant_repo
            .create_tenant(&mut *tx, payload.name.trim(), &slug)
            .await?;

        // 3. Quem criou vira administradora
        self.tenant_repo
            .add_member(&mut *tx, new_tenant.id, owner_id, MemberRole::Admin)
            .await?;

        // 4. Commit
        tx.commit().await?;

        tracing::info!("🏪 Loja '{}' criada pelo usuário {}", new_tenant.slug, owner_id);
        Ok(new_tenant)
    }

    /// Vitrine pública: a loja pelo endereço (slug)
    pub async fn find_by_slug(&self, slug: &str) -> Result<Tenant, AppError> {
        self.tenant_repo
            .find_by_slug(&slug.trim().to_lowercase())
            .await?
            .ok_or(AppError::NotFound("Loja"))
    }
}

/// Slug da loja: minúsculas, dígitos e hífen.
pub fn normalize_slug(raw: &str) -> Result<String, AppError> {
    let slug = raw.trim().to_lowercase();
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(slug)
    } else {
        Err(AppError::InvalidField(format!(
            "Endereço '{}' inválido: use letras minúsculas, números e hífen.",
            raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_slug;

    #[test]
    fn slug_is_lowercased_and_checked() {
        assert_eq!(normalize_slug(" Atelie-Ana ").unwrap(), "atelie-ana");
        assert_eq!(normalize_slug("joias-2026").unwrap(), "joias-2026");
        assert!(normalize_slug("joias da ana").is_err());
        assert!(normalize_slug("-joias").is_err());
        assert!(normalize_slug("").is_err());
    }
}
