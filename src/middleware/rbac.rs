// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::tenancy::TenantContext,
    models::tenancy::MemberRole,
};

/// O Extractor (Guardião) das rotas administrativas: só ADMIN da loja passa.
pub struct RequireAdmin(pub TenantContext);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::TenantAccessDenied)?;

        if tenant.role != MemberRole::Admin {
            return Err(AppError::AdminRequired);
        }

        Ok(RequireAdmin(tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn extract(role: Option<MemberRole>) -> Result<RequireAdmin, AppError> {
        let (mut parts, _) = axum::http::Request::builder().body(()).unwrap().into_parts();
        if let Some(role) = role {
            parts.extensions.insert(TenantContext { tenant_id: Uuid::new_v4(), role });
        }
        RequireAdmin::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn only_admins_pass() {
        assert!(extract(Some(MemberRole::Admin)).await.is_ok());
        assert!(matches!(extract(Some(MemberRole::Client)).await, Err(AppError::AdminRequired)));
        assert!(matches!(extract(None).await, Err(AppError::TenantAccessDenied)));
    }
}
