// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::tenancy::MemberRole,
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// A loja que a requisição quer acessar e o papel do usuário nela
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub role: MemberRole,
}

/// Lê o X-Tenant-ID e confere se o usuário é membro da loja.
/// Precisa rodar depois do `auth_guard`.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    let tenant_id = parse_tenant_header(&request)?;

    let role = app_state
        .tenant_repo
        .find_role(user.0.id, tenant_id)
        .await?
        .ok_or(AppError::TenantAccessDenied)?;

    request.extensions_mut().insert(TenantContext { tenant_id, role });
    Ok(next.run(request).await)
}

fn parse_tenant_header(request: &Request) -> Result<Uuid, AppError> {
    let value = request
        .headers()
        .get(TENANT_ID_HEADER)
        .ok_or_else(|| AppError::InvalidField("O cabeçalho X-Tenant-ID é obrigatório.".into()))?;

    let value = value
        .to_str()
        .map_err(|_| AppError::InvalidField("Cabeçalho X-Tenant-ID contém caracteres inválidos.".into()))?;

    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::InvalidField("Cabeçalho X-Tenant-ID inválido (não é um UUID).".into()))
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::TenantAccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/admin/products");
        if let Some(value) = header {
            builder = builder.header(TENANT_ID_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn tenant_header_is_required_and_must_be_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_tenant_header(&request(Some(&id.to_string()))).unwrap(), id);
        assert!(matches!(parse_tenant_header(&request(None)), Err(AppError::InvalidField(_))));
        assert!(matches!(parse_tenant_header(&request(Some("loja-1"))), Err(AppError::InvalidField(_))));
    }
}
