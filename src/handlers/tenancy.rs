// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::tenancy::CreateTenantPayload,
};

// POST /api/tenants
// Quem cria a loja vira ADMIN dela
pub async fn create_tenant(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload, user.id)
        .await?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

// GET /api/tenants/slug/{slug}
// Público: a vitrine resolve a loja pelo endereço antes do login
pub async fn get_by_slug(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = app_state.tenant_service.find_by_slug(&slug).await?;
    Ok(Json(tenant))
}
