// src/handlers/settings.rs

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin, tenancy::TenantContext},
    models::settings::{UpdateSettingsRequest, UploadQuery},
};

// GET /api/store/settings
// A vitrine também lê (nome, logo, cor)
pub async fn get_settings(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let settings = app_state.settings_service.get(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(settings))
}

// PUT /api/admin/settings
pub async fn update_settings(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let updated = app_state
        .settings_service
        .update(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok(Json(updated))
}

// POST /api/admin/uploads?bucket=company-assets&asset=logo   (multipart, campo "file")
pub async fn upload(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidField(format!("multipart inválido: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("arquivo").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidField(format!("falha ao ler o arquivo: {}", e)))?;
        file = Some((name, bytes));
        break;
    }
    let (name, bytes) = file.ok_or_else(|| AppError::InvalidField("campo \"file\" ausente".into()))?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let uploaded = app_state
        .settings_service
        .upload(&mut *tx, tenant.tenant_id, query.bucket, query.asset, &name, &bytes)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}
