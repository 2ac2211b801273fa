// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::catalog::{ClientFilter, ClientPayload},
};

// POST /api/admin/clients
pub async fn create_client(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = app_state
        .client_service
        .create_client(&mut *tx, tenant.tenant_id, payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/admin/clients?q=&page=&perPage=
pub async fn list_clients(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(filter): Query<ClientFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let clients = app_state
        .client_service
        .list_clients(&mut *tx, tenant.tenant_id, &filter)
        .await?;
    Ok(Json(clients))
}

// GET /api/admin/clients/{id}
pub async fn get_client(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = app_state.client_service.get_client(&mut *tx, tenant.tenant_id, id).await?;
    Ok(Json(client))
}

// PUT /api/admin/clients/{id}
pub async fn update_client(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = app_state
        .client_service
        .update_client(&mut *tx, tenant.tenant_id, id, payload)
        .await?;
    tx.commit().await?;

    Ok(Json(client))
}

// DELETE /api/admin/clients/{id}
pub async fn deactivate_client(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state.client_service.deactivate_client(&mut *tx, tenant.tenant_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
