// src/handlers/lots.rs
//
// Lotes (catálogos de compra coletiva) na área administrativa

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::lots::{AddLotProductPayload, CreateLotPayload, LotStatus, ReservaStatus, UpdateLotStatusPayload},
};

#[derive(Debug, Deserialize)]
pub struct LotListQuery {
    pub status: Option<LotStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReservaListQuery {
    pub status: Option<ReservaStatus>,
}

// POST /api/admin/lots
pub async fn create_lot(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateLotPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lot = app_state.lot_service.create_lot(&mut *tx, tenant.tenant_id, &payload).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(lot)))
}

// GET /api/admin/lots?status=ABERTO
pub async fn list_lots(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(query): Query<LotListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lots = app_state.lot_service.list_lots(&mut *tx, tenant.tenant_id, query.status).await?;
    Ok(Json(lots))
}

// GET /api/admin/lots/{id}
pub async fn get_lot(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(lot_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lot = app_state.lot_service.get_lot(&mut *tx, tenant.tenant_id, lot_id).await?;
    Ok(Json(lot))
}

// PATCH /api/admin/lots/{id}/status
pub async fn update_lot_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<UpdateLotStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lot = app_state
        .lot_service
        .update_status(&mut *tx, tenant.tenant_id, lot_id, payload.status)
        .await?;
    tx.commit().await?;

    Ok(Json(lot))
}

// POST /api/admin/lots/{id}/products
pub async fn add_lot_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<AddLotProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lot_product = app_state
        .lot_service
        .add_product(&mut *tx, tenant.tenant_id, lot_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(lot_product)))
}

// DELETE /api/admin/lots/{id}/products/{lot_product_id}
pub async fn remove_lot_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path((lot_id, lot_product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state
        .lot_service
        .remove_product(&mut *tx, tenant.tenant_id, lot_id, lot_product_id)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/lots/{id}/reservas?status=ATIVA
pub async fn list_lot_reservas(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(lot_id): Path<Uuid>,
    Query(query): Query<ReservaListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let reservas = app_state
        .lot_service
        .list_reservas(&mut *tx, tenant.tenant_id, lot_id, query.status)
        .await?;
    Ok(Json(reservas))
}

// GET /api/admin/reports/catalog-clicks
pub async fn catalog_click_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let report = app_state.lot_service.click_report(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(report))
}
