// src/handlers/store.rs
//
// Vitrine: rotas da cliente logada (qualquer membro da loja)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::{
        catalog::{Client, ClientPayload},
        lots::{CatalogClickPayload, CheckoutPayload, ReservePayload},
        marketing::ValidateCouponPayload,
        romaneio::RomaneioFilter,
    },
};

// A ficha de cliente do usuário nesta loja
async fn current_client(
    app_state: &AppState,
    conn: &mut PgConnection,
    tenant: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<Client, AppError> {
    app_state
        .client_service
        .current_client(conn, tenant.tenant_id, user.0.id)
        .await
}

// =============================================================================
//  LOTES
// =============================================================================

// GET /api/store/lots
pub async fn list_open_lots(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lots = app_state.lot_service.list_open_lots(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(lots))
}

// GET /api/store/lots/{id}
pub async fn get_lot(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(lot_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let lot = app_state.lot_service.get_visible_lot(&mut *tx, tenant.tenant_id, lot_id).await?;
    Ok(Json(lot))
}

// POST /api/store/lots/{id}/clicks
// Admin olhando a vitrine não tem ficha de cliente: o clique fica anônimo
pub async fn record_click(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<CatalogClickPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;

    let client_id = match current_client(&app_state, &mut *tx, &tenant, &user).await {
        Ok(client) => Some(client.id),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    app_state
        .lot_service
        .record_click(&mut *tx, tenant.tenant_id, lot_id, client_id, payload.product_id)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  RESERVAS E FECHAMENTO
// =============================================================================

// PUT /api/store/lots/{id}/reservas
// Upsert: a mesma peça no mesmo lote só troca a quantidade
pub async fn reserve(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<ReservePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let reserva = app_state
        .lot_service
        .reserve(&mut *tx, tenant.tenant_id, lot_id, client.id, &payload)
        .await?;
    tx.commit().await?;

    Ok(Json(reserva))
}

// GET /api/store/lots/{id}/reservas
pub async fn my_reservas(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(lot_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let reservas = app_state
        .lot_service
        .my_reservas(&mut *tx, tenant.tenant_id, lot_id, client.id)
        .await?;
    Ok(Json(reservas))
}

// DELETE /api/store/lots/{id}/reservas/{reserva_id}
pub async fn cancel_reserva(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path((lot_id, reserva_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    app_state
        .lot_service
        .cancel_reserva(&mut *tx, tenant.tenant_id, lot_id, client.id, reserva_id)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/store/lots/{id}/checkout
// Fecha as reservas ativas da cliente num romaneio (tudo na mesma transação)
pub async fn checkout(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let romaneio = app_state
        .lot_service
        .checkout(&mut *tx, tenant.tenant_id, lot_id, client, payload.coupon_code.as_deref())
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(romaneio)))
}

// POST /api/store/coupons/validate
// Só a prévia do desconto; o uso conta no checkout
pub async fn validate_coupon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<ValidateCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let quote = app_state
        .marketing_service
        .validate_coupon(&mut *tx, tenant.tenant_id, &payload.code, payload.subtotal)
        .await?;
    Ok(Json(quote))
}

// =============================================================================
//  MEUS ROMANEIOS
// =============================================================================

// GET /api/store/romaneios
pub async fn my_romaneios(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(filter): Query<RomaneioFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let romaneios = app_state
        .romaneio_service
        .list(&mut *tx, tenant.tenant_id, &filter, Some(client.id))
        .await?;
    Ok(Json(romaneios))
}

// GET /api/store/romaneios/{id}
pub async fn my_romaneio(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let romaneio = app_state
        .romaneio_service
        .detail(&mut *tx, tenant.tenant_id, id, Some(client.id))
        .await?;
    Ok(Json(romaneio))
}

// GET /api/store/romaneios/{id}/pix
pub async fn my_romaneio_pix(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    let charge = app_state
        .romaneio_service
        .pix_charge(&mut *tx, tenant.tenant_id, id, Some(client.id))
        .await?;
    Ok(Json(charge))
}

// =============================================================================
//  MEU CADASTRO
// =============================================================================

// GET /api/store/me
pub async fn my_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = current_client(&app_state, &mut *tx, &tenant, &user).await?;
    Ok(Json(client))
}

// PUT /api/store/me
pub async fn update_my_profile(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let client = app_state
        .client_service
        .update_current_client(&mut *tx, tenant.tenant_id, user.0.id, payload)
        .await?;
    tx.commit().await?;

    Ok(Json(client))
}
