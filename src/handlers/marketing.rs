// src/handlers/marketing.rs
//
// Cupons, vales-presente, kits e o histórico de campanhas

use axum::{
    extract::{Path, State},
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
    models::marketing::{
        CreateCouponPayload, CreateGiftCardPayload, CreateKitPayload, RedeemGiftCardPayload, ValidateCouponPayload,
    },
};

// =============================================================================
//  CUPONS
// =============================================================================

// POST /api/admin/coupons
pub async fn create_coupon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateCouponPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let coupon = app_state
        .marketing_service
        .create_coupon(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

// GET /api/admin/coupons
pub async fn list_coupons(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let coupons = app_state.marketing_service.list_coupons(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(coupons))
}

// DELETE /api/admin/coupons/{id}
pub async fn deactivate_coupon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state.marketing_service.deactivate_coupon(&mut *tx, tenant.tenant_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/admin/coupons/validate
pub async fn validate_coupon(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
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
//  VALES-PRESENTE
// =============================================================================

// POST /api/admin/gift-cards
pub async fn create_gift_card(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateGiftCardPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let card = app_state
        .marketing_service
        .create_gift_card(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(card)))
}

// GET /api/admin/gift-cards
pub async fn list_gift_cards(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let cards = app_state.marketing_service.list_gift_cards(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(cards))
}

// POST /api/admin/gift-cards/{id}/redeem
pub async fn redeem_gift_card(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<RedeemGiftCardPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let card = app_state
        .marketing_service
        .redeem_gift_card(&mut *tx, tenant.tenant_id, id, payload.amount)
        .await?;
    tx.commit().await?;

    Ok(Json(card))
}

// =============================================================================
//  KITS
// =============================================================================

// POST /api/admin/kits
pub async fn create_kit(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateKitPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let kit = app_state.marketing_service.create_kit(&mut *tx, tenant.tenant_id, &payload).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(kit)))
}

// GET /api/admin/kits
pub async fn list_kits(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let kits = app_state.marketing_service.list_kits(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(kits))
}

// =============================================================================
//  CAMPANHAS
// =============================================================================

// GET /api/admin/campaigns
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let campaigns = app_state.marketing_service.list_campaigns(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(campaigns))
}

// GET /api/admin/campaigns/{id}
// Também é a consulta de progresso do disparo em massa
pub async fn get_campaign(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let campaign = app_state.marketing_service.get_campaign(&mut *tx, tenant.tenant_id, id).await?;
    Ok(Json(campaign))
}
