// src/handlers/integrations.rs
//
// Credenciais por loja e chamadas diretas aos provedores (frete, CEP, pagamento)

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin, tenancy::TenantContext},
    models::integrations::{FreightQuotePayload, Provider, TrackingPayload, UpsertIntegrationPayload},
};

// GET /api/admin/integrations
pub async fn list_integrations(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let integrations = app_state.integration_service.list(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(integrations))
}

// PUT /api/admin/integrations/{provider}   (MERCADO_PAGO | MELHOR_ENVIO | WHATSAPP)
pub async fn upsert_integration(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(provider): Path<Provider>,
    Json(payload): Json<UpsertIntegrationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let integration = app_state
        .integration_service
        .upsert(&mut *tx, tenant.tenant_id, provider, &payload)
        .await?;
    tx.commit().await?;

    Ok(Json(integration))
}

// POST /api/admin/integrations/mercado-pago/validate
pub async fn validate_mercado_pago(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let account = app_state
        .integration_service
        .validate_mercado_pago(&mut *tx, tenant.tenant_id)
        .await?;
    Ok(Json(account))
}

// GET /api/admin/integrations/mercado-pago/payments/{payment_id}
pub async fn get_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(payment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let payment = app_state
        .integration_service
        .get_payment(&mut *tx, tenant.tenant_id, payment_id)
        .await?;
    Ok(Json(payment))
}

// POST /api/admin/shipping/quote
pub async fn quote_freight(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<FreightQuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let options = app_state
        .integration_service
        .quote_freight(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    Ok(Json(options))
}

// POST /api/admin/shipping/tracking
pub async fn tracking(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<TrackingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let tracking = app_state
        .integration_service
        .tracking(&mut *tx, tenant.tenant_id, &payload.orders)
        .await?;
    Ok(Json(tracking))
}

// GET /api/store/cep/{cep}
// Qualquer membro: a cliente preenche o endereço de entrega pelo CEP
pub async fn lookup_cep(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(cep): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let address = app_state
        .integration_service
        .lookup_cep(&mut *tx, tenant.tenant_id, &cep)
        .await?;
    Ok(Json(address))
}
