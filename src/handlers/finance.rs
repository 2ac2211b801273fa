// src/handlers/finance.rs

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
    models::finance::{CreateTransactionPayload, DateRange, TransactionFilter},
};

// POST /api/admin/finance/transactions
pub async fn create_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let transaction = app_state
        .finance_service
        .create_transaction(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

// GET /api/admin/finance/transactions?from=2026-01-01&to=2026-01-31&kind=DESPESA
pub async fn list_transactions(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let transactions = app_state
        .finance_service
        .list_transactions(&mut *tx, tenant.tenant_id, &filter)
        .await?;
    Ok(Json(transactions))
}

// DELETE /api/admin/finance/transactions/{id}
pub async fn delete_transaction(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state.finance_service.delete_transaction(&mut *tx, tenant.tenant_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/finance/daily?from=&to=
pub async fn daily_report(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let days = app_state.finance_service.daily_report(&mut *tx, tenant.tenant_id, &range).await?;
    Ok(Json(days))
}

// GET /api/admin/finance/summary?from=&to=
pub async fn summary(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let summary = app_state.finance_service.summary(&mut *tx, tenant.tenant_id, &range).await?;
    Ok(Json(summary))
}
