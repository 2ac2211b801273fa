// src/handlers/whatsapp.rs

use axum::{
    extract::{Query, State},
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
    models::whatsapp::{BulkSendPayload, SendMessagePayload},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListQuery {
    pub campaign_id: Option<Uuid>,
}

// POST /api/admin/whatsapp/send
pub async fn send_message(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let gateway = app_state
        .whatsapp_service
        .gateway_for(&mut *tx, tenant.tenant_id)
        .await?;
    // Só leitura; a conexão volta para a pool antes da chamada ao gateway
    tx.commit().await?;

    let message = app_state
        .whatsapp_service
        .send_message(&gateway, tenant.tenant_id, &payload)
        .await?;

    Ok(Json(message))
}

// POST /api/admin/whatsapp/bulk
// Responde 202 na hora; o progresso sai em GET /api/admin/campaigns/{id}
pub async fn send_bulk(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<BulkSendPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tx = begin_rls(&app_state, &tenant, &user).await?;
    let started = app_state
        .whatsapp_service
        .start_bulk(tx, tenant.tenant_id, payload)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(started)))
}

// GET /api/admin/whatsapp/messages?campaignId=
pub async fn list_messages(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(query): Query<MessageListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let messages = app_state
        .whatsapp_service
        .list_messages(&mut *tx, tenant.tenant_id, query.campaign_id)
        .await?;
    Ok(Json(messages))
}
