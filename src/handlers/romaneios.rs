// src/handlers/romaneios.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_rls, error::AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::{
        integrations::GenerateLabelPayload,
        romaneio::{RomaneioFilter, UpdateFretePayload, UpdateRomaneioStatusPayload},
    },
};

// GET /api/admin/romaneios?lotId=&status=
pub async fn list_romaneios(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(filter): Query<RomaneioFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let romaneios = app_state
        .romaneio_service
        .list(&mut *tx, tenant.tenant_id, &filter, None)
        .await?;
    Ok(Json(romaneios))
}

// GET /api/admin/romaneios/{id}
pub async fn get_romaneio(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let romaneio = app_state
        .romaneio_service
        .detail(&mut *tx, tenant.tenant_id, id, None)
        .await?;
    Ok(Json(romaneio))
}

// PATCH /api/admin/romaneios/{id}/status
pub async fn update_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRomaneioStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let romaneio = app_state
        .romaneio_service
        .update_status(&mut *tx, tenant.tenant_id, id, &payload)
        .await?;
    tx.commit().await?;

    Ok(Json(romaneio))
}

// PATCH /api/admin/romaneios/{id}/frete
pub async fn update_frete(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFretePayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let romaneio = app_state
        .romaneio_service
        .update_frete(&mut *tx, tenant.tenant_id, id, payload.frete)
        .await?;
    tx.commit().await?;

    Ok(Json(romaneio))
}

// GET /api/admin/romaneios/{id}/pdf
pub async fn download_pdf(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let document = app_state
        .romaneio_service
        .load_document(&mut *tx, tenant.tenant_id, id)
        .await?;
    // Fotos e layout podem demorar: a conexão não espera por eles
    tx.commit().await?;

    let (file_name, bytes) = app_state.romaneio_service.render_pdf(document).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
    ];
    Ok((headers, bytes))
}

// GET /api/admin/romaneios/{id}/pdf/base64
pub async fn pdf_base64(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let document = app_state
        .romaneio_service
        .load_document(&mut *tx, tenant.tenant_id, id)
        .await?;
    tx.commit().await?;

    let pdf = app_state.romaneio_service.render_pdf_base64(document).await?;
    Ok(Json(pdf))
}

// GET /api/admin/romaneios/{id}/pix
pub async fn pix_charge(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let charge = app_state
        .romaneio_service
        .pix_charge(&mut *tx, tenant.tenant_id, id, None)
        .await?;
    Ok(Json(charge))
}

// POST /api/admin/romaneios/{id}/whatsapp
// Envia o PDF para a cliente; o envio fica no histórico de mensagens
pub async fn send_whatsapp(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let delivery = app_state
        .romaneio_service
        .prepare_pdf_delivery(&mut *tx, tenant.tenant_id, id)
        .await?;
    tx.commit().await?;

    // PDF e envio fora da transação; o histórico grava em transação própria
    let message = app_state
        .romaneio_service
        .send_pdf_whatsapp(tenant.tenant_id, delivery)
        .await?;

    Ok(Json(message))
}

// POST /api/admin/romaneios/{id}/payment-link
pub async fn payment_link(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let preference = app_state
        .romaneio_service
        .payment_link(&mut *tx, tenant.tenant_id, id)
        .await?;
    Ok((StatusCode::CREATED, Json(preference)))
}

// POST /api/admin/romaneios/{id}/mercado-pago/pix
pub async fn mercado_pago_pix(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let payment = app_state
        .romaneio_service
        .mercado_pago_pix(&mut *tx, tenant.tenant_id, id)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

// POST /api/admin/romaneios/{id}/label
pub async fn generate_label(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateLabelPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let cart = app_state
        .romaneio_service
        .generate_label(&mut *tx, tenant.tenant_id, id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}
