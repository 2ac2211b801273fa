// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        AuthResponse, LoginUserPayload, PasswordResetConfirmPayload, PasswordResetRequestPayload,
        RegisterUserPayload, User,
    },
};

// POST /api/auth/register
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state.auth_service.register_user(&payload).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let token = app_state.auth_service.login_user(&payload.login, &payload.password).await?;

    Ok(Json(AuthResponse { token }))
}

// POST /api/auth/password-reset
// Sempre 202: não revela se o telefone tem cadastro
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.auth_service.request_password_reset(&payload.phone).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Se o telefone tiver cadastro, o código chega pelo WhatsApp." })),
    ))
}

// POST /api/auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .auth_service
        .confirm_password_reset(&payload.phone, &payload.code, &payload.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/users/me
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// GET /api/users/me/tenants
pub async fn get_my_tenants(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let tenants = app_state.auth_service.list_user_tenants(user.id).await?;
    Ok(Json(tenants))
}
