// src/handlers/catalog.rs
//
// Categorias, coleções e produtos (área administrativa)

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
    models::catalog::{
        CreateCategoryPayload, CreateColecaoPayload, CreateProductPayload, ProductFilter, UpdateProductPayload,
    },
};

// =============================================================================
//  CATEGORIAS
// =============================================================================

// POST /api/admin/categories
pub async fn create_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let category = app_state
        .catalog_service
        .create_category(&mut *tx, tenant.tenant_id, &payload.name)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(category)))
}

// GET /api/admin/categories
pub async fn list_categories(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let categories = app_state.catalog_service.list_categories(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(categories))
}

// DELETE /api/admin/categories/{id}
pub async fn delete_category(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state.catalog_service.delete_category(&mut *tx, tenant.tenant_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  COLEÇÕES
// =============================================================================

// POST /api/admin/colecoes
pub async fn create_colecao(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateColecaoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let colecao = app_state
        .catalog_service
        .create_colecao(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(colecao)))
}

// GET /api/admin/colecoes
pub async fn list_colecoes(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let colecoes = app_state.catalog_service.list_colecoes(&mut *tx, tenant.tenant_id).await?;
    Ok(Json(colecoes))
}

// =============================================================================
//  PRODUTOS
// =============================================================================

// POST /api/admin/products
pub async fn create_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let product = app_state
        .catalog_service
        .create_product(&mut *tx, tenant.tenant_id, &payload)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/admin/products?q=&categoryId=&page=&perPage=
pub async fn list_products(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let products = app_state
        .catalog_service
        .list_products(&mut *tx, tenant.tenant_id, &filter)
        .await?;
    Ok(Json(products))
}

// GET /api/admin/products/{id}
pub async fn get_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let product = app_state.catalog_service.get_product(&mut *tx, tenant.tenant_id, id).await?;
    Ok(Json(product))
}

// PATCH /api/admin/products/{id}
pub async fn update_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    let product = app_state
        .catalog_service
        .update_product(&mut *tx, tenant.tenant_id, id, &payload)
        .await?;
    tx.commit().await?;

    Ok(Json(product))
}

// DELETE /api/admin/products/{id}
// Só desativa: o produto continua nos romaneios antigos
pub async fn delete_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    RequireAdmin(tenant): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = begin_rls(&app_state, &tenant, &user).await?;
    app_state.catalog_service.delete_product(&mut *tx, tenant.tenant_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
