// src/services/catalog_service.rs

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::catalog::{
        Category, Colecao, CreateColecaoPayload, CreateProductPayload, Product, ProductFilter,
        UpdateProductPayload,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository) -> Self {
        Self { catalog_repo }
    }

    // --- Categorias ---

    pub async fn create_category(&self, conn: &mut PgConnection, tenant_id: Uuid, name: &str) -> Result<Category, AppError> {
        self.catalog_repo.create_category(conn, tenant_id, name.trim()).await
    }

    pub async fn list_categories(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Category>, AppError> {
        self.catalog_repo.list_categories(conn, tenant_id).await
    }

    pub async fn delete_category(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.catalog_repo.delete_category(conn, tenant_id, id).await? {
            return Err(AppError::NotFound("Categoria"));
        }
        Ok(())
    }

    // --- Coleções ---

    pub async fn create_colecao(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateColecaoPayload,
    ) -> Result<Colecao, AppError> {
        self.catalog_repo
            .create_colecao(conn, tenant_id, payload.name.trim(), payload.description.as_deref())
            .await
    }

    pub async fn list_colecoes(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Colecao>, AppError> {
        self.catalog_repo.list_colecoes(conn, tenant_id).await
    }

    // --- Produtos ---

    pub async fn create_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateProductPayload,
    ) -> Result<Product, AppError> {
        check_price("price", payload.price)?;
        check_price("cost", payload.cost)?;

        let product = self.catalog_repo.create_product(conn, tenant_id, payload).await?;
        tracing::info!("💍 Produto {} ({}) cadastrado", product.sku, product.id);
        Ok(product)
    }

    pub async fn list_products(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError> {
        self.catalog_repo.list_products(conn, tenant_id, filter).await
    }

    pub async fn get_product(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Product, AppError> {
        self.catalog_repo
            .find_product(conn, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("Produto"))
    }

    pub async fn update_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        payload: &UpdateProductPayload,
    ) -> Result<Product, AppError> {
        if let Some(price) = payload.price {
            check_price("price", price)?;
        }
        if let Some(cost) = payload.cost {
            check_price("cost", cost)?;
        }

        self.catalog_repo
            .update_product(conn, tenant_id, id, payload)
            .await?
            .ok_or(AppError::NotFound("Produto"))
    }

    pub async fn delete_product(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.catalog_repo.deactivate_product(conn, tenant_id, id).await? {
            return Err(AppError::NotFound("Produto"));
        }
        Ok(())
    }
}

fn check_price(field: &str, value: Decimal) -> Result<(), AppError> {
    if value.is_sign_negative() {
        return Err(AppError::InvalidField(format!("{} não pode ser negativo", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_prices_are_rejected() {
        assert!(check_price("price", Decimal::new(-1, 2)).is_err());
        assert!(check_price("price", Decimal::ZERO).is_ok());
        assert!(check_price("cost", Decimal::new(1990, 2)).is_ok());
    }
}
