// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    models::catalog::{
        Category, Colecao, CreateProductPayload, Product, ProductFilter, UpdateProductPayload,
    },
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATEGORIAS E COLEÇÕES
    // =========================================================================

    pub async fn create_category<'e, E>(&self, executor: E, tenant_id: Uuid, name: &str) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (tenant_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("A categoria '{}' já existe.", name)))
    }

    pub async fn list_categories<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    /// Remove a categoria; os produtos ficam sem categoria (ON DELETE SET NULL)
    pub async fn delete_category<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_colecao<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Colecao, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Colecao>(
            "INSERT INTO colecoes (tenant_id, name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("A coleção '{}' já existe.", name)))
    }

    pub async fn list_colecoes<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Colecao>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let colecoes = sqlx::query_as::<_, Colecao>(
            "SELECT * FROM colecoes WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(colecoes)
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &CreateProductPayload,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                tenant_id, category_id, colecao_id, sku, name, description, price, cost, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.category_id)
        .bind(input.colecao_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.cost)
        .bind(&input.image_url)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O SKU '{}' já está cadastrado.", input.sku)))
    }

    pub async fn find_product<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Busca paginada: texto livre em nome/SKU e filtros opcionais
    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let page = Pagination { page: filter.page, per_page: filter.per_page };
        let search = filter.q.as_deref().map(|q| format!("%{}%", q.trim()));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
              AND ($3::uuid IS NULL OR category_id = $3)
              AND ($4::uuid IS NULL OR colecao_id = $4)
              AND ($5 OR is_active)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(tenant_id)
        .bind(search)
        .bind(filter.category_id)
        .bind(filter.colecao_id)
        .bind(filter.include_inactive.unwrap_or(false))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    /// Atualização parcial (COALESCE mantém o valor atual quando o campo vem nulo)
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        input: &UpdateProductPayload,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id),
                colecao_id = COALESCE($6, colecao_id),
                price = COALESCE($7, price),
                cost = COALESCE($8, cost),
                image_url = COALESCE($9, image_url),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.colecao_id)
        .bind(input.price)
        .bind(input.cost)
        .bind(&input.image_url)
        .bind(input.is_active)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Exclusão lógica: o produto pode estar em romaneios antigos
    pub async fn deactivate_product<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
