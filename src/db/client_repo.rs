// src/db/client_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    models::catalog::{Client, ClientFilter, ClientPayload},
};

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Option<Uuid>,
        input: &ClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                tenant_id, user_id, name, phone, email, cpf,
                cep, street, number, complement, neighborhood, city, state, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.cpf)
        .bind(&input.cep)
        .bind(&input.street)
        .bind(&input.number)
        .bind(&input.complement)
        .bind(&input.neighborhood)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O telefone '{}' já está cadastrado.", input.phone)))
    }

    /// O LINK: cliente cadastrada pela loja ganha o usuário que se registrou com o mesmo telefone
    pub async fn link_user_by_phone<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        phone: &str,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET user_id = $2, updated_at = NOW()
            WHERE tenant_id = $1 AND phone = $3 AND user_id IS NULL
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(phone)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    pub async fn find_client<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(client)
    }

    /// Ficha da cliente logada na loja
    pub async fn find_by_user<'e, E>(&self, executor: E, tenant_id: Uuid, user_id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE tenant_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    pub async fn list_clients<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let page = Pagination { page: filter.page, per_page: filter.per_page };
        let search = filter.q.as_deref().map(|q| format!("%{}%", q.trim()));

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT * FROM clients
            WHERE tenant_id = $1
              AND is_active
              AND ($2::text IS NULL OR name ILIKE $2 OR phone ILIKE $2 OR email ILIKE $2)
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id)
        .bind(search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(executor)
        .await?;
        Ok(clients)
    }

    /// Todas as clientes ativas (destinatárias padrão do disparo em massa)
    pub async fn list_active<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE tenant_id = $1 AND is_active ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(clients)
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        input: &ClientPayload,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = $3, phone = $4, email = $5, cpf = $6,
                cep = $7, street = $8, number = $9, complement = $10,
                neighborhood = $11, city = $12, state = $13, notes = $14,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.cpf)
        .bind(&input.cep)
        .bind(&input.street)
        .bind(&input.number)
        .bind(&input.complement)
        .bind(&input.neighborhood)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.notes)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O telefone '{}' já está cadastrado.", input.phone)))
    }

    pub async fn deactivate_client<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE clients SET is_active = FALSE, updated_at = NOW() WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
