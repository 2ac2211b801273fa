use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{PasswordResetCode, User, UserTenant},
};

// O repositório de usuários, responsável pelas tabelas 'users' e 'password_reset_codes'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (real ou sintético do telefone)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_phone(&self, phone_digits: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE phone = $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(phone_digits)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Cria um novo usuário no banco de dados
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        phone: Option<&str>,
        full_name: &str,
        hashed_password: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, phone, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(phone)
        .bind(full_name)
        .bind(hashed_password)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            AppError::DatabaseError(e)
        })
    }

    pub async fn update_password<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        hashed_password: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(hashed_password)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Lojas das quais o usuário participa, com o papel em cada uma
    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<UserTenant>, AppError> {
        let tenants = sqlx::query_as::<_, UserTenant>(
            r#"
            SELECT t.id, t.name, t.slug, m.role
            FROM tenants t
            INNER JOIN tenant_members m ON m.tenant_id = t.id
            WHERE m.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    // =========================================================================
    //  CÓDIGOS DE RECUPERAÇÃO DE SENHA
    // =========================================================================

    pub async fn create_reset_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO password_reset_codes (user_id, code, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Último código ainda não usado do usuário
    pub async fn find_latest_reset_code<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<PasswordResetCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_as::<_, PasswordResetCode>(
            r#"
            SELECT id, user_id, code, expires_at, attempts, used_at
            FROM password_reset_codes
            WHERE user_id = $1 AND used_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(code)
    }

    pub async fn mark_reset_code_used<'e, E>(&self, executor: E, code_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE password_reset_codes SET used_at = NOW() WHERE id = $1")
            .bind(code_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Soma uma tentativa errada e queima o código ao chegar em `max_attempts`.
    /// Devolve o total de tentativas já feitas.
    pub async fn register_failed_reset_attempt<'e, E>(
        &self,
        executor: E,
        code_id: Uuid,
        max_attempts: i32,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE password_reset_codes
            SET attempts = attempts + 1,
                used_at = CASE WHEN attempts + 1 >= $2 THEN NOW() ELSE used_at END
            WHERE id = $1
            RETURNING attempts
            "#,
        )
        .bind(code_id)
        .bind(max_attempts)
        .fetch_one(executor)
        .await?;
        Ok(attempts)
    }
}
