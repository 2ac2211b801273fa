use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

pub type RlsTx = Transaction<'static, Postgres>;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis RLS (a "chave").
///
/// `set_config(..., true)` só vale dentro da transação, então a conexão volta
/// limpa para a pool depois do commit/rollback. O handler precisa chamar
/// `commit()` quando houver escrita.
pub(crate) async fn begin_rls(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<RlsTx, AppError> {
    let mut tx = begin_tenant_tx(&app_state.db_pool, tenant_ctx.tenant_id).await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user.0.id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Mesma chave RLS, sem usuário: tarefas em segundo plano (disparo em massa)
/// e fluxos sem login (recuperação de senha).
pub(crate) async fn begin_tenant_tx(pool: &PgPool, tenant_id: Uuid) -> Result<RlsTx, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;
    set_tenant_key(&mut tx, tenant_id).await?;
    Ok(tx)
}

/// Define a loja numa transação já aberta (cadastro entra numa loja no meio da transação)
pub(crate) async fn set_tenant_key(conn: &mut PgConnection, tenant_id: Uuid) -> Result<(), AppError> {
    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(tenant_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

/// Paginação simples usada nas listagens (`?page=1&perPage=20`).
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub const MAX_PER_PAGE: i64 = 100;
    pub const MAX_PAGE: i64 = 100_000;

    pub fn limit(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE) - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn pagination_clamps_page_size_and_offsets() {
        let p = Pagination { page: Some(3), per_page: Some(500) };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 200);

        let first = Pagination { page: Some(0), per_page: None };
        assert_eq!(first.limit(), 20);
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let p = Pagination { page: Some(i64::MAX / 2), per_page: Some(20) };
        assert_eq!(p.offset(), (Pagination::MAX_PAGE - 1) * 20);

        let p = Pagination { page: Some(i64::MAX), per_page: Some(i64::MAX) };
        assert_eq!(p.offset(), (Pagination::MAX_PAGE - 1) * Pagination::MAX_PER_PAGE);
        assert!(p.offset() > 0);
    }
}
