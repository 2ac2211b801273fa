// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{DateRange, FinancialDailyReport, FinancialTransaction, TransactionKind},
};

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LANÇAMENTOS (Receitas e Despesas)
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_transaction<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        kind: TransactionKind,
        description: &str,
        category: Option<&str>,
        amount: Decimal,
        occurred_on: NaiveDate,
        romaneio_id: Option<Uuid>,
    ) -> Result<FinancialTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            INSERT INTO financial_transactions (
                tenant_id, kind, description, category, amount, occurred_on, romaneio_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(kind)
        .bind(description)
        .bind(category)
        .bind(amount)
        .bind(occurred_on)
        .bind(romaneio_id)
        .fetch_one(executor)
        .await?;
        Ok(transaction)
    }

    pub async fn list_transactions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        range: &DateRange,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<FinancialTransaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transactions = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            SELECT * FROM financial_transactions
            WHERE tenant_id = $1
              AND ($2::date IS NULL OR occurred_on >= $2)
              AND ($3::date IS NULL OR occurred_on <= $3)
              AND ($4::transaction_kind IS NULL OR kind = $4)
            ORDER BY occurred_on DESC, created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(range.from)
        .bind(range.to)
        .bind(kind)
        .fetch_all(executor)
        .await?;
        Ok(transactions)
    }

    pub async fn delete_transaction<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM financial_transactions WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  RELATÓRIO DIÁRIO (view report_financial_daily)
    // =========================================================================

    pub async fn daily_report<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<FinancialDailyReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, FinancialDailyReport>(
            r#"
            SELECT day, receitas, despesas, saldo
            FROM report_financial_daily
            WHERE tenant_id = $1
              AND ($2::date IS NULL OR day >= $2)
              AND ($3::date IS NULL OR day <= $3)
            ORDER BY day ASC
            "#,
        )
        .bind(tenant_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
