// src/services/finance_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::FinanceRepository,
    models::finance::{
        CreateTransactionPayload, DateRange, FinanceSummary, FinancialDailyReport, FinancialTransaction,
        TransactionFilter,
    },
};

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository) -> Self {
        Self { repo }
    }

    /// Lançamento manual. Sem data, vale o dia de hoje.
    pub async fn create_transaction(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateTransactionPayload,
    ) -> Result<FinancialTransaction, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidField("amount deve ser maior que zero".into()));
        }

        let category = payload.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let occurred_on = payload.occurred_on.unwrap_or_else(|| Utc::now().date_naive());

        self.repo
            .create_transaction(
                conn,
                tenant_id,
                payload.kind,
                payload.description.trim(),
                category,
                payload.amount.round_dp(2),
                occurred_on,
                None,
            )
            .await
    }

    pub async fn list_transactions(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinancialTransaction>, AppError> {
        self.repo.list_transactions(conn, tenant_id, &filter.range(), filter.kind).await
    }

    pub async fn delete_transaction(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_transaction(conn, tenant_id, id).await? {
            return Err(AppError::NotFound("Lançamento"));
        }
        Ok(())
    }

    pub async fn daily_report(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<FinancialDailyReport>, AppError> {
        self.repo.daily_report(conn, tenant_id, range).await
    }

    /// Totais do período, somados a partir do relatório diário
    pub async fn summary(&self, conn: &mut PgConnection, tenant_id: Uuid, range: &DateRange) -> Result<FinanceSummary, AppError> {
        let days = self.repo.daily_report(conn, tenant_id, range).await?;
        Ok(FinanceSummary::from_days(&days))
    }
}
