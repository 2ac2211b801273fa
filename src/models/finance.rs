// src/models/finance.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::FromRow;
use chrono::{DateTime, Utc, NaiveDate};
use rust_decimal::Decimal;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Receita, // Entrada
    Despesa, // Saída
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: TransactionKind,
    pub description: String,
    pub category: Option<String>,

    // Sempre positivo; o sinal vem do `kind`
    pub amount: Decimal,
    pub occurred_on: NaiveDate,

    // Vínculo com o romaneio que gerou a receita
    pub romaneio_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionPayload {
    pub kind: TransactionKind,
    #[validate(length(min = 1, message = "required"))]
    pub description: String,
    pub category: Option<String>,
    pub amount: Decimal,
    pub occurred_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
}

impl TransactionFilter {
    pub fn range(&self) -> DateRange {
        DateRange { from: self.from, to: self.to }
    }
}

// Linha da view report_financial_daily
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialDailyReport {
    pub day: NaiveDate,
    pub receitas: Decimal,
    pub despesas: Decimal,
    pub saldo: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub receitas: Decimal,
    pub despesas: Decimal,
    pub saldo: Decimal,
}

impl FinanceSummary {
    pub fn from_days(days: &[FinancialDailyReport]) -> Self {
        let receitas: Decimal = days.iter().map(|d| d.receitas).sum();
        let despesas: Decimal = days.iter().map(|d| d.despesas).sum();
        Self { receitas, despesas, saldo: receitas - despesas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_daily_rows() {
        let day = |r: i64, d: i64| FinancialDailyReport {
            day: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            receitas: Decimal::new(r, 2),
            despesas: Decimal::new(d, 2),
            saldo: Decimal::new(r - d, 2),
        };
        let summary = FinanceSummary::from_days(&[day(10_000, 2_500), day(5_050, 0)]);
        assert_eq!(summary.receitas, Decimal::new(15_050, 2));
        assert_eq!(summary.despesas, Decimal::new(2_500, 2));
        assert_eq!(summary.saldo, Decimal::new(12_550, 2));
    }

    #[test]
    fn empty_period_has_zero_summary() {
        let summary = FinanceSummary::from_days(&[]);
        assert_eq!(summary.saldo, Decimal::ZERO);
    }
}
