// src/common/money.rs
//
// Contas puras de valores: totais do romaneio, cupons e vale-presente.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::common::error::AppError;
use crate::models::marketing::{Coupon, CouponKind};
use crate::models::romaneio::RomaneioItem;

/// Valor de uma linha: quantidade × valor unitário, em centavos.
pub fn line_total(quantidade: i32, valor_unitario: Decimal) -> Decimal {
    (Decimal::from(quantidade) * valor_unitario).round_dp(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomaneioTotals {
    // "Valor Total" impresso no romaneio: soma das linhas
    pub valor_total: Decimal,
    pub desconto: Decimal,
    pub frete: Decimal,
    // O que a cliente paga
    pub total_a_pagar: Decimal,
}

impl RomaneioTotals {
    pub fn from_line_totals<I>(lines: I, desconto: Decimal, frete: Decimal) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        let valor_total: Decimal = lines.into_iter().sum();
        let desconto = desconto.max(Decimal::ZERO).min(valor_total);
        let frete = frete.max(Decimal::ZERO);
        Self {
            valor_total,
            desconto,
            frete,
            total_a_pagar: valor_total - desconto + frete,
        }
    }

    /// Totais a partir dos itens gravados do romaneio
    pub fn from_items(items: &[RomaneioItem], desconto: Decimal, frete: Decimal) -> Self {
        Self::from_line_totals(items.iter().map(|i| i.valor_total), desconto, frete)
    }
}

/// Desconto que o cupom concede sobre o subtotal, ou o motivo da recusa.
pub fn apply_coupon(coupon: &Coupon, subtotal: Decimal, now: DateTime<Utc>) -> Result<Decimal, AppError> {
    if !coupon.is_active {
        return Err(AppError::CouponRejected("cupom inativo".into()));
    }
    if coupon.expires_at.is_some_and(|exp| exp <= now) {
        return Err(AppError::CouponRejected("cupom expirado".into()));
    }
    if coupon.usage_limit.is_some_and(|limit| coupon.used_count >= limit) {
        return Err(AppError::CouponRejected("limite de uso atingido".into()));
    }
    if let Some(min) = coupon.min_order {
        if subtotal < min {
            return Err(AppError::CouponRejected(format!("pedido mínimo de R$ {:.2}", min)));
        }
    }

    let desconto = match coupon.kind {
        CouponKind::Percentual => {
            let pct = coupon.value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            (subtotal * pct / Decimal::ONE_HUNDRED).round_dp(2)
        }
        CouponKind::ValorFixo => coupon.value.max(Decimal::ZERO),
    };

    Ok(desconto.min(subtotal))
}

/// Novo saldo do vale-presente depois de usar `amount`; nunca fica negativo.
pub fn redeem_balance(balance: Decimal, amount: Decimal) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidField("amount".into()));
    }
    if amount > balance {
        return Err(AppError::BusinessRule(format!(
            "saldo insuficiente no vale-presente (R$ {:.2})",
            balance
        )));
    }
    Ok(balance - amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn coupon(kind: CouponKind, value: i64) -> Coupon {
        Coupon {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            code: "BEMVINDA".into(),
            kind,
            value: Decimal::new(value, 0),
            min_order: None,
            usage_limit: None,
            used_count: 0,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valor_total_is_sum_of_lines() {
        let lines = [line_total(2, Decimal::new(4990, 2)), line_total(1, Decimal::new(12000, 2))];
        let totals = RomaneioTotals::from_line_totals(lines, Decimal::new(1000, 2), Decimal::new(2500, 2));
        assert_eq!(totals.valor_total, Decimal::new(21980, 2));
        assert_eq!(totals.total_a_pagar, Decimal::new(23480, 2));
    }

    #[test]
    fn discount_never_exceeds_valor_total() {
        let totals = RomaneioTotals::from_line_totals([Decimal::new(50, 0)], Decimal::new(80, 0), Decimal::ZERO);
        assert_eq!(totals.desconto, Decimal::new(50, 0));
        assert_eq!(totals.total_a_pagar, Decimal::ZERO);
    }

    #[test]
    fn percentual_coupon() {
        let c = coupon(CouponKind::Percentual, 10);
        assert_eq!(apply_coupon(&c, Decimal::new(25990, 2), Utc::now()).unwrap(), Decimal::new(2599, 2));
    }

    #[test]
    fn percentual_is_capped_at_hundred() {
        let c = coupon(CouponKind::Percentual, 150);
        assert_eq!(apply_coupon(&c, Decimal::new(100, 0), Utc::now()).unwrap(), Decimal::new(100, 0));
    }

    #[test]
    fn fixed_coupon_is_capped_at_subtotal() {
        let c = coupon(CouponKind::ValorFixo, 30);
        assert_eq!(apply_coupon(&c, Decimal::new(20, 0), Utc::now()).unwrap(), Decimal::new(20, 0));
    }

    #[test]
    fn rejected_coupons() {
        let now = Utc::now();

        let mut expired = coupon(CouponKind::ValorFixo, 5);
        expired.expires_at = Some(now - Duration::hours(1));
        assert!(matches!(apply_coupon(&expired, Decimal::ONE_HUNDRED, now), Err(AppError::CouponRejected(_))));

        let mut exhausted = coupon(CouponKind::ValorFixo, 5);
        exhausted.usage_limit = Some(3);
        exhausted.used_count = 3;
        assert!(apply_coupon(&exhausted, Decimal::ONE_HUNDRED, now).is_err());

        let mut min_order = coupon(CouponKind::ValorFixo, 5);
        min_order.min_order = Some(Decimal::new(200, 0));
        assert!(apply_coupon(&min_order, Decimal::ONE_HUNDRED, now).is_err());

        let mut inactive = coupon(CouponKind::ValorFixo, 5);
        inactive.is_active = false;
        assert!(apply_coupon(&inactive, Decimal::ONE_HUNDRED, now).is_err());
    }

    #[test]
    fn gift_card_balance_never_negative() {
        assert_eq!(redeem_balance(Decimal::new(100, 0), Decimal::new(40, 0)).unwrap(), Decimal::new(60, 0));
        assert!(redeem_balance(Decimal::new(10, 0), Decimal::new(40, 0)).is_err());
        assert!(redeem_balance(Decimal::new(10, 0), Decimal::ZERO).is_err());
    }

    proptest::proptest! {
        #[test]
        fn valor_total_matches_sum_for_any_items(
            lines in proptest::collection::vec((1i32..50, 1i64..1_000_000), 1..40)
        ) {
            let line_totals: Vec<Decimal> = lines
                .iter()
                .map(|(q, cents)| line_total(*q, Decimal::new(*cents, 2)))
                .collect();
            let expected: Decimal = line_totals.iter().copied().sum();
            let totals = RomaneioTotals::from_line_totals(line_totals, Decimal::ZERO, Decimal::ZERO);
            proptest::prop_assert_eq!(totals.valor_total, expected);
        }
    }
}
