// src/services/marketing_service.rs

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{apply_coupon, redeem_balance},
    },
    db::MarketingRepository,
    models::marketing::{
        Campaign, Coupon, CouponKind, CouponQuote, CreateCouponPayload, CreateGiftCardPayload, CreateKitPayload,
        GiftCard, Kit,
    },
};

#[derive(Clone)]
pub struct MarketingService {
    repo: MarketingRepository,
}

impl MarketingService {
    pub fn new(repo: MarketingRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  CUPONS
    // =========================================================================

    pub async fn create_coupon(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateCouponPayload,
    ) -> Result<Coupon, AppError> {
        check_coupon_value(payload.kind, payload.value)?;
        if payload.min_order.is_some_and(|m| m.is_sign_negative()) {
            return Err(AppError::InvalidField("minOrder não pode ser negativo".into()));
        }

        let coupon = self.repo.create_coupon(conn, tenant_id, payload).await?;
        tracing::info!("🎟️ Cupom {} criado", coupon.code);
        Ok(coupon)
    }

    pub async fn list_coupons(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Coupon>, AppError> {
        self.repo.list_coupons(conn, tenant_id).await
    }

    pub async fn deactivate_coupon(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.repo.deactivate_coupon(conn, tenant_id, id).await? {
            return Err(AppError::NotFound("Cupom"));
        }
        Ok(())
    }

    /// Prévia do desconto no carrinho. Não consome o cupom: o uso só
    /// conta no fechamento do romaneio.
    pub async fn validate_coupon(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponQuote, AppError> {
        let coupon = self
            .repo
            .find_coupon_by_code(conn, tenant_id, code, false)
            .await?
            .ok_or_else(|| AppError::CouponRejected(format!("cupom {} não existe", code.trim())))?;

        let desconto = apply_coupon(&coupon, subtotal, Utc::now())?;
        Ok(CouponQuote {
            code: coupon.code,
            desconto,
            total: subtotal - desconto,
        })
    }

    // =========================================================================
    //  VALE-PRESENTE
    // =========================================================================

    pub async fn create_gift_card(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateGiftCardPayload,
    ) -> Result<GiftCard, AppError> {
        if payload.amount <= Decimal::ZERO {
            return Err(AppError::InvalidField("amount deve ser maior que zero".into()));
        }
        self.repo.create_gift_card(conn, tenant_id, payload).await
    }

    pub async fn list_gift_cards(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<GiftCard>, AppError> {
        self.repo.list_gift_cards(conn, tenant_id).await
    }

    /// Abate `amount` do saldo com a linha travada
    pub async fn redeem_gift_card(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        amount: Decimal,
    ) -> Result<GiftCard, AppError> {
        let card = self
            .repo
            .find_gift_card_for_update(&mut *conn, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("Vale-presente"))?;

        if !card.is_active {
            return Err(AppError::BusinessRule("Vale-presente inativo.".into()));
        }
        if card.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return Err(AppError::BusinessRule("Vale-presente expirado.".into()));
        }

        let balance = redeem_balance(card.balance, amount)?;
        let updated = self.repo.set_gift_card_balance(conn, card.id, balance).await?;
        tracing::info!("🎁 Vale-presente {}: -{} (saldo {})", updated.code, amount, updated.balance);
        Ok(updated)
    }

    // =========================================================================
    //  KITS
    // =========================================================================

    pub async fn create_kit(&self, conn: &mut PgConnection, tenant_id: Uuid, payload: &CreateKitPayload) -> Result<Kit, AppError> {
        if payload.price.is_sign_negative() {
            return Err(AppError::InvalidField("price não pode ser negativo".into()));
        }

        let distinct: HashSet<Uuid> = payload.product_ids.iter().copied().collect();
        if distinct.len() != payload.product_ids.len() {
            return Err(AppError::InvalidField("productIds repetidos".into()));
        }

        // Todos os produtos precisam ser desta loja
        let found = self.repo.count_products(&mut *conn, tenant_id, &payload.product_ids).await?;
        if found != distinct.len() as i64 {
            return Err(AppError::NotFound("Produto"));
        }

        self.repo.create_kit(conn, tenant_id, payload).await
    }

    pub async fn list_kits(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Kit>, AppError> {
        self.repo.list_kits(conn, tenant_id).await
    }

    // =========================================================================
    //  CAMPANHAS (histórico dos disparos)
    // =========================================================================

    pub async fn list_campaigns(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Campaign>, AppError> {
        self.repo.list_campaigns(conn, tenant_id).await
    }

    pub async fn get_campaign(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Campaign, AppError> {
        self.repo
            .find_campaign(conn, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("Campanha"))
    }
}

fn check_coupon_value(kind: CouponKind, value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::InvalidField("value deve ser maior que zero".into()));
    }
    if kind == CouponKind::Percentual && value > Decimal::ONE_HUNDRED {
        return Err(AppError::InvalidField("percentual acima de 100".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_value_rules() {
        assert!(check_coupon_value(CouponKind::Percentual, Decimal::new(15, 0)).is_ok());
        assert!(check_coupon_value(CouponKind::Percentual, Decimal::new(101, 0)).is_err());
        assert!(check_coupon_value(CouponKind::ValorFixo, Decimal::new(250, 0)).is_ok());
        assert!(check_coupon_value(CouponKind::ValorFixo, Decimal::ZERO).is_err());
    }
}
