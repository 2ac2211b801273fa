// src/services/lot_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{apply_coupon, line_total, RomaneioTotals},
    },
    db::{romaneio_repo::NewRomaneioItem, CatalogRepository, LotRepository, MarketingRepository, RomaneioRepository},
    models::{
        catalog::Client,
        lots::{
            AddLotProductPayload, CatalogClickReport, CreateLotPayload, Lot, LotDetail, LotProduct, LotStatus,
            Reserva, ReservaStatus, ReservaView, ReservePayload,
        },
        romaneio::RomaneioDetail,
    },
};

#[derive(Clone)]
pub struct LotService {
    lot_repo: LotRepository,
    catalog_repo: CatalogRepository,
    romaneio_repo: RomaneioRepository,
    marketing_repo: MarketingRepository,
}

impl LotService {
    pub fn new(
        lot_repo: LotRepository,
        catalog_repo: CatalogRepository,
        romaneio_repo: RomaneioRepository,
        marketing_repo: MarketingRepository,
    ) -> Self {
        Self { lot_repo, catalog_repo, romaneio_repo, marketing_repo }
    }

    // =========================================================================
    //  ADMINISTRAÇÃO DO LOTE
    // =========================================================================

    pub async fn create_lot(&self, conn: &mut PgConnection, tenant_id: Uuid, payload: &CreateLotPayload) -> Result<Lot, AppError> {
        if let (Some(opens), Some(closes)) = (payload.opens_at, payload.closes_at) {
            if closes <= opens {
                return Err(AppError::InvalidField("closesAt deve ser depois de opensAt".into()));
            }
        }
        self.lot_repo.create_lot(conn, tenant_id, payload).await
    }

    pub async fn list_lots(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        status: Option<LotStatus>,
    ) -> Result<Vec<Lot>, AppError> {
        self.lot_repo.list_lots(conn, tenant_id, status).await
    }

    pub async fn get_lot(&self, conn: &mut PgConnection, tenant_id: Uuid, lot_id: Uuid) -> Result<LotDetail, AppError> {
        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, false).await?;
        let products = self.lot_repo.list_lot_products(conn, tenant_id, lot_id).await?;
        Ok(LotDetail { lot, products })
    }

    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        next: LotStatus,
    ) -> Result<Lot, AppError> {
        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, true).await?;

        if !lot.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: lot.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let updated = self.lot_repo.update_lot_status(conn, tenant_id, lot_id, next).await?;
        tracing::info!("📦 Lote {} passou de {} para {}", lot_id, lot.status.as_str(), next.as_str());
        Ok(updated)
    }

    /// Inclui o produto no lote com o preço congelado (o do produto, se não vier outro)
    pub async fn add_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        payload: &AddLotProductPayload,
    ) -> Result<LotProduct, AppError> {
        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, false).await?;
        if lot.status == LotStatus::Finalizado {
            return Err(AppError::BusinessRule("Lote finalizado não recebe produtos.".into()));
        }

        let product = self
            .catalog_repo
            .find_product(&mut *conn, tenant_id, payload.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(AppError::NotFound("Produto"))?;

        let price = payload.price.unwrap_or(product.price);
        if price.is_sign_negative() {
            return Err(AppError::InvalidField("price não pode ser negativo".into()));
        }

        self.lot_repo
            .add_product(conn, tenant_id, lot_id, product.id, price, payload.max_quantity)
            .await
    }

    pub async fn remove_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        lot_product_id: Uuid,
    ) -> Result<(), AppError> {
        self.find_lot_product(&mut *conn, tenant_id, lot_id, lot_product_id).await?;
        if !self.lot_repo.remove_product(conn, tenant_id, lot_product_id).await? {
            return Err(AppError::NotFound("Produto do lote"));
        }
        Ok(())
    }

    pub async fn list_reservas(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        status: Option<ReservaStatus>,
    ) -> Result<Vec<ReservaView>, AppError> {
        self.find_lot(&mut *conn, tenant_id, lot_id, false).await?;
        self.lot_repo.list_reservas(conn, tenant_id, lot_id, None, status).await
    }

    pub async fn click_report(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<CatalogClickReport>, AppError> {
        self.lot_repo.click_report(conn, tenant_id).await
    }

    // =========================================================================
    //  VITRINE DA CLIENTE
    // =========================================================================

    pub async fn list_open_lots(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Lot>, AppError> {
        self.lot_repo.list_lots(conn, tenant_id, Some(LotStatus::Aberto)).await
    }

    /// A cliente só enxerga lotes que já saíram do rascunho
    pub async fn get_visible_lot(&self, conn: &mut PgConnection, tenant_id: Uuid, lot_id: Uuid) -> Result<LotDetail, AppError> {
        let detail = self.get_lot(conn, tenant_id, lot_id).await?;
        if detail.lot.status == LotStatus::Rascunho {
            return Err(AppError::NotFound("Lote"));
        }
        Ok(detail)
    }

    pub async fn record_click(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Option<Uuid>,
        product_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        self.find_lot(&mut *conn, tenant_id, lot_id, false).await?;
        self.lot_repo.record_click(conn, tenant_id, lot_id, client_id, product_id).await
    }

    /// Cria ou ajusta a reserva. A linha do lote fica travada até o commit,
    /// então duas clientes não passam juntas do limite do produto.
    pub async fn reserve(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
        payload: &ReservePayload,
    ) -> Result<Reserva, AppError> {
        if payload.quantidade < 1 {
            return Err(AppError::InvalidField("quantidade deve ser no mínimo 1".into()));
        }

        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, true).await?;
        ensure_open(&lot)?;

        let lot_product = self
            .find_lot_product(&mut *conn, tenant_id, lot_id, payload.lot_product_id)
            .await?;

        if let Some(max) = lot_product.max_quantity {
            let others = self
                .lot_repo
                .reserved_by_others(&mut *conn, lot_product.id, client_id)
                .await?;
            check_availability(max, others, payload.quantidade)?;
        }

        self.lot_repo
            .upsert_reserva(conn, tenant_id, lot_id, client_id, lot_product.id, payload.quantidade)
            .await
    }

    pub async fn cancel_reserva(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
        reserva_id: Uuid,
    ) -> Result<(), AppError> {
        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, false).await?;
        ensure_open(&lot)?;

        if !self.lot_repo.cancel_reserva(conn, tenant_id, reserva_id, client_id).await? {
            return Err(AppError::NotFound("Reserva"));
        }
        Ok(())
    }

    pub async fn my_reservas(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<ReservaView>, AppError> {
        self.lot_repo
            .list_reservas(conn, tenant_id, lot_id, Some(client_id), Some(ReservaStatus::Ativa))
            .await
    }

    // =========================================================================
    //  CHECKOUT (reservas -> romaneio)
    // =========================================================================

    /// Fecha as reservas ativas da cliente no lote em um romaneio novo.
    /// Tudo roda na transação de quem chama: sem commit, nada acontece.
    pub async fn checkout(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        client: Client,
        coupon_code: Option<&str>,
    ) -> Result<RomaneioDetail, AppError> {
        let lot = self.find_lot(&mut *conn, tenant_id, lot_id, true).await?;
        if !matches!(lot.status, LotStatus::Aberto | LotStatus::Fechado) {
            return Err(AppError::BusinessRule(format!(
                "O lote está {} e não aceita fechamento de pedido.",
                lot.status.as_str()
            )));
        }

        // 1. Trava as reservas da cliente
        let reservas = self
            .lot_repo
            .lock_active_reservas(&mut *conn, tenant_id, lot_id, client.id)
            .await?;
        if reservas.is_empty() {
            return Err(AppError::BusinessRule("Nenhuma reserva ativa neste lote.".into()));
        }

        // 2. Linhas do romaneio (snapshot do preço do lote)
        let lines: Vec<Decimal> = reservas
            .iter()
            .map(|r| line_total(r.quantidade, r.valor_unitario))
            .collect();
        let subtotal: Decimal = lines.iter().copied().sum();

        // 3. Cupom (travado até o commit para o limite de uso valer)
        let code = coupon_code.map(str::trim).filter(|c| !c.is_empty());
        let (desconto, applied_code) = match code {
            Some(code) => {
                let coupon = self
                    .marketing_repo
                    .find_coupon_by_code(&mut *conn, tenant_id, code, true)
                    .await?
                    .ok_or_else(|| AppError::CouponRejected(format!("cupom {} não existe", code)))?;
                let desconto = apply_coupon(&coupon, subtotal, Utc::now())?;
                self.marketing_repo.increment_coupon_usage(&mut *conn, coupon.id).await?;
                (desconto, Some(coupon.code))
            }
            None => (Decimal::ZERO, None),
        };

        let totals = RomaneioTotals::from_line_totals(lines.iter().copied(), desconto, Decimal::ZERO);

        // 4. Número sequencial + cabeçalho
        let numero = self.romaneio_repo.next_numero(&mut *conn, tenant_id).await?;
        let header = self
            .romaneio_repo
            .create_romaneio(&mut *conn, tenant_id, lot_id, client.id, numero, &totals, applied_code.as_deref())
            .await?;

        // 5. Itens
        let mut items = Vec::with_capacity(reservas.len());
        for (reserva, valor_total) in reservas.iter().zip(lines) {
            let item = NewRomaneioItem {
                product_id: reserva.product_id,
                product_name: &reserva.product_name,
                image_url: reserva.image_url.as_deref(),
                quantidade: reserva.quantidade,
                valor_unitario: reserva.valor_unitario,
                valor_total,
            };
            items.push(self.romaneio_repo.add_item(&mut *conn, tenant_id, header.id, &item).await?);
        }

        // 6. Reservas fechadas
        let ids: Vec<Uuid> = reservas.iter().map(|r| r.id).collect();
        self.lot_repo.close_reservas(&mut *conn, &ids).await?;

        tracing::info!(
            "🧾 Romaneio #{} gerado para a cliente {} ({} itens, total {})",
            header.numero,
            client.id,
            items.len(),
            header.total
        );

        Ok(RomaneioDetail { header, lot_name: lot.name, client, items })
    }

    // --- Helpers ---

    async fn find_lot(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        for_update: bool,
    ) -> Result<Lot, AppError> {
        self.lot_repo
            .find_lot(conn, tenant_id, lot_id, for_update)
            .await?
            .ok_or(AppError::NotFound("Lote"))
    }

    async fn find_lot_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        lot_id: Uuid,
        lot_product_id: Uuid,
    ) -> Result<LotProduct, AppError> {
        self.lot_repo
            .find_lot_product(conn, tenant_id, lot_product_id)
            .await?
            .filter(|lp| lp.lot_id == lot_id)
            .ok_or(AppError::NotFound("Produto do lote"))
    }
}

fn ensure_open(lot: &Lot) -> Result<(), AppError> {
    if lot.status != LotStatus::Aberto {
        return Err(AppError::BusinessRule(format!(
            "O lote está {} e não aceita reservas.",
            lot.status.as_str()
        )));
    }
    Ok(())
}

/// Confere o limite do produto no lote contando o que as outras já reservaram
fn check_availability(max_quantity: i32, reserved_by_others: i64, wanted: i32) -> Result<(), AppError> {
    let available = i64::from(max_quantity) - reserved_by_others;
    if i64::from(wanted) > available {
        return Err(AppError::BusinessRule(format!(
            "Só restam {} unidade(s) deste produto.",
            available.max(0)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lot(status: LotStatus) -> Lot {
        Lot {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            name: "Lote de Outono".into(),
            description: None,
            status,
            opens_at: None,
            closes_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_open_lots_take_reservations() {
        assert!(ensure_open(&lot(LotStatus::Aberto)).is_ok());
        assert!(matches!(ensure_open(&lot(LotStatus::Fechado)), Err(AppError::BusinessRule(_))));
        assert!(ensure_open(&lot(LotStatus::Rascunho)).is_err());
    }

    #[test]
    fn availability_counts_other_clients() {
        assert!(check_availability(5, 3, 2).is_ok());
        assert!(check_availability(5, 3, 3).is_err());
        assert!(check_availability(5, 7, 1).is_err());
    }

    #[test]
    fn availability_message_never_negative() {
        let err = check_availability(2, 5, 1).unwrap_err();
        assert_eq!(err.to_string(), "Regra de negócio: Só restam 0 unidade(s) deste produto.");
    }
}
