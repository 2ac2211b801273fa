// src/services/romaneio_service.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::RomaneioTotals,
        pix::{render_qr_png, PixPayload},
    },
    db::{ClientRepository, FinanceRepository, LotRepository, RomaneioRepository, SettingsRepository},
    models::{
        catalog::Client,
        finance::TransactionKind,
        integrations::GenerateLabelPayload,
        romaneio::{
            PixChargeResponse, Romaneio, RomaneioDetail, RomaneioFilter, RomaneioPdfResponse, RomaneioStatus,
            UpdateRomaneioStatusPayload,
        },
        settings::CompanySettings,
        whatsapp::WhatsAppMessage,
    },
    services::{
        integration_service::{sender_party, IntegrationService},
        integrations::{
            melhor_envio::{CartItem, LabelOptions, LabelParty, LabelProduct, LabelRequest, Package},
            mercado_pago::{Payment, Preference, PreferenceItem},
            HttpWhatsAppGateway,
        },
        romaneio_pdf::{brl, RomaneioDocument, RomaneioPdfRenderer},
        whatsapp_service::WhatsAppService,
    },
};

/// Documento pronto e gateway resolvido; o envio acontece fora da transação
pub struct PdfDelivery {
    pub document: RomaneioDocument,
    pub gateway: HttpWhatsAppGateway,
}

#[derive(Clone)]
pub struct RomaneioService {
    romaneio_repo: RomaneioRepository,
    lot_repo: LotRepository,
    client_repo: ClientRepository,
    finance_repo: FinanceRepository,
    settings_repo: SettingsRepository,
    renderer: RomaneioPdfRenderer,
    whatsapp: WhatsAppService,
    integrations: IntegrationService,
}

impl RomaneioService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        romaneio_repo: RomaneioRepository,
        lot_repo: LotRepository,
        client_repo: ClientRepository,
        finance_repo: FinanceRepository,
        settings_repo: SettingsRepository,
        renderer: RomaneioPdfRenderer,
        whatsapp: WhatsAppService,
        integrations: IntegrationService,
    ) -> Self {
        Self {
            romaneio_repo,
            lot_repo,
            client_repo,
            finance_repo,
            settings_repo,
            renderer,
            whatsapp,
            integrations,
        }
    }

    /// Lista da loja (admin) ou só da cliente (`client_id`)
    pub async fn list(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        filter: &RomaneioFilter,
        client_id: Option<Uuid>,
    ) -> Result<Vec<Romaneio>, AppError> {
        self.romaneio_repo.list_romaneios(conn, tenant_id, filter, client_id).await
    }

    /// Romaneio completo. Com `client_id`, o romaneio precisa ser dela.
    pub async fn detail(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<RomaneioDetail, AppError> {
        let header = self.find(&mut *conn, tenant_id, id, false).await?;
        if client_id.is_some_and(|c| c != header.client_id) {
            return Err(AppError::NotFound("Romaneio"));
        }

        let lot_name = self
            .lot_repo
            .find_lot(&mut *conn, tenant_id, header.lot_id, false)
            .await?
            .map(|l| l.name)
            .unwrap_or_default();
        let client = self
            .client_repo
            .find_client(&mut *conn, tenant_id, header.client_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        let items = self.romaneio_repo.list_items(conn, tenant_id, id).await?;

        Ok(RomaneioDetail { header, lot_name, client, items })
    }

    /// Muda o status. Ao virar PAGO a receita entra no caixa na mesma transação.
    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        payload: &UpdateRomaneioStatusPayload,
    ) -> Result<Romaneio, AppError> {
        let current = self.find(&mut *conn, tenant_id, id, true).await?;
        let next = payload.status;

        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let tracking = payload.tracking_code.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let updated = self
            .romaneio_repo
            .update_status(&mut *conn, tenant_id, id, next, tracking)
            .await?;

        if next == RomaneioStatus::Pago {
            let description = format!("Romaneio #{}", updated.numero);
            self.finance_repo
                .create_transaction(
                    &mut *conn,
                    tenant_id,
                    TransactionKind::Receita,
                    &description,
                    Some("Vendas"),
                    updated.total,
                    Utc::now().date_naive(),
                    Some(updated.id),
                )
                .await?;
            tracing::info!("💰 Romaneio #{} pago: receita de {} lançada", updated.numero, updated.total);
        }

        Ok(updated)
    }

    /// Frete só muda enquanto o romaneio está pendente; o total é recalculado
    pub async fn update_frete(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        frete: Decimal,
    ) -> Result<Romaneio, AppError> {
        if frete.is_sign_negative() {
            return Err(AppError::InvalidField("frete não pode ser negativo".into()));
        }

        let current = self.find(&mut *conn, tenant_id, id, true).await?;
        if current.status != RomaneioStatus::Pendente {
            return Err(AppError::BusinessRule("O frete só pode mudar em romaneio pendente.".into()));
        }

        let items = self.romaneio_repo.list_items(&mut *conn, tenant_id, id).await?;
        let totals = RomaneioTotals::from_items(&items, current.desconto, frete);
        self.romaneio_repo.update_frete(conn, tenant_id, id, &totals).await
    }

    // =========================================================================
    //  PIX
    // =========================================================================

    pub async fn pix_charge(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<PixChargeResponse, AppError> {
        let detail = self.detail(&mut *conn, tenant_id, id, client_id).await?;
        let settings = self.settings_repo.get_settings(conn, tenant_id).await?;

        let payload = pix_payload(&settings, &detail.header)?;
        let png = render_qr_png(&payload)?;

        Ok(PixChargeResponse {
            payload,
            amount: detail.header.total,
            qr_code_png_base64: STANDARD.encode(png),
        })
    }

    // =========================================================================
    //  PDF
    // =========================================================================

    /// Gera o PDF de um documento já carregado. Não usa conexão: o download
    /// das fotos e o layout não seguram transação aberta.
    pub async fn render_pdf(&self, document: RomaneioDocument) -> Result<(String, Vec<u8>), AppError> {
        let file_name = pdf_file_name(document.romaneio.numero);
        let bytes = self.renderer.render(document).await?;
        Ok((file_name, bytes))
    }

    pub async fn render_pdf_base64(&self, document: RomaneioDocument) -> Result<RomaneioPdfResponse, AppError> {
        let file_name = pdf_file_name(document.romaneio.numero);
        let pdf_base64 = self.renderer.render_base64(document).await?;
        Ok(RomaneioPdfResponse { file_name, pdf_base64 })
    }

    /// Tudo o que o envio do PDF precisa do banco: documento e gateway da loja
    pub async fn prepare_pdf_delivery(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<PdfDelivery, AppError> {
        let document = self.load_document(&mut *conn, tenant_id, id).await?;
        let gateway = self.whatsapp.gateway_for(conn, tenant_id).await?;
        Ok(PdfDelivery { document, gateway })
    }

    /// Manda o PDF para o WhatsApp da cliente
    pub async fn send_pdf_whatsapp(&self, tenant_id: Uuid, delivery: PdfDelivery) -> Result<WhatsAppMessage, AppError> {
        let PdfDelivery { document, gateway } = delivery;
        let phone = document.client.phone.clone();
        let caption = pdf_caption(&document);
        let file_name = pdf_file_name(document.romaneio.numero);
        let pdf_base64 = self.renderer.render_base64(document).await?;

        self.whatsapp
            .send_file(&gateway, tenant_id, &phone, &file_name, &pdf_base64, Some(&caption))
            .await
    }

    pub async fn load_document(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<RomaneioDocument, AppError> {
        let detail = self.detail(&mut *conn, tenant_id, id, None).await?;
        let settings = self.settings_repo.get_settings(conn, tenant_id).await?;

        // Sem PIX configurado o romaneio sai sem o bloco de pagamento
        let pix_payload = match pix_payload(&settings, &detail.header) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!("⚠️ Romaneio #{} sem PIX: {}", detail.header.numero, e);
                None
            }
        };

        Ok(RomaneioDocument {
            settings,
            romaneio: detail.header,
            lot_name: detail.lot_name,
            client: detail.client,
            items: detail.items,
            pix_payload,
        })
    }

    // =========================================================================
    //  MERCADO PAGO E MELHOR ENVIO
    // =========================================================================

    /// Link de pagamento (Checkout Pro) com os itens do romaneio
    pub async fn payment_link(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Preference, AppError> {
        let detail = self.detail(&mut *conn, tenant_id, id, None).await?;
        ensure_pending(&detail.header)?;
        let client = self.integrations.mercado_pago(conn, tenant_id).await?;

        let items = preference_items(&detail);
        Ok(client.create_preference(detail.header.id, &items).await?)
    }

    /// Cobrança PIX dinâmica do Mercado Pago (a baixa vem pelo pagamento)
    pub async fn mercado_pago_pix(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<Payment, AppError> {
        let detail = self.detail(&mut *conn, tenant_id, id, None).await?;
        ensure_pending(&detail.header)?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;

        let payer_email = detail
            .client
            .email
            .as_deref()
            .or(settings.email.as_deref())
            .ok_or_else(|| AppError::InvalidField("A cliente ou a loja precisa de um e-mail para o PIX.".into()))?
            .to_string();

        let client = self.integrations.mercado_pago(conn, tenant_id).await?;
        let description = format!("Romaneio #{}", detail.header.numero);
        let payment = client
            .create_pix_payment(detail.header.id, detail.header.total, &description, &payer_email)
            .await?;
        Ok(payment)
    }

    /// Coloca a etiqueta do romaneio no carrinho do Melhor Envio
    pub async fn generate_label(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
        payload: &GenerateLabelPayload,
    ) -> Result<CartItem, AppError> {
        let detail = self.detail(&mut *conn, tenant_id, id, None).await?;
        if detail.header.status != RomaneioStatus::Pago {
            return Err(AppError::BusinessRule("A etiqueta só sai para romaneio pago.".into()));
        }

        let (client, integration) = self.integrations.melhor_envio(conn, tenant_id).await?;
        let from = sender_party(&integration)?;
        let to = recipient_party(&detail.client)?;
        let volume = Package {
            height: payload.height_cm,
            width: payload.width_cm,
            length: payload.length_cm,
            weight: payload.weight_kg,
        };
        let products = detail
            .items
            .iter()
            .map(|i| LabelProduct {
                name: i.product_name.clone(),
                quantity: i.quantidade,
                unitary_value: i.valor_unitario,
            })
            .collect();

        let label = LabelRequest {
            service: payload.service_id,
            from,
            to,
            products,
            volumes: vec![volume],
            options: LabelOptions {
                insurance_value: detail.header.subtotal,
                receipt: false,
                own_hand: false,
                non_commercial: true,
            },
        };

        let cart = client.generate_label(&label).await?;
        tracing::info!("🏷️ Etiqueta {} criada para o romaneio #{}", cart.id, detail.header.numero);
        Ok(cart)
    }

    async fn find(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid, for_update: bool) -> Result<Romaneio, AppError> {
        self.romaneio_repo
            .find_romaneio(conn, tenant_id, id, for_update)
            .await?
            .ok_or(AppError::NotFound("Romaneio"))
    }
}

/// Payload "copia e cola" do romaneio com os dados PIX da loja
pub fn pix_payload(settings: &CompanySettings, romaneio: &Romaneio) -> Result<String, AppError> {
    let key = settings
        .pix_key
        .as_deref()
        .ok_or_else(|| AppError::PixInvalid("chave PIX não configurada".into()))?;

    PixPayload::new(
        key,
        settings.company_name.as_deref().unwrap_or_default(),
        settings.pix_city.as_deref().unwrap_or_default(),
    )
    .with_amount(romaneio.total)
    .with_txid(format!("ROM{}", romaneio.numero))
    .with_description(format!("Romaneio {}", romaneio.numero))
    .encode()
}

pub fn pdf_file_name(numero: i32) -> String {
    format!("romaneio-{}.pdf", numero)
}

fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

fn pdf_caption(document: &RomaneioDocument) -> String {
    format!(
        "Olá {}! Segue o seu romaneio #{} do lote {}. Total a pagar: {}",
        first_name(&document.client.name),
        document.romaneio.numero,
        document.lot_name,
        brl(document.romaneio.total)
    )
}

fn ensure_pending(romaneio: &Romaneio) -> Result<(), AppError> {
    if romaneio.status != RomaneioStatus::Pendente {
        return Err(AppError::BusinessRule(format!(
            "O romaneio #{} está {} e não aceita nova cobrança.",
            romaneio.numero,
            romaneio.status.as_str()
        )));
    }
    Ok(())
}

// Itens do link de pagamento. Desconto e frete viram uma linha cada,
// porque o Checkout Pro não tem campo de desconto por preferência.
fn preference_items(detail: &RomaneioDetail) -> Vec<PreferenceItem> {
    let header = &detail.header;
    if header.desconto.is_zero() {
        let mut items: Vec<PreferenceItem> = detail
            .items
            .iter()
            .map(|i| PreferenceItem {
                title: i.product_name.clone(),
                quantity: i.quantidade,
                unit_price: i.valor_unitario,
                currency_id: "BRL",
            })
            .collect();
        if header.frete > Decimal::ZERO {
            items.push(PreferenceItem {
                title: "Frete".into(),
                quantity: 1,
                unit_price: header.frete,
                currency_id: "BRL",
            });
        }
        return items;
    }

    // Com desconto, uma linha só com o total a pagar
    vec![PreferenceItem {
        title: format!("Romaneio #{}", header.numero),
        quantity: 1,
        unit_price: header.total,
        currency_id: "BRL",
    }]
}

fn recipient_party(client: &Client) -> Result<LabelParty, AppError> {
    let missing = || AppError::BusinessRule(format!("Endereço de entrega da cliente {} incompleto.", client.name));
    Ok(LabelParty {
        name: client.name.clone(),
        phone: client.phone.clone(),
        email: client.email.clone(),
        document: client.cpf.clone(),
        address: client.street.clone().ok_or_else(missing)?,
        number: client.number.clone().unwrap_or_else(|| "S/N".into()),
        complement: client.complement.clone(),
        district: client.neighborhood.clone().ok_or_else(missing)?,
        city: client.city.clone().ok_or_else(missing)?,
        state_abbr: client.state.clone().ok_or_else(missing)?,
        postal_code: client.cep.clone().ok_or_else(missing)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pix::verify_checksum;
    use crate::models::romaneio::RomaneioItem;

    fn romaneio(status: RomaneioStatus) -> Romaneio {
        Romaneio {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            lot_id: Uuid::nil(),
            client_id: Uuid::nil(),
            numero: 42,
            status,
            subtotal: Decimal::new(15980, 2),
            desconto: Decimal::ZERO,
            frete: Decimal::new(2000, 2),
            total: Decimal::new(17980, 2),
            coupon_code: None,
            tracking_code: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn client() -> Client {
        Client {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            user_id: None,
            name: "Ana Souza".into(),
            phone: "11987654321".into(),
            email: None,
            cpf: None,
            cep: Some("01310100".into()),
            street: Some("Av. Paulista".into()),
            number: None,
            complement: None,
            neighborhood: Some("Bela Vista".into()),
            city: Some("São Paulo".into()),
            state: Some("SP".into()),
            notes: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn detail(desconto: Decimal) -> RomaneioDetail {
        let mut header = romaneio(RomaneioStatus::Pendente);
        header.desconto = desconto;
        header.total = header.subtotal - desconto + header.frete;
        let item = RomaneioItem {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            romaneio_id: Uuid::nil(),
            product_id: Uuid::nil(),
            product_name: "Anel Solitário".into(),
            image_url: None,
            quantidade: 2,
            valor_unitario: Decimal::new(7990, 2),
            valor_total: Decimal::new(15980, 2),
        };
        RomaneioDetail { header, lot_name: "Outono".into(), client: client(), items: vec![item] }
    }

    #[test]
    fn pix_payload_uses_company_settings_and_total() {
        let mut settings = CompanySettings::empty(Uuid::nil());
        settings.pix_key = Some("joias@artea.com.br".into());
        settings.company_name = Some("Artea Joias".into());
        settings.pix_city = Some("São Paulo".into());

        let payload = pix_payload(&settings, &romaneio(RomaneioStatus::Pendente)).unwrap();
        assert!(verify_checksum(&payload));
        assert!(payload.contains("5406179.80"));
        assert!(payload.contains("ROM42"));
    }

    #[test]
    fn pix_payload_requires_key() {
        let settings = CompanySettings::empty(Uuid::nil());
        assert!(matches!(
            pix_payload(&settings, &romaneio(RomaneioStatus::Pendente)),
            Err(AppError::PixInvalid(_))
        ));
    }

    #[test]
    fn preference_lists_items_and_freight_without_discount() {
        let items = preference_items(&detail(Decimal::ZERO));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].title, "Frete");
        assert_eq!(items[1].unit_price, Decimal::new(2000, 2));
    }

    #[test]
    fn preference_collapses_to_total_with_discount() {
        let items = preference_items(&detail(Decimal::new(1000, 2)));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, Decimal::new(16980, 2));
    }

    #[test]
    fn recipient_needs_full_address() {
        let party = recipient_party(&client()).unwrap();
        assert_eq!(party.number, "S/N");
        assert_eq!(party.postal_code, "01310100");

        let mut c = client();
        c.city = None;
        assert!(matches!(recipient_party(&c), Err(AppError::BusinessRule(_))));
    }

    #[test]
    fn only_pending_romaneio_takes_new_charge() {
        assert!(ensure_pending(&romaneio(RomaneioStatus::Pendente)).is_ok());
        assert!(ensure_pending(&romaneio(RomaneioStatus::Pago)).is_err());
    }

    #[test]
    fn file_name_and_first_name() {
        assert_eq!(pdf_file_name(7), "romaneio-7.pdf");
        assert_eq!(first_name("Ana Souza"), "Ana");
    }

    #[tokio::test]
    async fn pdf_renders_without_holding_a_database_connection() {
        use crate::db::{IntegrationRepository, MarketingRepository, WhatsAppRepository};
        use sqlx::postgres::PgPoolOptions;

        // Pool que nunca conecta: qualquer acesso ao banco apareceria em size()
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://artea@127.0.0.1:1/artea")
            .unwrap();
        let http = reqwest::Client::new();
        let integration_repo = IntegrationRepository::new(pool.clone());
        let whatsapp = WhatsAppService::new(
            pool.clone(),
            http.clone(),
            integration_repo.clone(),
            WhatsAppRepository::new(pool.clone()),
            MarketingRepository::new(pool.clone()),
            ClientRepository::new(pool.clone()),
        );
        let fonts = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/fonts");
        let service = RomaneioService::new(
            RomaneioRepository::new(pool.clone()),
            LotRepository::new(pool.clone()),
            ClientRepository::new(pool.clone()),
            FinanceRepository::new(pool.clone()),
            SettingsRepository::new(pool.clone()),
            RomaneioPdfRenderer::new(http.clone(), fonts),
            whatsapp,
            IntegrationService::new(integration_repo, http),
        );

        let detail = detail(Decimal::ZERO);
        let document = RomaneioDocument {
            settings: CompanySettings::empty(Uuid::nil()),
            romaneio: detail.header,
            lot_name: detail.lot_name,
            client: detail.client,
            items: detail.items,
            pix_payload: None,
        };
        assert_eq!(pdf_caption(&document), "Olá Ana! Segue o seu romaneio #42 do lote Outono. Total a pagar: R$ 179,80");

        let (file_name, bytes) = service.render_pdf(document).await.unwrap();
        assert_eq!(file_name, "romaneio-42.pdf");
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(pool.size(), 0);
    }
}
