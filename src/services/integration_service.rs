// src/services/integration_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::IntegrationRepository,
    models::integrations::{FreightQuotePayload, Integration, Provider, UpsertIntegrationPayload},
    services::integrations::{
        melhor_envio::{FreightOption, LabelParty, Package, TrackingInfo, MELHOR_ENVIO_SANDBOX},
        mercado_pago::{MercadoPagoAccount, Payment},
        viacep::CepAddress,
        MelhorEnvioClient, MercadoPagoClient, ViaCepClient,
    },
};

#[derive(Clone)]
pub struct IntegrationService {
    integration_repo: IntegrationRepository,
    http: reqwest::Client,
    viacep: ViaCepClient,
}

impl IntegrationService {
    pub fn new(integration_repo: IntegrationRepository, http: reqwest::Client) -> Self {
        let viacep = ViaCepClient::new(http.clone());
        Self { integration_repo, http, viacep }
    }

    // =========================================================================
    //  CREDENCIAIS
    // =========================================================================

    pub async fn upsert(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        provider: Provider,
        payload: &UpsertIntegrationPayload,
    ) -> Result<Integration, AppError> {
        if !payload.credentials.is_object() {
            return Err(AppError::InvalidField("credentials deve ser um objeto".into()));
        }

        let saved = self
            .integration_repo
            .upsert(conn, tenant_id, provider, &payload.credentials, payload.is_active)
            .await?;
        tracing::info!("🔌 Integração {} atualizada para a loja {}", provider.label(), tenant_id);
        Ok(saved.redacted())
    }

    /// Lista para a tela de configuração: credenciais sempre mascaradas
    pub async fn list(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<Integration>, AppError> {
        let integrations = self.integration_repo.list(conn, tenant_id).await?;
        Ok(integrations.into_iter().map(Integration::redacted).collect())
    }

    async fn active(&self, conn: &mut PgConnection, tenant_id: Uuid, provider: Provider) -> Result<Integration, AppError> {
        self.integration_repo
            .find(conn, tenant_id, provider)
            .await?
            .filter(|i| i.is_active)
            .ok_or(AppError::IntegrationNotConfigured(provider.label()))
    }

    // =========================================================================
    //  MERCADO PAGO
    // =========================================================================

    pub async fn mercado_pago(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<MercadoPagoClient, AppError> {
        let integration = self.active(conn, tenant_id, Provider::MercadoPago).await?;
        let token = integration
            .credential("accessToken")
            .ok_or(AppError::IntegrationNotConfigured(Provider::MercadoPago.label()))?;
        Ok(MercadoPagoClient::new(self.http.clone(), token))
    }

    pub async fn validate_mercado_pago(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<MercadoPagoAccount, AppError> {
        let client = self.mercado_pago(conn, tenant_id).await?;
        Ok(client.validate_credentials().await?)
    }

    pub async fn get_payment(&self, conn: &mut PgConnection, tenant_id: Uuid, payment_id: i64) -> Result<Payment, AppError> {
        let client = self.mercado_pago(conn, tenant_id).await?;
        Ok(client.get_payment(payment_id).await?)
    }

    // =========================================================================
    //  MELHOR ENVIO
    // =========================================================================

    /// Cliente do Melhor Envio + a integração (para ler CEP de origem e remetente)
    pub async fn melhor_envio(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
    ) -> Result<(MelhorEnvioClient, Integration), AppError> {
        let integration = self.active(conn, tenant_id, Provider::MelhorEnvio).await?;
        let token = integration
            .credential("token")
            .ok_or(AppError::IntegrationNotConfigured(Provider::MelhorEnvio.label()))?;

        let mut client = MelhorEnvioClient::new(self.http.clone(), token);
        if integration.credential("environment") == Some("sandbox") {
            client = client.with_base_url(MELHOR_ENVIO_SANDBOX);
        }
        Ok((client, integration))
    }

    pub async fn quote_freight(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &FreightQuotePayload,
    ) -> Result<Vec<FreightOption>, AppError> {
        let (client, integration) = self.melhor_envio(conn, tenant_id).await?;
        let from_cep = origin_cep(&integration)?;
        let package = Package {
            height: payload.height_cm,
            width: payload.width_cm,
            length: payload.length_cm,
            weight: payload.weight_kg,
        };

        let mut options = client
            .quote_freight(from_cep, &payload.to_cep, package, payload.insurance_value.unwrap_or(Decimal::ZERO))
            .await?;

        // Serviços que não atendem o destino voltam com `error`; o mais barato primeiro
        options.retain(|o| o.error.is_none());
        options.sort_by_key(FreightOption::price_decimal);
        Ok(options)
    }

    pub async fn tracking(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        orders: &[String],
    ) -> Result<HashMap<String, TrackingInfo>, AppError> {
        if orders.is_empty() {
            return Ok(HashMap::new());
        }
        let (client, _) = self.melhor_envio(conn, tenant_id).await?;
        Ok(client.tracking(orders).await?)
    }

    /// Consulta o CEP pelo Melhor Envio; se a loja não tem a integração
    /// ou a consulta falha, cai para o ViaCEP.
    pub async fn lookup_cep(&self, conn: &mut PgConnection, tenant_id: Uuid, cep: &str) -> Result<CepAddress, AppError> {
        match self.melhor_envio(conn, tenant_id).await {
            Ok((client, _)) => match client.lookup_cep(cep).await {
                Ok(address) => return Ok(address),
                Err(e) => tracing::warn!("⚠️ CEP {} falhou no Melhor Envio, tentando ViaCEP: {}", cep, e),
            },
            Err(AppError::IntegrationNotConfigured(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(self.viacep.lookup(cep).await?)
    }
}

/// CEP de origem dos envios, guardado nas credenciais (`originCep`)
pub fn origin_cep(integration: &Integration) -> Result<&str, AppError> {
    integration
        .credential("originCep")
        .ok_or_else(|| AppError::InvalidField("Configure o CEP de origem (originCep) no Melhor Envio.".into()))
}

/// Remetente da etiqueta, guardado nas credenciais (`sender`)
pub fn sender_party(integration: &Integration) -> Result<LabelParty, AppError> {
    let sender = integration
        .credentials
        .get("sender")
        .cloned()
        .unwrap_or(Value::Null);

    serde_json::from_value(sender)
        .map_err(|e| AppError::InvalidField(format!("Remetente do Melhor Envio incompleto: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn melhor_envio(credentials: Value) -> Integration {
        Integration {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            provider: Provider::MelhorEnvio,
            credentials,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn origin_cep_comes_from_credentials() {
        let i = melhor_envio(json!({ "token": "t", "originCep": "01001000" }));
        assert_eq!(origin_cep(&i).unwrap(), "01001000");
        assert!(origin_cep(&melhor_envio(json!({ "token": "t" }))).is_err());
    }

    #[test]
    fn sender_party_is_parsed_from_credentials() {
        let i = melhor_envio(json!({
            "sender": {
                "name": "Artea Joias", "phone": "11999990000", "email": null, "document": null,
                "address": "Rua Augusta", "number": "100", "complement": null,
                "district": "Consolação", "city": "São Paulo", "state_abbr": "SP", "postal_code": "01305000"
            }
        }));
        let sender = sender_party(&i).unwrap();
        assert_eq!(sender.name, "Artea Joias");
        assert_eq!(sender.state_abbr, "SP");

        assert!(matches!(sender_party(&melhor_envio(json!({}))), Err(AppError::InvalidField(_))));
    }
}
