// src/services/integrations/mercado_pago.rs

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{read_json, IntegrationError};

pub const MERCADO_PAGO_API: &str = "https://api.mercadopago.com";

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub currency_id: &'static str,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: &'a [PreferenceItem],
    external_reference: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Preference {
    pub id: String,
    pub init_point: Option<String>,
}

#[derive(Debug, Serialize)]
struct PixPaymentRequest<'a> {
    transaction_amount: Decimal,
    description: &'a str,
    payment_method_id: &'static str,
    external_reference: String,
    payer: Payer<'a>,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    email: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Payment {
    pub id: i64,
    pub status: String,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub external_reference: Option<String>,
    pub point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointOfInteraction {
    pub transaction_data: Option<TransactionData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionData {
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MercadoPagoAccount {
    pub id: i64,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(http: Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: MERCADO_PAGO_API.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Checkout Pro: link de pagamento para o romaneio
    pub async fn create_preference(
        &self,
        romaneio_id: Uuid,
        items: &[PreferenceItem],
    ) -> Result<Preference, IntegrationError> {
        let body = PreferenceRequest {
            items,
            external_reference: romaneio_id.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    /// Cobrança PIX dinâmica. A chave de idempotência é o id do romaneio,
    /// então repetir a chamada não gera uma segunda cobrança.
    pub async fn create_pix_payment(
        &self,
        romaneio_id: Uuid,
        amount: Decimal,
        description: &str,
        payer_email: &str,
    ) -> Result<Payment, IntegrationError> {
        let body = PixPaymentRequest {
            transaction_amount: amount,
            description,
            payment_method_id: "pix",
            external_reference: romaneio_id.to_string(),
            payer: Payer { email: payer_email },
        };
        let response = self
            .http
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", romaneio_id.to_string())
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get_payment(&self, payment_id: i64) -> Result<Payment, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        read_json(response).await
    }

    /// Testa o access token consultando a conta dona dele
    pub async fn validate_credentials(&self) -> Result<MercadoPagoAccount, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> MercadoPagoClient {
        MercadoPagoClient::new(Client::new(), "TEST-token").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn pix_payment_sends_idempotency_key_and_reads_qr_code() {
        let server = MockServer::start().await;
        let romaneio_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/v1/payments"))
            .and(header("authorization", "Bearer TEST-token"))
            .and(header("x-idempotency-key", romaneio_id.to_string().as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 123456,
                "status": "pending",
                "status_detail": "pending_waiting_transfer",
                "transaction_amount": 150.5,
                "external_reference": romaneio_id.to_string(),
                "point_of_interaction": {
                    "transaction_data": { "qr_code": "00020126...", "qr_code_base64": "iVBOR", "ticket_url": null }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payment = client(&server)
            .create_pix_payment(romaneio_id, Decimal::new(15050, 2), "Romaneio 42", "cliente@artea.local")
            .await
            .unwrap();

        assert_eq!(payment.id, 123456);
        assert_eq!(payment.status, "pending");
        let qr = payment.point_of_interaction.unwrap().transaction_data.unwrap().qr_code;
        assert_eq!(qr.as_deref(), Some("00020126..."));
    }

    #[tokio::test]
    async fn rejected_token_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "invalid access token", "error": "unauthorized", "status": 401
            })))
            .mount(&server)
            .await;

        let err = client(&server).validate_credentials().await.unwrap_err();
        match err {
            IntegrationError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid access token");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn preference_returns_checkout_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "pref-1", "init_point": "https://mp.test/checkout/pref-1"
            })))
            .mount(&server)
            .await;

        let items = [PreferenceItem {
            title: "Brinco Gota".into(),
            quantity: 2,
            unit_price: Decimal::new(4990, 2),
            currency_id: "BRL",
        }];
        let pref = client(&server).create_preference(Uuid::new_v4(), &items).await.unwrap();
        assert_eq!(pref.id, "pref-1");
        assert_eq!(pref.init_point.as_deref(), Some("https://mp.test/checkout/pref-1"));
    }
}
