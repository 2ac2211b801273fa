// src/services/integrations/melhor_envio.rs

use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{
    read_json,
    viacep::{cep_digits, CepAddress},
    IntegrationError,
};

pub const MELHOR_ENVIO_API: &str = "https://melhorenvio.com.br";
pub const MELHOR_ENVIO_SANDBOX: &str = "https://sandbox.melhorenvio.com.br";

#[derive(Clone)]
pub struct MelhorEnvioClient {
    http: Client,
    base_url: String,
    token: String,
    user_agent: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Package {
    pub height: u32,
    pub width: u32,
    pub length: u32,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
struct PostalCode<'a> {
    postal_code: &'a str,
}

#[derive(Debug, Serialize)]
struct QuoteOptions {
    insurance_value: Decimal,
    receipt: bool,
    own_hand: bool,
}

#[derive(Debug, Serialize)]
struct QuoteRequest<'a> {
    from: PostalCode<'a>,
    to: PostalCode<'a>,
    package: Package,
    options: QuoteOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Company {
    pub name: String,
}

// Cada serviço de entrega cotado. Serviços indisponíveis vêm com `error`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FreightOption {
    pub id: i64,
    pub name: String,
    pub price: Option<String>,
    pub delivery_time: Option<i32>,
    pub company: Option<Company>,
    pub error: Option<String>,
}

impl FreightOption {
    pub fn price_decimal(&self) -> Option<Decimal> {
        self.price.as_deref().and_then(|p| p.parse().ok())
    }
}

// Remetente ou destinatário da etiqueta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelParty {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub document: Option<String>,
    pub address: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state_abbr: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelProduct {
    pub name: String,
    pub quantity: i32,
    pub unitary_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelRequest {
    pub service: i64,
    pub from: LabelParty,
    pub to: LabelParty,
    pub products: Vec<LabelProduct>,
    pub volumes: Vec<Package>,
    pub options: LabelOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelOptions {
    pub insurance_value: Decimal,
    pub receipt: bool,
    pub own_hand: bool,
    pub non_commercial: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItem {
    pub id: String,
    pub protocol: Option<String>,
    pub status: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingInfo {
    pub status: Option<String>,
    pub tracking: Option<String>,
    pub melhorenvio_tracking: Option<String>,
}

#[derive(Debug, Serialize)]
struct TrackingRequest<'a> {
    orders: &'a [String],
}

impl MelhorEnvioClient {
    pub fn new(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: MELHOR_ENVIO_API.to_string(),
            token: token.into(),
            user_agent: "Artea (contato@artea.app)".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // A API exige Accept e User-Agent com contato em todas as chamadas
    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
    }

    pub async fn quote_freight(
        &self,
        from_cep: &str,
        to_cep: &str,
        package: Package,
        insurance_value: Decimal,
    ) -> Result<Vec<FreightOption>, IntegrationError> {
        let from = cep_digits(from_cep)?;
        let to = cep_digits(to_cep)?;
        let body = QuoteRequest {
            from: PostalCode { postal_code: &from },
            to: PostalCode { postal_code: &to },
            package,
            options: QuoteOptions { insurance_value, receipt: false, own_hand: false },
        };

        let response = self
            .request(self.http.post(format!("{}/api/v2/me/shipment/calculate", self.base_url)))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    /// Coloca a etiqueta no carrinho do Melhor Envio (a compra é feita no painel)
    pub async fn generate_label(&self, label: &LabelRequest) -> Result<CartItem, IntegrationError> {
        let response = self
            .request(self.http.post(format!("{}/api/v2/me/cart", self.base_url)))
            .json(label)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn tracking(&self, order_ids: &[String]) -> Result<HashMap<String, TrackingInfo>, IntegrationError> {
        let response = self
            .request(self.http.post(format!("{}/api/v2/me/shipment/tracking", self.base_url)))
            .json(&TrackingRequest { orders: order_ids })
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn lookup_cep(&self, cep: &str) -> Result<CepAddress, IntegrationError> {
        let digits = cep_digits(cep)?;
        let response = self
            .request(self.http.get(format!("{}/api/v2/me/shipment/postal-code/{}", self.base_url, digits)))
            .send()
            .await?;
        let body: Value = read_json(response).await?;

        let field = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(CepAddress {
            cep: digits,
            street: field("address"),
            neighborhood: field("district"),
            city: field("city"),
            state: field("state_abbr"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn package() -> Package {
        Package { height: 4, width: 12, length: 17, weight: 0.3 }
    }

    #[tokio::test]
    async fn quote_returns_available_and_unavailable_services() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/me/shipment/calculate"))
            .and(header("authorization", "Bearer me-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "PAC", "price": "21.37", "delivery_time": 7, "company": { "name": "Correios" } },
                { "id": 3, "name": ".Package", "error": "Transportadora não atende este trecho." }
            ])))
            .mount(&server)
            .await;

        let options = MelhorEnvioClient::new(Client::new(), "me-token")
            .with_base_url(server.uri())
            .quote_freight("01001-000", "13560-250", package(), Decimal::new(15000, 2))
            .await
            .unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].price_decimal(), Some(Decimal::new(2137, 2)));
        assert!(options[1].error.is_some());
        assert_eq!(options[1].price_decimal(), None);
    }

    #[tokio::test]
    async fn invalid_cep_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = MelhorEnvioClient::new(Client::new(), "t")
            .with_base_url(server.uri())
            .quote_freight("123", "13560-250", package(), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn tracking_is_keyed_by_order_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/me/shipment/tracking"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ord-1": { "status": "posted", "tracking": "BR123456789BR", "melhorenvio_tracking": "ME1" }
            })))
            .mount(&server)
            .await;

        let tracking = MelhorEnvioClient::new(Client::new(), "t")
            .with_base_url(server.uri())
            .tracking(&["ord-1".to_string()])
            .await
            .unwrap();
        assert_eq!(tracking["ord-1"].tracking.as_deref(), Some("BR123456789BR"));
    }
}
