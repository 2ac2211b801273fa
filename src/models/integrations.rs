// src/models/integrations.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "integration_provider", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    MercadoPago,
    MelhorEnvio,
    Whatsapp,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::MercadoPago => "Mercado Pago",
            Provider::MelhorEnvio => "Melhor Envio",
            Provider::Whatsapp => "WhatsApp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider: Provider,

    // Credenciais livres por provedor (token, url do gateway, ambiente...)
    pub credentials: Value,
    pub is_active: bool,

    pub updated_at: DateTime<Utc>,
}

impl Integration {
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Cópia para resposta da API: valores das credenciais mascarados.
    pub fn redacted(mut self) -> Self {
        if let Value::Object(map) = &mut self.credentials {
            for value in map.values_mut() {
                if let Some(s) = value.as_str() {
                    let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
                    *value = Value::String(format!("****{}", tail));
                }
            }
        }
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertIntegrationPayload {
    pub credentials: Value,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// Payloads das integrações (pagamento e frete)

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightQuotePayload {
    pub to_cep: String,
    // Peso total em kg e dimensões da caixa em cm
    pub weight_kg: f64,
    pub width_cm: u32,
    pub height_cm: u32,
    pub length_cm: u32,
    pub insurance_value: Option<rust_decimal::Decimal>,
}

// Etiqueta do romaneio: serviço escolhido na cotação + caixa
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLabelPayload {
    pub service_id: i64,
    pub weight_kg: f64,
    pub width_cm: u32,
    pub height_cm: u32,
    pub length_cm: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPayload {
    pub orders: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn integration() -> Integration {
        Integration {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            provider: Provider::MercadoPago,
            credentials: json!({ "accessToken": "APP_USR-123456789", "empty": "" }),
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn credential_ignores_empty_values() {
        let i = integration();
        assert_eq!(i.credential("accessToken"), Some("APP_USR-123456789"));
        assert_eq!(i.credential("empty"), None);
        assert_eq!(i.credential("missing"), None);
    }

    #[test]
    fn redacted_keeps_only_last_four_chars() {
        let i = integration().redacted();
        assert_eq!(i.credentials["accessToken"], "****6789");
    }
}
