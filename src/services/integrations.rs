// src/services/integrations.rs
//
// Clientes HTTP dos provedores externos. Cada chamada devolve
// `Result<_, IntegrationError>`; o AppError converte para 502.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod melhor_envio;
pub mod mercado_pago;
pub mod viacep;
pub mod whatsapp_gateway;

pub use melhor_envio::MelhorEnvioClient;
pub use mercado_pago::MercadoPagoClient;
pub use viacep::ViaCepClient;
pub use whatsapp_gateway::{HttpWhatsAppGateway, MessageGateway};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("o provedor respondeu {status}: {message}")]
    Api { status: u16, message: String },

    #[error("falha de comunicação com o provedor: {0}")]
    Http(#[from] reqwest::Error),
}

/// Lê a resposta: 2xx vira `T`, o resto vira `IntegrationError::Api`
/// com a mensagem que o provedor mandou (campo `message` ou `error`).
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "erro"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "sem detalhes".to_string()
    } else {
        trimmed.chars().take(300).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::error_message;

    #[test]
    fn error_message_prefers_provider_fields() {
        assert_eq!(error_message(r#"{"message":"invalid token"}"#), "invalid token");
        assert_eq!(error_message(r#"{"error":"Unauthenticated."}"#), "Unauthenticated.");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("  "), "sem detalhes");
    }
}
