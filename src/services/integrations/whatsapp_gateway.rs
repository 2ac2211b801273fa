// src/services/integrations/whatsapp_gateway.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{read_json, IntegrationError};

/// Quem de fato entrega a mensagem. O disparo em massa só conhece este trait.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_text(&self, phone: &str, text: &str) -> Result<(), IntegrationError>;

    async fn send_file(
        &self,
        phone: &str,
        file_name: &str,
        base64: &str,
        caption: Option<&str>,
    ) -> Result<(), IntegrationError>;
}

// Gateway HTTP configurado pela loja (credenciais `apiUrl`, `token`, `instance`)
#[derive(Clone)]
pub struct HttpWhatsAppGateway {
    http: Client,
    api_url: String,
    token: String,
    instance: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendText<'a> {
    number: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMedia<'a> {
    number: &'a str,
    mediatype: &'static str,
    mimetype: &'static str,
    file_name: &'a str,
    media: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

impl HttpWhatsAppGateway {
    pub fn new(http: Client, api_url: &str, token: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            instance: instance.into(),
        }
    }
}

#[async_trait]
impl MessageGateway for HttpWhatsAppGateway {
    async fn send_text(&self, phone: &str, text: &str) -> Result<(), IntegrationError> {
        let response = self
            .http
            .post(format!("{}/message/sendText/{}", self.api_url, self.instance))
            .header("apikey", &self.token)
            .json(&SendText { number: phone, text })
            .send()
            .await?;
        let _: Value = read_json(response).await?;
        Ok(())
    }

    async fn send_file(
        &self,
        phone: &str,
        file_name: &str,
        base64: &str,
        caption: Option<&str>,
    ) -> Result<(), IntegrationError> {
        let body = SendMedia {
            number: phone,
            mediatype: "document",
            mimetype: "application/pdf",
            file_name,
            media: base64,
            caption,
        };
        let response = self
            .http
            .post(format!("{}/message/sendMedia/{}", self.api_url, self.instance))
            .header("apikey", &self.token)
            .json(&body)
            .send()
            .await?;
        let _: Value = read_json(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_text_posts_to_instance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/loja1"))
            .and(header("apikey", "secret"))
            .and(body_partial_json(json!({ "number": "5511987654321", "text": "Olá Ana" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "key": { "id": "msg-1" } })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpWhatsAppGateway::new(Client::new(), &format!("{}/", server.uri()), "secret", "loja1");
        gateway.send_text("5511987654321", "Olá Ana").await.unwrap();
    }

    #[tokio::test]
    async fn send_file_sends_pdf_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendMedia/loja1"))
            .and(body_partial_json(json!({
                "mediatype": "document", "fileName": "romaneio-42.pdf", "media": "JVBERi0="
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpWhatsAppGateway::new(Client::new(), &server.uri(), "secret", "loja1");
        gateway
            .send_file("5511987654321", "romaneio-42.pdf", "JVBERi0=", Some("Seu romaneio"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gateway_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("instance disconnected"))
            .mount(&server)
            .await;

        let gateway = HttpWhatsAppGateway::new(Client::new(), &server.uri(), "secret", "loja1");
        let err = gateway.send_text("5511987654321", "oi").await.unwrap_err();
        assert!(matches!(err, IntegrationError::Api { status: 500, .. }));
    }
}
