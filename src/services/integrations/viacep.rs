// src/services/integrations/viacep.rs

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_json, IntegrationError};

pub const VIACEP_API: &str = "https://viacep.com.br";

// Endereço normalizado, igual para qualquer fonte de consulta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CepAddress {
    pub cep: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    // O ViaCEP responde 200 com {"erro": true} para CEP inexistente
    #[serde(default)]
    erro: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct ViaCepClient {
    http: Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(http: Client) -> Self {
        Self { http, base_url: VIACEP_API.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn lookup(&self, cep: &str) -> Result<CepAddress, IntegrationError> {
        let digits = cep_digits(cep)?;
        let response = self
            .http
            .get(format!("{}/ws/{}/json/", self.base_url, digits))
            .send()
            .await?;
        let body: ViaCepResponse = read_json(response).await?;

        if body.erro.is_some() {
            return Err(IntegrationError::Api {
                status: 404,
                message: format!("CEP {} não encontrado", digits),
            });
        }

        Ok(CepAddress {
            cep: if body.cep.is_empty() { digits } else { body.cep.replace('-', "") },
            street: body.logradouro,
            neighborhood: body.bairro,
            city: body.localidade,
            state: body.uf,
        })
    }
}

/// CEP com exatamente 8 dígitos
pub fn cep_digits(cep: &str) -> Result<String, IntegrationError> {
    let digits: String = cep.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(IntegrationError::Api {
            status: 400,
            message: format!("CEP inválido: {}", cep),
        });
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lookup_maps_viacep_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/01001000/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cep": "01001-000",
                "logradouro": "Praça da Sé",
                "bairro": "Sé",
                "localidade": "São Paulo",
                "uf": "SP"
            })))
            .mount(&server)
            .await;

        let address = ViaCepClient::new(Client::new())
            .with_base_url(server.uri())
            .lookup("01001-000")
            .await
            .unwrap();

        assert_eq!(address.cep, "01001000");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");
    }

    #[tokio::test]
    async fn unknown_cep_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999999/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "erro": "true" })))
            .mount(&server)
            .await;

        let err = ViaCepClient::new(Client::new())
            .with_base_url(server.uri())
            .lookup("99999-999")
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::Api { status: 404, .. }));
    }

    #[test]
    fn cep_must_have_eight_digits() {
        assert_eq!(cep_digits("13.560-250").unwrap(), "13560250");
        assert!(cep_digits("1234").is_err());
    }
}
