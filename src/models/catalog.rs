// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// --- 1. Categorias (Anéis, Brincos, Colares...) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// --- 2. Coleções ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Colecao {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateColecaoPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub description: Option<String>,
}

// --- 3. Produtos (As peças) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub colecao_id: Option<Uuid>,

    pub sku: String,
    pub name: String,
    pub description: Option<String>,

    pub price: Decimal,
    pub cost: Decimal,

    pub image_url: Option<String>,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "required"))]
    pub sku: String,

    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub colecao_id: Option<Uuid>,

    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,

    #[validate(url(message = "invalid_url"))]
    pub image_url: Option<String>,
}

// Atualização parcial: só altera o que vier preenchido
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub colecao_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    #[validate(url(message = "invalid_url"))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

// Filtros da listagem de produtos (`?q=anel&categoryId=...&page=2`)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub colecao_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// --- 4. Clientes (As compradoras) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,

    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub cpf: Option<String>,

    pub cep: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,

    pub notes: Option<String>,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Endereço em uma linha, para o romaneio e etiqueta.
    pub fn address_line(&self) -> Option<String> {
        let street = self.street.as_deref()?;
        let mut line = street.to_string();
        if let Some(n) = &self.number {
            line.push_str(&format!(", {}", n));
        }
        if let Some(c) = &self.complement {
            line.push_str(&format!(" - {}", c));
        }
        if let Some(b) = &self.neighborhood {
            line.push_str(&format!(" - {}", b));
        }
        if let (Some(city), Some(uf)) = (&self.city, &self.state) {
            line.push_str(&format!(" - {}/{}", city, uf));
        }
        if let Some(cep) = &self.cep {
            line.push_str(&format!(" - CEP {}", cep));
        }
        Some(line)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    #[validate(length(min = 10, max = 20, message = "invalid_phone"))]
    pub phone: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[validate(length(equal = 11, message = "invalid_cpf"))]
    pub cpf: Option<String>,

    #[validate(length(equal = 8, message = "invalid_cep"))]
    pub cep: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2, message = "invalid_state"))]
    pub state: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFilter {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            user_id: None,
            name: "Ana".into(),
            phone: "11999990000".into(),
            email: None,
            cpf: None,
            cep: Some("01310100".into()),
            street: Some("Av. Paulista".into()),
            number: Some("1000".into()),
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

    #[test]
    fn address_line_joins_present_parts() {
        assert_eq!(
            client().address_line().as_deref(),
            Some("Av. Paulista, 1000 - Bela Vista - São Paulo/SP - CEP 01310100")
        );
    }

    #[test]
    fn address_line_requires_street() {
        let mut c = client();
        c.street = None;
        assert!(c.address_line().is_none());
    }
}
