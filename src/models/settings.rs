// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    // Ocultamos o ID interno, pois o contexto (Header) já define a loja
    #[serde(skip_serializing)]
    pub tenant_id: Uuid,

    pub company_name: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    // Dados do recebedor PIX (o nome sai de company_name)
    pub pix_key: Option<String>,
    pub pix_city: Option<String>,

    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub primary_color: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanySettings {
    pub fn empty(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            company_name: None,
            document_number: None,
            address: None,
            phone: None,
            email: None,
            pix_key: None,
            pix_city: None,
            logo_url: None,
            icon_url: None,
            primary_color: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub company_name: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub pix_key: Option<String>,
    #[validate(length(max = 15, message = "A cidade do PIX tem no máximo 15 caracteres."))]
    pub pix_city: Option<String>,
    #[validate(length(equal = 7, message = "Cor no formato #RRGGBB."))]
    pub primary_color: Option<String>,
}

// Buckets de armazenamento de arquivos (logo, ícone, fotos de produto)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBucket {
    ProductImages,
    CompanyAssets,
}

impl StorageBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBucket::ProductImages => "product-images",
            StorageBucket::CompanyAssets => "company-assets",
        }
    }
}

// Arquivo de marca que vai direto para as configurações
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Logo,
    Icon,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub bucket: StorageBucket,
    pub asset: Option<AssetKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub path: String,
    pub public_url: String,
}
