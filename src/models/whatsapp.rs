// src/models/whatsapp.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Enviada,
    Erro,
}

// Log de cada mensagem enviada
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessage {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub phone: String,
    pub message: String,
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[validate(length(min = 10, max = 20, message = "invalid_phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 4096, message = "invalid_message"))]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub phone: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendPayload {
    #[validate(length(min = 1, message = "required"))]
    pub campaign_name: String,

    // Aceita `{nome}` como marcador do nome da cliente
    #[validate(length(min = 1, max = 4096, message = "invalid_message"))]
    pub message: String,

    // Se vier vazio, envia para todas as clientes ativas
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

// Progresso do disparo em massa
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkProgress {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub errors: usize,
}

impl BulkProgress {
    pub fn is_done(&self) -> bool {
        self.processed == self.total
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendResponse {
    pub campaign_id: Uuid,
    pub total_recipients: usize,
}
