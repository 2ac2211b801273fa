// src/models/romaneio.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::catalog::Client;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "romaneio_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RomaneioStatus {
    Pendente,  // Aguardando pagamento
    Pago,
    Enviado,
    Cancelado,
}

impl RomaneioStatus {
    pub fn can_transition_to(self, next: RomaneioStatus) -> bool {
        use RomaneioStatus::*;
        matches!((self, next), (Pendente, Pago) | (Pendente, Cancelado) | (Pago, Enviado))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RomaneioStatus::Pendente => "PENDENTE",
            RomaneioStatus::Pago => "PAGO",
            RomaneioStatus::Enviado => "ENVIADO",
            RomaneioStatus::Cancelado => "CANCELADO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Romaneio {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lot_id: Uuid,
    pub client_id: Uuid,

    // Número sequencial por loja (ex: Romaneio #42)
    pub numero: i32,
    pub status: RomaneioStatus,

    // Valores
    pub subtotal: Decimal,
    pub desconto: Decimal,
    pub frete: Decimal,
    pub total: Decimal,

    pub coupon_code: Option<String>,
    pub tracking_code: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RomaneioItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub romaneio_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantidade: i32,
    pub valor_unitario: Decimal,
    pub valor_total: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RomaneioDetail {
    #[serde(flatten)]
    pub header: Romaneio,
    pub lot_name: String,
    pub client: Client,
    pub items: Vec<RomaneioItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomaneioFilter {
    pub lot_id: Option<Uuid>,
    pub status: Option<RomaneioStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRomaneioStatusPayload {
    pub status: RomaneioStatus,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFretePayload {
    pub frete: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RomaneioPdfResponse {
    pub file_name: String,
    pub pdf_base64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeResponse {
    pub payload: String,
    pub amount: Decimal,
    pub qr_code_png_base64: String,
}

#[cfg(test)]
mod tests {
    use super::RomaneioStatus::*;

    #[test]
    fn romaneio_transitions() {
        assert!(Pendente.can_transition_to(Pago));
        assert!(Pendente.can_transition_to(Cancelado));
        assert!(Pago.can_transition_to(Enviado));
        assert!(!Enviado.can_transition_to(Pendente));
        assert!(!Cancelado.can_transition_to(Pago));
        assert!(!Pendente.can_transition_to(Enviado));
    }
}
