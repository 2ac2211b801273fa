// src/models/lots.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lot_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Rascunho,   // Em montagem, invisível para as clientes
    Aberto,     // Recebendo reservas
    Fechado,    // Reservas encerradas, aguardando fechamento dos romaneios
    Finalizado, // Romaneios gerados, lote arquivado
}

impl LotStatus {
    /// Transições permitidas do ciclo de vida do lote.
    pub fn can_transition_to(self, next: LotStatus) -> bool {
        use LotStatus::*;
        matches!(
            (self, next),
            (Rascunho, Aberto) | (Aberto, Fechado) | (Fechado, Aberto) | (Fechado, Finalizado)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LotStatus::Rascunho => "RASCUNHO",
            LotStatus::Aberto => "ABERTO",
            LotStatus::Fechado => "FECHADO",
            LotStatus::Finalizado => "FINALIZADO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reserva_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservaStatus {
    Ativa,
    Fechada,
    Cancelada,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: LotStatus,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Produto dentro do lote (com o preço "congelado" no momento da inclusão)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LotProduct {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lot_id: Uuid,
    pub product_id: Uuid,
    pub price: Decimal,
    pub max_quantity: Option<i32>,
    pub created_at: DateTime<Utc>,
}

// Visão do produto no catálogo (JOIN lot_products + products)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LotProductView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub max_quantity: Option<i32>,
    pub reserved_quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotDetail {
    #[serde(flatten)]
    pub lot: Lot,
    pub products: Vec<LotProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reserva {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lot_id: Uuid,
    pub client_id: Uuid,
    pub lot_product_id: Uuid,
    pub quantidade: i32,
    pub status: ReservaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Reserva com dados do produto, usada no checkout e na tela "Minhas reservas"
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReservaView {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub lot_product_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantidade: i32,
    pub valor_unitario: Decimal,
    pub status: ReservaStatus,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    pub description: Option<String>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLotStatusPayload {
    pub status: LotStatus,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddLotProductPayload {
    pub product_id: Uuid,
    // Se não vier, usa o preço atual do produto
    pub price: Option<Decimal>,
    #[validate(range(min = 1, message = "invalid_quantity"))]
    pub max_quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservePayload {
    pub lot_product_id: Uuid,
    #[validate(range(min = 1, max = 999, message = "invalid_quantity"))]
    pub quantidade: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogClickPayload {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogClickReport {
    pub lot_id: Uuid,
    pub lot_name: String,
    pub clicks: i64,
    pub unique_clients: i64,
}

#[cfg(test)]
mod tests {
    use super::LotStatus::*;

    #[test]
    fn lot_lifecycle_transitions() {
        assert!(Rascunho.can_transition_to(Aberto));
        assert!(Aberto.can_transition_to(Fechado));
        assert!(Fechado.can_transition_to(Aberto));
        assert!(Fechado.can_transition_to(Finalizado));

        assert!(!Rascunho.can_transition_to(Finalizado));
        assert!(!Finalizado.can_transition_to(Aberto));
        assert!(!Aberto.can_transition_to(Aberto));
    }
}
