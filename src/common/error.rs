use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::integrations::IntegrationError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido: {0}")]
    InvalidField(String),

    #[error("E-mail ou telefone já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso negado à loja")]
    TenantAccessDenied,

    #[error("Permissão de administrador necessária")]
    AdminRequired,

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Regra de negócio: {0}")]
    BusinessRule(String),

    #[error("Cupom inválido: {0}")]
    CouponRejected(String),

    #[error("Código de recuperação inválido ou expirado")]
    InvalidResetCode,

    #[error("Dados PIX inválidos: {0}")]
    PixInvalid(String),

    #[error("Integração não configurada: {0}")]
    IntegrationNotConfigured(&'static str),

    #[error("Falha na integração: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Converte violação de chave única em erro amigável; o resto vira DatabaseError.
    pub fn from_unique(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::UniqueConstraintViolation(message.into());
            }
        }
        AppError::DatabaseError(e)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidField(_)
            | AppError::CouponRejected(_)
            | AppError::InvalidResetCode
            | AppError::PixInvalid(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::TenantAccessDenied | AppError::AdminRequired => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStatusTransition { .. } | AppError::BusinessRule(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::IntegrationNotConfigured(_) => StatusCode::PRECONDITION_FAILED,
            AppError::Integration(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::EmailAlreadyExists => "Este telefone ou e-mail já está em uso.".to_string(),
            AppError::InvalidCredentials => "Telefone/e-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Token de autenticação inválido ou ausente.".to_string(),
            AppError::DatabaseError(sqlx::Error::RowNotFound) => "Registro não encontrado.".to_string(),
            AppError::Integration(e) => {
                tracing::warn!("Falha em integração externa: {}", e);
                e.to_string()
            }

            // Todos os outros 500 são logados com detalhe e respondidos genericamente.
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
            e => e.to_string(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_domain_errors() {
        assert_eq!(AppError::NotFound("Lote").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AdminRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InvalidStatusTransition { from: "PAGO".into(), to: "PENDENTE".into() }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::CouponRejected("expirado".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::NotFound("Romaneio").to_string(), "Romaneio não encontrado(a)");
    }
}
