// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::tenancy::MemberRole;

// Domínio das contas criadas a partir do telefone (login por telefone em cima de e-mail)
pub const PHONE_EMAIL_DOMAIN: &str = "artea.local";

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário (cliente se cadastra pelo telefone)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres."))]
    pub full_name: String,

    #[validate(length(min = 10, max = 20, message = "Telefone inválido."))]
    pub phone: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,

    // Slug da loja: se vier, o usuário entra como cliente dela
    pub tenant_slug: Option<String>,
}

// Dados para login: telefone OU e-mail
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(length(min = 3, message = "Informe o telefone ou e-mail."))]
    pub login: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequestPayload {
    #[validate(length(min = 10, max = 20, message = "Telefone inválido."))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmPayload {
    #[validate(length(min = 10, max = 20, message = "Telefone inválido."))]
    pub phone: String,
    #[validate(length(equal = 6, message = "O código tem 6 dígitos."))]
    pub code: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub new_password: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub used_at: Option<DateTime<Utc>>,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// Lojas das quais o usuário participa
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserTenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub role: MemberRole,
}

/// Mantém só os dígitos do telefone.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Telefone -> e-mail sintético `{digitos}@artea.local`.
pub fn phone_to_email(phone: &str) -> String {
    format!("{}@{}", phone_digits(phone), PHONE_EMAIL_DOMAIN)
}

/// O login aceita e-mail de verdade ou telefone (convertido para o e-mail sintético).
pub fn login_to_email(login: &str) -> String {
    let login = login.trim();
    if login.contains('@') {
        login.to_lowercase()
    } else {
        phone_to_email(login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_is_mapped_to_synthetic_email() {
        assert_eq!(phone_to_email("(11) 98765-4321"), "11987654321@artea.local");
        assert_eq!(login_to_email(" +55 11 98765-4321 "), "5511987654321@artea.local");
    }

    #[test]
    fn real_email_login_is_kept_lowercased() {
        assert_eq!(login_to_email("Maria@Exemplo.com"), "maria@exemplo.com");
    }
}
