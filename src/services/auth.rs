// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::set_tenant_key, error::AppError},
    db::{ClientRepository, TenantRepository, UserRepository},
    models::{
        auth::{
            login_to_email, phone_digits, phone_to_email, Claims, PasswordResetCode, RegisterUserPayload, User,
            UserTenant,
        },
        catalog::ClientPayload,
        tenancy::MemberRole,
    },
    services::whatsapp_service::WhatsAppService,
};

pub const TOKEN_TTL_DAYS: i64 = 7;
pub const RESET_CODE_TTL_MINUTES: i64 = 15;
pub const MAX_RESET_ATTEMPTS: i32 = 5;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    client_repo: ClientRepository,
    whatsapp: WhatsAppService,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        client_repo: ClientRepository,
        whatsapp: WhatsAppService,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, tenant_repo, client_repo, whatsapp, jwt_secret, pool }
    }

    /// Cadastro pelo telefone. Com `tenant_slug`, a pessoa já entra como
    /// cliente da loja e ganha (ou assume) a ficha em `clients`.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        let phone = phone_digits(&payload.phone);
        let email = phone_to_email(&phone);

        let tenant = match payload.tenant_slug.as_deref() {
            Some(slug) => Some(
                self.tenant_repo
                    .find_by_slug(slug)
                    .await?
                    .ok_or(AppError::NotFound("Loja"))?,
            ),
            None => None,
        };

        // 1. Hashing (Isso pode ficar fora da transação, pois não toca no banco)
        let hashed_password = hash_password(&payload.password).await?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 2. Cria Usuário (Passando a transação)
        let new_user = self
            .user_repo
            .create_user(&mut *tx, &email, Some(&phone), payload.full_name.trim(), &hashed_password)
            .await?;

        // 3. Entra na loja e liga a ficha de cliente (mesma transação)
        if let Some(tenant) = &tenant {
            self.tenant_repo
                .add_member(&mut *tx, tenant.id, new_user.id, MemberRole::Client)
                .await?;

            set_tenant_key(&mut tx, tenant.id).await?;

            let linked = self
                .client_repo
                .link_user_by_phone(&mut *tx, tenant.id, new_user.id, &phone)
                .await?;

            if linked.is_some() {
                tracing::info!("🔗 Usuário vinculado à cliente já cadastrada na loja {}.", tenant.slug);
            } else {
                let client = ClientPayload {
                    name: payload.full_name.trim().to_string(),
                    phone: phone.clone(),
                    email: payload.email.clone(),
                    ..Default::default()
                };
                self.client_repo
                    .create_client(&mut *tx, tenant.id, Some(new_user.id), &client)
                    .await?;
            }
        }

        // 4. Se chegou aqui, deu tudo certo. "Commita" a transação.
        tx.commit().await?;

        self.create_token(new_user.id)
    }

    /// Login por telefone ou e-mail
    pub async fn login_user(&self, login: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(&login_to_email(login))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<UserTenant>, AppError> {
        self.user_repo.list_user_tenants(user_id).await
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        encode_token(&self.jwt_secret, user_id)
    }

    // =========================================================================
    //  RECUPERAÇÃO DE SENHA
    // =========================================================================

    /// Gera o código de 6 dígitos e manda pelo WhatsApp da loja da pessoa.
    /// Telefone desconhecido também responde Ok, para não revelar cadastro.
    pub async fn request_password_reset(&self, phone: &str) -> Result<(), AppError> {
        let digits = phone_digits(phone);
        let Some(user) = self.user_repo.find_by_phone(&digits).await? else {
            tracing::info!("Pedido de recuperação para telefone sem cadastro.");
            return Ok(());
        };

        let code = generate_reset_code();
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
        self.user_repo.create_reset_code(user.id, &code, expires_at).await?;

        let Some(tenant_id) = self.tenant_repo.first_tenant_of_user(user.id).await? else {
            tracing::warn!("⚠️ Usuário {} sem loja: código de recuperação não enviado.", user.id);
            return Ok(());
        };

        let text = format!(
            "Seu código de recuperação de senha é {}. Ele vale por {} minutos.",
            code, RESET_CODE_TTL_MINUTES
        );
        if let Err(e) = self.whatsapp.send_system_message(tenant_id, &digits, &text).await {
            tracing::warn!("⚠️ Código de recuperação não enviado para o usuário {}: {}", user.id, e);
        }

        Ok(())
    }

    pub async fn confirm_password_reset(&self, phone: &str, code: &str, new_password: &str) -> Result<(), AppError> {
        let digits = phone_digits(phone);
        let user = self
            .user_repo
            .find_by_phone(&digits)
            .await?
            .ok_or(AppError::InvalidResetCode)?;

        let hashed_password = hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;

        let stored = self
            .user_repo
            .find_latest_reset_code(&mut *tx, user.id)
            .await?
            .ok_or(AppError::InvalidResetCode)?;

        match check_reset_code(&stored, code, Utc::now()) {
            ResetCodeCheck::Valid => {}
            ResetCodeCheck::Expired => return Err(AppError::InvalidResetCode),
            ResetCodeCheck::Mismatch => {
                // A tentativa errada precisa ficar gravada mesmo com o erro
                let attempts = self
                    .user_repo
                    .register_failed_reset_attempt(&mut *tx, stored.id, MAX_RESET_ATTEMPTS)
                    .await?;
                tx.commit().await?;

                if attempts >= MAX_RESET_ATTEMPTS {
                    tracing::warn!("⚠️ Código de recuperação do usuário {} bloqueado após {} tentativas", user.id, attempts);
                }
                return Err(AppError::InvalidResetCode);
            }
        }

        self.user_repo.update_password(&mut *tx, user.id, &hashed_password).await?;
        self.user_repo.mark_reset_code_used(&mut *tx, stored.id).await?;
        tx.commit().await?;

        tracing::info!("🔑 Senha redefinida para o usuário {}", user.id);
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ResetCodeCheck {
    Valid,
    Expired,
    Mismatch,
}

fn check_reset_code(stored: &PasswordResetCode, submitted: &str, now: chrono::DateTime<Utc>) -> ResetCodeCheck {
    if stored.used_at.is_some() || stored.attempts >= MAX_RESET_ATTEMPTS || stored.expires_at <= now {
        ResetCodeCheck::Expired
    } else if stored.code != submitted.trim() {
        ResetCodeCheck::Mismatch
    } else {
        ResetCodeCheck::Valid
    }
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password_clone = password.to_owned();
    let password_hash_clone = password_hash.to_owned();

    // Executa a verificação em um thread separado
    let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(is_valid)
}

pub fn generate_reset_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

pub fn encode_token(secret: &str, user_id: Uuid) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject_and_ttl() {
        let user_id = Uuid::new_v4();
        let token = encode_token("segredo", user_id).unwrap();
        let claims = decode_token("segredo", &token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, (TOKEN_TTL_DAYS * 24 * 3600) as usize);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_token("segredo", Uuid::new_v4()).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
        assert!(matches!(decode_token("segredo", "lixo"), Err(AppError::InvalidToken)));
    }

    fn stored_code(attempts: i32) -> PasswordResetCode {
        PasswordResetCode {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "123456".into(),
            expires_at: Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES),
            attempts,
            used_at: None,
        }
    }

    #[test]
    fn reset_code_check_accepts_only_the_right_fresh_code() {
        let now = Utc::now();
        let stored = stored_code(0);
        assert_eq!(check_reset_code(&stored, " 123456 ", now), ResetCodeCheck::Valid);
        assert_eq!(check_reset_code(&stored, "654321", now), ResetCodeCheck::Mismatch);

        let later = stored.expires_at + Duration::seconds(1);
        assert_eq!(check_reset_code(&stored, "123456", later), ResetCodeCheck::Expired);
    }

    #[test]
    fn exhausted_reset_code_rejects_even_the_right_guess() {
        let now = Utc::now();
        assert_eq!(check_reset_code(&stored_code(MAX_RESET_ATTEMPTS - 1), "123456", now), ResetCodeCheck::Valid);
        assert_eq!(check_reset_code(&stored_code(MAX_RESET_ATTEMPTS), "123456", now), ResetCodeCheck::Expired);

        let mut burned = stored_code(0);
        burned.used_at = Some(now);
        assert_eq!(check_reset_code(&burned, "123456", now), ResetCodeCheck::Expired);
    }

    #[test]
    fn reset_code_has_six_digits() {
        for _ in 0..50 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("segredo123").await.unwrap();
        assert!(verify_password("segredo123", &hashed).await.unwrap());
        assert!(!verify_password("errada", &hashed).await.unwrap());
    }
}
