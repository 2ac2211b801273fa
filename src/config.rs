// src/config.rs

use std::{env, path::PathBuf, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CatalogRepository, ClientRepository, FinanceRepository, IntegrationRepository, LotRepository,
        MarketingRepository, RomaneioRepository, SettingsRepository, TenantRepository, UserRepository,
        WhatsAppRepository,
    },
    services::{
        auth::AuthService, catalog_service::CatalogService, client_service::ClientService,
        finance_service::FinanceService, integration_service::IntegrationService, lot_service::LotService,
        marketing_service::MarketingService, romaneio_pdf::RomaneioPdfRenderer, romaneio_service::RomaneioService,
        settings_service::SettingsService, tenancy_service::TenantService, whatsapp_service::WhatsAppService,
    },
};

/// Variáveis de ambiente (o `.env` é carregado antes)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub fonts_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            fonts_dir: PathBuf::from(env_or("FONTS_DIR", "./fonts")),
            storage_dir: PathBuf::from(env_or("STORAGE_DIR", "./storage")),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,

    // O tenant_guard consulta o papel direto no repositório
    pub tenant_repo: TenantRepository,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub catalog_service: CatalogService,
    pub client_service: ClientService,
    pub lot_service: LotService,
    pub romaneio_service: RomaneioService,
    pub finance_service: FinanceService,
    pub marketing_service: MarketingService,
    pub integration_service: IntegrationService,
    pub settings_service: SettingsService,
    pub whatsapp_service: WhatsAppService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Um só cliente HTTP para todos os provedores (pool de conexões compartilhado)
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("artea/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let lot_repo = LotRepository::new(db_pool.clone());
        let romaneio_repo = RomaneioRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let marketing_repo = MarketingRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let integration_repo = IntegrationRepository::new(db_pool.clone());
        let whatsapp_repo = WhatsAppRepository::new(db_pool.clone());

        let whatsapp_service = WhatsAppService::new(
            db_pool.clone(),
            http.clone(),
            integration_repo.clone(),
            whatsapp_repo,
            marketing_repo.clone(),
            client_repo.clone(),
        );
        let integration_service = IntegrationService::new(integration_repo, http.clone());

        let auth_service = AuthService::new(
            user_repo,
            tenant_repo.clone(),
            client_repo.clone(),
            whatsapp_service.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let tenant_service = TenantService::new(tenant_repo.clone(), db_pool.clone());
        let catalog_service = CatalogService::new(catalog_repo.clone());
        let client_service = ClientService::new(client_repo.clone());
        let lot_service = LotService::new(
            lot_repo.clone(),
            catalog_repo,
            romaneio_repo.clone(),
            marketing_repo.clone(),
        );
        let romaneio_service = RomaneioService::new(
            romaneio_repo,
            lot_repo,
            client_repo,
            finance_repo.clone(),
            settings_repo.clone(),
            RomaneioPdfRenderer::new(http.clone(), config.fonts_dir.clone()),
            whatsapp_service.clone(),
            integration_service.clone(),
        );
        let finance_service = FinanceService::new(finance_repo);
        let marketing_service = MarketingService::new(marketing_repo);
        let settings_service = SettingsService::new(
            settings_repo,
            config.storage_dir.clone(),
            config.public_base_url.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            tenant_repo,
            auth_service,
            tenant_service,
            catalog_service,
            client_service,
            lot_service,
            romaneio_service,
            finance_service,
            marketing_service,
            integration_service,
            settings_service,
            whatsapp_service,
        })
    }
}
