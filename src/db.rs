pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod lot_repo;
pub use lot_repo::LotRepository;
pub mod romaneio_repo;
pub use romaneio_repo::RomaneioRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod marketing_repo;
pub use marketing_repo::MarketingRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod integration_repo;
pub use integration_repo::IntegrationRepository;
pub mod whatsapp_repo;
pub use whatsapp_repo::WhatsAppRepository;
