pub mod auth;
pub mod catalog_service;
pub mod client_service;
pub mod finance_service;
pub mod integration_service;
pub mod integrations;
pub mod lot_service;
pub mod marketing_service;
pub mod romaneio_pdf;
pub mod romaneio_service;
pub mod settings_service;
pub mod tenancy_service;
pub mod whatsapp_service;
