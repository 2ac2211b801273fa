pub mod auth;
pub mod catalog;
pub mod finance;
pub mod integrations;
pub mod lots;
pub mod marketing;
pub mod romaneio;
pub mod settings;
pub mod tenancy;
pub mod whatsapp;
