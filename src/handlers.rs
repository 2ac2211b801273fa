pub mod auth;
pub mod catalog;
pub mod clients;
pub mod finance;
pub mod integrations;
pub mod lots;
pub mod marketing;
pub mod romaneios;
pub mod settings;
pub mod store;
pub mod tenancy;
pub mod whatsapp;
