//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::middleware::{auth::auth_guard, tenancy::tenant_guard};
use crate::services::settings_service::MAX_UPLOAD_BYTES;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração ou sem banco a aplicação não deve iniciar
    let config = Config::from_env().expect("Falha ao carregar a configuração.");
    let app_state = AppState::new(config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/password-reset", post(handlers::auth::request_password_reset))
        .route("/password-reset/confirm", post(handlers::auth::confirm_password_reset));

    // Só login, sem loja
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/tenants", get(handlers::auth::get_my_tenants))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let tenancy_routes = Router::new()
        .route("/", post(handlers::tenancy::create_tenant))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Back-office: login + X-Tenant-ID; cada handler exige ADMIN (RequireAdmin)
    let admin_routes = Router::new()
        // Catálogo
        .route(
            "/categories",
            post(handlers::catalog::create_category).get(handlers::catalog::list_categories),
        )
        .route("/categories/{id}", delete(handlers::catalog::delete_category))
        .route(
            "/colecoes",
            post(handlers::catalog::create_colecao).get(handlers::catalog::list_colecoes),
        )
        .route(
            "/products",
            post(handlers::catalog::create_product).get(handlers::catalog::list_products),
        )
        .route(
            "/products/{id}",
            get(handlers::catalog::get_product)
                .patch(handlers::catalog::update_product)
                .delete(handlers::catalog::delete_product),
        )
        // Clientes
        .route(
            "/clients",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/clients/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::deactivate_client),
        )
        // Lotes
        .route("/lots", post(handlers::lots::create_lot).get(handlers::lots::list_lots))
        .route("/lots/{id}", get(handlers::lots::get_lot))
        .route("/lots/{id}/status", patch(handlers::lots::update_lot_status))
        .route("/lots/{id}/products", post(handlers::lots::add_lot_product))
        .route("/lots/{id}/products/{lot_product_id}", delete(handlers::lots::remove_lot_product))
        .route("/lots/{id}/reservas", get(handlers::lots::list_lot_reservas))
        .route("/reports/catalog-clicks", get(handlers::lots::catalog_click_report))
        // Romaneios
        .route("/romaneios", get(handlers::romaneios::list_romaneios))
        .route("/romaneios/{id}", get(handlers::romaneios::get_romaneio))
        .route("/romaneios/{id}/status", patch(handlers::romaneios::update_status))
        .route("/romaneios/{id}/frete", patch(handlers::romaneios::update_frete))
        .route("/romaneios/{id}/pdf", get(handlers::romaneios::download_pdf))
        .route("/romaneios/{id}/pdf/base64", get(handlers::romaneios::pdf_base64))
        .route("/romaneios/{id}/pix", get(handlers::romaneios::pix_charge))
        .route("/romaneios/{id}/whatsapp", post(handlers::romaneios::send_whatsapp))
        .route("/romaneios/{id}/payment-link", post(handlers::romaneios::payment_link))
        .route("/romaneios/{id}/mercado-pago/pix", post(handlers::romaneios::mercado_pago_pix))
        .route("/romaneios/{id}/label", post(handlers::romaneios::generate_label))
        // Financeiro
        .route(
            "/finance/transactions",
            post(handlers::finance::create_transaction).get(handlers::finance::list_transactions),
        )
        .route("/finance/transactions/{id}", delete(handlers::finance::delete_transaction))
        .route("/finance/daily", get(handlers::finance::daily_report))
        .route("/finance/summary", get(handlers::finance::summary))
        // Marketing
        .route(
            "/coupons",
            post(handlers::marketing::create_coupon).get(handlers::marketing::list_coupons),
        )
        .route("/coupons/validate", post(handlers::marketing::validate_coupon))
        .route("/coupons/{id}", delete(handlers::marketing::deactivate_coupon))
        .route(
            "/gift-cards",
            post(handlers::marketing::create_gift_card).get(handlers::marketing::list_gift_cards),
        )
        .route("/gift-cards/{id}/redeem", post(handlers::marketing::redeem_gift_card))
        .route("/kits", post(handlers::marketing::create_kit).get(handlers::marketing::list_kits))
        .route("/campaigns", get(handlers::marketing::list_campaigns))
        .route("/campaigns/{id}", get(handlers::marketing::get_campaign))
        // WhatsApp
        .route("/whatsapp/send", post(handlers::whatsapp::send_message))
        .route("/whatsapp/bulk", post(handlers::whatsapp::send_bulk))
        .route("/whatsapp/messages", get(handlers::whatsapp::list_messages))
        .route("/whatsapp/campaigns/{id}", get(handlers::marketing::get_campaign))
        // Integrações
        .route("/integrations", get(handlers::integrations::list_integrations))
        .route("/integrations/{provider}", put(handlers::integrations::upsert_integration))
        .route(
            "/integrations/mercado-pago/validate",
            post(handlers::integrations::validate_mercado_pago),
        )
        .route(
            "/integrations/mercado-pago/payments/{payment_id}",
            get(handlers::integrations::get_payment),
        )
        .route("/shipping/quote", post(handlers::integrations::quote_freight))
        .route("/shipping/tracking", post(handlers::integrations::tracking))
        // Configurações e arquivos
        .route("/settings", put(handlers::settings::update_settings))
        .route(
            "/uploads",
            post(handlers::settings::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        // O último .layer() roda primeiro: auth_guard antes do tenant_guard
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Vitrine: qualquer membro da loja
    let store_routes = Router::new()
        .route("/lots", get(handlers::store::list_open_lots))
        .route("/lots/{id}", get(handlers::store::get_lot))
        .route("/lots/{id}/clicks", post(handlers::store::record_click))
        .route(
            "/lots/{id}/reservas",
            put(handlers::store::reserve).get(handlers::store::my_reservas),
        )
        .route("/lots/{id}/reservas/{reserva_id}", delete(handlers::store::cancel_reserva))
        .route("/lots/{id}/checkout", post(handlers::store::checkout))
        .route("/coupons/validate", post(handlers::store::validate_coupon))
        .route("/romaneios", get(handlers::store::my_romaneios))
        .route("/romaneios/{id}", get(handlers::store::my_romaneio))
        .route("/romaneios/{id}/pix", get(handlers::store::my_romaneio_pix))
        .route(
            "/me",
            get(handlers::store::my_profile).put(handlers::store::update_my_profile),
        )
        .route("/settings", get(handlers::settings::get_settings))
        .route("/cep/{cep}", get(handlers::integrations::lookup_cep))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    let storage_dir = app_state.config.storage_dir.clone();
    let bind_addr = app_state.config.bind_addr.clone();

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/tenants/slug/{slug}", get(handlers::tenancy::get_by_slug))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/store", store_routes)
        .nest_service("/storage", ServeDir::new(storage_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
