use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing::info;

use moneta::api::routes;
use moneta::config;
use moneta::services::provider::{HttpPaymentProvider, PaymentProvider, ProviderConfigResolver};
use moneta::services::{
    AttributionService, CommissionService, InviteService, PayoutService, RefundService,
};
use moneta::storage::StorageFactory;
use moneta::system::init_logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    config::init_config();
    let app_config = config::get_config();

    // guard 必须存活到进程结束，否则缓冲日志丢失
    let _log_guard = init_logging(&app_config.logging);

    let storage = StorageFactory::create().await.unwrap_or_else(|e| {
        eprintln!("Failed to initialize storage: {}", e.format_simple());
        std::process::exit(1);
    });
    info!("Using storage backend: {}", storage.backend_name());

    let resolver = ProviderConfigResolver::new(std::time::Duration::from_secs(
        app_config.provider.cache_ttl_secs,
    ));
    let provider: Arc<dyn PaymentProvider> = Arc::new(HttpPaymentProvider::new(resolver.clone()));

    // SIGHUP 重载配置，同时丢弃缓存的供应商凭据
    #[cfg(unix)]
    {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            let mut hup = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("SIGHUP handler unavailable: {}", e);
                    return;
                }
            };
            while hup.recv().await.is_some() {
                info!("SIGHUP received, reloading configuration");
                config::reload_config();
                resolver.invalidate().await;
            }
        });
    }

    let refund_service = Arc::new(RefundService::new(storage.clone(), provider.clone()));
    let attribution_service = Arc::new(AttributionService::new(storage.clone()));
    let invite_service = Arc::new(InviteService::new(storage.clone()));
    let commission_service = Arc::new(CommissionService::new(storage.clone()));
    let payout_service = Arc::new(PayoutService::new(storage.clone(), provider.clone()));

    let bind_address = format!("{}:{}", app_config.server.host, app_config.server.port);
    info!("Starting server at http://{}", bind_address);

    let workers = app_config.server.cpu_count;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(refund_service.clone()))
            .app_data(web::Data::new(attribution_service.clone()))
            .app_data(web::Data::new(invite_service.clone()))
            .app_data(web::Data::new(commission_service.clone()))
            .app_data(web::Data::new(payout_service.clone()))
            .service(
                web::scope("/v1")
                    .service(routes::refund_routes())
                    .service(routes::order_routes())
                    .service(routes::attribution_routes())
                    .service(routes::invite_routes())
                    .service(routes::referral_routes())
                    .service(routes::payout_routes())
                    .service(routes::webhook_routes()),
            )
            .service(routes::health_routes())
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await
}
