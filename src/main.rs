use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;
use std::time::Duration;

use conference_checkout::{
    config::Config,
    configure_routes,
    database::{create_pool, run_migrations},
    external::PaymentGateway,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks::{self, ExpirationWatchdog},
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let gateway =
        PaymentGateway::new(config.gateway.clone()).expect("Failed to build payment gateway client");

    let watchdog = ExpirationWatchdog::new(
        pool.clone(),
        Duration::from_secs(config.promo.watchdog_interval_secs),
    );

    let room_service = RoomService::new(
        pool.clone(),
        Duration::from_secs(config.inventory.availability_cache_ttl_secs),
    );
    let catalog_service = CatalogService::new(pool.clone());
    let promo_service = PromoService::new(
        pool.clone(),
        chrono::Duration::seconds(config.promo.reservation_ttl_secs),
        watchdog.clone(),
    );
    let checkout_service = CheckoutService::new(
        pool.clone(),
        gateway.clone(),
        room_service.clone(),
        catalog_service.clone(),
        config.checkout.clone(),
    );
    let reconcile_service = ReconcileService::new(
        pool.clone(),
        gateway,
        room_service.clone(),
        catalog_service.clone(),
        watchdog.clone(),
        chrono::Duration::days(config.checkout.installment_interval_days),
    );

    catalog_service
        .seed(&config.catalog)
        .await
        .expect("Failed to seed the catalog");

    let sweeper = tasks::spawn_all(
        watchdog.clone(),
        Duration::from_secs(config.promo.sweep_interval_secs),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origins = config.server.allowed_origins.clone();
    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&allowed_origins))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(room_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(promo_service.clone()))
            .app_data(web::Data::new(checkout_service.clone()))
            .app_data(web::Data::new(reconcile_service.clone()))
            .configure(swagger_config)
            .configure(configure_routes)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await;

    watchdog.shutdown();
    if let Err(e) = sweeper.await {
        log::error!("Promo reservation sweeper ended abnormally: {e}");
    }
    result
}
