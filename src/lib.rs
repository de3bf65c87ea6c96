pub mod config;
pub mod database;
pub mod entities;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod swagger;
pub mod tasks;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult};

use actix_web::web;

/// Registers every route of the service. Shared by the binary and the HTTP tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::rooms_config).service(
        web::scope("/api")
            .configure(handlers::plans_config)
            .configure(handlers::promo_config)
            .configure(handlers::register_config)
            .configure(handlers::payment_config),
    );
}
