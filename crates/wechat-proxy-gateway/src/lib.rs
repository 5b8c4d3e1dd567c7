pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use state::AppState;

use actix_web::web;

/// Mount every gateway route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(routes::health::configure)
        .configure(routes::message::configure)
        .configure(routes::token::configure)
        .configure(routes::ticket::configure)
        .configure(routes::jsconfig::configure)
        .configure(routes::echo::configure);
}
