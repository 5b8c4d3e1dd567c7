use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wxproxy_gateway::{config::GatewayConfig, metrics::register_metrics, state::AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = GatewayConfig::from_env().expect("Failed to load configuration");
    let host = config.host.clone();
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;
    let sweep_period = config.token_cache_ttl;

    tracing::info!("Starting wxproxy-gateway on {}:{}", host, port);
    tracing::info!("WeChat API: {}", config.api_url);
    tracing::info!("WeChat enterprise API: {}", config.qyapi_url);
    tracing::info!(
        "Subscriber timeout: {}s, strict verify: {}, msg signature check: {}",
        config.dispatch_timeout.as_secs(),
        config.strict_verify,
        config.verify_msg_signature
    );
    tracing::info!(
        "Delivery signing: {}",
        if config.dispatch_hmac_secret.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    // Register Prometheus metrics
    register_metrics();

    // Create shared state
    let state = AppState::new(config).expect("failed to create HTTP client");

    // Background sweep of expired tokens; stops when the handles drop at shutdown
    let _sweepers = state.wechat.start_sweepers(sweep_period);

    let state_data = web::Data::new(state);

    // Configure rate limiter
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .expect("Failed to create rate limiter config");

    // Start HTTP server
    HttpServer::new(move || {
        let cors = wxproxy_gateway::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(1024 * 1024)) // 1MB body limit
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(wxproxy_gateway::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
