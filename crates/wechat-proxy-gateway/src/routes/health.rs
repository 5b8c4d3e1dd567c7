use actix_web::{http::header, web, HttpRequest, HttpResponse};
use prometheus::{Encoder, TextEncoder};
use wxproxy::security::bearer_matches;
use wxproxy::{WxApiStatus, LOCAL_ERRCODE};

use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "wxproxy-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "strictVerify": state.config.strict_verify,
        "verifyMsgSignature": state.config.verify_msg_signature,
    }))
}

/// GET /metrics - Prometheus text exposition.
///
/// With `METRICS_TOKEN` set, scrapers must send it as a bearer token.
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(ref token) = state.config.metrics_token {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if !bearer_matches(header, token) {
            tracing::warn!("rejected /metrics scrape without a valid bearer token");
            return HttpResponse::Unauthorized().json(WxApiStatus {
                errcode: LOCAL_ERRCODE,
                errmsg: "metrics token required".to_string(),
            });
        }
    }

    let encoder = TextEncoder::new();
    let mut exposition = Vec::new();
    match encoder.encode(&REGISTRY.gather(), &mut exposition) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(exposition),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}
