use actix_web::{web, HttpRequest, HttpResponse};
use wxproxy::dispatcher::SIGNATURE_HEADER;
use wxproxy::signature::verify_hmac;

use crate::state::AppState;

/// POST /echo - debug subscriber that replies with whatever it receives
///
/// When a dispatch secret is configured, unsigned or mis-signed deliveries
/// get no reply.
pub async fn echo(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    if let Some(ref secret) = state.config.dispatch_hmac_secret {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_hmac(secret, &body, signature) {
            tracing::warn!("echo: delivery signature missing or invalid");
            return HttpResponse::Ok().finish();
        }
    }

    tracing::info!(len = body.len(), body = %String::from_utf8_lossy(&body), "echo");
    HttpResponse::Ok().body(body)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/echo", web::post().to(echo));
}
