//! Webhook endpoint: verification handshake and message delivery.
//!
//! `/msg` forwards the vendor XML untouched, `/msg/json` forwards the JSON
//! translation and expects JSON replies. When the callback carries `token`,
//! `aes` and `encrypt_type`, the body is an encrypted envelope and the reply
//! is sealed again before it goes back to the vendor.
//!
//! Failures never surface as HTTP errors: the vendor retries on anything but
//! a 200, so every error is logged and answered with an empty body.

use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use wxproxy::subscribers::subscriber_urls;
use wxproxy::{translate, CallbackQuery, MsgCrypter, ProxyError, SignatureParams};

use super::{host_url, QueryParams};
use crate::metrics::{DISPATCH_LATENCY, SUBSCRIBERS_PER_REQUEST, WEBHOOK_REQUESTS};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Forward vendor XML as-is.
    Raw,
    /// Translate to JSON for subscribers and back to XML for the reply.
    Json,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Raw => "raw",
            Mode::Json => "json",
        }
    }
}

fn callback_query(params: &QueryParams) -> CallbackQuery<'_> {
    CallbackQuery {
        signature: params.get_or_empty("signature"),
        timestamp: params.get_or_empty("timestamp"),
        nonce: params.get_or_empty("nonce"),
        echostr: params.get("echostr"),
        encrypt_type: params.get_or_empty("encrypt_type"),
        msg_signature: params.get_or_empty("msg_signature"),
        appid: params.get("appid"),
        secret: params.get("secret"),
    }
}

fn urls_for(req: &HttpRequest, params: &QueryParams) -> Vec<String> {
    let urls = subscriber_urls(&params.all("call"), &host_url(req), &callback_query(params));
    for url in &urls {
        tracing::debug!(url = %url, "subscriber");
    }
    urls
}

/// GET /msg, /msg/json - vendor server verification handshake
pub async fn verify(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let echostr = params.get_or_empty("echostr").to_string();

    if !state.config.strict_verify {
        WEBHOOK_REQUESTS.with_label_values(&["verify", "echoed"]).inc();
        return HttpResponse::Ok().body(echostr);
    }

    let urls = urls_for(&req, &params);
    if state.dispatcher.verify(&urls, &echostr).await {
        WEBHOOK_REQUESTS.with_label_values(&["verify", "echoed"]).inc();
        HttpResponse::Ok().body(echostr)
    } else {
        tracing::warn!(subscribers = urls.len(), "subscriber verification failed");
        WEBHOOK_REQUESTS.with_label_values(&["verify", "rejected"]).inc();
        HttpResponse::Ok().finish()
    }
}

/// POST /msg - deliver vendor XML to subscribers
pub async fn deliver_raw(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    deliver(req, body, state, Mode::Raw).await
}

/// POST /msg/json - deliver translated JSON to subscribers
pub async fn deliver_json(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    deliver(req, body, state, Mode::Json).await
}

async fn deliver(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
    mode: Mode,
) -> HttpResponse {
    match process(&req, body, &state, mode).await {
        Ok(reply) => {
            let outcome = if reply.is_empty() { "empty" } else { "replied" };
            WEBHOOK_REQUESTS.with_label_values(&[mode.as_str(), outcome]).inc();
            HttpResponse::Ok().body(reply)
        }
        Err(e) => {
            tracing::error!(mode = mode.as_str(), error = %e, "webhook processing failed");
            WEBHOOK_REQUESTS.with_label_values(&[mode.as_str(), "error"]).inc();
            HttpResponse::Ok().finish()
        }
    }
}

async fn process(
    req: &HttpRequest,
    body: Bytes,
    state: &AppState,
    mode: Mode,
) -> Result<Bytes, ProxyError> {
    let params = QueryParams::from_request(req);
    let urls = urls_for(req, &params);
    SUBSCRIBERS_PER_REQUEST.observe(urls.len() as f64);

    let encryption = match (
        params.get("token"),
        params.get("aes"),
        params.get("encrypt_type"),
    ) {
        (Some(token), Some(aes), Some(_)) => Some((token, aes)),
        _ => None,
    };

    let Some((token, aes)) = encryption else {
        return fan_out(state, body, &urls, mode).await;
    };

    let crypter = MsgCrypter::new(token, aes)?;
    let check = state.config.verify_msg_signature.then(|| SignatureParams {
        timestamp: params.get_or_empty("timestamp"),
        nonce: params.get_or_empty("nonce"),
        msg_signature: params.get_or_empty("msg_signature"),
    });
    let opened = crypter.decrypt(&body, check.as_ref())?;
    tracing::debug!(app_id = %opened.app_id, "decrypted callback");

    let reply = fan_out(state, Bytes::from(opened.message), &urls, mode).await?;
    if reply.is_empty() {
        return Ok(reply);
    }
    Ok(Bytes::from(crypter.encrypt(&reply, &opened.app_id)?))
}

async fn fan_out(
    state: &AppState,
    body: Bytes,
    urls: &[String],
    mode: Mode,
) -> Result<Bytes, ProxyError> {
    let started = Instant::now();
    let reply = match mode {
        Mode::Raw => state.dispatcher.dispatch(body, urls).await,
        Mode::Json => Bytes::from(translate::translate(&state.dispatcher, &body, urls).await?),
    };
    DISPATCH_LATENCY.observe(started.elapsed().as_secs_f64());
    Ok(reply)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/msg", web::get().to(verify))
        .route("/msg", web::post().to(deliver_raw))
        .route("/msg/json", web::get().to(verify))
        .route("/msg/json", web::post().to(deliver_json));
}
