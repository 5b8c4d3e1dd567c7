use actix_web::{web, HttpRequest, HttpResponse};

use super::QueryParams;
use crate::error::GatewayError;
use crate::metrics::CREDENTIAL_REQUESTS;
use crate::state::AppState;

pub(crate) fn json_body(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json; charset=utf-8")
        .body(body)
}

pub(crate) fn record<T>(kind: &str, result: &Result<T, GatewayError>) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    CREDENTIAL_REQUESTS.with_label_values(&[kind, outcome]).inc();
}

async fn access_token(
    req: &HttpRequest,
    state: &AppState,
    refresh: bool,
) -> Result<HttpResponse, GatewayError> {
    let params = QueryParams::from_request(req);
    let appid = params.require("appid")?;
    let secret = params.require("secret")?;
    let body = state.wechat.access_token_json(appid, secret, refresh).await?;
    Ok(json_body(body))
}

async fn corp_token(
    req: &HttpRequest,
    state: &AppState,
    refresh: bool,
) -> Result<HttpResponse, GatewayError> {
    let params = QueryParams::from_request(req);
    let corpid = params.require("corpid")?;
    let corpsecret = params.require("corpsecret")?;
    let body = state.wechat.corp_token_json(corpid, corpsecret, refresh).await?;
    Ok(json_body(body))
}

/// GET /api - cached access token for `appid` + `secret`
pub async fn api(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, GatewayError> {
    let result = access_token(&req, &state, false).await;
    record("access_token", &result);
    result
}

/// GET /api/new - force a fresh access token
pub async fn api_new(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = access_token(&req, &state, true).await;
    record("access_token", &result);
    result
}

/// GET /qyapi - cached enterprise token for `corpid` + `corpsecret`
pub async fn qyapi(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = corp_token(&req, &state, false).await;
    record("corp_token", &result);
    result
}

/// GET /qyapi/new - force a fresh enterprise token
pub async fn qyapi_new(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = corp_token(&req, &state, true).await;
    record("corp_token", &result);
    result
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api", web::get().to(api))
        .route("/api/new", web::get().to(api_new))
        .route("/qyapi", web::get().to(qyapi))
        .route("/qyapi/new", web::get().to(qyapi_new));
}
