use actix_web::{http::header, web, HttpRequest, HttpResponse};
use wxproxy::jsconfig::{parse_api_list, JsConfig};

use super::token::record;
use super::QueryParams;
use crate::error::GatewayError;
use crate::state::AppState;

/// Page URL to sign: explicit `url` parameter, else the Referer header.
fn page_url(req: &HttpRequest, params: &QueryParams) -> Option<String> {
    if let Some(url) = params.get("url") {
        return Some(url.to_string());
    }
    req.headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn build(req: &HttpRequest, state: &AppState) -> Result<HttpResponse, GatewayError> {
    let params = QueryParams::from_request(req);
    let appid = params.require("appid")?;
    let secret = params.require("secret")?;
    let url = page_url(req, &params).ok_or(GatewayError::MissingParameter("url"))?;

    let ticket = state.wechat.jsapi_ticket(appid, secret).await?;
    let config = JsConfig::sign(
        appid,
        &ticket,
        &url,
        params.flag("debug"),
        parse_api_list(params.get("apilist")),
    );
    let script = config
        .to_script()
        .map_err(|e| GatewayError::Internal(format!("failed to render config: {e}")))?;

    Ok(HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(script))
}

/// GET /js/config - signed `wx.config(...)` script for the calling page
pub async fn js_config(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = build(&req, &state).await;
    record("js_config", &result);
    result
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/js/config", web::get().to(js_config));
}
