use actix_web::{web, HttpRequest, HttpResponse};
use wxproxy::TicketKind;

use super::token::{json_body, record};
use super::QueryParams;
use crate::error::GatewayError;
use crate::state::AppState;

/// Resolve a ticket from `access_token`, or from `appid` + `secret` when no
/// token is given.
async fn ticket(
    req: &HttpRequest,
    state: &AppState,
    kind: TicketKind,
) -> Result<HttpResponse, GatewayError> {
    let params = QueryParams::from_request(req);
    let body = match params.get("access_token") {
        Some(token) => state.wechat.ticket_json(kind, token).await?,
        None => {
            let appid = params.require("appid")?;
            let secret = params.require("secret")?;
            state.wechat.ticket_for_app(kind, appid, secret).await?
        }
    };
    Ok(json_body(body))
}

/// GET /js/ticket - JS-SDK ticket
pub async fn js_ticket(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = ticket(&req, &state, TicketKind::Jsapi).await;
    record("jsapi_ticket", &result);
    result
}

/// GET /js/card - card API ticket
pub async fn card_ticket(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let result = ticket(&req, &state, TicketKind::WxCard).await;
    record("card_ticket", &result);
    result
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/js/ticket", web::get().to(js_ticket))
        .route("/js/card", web::get().to(card_ticket));
}
