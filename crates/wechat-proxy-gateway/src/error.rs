use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use wxproxy::{ProxyError, WxApiStatus, LOCAL_ERRCODE};

#[derive(Debug)]
pub enum GatewayError {
    /// Required query parameter absent or empty
    MissingParameter(&'static str),
    /// Failure from the proxy core (upstream, HTTP, decode, ...)
    Proxy(ProxyError),
    /// Internal error
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::MissingParameter(name) => write!(f, "missing parameter: {}", name),
            GatewayError::Proxy(e) => write!(f, "{}", e),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<ProxyError> for GatewayError {
    fn from(e: ProxyError) -> Self {
        GatewayError::Proxy(e)
    }
}

impl GatewayError {
    /// The vendor-style `{errcode, errmsg}` body for this error.
    pub fn status(&self) -> WxApiStatus {
        match self {
            GatewayError::Proxy(e) => e.to_status(),
            other => WxApiStatus {
                errcode: LOCAL_ERRCODE,
                errmsg: other.to_string(),
            },
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            // the vendor reports its own failures with 200 and an errcode
            GatewayError::Proxy(_) | GatewayError::Internal(_) => StatusCode::OK,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::Proxy(ProxyError::Upstream { errcode, errmsg }) => {
                tracing::warn!(errcode, errmsg = %errmsg, "upstream rejected request");
            }
            GatewayError::MissingParameter(_) => {}
            other => tracing::error!("Gateway error: {}", other),
        }
        HttpResponse::build(self.status_code()).json(self.status())
    }
}
