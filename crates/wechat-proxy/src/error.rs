use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code used for failures raised by the proxy itself rather than the vendor.
pub const LOCAL_ERRCODE: i64 = -10001;

/// Errors returned by wxproxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed envelope, bad base64, bad key or a corrupt plaintext frame.
    #[error("decode error: {0}")]
    Decode(String),

    /// Cipher or marshal failure while building a reply envelope.
    #[error("encode error: {0}")]
    Encode(String),

    /// XML/JSON schema mismatch in the event translator.
    #[error("translation error: {0}")]
    Translation(String),

    /// The vendor platform answered with a non-zero `errcode`.
    #[error("upstream error {errcode}: {errmsg}")]
    Upstream { errcode: i64, errmsg: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Http(e.to_string())
    }
}

/// The `{errcode, errmsg}` pair the vendor attaches to every API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl WxApiStatus {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

impl ProxyError {
    /// Render the error the way the vendor renders its own failures.
    pub fn to_status(&self) -> WxApiStatus {
        match self {
            ProxyError::Upstream { errcode, errmsg } => WxApiStatus {
                errcode: *errcode,
                errmsg: errmsg.clone(),
            },
            other => WxApiStatus {
                errcode: LOCAL_ERRCODE,
                errmsg: other.to_string(),
            },
        }
    }
}
