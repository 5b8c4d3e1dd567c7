//! JS-SDK `wx.config(...)` signing.

use serde::Serialize;

use crate::signature::{nonce_str, sha1_hex};

/// Every JS-SDK interface the vendor documents, used when the caller does
/// not narrow the list.
pub const DEFAULT_JS_API_LIST: &[&str] = &[
    "onMenuShareTimeline",
    "onMenuShareAppMessage",
    "onMenuShareQQ",
    "onMenuShareWeibo",
    "onMenuShareQZone",
    "startRecord",
    "stopRecord",
    "onVoiceRecordEnd",
    "playVoice",
    "pauseVoice",
    "stopVoice",
    "onVoicePlayEnd",
    "uploadVoice",
    "downloadVoice",
    "chooseImage",
    "previewImage",
    "uploadImage",
    "downloadImage",
    "translateVoice",
    "getNetworkType",
    "openLocation",
    "getLocation",
    "hideOptionMenu",
    "showOptionMenu",
    "hideMenuItems",
    "showMenuItems",
    "hideAllNonBaseMenuItem",
    "showAllNonBaseMenuItem",
    "closeWindow",
    "scanQRCode",
    "chooseWXPay",
    "openProductSpecificView",
    "addCard",
    "chooseCard",
    "openCard",
];

const NONCE_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsConfig {
    pub app_id: String,
    pub debug: bool,
    pub timestamp: i64,
    pub nonce_str: String,
    pub signature: String,
    pub js_api_list: Vec<String>,
}

/// Signature over the ticket, nonce, timestamp and page URL.
pub fn js_signature(ticket: &str, nonce: &str, timestamp: i64, url: &str) -> String {
    sha1_hex(&format!(
        "jsapi_ticket={ticket}&noncestr={nonce}&timestamp={timestamp}&url={url}"
    ))
}

/// Split a comma-separated `apilist` parameter; empty means the default list.
pub fn parse_api_list(raw: Option<&str>) -> Vec<String> {
    let list: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if list.is_empty() {
        DEFAULT_JS_API_LIST.iter().map(|s| s.to_string()).collect()
    } else {
        list
    }
}

impl JsConfig {
    /// Sign a fresh config for `url` with the current time and a new nonce.
    pub fn sign(app_id: &str, ticket: &str, url: &str, debug: bool, js_api_list: Vec<String>) -> Self {
        let timestamp = chrono::Utc::now().timestamp();
        let nonce = nonce_str(NONCE_LEN);
        Self::sign_with(app_id, ticket, url, debug, js_api_list, timestamp, nonce)
    }

    pub fn sign_with(
        app_id: &str,
        ticket: &str,
        url: &str,
        debug: bool,
        js_api_list: Vec<String>,
        timestamp: i64,
        nonce: String,
    ) -> Self {
        let signature = js_signature(ticket, &nonce, timestamp, url);
        Self {
            app_id: app_id.to_string(),
            debug,
            timestamp,
            nonce_str: nonce,
            signature,
            js_api_list,
        }
    }

    /// Render the browser-side `wx.config({...})` call.
    pub fn to_script(&self) -> Result<String, serde_json::Error> {
        Ok(format!("wx.config({})", serde_json::to_string(self)?))
    }
}
