//! Subscriber URL construction.
//!
//! Each `call` URL receives a copy of the vendor's verification parameters so
//! subscribers can check signatures themselves.

use urlencoding::encode;

/// Verification parameters copied from the inbound callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackQuery<'a> {
    pub signature: &'a str,
    pub timestamp: &'a str,
    pub nonce: &'a str,
    /// Present on the GET handshake.
    pub echostr: Option<&'a str>,
    pub encrypt_type: &'a str,
    pub msg_signature: &'a str,
    pub appid: Option<&'a str>,
    pub secret: Option<&'a str>,
}

impl CallbackQuery<'_> {
    /// Query string appended to every subscriber URL.
    pub fn to_query(&self) -> String {
        let mut query = format!(
            "signature={}&timestamp={}&nonce={}",
            encode(self.signature),
            encode(self.timestamp),
            encode(self.nonce)
        );
        match self.echostr.filter(|s| !s.is_empty()) {
            Some(echostr) => {
                query.push_str("&echostr=");
                query.push_str(&encode(echostr));
            }
            None => {
                query.push_str("&encrypt_type=");
                query.push_str(&encode(self.encrypt_type));
                query.push_str("&msg_signature=");
                query.push_str(&encode(self.msg_signature));
            }
        }
        for (name, value) in [("appid", self.appid), ("secret", self.secret)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                query.push('&');
                query.push_str(name);
                query.push('=');
                query.push_str(&encode(value));
            }
        }
        query
    }
}

/// Make `url` absolute and append `query`.
///
/// `/path` resolves against `host_url` (`scheme://host` of the proxy itself);
/// anything else without an `http` prefix is assumed to be plain HTTP.
pub fn normalize_url(url: &str, host_url: &str, query: &str) -> String {
    let mut out = if url.starts_with('/') {
        format!("{}{}", host_url.trim_end_matches('/'), url)
    } else if url.starts_with("http") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    out.push(if out.contains('?') { '&' } else { '?' });
    out.push_str(query);
    out
}

/// Normalize every `call` parameter in request order.
pub fn subscriber_urls(calls: &[String], host_url: &str, query: &CallbackQuery<'_>) -> Vec<String> {
    let query = query.to_query();
    calls
        .iter()
        .filter(|c| !c.trim().is_empty())
        .map(|c| normalize_url(c.trim(), host_url, &query))
        .collect()
}
