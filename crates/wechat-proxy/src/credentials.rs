//! Upstream credential client with per-credential TTL caches.
//!
//! Access tokens, enterprise tokens and JS tickets are fetched from the
//! vendor API and cached verbatim (the raw JSON body), so callers can forward
//! them unchanged. Error bodies are never cached.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::cache::{SweeperHandle, TtlCache};
use crate::error::{ProxyError, WxApiStatus};

pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com";
pub const DEFAULT_QYAPI_BASE: &str = "https://qyapi.weixin.qq.com";

/// Anything that can turn app credentials into an access token.
pub trait CredentialResolver: Send + Sync {
    fn access_token(
        &self,
        appid: &str,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<String, ProxyError>> + Send;
}

/// Which ticket `cgi-bin/ticket/getticket` should issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    Jsapi,
    WxCard,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Jsapi => "jsapi",
            TicketKind::WxCard => "wx_card",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenBody {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TicketBody {
    #[serde(default)]
    ticket: String,
}

/// Cache key for a credential pair; the secret never appears in memory as a key.
pub fn fingerprint(appid: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(appid.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct WechatClient {
    http: reqwest::Client,
    api_base: String,
    qyapi_base: String,
    access_tokens: Arc<TtlCache<String>>,
    corp_tokens: Arc<TtlCache<String>>,
    jsapi_tickets: Arc<TtlCache<String>>,
    card_tickets: Arc<TtlCache<String>>,
}

impl WechatClient {
    pub fn new(http: reqwest::Client, ttl: Duration, limit: usize) -> Self {
        let cache = || Arc::new(TtlCache::new(ttl, limit));
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            qyapi_base: DEFAULT_QYAPI_BASE.to_string(),
            access_tokens: cache(),
            corp_tokens: cache(),
            jsapi_tickets: cache(),
            card_tickets: cache(),
        }
    }

    /// Point public-account calls at a different host (tests, mirrors).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_qyapi_base(mut self, base: impl Into<String>) -> Self {
        self.qyapi_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn qyapi_base(&self) -> &str {
        &self.qyapi_base
    }

    /// Start one sweeper per cache; drop the handles to stop them.
    pub fn start_sweepers(&self, period: Duration) -> Vec<SweeperHandle> {
        [
            &self.access_tokens,
            &self.corp_tokens,
            &self.jsapi_tickets,
            &self.card_tickets,
        ]
        .into_iter()
        .map(|cache| Arc::clone(cache).start_sweeper(period))
        .collect()
    }

    /// Raw `cgi-bin/token` body for a public account.
    ///
    /// `refresh` evicts any cached token first.
    pub async fn access_token_json(
        &self,
        appid: &str,
        secret: &str,
        refresh: bool,
    ) -> Result<String, ProxyError> {
        let key = fingerprint(appid, secret);
        if refresh {
            self.access_tokens.remove(&key);
        } else if let Some(body) = self.access_tokens.get(&key) {
            tracing::debug!(appid = %appid, "access token cache hit");
            return Ok(body);
        }

        let url = format!("{}/cgi-bin/token", self.api_base);
        let body = self
            .fetch(
                &url,
                &[
                    ("grant_type", "client_credential"),
                    ("appid", appid),
                    ("secret", secret),
                ],
            )
            .await?;
        self.access_tokens.insert(key, body.clone());
        tracing::info!(appid = %appid, refresh, "access token fetched");
        Ok(body)
    }

    /// Raw `cgi-bin/gettoken` body for an enterprise account.
    pub async fn corp_token_json(
        &self,
        corpid: &str,
        corpsecret: &str,
        refresh: bool,
    ) -> Result<String, ProxyError> {
        let key = fingerprint(corpid, corpsecret);
        if refresh {
            self.corp_tokens.remove(&key);
        } else if let Some(body) = self.corp_tokens.get(&key) {
            tracing::debug!(corpid = %corpid, "corp token cache hit");
            return Ok(body);
        }

        let url = format!("{}/cgi-bin/gettoken", self.qyapi_base);
        let body = self
            .fetch(&url, &[("corpid", corpid), ("corpsecret", corpsecret)])
            .await?;
        self.corp_tokens.insert(key, body.clone());
        tracing::info!(corpid = %corpid, refresh, "corp token fetched");
        Ok(body)
    }

    /// Raw `cgi-bin/ticket/getticket` body, cached per access token.
    pub async fn ticket_json(
        &self,
        kind: TicketKind,
        access_token: &str,
    ) -> Result<String, ProxyError> {
        let cache = match kind {
            TicketKind::Jsapi => &self.jsapi_tickets,
            TicketKind::WxCard => &self.card_tickets,
        };
        if let Some(body) = cache.get(access_token) {
            tracing::debug!(kind = kind.as_str(), "ticket cache hit");
            return Ok(body);
        }

        let url = format!("{}/cgi-bin/ticket/getticket", self.api_base);
        let body = self
            .fetch(
                &url,
                &[("access_token", access_token), ("type", kind.as_str())],
            )
            .await?;
        cache.insert(access_token, body.clone());
        tracing::info!(kind = kind.as_str(), "ticket fetched");
        Ok(body)
    }

    /// Ticket body for an app, resolving the access token through the cache.
    pub async fn ticket_for_app(
        &self,
        kind: TicketKind,
        appid: &str,
        secret: &str,
    ) -> Result<String, ProxyError> {
        let token = self.access_token(appid, secret).await?;
        self.ticket_json(kind, &token).await
    }

    /// The bare `jsapi_ticket` string for an app.
    pub async fn jsapi_ticket(&self, appid: &str, secret: &str) -> Result<String, ProxyError> {
        let body = self.ticket_for_app(TicketKind::Jsapi, appid, secret).await?;
        let parsed: TicketBody = serde_json::from_str(&body)?;
        if parsed.ticket.is_empty() {
            return Err(ProxyError::Http("ticket missing from upstream body".to_string()));
        }
        Ok(parsed.ticket)
    }

    async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ProxyError> {
        let resp = self.http.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProxyError::Http(format!("upstream returned {status}")));
        }
        let body = resp.text().await?;
        check_status(&body)?;
        Ok(body)
    }
}

impl std::fmt::Debug for WechatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatClient")
            .field("api_base", &self.api_base)
            .field("qyapi_base", &self.qyapi_base)
            .field("access_tokens", &self.access_tokens.len())
            .field("corp_tokens", &self.corp_tokens.len())
            .field("jsapi_tickets", &self.jsapi_tickets.len())
            .field("card_tickets", &self.card_tickets.len())
            .finish()
    }
}

impl CredentialResolver for WechatClient {
    async fn access_token(&self, appid: &str, secret: &str) -> Result<String, ProxyError> {
        let body = self.access_token_json(appid, secret, false).await?;
        let parsed: AccessTokenBody = serde_json::from_str(&body)?;
        if parsed.access_token.is_empty() {
            return Err(ProxyError::Http(
                "access_token missing from upstream body".to_string(),
            ));
        }
        Ok(parsed.access_token)
    }
}

/// Reject vendor error bodies. Bodies too short to be JSON are treated as an
/// invalid credential, which is what the enterprise API returns them for.
fn check_status(body: &str) -> Result<(), ProxyError> {
    if body.trim().len() < 10 {
        return Err(ProxyError::Upstream {
            errcode: 40001,
            errmsg: "invalid credential".to_string(),
        });
    }
    let status: WxApiStatus = serde_json::from_str(body)?;
    if status.is_success() {
        Ok(())
    } else {
        Err(ProxyError::Upstream {
            errcode: status.errcode,
            errmsg: status.errmsg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("wx1", "s1");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("wx1", "s1"));
        assert_ne!(a, fingerprint("wx1", "s2"));
        // the separator keeps ("ab", "c") and ("a", "bc") apart
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
    }

    #[test]
    fn error_bodies_become_upstream_errors() {
        let err = check_status(r#"{"errcode":40013,"errmsg":"invalid appid"}"#).unwrap_err();
        match err {
            ProxyError::Upstream { errcode, errmsg } => {
                assert_eq!(errcode, 40013);
                assert_eq!(errmsg, "invalid appid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(check_status(r#"{"access_token":"TOKEN","expires_in":7200}"#).is_ok());
        assert!(matches!(
            check_status("{}"),
            Err(ProxyError::Upstream { errcode: 40001, .. })
        ));
    }

    #[test]
    fn ticket_kind_names() {
        assert_eq!(TicketKind::Jsapi.as_str(), "jsapi");
        assert_eq!(TicketKind::WxCard.as_str(), "wx_card");
    }

    #[test]
    fn base_urls_are_trimmed() {
        let client = WechatClient::new(reqwest::Client::new(), Duration::from_secs(60), 10)
            .with_api_base("http://localhost:1234/")
            .with_qyapi_base("http://localhost:5678");
        assert_eq!(client.api_base(), "http://localhost:1234");
        assert_eq!(client.qyapi_base(), "http://localhost:5678");
    }
}
