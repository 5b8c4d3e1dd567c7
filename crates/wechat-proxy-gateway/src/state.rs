use crate::config::GatewayConfig;
use std::sync::Arc;
use wxproxy::{Dispatcher, WechatClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Upstream token/ticket client and its caches, shared by every worker
    pub wechat: Arc<WechatClient>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let upstream_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        // Subscriber calls carry their own per-request timeout.
        let dispatch_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::with_clients(config, upstream_client, dispatch_client))
    }

    pub fn with_clients(
        config: GatewayConfig,
        upstream_client: reqwest::Client,
        dispatch_client: reqwest::Client,
    ) -> Self {
        let wechat = WechatClient::new(
            upstream_client,
            config.token_cache_ttl,
            config.token_cache_limit,
        )
        .with_api_base(config.api_url.clone())
        .with_qyapi_base(config.qyapi_url.clone());

        let mut dispatcher = Dispatcher::new(dispatch_client, config.dispatch_timeout);
        if let Some(ref secret) = config.dispatch_hmac_secret {
            dispatcher = dispatcher.with_hmac_secret(secret.clone());
        }

        Self {
            config: Arc::new(config),
            wechat: Arc::new(wechat),
            dispatcher,
        }
    }
}
