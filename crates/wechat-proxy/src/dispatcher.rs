//! Concurrent fan-out of a webhook payload to subscriber URLs.
//!
//! Every URL gets its own tokio task. Results are consumed in submission
//! order and the first non-empty body wins, so an earlier subscriber always
//! beats a later one even if the later one answers first.

use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::signature::compute_hmac;

/// Header carrying the HMAC-SHA256 of the delivered body, when configured.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Duration,
    hmac_secret: Option<Bytes>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("timeout", &self.timeout)
            .field("hmac_secret", &self.hmac_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            hmac_secret: None,
        }
    }

    /// Sign every delivery with HMAC-SHA256 under `secret`.
    pub fn with_hmac_secret(mut self, secret: impl Into<Bytes>) -> Self {
        self.hmac_secret = Some(secret.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `payload` to every URL and return the first non-empty reply in
    /// URL order, or an empty body when nobody answered.
    ///
    /// Tasks still running when a winner is found are left to finish on
    /// their own; their results are discarded.
    pub async fn dispatch(&self, payload: Bytes, urls: &[String]) -> Bytes {
        let signature = self
            .hmac_secret
            .as_ref()
            .map(|secret| compute_hmac(secret, &payload));

        let handles: Vec<JoinHandle<Bytes>> = urls
            .iter()
            .map(|url| {
                let client = self.client.clone();
                let url = url.clone();
                let body = payload.clone();
                let signature = signature.clone();
                let timeout = self.timeout;
                tokio::spawn(async move {
                    deliver(client, url, body, signature, timeout).await
                })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok(reply) if !reply.is_empty() => return reply,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "subscriber task failed"),
            }
        }
        Bytes::new()
    }

    /// GET every URL and check that each subscriber that answered echoed
    /// `echostr` back. At least one subscriber must answer.
    pub async fn verify(&self, urls: &[String], echostr: &str) -> bool {
        let handles: Vec<JoinHandle<Option<Bytes>>> = urls
            .iter()
            .map(|url| {
                let client = self.client.clone();
                let url = url.clone();
                let timeout = self.timeout;
                tokio::spawn(async move { probe(client, url, timeout).await })
            })
            .collect();

        let mut answered = 0usize;
        let mut all_match = true;
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(Some(body)) => {
                    answered += 1;
                    if body.as_ref() != echostr.as_bytes() {
                        all_match = false;
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "verify task failed"),
            }
        }
        answered > 0 && all_match
    }
}

async fn deliver(
    client: reqwest::Client,
    url: String,
    body: Bytes,
    signature: Option<String>,
    timeout: Duration,
) -> Bytes {
    let mut req = client.post(&url).timeout(timeout);
    if let Some(ref sig) = signature {
        req = req.header(SIGNATURE_HEADER, sig.as_str());
    }

    let resp = match req.body(body).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "subscriber delivery failed");
            return Bytes::new();
        }
    };
    if !resp.status().is_success() {
        tracing::warn!(url = %url, status = %resp.status(), "subscriber rejected delivery");
        return Bytes::new();
    }
    match resp.bytes().await {
        Ok(reply) => {
            tracing::debug!(url = %url, len = reply.len(), "subscriber replied");
            reply
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "subscriber reply unreadable");
            Bytes::new()
        }
    }
}

async fn probe(client: reqwest::Client, url: String, timeout: Duration) -> Option<Bytes> {
    let resp = match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "subscriber verification failed");
            return None;
        }
    };
    if !resp.status().is_success() {
        tracing::warn!(url = %url, status = %resp.status(), "subscriber rejected verification");
        return None;
    }
    resp.bytes().await.ok()
}
