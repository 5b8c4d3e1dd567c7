//! XML <-> JSON translation for subscribers that prefer JSON.

use crate::dispatcher::Dispatcher;
use crate::error::ProxyError;
use crate::events::EventKind;
use crate::message::{WxMessage, WxReply};

/// Convert an inbound vendor XML message into JSON.
///
/// Events listed in the [`EventKind`] registry carry their extended schema;
/// everything else uses the flat [`WxMessage`] shape.
pub fn to_generic(raw_xml: &[u8]) -> Result<Vec<u8>, ProxyError> {
    let xml = std::str::from_utf8(raw_xml)
        .map_err(|e| ProxyError::Translation(format!("message is not utf-8: {e}")))?;
    let msg = WxMessage::from_xml(xml)?;

    if msg.is_event() {
        if let Some(kind) = msg.event.as_deref().and_then(EventKind::from_name) {
            tracing::debug!(event = kind.as_str(), "using extended event schema");
            return kind.to_json(xml);
        }
    }

    serde_json::to_vec(&msg).map_err(|e| ProxyError::Translation(format!("message json: {e}")))
}

/// Convert a subscriber's JSON reply into vendor reply XML.
pub fn to_xml(json: &[u8]) -> Result<Vec<u8>, ProxyError> {
    Ok(WxReply::from_json(json)?.to_xml().into_bytes())
}

/// Translate, fan out and translate the winning reply back.
///
/// An empty reply stays empty.
pub async fn translate(
    dispatcher: &Dispatcher,
    raw_xml: &[u8],
    urls: &[String],
) -> Result<Vec<u8>, ProxyError> {
    let json = to_generic(raw_xml)?;
    let reply = dispatcher.dispatch(json.into(), urls).await;
    if reply.is_empty() {
        return Ok(Vec::new());
    }
    to_xml(&reply)
}
