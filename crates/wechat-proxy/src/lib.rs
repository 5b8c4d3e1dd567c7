//! WeChat cloud API proxy core.
//!
//! Receives the vendor's webhook callbacks, opens the AES envelope, fans the
//! message out to subscriber URLs and seals the winning reply. Also caches the
//! short-lived credentials (access tokens, JS tickets) that browser and
//! server code would otherwise fetch with the app secret in hand.
//!
//! # Components
//!
//! - **Codec** ([`MsgCrypter`]) - AES-256-CBC envelope decrypt/encrypt and SHA-1 signatures
//! - **Translator** ([`translate`]) - vendor XML to JSON and JSON replies back to XML
//! - **Dispatcher** ([`Dispatcher`]) - concurrent delivery, first non-empty reply wins
//! - **Credentials** ([`WechatClient`]) - upstream token/ticket client over [`TtlCache`]
//!
//! # Quick example
//!
//! ```no_run
//! use wxproxy::MsgCrypter;
//!
//! let crypter = MsgCrypter::new("token", "XVeChLv7XLCpkHiPJTGrx6Ha18Yq9i6LCkHV1oxk3mw").unwrap();
//! let envelope = crypter.encrypt(b"<xml>OK</xml>", "wx06766a90ab72960e").unwrap();
//! let opened = crypter.decrypt(envelope.as_bytes(), None).unwrap();
//! assert_eq!(opened.message, b"<xml>OK</xml>");
//! ```

// Shared primitives
pub mod error;
pub mod security;
pub mod signature;
pub mod xml;

// Webhook pipeline
pub mod crypter;
pub mod dispatcher;
pub mod events;
pub mod message;
pub mod subscribers;
pub mod translate;

// Credentials
pub mod cache;
pub mod credentials;
pub mod jsconfig;

// Re-exports
pub use cache::{SweeperHandle, TtlCache};
pub use credentials::{CredentialResolver, TicketKind, WechatClient};
pub use crypter::{DecryptedMessage, MsgCrypter, SignatureParams};
pub use dispatcher::Dispatcher;
pub use error::{ProxyError, WxApiStatus, LOCAL_ERRCODE};
pub use events::EventKind;
pub use jsconfig::JsConfig;
pub use message::{WxMessage, WxReply};
pub use subscribers::CallbackQuery;
