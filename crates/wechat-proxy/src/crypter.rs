//! Codec for the vendor's encrypted webhook envelope.
//!
//! Inbound callbacks in "safe mode" arrive as
//! `<xml><ToUserName/><Encrypt>base64</Encrypt></xml>`. The base64 blob is
//! AES-256-CBC ciphertext (IV = first 16 bytes of the key) over a frame:
//!
//! ```text
//! [16 random bytes][u32 BE length][message][app id]
//! ```
//!
//! padded PKCS#7-style to a 32-byte boundary. Replies travel back the same way,
//! wrapped in a signed reply envelope.

use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::Engine;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::Deserialize;

use crate::error::ProxyError;
use crate::security::hex_signature_eq;
use crate::signature::{nonce_str, sha1_signature};
use crate::xml::XmlWriter;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Padding block used by the vendor (not the AES block size).
pub const PAD_BLOCK_SIZE: usize = 32;

const AES_BLOCK_SIZE: usize = 16;
const RANDOM_PREFIX_LEN: usize = 16;
const FRAME_HEADER_LEN: usize = RANDOM_PREFIX_LEN + 4;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 16;

/// The vendor's 43-character keys leave non-zero trailing bits in the last
/// symbol, which the strict engine rejects.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Inbound encrypted envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: String,
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
}

impl EncryptedEnvelope {
    pub fn parse(raw_body: &[u8]) -> Result<Self, ProxyError> {
        let text = std::str::from_utf8(raw_body)
            .map_err(|e| ProxyError::Decode(format!("envelope is not utf-8: {e}")))?;
        quick_xml::de::from_str(text)
            .map_err(|e| ProxyError::Decode(format!("invalid envelope xml: {e}")))
    }
}

/// Outbound reply envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub encrypt: String,
    pub msg_signature: String,
    pub timestamp: i64,
    pub nonce: String,
}

impl ReplyEnvelope {
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.cdata("Encrypt", &self.encrypt)
            .cdata("MsgSignature", &self.msg_signature)
            .text("TimeStamp", self.timestamp)
            .cdata("Nonce", &self.nonce);
        w.finish()
    }
}

/// Query parameters the vendor sends alongside an encrypted callback.
#[derive(Debug, Clone, Copy)]
pub struct SignatureParams<'a> {
    pub timestamp: &'a str,
    pub nonce: &'a str,
    pub msg_signature: &'a str,
}

/// Decrypted callback: inner XML message plus the app id bound into the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub message: Vec<u8>,
    pub app_id: String,
}

/// Envelope codec for one (token, key) pair.
pub struct MsgCrypter {
    token: String,
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for MsgCrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgCrypter")
            .field("token", &"[REDACTED]")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl MsgCrypter {
    /// Build a codec from the signing token and the unpadded base64 AES key.
    pub fn new(token: &str, encoding_aes_key: &str) -> Result<Self, ProxyError> {
        let padded = format!("{}=", encoding_aes_key.trim());
        let decoded = LENIENT_STANDARD
            .decode(padded.as_bytes())
            .map_err(|e| ProxyError::Decode(format!("invalid aes key: {e}")))?;
        let key: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            ProxyError::Decode(format!(
                "aes key must decode to {KEY_LEN} bytes, got {}",
                decoded.len()
            ))
        })?;
        Ok(Self {
            token: token.to_string(),
            key,
        })
    }

    /// Signature over token, timestamp, nonce and ciphertext.
    pub fn signature(&self, timestamp: &str, nonce: &str, encrypt: &str) -> String {
        sha1_signature(&[&self.token, timestamp, nonce, encrypt])
    }

    pub fn verify_signature(&self, params: &SignatureParams<'_>, encrypt: &str) -> bool {
        let expected = self.signature(params.timestamp, params.nonce, encrypt);
        hex_signature_eq(&expected, params.msg_signature)
    }

    /// Open an encrypted envelope.
    ///
    /// When `check` is given the message signature is verified before any
    /// decryption happens; with `None` the ciphertext is trusted as-is.
    pub fn decrypt(
        &self,
        raw_body: &[u8],
        check: Option<&SignatureParams<'_>>,
    ) -> Result<DecryptedMessage, ProxyError> {
        let envelope = EncryptedEnvelope::parse(raw_body)?;
        let encrypt = envelope.encrypt.trim();

        if let Some(params) = check {
            if !self.verify_signature(params, encrypt) {
                return Err(ProxyError::Decode("message signature mismatch".to_string()));
            }
        }

        let ciphertext = STANDARD
            .decode(encrypt.as_bytes())
            .map_err(|e| ProxyError::Decode(format!("invalid ciphertext base64: {e}")))?;
        self.decrypt_body(&ciphertext)
    }

    /// Decrypt raw ciphertext and split the plaintext frame.
    pub fn decrypt_body(&self, ciphertext: &[u8]) -> Result<DecryptedMessage, ProxyError> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(ProxyError::Decode(format!(
                "ciphertext length {} is not a multiple of {AES_BLOCK_SIZE}",
                ciphertext.len()
            )));
        }

        let mut buf = ciphertext.to_vec();
        Aes256CbcDec::new_from_slices(&self.key, &self.key[..AES_BLOCK_SIZE])
            .map_err(|e| ProxyError::Decode(format!("cipher init failed: {e}")))?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|e| ProxyError::Decode(format!("decrypt failed: {e}")))?;

        let frame = pkcs7_unpad(&buf);
        if frame.len() < FRAME_HEADER_LEN {
            return Err(ProxyError::Decode(format!(
                "plaintext frame too short: {} bytes",
                frame.len()
            )));
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&frame[RANDOM_PREFIX_LEN..FRAME_HEADER_LEN]);
        let msg_len = u32::from_be_bytes(len_bytes) as usize;

        let body = &frame[FRAME_HEADER_LEN..];
        if msg_len > body.len() {
            return Err(ProxyError::Decode(format!(
                "frame length {msg_len} exceeds remaining {} bytes",
                body.len()
            )));
        }

        Ok(DecryptedMessage {
            message: body[..msg_len].to_vec(),
            app_id: String::from_utf8_lossy(&body[msg_len..]).into_owned(),
        })
    }

    /// Seal `message` for `app_id` and wrap it in a signed reply envelope.
    pub fn encrypt(&self, message: &[u8], app_id: &str) -> Result<String, ProxyError> {
        Ok(self.seal(message, app_id)?.to_xml())
    }

    /// Like [`MsgCrypter::encrypt`] but returns the envelope fields.
    pub fn seal(&self, message: &[u8], app_id: &str) -> Result<ReplyEnvelope, ProxyError> {
        let ciphertext = self.encrypt_body(message, app_id)?;
        let encrypt = STANDARD.encode(ciphertext);

        let timestamp = chrono::Utc::now().timestamp();
        let nonce = nonce_str(NONCE_LEN);
        let msg_signature = self.signature(&timestamp.to_string(), &nonce, &encrypt);

        Ok(ReplyEnvelope {
            encrypt,
            msg_signature,
            timestamp,
            nonce,
        })
    }

    /// Build, pad and encrypt a plaintext frame.
    pub fn encrypt_body(&self, message: &[u8], app_id: &str) -> Result<Vec<u8>, ProxyError> {
        let msg_len = u32::try_from(message.len())
            .map_err(|_| ProxyError::Encode("message too large for frame".to_string()))?;

        let mut prefix = [0u8; RANDOM_PREFIX_LEN];
        rand::fill(&mut prefix);

        let mut buf = Vec::with_capacity(
            FRAME_HEADER_LEN + message.len() + app_id.len() + PAD_BLOCK_SIZE,
        );
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&msg_len.to_be_bytes());
        buf.extend_from_slice(message);
        buf.extend_from_slice(app_id.as_bytes());
        pkcs7_pad(&mut buf);

        let len = buf.len();
        Aes256CbcEnc::new_from_slices(&self.key, &self.key[..AES_BLOCK_SIZE])
            .map_err(|e| ProxyError::Encode(format!("cipher init failed: {e}")))?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|e| ProxyError::Encode(format!("encrypt failed: {e}")))?;
        Ok(buf)
    }
}

/// Pad to a [`PAD_BLOCK_SIZE`] boundary. An aligned buffer gets a full block.
pub fn pkcs7_pad(buf: &mut Vec<u8>) {
    let amount = PAD_BLOCK_SIZE - buf.len() % PAD_BLOCK_SIZE;
    buf.resize(buf.len() + amount, amount as u8);
}

/// Strip the padding. A trailing byte outside `1..=32` means "no padding".
pub fn pkcs7_unpad(buf: &[u8]) -> &[u8] {
    let Some(&last) = buf.last() else {
        return buf;
    };
    let pad = last as usize;
    if !(1..=PAD_BLOCK_SIZE).contains(&pad) || pad > buf.len() {
        return buf;
    }
    &buf[..buf.len() - pad]
}
