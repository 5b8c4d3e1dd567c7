//! Minimal XML writer for the vendor's flat `<xml>` documents, plus the
//! field deserializers inbound documents need.
//!
//! The vendor expects free text wrapped in CDATA sections, which the serde
//! serializer cannot emit, so outbound documents are rendered here.

use std::fmt::Display;
use std::str::FromStr;

use quick_xml::escape::escape;
use serde::{de, Deserialize, Deserializer};

pub struct XmlWriter {
    root: String,
    buf: String,
}

impl XmlWriter {
    /// Start a document with the vendor's `<xml>` root element.
    pub fn new() -> Self {
        Self::with_root("xml")
    }

    pub fn with_root(root: &str) -> Self {
        let mut buf = String::with_capacity(256);
        buf.push('<');
        buf.push_str(root);
        buf.push('>');
        Self {
            root: root.to_string(),
            buf,
        }
    }

    /// Write `<name><![CDATA[value]]></name>`.
    pub fn cdata(&mut self, name: &str, value: &str) -> &mut Self {
        self.open(name);
        push_cdata(&mut self.buf, value);
        self.close(name)
    }

    /// Write `<name>value</name>` with the value escaped.
    pub fn text(&mut self, name: &str, value: impl Display) -> &mut Self {
        let raw = value.to_string();
        self.open(name);
        self.buf.push_str(&escape(raw.as_str()));
        self.close(name)
    }

    pub fn open(&mut self, name: &str) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    pub fn close(&mut self, name: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    /// Close the root element and return the document.
    pub fn finish(self) -> String {
        let Self { root, mut buf } = self;
        buf.push_str("</");
        buf.push_str(&root);
        buf.push('>');
        buf
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A literal `]]>` cannot appear inside CDATA; split it across two sections.
fn push_cdata(buf: &mut String, value: &str) {
    buf.push_str("<![CDATA[");
    buf.push_str(&value.replace("]]>", "]]]]><![CDATA[>"));
    buf.push_str("]]>");
}

/// Element text, with an empty element read as absent.
pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    Ok((!text.is_empty()).then_some(text))
}

/// Parsed element text; empty or blank elements are absent rather than errors.
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some).map_err(de::Error::custom)
}

/// Parsed element text; an empty element yields `T::default()`.
pub(crate) fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    Ok(empty_as_none(deserializer)?.unwrap_or_default())
}
