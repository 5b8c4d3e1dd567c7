//! Generic inbound message and outbound reply shapes.

use serde::{Deserialize, Serialize};

use crate::error::ProxyError;
use crate::xml::{empty_as_default, empty_as_none, empty_string_as_none, XmlWriter};

/// Flat view over every inbound message and base event the vendor sends.
///
/// Only the four header fields are mandatory; the rest are omitted from JSON
/// when the XML did not carry them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WxMessage {
    #[serde(default)]
    pub to_user_name: String,
    #[serde(default)]
    pub from_user_name: String,
    #[serde(default, deserialize_with = "empty_as_default")]
    pub create_time: u64,
    #[serde(default)]
    pub msg_type: String,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub msg_id: Option<u64>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub media_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub pic_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub format: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub recognition: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumb_media_id: Option<String>,
    #[serde(
        rename = "Location_X",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_x: Option<f64>,
    #[serde(
        rename = "Location_Y",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_y: Option<f64>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub scale: Option<i32>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,

    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub event: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_key: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ticket: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub precision: Option<f64>,
}

impl WxMessage {
    pub fn from_xml(xml: &str) -> Result<Self, ProxyError> {
        quick_xml::de::from_str(xml)
            .map_err(|e| ProxyError::Translation(format!("invalid message xml: {e}")))
    }

    pub fn is_event(&self) -> bool {
        self.msg_type == "event"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaReply {
    #[serde(default)]
    pub media_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoReply {
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MusicReply {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub music_url: String,
    #[serde(rename = "HQMusicUrl", default)]
    pub hq_music_url: String,
    #[serde(default)]
    pub thumb_media_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pic_url: String,
    #[serde(default)]
    pub url: String,
}

/// Passive reply a subscriber sends back, in the vendor's field names.
///
/// Exactly one content branch is expected; any branch present is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WxReply {
    #[serde(default)]
    pub to_user_name: String,
    #[serde(default)]
    pub from_user_name: String,
    #[serde(default)]
    pub create_time: u64,
    #[serde(default)]
    pub msg_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<MediaReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub articles: Vec<Article>,
}

impl WxReply {
    pub fn from_json(json: &[u8]) -> Result<Self, ProxyError> {
        serde_json::from_slice(json)
            .map_err(|e| ProxyError::Translation(format!("invalid reply json: {e}")))
    }

    /// Render the reply as the vendor's passive-reply XML.
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.cdata("ToUserName", &self.to_user_name)
            .cdata("FromUserName", &self.from_user_name)
            .text("CreateTime", self.create_time)
            .cdata("MsgType", &self.msg_type);

        if let Some(content) = &self.content {
            w.cdata("Content", content);
        }
        if let Some(image) = &self.image {
            w.open("Image").cdata("MediaId", &image.media_id).close("Image");
        }
        if let Some(voice) = &self.voice {
            w.open("Voice").cdata("MediaId", &voice.media_id).close("Voice");
        }
        if let Some(video) = &self.video {
            w.open("Video")
                .cdata("MediaId", &video.media_id)
                .cdata("Title", &video.title)
                .cdata("Description", &video.description)
                .close("Video");
        }
        if let Some(music) = &self.music {
            w.open("Music")
                .cdata("Title", &music.title)
                .cdata("Description", &music.description)
                .cdata("MusicUrl", &music.music_url)
                .cdata("HQMusicUrl", &music.hq_music_url)
                .cdata("ThumbMediaId", &music.thumb_media_id)
                .close("Music");
        }
        if !self.articles.is_empty() || self.article_count.is_some() {
            let count = self
                .article_count
                .unwrap_or(self.articles.len() as u32);
            w.text("ArticleCount", count).open("Articles");
            for article in &self.articles {
                w.open("item")
                    .cdata("Title", &article.title)
                    .cdata("Description", &article.description)
                    .cdata("PicUrl", &article.pic_url)
                    .cdata("Url", &article.url)
                    .close("item");
            }
            w.close("Articles");
        }
        w.finish()
    }
}
