//! User Message Content
//!
//! Items a user message may carry. Binary payloads are kept as raw bytes and
//! only base64-encoded when a normalizer writes them to the wire.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::contract::ContentType;

/// Inline image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Image {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:` URL form accepted by most chat APIs
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Inline audio clip
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audio {
    pub data: Vec<u8>,
    /// Container format, e.g. "wav" or "mp3"
    pub format: String,
}

impl Audio {
    pub fn new(data: impl Into<Vec<u8>>, format: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            format: format.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Inline document (PDF and friends)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub data: Vec<u8>,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Document {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// One item of user message content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Image(Image),
    ImageUrl { url: String },
    Audio(Audio),
    Document(Document),
    Collection { items: Vec<Content> },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl { url: url.into() }
    }

    pub const fn collection(items: Vec<Self>) -> Self {
        Self::Collection { items }
    }

    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Text { .. } => ContentType::Text,
            Self::Image(_) => ContentType::Image,
            Self::ImageUrl { .. } => ContentType::ImageUrl,
            Self::Audio(_) => ContentType::Audio,
            Self::Document(_) => ContentType::Document,
            Self::Collection { .. } => ContentType::Collection,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// All text in this item, descending into collections
    pub fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Text { text } => out.push(text),
            Self::Collection { items } => items.iter().for_each(|item| item.collect_text(out)),
            _ => {}
        }
    }
}

impl From<Image> for Content {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

impl From<Audio> for Content {
    fn from(audio: Audio) -> Self {
        Self::Audio(audio)
    }
}

impl From<Document> for Content {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_data_url() {
        let image = Image::new(b"abc".to_vec(), "image/png");
        assert_eq!(image.data_url(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_collect_text_descends_into_collections() {
        let content = Content::collection(vec![
            Content::text("first"),
            Content::image_url("https://example.com/cat.png"),
            Content::collection(vec![Content::text("second")]),
        ]);

        let mut texts = Vec::new();
        content.collect_text(&mut texts);
        assert_eq!(texts, vec!["first", "second"]);
    }
}
