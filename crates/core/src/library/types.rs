//! Catalog data model as served by the metadata service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable cross-session identifier of an item.
pub type ItemId = u64;

/// The full set of libraries for the current session.
pub type Catalog = Vec<Library>;

/// A named collection of items (e.g. "Movies").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    /// Display name. Plex payloads call this `library`.
    #[serde(alias = "library", default)]
    pub name: String,
    /// Library type ("movie", "show", ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Stable library key.
    #[serde(default, deserialize_with = "string_or_number")]
    pub key: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Library {
    pub fn new(name: impl Into<String>, key: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            kind: "movie".to_string(),
            key: key.into(),
            items,
        }
    }
}

/// One media entry.
///
/// Accepts both `{ id, metadata }` and the Plex shape `{ full_metadata }`
/// where the id is the metadata's `ratingKey`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawItem")]
pub struct Item {
    pub id: ItemId,
    pub metadata: Metadata,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    id: Option<Value>,
    #[serde(alias = "full_metadata")]
    metadata: Metadata,
}

impl TryFrom<RawItem> for Item {
    type Error = String;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .as_ref()
            .or_else(|| raw.metadata.extra.get("ratingKey"))
            .and_then(parse_item_id)
            .ok_or_else(|| {
                format!(
                    "item '{}' has no numeric id or ratingKey",
                    raw.metadata.title
                )
            })?;

        Ok(Self {
            id,
            metadata: raw.metadata,
        })
    }
}

fn parse_item_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// A single `{ "tag": ... }` entry (genre, director, writer, role).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub tag: String,
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

/// Technical description of one media file. Only the first is displayed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Item metadata.
///
/// Fields the browser never reads are kept in `extra` so a full-fidelity
/// cache stores the upstream payload unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<String>,
    #[serde(rename = "Genre", default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Tag>,
    #[serde(rename = "Director", default, skip_serializing_if = "Vec::is_empty")]
    pub directors: Vec<Tag>,
    #[serde(rename = "Writer", default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<Tag>,
    #[serde(rename = "Role", default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Tag>,
    #[serde(rename = "Media", default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Title shown to the user: `title`, else `originalTitle`.
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            return &self.title;
        }
        self.original_title.as_deref().unwrap_or_default()
    }

    /// Title used for poster lookup: `originalTitle`, else `title`.
    pub fn poster_title(&self) -> &str {
        match self.original_title.as_deref() {
            Some(original) if !original.is_empty() => original,
            _ => &self.title,
        }
    }

    pub fn genre_names(&self) -> Vec<&str> {
        tag_names(&self.genres)
    }

    pub fn director_names(&self) -> Vec<&str> {
        tag_names(&self.directors)
    }

    pub fn writer_names(&self) -> Vec<&str> {
        tag_names(&self.writers)
    }

    pub fn role_names(&self) -> Vec<&str> {
        tag_names(&self.roles)
    }

    fn primary_media(&self) -> Option<&MediaInfo> {
        self.media.first()
    }

    pub fn video_codec(&self) -> Option<&str> {
        self.primary_media()?.video_codec.as_deref()
    }

    pub fn audio_channels(&self) -> Option<u32> {
        self.primary_media()?.audio_channels
    }

    /// `"{width}x{height}"` of the first media descriptor.
    pub fn resolution(&self) -> Option<String> {
        let media = self.primary_media()?;
        match (media.width, media.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }
}

fn tag_names(tags: &[Tag]) -> Vec<&str> {
    tags.iter().map(|t| t.tag.as_str()).collect()
}
