use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("URL must be from threads.com or threads.net: {0}")]
    UntrustedDomain(String),
    #[error("invalid Threads post URL format - must be a post (/@username/post/POST_ID): {0}")]
    MalformedPostPath(String),
    #[error("failed to navigate to Threads post: {0}")]
    Navigation(String),
    #[error("Threads extraction failed - unable to find media URLs in page source")]
    NoMediaFound,
    #[error("extraction failed due to internal error")]
    Internal,
    #[error("browser session unavailable: {0}")]
    Browser(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "image",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated Threads post address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReference {
    /// Host as given by the caller, lowercased.
    pub host: String,
    pub handle: String,
    pub post_id: String,
    pub(crate) path: String,
}

impl PostReference {
    /// The canonical address: primary host, original path, no query.
    pub fn canonical_url(&self) -> String {
        format!("https://{}{}", super::normalize::CANONICAL_HOST, self.path)
    }
}

impl fmt::Display for PostReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_url())
    }
}

/// Auxiliary fields recovered from embedded page state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<u64>,
    pub qualities: BTreeMap<String, String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub media_url: String,
    pub media_type: MediaType,
    #[serde(rename = "videoId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "is_unknown_duration")]
    pub duration: Option<u64>,
    #[serde(rename = "videoUrls", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub qualities: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn is_unknown_duration(duration: &Option<u64>) -> bool {
    matches!(duration, None | Some(0))
}

impl ExtractionResult {
    pub fn video(url: impl Into<String>) -> Self {
        Self::bare(url.into(), MediaType::Video)
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::bare(url.into(), MediaType::Image)
    }

    /// A video result enriched with recovered metadata in one step.
    pub fn video_with_metadata(url: impl Into<String>, meta: VideoMetadata) -> Self {
        Self {
            media_url: url.into(),
            media_type: MediaType::Video,
            id: meta.id,
            title: meta.title,
            duration: meta.duration,
            qualities: meta.qualities,
            metadata: meta.extra,
        }
    }

    fn bare(media_url: String, media_type: MediaType) -> Self {
        Self {
            media_url,
            media_type,
            id: None,
            title: None,
            duration: None,
            qualities: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_wire_names() {
        let mut meta = VideoMetadata {
            id: Some("42".into()),
            duration: Some(30),
            ..Default::default()
        };
        meta.qualities
            .insert("browser_hd".into(), "https://video.fbcdn.net/hd.mp4".into());

        let result = ExtractionResult::video_with_metadata("https://video.fbcdn.net/x.mp4", meta);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["mediaUrl"], "https://video.fbcdn.net/x.mp4");
        assert_eq!(json["mediaType"], "video");
        assert_eq!(json["videoId"], "42");
        assert_eq!(json["duration"], 30);
        assert_eq!(json["videoUrls"]["browser_hd"], "https://video.fbcdn.net/hd.mp4");
        assert!(json.get("title").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_zero_duration_is_omitted() {
        let meta = VideoMetadata {
            duration: Some(0),
            ..Default::default()
        };
        let result = ExtractionResult::video_with_metadata("https://video.fbcdn.net/x.mp4", meta);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn test_image_result_has_no_optional_fields() {
        let json = serde_json::to_value(ExtractionResult::image("https://a.cdninstagram.com/p.jpg")).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(json["mediaType"], "image");
    }
}
