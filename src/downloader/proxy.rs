use bytes::Bytes;
use futures::Stream;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL parameter is required")]
    MissingUrl,
    #[error("Unsupported media URL: {0}")]
    UnsupportedUrl(String),
    #[error("Failed to fetch media: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Media not found (upstream status {0})")]
    Upstream(StatusCode),
}

/// An upstream response ready to be streamed back unchanged.
pub struct ProxiedMedia {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    response: reqwest::Response,
}

impl ProxiedMedia {
    pub fn into_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> {
        self.response.bytes_stream()
    }
}

/// Fetches already-resolved media URLs on behalf of browsers that cannot
/// download cross-origin.
pub struct MediaProxy {
    client: Client,
}

impl MediaProxy {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub async fn fetch(&self, media_url: &str) -> Result<ProxiedMedia, ProxyError> {
        let url = validate_media_url(media_url)?;
        info!("Proxying download request for: {}", url);

        let response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            warn!("Media fetch failed with status: {}", response.status());
            return Err(ProxyError::Upstream(response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProxiedMedia {
            content_type,
            content_length: response.content_length(),
            response,
        })
    }
}

fn validate_media_url(media_url: &str) -> Result<Url, ProxyError> {
    let media_url = media_url.trim();
    if media_url.is_empty() {
        return Err(ProxyError::MissingUrl);
    }
    let url = Url::parse(media_url).map_err(|_| ProxyError::UnsupportedUrl(media_url.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ProxyError::UnsupportedUrl(media_url.to_string())),
    }
}

/// `Content-Disposition` value for a download named `filename`.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\r' | '\n' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_media_url() {
        assert!(matches!(validate_media_url("  "), Err(ProxyError::MissingUrl)));
        assert!(matches!(
            validate_media_url("file:///etc/passwd"),
            Err(ProxyError::UnsupportedUrl(_))
        ));
        assert!(matches!(validate_media_url("nope"), Err(ProxyError::UnsupportedUrl(_))));
        assert!(validate_media_url("https://video.fbcdn.net/x.mp4").is_ok());
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("clip.mp4"),
            "attachment; filename=\"clip.mp4\"; filename*=UTF-8''clip.mp4"
        );
        assert_eq!(
            content_disposition("a\"b é.mp4"),
            "attachment; filename=\"a_b _.mp4\"; filename*=UTF-8''a%22b%20%C3%A9.mp4"
        );
    }
}
