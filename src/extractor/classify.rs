use super::types::MediaType;
use super::validate::{has_image_extension, is_content_cdn, is_video_candidate, unescape_url};
use crate::browser::{Budget, PageElement, RenderedPage};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

pub(crate) const VIDEO_META_SELECTORS: &[&str] = &[
    r#"meta[property="og:video:url"]"#,
    r#"meta[property="og:video"]"#,
    r#"meta[property="og:video:secure_url"]"#,
    r#"meta[name="twitter:player:stream"]"#,
];

const VIDEO_TYPE_SELECTORS: &[&str] = &[
    r#"meta[property="og:type"][content="video"]"#,
    r#"meta[property="og:type"][content="video.other"]"#,
];

static STATE_SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""__typename":"Video""#,
        r#""__typename":"XDTGraphVideo""#,
        r#""is_video":true"#,
        r#""media_type":2\b"#,
        r#""media_type":"2""#,
        r#""product_type":"clips""#,
        r#""product_type":"igtv""#,
        r#""video_url":""#,
        r#""video_versions":\s*\["#,
        r#""video_dash_manifest":""#,
        r#""video_duration":"#,
        r#""has_audio":"#,
        r#""original_width":.*"original_height":"#,
        r#""playback_duration_secs":"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static VIDEO_URL_SIGNATURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""video_url":\s*"([^"]+)""#,
        r#""url":\s*"([^"]+\.mp4[^"]*)""#,
        r#"video_versions":\s*\[\s*\{\s*"url":\s*"([^"]+)""#,
        r#"video_versions".*?"url":"([^"]+\.mp4[^"]*)""#,
        r#""src":\s*"([^"]+\.mp4[^"]*)""#,
        r#""video_dash_manifest":\s*"([^"]+)""#,
        r#"browser_native_hd_url":\s*"([^"]+)""#,
        r#"browser_native_sd_url":\s*"([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Best-guess media type of a rendered post.
///
/// Never fails: when nothing conclusive turns up the post is treated as an
/// image.
pub struct Classifier {
    probe_timeout: Duration,
}

impl Classifier {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    pub fn classify(&self, page: &dyn RenderedPage) -> MediaType {
        if self.video_meta_tags(page) {
            info!("Detected video via meta tag");
            return MediaType::Video;
        }
        if self.video_elements(page) {
            info!("Detected video via video element");
            return MediaType::Video;
        }
        if self.video_markup(page) {
            info!("Detected video via embedded page state");
            return MediaType::Video;
        }
        if self.image_signals(page) {
            info!("Detected image via meta tag or content images");
            return MediaType::Image;
        }

        info!("Could not determine content type, defaulting to image");
        MediaType::Image
    }

    fn video_meta_tags(&self, page: &dyn RenderedPage) -> bool {
        let budget = Budget::new(self.probe_timeout);
        page.limit_to(&budget);
        for selector in VIDEO_META_SELECTORS.iter().chain(VIDEO_TYPE_SELECTORS) {
            if budget.expired() {
                return false;
            }
            let Some(content) = page.query(selector).and_then(|m| m.attribute("content")) else {
                continue;
            };
            debug!(selector, %content, "Found video indicator");
            if content.contains("video") || content.contains(".mp4") {
                return true;
            }
        }
        false
    }

    fn video_elements(&self, page: &dyn RenderedPage) -> bool {
        let budget = Budget::new(self.probe_timeout);
        page.limit_to(&budget);
        for video in page.query_all("video") {
            if budget.expired() {
                return false;
            }
            if element_has_video_source(video.as_ref()) {
                return true;
            }
        }
        false
    }

    fn video_markup(&self, page: &dyn RenderedPage) -> bool {
        let budget = Budget::new(self.probe_timeout);
        page.limit_to(&budget);
        let Some(html) = page.markup() else {
            return false;
        };
        if budget.expired() {
            return false;
        }

        if let Some(sig) = STATE_SIGNATURES.iter().find(|re| re.is_match(&html)) {
            debug!(pattern = sig.as_str(), "Found video indicator pattern");
            return true;
        }

        for re in VIDEO_URL_SIGNATURES.iter() {
            if budget.expired() {
                return false;
            }
            if let Some(url) = re.captures(&html).and_then(|c| c.get(1)) {
                if is_video_candidate(&unescape_url(url.as_str())) {
                    return true;
                }
            }
        }
        false
    }

    fn image_signals(&self, page: &dyn RenderedPage) -> bool {
        let budget = Budget::new(self.probe_timeout);
        page.limit_to(&budget);
        let og_image = page
            .query(r#"meta[property="og:image"]"#)
            .and_then(|m| m.attribute("content"));
        if let Some(content) = og_image {
            debug!(%content, "Found og:image");
            if has_image_extension(&content) {
                return true;
            }
        }

        if budget.expired() {
            return false;
        }

        let count = page
            .query_all("img")
            .iter()
            .filter_map(|img| img.attribute("src"))
            .filter(|src| is_content_cdn(src) && has_image_extension(src))
            .count();
        if count > 0 {
            debug!(count, "Found content images");
        }
        count > 0
    }
}

/// Check `src`, `data-src` and nested `<source>` elements of a video element.
fn element_has_video_source(video: &dyn PageElement) -> bool {
    for attr in ["src", "data-src"] {
        if let Some(src) = video.attribute(attr) {
            if is_video_candidate(&src) {
                return true;
            }
        }
    }
    video
        .children("source")
        .iter()
        .filter_map(|s| s.attribute("src"))
        .any(|src| is_video_candidate(&src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotPage;

    fn classify(html: &str) -> MediaType {
        Classifier::new(Duration::from_secs(3)).classify(&SnapshotPage::new(html))
    }

    #[test]
    fn test_meta_tag_video() {
        let html = r#"<html><head><meta property="og:video" content="https://video.fbcdn.net/a.mp4"></head></html>"#;
        assert_eq!(classify(html), MediaType::Video);

        let html = r#"<html><head><meta property="og:type" content="video.other"></head></html>"#;
        assert_eq!(classify(html), MediaType::Video);
    }

    #[test]
    fn test_video_element_source() {
        let html = r#"<video><source src="https://scontent.cdninstagram.com/v/clip"></video>"#;
        assert_eq!(classify(html), MediaType::Video);

        let html = r#"<video data-src="https://video.fbcdn.net/x.mp4"></video>"#;
        assert_eq!(classify(html), MediaType::Video);
    }

    #[test]
    fn test_state_signature() {
        assert_eq!(classify(r#"<script>{"is_video":true}</script>"#), MediaType::Video);
        assert_eq!(classify(r#"<script>{"media_type":2}</script>"#), MediaType::Video);
        assert_eq!(classify(r#"<script>{"media_type":1}</script>"#), MediaType::Image);
    }

    #[test]
    fn test_image_and_default() {
        let html = r#"<html><head><meta property="og:image" content="https://scontent.cdninstagram.com/p.jpg"></head></html>"#;
        assert_eq!(classify(html), MediaType::Image);
        assert_eq!(classify("<html><body>nothing</body></html>"), MediaType::Image);
    }

    #[test]
    fn test_zero_budget_abstains() {
        let page = SnapshotPage::new(r#"<video src="https://video.fbcdn.net/x.mp4"></video>"#);
        assert_eq!(Classifier::new(Duration::ZERO).classify(&page), MediaType::Image);
    }
}
