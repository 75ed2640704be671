use super::{Capability, Strategy};
use crate::browser::{Budget, RenderedPage};
use crate::extractor::metadata::extract_metadata;
use crate::extractor::types::{ExtractionResult, MediaType};
use crate::extractor::validate::{is_strict_image_candidate, is_video_candidate, unescape_url};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

/// Video locators in priority order. Patterns without a capture group
/// yield their whole match.
static VIDEO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // structured fields
        r#"video_versions":\s*\[\s*\{\s*"url":\s*"([^"]+)""#,
        r#""video_url":\s*"([^"]+)""#,
        r#""url":\s*"([^"]+\.mp4[^"]*)""#,
        r#"video_versions"[^}]*"url":\s*"([^"]+\.mp4[^"]*)""#,
        r#""playback_url":\s*"([^"]+)""#,
        // CDN literals
        r#"https://[^"'\s]*video[^"'\s]*fbcdn\.net[^"'\s]*\.mp4[^"'\s]*"#,
        r#"https://[^"'\s]*scontent[^"'\s]*\.mp4[^"'\s]*"#,
        r#"https://[^"'\s]*cdninstagram\.com[^"'\s]*\.mp4[^"'\s]*"#,
        // generic
        r#""src":\s*"([^"]+\.mp4[^"]*)""#,
        r#"browser_native_hd_url":\s*"([^"]+)""#,
        r#"browser_native_sd_url":\s*"([^"]+)""#,
        r#""video_dash_manifest":\s*"([^"]+)""#,
        r#"candidates":\s*\[[^}]*"url":\s*"([^"]+\.mp4[^"]*)""#,
        r#"video_resources"[^}]*"src":\s*"([^"]+\.mp4[^"]*)""#,
        r#"data-video-url="([^"]+)""#,
        r#"data-src="([^"]+\.mp4[^"]*)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static IMAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""display_url":\s*"([^"]+)""#,
        r#""image_url":\s*"([^"]+)""#,
        r#""url":\s*"([^"]+\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"https://[^"'\s]*cdninstagram\.com[^"'\s]*\.(?:jpg|jpeg|png|webp)[^"'\s]*"#,
        r#"https://[^"'\s]*fbcdn\.net[^"'\s]*\.(?:jpg|jpeg|png|webp)[^"'\s]*"#,
        r#"https://[^"'\s]*scontent[^"'\s]*\.(?:jpg|jpeg|png|webp)[^"'\s]*"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Candidate URLs for one pattern, unescaped, in document order.
fn candidates<'h>(re: &'h Regex, html: &'h str) -> impl Iterator<Item = String> + 'h {
    re.captures_iter(html).filter_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| unescape_url(m.as_str()))
    })
}

/// Scans the serialized page for media URLs embedded in script state.
///
/// Video locators always run first, whatever the classifier said, because
/// the embedded state carries video links even when the page-level signals
/// were ambiguous. Image locators only run for image posts.
pub struct SourceMarkupStrategy {
    timeout: Duration,
}

impl SourceMarkupStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn find_video(&self, html: &str, budget: &Budget) -> Option<ExtractionResult> {
        for re in VIDEO_PATTERNS.iter() {
            if budget.expired() {
                return None;
            }
            if let Some(url) = candidates(re, html).find(|u| is_video_candidate(u)) {
                debug!(pattern = re.as_str(), "Video pattern matched");
                return Some(ExtractionResult::video_with_metadata(url, extract_metadata(html)));
            }
        }
        None
    }

    fn find_image(&self, html: &str, budget: &Budget) -> Option<ExtractionResult> {
        for re in IMAGE_PATTERNS.iter() {
            if budget.expired() {
                return None;
            }
            if let Some(url) = candidates(re, html).find(|u| is_strict_image_candidate(u)) {
                debug!(pattern = re.as_str(), "Image pattern matched");
                return Some(ExtractionResult::image(url));
            }
        }
        None
    }
}

impl Strategy for SourceMarkupStrategy {
    fn name(&self) -> &'static str {
        "source"
    }

    fn capability(&self) -> Capability {
        Capability::TypeGated
    }

    fn attempt(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult> {
        let budget = Budget::new(self.timeout);
        page.limit_to(&budget);

        let Some(html) = page.markup() else {
            debug!("Failed to read page markup");
            return None;
        };
        if budget.expired() {
            debug!("Page markup arrived after the deadline");
            return None;
        }
        info!(bytes = html.len(), "Searching page markup");

        if let Some(result) = self.find_video(&html, &budget) {
            return Some(result);
        }
        if content_type == MediaType::Image {
            return self.find_image(&html, &budget);
        }
        None
    }
}
