use super::{Capability, Strategy};
use crate::browser::{Budget, RenderedPage};
use crate::extractor::classify::VIDEO_META_SELECTORS;
use crate::extractor::types::{ExtractionResult, MediaType};
use crate::extractor::validate::{is_strict_image_candidate, is_video_candidate};
use std::time::Duration;
use tracing::debug;

const IMAGE_META_SELECTORS: &[&str] = &[
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:url"]"#,
    r#"meta[name="twitter:image"]"#,
];

/// Reads OpenGraph / Twitter card tags.
pub struct MetaTagStrategy {
    timeout: Duration,
}

impl MetaTagStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn first_content(
        &self,
        page: &dyn RenderedPage,
        selectors: &[&str],
        accept: fn(&str) -> bool,
    ) -> Option<String> {
        let budget = Budget::new(self.timeout);
        page.limit_to(&budget);
        for selector in selectors {
            if budget.expired() {
                return None;
            }
            let Some(content) = page.query(selector).and_then(|m| m.attribute("content")) else {
                continue;
            };
            if accept(&content) {
                return Some(content);
            }
            debug!(selector, %content, "Rejected meta tag content");
        }
        None
    }
}

impl Strategy for MetaTagStrategy {
    fn name(&self) -> &'static str {
        "meta_tags"
    }

    fn capability(&self) -> Capability {
        Capability::TypeGated
    }

    fn attempt(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult> {
        match content_type {
            MediaType::Video => self
                .first_content(page, VIDEO_META_SELECTORS, is_video_candidate)
                .map(ExtractionResult::video),
            MediaType::Image => self
                .first_content(page, IMAGE_META_SELECTORS, is_strict_image_candidate)
                .map(ExtractionResult::image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::SnapshotPage;

    fn strategy() -> MetaTagStrategy {
        MetaTagStrategy::new(Duration::from_secs(2))
    }

    #[test]
    fn test_video_meta() {
        let page = SnapshotPage::new(
            r#"<head>
                 <meta property="og:video:url" content="https://example.com/player">
                 <meta property="og:video" content="https://video.fbcdn.net/v/a.mp4">
               </head>"#,
        );
        let result = strategy().attempt(&page, MediaType::Video).unwrap();
        assert_eq!(result.media_url, "https://video.fbcdn.net/v/a.mp4");
    }

    #[test]
    fn test_image_meta_is_strict() {
        let page = SnapshotPage::new(
            r#"<head>
                 <meta property="og:image" content="https://scontent.cdninstagram.com/v/profile/a.jpg">
                 <meta name="twitter:image" content="https://scontent.cdninstagram.com/v/s1080x1080/b.jpg">
               </head>"#,
        );
        let result = strategy().attempt(&page, MediaType::Image).unwrap();
        assert_eq!(result.media_url, "https://scontent.cdninstagram.com/v/s1080x1080/b.jpg");
        assert!(strategy().attempt(&page, MediaType::Video).is_none());
    }
}
